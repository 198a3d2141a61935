//! Shared test doubles and helpers for the integration tests.
//!
//! Each test binary uses a different subset of these.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskloop::{AppError, AuthBackend, AuthSession, AuthState, Identity, OwnerId};
use tokio::sync::{watch, Notify};

enum Outcome {
    Succeed,
    Fail(String),
}

/// Scriptable auth backend: counts calls, can be told to fail, and can hold
/// an exchange open so tests observe the `Loading` state.
pub struct FakeAuthBackend {
    identity: Mutex<Option<Identity>>,
    outcome: Mutex<Outcome>,
    gate: Mutex<Option<Arc<Notify>>>,
    pub sign_in_calls: AtomicUsize,
    pub sign_up_calls: AtomicUsize,
}

impl FakeAuthBackend {
    pub fn new() -> Self {
        Self {
            identity: Mutex::new(None),
            outcome: Mutex::new(Outcome::Succeed),
            gate: Mutex::new(None),
            sign_in_calls: AtomicUsize::new(0),
            sign_up_calls: AtomicUsize::new(0),
        }
    }

    /// A backend whose provider already has a cached session.
    pub fn signed_in(email: &str) -> Self {
        let backend = Self::new();
        *backend.identity.lock().unwrap() = Some(identity_for(email));
        backend
    }

    /// Makes every subsequent exchange fail with an auth error.
    pub fn fail_with(&self, message: &str) {
        *self.outcome.lock().unwrap() = Outcome::Fail(message.to_string());
    }

    /// Makes subsequent exchanges succeed again.
    pub fn succeed(&self) {
        *self.outcome.lock().unwrap() = Outcome::Succeed;
    }

    /// Holds the next exchanges open until the returned gate is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    async fn exchange(&self, email: &str) -> Result<Identity, AppError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let outcome = match &*self.outcome.lock().unwrap() {
            Outcome::Fail(message) => Err(AppError::Auth(message.clone())),
            Outcome::Succeed => Ok(identity_for(email)),
        };
        if let Ok(identity) = &outcome {
            *self.identity.lock().unwrap() = Some(identity.clone());
        }
        outcome
    }
}

#[async_trait]
impl AuthBackend for FakeAuthBackend {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, AppError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange(email).await
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<Identity, AppError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange(email).await
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        *self.identity.lock().unwrap() = None;
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.identity.lock().unwrap().clone()
    }
}

pub fn identity_for(email: &str) -> Identity {
    Identity {
        owner_id: OwnerId::new(format!("owner-{}", email)),
        email: email.to_string(),
    }
}

/// An authenticated session plus its backend, ready for owner-scoped stores.
pub fn signed_in_session(email: &str) -> (Arc<AuthSession>, Arc<FakeAuthBackend>) {
    let backend = Arc::new(FakeAuthBackend::signed_in(email));
    let session = Arc::new(AuthSession::new(
        Arc::clone(&backend) as Arc<dyn AuthBackend>
    ));
    (session, backend)
}

/// Blocks (with a timeout) until the auth state satisfies the predicate.
pub async fn wait_for_state(
    receiver: &mut watch::Receiver<AuthState>,
    pred: impl Fn(&AuthState) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if pred(&receiver.borrow()) {
                return;
            }
            receiver
                .changed()
                .await
                .expect("auth session dropped while waiting");
        }
    })
    .await
    .expect("timed out waiting for auth state");
}
