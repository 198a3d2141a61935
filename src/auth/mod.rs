//! Authentication session and state machine.
//!
//! The actual credential exchange lives behind [`AuthBackend`], an externally
//! provided collaborator; this module only consumes success/failure outcomes
//! and the resulting identity. [`AuthSession`] is the single source of truth
//! for "who is signed in": every screen gate and the remote task store read
//! identity from it.

use crate::error::AppError;
use crate::events::{UiEvent, UiEventChannel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use validator::Validate;

/// Identifier of the authenticated owner, as assigned by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of the currently signed-in owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner_id: OwnerId,
    pub email: String,
}

/// Externally provided authentication operations.
///
/// Sign-in/up/out exchange credentials over the network; `current_identity`
/// is a cached read of the provider's session and therefore synchronous.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError>;
    async fn sign_out(&self) -> Result<(), AppError>;
    fn current_identity(&self) -> Option<Identity>;
}

/// Represents the payload of a login or signup attempt.
///
/// The local guard is stricter than a plain non-blank check: a malformed
/// email is rejected here and never reaches the backend, which would refuse
/// it anyway.
#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    /// User's email address. Must be a valid email format.
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    /// User's password. Must not be blank.
    #[validate(length(min = 1, message = "The password cannot be blank."))]
    pub password: String,
}

impl Credentials {
    fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    /// Flattens validator output into a single user-facing line.
    fn validation_message(errors: &validator::ValidationErrors) -> String {
        let mut parts: Vec<String> = errors
            .field_errors()
            .values()
            .flat_map(|field| field.iter())
            .filter_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .collect();
        parts.sort();
        if parts.is_empty() {
            "Email and password cannot be blank.".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Authentication status. Exactly one holds at a time.
///
/// `Loading -> {Authenticated, Unauthenticated}` on the initial identity
/// check; `login`/`signup` go through `Loading -> {Authenticated, Error}`;
/// sign-out moves `Authenticated -> Unauthenticated`. There is no terminal
/// state; a failed attempt retries through `Loading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Loading,
    Authenticated(Identity),
    Unauthenticated,
    Error,
}

/// Long-lived session tracking the current owner and auth status.
///
/// State is exposed through a `watch` channel (replay-latest), success and
/// failure feedback through the session's one-shot event channel, and local
/// validation failures through a separate message slot that holds its value
/// until [`AuthSession::clear_message`] is called. Network attempts run on
/// tasks scoped to the session; dropping it aborts anything in flight.
pub struct AuthSession {
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<AuthState>,
    message: watch::Sender<Option<String>>,
    events: Arc<UiEventChannel>,
    jobs: Mutex<JoinSet<()>>,
}

impl AuthSession {
    /// Builds the session and immediately resolves the initial identity
    /// check: `Loading`, then `Authenticated` or `Unauthenticated`.
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        let (message, _) = watch::channel(None);

        let resolved = match backend.current_identity() {
            Some(identity) => AuthState::Authenticated(identity),
            None => AuthState::Unauthenticated,
        };
        state.send_replace(resolved);

        Self {
            backend,
            state,
            message,
            events: Arc::new(UiEventChannel::new()),
            jobs: Mutex::new(JoinSet::new()),
        }
    }

    /// Replay-latest view of the auth status.
    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The validation-message slot. Holds its value until explicitly
    /// cleared, unlike the one-shot events.
    pub fn message(&self) -> watch::Receiver<Option<String>> {
        self.message.subscribe()
    }

    /// One-shot feedback events (snackbar messages).
    pub fn events(&self) -> mpsc::UnboundedReceiver<UiEvent> {
        self.events.subscribe()
    }

    /// The signed-in owner, if any.
    pub fn identity(&self) -> Option<Identity> {
        match &*self.state.borrow() {
            AuthState::Authenticated(identity) => Some(identity.clone()),
            _ => None,
        }
    }

    /// Clears the validation-message slot.
    pub fn clear_message(&self) {
        self.message.send_replace(None);
    }

    /// Attempts to sign in. Invalid credentials are rejected locally with no
    /// network call and no state change; otherwise the attempt transitions
    /// `Loading -> Authenticated` or `Loading -> Error`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn login(&self, email: &str, password: &str) {
        self.attempt(email, password, Exchange::SignIn);
    }

    /// Attempts to create an account. Same guard and transitions as
    /// [`AuthSession::login`].
    pub fn signup(&self, email: &str, password: &str) {
        self.attempt(email, password, Exchange::SignUp);
    }

    /// Spawns a session-scoped task, first reaping whatever already
    /// finished so the set stays bounded by in-flight work.
    fn dispatch(&self, task: impl Future<Output = ()> + Send + 'static) {
        let mut jobs = self.jobs.lock().unwrap();
        while jobs.try_join_next().is_some() {}
        jobs.spawn(task);
    }

    /// Ends the session: `Authenticated -> Unauthenticated`.
    pub fn sign_out(&self) {
        let backend = Arc::clone(&self.backend);
        let state = self.state.clone();
        let events = Arc::clone(&self.events);

        self.dispatch(async move {
            match backend.sign_out().await {
                Ok(()) => {
                    state.send_replace(AuthState::Unauthenticated);
                    events.send(UiEvent::ShowMessage("Signed out.".to_string()));
                }
                Err(error) => {
                    log::error!("sign-out failed: {}", error);
                    events.send(UiEvent::ShowMessage(error.user_message()));
                }
            }
        });
    }

    fn attempt(&self, email: &str, password: &str, exchange: Exchange) {
        let credentials = Credentials::new(email, password);
        if let Err(errors) = credentials.validate() {
            self.message
                .send_replace(Some(Credentials::validation_message(&errors)));
            return;
        }

        let backend = Arc::clone(&self.backend);
        let state = self.state.clone();
        let events = Arc::clone(&self.events);

        self.dispatch(async move {
            state.send_replace(AuthState::Loading);
            let outcome = match exchange {
                Exchange::SignIn => backend.sign_in(&credentials.email, &credentials.password).await,
                Exchange::SignUp => backend.sign_up(&credentials.email, &credentials.password).await,
            };
            match outcome {
                Ok(identity) => {
                    state.send_replace(AuthState::Authenticated(identity));
                    events.send(UiEvent::ShowMessage(exchange.success_message().to_string()));
                }
                Err(error) => {
                    log::warn!("{} failed: {}", exchange.name(), error);
                    state.send_replace(AuthState::Error);
                    events.send(UiEvent::ShowMessage(error.user_message()));
                }
            }
        });
    }
}

#[derive(Clone, Copy)]
enum Exchange {
    SignIn,
    SignUp,
}

impl Exchange {
    fn name(self) -> &'static str {
        match self {
            Exchange::SignIn => "sign-in",
            Exchange::SignUp => "sign-up",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            Exchange::SignIn => "Signed in.",
            Exchange::SignUp => "Account created. Welcome!",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        let valid = Credentials::new("test@example.com", "password123");
        assert!(valid.validate().is_ok());

        let blank_password = Credentials::new("test@example.com", "");
        assert!(blank_password.validate().is_err());

        let invalid_email = Credentials::new("testexample.com", "password123");
        assert!(invalid_email.validate().is_err());

        let blank_both = Credentials::new("", "");
        let errors = blank_both.validate().unwrap_err();
        let message = Credentials::validation_message(&errors);
        assert!(!message.is_empty());
    }

    #[test]
    fn test_owner_id_display() {
        let id = OwnerId::new("owner-7");
        assert_eq!(id.to_string(), "owner-7");
        assert_eq!(id.as_str(), "owner-7");
    }
}
