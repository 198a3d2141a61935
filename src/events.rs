//! One-shot UI events, kept strictly apart from replay-latest state.
//!
//! Screen state (the task list, the editable fields, the auth status) lives
//! in `tokio::sync::watch` channels: late observers immediately see the
//! latest value. Intents that must happen once (navigate somewhere, show a
//! snackbar, sign out) must never replay, so they travel through this
//! single-consumer queue instead. Merging the two would either replay stale
//! navigations or drop state updates; the two primitives stay separate.

use crate::navigation::Screen;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// An intent delivered at most once to the single active listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Route to the given screen.
    Navigate(Screen),
    /// Pop back to the previous screen.
    NavigateBack,
    /// Show a transient message (snackbar).
    ShowMessage(String),
    /// The user asked to end the session; the auth session acts on it.
    SignOut,
}

/// Single-consumer event channel owned by a view-state.
///
/// The underlying queue is created lazily when a listener subscribes, so an
/// event sent while nobody listens is dropped rather than held for a later
/// subscriber; a listener that attaches after an event was sent never
/// receives it. Subscribing again replaces the previous listener.
pub struct UiEventChannel {
    sender: Mutex<Option<mpsc::UnboundedSender<UiEvent>>>,
}

impl UiEventChannel {
    pub fn new() -> Self {
        Self {
            sender: Mutex::new(None),
        }
    }

    /// Attaches the single active listener, detaching any previous one.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UiEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        rx
    }

    /// Delivers an event to the active listener, if any.
    ///
    /// Events without a listener are intentionally discarded; a closed
    /// receiver counts as no listener and clears the slot.
    pub fn send(&self, event: UiEvent) {
        let mut slot = self.sender.lock().unwrap();
        if let Some(tx) = slot.as_ref() {
            if tx.send(event).is_err() {
                *slot = None;
            }
        }
    }
}

impl Default for UiEventChannel {
    fn default() -> Self {
        Self::new()
    }
}
