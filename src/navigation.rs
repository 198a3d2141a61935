//! Auth-gated routing between the four screens.
//!
//! The navigation gate is deliberately a pure function: it owns no state and
//! produces the screen to show from the current [`AuthState`] plus the most
//! recent explicit navigation request. Keeping it stateless avoids races
//! between auth-state observation and one-shot navigate events: whichever
//! arrives last, recomputing the destination gives the same answer.

use crate::auth::AuthState;
use crate::models::TaskId;

/// The screens reachable in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Login,
    SignUp,
    List,
    AddEdit { id: Option<TaskId> },
}

impl Screen {
    /// Whether the screen shows owner-scoped data.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Screen::List | Screen::AddEdit { .. })
    }
}

/// Pure resolver from auth state + requested screen to the screen to show.
pub struct NavigationGate;

impl NavigationGate {
    /// Resolves the destination screen.
    ///
    /// Returns `None` while the initial identity check is still running (the
    /// shell shows its loading indicator and routes nowhere). Once resolved,
    /// owner-scoped screens are only reachable when authenticated, and the
    /// auth screens collapse to the list once a session exists.
    pub fn destination(auth: &AuthState, requested: Option<&Screen>) -> Option<Screen> {
        match auth {
            AuthState::Loading => None,
            AuthState::Authenticated(_) => Some(match requested {
                Some(screen) if screen.requires_auth() => screen.clone(),
                _ => Screen::List,
            }),
            AuthState::Unauthenticated | AuthState::Error => Some(match requested {
                Some(screen) if !screen.requires_auth() => screen.clone(),
                _ => Screen::Login,
            }),
        }
    }
}
