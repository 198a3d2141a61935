//!
//! # Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the
//! crate. It centralizes error management, providing a consistent way to
//! represent the failure kinds the core distinguishes: validation failures,
//! missing records, storage faults, and failed credential exchanges.
//!
//! `From` trait implementations for `sqlx::Error` and
//! `validator::ValidationErrors` allow easy conversion using the `?` operator.
//! View-states never forward these errors raw; they call
//! [`AppError::user_message`] to obtain presentation-safe text first.

use std::fmt;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the core.
///
/// Each variant corresponds to one kind of failure and carries a message
/// detailing the issue. None of them is fatal to the process: validation and
/// not-found are recovered locally, storage and auth failures surface to the
/// user and leave the system in a resumable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Input rejected before it reached a store (blank title, blank
    /// credentials). Never persisted or transmitted.
    Validation(String),
    /// A record addressed by id does not exist. Benign for update/delete
    /// paths, which treat it as a no-op.
    NotFound(String),
    /// I/O, permission, or transport failure in one of the stores.
    Store(String),
    /// A credential exchange with the auth backend failed.
    Auth(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Store(msg) => write!(f, "Store Error: {}", msg),
            AppError::Auth(msg) => write!(f, "Auth Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Translates the error into text suitable for a snackbar message.
    ///
    /// Validation and auth messages are already user-phrased and pass
    /// through; store and not-found details stay in the logs and are
    /// replaced by a generic line.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Auth(msg) => msg.clone(),
            AppError::NotFound(_) => "The requested task no longer exists.".to_string(),
            AppError::Store(_) => "Something went wrong while syncing your tasks.".to_string(),
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` is mapped to `AppError::NotFound`, while other
/// database errors become `AppError::Store`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::Store(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error.to_string())
    }
}
