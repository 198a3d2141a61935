//! Storage-agnostic task persistence.
//!
//! [`TaskRepository`] is the contract both backends satisfy: a SQLite table
//! on disk ([`local::SqliteTaskRepository`]) or per-owner documents in a
//! remote store ([`remote::RemoteTaskRepository`]). The concrete
//! implementation is selected once at composition time; the view-states only
//! ever see `Arc<dyn TaskRepository>`.

pub mod local;
pub mod memory;
pub mod remote;

use crate::error::AppError;
use crate::models::{Task, TaskId, TaskInput};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Live stream of full snapshots of the owner's task set.
///
/// An `Err` item is terminal: the underlying channel failed and the stream
/// ends after emitting it. Consumers resubscribe for a fresh stream.
pub type TaskListStream = BoxStream<'static, Result<Vec<Task>, AppError>>;

/// Repository contract for task persistence and change observation.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Creates a task, or fully replaces the task with the given id.
    ///
    /// Replacing updates `title` and `description`; the prior `completed`
    /// value is preserved (editing a task's text does not un-complete it;
    /// both backends implement this policy). Replacing an id that matches
    /// nothing creates a fresh task. Blank titles, including whitespace-only
    /// ones, are rejected with [`AppError::Validation`] and never reach the
    /// store.
    async fn insert(
        &self,
        input: TaskInput,
        id: Option<TaskId>,
    ) -> Result<(), AppError>;

    /// Sets only the `completed` flag. A missing id is a no-op, not an error.
    async fn update_completed(&self, id: &TaskId, completed: bool) -> Result<(), AppError>;

    /// Removes the task. A missing id is a no-op, not an error.
    async fn delete(&self, id: &TaskId) -> Result<(), AppError>;

    /// Point lookup. Returns `None` for a missing id, never an error.
    async fn get_by_id(&self, id: &TaskId) -> Result<Option<Task>, AppError>;

    /// Subscribes to the owner's task set.
    ///
    /// Emits an initial snapshot promptly, then a new snapshot after every
    /// mutation that affects the set, including mutations made through
    /// other handles on the same store. Bursts of writes may coalesce into
    /// one emission; after a quiescent period the latest snapshot reflects
    /// all completed writes. Dropping the stream releases the underlying
    /// listener.
    fn observe_all(&self) -> TaskListStream;
}
