use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use validator::{Validate, ValidationError};

/// Opaque identifier for a task within one owner's task set.
///
/// The local relational store assigns integer keys and the remote document
/// store assigns string keys; both are carried here as text so callers never
/// depend on which backend produced them. A backend that cannot interpret an
/// id simply treats the task as missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Input structure for creating or fully replacing a task.
/// Contains validation rules for its fields.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task. Must not be blank; a whitespace-only title
    /// counts as blank.
    #[validate(custom = "validate_title_not_blank")]
    pub title: String,

    /// An optional description for the task.
    pub description: Option<String>,
}

impl TaskInput {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }
}

fn validate_title_not_blank(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::from("The title cannot be empty."));
        return Err(error);
    }
    Ok(())
}

/// A task as stored by either backend and observed by the list screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the owner's task set. Store-assigned on
    /// first persist.
    pub id: TaskId,
    /// The title of the task. Never persisted empty.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// Whether the task has been completed. Defaults to false on creation.
    pub completed: bool,
}

/// Wire form of a task in the remote document store.
///
/// Field names match the documents under `owners/{ownerId}/tasks/{taskId}`:
/// `title`, `description`, `isChecked`. Every field is defaulted on decode so
/// partially-written documents still load; tolerating a missing `title` this
/// way is lossy, and the remote adapter logs it as a data-integrity concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "isChecked", default)]
    pub is_checked: bool,
}

impl TaskDocument {
    pub fn new(title: impl Into<String>, description: Option<String>, is_checked: bool) -> Self {
        Self {
            title: title.into(),
            description,
            is_checked,
        }
    }

    /// Materializes the document as a `Task` under the given id.
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            completed: self.is_checked,
        }
    }
}
