//! Remote document task store.
//!
//! Backs the repository contract with per-owner documents living under
//! `owners/{ownerId}/tasks/{taskId}` in a hierarchical remote store. The
//! store itself is reached through [`DocumentClient`], the opaque SDK
//! boundary; this adapter contributes the owner scoping (taken live from the
//! auth session), the wire decoding, and the contract's no-op semantics.

use crate::auth::{AuthSession, OwnerId};
use crate::error::AppError;
use crate::models::{Task, TaskDocument, TaskId, TaskInput};
use crate::repository::{TaskListStream, TaskRepository};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

/// One snapshot of an owner's task collection: `(document id, fields)` pairs.
pub type DocumentSnapshot = Vec<(String, Value)>;

/// Live server-pushed subscription to an owner's task collection.
///
/// The producer yields a snapshot for the current contents promptly, then
/// one per server-side change. A transport or permission failure is yielded
/// as `Err` and ends the stream. Dropping the stream releases the channel.
pub type DocumentStream = BoxStream<'static, Result<DocumentSnapshot, AppError>>;

/// Opaque boundary to the remote document SDK.
///
/// Implementations own the transport and the `owners/{ownerId}/tasks/...`
/// path layout; the repository never sees connection details. The crate
/// ships [`crate::repository::memory::MemoryDocumentClient`] for tests and
/// offline composition.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Creates a document with a server-assigned id and returns that id.
    async fn add(&self, owner: &OwnerId, fields: Value) -> Result<String, AppError>;

    /// Writes the full document at `id`, creating it if absent.
    async fn set(&self, owner: &OwnerId, id: &str, fields: Value) -> Result<(), AppError>;

    /// Updates one field of an existing document. Fails with
    /// [`AppError::NotFound`] if the document does not exist.
    async fn update_field(
        &self,
        owner: &OwnerId,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), AppError>;

    /// Reads the document at `id`, `None` if absent.
    async fn get(&self, owner: &OwnerId, id: &str) -> Result<Option<Value>, AppError>;

    /// Deletes the document at `id`. Deleting an absent document succeeds.
    async fn delete(&self, owner: &OwnerId, id: &str) -> Result<(), AppError>;

    /// Opens a listen channel on the owner's task collection.
    fn listen(&self, owner: &OwnerId) -> DocumentStream;
}

/// Decodes one remote document into a [`Task`].
///
/// Optional fields default (`description` empty, `isChecked` false). A
/// missing `title` also defaults, to the empty string, but a task title is
/// mandatory, so the hole is flagged in the log before being papered over.
/// This defaulting is lossy.
fn decode_document(id: &str, fields: &Value) -> Task {
    if fields.get("title").is_none() {
        log::warn!(
            "task document {} has no title field; defaulting to empty (lossy)",
            id
        );
    }

    Task {
        id: TaskId::new(id),
        title: fields
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: fields
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        completed: fields
            .get("isChecked")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn encode_document(document: &TaskDocument) -> Result<Value, AppError> {
    serde_json::to_value(document).map_err(|error| AppError::Store(error.to_string()))
}

/// Remote-store-backed task repository scoped to the signed-in owner.
pub struct RemoteTaskRepository {
    client: Arc<dyn DocumentClient>,
    session: Arc<AuthSession>,
}

impl RemoteTaskRepository {
    pub fn new(client: Arc<dyn DocumentClient>, session: Arc<AuthSession>) -> Self {
        Self { client, session }
    }

    /// The owner scope for every operation. Identity is read live from the
    /// session, so a sign-out immediately cuts off new operations.
    fn owner(&self) -> Result<OwnerId, AppError> {
        self.session
            .identity()
            .map(|identity| identity.owner_id)
            .ok_or_else(|| AppError::Auth("No owner is signed in.".to_string()))
    }
}

#[async_trait]
impl TaskRepository for RemoteTaskRepository {
    async fn insert(&self, input: TaskInput, id: Option<TaskId>) -> Result<(), AppError> {
        input.validate()?;
        let owner = self.owner()?;

        match id {
            Some(id) => {
                // Full replace keeps the completed flag, so read the prior
                // document first; replacing a vanished id creates the task
                // fresh at that path.
                let completed = self
                    .client
                    .get(&owner, id.as_str())
                    .await?
                    .and_then(|fields| fields.get("isChecked").and_then(Value::as_bool))
                    .unwrap_or(false);
                let document = TaskDocument::new(input.title, input.description, completed);
                self.client
                    .set(&owner, id.as_str(), encode_document(&document)?)
                    .await
            }
            None => {
                let document = TaskDocument::new(input.title, input.description, false);
                self.client
                    .add(&owner, encode_document(&document)?)
                    .await
                    .map(|_server_id| ())
            }
        }
    }

    async fn update_completed(&self, id: &TaskId, completed: bool) -> Result<(), AppError> {
        let owner = self.owner()?;
        match self
            .client
            .update_field(&owner, id.as_str(), "isChecked", Value::Bool(completed))
            .await
        {
            // Contract: a missing id is a benign no-op.
            Err(AppError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn delete(&self, id: &TaskId) -> Result<(), AppError> {
        let owner = self.owner()?;
        match self.client.delete(&owner, id.as_str()).await {
            Err(AppError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn get_by_id(&self, id: &TaskId) -> Result<Option<Task>, AppError> {
        let owner = self.owner()?;
        let fields = self.client.get(&owner, id.as_str()).await?;
        Ok(fields.map(|fields| decode_document(id.as_str(), &fields)))
    }

    fn observe_all(&self) -> TaskListStream {
        // Establishing the subscription needs an owner; without one the
        // stream fails immediately instead of pretending the set is empty.
        let owner = match self.owner() {
            Ok(owner) => owner,
            Err(error) => return Box::pin(stream::once(async move { Err(error) })),
        };

        let documents = self.client.listen(&owner);
        Box::pin(documents.map(|snapshot| {
            snapshot.map(|documents| {
                documents
                    .into_iter()
                    .map(|(id, fields)| decode_document(&id, &fields))
                    .collect()
            })
        }))
    }
}
