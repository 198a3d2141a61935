//! In-process document store.
//!
//! [`MemoryDocumentClient`] implements the full [`DocumentClient`] boundary
//! against process memory: per-owner document maps, server-assigned ids, and
//! listen channels with real registration and release accounting. It exists
//! so the remote adapter can be composed and tested without a network SDK,
//! including its failure paths ([`MemoryDocumentClient::fail_listeners`]).

use crate::auth::OwnerId;
use crate::error::AppError;
use crate::repository::remote::{DocumentClient, DocumentSnapshot, DocumentStream};
use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

struct Collection {
    documents: BTreeMap<String, Value>,
    // Listeners wake on every committed change; a set error is terminal.
    revision: watch::Sender<u64>,
    error: Option<AppError>,
}

impl Collection {
    fn new() -> Self {
        let (revision, _) = watch::channel(0u64);
        Self {
            documents: BTreeMap::new(),
            revision,
            error: None,
        }
    }

    fn changed(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn snapshot(&self) -> DocumentSnapshot {
        self.documents
            .iter()
            .map(|(id, fields)| (id.clone(), fields.clone()))
            .collect()
    }
}

/// Memory-backed implementation of the remote document boundary.
#[derive(Clone, Default)]
pub struct MemoryDocumentClient {
    owners: Arc<Mutex<HashMap<OwnerId, Collection>>>,
}

impl MemoryDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collection<T>(&self, owner: &OwnerId, f: impl FnOnce(&mut Collection) -> T) -> T {
        let mut owners = self.owners.lock().unwrap();
        let collection = owners.entry(owner.clone()).or_insert_with(Collection::new);
        f(collection)
    }

    /// Terminates every active listen channel on the owner's collection with
    /// the given error, the way a revoked permission or a dropped connection
    /// would. Later subscriptions fail immediately as well.
    pub fn fail_listeners(&self, owner: &OwnerId, error: AppError) {
        self.with_collection(owner, |collection| {
            collection.error = Some(error);
            collection.changed();
        });
    }

    /// Number of live listen channels on the owner's collection.
    pub fn listener_count(&self, owner: &OwnerId) -> usize {
        self.with_collection(owner, |collection| collection.revision.receiver_count())
    }
}

#[async_trait]
impl DocumentClient for MemoryDocumentClient {
    async fn add(&self, owner: &OwnerId, fields: Value) -> Result<String, AppError> {
        let id = Uuid::new_v4().simple().to_string();
        self.with_collection(owner, |collection| {
            collection.documents.insert(id.clone(), fields);
            collection.changed();
        });
        Ok(id)
    }

    async fn set(&self, owner: &OwnerId, id: &str, fields: Value) -> Result<(), AppError> {
        self.with_collection(owner, |collection| {
            collection.documents.insert(id.to_string(), fields);
            collection.changed();
        });
        Ok(())
    }

    async fn update_field(
        &self,
        owner: &OwnerId,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), AppError> {
        self.with_collection(owner, |collection| {
            let Some(document) = collection.documents.get_mut(id) else {
                return Err(AppError::NotFound(format!("no document {}", id)));
            };
            let Some(fields) = document.as_object_mut() else {
                return Err(AppError::Store(format!("document {} is not an object", id)));
            };
            fields.insert(field.to_string(), value);
            collection.changed();
            Ok(())
        })
    }

    async fn get(&self, owner: &OwnerId, id: &str) -> Result<Option<Value>, AppError> {
        Ok(self.with_collection(owner, |collection| collection.documents.get(id).cloned()))
    }

    async fn delete(&self, owner: &OwnerId, id: &str) -> Result<(), AppError> {
        self.with_collection(owner, |collection| {
            if collection.documents.remove(id).is_some() {
                collection.changed();
            }
        });
        Ok(())
    }

    fn listen(&self, owner: &OwnerId) -> DocumentStream {
        struct Listen {
            owners: Arc<Mutex<HashMap<OwnerId, Collection>>>,
            owner: OwnerId,
            revision: watch::Receiver<u64>,
            primed: bool,
        }

        let revision = self.with_collection(owner, |collection| collection.revision.subscribe());
        let state = Listen {
            owners: Arc::clone(&self.owners),
            owner: owner.clone(),
            revision,
            primed: false,
        };

        Box::pin(stream::unfold(Some(state), |state| async move {
            let mut state = state?;
            if state.primed && state.revision.changed().await.is_err() {
                return None;
            }
            state.primed = true;

            let item = {
                let owners = state.owners.lock().unwrap();
                let collection = owners.get(&state.owner)?;
                match &collection.error {
                    Some(error) => Err(error.clone()),
                    None => Ok(collection.snapshot()),
                }
            };

            match item {
                // A terminal error ends the stream and releases the channel.
                Err(error) => Some((Err(error), None)),
                Ok(snapshot) => Some((Ok(snapshot), Some(state))),
            }
        }))
    }
}
