#![doc = "The `taskloop` library crate."]
#![doc = ""]
#![doc = "This crate is the reactive core of a personal task-list application: the"]
#![doc = "storage-agnostic task repository with its two backends (a local SQLite"]
#![doc = "table and a remote per-owner document store), the authentication state"]
#![doc = "machine, the one-shot UI event channel, and the list/detail view-states"]
#![doc = "that turn storage mutations into live screen updates. Screen rendering"]
#![doc = "and the concrete network SDKs stay outside; they plug in through the"]
#![doc = "`DocumentClient` and `AuthBackend` boundary traits."]

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod navigation;
pub mod repository;
pub mod viewstate;

// Re-export the types a composition root wires together.
pub use auth::{AuthBackend, AuthSession, AuthState, Identity, OwnerId};
pub use config::Config;
pub use error::AppError;
pub use events::{UiEvent, UiEventChannel};
pub use models::{Task, TaskId, TaskInput};
pub use navigation::{NavigationGate, Screen};
pub use repository::local::SqliteTaskRepository;
pub use repository::memory::MemoryDocumentClient;
pub use repository::remote::{DocumentClient, RemoteTaskRepository};
pub use repository::{TaskListStream, TaskRepository};
pub use viewstate::{DetailEvent, DetailViewState, ListEvent, ListViewState};
