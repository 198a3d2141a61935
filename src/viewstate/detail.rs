//! Add/edit screen view-state.
//!
//! Holds the two editable fields. Built with an id, it loads that task once
//! and populates them; built without, they start blank. Nothing is persisted
//! until a save intent arrives.

use crate::events::{UiEvent, UiEventChannel};
use crate::models::{TaskId, TaskInput};
use crate::repository::TaskRepository;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

/// The in-progress edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub title: String,
    pub description: Option<String>,
}

/// Intents the add/edit screen can submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailEvent {
    TitleChanged(String),
    DescriptionChanged(Option<String>),
    Save,
}

/// View-state behind the add/edit screen.
pub struct DetailViewState {
    id: Option<TaskId>,
    repository: Arc<dyn TaskRepository>,
    fields: watch::Sender<DetailFields>,
    events: Arc<UiEventChannel>,
    jobs: Mutex<JoinSet<()>>,
}

impl DetailViewState {
    /// Must be called from within a tokio runtime when `id` is given (the
    /// one-time load is dispatched immediately).
    pub fn new(repository: Arc<dyn TaskRepository>, id: Option<TaskId>) -> Self {
        let (fields, _) = watch::channel(DetailFields::default());
        let state = Self {
            id,
            repository,
            fields,
            events: Arc::new(UiEventChannel::new()),
            jobs: Mutex::new(JoinSet::new()),
        };

        if let Some(id) = state.id.clone() {
            let repository = Arc::clone(&state.repository);
            let fields = state.fields.clone();
            state.dispatch(async move {
                match repository.get_by_id(&id).await {
                    Ok(Some(task)) => {
                        fields.send_replace(DetailFields {
                            title: task.title,
                            description: task.description,
                        });
                    }
                    // A vanished id behaves like a fresh add.
                    Ok(None) => {}
                    Err(error) => {
                        log::error!("loading task {} failed: {}", id, error);
                    }
                }
            });
        }

        state
    }

    /// Replay-latest view of the editable fields.
    pub fn fields(&self) -> watch::Receiver<DetailFields> {
        self.fields.subscribe()
    }

    /// One-shot events for the add/edit screen.
    pub fn events(&self) -> mpsc::UnboundedReceiver<UiEvent> {
        self.events.subscribe()
    }

    /// Spawns a view-state-scoped task, first reaping whatever already
    /// finished so the set stays bounded by in-flight work.
    fn dispatch(&self, task: impl Future<Output = ()> + Send + 'static) {
        let mut jobs = self.jobs.lock().unwrap();
        while jobs.try_join_next().is_some() {}
        jobs.spawn(task);
    }

    /// Synchronous intent submission.
    pub fn on_event(&self, event: DetailEvent) {
        match event {
            DetailEvent::TitleChanged(title) => {
                self.fields.send_modify(|fields| fields.title = title);
            }
            DetailEvent::DescriptionChanged(description) => {
                self.fields.send_modify(|fields| fields.description = description);
            }
            DetailEvent::Save => {
                self.save();
            }
        }
    }

    /// Persists the current fields: create without an id, full replace with
    /// one. A blank title only produces a message; nothing reaches the
    /// repository. Success emits a one-shot navigate-back.
    fn save(&self) {
        let DetailFields { title, description } = self.fields.borrow().clone();

        if title.trim().is_empty() {
            self.events
                .send(UiEvent::ShowMessage("The title cannot be empty.".to_string()));
            return;
        }

        let repository = Arc::clone(&self.repository);
        let events = Arc::clone(&self.events);
        let id = self.id.clone();
        self.dispatch(async move {
            match repository.insert(TaskInput::new(title, description), id).await {
                Ok(()) => {
                    events.send(UiEvent::NavigateBack);
                }
                Err(error) => {
                    log::error!("saving task failed: {}", error);
                    events.send(UiEvent::ShowMessage(error.user_message()));
                }
            }
        });
    }
}
