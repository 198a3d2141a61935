//! List screen view-state.
//!
//! Holds the replay-latest "current task list" value and accepts the list
//! screen's intents. The upstream repository subscription is started lazily
//! when the first observer attaches and torn down a grace period after the
//! last one detaches, so transient re-attachments (a recomposing UI) do not
//! churn the store's listen channel.

use crate::events::{UiEvent, UiEventChannel};
use crate::models::{Task, TaskId};
use crate::navigation::Screen;
use crate::repository::TaskRepository;
use futures::StreamExt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

/// Intents the list screen can submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// Remove the task.
    Delete(TaskId),
    /// Set the task's completed flag.
    CompleteChanged(TaskId, bool),
    /// Open the add/edit screen, blank or for an existing task. Emits a
    /// navigation event; the repository is not touched.
    AddEdit(Option<TaskId>),
    /// Ask the auth session to end the session. Emits a one-shot event.
    SignOut,
}

struct Upstream {
    observers: usize,
    forward: Option<JoinHandle<()>>,
    teardown: Option<JoinHandle<()>>,
}

/// View-state behind the task list screen.
///
/// All persistence intents are dispatched onto tasks scoped to this value;
/// dropping it aborts anything still in flight along with the upstream
/// subscription.
pub struct ListViewState {
    repository: Arc<dyn TaskRepository>,
    tasks: watch::Sender<Vec<Task>>,
    events: Arc<UiEventChannel>,
    grace: Duration,
    upstream: Arc<Mutex<Upstream>>,
    jobs: Mutex<JoinSet<()>>,
}

impl ListViewState {
    /// `grace` is how long the upstream subscription survives the last
    /// detaching observer (see `Config::observe_grace`).
    pub fn new(repository: Arc<dyn TaskRepository>, grace: Duration) -> Self {
        let (tasks, _) = watch::channel(Vec::new());
        Self {
            repository,
            tasks,
            events: Arc::new(UiEventChannel::new()),
            grace,
            upstream: Arc::new(Mutex::new(Upstream {
                observers: 0,
                forward: None,
                teardown: None,
            })),
            jobs: Mutex::new(JoinSet::new()),
        }
    }

    /// Attaches an observer to the task list. The first attachment starts
    /// the upstream subscription (or restarts it after a stream failure);
    /// a pending teardown is cancelled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn observe(&self) -> TaskListObserver {
        let mut upstream = self.upstream.lock().unwrap();
        if let Some(teardown) = upstream.teardown.take() {
            teardown.abort();
        }
        upstream.observers += 1;

        let stale = upstream
            .forward
            .as_ref()
            .map_or(true, JoinHandle::is_finished);
        if stale {
            upstream.forward = Some(self.spawn_forward());
        }
        drop(upstream);

        TaskListObserver {
            receiver: self.tasks.subscribe(),
            upstream: Arc::clone(&self.upstream),
            grace: self.grace,
        }
    }

    /// One-shot events for the list screen (navigation, messages, sign-out).
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

    /// Synchronous intent submission. Persistence intents are dispatched
    /// asynchronously and never block the caller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_event(&self, event: ListEvent) {
        match event {
            ListEvent::Delete(id) => {
                let repository = Arc::clone(&self.repository);
                let events = Arc::clone(&self.events);
                self.dispatch(async move {
                    if let Err(error) = repository.delete(&id).await {
                        log::error!("deleting task {} failed: {}", id, error);
                        events.send(UiEvent::ShowMessage(error.user_message()));
                    }
                });
            }
            ListEvent::CompleteChanged(id, completed) => {
                let repository = Arc::clone(&self.repository);
                let events = Arc::clone(&self.events);
                self.dispatch(async move {
                    if let Err(error) = repository.update_completed(&id, completed).await {
                        log::error!("updating task {} failed: {}", id, error);
                        events.send(UiEvent::ShowMessage(error.user_message()));
                    }
                });
            }
            ListEvent::AddEdit(id) => {
                self.events.send(UiEvent::Navigate(Screen::AddEdit { id }));
            }
            ListEvent::SignOut => {
                self.events.send(UiEvent::SignOut);
            }
        }
    }

    fn spawn_forward(&self) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let tasks = self.tasks.clone();
        let events = Arc::clone(&self.events);

        tokio::spawn(async move {
            let mut snapshots = repository.observe_all();
            while let Some(snapshot) = snapshots.next().await {
                match snapshot {
                    Ok(list) => {
                        tasks.send_replace(list);
                    }
                    Err(error) => {
                        // Terminal stream failure: surface it, keep the last
                        // snapshot, and let the next attach resubscribe.
                        log::error!("task stream failed: {}", error);
                        events.send(UiEvent::ShowMessage(error.user_message()));
                        break;
                    }
                }
            }
        })
    }
}

impl Drop for ListViewState {
    fn drop(&mut self) {
        let mut upstream = self.upstream.lock().unwrap();
        if let Some(forward) = upstream.forward.take() {
            forward.abort();
        }
        if let Some(teardown) = upstream.teardown.take() {
            teardown.abort();
        }
    }
}

/// Live handle onto the task list. The latest snapshot is always available
/// through [`TaskListObserver::current`]; dropping the observer starts the
/// grace-period countdown once it was the last one.
pub struct TaskListObserver {
    receiver: watch::Receiver<Vec<Task>>,
    upstream: Arc<Mutex<Upstream>>,
    grace: Duration,
}

impl TaskListObserver {
    /// The latest task list snapshot.
    pub fn current(&self) -> Vec<Task> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next snapshot. Returns `false` once the view-state is
    /// gone and no further snapshots can arrive.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

impl Drop for TaskListObserver {
    fn drop(&mut self) {
        let mut upstream = self.upstream.lock().unwrap();
        upstream.observers = upstream.observers.saturating_sub(1);
        if upstream.observers > 0 {
            return;
        }

        let shared = Arc::clone(&self.upstream);
        let grace = self.grace;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                upstream.teardown = Some(handle.spawn(async move {
                    tokio::time::sleep(grace).await;
                    let mut upstream = shared.lock().unwrap();
                    if upstream.observers == 0 {
                        if let Some(forward) = upstream.forward.take() {
                            forward.abort();
                        }
                    }
                }));
            }
            // No runtime to count down the grace period on; release now.
            Err(_) => {
                if let Some(forward) = upstream.forward.take() {
                    forward.abort();
                }
            }
        }
    }
}
