//! Local relational task store.
//!
//! Backs the repository contract with a SQLite table keyed by an
//! auto-assigned integer id. Change observation re-runs the list query
//! whenever a revision counter bumps; every committed write bumps it, so all
//! observers of the same store instance see each other's mutations. The
//! process-wide handle is created at most once through [`SqliteTaskRepository::global`].

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Task, TaskId, TaskInput};
use crate::repository::{TaskListStream, TaskRepository};
use async_trait::async_trait;
use futures::stream;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use tokio::sync::{watch, OnceCell};
use validator::Validate;

static GLOBAL: OnceCell<SqliteTaskRepository> = OnceCell::const_new();

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    completed BOOLEAN NOT NULL DEFAULT 0
)";

const TASK_SELECT_SQL: &str = "SELECT id, title, description, completed FROM tasks";

#[derive(FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Task {
        Task {
            id: row.id.into(),
            title: row.title,
            description: row.description,
            completed: row.completed,
        }
    }
}

/// SQLite-backed task repository.
///
/// Cheap to clone; clones share the pool and the change notifier.
#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
    revision: watch::Sender<u64>,
}

impl SqliteTaskRepository {
    /// The process-wide store, opened lazily from [`Config::from_env`] on
    /// first access. Concurrent first callers all wait on the same
    /// initialization; exactly one database handle is ever created.
    pub async fn global() -> Result<&'static SqliteTaskRepository, AppError> {
        GLOBAL
            .get_or_try_init(|| async { Self::connect(&Config::from_env().database_url).await })
            .await
    }

    /// Opens (and if needed creates) the task table at the given SQLite URL.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        // A single never-recycled connection keeps writes in submission
        // order and lets in-memory databases retain their contents across
        // acquisitions.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;

        let (revision, _) = watch::channel(0u64);
        Ok(Self { pool, revision })
    }

    /// Local ids are the integer table key; anything else matches no row.
    fn parse_id(id: &TaskId) -> Option<i64> {
        id.as_str().parse().ok()
    }

    fn notify_changed(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

async fn fetch_all(pool: &SqlitePool) -> Result<Vec<Task>, AppError> {
    let rows = sqlx::query_as::<_, TaskRow>(&format!("{} ORDER BY id", TASK_SELECT_SQL))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Task::from).collect())
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn insert(&self, input: TaskInput, id: Option<TaskId>) -> Result<(), AppError> {
        input.validate()?;

        // Full replace keeps the completed flag; an id that matches no row
        // falls through to a fresh insert with a store-assigned key.
        if let Some(row_id) = id.as_ref().and_then(Self::parse_id) {
            let updated = sqlx::query("UPDATE tasks SET title = ?, description = ? WHERE id = ?")
                .bind(&input.title)
                .bind(&input.description)
                .bind(row_id)
                .execute(&self.pool)
                .await?;
            if updated.rows_affected() > 0 {
                self.notify_changed();
                return Ok(());
            }
        }

        sqlx::query("INSERT INTO tasks (title, description, completed) VALUES (?, ?, 0)")
            .bind(&input.title)
            .bind(&input.description)
            .execute(&self.pool)
            .await?;
        self.notify_changed();
        Ok(())
    }

    async fn update_completed(&self, id: &TaskId, completed: bool) -> Result<(), AppError> {
        let Some(row_id) = Self::parse_id(id) else {
            return Ok(());
        };

        let updated = sqlx::query("UPDATE tasks SET completed = ? WHERE id = ?")
            .bind(completed)
            .bind(row_id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() > 0 {
            self.notify_changed();
        }
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), AppError> {
        let Some(row_id) = Self::parse_id(id) else {
            return Ok(());
        };

        let deleted = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(row_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() > 0 {
            self.notify_changed();
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &TaskId) -> Result<Option<Task>, AppError> {
        let Some(row_id) = Self::parse_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, TaskRow>(&format!("{} WHERE id = ?", TASK_SELECT_SQL))
            .bind(row_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Task::from))
    }

    fn observe_all(&self) -> TaskListStream {
        struct Observe {
            pool: SqlitePool,
            revision: watch::Receiver<u64>,
            primed: bool,
        }

        let state = Observe {
            pool: self.pool.clone(),
            revision: self.revision.subscribe(),
            primed: false,
        };

        Box::pin(stream::unfold(Some(state), |state| async move {
            let mut state = state?;
            // First pass emits the current snapshot without waiting; after
            // that, wait for a revision bump. Bursty writes coalesce.
            if state.primed && state.revision.changed().await.is_err() {
                return None;
            }
            state.primed = true;

            match fetch_all(&state.pool).await {
                Ok(tasks) => Some((Ok(tasks), Some(state))),
                // A failed re-query terminates the stream after the error.
                Err(error) => Some((Err(error), None)),
            }
        }))
    }
}
