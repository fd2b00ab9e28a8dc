//! SQLite-backed task store.
//!
//! One flat `tasks` table, WAL journal mode, schema managed by
//! `sqlx::migrate!`. All methods return `anyhow::Result`; the REST layer
//! translates failures into the HTTP error taxonomy.

use anyhow::{Context as _, Result};
use chrono::{SecondsFormat, Utc};
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

use crate::tasks::{generate_task_id, NewTask, TaskPatch, TaskStats};

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the server indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Queries slower than this are logged at WARN level.
const SLOW_QUERY_THRESHOLD: std::time::Duration = std::time::Duration::from_secs(1);

/// Execute a future with the standard query timeout.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// Current time as fixed-width RFC 3339 UTC (microsecond precision).
/// Fixed width keeps lexicographic order equal to chronological order, which
/// `ORDER BY created_at DESC` relies on.
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A persisted task row. `status` is derived, never stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TaskRow> for crate::tasks::Task {
    fn from(row: TaskRow) -> Self {
        let status = crate::tasks::TaskStatus::from_completed(row.completed);
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
            status,
        }
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("taskd.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true)
                .log_slow_statements(log::LevelFilter::Warn, SLOW_QUERY_THRESHOLD);

        let pool = SqlitePool::connect_with(opts).await?;
        sqlx::migrate!("src/storage/migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(Self { pool })
    }

    /// All tasks, most recently created first.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM tasks ORDER BY created_at DESC, id DESC")
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    /// Aggregate counters in a single pass. An empty table yields all zeros.
    pub async fn task_stats(&self) -> Result<TaskStats> {
        with_timeout(async {
            let (total, completed): (i64, i64) = sqlx::query_as(
                "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks",
            )
            .fetch_one(&self.pool)
            .await?;
            Ok(TaskStats {
                total_tasks: total,
                completed_tasks: completed,
                pending_tasks: total - completed,
            })
        })
        .await
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<TaskRow>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<TaskRow> {
        let id = generate_task_id();
        let now = now_rfc3339();
        sqlx::query(
            "INSERT INTO tasks (id, title, description, completed, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.completed)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_task(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("task not found after insert"))
    }

    /// Apply a partial update. Unset fields keep their current value
    /// (COALESCE against a NULL bind). Returns `None` if the id does not
    /// resolve.
    pub async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<TaskRow>> {
        let now = now_rfc3339();
        let result = sqlx::query(
            "UPDATE tasks SET
                 title = COALESCE(?, title),
                 description = COALESCE(?, description),
                 completed = COALESCE(?, completed),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.completed)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_task(id).await
    }

    /// Atomically flip `completed` for one task. Returns `None` if the id
    /// does not resolve.
    pub async fn toggle_task(&self, id: &str) -> Result<Option<TaskRow>> {
        let now = now_rfc3339();
        let result =
            sqlx::query("UPDATE tasks SET completed = NOT completed, updated_at = ? WHERE id = ?")
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_task(id).await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete_task(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn make_storage(dir: &TempDir) -> Storage {
        Storage::new(dir.path()).await.unwrap()
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            completed: false,
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = make_storage(&dir).await;

        let created = storage.create_task(&new_task("Buy milk")).await.unwrap();
        assert_eq!(created.title, "Buy milk");
        assert_eq!(created.description, "");
        assert!(!created.completed);
        assert_eq!(created.created_at, created.updated_at);
        assert!(crate::tasks::is_valid_task_id(&created.id));

        let fetched = storage.get_task(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, "Buy milk");
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let dir = TempDir::new().unwrap();
        let storage = make_storage(&dir).await;

        let first = storage.create_task(&new_task("first")).await.unwrap();
        let second = storage.create_task(&new_task("second")).await.unwrap();
        let third = storage.create_task(&new_task("third")).await.unwrap();

        let listed = storage.list_tasks().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![&third.id, &second.id, &first.id]);
    }

    #[tokio::test]
    async fn stats_empty_and_counted() {
        let dir = TempDir::new().unwrap();
        let storage = make_storage(&dir).await;

        let stats = storage.task_stats().await.unwrap();
        assert_eq!((stats.total_tasks, stats.completed_tasks, stats.pending_tasks), (0, 0, 0));

        storage.create_task(&new_task("a")).await.unwrap();
        let done = storage.create_task(&new_task("b")).await.unwrap();
        storage.toggle_task(&done.id).await.unwrap();

        let stats = storage.task_stats().await.unwrap();
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(stats.total_tasks, stats.completed_tasks + stats.pending_tasks);
    }

    #[tokio::test]
    async fn toggle_flips_and_bumps_updated_at() {
        let dir = TempDir::new().unwrap();
        let storage = make_storage(&dir).await;

        let created = storage.create_task(&new_task("toggle me")).await.unwrap();
        let once = storage.toggle_task(&created.id).await.unwrap().unwrap();
        assert!(once.completed);
        assert!(once.updated_at > created.updated_at);

        let twice = storage.toggle_task(&created.id).await.unwrap().unwrap();
        assert!(!twice.completed);
        assert!(twice.updated_at > once.updated_at);
        assert_eq!(twice.created_at, created.created_at);
    }

    #[tokio::test]
    async fn partial_update_leaves_unset_fields() {
        let dir = TempDir::new().unwrap();
        let storage = make_storage(&dir).await;

        let created = storage
            .create_task(&NewTask {
                title: "original".to_string(),
                description: "keep me".to_string(),
                completed: false,
            })
            .await
            .unwrap();

        let patch = TaskPatch {
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = storage.update_task(&created.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.description, "keep me");
        assert!(!updated.completed);
        assert!(updated.updated_at > created.updated_at);

        // Explicit empty description clears the field.
        let patch = TaskPatch {
            description: Some(String::new()),
            ..Default::default()
        };
        let cleared = storage.update_task(&created.id, &patch).await.unwrap().unwrap();
        assert_eq!(cleared.title, "renamed");
        assert_eq!(cleared.description, "");
    }

    #[tokio::test]
    async fn missing_ids_resolve_to_none() {
        let dir = TempDir::new().unwrap();
        let storage = make_storage(&dir).await;
        let id = "507f1f77bcf86cd799439011";

        assert!(storage.get_task(id).await.unwrap().is_none());
        assert!(storage.toggle_task(id).await.unwrap().is_none());
        assert!(storage
            .update_task(id, &TaskPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(!storage.delete_task(id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let dir = TempDir::new().unwrap();
        let storage = make_storage(&dir).await;

        let created = storage.create_task(&new_task("ephemeral")).await.unwrap();
        assert!(storage.delete_task(&created.id).await.unwrap());
        assert!(storage.get_task(&created.id).await.unwrap().is_none());
        assert!(!storage.delete_task(&created.id).await.unwrap());
    }
}
