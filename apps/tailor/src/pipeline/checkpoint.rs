//! Durable per-session checkpoints of the Pipeline Record (SQLite).
//!
//! Append-only: every completed stage inserts a new row; nothing is updated.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use thiserror::Error;
use tracing::info;

use super::record::PipelineRecord;
use super::runner::PipelineStage;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown stage '{0}' in checkpoint")]
    UnknownStage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, FromRow)]
struct CheckpointRow {
    id: i64,
    session_id: String,
    stage: String,
    record: String,
    created_at: DateTime<Utc>,
}

/// A stored record and the stage that produced it.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub id: i64,
    pub session_id: String,
    pub stage: PipelineStage,
    pub record: PipelineRecord,
    pub created_at: DateTime<Utc>,
}

/// One line of a session's history (record body omitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointSummary {
    pub id: i64,
    pub stage: PipelineStage,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CheckpointRow> for Checkpoint {
    type Error = CheckpointError;

    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        let stage = row
            .stage
            .parse::<PipelineStage>()
            .map_err(|_| CheckpointError::UnknownStage(row.stage.clone()))?;
        Ok(Checkpoint {
            id: row.id,
            session_id: row.session_id,
            stage,
            record: serde_json::from_str(&row.record)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct CheckpointStore {
    pool: SqlitePool,
}

/// Creates the parent directory of a file-backed SQLite URL.
fn ensure_database_dir(url: &str) -> Result<(), CheckpointError> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl CheckpointStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    pub async fn connect(url: &str) -> Result<Self, CheckpointError> {
        info!("Opening checkpoint store at {url}");
        ensure_database_dir(url)?;
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CheckpointError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_checkpoints (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  TEXT NOT NULL,
                stage       TEXT NOT NULL,
                record      TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pipeline_checkpoints_session \
             ON pipeline_checkpoints (session_id, id)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persists `record` as the result of `stage`.
    pub async fn save(
        &self,
        session_id: &str,
        stage: PipelineStage,
        record: &PipelineRecord,
    ) -> Result<(), CheckpointError> {
        let body = serde_json::to_string(record)?;
        sqlx::query(
            "INSERT INTO pipeline_checkpoints (session_id, stage, record, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(stage.as_str())
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent checkpoint of a session.
    pub async fn load_latest(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            "SELECT id, session_id, stage, record, created_at FROM pipeline_checkpoints \
             WHERE session_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Checkpoint::try_from).transpose()
    }

    /// Every checkpoint of a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<CheckpointSummary>, CheckpointError> {
        let rows: Vec<(i64, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, stage, created_at FROM pipeline_checkpoints \
             WHERE session_id = ? ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, stage, created_at)| {
                let stage = stage
                    .parse::<PipelineStage>()
                    .map_err(|_| CheckpointError::UnknownStage(stage.clone()))?;
                Ok(CheckpointSummary {
                    id,
                    stage,
                    created_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::record::ApplicationInput;

    pub(crate) async fn memory_store() -> CheckpointStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        CheckpointStore::from_pool(pool).await.unwrap()
    }

    fn record(title: &str) -> PipelineRecord {
        PipelineRecord::new(ApplicationInput {
            job_title: title.to_string(),
            ..ApplicationInput::default()
        })
    }

    #[tokio::test]
    async fn test_latest_checkpoint_wins() {
        let store = memory_store().await;
        store
            .save("s1", PipelineStage::ValidateInput, &record("first"))
            .await
            .unwrap();
        store
            .save("s1", PipelineStage::GenerateResume, &record("second"))
            .await
            .unwrap();
        store
            .save("s2", PipelineStage::ValidateInput, &record("other"))
            .await
            .unwrap();

        let latest = store.load_latest("s1").await.unwrap().unwrap();
        assert_eq!(latest.stage, PipelineStage::GenerateResume);
        assert_eq!(latest.record.input.job_title, "second");
        assert_eq!(latest.session_id, "s1");
    }

    #[tokio::test]
    async fn test_unknown_session_has_no_checkpoint() {
        let store = memory_store().await;
        assert!(store.load_latest("missing").await.unwrap().is_none());
        assert!(store.history("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_append_only_and_ordered() {
        let store = memory_store().await;
        for stage in [
            PipelineStage::ValidateInput,
            PipelineStage::GenerateResume,
            PipelineStage::GenerateCoverLetter,
        ] {
            store.save("s1", stage, &record("x")).await.unwrap();
        }
        let stages: Vec<PipelineStage> = store
            .history("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.stage)
            .collect();
        assert_eq!(
            stages,
            vec![
                PipelineStage::ValidateInput,
                PipelineStage::GenerateResume,
                PipelineStage::GenerateCoverLetter,
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sessions.db");
        let url = format!("sqlite://{}", path.display());

        let store = CheckpointStore::connect(&url).await.unwrap();
        store
            .save("s1", PipelineStage::ValidateInput, &record("x"))
            .await
            .unwrap();
        assert!(path.exists());
    }
}
