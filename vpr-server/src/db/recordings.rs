//! Recording metadata database operations

use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;
use vpr_common::api::RecordingRecord;
use vpr_common::{Result, TaskKey};

/// Metadata for a recording whose blob has been written
#[derive(Debug, Clone)]
pub struct NewRecording {
    pub username: String,
    pub key: TaskKey,
    pub file_path: String,
    pub filename: String,
    pub size_bytes: i64,
}

/// Insert a recording row, returning its id
pub async fn insert_recording<'e, E>(executor: E, recording: &NewRecording) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO recordings (
            guid, username, language, task_type, role, item_id,
            file_path, filename, size_bytes, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&recording.username)
    .bind(recording.key.language.code())
    .bind(recording.key.task_type.as_str())
    .bind(recording.key.role.as_str())
    .bind(&recording.key.item_id)
    .bind(&recording.file_path)
    .bind(&recording.filename)
    .bind(recording.size_bytes)
    .bind(Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Every recording, ordered by id
pub async fn list_recordings(pool: &SqlitePool) -> Result<Vec<RecordingRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, username, language, task_type, role, item_id,
               file_path, filename, size_bytes, created_at
        FROM recordings
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<RecordingRecord> {
            Ok(RecordingRecord {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                language: row.try_get("language")?,
                task_type: row.try_get("task_type")?,
                role: row.try_get("role")?,
                item_id: row.try_get("item_id")?,
                file_path: row.try_get("file_path")?,
                filename: row.try_get("filename")?,
                size_bytes: row.try_get("size_bytes")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// Number of recordings stored for a user
pub async fn count_for_user(pool: &SqlitePool, username: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recordings WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
