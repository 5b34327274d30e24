//! Database access layer for vpr-server
//!
//! One SQLite file holds users, their progress counters and the metadata of
//! every stored recording. Schema creation is idempotent and runs at startup.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use vpr_common::Result;

pub mod progress;
pub mod recordings;
pub mod users;

/// Open (creating if missing) the database and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes if they don't exist
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS progress (
            username TEXT PRIMARY KEY REFERENCES users(username) ON DELETE CASCADE,
            zh_nobody_done INTEGER NOT NULL DEFAULT 0 CHECK (zh_nobody_done >= 0),
            zh_onlyme_done INTEGER NOT NULL DEFAULT 0 CHECK (zh_onlyme_done >= 0),
            zh_pairs_done INTEGER NOT NULL DEFAULT 0 CHECK (zh_pairs_done >= 0),
            zh_extra_questions_done INTEGER NOT NULL DEFAULT 0 CHECK (zh_extra_questions_done >= 0),
            zh_pending_question TEXT,
            en_nobody_done INTEGER NOT NULL DEFAULT 0 CHECK (en_nobody_done >= 0),
            en_onlyme_done INTEGER NOT NULL DEFAULT 0 CHECK (en_onlyme_done >= 0),
            en_pairs_done INTEGER NOT NULL DEFAULT 0 CHECK (en_pairs_done >= 0),
            en_extra_questions_done INTEGER NOT NULL DEFAULT 0 CHECK (en_extra_questions_done >= 0),
            en_pending_question TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            guid TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL REFERENCES users(username),
            language TEXT NOT NULL CHECK (language IN ('zh', 'en')),
            task_type TEXT NOT NULL,
            role TEXT NOT NULL,
            item_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            filename TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recordings_username ON recordings(username)")
        .execute(pool)
        .await?;

    Ok(())
}
