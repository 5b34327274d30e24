//! User database operations

use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool};
use vpr_common::api::UserStats;
use vpr_common::Result;

use super::progress::{progress_from_row, PROGRESS_COLUMNS};

/// Create the user and an all-zero progress row unless they already exist
///
/// Returns `true` when a new user was created.
pub async fn ensure_user(pool: &SqlitePool, username: &str) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO users (username, created_at, updated_at) VALUES (?, ?, ?)",
    )
    .bind(username)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // Also repairs a user whose progress row went missing
    sqlx::query("INSERT OR IGNORE INTO progress (username, updated_at) VALUES (?, ?)")
        .bind(username)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(inserted > 0)
}

/// Whether a user with this username exists
pub async fn user_exists<'e, E>(executor: E, username: &str) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(executor)
        .await?;

    Ok(count > 0)
}

/// Every user with creation time and progress, ordered by username
pub async fn list_user_stats(pool: &SqlitePool) -> Result<Vec<UserStats>> {
    let sql = format!(
        r#"
        SELECT u.username, u.created_at, {}
        FROM users u
        JOIN progress p ON p.username = u.username
        ORDER BY u.username
        "#,
        PROGRESS_COLUMNS
            .iter()
            .map(|c| format!("p.{}", c))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter()
        .map(|row| -> Result<UserStats> {
            Ok(UserStats {
                username: row.try_get("username")?,
                created_at: row.try_get("created_at")?,
                progress: progress_from_row(row)?,
            })
        })
        .collect()
}
