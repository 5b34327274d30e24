//! Progress database operations
//!
//! One row per user, flat `zh_*` / `en_*` columns mirroring the wire form.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};
use vpr_common::{Error, LanguageProgress, Progress, Result};

/// Progress columns in wire order
pub const PROGRESS_COLUMNS: [&str; 10] = [
    "zh_nobody_done",
    "zh_onlyme_done",
    "zh_pairs_done",
    "zh_extra_questions_done",
    "zh_pending_question",
    "en_nobody_done",
    "en_onlyme_done",
    "en_pairs_done",
    "en_extra_questions_done",
    "en_pending_question",
];

/// Load a user's progress, `None` when the user has no progress row
pub async fn load_progress<'e, E>(executor: E, username: &str) -> Result<Option<Progress>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM progress WHERE username = ?",
        PROGRESS_COLUMNS.join(", ")
    );

    let row = sqlx::query(&sql)
        .bind(username)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(progress_from_row).transpose()
}

/// Touch a user's progress row so the enclosing transaction holds the
/// database write lock before progress is read
///
/// Concurrent uploads for the same user then queue behind each other and
/// each one sees the progress the previous one committed.
pub async fn lock_progress<'e, E>(executor: E, username: &str) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE progress SET updated_at = ? WHERE username = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(username)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("No progress row for user {}", username)));
    }

    Ok(())
}

/// Overwrite a user's progress row
pub async fn save_progress<'e, E>(executor: E, username: &str, progress: &Progress) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE progress SET
            zh_nobody_done = ?, zh_onlyme_done = ?, zh_pairs_done = ?,
            zh_extra_questions_done = ?, zh_pending_question = ?,
            en_nobody_done = ?, en_onlyme_done = ?, en_pairs_done = ?,
            en_extra_questions_done = ?, en_pending_question = ?,
            updated_at = ?
        WHERE username = ?
        "#,
    )
    .bind(progress.zh.nobody_done as i64)
    .bind(progress.zh.onlyme_done as i64)
    .bind(progress.zh.pairs_done as i64)
    .bind(progress.zh.extra_questions_done as i64)
    .bind(progress.zh.pending_question.as_deref())
    .bind(progress.en.nobody_done as i64)
    .bind(progress.en.onlyme_done as i64)
    .bind(progress.en.pairs_done as i64)
    .bind(progress.en.extra_questions_done as i64)
    .bind(progress.en.pending_question.as_deref())
    .bind(Utc::now().to_rfc3339())
    .bind(username)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("No progress row for user {}", username)));
    }

    Ok(())
}

/// Build a `Progress` from a row selecting every column in `PROGRESS_COLUMNS`
pub fn progress_from_row(row: &SqliteRow) -> Result<Progress> {
    Ok(Progress {
        zh: language_from_row(row, "zh")?,
        en: language_from_row(row, "en")?,
    })
}

fn language_from_row(row: &SqliteRow, prefix: &str) -> Result<LanguageProgress> {
    Ok(LanguageProgress {
        nobody_done: counter(row, &format!("{}_nobody_done", prefix))?,
        onlyme_done: counter(row, &format!("{}_onlyme_done", prefix))?,
        pairs_done: counter(row, &format!("{}_pairs_done", prefix))?,
        extra_questions_done: counter(row, &format!("{}_extra_questions_done", prefix))?,
        pending_question: row.try_get(format!("{}_pending_question", prefix).as_str())?,
    })
}

fn counter(row: &SqliteRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| Error::Internal(format!("Counter {} out of range: {}", column, value)))
}
