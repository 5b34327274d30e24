//! Recording upload endpoint
//!
//! The only place progress advances. Validation runs in a fixed order:
//! missing field (422), unknown user (404), bad enum value (400), unknown
//! item (400), empty audio (400), task mismatch (409).
//!
//! The transaction takes the write lock before reading progress, so a
//! duplicate upload racing an accepted one sees the advanced progress and
//! gets a 409.

use axum::{extract::State, Json};
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::info;
use vpr_common::api::UploadResponse;
use vpr_common::{Language, Progress, Role, TaskKey, TaskType};

use crate::api::form::FormFields;
use crate::db::recordings::{self, NewRecording};
use crate::db::{progress, users};
use crate::error::{ApiError, ApiResult};
use crate::storage::{infer_extension, recording_filename};
use crate::AppState;

/// POST /api/upload_recording
pub async fn upload_recording(
    State(state): State<AppState>,
    fields: FormFields,
) -> ApiResult<Json<UploadResponse>> {
    let username = fields.require("username")?.trim().to_string();
    let language = fields.require("language")?;
    let task_type = fields.require("task_type")?;
    let role = fields.require("role")?;
    let item_id = fields.require("item_id")?.trim().to_string();
    let audio = fields.require_file("audio")?;

    if !users::user_exists(&state.db, &username).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let key = TaskKey {
        language: language.parse::<Language>()?,
        task_type: task_type.parse::<TaskType>()?,
        role: role.parse::<Role>()?,
        item_id,
    };

    if !state
        .sequencer
        .catalog()
        .contains(key.language, key.role, &key.item_id)
    {
        return Err(ApiError::BadRequest(format!(
            "Item {} not found in {} data",
            key.item_id, key.language
        )));
    }

    if audio.bytes.is_empty() {
        return Err(ApiError::BadRequest("Audio file is empty".to_string()));
    }

    let mut tx = state.db.begin().await?;
    progress::lock_progress(&mut *tx, &username)
        .await
        .map_err(|e| match e {
            vpr_common::Error::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    let current = progress::load_progress(&mut *tx, &username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let advanced = state.sequencer.advance(&current, &key)?;

    let ext = infer_extension(audio.file_name.as_deref(), audio.content_type.as_deref());
    let filename = recording_filename(&username, &key, &ext, Utc::now());
    let path = state.store.write(&filename, &audio.bytes).await?;
    let file_path = path.display().to_string();
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or(filename);

    let recording = NewRecording {
        username: username.clone(),
        key: key.clone(),
        file_path: file_path.clone(),
        filename: filename.clone(),
        size_bytes: audio.bytes.len() as i64,
    };

    if let Err(e) = persist(tx, &recording, &advanced).await {
        state.store.remove(&path).await;
        return Err(e.into());
    }

    info!(
        username = %username,
        task = %key,
        size = audio.bytes.len(),
        "Stored recording {}",
        filename
    );

    Ok(Json(UploadResponse {
        status: "ok".to_string(),
        file_path,
        filename,
        progress: advanced,
        message: "Recording uploaded successfully".to_string(),
    }))
}

async fn persist(
    mut tx: Transaction<'_, Sqlite>,
    recording: &NewRecording,
    advanced: &Progress,
) -> vpr_common::Result<()> {
    recordings::insert_recording(&mut *tx, recording).await?;
    progress::save_progress(&mut *tx, &recording.username, advanced).await?;
    tx.commit().await?;
    Ok(())
}
