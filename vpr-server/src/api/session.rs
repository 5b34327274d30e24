//! Participant session endpoints: login, next task, quotas

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use vpr_common::api::types::ALL_TASKS_COMPLETE_MESSAGE;
use vpr_common::api::{LoginResponse, NextTaskResponse, QuotasResponse};

use crate::api::form::FormFields;
use crate::db::{progress, users};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/login
///
/// Creates the user (with all-zero progress) on first login.
pub async fn login(
    State(state): State<AppState>,
    fields: FormFields,
) -> ApiResult<Json<LoginResponse>> {
    let username = fields.require("username")?.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username cannot be empty".to_string()));
    }

    if users::ensure_user(&state.db, &username).await? {
        info!(username = %username, "Created new user");
    } else {
        info!(username = %username, "User logged in");
    }

    let progress = progress::load_progress(&state.db, &username)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Progress missing for user {}", username)))?;

    Ok(Json(LoginResponse { username, progress }))
}

#[derive(Debug, Deserialize)]
pub struct NextTaskQuery {
    #[serde(default)]
    pub username: Option<String>,
}

/// GET /api/next_task?username=...
pub async fn next_task(
    State(state): State<AppState>,
    Query(query): Query<NextTaskQuery>,
) -> ApiResult<Json<NextTaskResponse>> {
    let username = query.username.as_deref().map(str::trim).unwrap_or("");
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }

    let progress = progress::load_progress(&state.db, username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found. Please login first.".to_string()))?;

    let task = state.sequencer.next_task(&progress);
    let message = task
        .is_none()
        .then(|| ALL_TASKS_COMPLETE_MESSAGE.to_string());

    Ok(Json(NextTaskResponse {
        username: username.to_string(),
        task,
        progress,
        message,
    }))
}

/// GET /api/quotas
pub async fn quotas(State(state): State<AppState>) -> Json<QuotasResponse> {
    Json(QuotasResponse::from(state.sequencer.quotas()))
}
