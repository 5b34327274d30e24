//! Admin export endpoints

use axum::{extract::State, Json};
use vpr_common::api::{ExportMetadataResponse, UserStatsResponse};

use crate::db::{recordings, users};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/admin/export_metadata
pub async fn export_metadata(
    State(state): State<AppState>,
) -> ApiResult<Json<ExportMetadataResponse>> {
    let recordings = recordings::list_recordings(&state.db).await?;

    Ok(Json(ExportMetadataResponse {
        total_recordings: recordings.len(),
        recordings,
    }))
}

/// GET /api/admin/user_stats
pub async fn user_stats(State(state): State<AppState>) -> ApiResult<Json<UserStatsResponse>> {
    let users = users::list_user_stats(&state.db).await?;

    Ok(Json(UserStatsResponse {
        total_users: users.len(),
        users,
    }))
}
