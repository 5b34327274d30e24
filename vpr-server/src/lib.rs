//! vpr-server library - VoxPrivacyRecord recording backend
//!
//! Exposes the router and its state for the binary and for integration tests.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use vpr_common::TaskSequencer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod storage;

pub use crate::config::{HttpOptions, ServerConfig};
pub use crate::error::{ApiError, ApiResult};
pub use crate::storage::RecordingStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Task sequencer over the loaded prompt catalog
    pub sequencer: Arc<TaskSequencer>,
    /// Recording blob store
    pub store: RecordingStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, sequencer: TaskSequencer, store: RecordingStore) -> Self {
        Self {
            db,
            sequencer: Arc::new(sequencer),
            store,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState, http: &HttpOptions) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/login", post(api::login))
        .route("/api/next_task", get(api::next_task))
        .route("/api/upload_recording", post(api::upload_recording))
        .route("/api/quotas", get(api::quotas))
        .route("/api/admin/export_metadata", get(api::export_metadata))
        .route("/api/admin/user_stats", get(api::user_stats));

    let ui = Router::new()
        .route("/app", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/static/app.css", get(api::serve_app_css));

    Router::new()
        .merge(api)
        .merge(ui)
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(http.max_upload_bytes))
        .layer(cors_layer(&http.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}
