//! API module for shared HTTP contract types
//!
//! Request/response bodies exchanged between vpr-server and its clients
//! (the embedded browser UI and vpr-client). Pure serde types with no HTTP
//! framework dependencies; each side wraps them with its own transport.

pub mod types;

pub use types::{
    ErrorResponse, ExportMetadataResponse, LivenessResponse, LoginResponse, NextTaskResponse,
    QuotasResponse, RecordingRecord, UploadResponse, UserStats, UserStatsResponse,
    ALL_TASKS_COMPLETE_MESSAGE,
};
