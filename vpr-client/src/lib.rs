//! # VoxPrivacyRecord Console Client
//!
//! - HTTP API client for the recording server
//! - Recording capture state machine with pluggable backends
//! - Screen flow: Login → Recording → Completion

pub mod api;
pub mod app;
pub mod capture;
pub mod error;

pub use api::ApiClient;
pub use app::{Screen, Session};
pub use capture::{AudioPayload, CaptureBackend, CaptureState, Recorder};
pub use error::{ClientError, Result};
