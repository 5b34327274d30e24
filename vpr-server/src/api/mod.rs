//! HTTP API handlers for vpr-server

pub mod admin;
pub mod form;
pub mod health;
pub mod session;
pub mod ui;
pub mod upload;

pub use admin::{export_metadata, user_stats};
pub use health::health_routes;
pub use session::{login, next_task, quotas};
pub use ui::{serve_app_css, serve_app_js, serve_index};
pub use upload::upload_recording;
