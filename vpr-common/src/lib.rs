//! # VoxPrivacyRecord Common Library
//!
//! Shared code for the recording server and the console client:
//! - Task data model (languages, roles, progress counters, quotas)
//! - Prompt catalog loading
//! - Task sequencer (next task / advance)
//! - API request/response types
//! - Configuration loading

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod sequencer;

pub use catalog::{Catalog, CatalogItem};
pub use error::{Error, Result};
pub use model::{Language, LanguageProgress, LanguageQuotas, Progress, Quotas, Role, Task, TaskKey, TaskType};
pub use sequencer::{SequenceError, TaskSequencer};
