//! Shared API request/response types

use serde::{Deserialize, Serialize};

use crate::model::{Progress, Quotas, Task};

/// Message returned alongside a null task
pub const ALL_TASKS_COMPLETE_MESSAGE: &str =
    "All tasks completed! Thank you for your participation.";

// ========================================
// Participant Flow
// ========================================

/// POST /api/login response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub progress: Progress,
}

/// GET /api/next_task response
///
/// `task` is `None` once every quota is met; `message` then carries the
/// completion text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextTaskResponse {
    pub username: String,
    pub task: Option<Task>,
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/upload_recording response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub file_path: String,
    pub filename: String,
    pub progress: Progress,
    pub message: String,
}

/// GET /api/quotas response, flat like `Progress`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotasResponse {
    pub zh_nobody: u32,
    pub zh_onlyme: u32,
    pub zh_pairs: u32,
    pub zh_extra_questions: u32,
    pub en_nobody: u32,
    pub en_onlyme: u32,
    pub en_pairs: u32,
    pub en_extra_questions: u32,
    pub total: u32,
}

impl From<&Quotas> for QuotasResponse {
    fn from(q: &Quotas) -> Self {
        Self {
            zh_nobody: q.zh.nobody,
            zh_onlyme: q.zh.onlyme,
            zh_pairs: q.zh.pairs,
            zh_extra_questions: q.zh.extra_questions,
            en_nobody: q.en.nobody,
            en_onlyme: q.en.onlyme,
            en_pairs: q.en.pairs,
            en_extra_questions: q.en.extra_questions,
            total: q.total(),
        }
    }
}

impl From<QuotasResponse> for Quotas {
    fn from(r: QuotasResponse) -> Self {
        use crate::model::LanguageQuotas;
        Quotas {
            zh: LanguageQuotas {
                nobody: r.zh_nobody,
                onlyme: r.zh_onlyme,
                pairs: r.zh_pairs,
                extra_questions: r.zh_extra_questions,
            },
            en: LanguageQuotas {
                nobody: r.en_nobody,
                onlyme: r.en_onlyme,
                pairs: r.en_pairs,
                extra_questions: r.en_extra_questions,
            },
        }
    }
}

/// GET / liveness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

// ========================================
// Admin
// ========================================

/// Stored recording metadata row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingRecord {
    pub id: i64,
    pub username: String,
    pub language: String,
    pub task_type: String,
    pub role: String,
    pub item_id: String,
    pub file_path: String,
    pub filename: String,
    pub size_bytes: i64,
    pub created_at: String,
}

/// GET /api/admin/export_metadata response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadataResponse {
    pub total_recordings: usize,
    pub recordings: Vec<RecordingRecord>,
}

/// Per-user entry of GET /api/admin/user_stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub username: String,
    pub created_at: String,
    pub progress: Progress,
}

/// GET /api/admin/user_stats response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatsResponse {
    pub total_users: usize,
    pub users: Vec<UserStats>,
}

// ========================================
// Error Response Types
// ========================================

/// Error body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

// ========================================
// Tests
// ========================================
