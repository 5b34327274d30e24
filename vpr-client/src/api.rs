//! HTTP API client for the recording server
//!
//! Plain request/response calls over form submissions; no batching, no
//! automatic retry.

use reqwest::multipart;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use vpr_common::api::{
    ErrorResponse, LivenessResponse, LoginResponse, NextTaskResponse, QuotasResponse,
    UploadResponse,
};
use vpr_common::TaskKey;

use crate::capture::AudioPayload;
use crate::error::{ClientError, Result};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Bound on the liveness check only; API calls use the HTTP client defaults
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::Connectivity(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /`; true when the server answers with a 2xx liveness body
    pub async fn test_connection(&self) -> bool {
        let request = self.client.get(self.url("/")).timeout(LIVENESS_TIMEOUT);
        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<LivenessResponse>().await.is_ok()
            }
            Ok(resp) => {
                debug!(status = %resp.status(), "Liveness check failed");
                false
            }
            Err(e) => {
                debug!("Liveness check failed: {e}");
                false
            }
        }
    }

    /// `POST /api/login`
    pub async fn login(&self, username: &str) -> Result<LoginResponse> {
        let username = validate_username(username)?;
        let form = multipart::Form::new().text("username", username.to_string());

        let resp = self
            .client
            .post(self.url("/api/login"))
            .multipart(form)
            .send()
            .await?;

        handle_response(resp).await
    }

    /// `GET /api/next_task`
    pub async fn fetch_next(&self, username: &str) -> Result<NextTaskResponse> {
        let username = validate_username(username)?;

        let resp = self
            .client
            .get(self.url("/api/next_task"))
            .query(&[("username", username)])
            .send()
            .await?;

        handle_response(resp).await
    }

    /// `POST /api/upload_recording`
    pub async fn upload(
        &self,
        username: &str,
        task: &TaskKey,
        audio: AudioPayload,
    ) -> Result<UploadResponse> {
        let username = validate_username(username)?;
        let size = audio.bytes.len();

        let audio_part = multipart::Part::bytes(audio.bytes)
            .file_name(audio.file_name)
            .mime_str(&audio.mime_type)
            .map_err(|e| ClientError::Validation(format!("Invalid audio MIME type: {e}")))?;

        let form = multipart::Form::new()
            .text("username", username.to_string())
            .text("language", task.language.code())
            .text("task_type", task.task_type.as_str())
            .text("role", task.role.as_str())
            .text("item_id", task.item_id.clone())
            .part("audio", audio_part);

        debug!(task = %task, bytes = size, "Uploading recording");

        let resp = self
            .client
            .post(self.url("/api/upload_recording"))
            .multipart(form)
            .send()
            .await?;

        handle_response(resp).await
    }

    /// `GET /api/quotas`
    pub async fn quotas(&self) -> Result<QuotasResponse> {
        let resp = self.client.get(self.url("/api/quotas")).send().await?;
        handle_response(resp).await
    }
}

fn validate_username(username: &str) -> Result<&str> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation("Please enter a username".to_string()));
    }
    Ok(trimmed)
}

/// Decode a 2xx body, or turn a non-2xx `{detail}` body into `ClientError::Server`
async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.detail)
            .ok()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.clone()
                }
            });
        return Err(ClientError::Server {
            status: status.as_u16(),
            detail,
        });
    }

    resp.json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}
