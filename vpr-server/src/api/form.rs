//! Form body extractor
//!
//! Accepts `multipart/form-data` (text fields and files) and
//! `application/x-www-form-urlencoded` (text fields only) bodies.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form,
};
use std::collections::HashMap;

use crate::error::ApiError;

/// File part of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Parsed form fields
#[derive(Debug, Default)]
pub struct FormFields {
    text: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormFields {
    /// Text field value, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// Text field value; absence is a 422
    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        self.get(name)
            .ok_or_else(|| ApiError::Unprocessable(format!("Field '{}' is required", name)))
    }

    /// File field; absence is a 422
    pub fn require_file(&self, name: &str) -> Result<&UploadedFile, ApiError> {
        self.files
            .get(name)
            .ok_or_else(|| ApiError::Unprocessable(format!("File field '{}' is required", name)))
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut fields = FormFields::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::Rejected {
            status: e.status(),
            detail: e.body_text(),
        })? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| ApiError::Rejected {
                status: e.status(),
                detail: e.body_text(),
            })?;

            let is_text = file_name.is_none()
                && content_type
                    .as_deref()
                    .map_or(true, |ct| ct.starts_with("text/"));

            match (is_text, String::from_utf8(bytes.to_vec())) {
                (true, Ok(value)) => {
                    fields.text.insert(name, value);
                }
                _ => {
                    fields.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
            }
        }

        Ok(fields)
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::Rejected {
                    status: e.status(),
                    detail: e.body_text(),
                })?;
            return FormFields::from_multipart(multipart).await;
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(text) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::Rejected {
                    status: e.status(),
                    detail: e.body_text(),
                })?;
            return Ok(FormFields {
                text,
                files: HashMap::new(),
            });
        }

        Err(ApiError::Unprocessable(
            "Expected multipart/form-data or application/x-www-form-urlencoded body".to_string(),
        ))
    }
}
