//! Recording blob store
//!
//! Uploaded audio is stored byte-for-byte under one flat directory, one file
//! per accepted upload, named after the task it answers.

use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use vpr_common::{Error, Result, TaskKey, TaskType};

const DEFAULT_EXTENSION: &str = "webm";

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Flat directory of recording files
#[derive(Debug, Clone)]
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    /// Open the store, creating its directory if missing
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under `filename`, returning the final path
    ///
    /// Data lands in a `.part` file first and is renamed into place, so a
    /// crash never leaves a truncated recording under its final name. An
    /// existing recording is never replaced: a taken name gets a `-2`, `-3`,
    /// ... suffix before the extension.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let name = candidate_name(filename, attempt);
            let final_path = self.root.join(&name);
            if tokio::fs::try_exists(&final_path).await? {
                continue;
            }

            // Holding the `.part` file is what reserves `name`
            let part_path = self.root.join(format!("{}.part", name));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&part_path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.sync_all().await
            }
            .await;
            drop(file);
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e.into());
            }

            if tokio::fs::try_exists(&final_path).await? {
                let _ = tokio::fs::remove_file(&part_path).await;
                continue;
            }
            tokio::fs::rename(&part_path, &final_path).await?;

            debug!(path = %final_path.display(), size = bytes.len(), "Wrote recording");
            return Ok(final_path);
        }

        Err(Error::Internal(format!(
            "No free file name for recording {}",
            filename
        )))
    }

    /// Remove a stored recording; failures are logged, not returned
    pub async fn remove(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove orphaned recording {}: {}", path.display(), e);
        }
    }
}

/// `filename` itself on the first attempt, then `{stem}-{attempt}.{ext}`
fn candidate_name(filename: &str, attempt: u32) -> String {
    if attempt == 1 {
        return filename.to_string();
    }
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-{}.{}", stem, attempt, ext),
        None => format!("{}-{}", filename, attempt),
    }
}

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn type_label(task_type: TaskType) -> &'static str {
    match task_type {
        TaskType::Pair => "pair",
        TaskType::ExtraQuestion => "extraQ",
        TaskType::Instruction => "warmup",
    }
}

/// File name for an accepted recording
///
/// `user-{user}__lang-{lang}__type-{type}__role-{role}__item-{item}__ts-{YYYYMMDDTHHMMSS}.{ext}`
pub fn recording_filename(username: &str, key: &TaskKey, ext: &str, at: DateTime<Utc>) -> String {
    format!(
        "user-{}__lang-{}__type-{}__role-{}__item-{}__ts-{}.{}",
        sanitize_component(username),
        key.language.code(),
        type_label(key.task_type),
        key.role.as_str(),
        sanitize_component(&key.item_id),
        at.format("%Y%m%dT%H%M%S"),
        ext
    )
}

/// Pick a file extension from the upload's file name, then its content type
pub fn infer_extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty());

    if let Some(ext) = from_name {
        return ext;
    }

    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    let ext = if content_type.contains("webm") {
        "webm"
    } else if content_type.contains("ogg") {
        "ogg"
    } else if content_type.contains("wav") {
        "wav"
    } else if content_type.contains("mp4") || content_type.contains("m4a") {
        "m4a"
    } else if content_type.contains("mpeg") || content_type.contains("mp3") {
        "mp3"
    } else {
        DEFAULT_EXTENSION
    };

    ext.to_string()
}
