//! Capture backend that serves pre-recorded takes from disk
//!
//! Each `begin`/`finish` pair consumes the next file in order. Used for
//! headless sessions and for driving the client in tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::capture::{wav, AudioPayload, CaptureBackend};
use crate::error::{ClientError, Result};

const NO_DEVICE_MESSAGE: &str = "No audio input device available";

/// Extensions accepted as takes, with their MIME types
const AUDIO_TYPES: &[(&str, &str)] = &[
    ("webm", "audio/webm"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("flac", "audio/flac"),
];

pub struct FileBackend {
    queue: VecDeque<PathBuf>,
    current: Option<PathBuf>,
}

impl FileBackend {
    pub fn from_files(files: Vec<PathBuf>) -> Self {
        Self {
            queue: files.into(),
            current: None,
        }
    }

    /// Queue every audio file in `dir`, sorted by file name
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ClientError::Capture(format!("Failed to read takes directory {}: {e}", dir.display()))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ClientError::Capture(format!("Failed to read directory entry: {e}")))?
                .path();
            if path.is_file() && mime_for(&path).is_some() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        info!("Queued {} take(s) from {}", files.len(), dir.display());
        Ok(Self::from_files(files))
    }

    /// Takes not yet consumed
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl CaptureBackend for FileBackend {
    fn begin(&mut self) -> Result<()> {
        let next = self
            .queue
            .pop_front()
            .ok_or_else(|| ClientError::Permission(NO_DEVICE_MESSAGE.to_string()))?;
        debug!("Capturing from {}", next.display());
        self.current = Some(next);
        Ok(())
    }

    fn finish(&mut self) -> Result<AudioPayload> {
        let path = self
            .current
            .take()
            .ok_or_else(|| ClientError::Capture("No capture in progress".to_string()))?;

        let bytes = std::fs::read(&path).map_err(|e| {
            ClientError::Capture(format!("Failed to read {}: {e}", path.display()))
        })?;

        let (ext, mime) = mime_for(&path).unwrap_or(("webm", "audio/webm"));
        Ok(AudioPayload {
            bytes,
            mime_type: mime.to_string(),
            file_name: format!("recording.{ext}"),
        })
    }

    fn play(&mut self, payload: &AudioPayload) -> Result<()> {
        if payload.mime_type == "audio/wav" {
            let clip = wav::decode_wav(&payload.bytes)?;
            info!(
                "Playback: {} ({:.1}s, {} Hz)",
                payload.file_name,
                clip.duration_secs(),
                clip.sample_rate
            );
        } else {
            info!(
                "Playback: {} ({} bytes, {})",
                payload.file_name,
                payload.bytes.len(),
                payload.mime_type
            );
        }
        Ok(())
    }
}

fn mime_for(path: &Path) -> Option<(&'static str, &'static str)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    AUDIO_TYPES.iter().copied().find(|(e, _)| *e == ext)
}
