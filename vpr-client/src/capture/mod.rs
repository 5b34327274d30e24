//! Recording capture
//!
//! `Recorder` owns the idle → recording → captured state machine and drives a
//! `CaptureBackend` that does the actual audio work.

pub mod file_backend;
pub mod wav;

#[cfg(feature = "microphone")]
pub mod cpal_backend;

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Finalized take ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

/// Decoded PCM audio (f32, mono)
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Source of audio takes
pub trait CaptureBackend {
    /// Open a live capture session
    fn begin(&mut self) -> Result<()>;

    /// Close the live session and return its audio
    fn finish(&mut self) -> Result<AudioPayload>;

    /// Play a finalized take for review
    fn play(&mut self, payload: &AudioPayload) -> Result<()>;
}

impl<B: CaptureBackend + ?Sized> CaptureBackend for Box<B> {
    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn finish(&mut self) -> Result<AudioPayload> {
        (**self).finish()
    }

    fn play(&mut self, payload: &AudioPayload) -> Result<()> {
        (**self).play(payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Captured,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Recording => write!(f, "recording"),
            Self::Captured => write!(f, "captured"),
        }
    }
}

/// Capture state machine over a backend
pub struct Recorder<B: CaptureBackend> {
    backend: B,
    state: CaptureState,
    payload: Option<AudioPayload>,
    started_at: Option<Instant>,
    elapsed: Duration,
}

impl<B: CaptureBackend> Recorder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: CaptureState::Idle,
            payload: None,
            started_at: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Captured take awaiting submit or discard
    pub fn payload(&self) -> Option<&AudioPayload> {
        self.payload.as_ref()
    }

    /// Recording length: live while recording, frozen once captured
    pub fn elapsed(&self) -> Duration {
        match (self.state, self.started_at) {
            (CaptureState::Recording, Some(start)) => start.elapsed(),
            (CaptureState::Captured, _) => self.elapsed,
            _ => Duration::ZERO,
        }
    }

    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed())
    }

    /// idle → recording
    ///
    /// A backend failure (no device, permission denied) leaves the recorder idle.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(CaptureState::Idle, "start")?;
        self.backend.begin()?;
        self.state = CaptureState::Recording;
        self.started_at = Some(Instant::now());
        self.elapsed = Duration::ZERO;
        Ok(())
    }

    /// recording → captured
    pub fn stop(&mut self) -> Result<()> {
        self.expect_state(CaptureState::Recording, "stop")?;
        let elapsed = self.elapsed();

        match self.backend.finish() {
            Ok(payload) => {
                self.payload = Some(payload);
                self.elapsed = elapsed;
                self.state = CaptureState::Captured;
                Ok(())
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Play the captured take; state is unchanged
    pub fn play(&mut self) -> Result<()> {
        self.expect_state(CaptureState::Captured, "play")?;
        match &self.payload {
            Some(payload) => self.backend.play(payload),
            None => Err(ClientError::Capture("No captured audio to play".to_string())),
        }
    }

    /// captured → idle, handing the take to the caller
    pub fn submit(&mut self) -> Result<AudioPayload> {
        self.expect_state(CaptureState::Captured, "submit")?;
        let payload = self
            .payload
            .take()
            .ok_or_else(|| ClientError::Capture("No captured audio to submit".to_string()))?;
        self.reset();
        Ok(payload)
    }

    /// captured → idle, dropping the take
    pub fn discard(&mut self) -> Result<()> {
        self.expect_state(CaptureState::Captured, "discard")?;
        self.reset();
        Ok(())
    }

    /// Abandon any session in progress and return to idle
    pub fn cancel(&mut self) {
        if self.state == CaptureState::Recording {
            if let Err(e) = self.backend.finish() {
                debug!("Discarded capture ended with error: {}", e);
            }
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.payload = None;
        self.started_at = None;
        self.elapsed = Duration::ZERO;
    }

    fn expect_state(&self, expected: CaptureState, action: &str) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        warn!(
            state = %self.state,
            "Ignored invalid capture transition: {}",
            action
        );
        Err(ClientError::Capture(format!(
            "Cannot {} while {}",
            action, self.state
        )))
    }
}

/// Block the calling thread for `duration` without starving the runtime
///
/// On a multi-thread tokio runtime the worker hands its queued tasks to
/// another thread first. Elsewhere this is a plain sleep.
pub fn block_for(duration: Duration) {
    use tokio::runtime::{Handle, RuntimeFlavor};

    let multi_thread = Handle::try_current()
        .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
        .unwrap_or(false);

    if multi_thread {
        tokio::task::block_in_place(|| std::thread::sleep(duration));
    } else {
        std::thread::sleep(duration);
    }
}

/// `m:ss` recording timer label
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
