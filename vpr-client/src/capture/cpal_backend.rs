//! Live microphone capture and playback through cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use crate::capture::{block_for, wav, AudioClip, AudioPayload, CaptureBackend};
use crate::error::{ClientError, Result};

const TARGET_SAMPLE_RATE: u32 = 16000;

type SampleBuffer = Arc<Mutex<Vec<f32>>>;
type StreamError = Arc<Mutex<Option<String>>>;

#[derive(Default)]
pub struct CpalBackend {
    stream: Option<cpal::Stream>,
    samples: SampleBuffer,
    stream_error: StreamError,
    sample_rate: u32,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureBackend for CpalBackend {
    fn begin(&mut self) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| ClientError::Permission("No audio input device available".into()))?;

        let config = select_config(&device)?;
        self.sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        lock(&self.samples).clear();
        *lock(&self.stream_error) = None;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_input::<f32>(&device, &config, channels, self)?,
            cpal::SampleFormat::I16 => build_input::<i16>(&device, &config, channels, self)?,
            cpal::SampleFormat::U16 => build_input::<u16>(&device, &config, channels, self)?,
            other => {
                return Err(ClientError::Capture(format!(
                    "Unsupported sample format: {other:?}"
                )))
            }
        };

        stream.play().map_err(|e| {
            ClientError::Permission(format!(
                "Failed to access microphone. Please grant permission and try again. ({e})"
            ))
        })?;

        info!(sample_rate = self.sample_rate, channels, "Microphone capture started");
        self.stream = Some(stream);
        Ok(())
    }

    fn finish(&mut self) -> Result<AudioPayload> {
        let stream = self
            .stream
            .take()
            .ok_or_else(|| ClientError::Capture("No capture in progress".to_string()))?;
        drop(stream);

        if let Some(err) = lock(&self.stream_error).take() {
            return Err(ClientError::Capture(format!(
                "Stream error during recording: {err}"
            )));
        }

        let clip = AudioClip {
            samples: std::mem::take(&mut *lock(&self.samples)),
            sample_rate: self.sample_rate,
        };
        info!("Captured {:.1}s of audio", clip.duration_secs());

        Ok(AudioPayload {
            bytes: wav::encode_wav(&clip)?,
            mime_type: "audio/wav".to_string(),
            file_name: "recording.wav".to_string(),
        })
    }

    fn play(&mut self, payload: &AudioPayload) -> Result<()> {
        let clip = wav::decode_wav(&payload.bytes)?;
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ClientError::Capture("No audio output device available".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| ClientError::Capture(format!("Failed to get output config: {e}")))?;

        let out_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let duration = Duration::from_secs_f32(clip.duration_secs());
        let samples = Arc::new(clip.samples);
        let step = clip.sample_rate as f64 / out_rate as f64;
        let mut position = 0f64;

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        // Nearest-sample rate conversion
                        let value = samples.get(position as usize).copied().unwrap_or(0.0);
                        frame.fill(value);
                        position += step;
                    }
                },
                |e| warn!("Playback stream error: {e}"),
                None,
            )
            .map_err(|e| ClientError::Capture(format!("Failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| ClientError::Capture(format!("Failed to start playback: {e}")))?;
        // Playback blocks until the clip ends
        block_for(duration + Duration::from_millis(100));
        Ok(())
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::SupportedStreamConfig,
    channels: usize,
    backend: &CpalBackend,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let samples = Arc::clone(&backend.samples);
    let stream_error = Arc::clone(&backend.stream_error);

    device
        .build_input_stream(
            &config.config(),
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut buf = lock(&samples);
                for frame in data.chunks_exact(channels.max(1)) {
                    let mono = frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>()
                        / frame.len() as f32;
                    buf.push(mono);
                }
            },
            move |e| {
                *lock(&stream_error) = Some(e.to_string());
            },
            None,
        )
        .map_err(|e| ClientError::Permission(format!("Failed to access microphone: {e}")))
}

/// 16 kHz f32 when the device supports it, otherwise the device default
fn select_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| ClientError::Permission(format!("Failed to query microphone: {e}")))?;

    for range in supported {
        if range.sample_format() == cpal::SampleFormat::F32
            && range.min_sample_rate().0 <= TARGET_SAMPLE_RATE
            && range.max_sample_rate().0 >= TARGET_SAMPLE_RATE
        {
            return Ok(range.with_sample_rate(cpal::SampleRate(TARGET_SAMPLE_RATE)));
        }
    }

    device
        .default_input_config()
        .map_err(|e| ClientError::Permission(format!("Failed to get microphone config: {e}")))
}

/// Lock that survives a panicked audio callback
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
