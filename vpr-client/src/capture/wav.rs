//! WAV encoding and decoding (16-bit signed PCM, mono)

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

use crate::capture::AudioClip;
use crate::error::{ClientError, Result};

/// Encode a clip into in-memory WAV bytes
pub fn encode_wav(clip: &AudioClip) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for &sample in &clip.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }

    Ok(cursor.into_inner())
}

/// Decode WAV bytes to mono f32, averaging channels
pub fn decode_wav(bytes: &[u8]) -> Result<AudioClip> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(wav_error)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok(AudioClip {
        samples,
        sample_rate: spec.sample_rate,
    })
}

fn wav_error(e: hound::Error) -> ClientError {
    ClientError::Capture(format!("WAV error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(samples: Vec<f32>, sample_rate: u32) -> AudioClip {
        AudioClip {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn encode_produces_riff_header() {
        let bytes = encode_wav(&clip(vec![0.0; 1600], 16000)).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 1600 * 2);
    }

    #[test]
    fn encode_clamps_out_of_range_samples() {
        let bytes = encode_wav(&clip(vec![2.0, -2.0, 0.0], 16000)).unwrap();
        let decoded = decode_wav(&bytes).unwrap();
        assert!((decoded.samples[0] - 1.0).abs() < 1e-3);
        assert!((decoded.samples[1] + 1.0).abs() < 1e-3);
        assert_eq!(decoded.samples[2], 0.0);
    }

    #[test]
    fn decode_keeps_rate_and_length() {
        let bytes = encode_wav(&clip(vec![0.25; 800], 8000)).unwrap();
        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.samples.len(), 800);
        assert!((decoded.duration_secs() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn decode_downmixes_stereo() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..10 {
                writer.write_sample(i16::MAX).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let decoded = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(decoded.samples.len(), 10);
        assert!((decoded.samples[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode_wav(b"not a wav"), Err(ClientError::Capture(_))));
    }
}
