// Audio ingestion module
// Reads WAV recordings, normalizes samples and cuts candidate clips

use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::notes::Interval;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Failed to open audio file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples normalized to f32 in range [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Total number of frames (samples / channels)
    pub frame_count: usize,
}

impl AudioData {
    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> MonoSignal {
        let channels = self.channels.max(1) as usize;
        let samples = if channels == 1 {
            self.samples.clone()
        } else {
            self.samples
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        MonoSignal {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}

/// A single-channel recording
#[derive(Debug, Clone)]
pub struct MonoSignal {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoSignal {
    /// Samples `[onset * sr, offset * sr)` of a candidate span, clamped to the
    /// recording; empty when the span lies outside it
    pub fn clip(&self, span: &Interval) -> &[f32] {
        let len = self.samples.len();
        let to_index = |seconds: f64| ((seconds.max(0.0) * self.sample_rate as f64) as usize).min(len);

        let start = to_index(span.onset);
        let end = to_index(span.offset).max(start);
        &self.samples[start..end]
    }
}

/// Read samples of one integer bit depth and scale them into [-1.0, 1.0]
fn read_scaled<R: Read>(reader: &mut WavReader<R>, scale: f32) -> Result<Vec<f32>, AudioError> {
    Ok(reader
        .samples::<i32>()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|s| s as f32 / scale)
        .collect())
}

/// Ingest a WAV file from raw bytes
pub fn ingest_wav(data: &[u8]) -> Result<AudioData, AudioError> {
    let mut reader = WavReader::new(Cursor::new(data))?;

    let spec = reader.spec();
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        // hound already yields 8-bit PCM as signed values
        (SampleFormat::Int, 8) => read_scaled(&mut reader, 128.0)?,
        (SampleFormat::Int, 16) => read_scaled(&mut reader, 32768.0)?,
        (SampleFormat::Int, 24) => read_scaled(&mut reader, 8388608.0)?,
        (SampleFormat::Int, 32) => read_scaled(&mut reader, 2147483648.0)?,
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} {}-bit audio",
                format, bits
            )));
        }
    };

    let frame_count = samples.len() / spec.channels.max(1) as usize;

    Ok(AudioData {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        frame_count,
    })
}

/// Ingest a WAV file from disk
pub fn read_wav(path: &Path) -> Result<AudioData, AudioError> {
    let data = std::fs::read(path).map_err(|source| AudioError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    ingest_wav(&data)
}
