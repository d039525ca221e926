//! Raw PCM audio framing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sample rate in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    pub const HZ_16K: SampleRate = SampleRate(16_000);
    pub const HZ_44_1K: SampleRate = SampleRate(44_100);
    pub const HZ_48K: SampleRate = SampleRate(48_000);
}

/// Channel layout of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    pub fn count(&self) -> u16 {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// A single, immutable slab of captured PCM audio.
///
/// Its lifetime ends when it is pushed into the STT stream or dropped — it
/// is never mutated in place, and never held across an await point once
/// handed to a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFrame {
    pub pcm: Vec<u8>,
    pub sample_rate: SampleRate,
    pub channels: Channels,
    pub captured_at: DateTime<Utc>,
}

impl AudioFrame {
    pub fn new(pcm: Vec<u8>, sample_rate: SampleRate, channels: Channels) -> Self {
        Self { pcm, sample_rate, channels, captured_at: Utc::now() }
    }

    pub fn byte_len(&self) -> usize {
        self.pcm.len()
    }

    /// Approximate duration, assuming 16-bit samples.
    pub fn duration(&self) -> std::time::Duration {
        let bytes_per_sample = 2usize;
        let frame_bytes = bytes_per_sample * self.channels.count() as usize;
        if frame_bytes == 0 || self.sample_rate.0 == 0 {
            return std::time::Duration::ZERO;
        }
        let samples = self.pcm.len() / frame_bytes;
        std::time::Duration::from_secs_f64(samples as f64 / self.sample_rate.0 as f64)
    }
}

/// Batch STT accepts at most this many bytes; larger input fails
/// non-retryably (spec §4.2).
pub const MAX_BATCH_AUDIO_BYTES: usize = 25 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_derived_from_sample_count() {
        let frame = AudioFrame::new(vec![0u8; 16_000 * 2], SampleRate::HZ_16K, Channels::Mono);
        assert_eq!(frame.duration(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn stereo_halves_the_apparent_duration() {
        let frame = AudioFrame::new(vec![0u8; 16_000 * 2 * 2], SampleRate::HZ_16K, Channels::Stereo);
        assert_eq!(frame.duration(), std::time::Duration::from_secs(1));
    }
}
