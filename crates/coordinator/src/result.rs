//! The structured per-request result shape (spec §7): "the coordinator
//! never raises to its caller; it returns a structured result."

use castbot_core::Transcript;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    pub transcript: Option<Transcript>,
    pub generated_comment: Option<String>,
    pub posted: bool,
    pub post_id: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessResult {
    pub fn not_posted(transcript: Option<Transcript>) -> Self {
        Self { success: true, transcript, generated_comment: None, posted: false, post_id: None, error: None, timestamp: Utc::now() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, transcript: None, generated_comment: None, posted: false, post_id: None, error: Some(message.into()), timestamp: Utc::now() }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(message.into());
        self
    }

    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    pub fn posted(transcript: Option<Transcript>, comment: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            success: true,
            transcript,
            generated_comment: Some(comment.into()),
            posted: true,
            post_id: Some(post_id.into()),
            error: None,
            timestamp: Utc::now(),
        }
    }
}
