//! Rolling conversational context snapshot (C5 ContextStore data model).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::transcript::Transcript;

pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// A keyword's recency-weighted count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordWeight {
    pub count: f64,
    pub last_seen: DateTime<Utc>,
}

/// Deep-copy snapshot of the rolling window, safe to hand to readers while
/// the writer keeps mutating its own store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub recent_transcripts: Vec<Transcript>,
    pub topics: Vec<String>,
    pub keywords: HashMap<String, KeywordWeight>,
    pub engagement: f32,
    pub taken_at: DateTime<Utc>,
}

impl ContextSnapshot {
    pub fn empty() -> Self {
        Self {
            recent_transcripts: Vec::new(),
            topics: Vec::new(),
            keywords: HashMap::new(),
            engagement: 0.0,
            taken_at: Utc::now(),
        }
    }

    /// A keyword's effective weight right now: recent count minus
    /// `age / decay_window` (spec §4.4), floored at zero.
    pub fn keyword_weight(&self, keyword: &str, decay_window: std::time::Duration) -> f64 {
        match self.keywords.get(keyword) {
            None => 0.0,
            Some(kw) => {
                let age = (self.taken_at - kw.last_seen).to_std().unwrap_or_default();
                let decay = if decay_window.is_zero() {
                    0.0
                } else {
                    age.as_secs_f64() / decay_window.as_secs_f64()
                };
                (kw.count - decay).max(0.0)
            }
        }
    }
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
