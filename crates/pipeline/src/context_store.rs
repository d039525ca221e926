//! ContextStore (C5): an append-only, read-mostly rolling window of
//! recent transcripts, topics, and decayed keyword weights (spec §4.4).
//!
//! The data shape (`ContextSnapshot`, `KeywordWeight`) lives in
//! `castbot-core`; this module owns the mutable writer side and the
//! heuristics (topic markers, decay, engagement).

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use castbot_core::{ContextSnapshot, KeywordWeight, Transcript, DEFAULT_CONTEXT_WINDOW};
use chrono::Utc;
use parking_lot::RwLock;
use regex::Regex;

/// Phrases whose presence in a finalized transcript contributes a topic
/// extraction (spec §4.4: "heuristic: finalized transcripts containing
/// topic-marker phrases").
const TOPIC_MARKERS: &[&str] = &["let's talk about", "今日は", "about the", "regarding", "今から"];

#[derive(Debug, Clone, Copy)]
pub struct ContextStoreConfig {
    pub window: usize,
    pub decay_window: Duration,
}

impl Default for ContextStoreConfig {
    fn default() -> Self {
        Self { window: DEFAULT_CONTEXT_WINDOW, decay_window: Duration::from_secs(600) }
    }
}

struct State {
    transcripts: VecDeque<Transcript>,
    topics: VecDeque<String>,
    comments: VecDeque<String>,
    keywords: HashMap<String, KeywordWeight>,
    engagement: f32,
}

pub struct ContextStore {
    config: ContextStoreConfig,
    state: RwLock<State>,
    word_splitter: Regex,
}

impl ContextStore {
    pub fn new(config: ContextStoreConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State {
                transcripts: VecDeque::new(),
                topics: VecDeque::new(),
                comments: VecDeque::new(),
                keywords: HashMap::new(),
                engagement: 0.0,
            }),
            word_splitter: Regex::new(r"[\p{L}\p{N}]+").expect("valid regex"),
        }
    }

    /// Appends a finalized transcript. Interim (`is_final == false`)
    /// transcripts never mutate the store, per spec §4.4: "Only
    /// finalized transcripts mutate the store."
    pub fn append_transcript(&self, transcript: Transcript) {
        if !transcript.is_final {
            return;
        }
        let now = Utc::now();
        let mut state = self.state.write();

        for marker in TOPIC_MARKERS {
            if transcript.text.to_lowercase().contains(marker) {
                push_bounded(&mut state.topics, transcript.text.clone(), self.config.window);
                break;
            }
        }

        for word in self.word_splitter.find_iter(&transcript.text) {
            let key = word.as_str().to_lowercase();
            if key.chars().count() < 2 {
                continue;
            }
            state
                .keywords
                .entry(key)
                .and_modify(|kw| {
                    kw.count += 1.0;
                    kw.last_seen = now;
                })
                .or_insert(KeywordWeight { count: 1.0, last_seen: now });
        }

        push_bounded(&mut state.transcripts, transcript, self.config.window);
    }

    pub fn append_topic(&self, topic: impl Into<String>) {
        let mut state = self.state.write();
        push_bounded(&mut state.topics, topic.into(), self.config.window);
    }

    pub fn append_comment(&self, comment: impl Into<String>) {
        let mut state = self.state.write();
        push_bounded(&mut state.comments, comment.into(), self.config.window);
    }

    /// Updates the engagement score in `[0,1]`, clamped (upstream
    /// engagement signals — chat velocity, reactions — are out of this
    /// crate's scope per spec §1; the coordinator feeds the value in).
    pub fn set_engagement(&self, engagement: f32) {
        self.state.write().engagement = engagement.clamp(0.0, 1.0);
    }

    /// A deep-copy snapshot, safe to hand to readers while the writer
    /// keeps mutating its own store (spec §3, §4.4).
    pub fn snapshot(&self) -> ContextSnapshot {
        let state = self.state.read();
        ContextSnapshot {
            recent_transcripts: state.transcripts.iter().cloned().collect(),
            topics: state.topics.iter().cloned().collect(),
            keywords: state.keywords.clone(),
            engagement: state.engagement,
            taken_at: Utc::now(),
        }
    }
}

fn push_bounded<T>(deque: &mut VecDeque<T>, item: T, window: usize) {
    deque.push_back(item);
    while deque.len() > window {
        deque.pop_front();
    }
}
