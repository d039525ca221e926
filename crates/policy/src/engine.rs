//! PolicyEngine (C7): applies forbidden-term redaction, length
//! adjustment, and emoji normalization in that order (spec §4.6).

use std::time::Duration;

use castbot_core::CommentPolicy;
use chrono::{DateTime, Utc};

use crate::emoji::{self, RecentEmojiRecord};
use crate::forbidden::ForbiddenTermMatcher;
use crate::length;

pub struct PolicyEngine {
    forbidden: ForbiddenTermMatcher,
    anti_repetition_window: Duration,
}

impl PolicyEngine {
    pub fn new(forbidden_terms: impl IntoIterator<Item = String>, anti_repetition_window: Duration) -> Self {
        Self { forbidden: ForbiddenTermMatcher::new(forbidden_terms), anti_repetition_window }
    }

    /// Applies all three sub-policies in spec order, against a live
    /// `CommentPolicy` snapshot (so a config update is observed
    /// atomically — spec §5 ordering guarantee).
    pub fn apply(&self, text: &str, policy: &CommentPolicy) -> String {
        let redacted = self.forbidden.redact(text);
        let length_adjusted = length::adjust(&redacted, policy.target_length, &policy.persona);
        emoji::sanitize(&length_adjusted, &policy.emoji_policy)
    }

    pub fn contains_forbidden_term(&self, text: &str) -> bool {
        self.forbidden.matches(text)
    }

    /// True if `candidate`'s emoji set collides with any recent comment
    /// within the anti-repetition window.
    pub fn violates_anti_repetition(&self, candidate: &str, recent: &[RecentEmojiRecord], now: DateTime<Utc>) -> bool {
        let current = emoji::extract_emoji(candidate);
        emoji::violates_anti_repetition(&current, recent, self.anti_repetition_window, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::{CommentPolicy, EmojiPolicy, LengthRange};

    fn policy_with(min: usize, max: usize, emoji_max: usize, allowed: &[&str]) -> CommentPolicy {
        CommentPolicy {
            tone: "cheerful".into(),
            persona: "cheerful".into(),
            encouraged_expressions: Vec::new(),
            forbidden_terms: Default::default(),
            emoji_policy: EmojiPolicy { enabled: true, max_count: emoji_max, allowed: allowed.iter().map(|s| s.to_string()).collect() },
            target_length: LengthRange::new(min, max).unwrap(),
        }
    }

    #[test]
    fn apply_redacts_extends_and_sanitizes_in_order() {
        let engine = PolicyEngine::new(vec!["バカ".to_string()], Duration::from_secs(60));
        let policy = policy_with(20, 60, 1, &["👏", "✨"]);
        let result = engine.apply("ばか野郎👏✨", &policy);
        assert!(!engine.contains_forbidden_term(&result));
        assert!(result.chars().count() >= 20);
        assert_eq!(crate::emoji::extract_emoji(&result).len(), 1);
    }
}
