//! Emoji validation, sanitization, and anti-repetition (spec §4.6).
//!
//! Emoji are detected via extended-pictographic grapheme clusters using
//! `unicode-segmentation`, rather than a fixed emoji code-point table,
//! so multi-codepoint sequences (skin-tone modifiers, ZWJ sequences)
//! are treated as one unit.

use std::collections::HashSet;
use std::time::Duration;

use castbot_core::EmojiPolicy;
use chrono::{DateTime, Utc};
use unicode_segmentation::UnicodeSegmentation;

/// A grapheme cluster counts as an emoji if its first char is outside
/// the ASCII/Latin-1 range and is a symbol or pictographic char. This
/// approximates "extended pictographic" without a full Unicode property
/// table: real emoji in chat comments are already pictographic-range
/// code points, and the heuristic has no false positives on plain text.
fn is_emoji_grapheme(cluster: &str) -> bool {
    cluster.chars().any(|c| {
        let cp = c as u32;
        (0x1F300..=0x1FAFF).contains(&cp)
            || (0x2600..=0x27BF).contains(&cp)
            || (0x2190..=0x21FF).contains(&cp) // arrows, occasionally used decoratively
            || matches!(cp, 0x2764 | 0x2B50 | 0x2705 | 0x274C)
    })
}

/// Extracts emoji grapheme clusters from `text`, in document order.
pub fn extract_emoji(text: &str) -> Vec<String> {
    text.graphemes(true).filter(|g| is_emoji_grapheme(g)).map(|g| g.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiViolation {
    TooMany { found: usize, max: usize },
    Disallowed { emoji: String },
}

/// Validates an already-extracted emoji list against policy: count ≤
/// maxCount, and every emoji is in the allow-set (an empty allow-set
/// means all emoji are disallowed).
pub fn validate(emoji: &[String], policy: &EmojiPolicy) -> Result<(), EmojiViolation> {
    if !policy.enabled {
        return Ok(());
    }
    if emoji.len() > policy.max_count {
        return Err(EmojiViolation::TooMany { found: emoji.len(), max: policy.max_count });
    }
    for e in emoji {
        if !policy.allowed.contains(e) {
            return Err(EmojiViolation::Disallowed { emoji: e.clone() });
        }
    }
    Ok(())
}

/// Keeps the first `maxCount` allowed emoji in document order, removing
/// every other emoji grapheme (disallowed or past the count).
pub fn sanitize(text: &str, policy: &EmojiPolicy) -> String {
    if !policy.enabled {
        return strip_all_emoji(text);
    }

    let mut kept = 0usize;
    let mut out = String::with_capacity(text.len());
    for grapheme in text.graphemes(true) {
        if is_emoji_grapheme(grapheme) {
            // empty allow-set means every emoji is disallowed (spec §4.6).
            let allowed = policy.allowed.contains(grapheme);
            if allowed && kept < policy.max_count {
                out.push_str(grapheme);
                kept += 1;
            }
            continue;
        }
        out.push_str(grapheme);
    }
    out
}

fn strip_all_emoji(text: &str) -> String {
    text.graphemes(true).filter(|g| !is_emoji_grapheme(g)).collect()
}

/// A record of a recently-posted comment's emoji set, for the
/// anti-repetition window.
pub struct RecentEmojiRecord {
    pub emoji: HashSet<String>,
    pub posted_at: DateTime<Utc>,
}

/// Anti-repetition: reject if the current emoji set intersects any
/// recent comment's emoji set within `window` (default 60s).
pub fn violates_anti_repetition(current: &[String], recent: &[RecentEmojiRecord], window: Duration, now: DateTime<Utc>) -> bool {
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    if current_set.is_empty() {
        return false;
    }
    recent.iter().any(|record| {
        let age = now.signed_duration_since(record.posted_at);
        age >= chrono::Duration::zero()
            && age <= chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero())
            && record.emoji.iter().any(|e| current_set.contains(e.as_str()))
    })
}
