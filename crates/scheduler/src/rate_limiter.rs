//! RateLimiter (C9, spec §4.8): dedupe, cooldown, min-interval, and
//! sliding-window rules evaluated in a fixed order, first-failing-rule
//! wins.

use std::collections::VecDeque;
use std::time::Duration as StdDuration;

use castbot_core::{RateLimitDecision, RateLimitRejection};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub min_interval: StdDuration,
    pub window: StdDuration,
    pub window_max: usize,
    pub cooldown: StdDuration,
    pub dedupe_window: StdDuration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: StdDuration::from_secs(15),
            window: StdDuration::from_secs(600),
            window_max: 20,
            cooldown: StdDuration::from_secs(120),
            dedupe_window: StdDuration::from_secs(60),
        }
    }
}

struct PostRecord {
    normalized: String,
    posted_at: DateTime<Utc>,
}

/// Normalizes text for dedupe comparison: trim, lower-case, fold
/// whitespace runs (including full-width space U+3000) to a single
/// space, and collapse runs of repeated punctuation to one instance.
pub fn normalize_for_dedupe(text: &str) -> String {
    let trimmed = text.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut last_was_space = false;
    let mut last_punct: Option<char> = None;

    for ch in trimmed.chars() {
        let folded = ch.to_lowercase().next().unwrap_or(ch);
        if folded.is_whitespace() || folded == '\u{3000}' {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
            last_punct = None;
            continue;
        }
        last_was_space = false;

        if folded.is_ascii_punctuation() {
            if last_punct == Some(folded) {
                continue;
            }
            last_punct = Some(folded);
        } else {
            last_punct = None;
        }
        out.push(folded);
    }
    out
}

fn to_chrono(d: StdDuration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or(ChronoDuration::zero())
}

fn to_std(d: ChronoDuration) -> StdDuration {
    d.to_std().unwrap_or(StdDuration::ZERO)
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    records: Mutex<VecDeque<PostRecord>>,
    last_post: Mutex<Option<DateTime<Utc>>>,
    cooldown_until: Mutex<Option<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self { config, records: Mutex::new(VecDeque::new()), last_post: Mutex::new(None), cooldown_until: Mutex::new(None) }
    }

    /// Evaluates the rules in spec order; the first failing rule wins.
    /// On allow, records the post and, if 3+ posts were allowed within
    /// the last 60s, enters cooldown.
    pub fn check(&self, text: &str, now: DateTime<Utc>) -> RateLimitDecision {
        if text.trim().is_empty() {
            return RateLimitDecision::reject(RateLimitRejection::Invalid, None);
        }
        let normalized = normalize_for_dedupe(text);

        let mut records = self.records.lock();

        let dedupe_cutoff = now - to_chrono(self.config.dedupe_window);
        if records.iter().any(|r| r.posted_at >= dedupe_cutoff && r.normalized == normalized) {
            return RateLimitDecision::reject(RateLimitRejection::Duplicate, None);
        }

        if let Some(until) = *self.cooldown_until.lock() {
            if now < until {
                return RateLimitDecision::reject(RateLimitRejection::Cooldown, Some(to_std(until - now)));
            }
        }

        if let Some(last) = *self.last_post.lock() {
            let elapsed = now - last;
            let min_interval = to_chrono(self.config.min_interval);
            if elapsed < min_interval {
                return RateLimitDecision::reject(RateLimitRejection::MinInterval, Some(to_std(min_interval - elapsed)));
            }
        }

        let window_cutoff = now - to_chrono(self.config.window);
        let in_window: Vec<DateTime<Utc>> = records.iter().filter(|r| r.posted_at >= window_cutoff).map(|r| r.posted_at).collect();
        if in_window.len() >= self.config.window_max {
            let oldest = in_window.into_iter().min().unwrap();
            let exits_at = oldest + to_chrono(self.config.window);
            return RateLimitDecision::reject(RateLimitRejection::RateLimit, Some(to_std(exits_at - now)));
        }

        records.push_back(PostRecord { normalized, posted_at: now });
        *self.last_post.lock() = Some(now);

        let recent_60s = now - ChronoDuration::seconds(60);
        let allowed_recently = records.iter().filter(|r| r.posted_at >= recent_60s).count();
        if allowed_recently >= 3 {
            *self.cooldown_until.lock() = Some(now + to_chrono(self.config.cooldown));
        }

        RateLimitDecision::allow()
    }

    /// Discards records older than `max(window, dedupe_window)`.
    /// Intended to be driven by a periodic tick alongside `check`.
    pub fn cleanup(&self, now: DateTime<Utc>) {
        let horizon = self.config.window.max(self.config.dedupe_window);
        let cutoff = now - to_chrono(horizon);
        let mut records = self.records.lock();
        records.retain(|r| r.posted_at >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            min_interval: StdDuration::from_secs(10),
            window: StdDuration::from_secs(600),
            window_max: 20,
            cooldown: StdDuration::from_secs(120),
            dedupe_window: StdDuration::from_secs(60),
        })
    }

    #[test]
    fn empty_text_is_invalid() {
        let limiter = limiter();
        let decision = limiter.check("   ", Utc::now());
        assert_eq!(decision.reason, Some(RateLimitRejection::Invalid));
    }

    #[test]
    fn duplicate_within_dedupe_window_is_rejected() {
        let limiter = limiter();
        let t0 = Utc::now();
        assert!(limiter.check("hello", t0).allowed);
        let decision = limiter.check("hello ", t0 + ChronoDuration::seconds(5));
        assert_eq!(decision.reason, Some(RateLimitRejection::Duplicate));
    }

    #[test]
    fn min_interval_blocks_rapid_distinct_posts() {
        let limiter = limiter();
        let t0 = Utc::now();
        assert!(limiter.check("hello", t0).allowed);
        let decision = limiter.check("goodbye", t0 + ChronoDuration::seconds(5));
        assert_eq!(decision.reason, Some(RateLimitRejection::MinInterval));
    }

    #[test]
    fn sliding_window_caps_total_posts() {
        let config = RateLimiterConfig { min_interval: StdDuration::from_secs(1), window: StdDuration::from_secs(600), window_max: 3, cooldown: StdDuration::from_secs(120), dedupe_window: StdDuration::from_secs(1) };
        let limiter = RateLimiter::new(config);
        let t0 = Utc::now();
        for i in 0..3 {
            let decision = limiter.check(&format!("msg-{i}"), t0 + ChronoDuration::seconds(i));
            assert!(decision.allowed, "post {i} should be allowed");
        }
        let decision = limiter.check("msg-3", t0 + ChronoDuration::seconds(3));
        assert_eq!(decision.reason, Some(RateLimitRejection::RateLimit));
        assert!(decision.retry_after.unwrap() > StdDuration::ZERO);
    }

    #[test]
    fn three_allowed_posts_within_sixty_seconds_trigger_cooldown() {
        let config = RateLimiterConfig { min_interval: StdDuration::from_secs(1), window: StdDuration::from_secs(600), window_max: 20, cooldown: StdDuration::from_secs(120), dedupe_window: StdDuration::from_secs(1) };
        let limiter = RateLimiter::new(config);
        let t0 = Utc::now();
        for i in 0..3 {
            assert!(limiter.check(&format!("msg-{i}"), t0 + ChronoDuration::seconds(i * 2)).allowed);
        }
        let decision = limiter.check("msg-after-cooldown", t0 + ChronoDuration::seconds(10));
        assert_eq!(decision.reason, Some(RateLimitRejection::Cooldown));
    }

    #[test]
    fn cleanup_discards_old_records() {
        let limiter = limiter();
        let t0 = Utc::now();
        limiter.check("hello", t0);
        limiter.cleanup(t0 + ChronoDuration::seconds(1000));
        assert!(limiter.records.lock().is_empty());
    }
}
