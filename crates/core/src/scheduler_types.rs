//! Scheduler and rate-limiter data model (C9, C10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledComment {
    pub id: String,
    pub text: String,
    pub priority: i64,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
}

impl ScheduledComment {
    pub fn new(id: impl Into<String>, text: impl Into<String>, priority: i64) -> Self {
        Self { id: id.into(), text: text.into(), priority, enqueued_at: Utc::now(), retry_count: 0 }
    }
}

/// Ordering for the priority queue: descending priority, ascending
/// enqueue-time (spec §4.9).
impl Eq for ScheduledComment {}

impl PartialOrd for ScheduledComment {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledComment {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateLimitRejection {
    Invalid,
    Duplicate,
    Cooldown,
    MinInterval,
    RateLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub reason: Option<RateLimitRejection>,
    pub retry_after: Option<std::time::Duration>,
}

impl RateLimitDecision {
    pub fn allow() -> Self {
        Self { allowed: true, reason: None, retry_after: None }
    }

    pub fn reject(reason: RateLimitRejection, retry_after: Option<std::time::Duration>) -> Self {
        Self { allowed: false, reason: Some(reason), retry_after }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn higher_priority_dequeues_first() {
        let mut heap = BinaryHeap::new();
        heap.push(ScheduledComment::new("a", "low", 1));
        heap.push(ScheduledComment::new("b", "high", 10));
        heap.push(ScheduledComment::new("c", "mid", 5));
        assert_eq!(heap.pop().unwrap().id, "b");
        assert_eq!(heap.pop().unwrap().id, "c");
        assert_eq!(heap.pop().unwrap().id, "a");
    }

    #[test]
    fn equal_priority_breaks_tie_by_enqueue_order() {
        let mut first = ScheduledComment::new("first", "x", 5);
        first.enqueued_at = Utc::now() - chrono::Duration::seconds(10);
        let second = ScheduledComment::new("second", "x", 5);

        let mut heap = BinaryHeap::new();
        heap.push(second.clone());
        heap.push(first.clone());
        assert_eq!(heap.pop().unwrap().id, "first");
    }
}
