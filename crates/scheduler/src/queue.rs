//! Scheduler (C10): a priority queue of `ScheduledComment`s dispatched on
//! a fixed tick against the `RateLimiter`, with bounded retry and a
//! {stopped, running, paused} lifecycle (spec §4.9).
//!
//! Grounded on the teacher's periodic-task idiom (`tokio::time::interval`
//! driving a background loop, as in `castbot-failover`'s health loop)
//! generalized to a priority dequeue instead of a health reprobe.

use std::collections::{BinaryHeap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use castbot_core::{RateLimitRejection, ScheduledComment, SchedulerState};
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub processing_interval: Duration,
    pub max_queue_len: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_secs(1),
            max_queue_len: 256,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Processed { id: String },
    Failed { id: String, reason: String },
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    DuplicateId,
    QueueFull,
}

struct Inner {
    queue: Mutex<BinaryHeap<ScheduledComment>>,
    known_ids: Mutex<HashSet<String>>,
    state: Mutex<SchedulerState>,
    config: SchedulerConfig,
    rate_limiter: Arc<RateLimiter>,
    events: mpsc::UnboundedSender<SchedulerEvent>,
    pending_retries: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

/// The Scheduler itself. Cloneable handles share one queue and state via
/// `Arc`; `Scheduler::spawn` owns the tick-loop task.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(rate_limiter: Arc<RateLimiter>, config: SchedulerConfig) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(BinaryHeap::new()),
                known_ids: Mutex::new(HashSet::new()),
                state: Mutex::new(SchedulerState::Stopped),
                config,
                rate_limiter,
                events: tx,
                pending_retries: Mutex::new(Vec::new()),
            }),
        };
        (scheduler, rx)
    }

    pub fn state(&self) -> SchedulerState {
        *self.inner.state.lock()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Rejects a duplicate id or a full queue (spec §4.9).
    pub fn enqueue(&self, comment: ScheduledComment) -> Result<(), EnqueueError> {
        let mut ids = self.inner.known_ids.lock();
        if ids.contains(&comment.id) {
            return Err(EnqueueError::DuplicateId);
        }
        let mut queue = self.inner.queue.lock();
        if queue.len() >= self.inner.config.max_queue_len {
            return Err(EnqueueError::QueueFull);
        }
        ids.insert(comment.id.clone());
        queue.push(comment);
        Ok(())
    }

    /// stopped -> running.
    pub fn start(&self) {
        *self.inner.state.lock() = SchedulerState::Running;
    }

    /// running -> paused. No further dequeues occur until `resume`.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if *state == SchedulerState::Running {
            *state = SchedulerState::Paused;
        }
    }

    /// paused -> running.
    pub fn resume(&self) {
        let mut state = self.inner.state.lock();
        if *state == SchedulerState::Paused {
            *state = SchedulerState::Running;
        }
    }

    /// any -> stopped. Cancels all pending retry timers and drops the
    /// queue entirely (spec §4.9: "stop leaves the queue empty").
    pub fn stop(&self) {
        *self.inner.state.lock() = SchedulerState::Stopped;
        self.inner.queue.lock().clear();
        self.inner.known_ids.lock().clear();
        for handle in self.inner.pending_retries.lock().drain(..) {
            handle.abort();
        }
    }

    /// Spawns the tick loop as a background task. The caller owns the
    /// returned handle's lifetime; dropping/aborting it stops dispatch
    /// (in addition to `stop()`, which is the graceful path).
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let scheduler = self.clone();
        let interval = scheduler.inner.config.processing_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                scheduler.tick();
            }
        })
    }

    /// Dequeues the highest-priority item (if running) and evaluates it
    /// against the rate limiter, per spec §4.9 step-by-step dispatch.
    pub fn tick(&self) {
        if self.state() != SchedulerState::Running {
            return;
        }
        let Some(mut item) = self.inner.queue.lock().pop() else {
            return;
        };

        let rate_limiter = self.inner.rate_limiter.clone();
        let text = item.text.clone();
        let decision = match std::panic::catch_unwind(AssertUnwindSafe(|| rate_limiter.check(&text, Utc::now()))) {
            Ok(decision) => decision,
            Err(_) => {
                let _ = self.inner.events.send(SchedulerEvent::Error {
                    message: format!("rate limiter panicked evaluating comment {}", item.id),
                });
                self.inner.known_ids.lock().remove(&item.id);
                return;
            }
        };

        if decision.allowed {
            self.inner.known_ids.lock().remove(&item.id);
            let _ = self.inner.events.send(SchedulerEvent::Processed { id: item.id });
            return;
        }

        match decision.reason {
            Some(RateLimitRejection::Duplicate) => {
                self.inner.known_ids.lock().remove(&item.id);
                let _ = self.inner.events.send(SchedulerEvent::Failed { id: item.id, reason: "duplicate".to_string() });
            }
            reason => {
                if item.retry_count < self.inner.config.max_retries {
                    item.retry_count += 1;
                    self.schedule_retry(item);
                } else {
                    self.inner.known_ids.lock().remove(&item.id);
                    warn!(reason = ?reason, "comment exhausted retries");
                    let _ = self.inner.events.send(SchedulerEvent::Failed { id: item.id, reason: "max_retries".to_string() });
                }
            }
        }
    }

    /// Re-enqueues `item` after the configured retry delay, keeping its
    /// original enqueue time so it still sorts ahead of same-priority
    /// items enqueued later (spec: "push back to queue head").
    fn schedule_retry(&self, item: ScheduledComment) {
        let scheduler = self.clone();
        let delay = self.inner.config.retry_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.inner.queue.lock().push(item);
        });
        self.inner.pending_retries.lock().push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limiter::RateLimiterConfig;

    fn scheduler_with(max_retries: u32) -> (Scheduler, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
            min_interval: Duration::from_secs(0),
            window: Duration::from_secs(600),
            window_max: 1,
            cooldown: Duration::from_secs(1),
            dedupe_window: Duration::from_secs(1),
        }));
        Scheduler::new(
            limiter,
            SchedulerConfig { processing_interval: Duration::from_millis(10), max_queue_len: 10, max_retries, retry_delay: Duration::from_millis(10) },
        )
    }

    #[test]
    fn enqueue_rejects_duplicate_id() {
        let (scheduler, _rx) = scheduler_with(3);
        scheduler.enqueue(ScheduledComment::new("a", "hello", 1)).unwrap();
        assert_eq!(scheduler.enqueue(ScheduledComment::new("a", "world", 1)), Err(EnqueueError::DuplicateId));
    }

    #[test]
    fn enqueue_rejects_when_queue_full() {
        let (scheduler, _rx) = scheduler_with(3);
        for i in 0..10 {
            scheduler.enqueue(ScheduledComment::new(format!("id-{i}"), "x", 1)).unwrap();
        }
        assert_eq!(scheduler.enqueue(ScheduledComment::new("overflow", "x", 1)), Err(EnqueueError::QueueFull));
    }

    #[tokio::test]
    async fn paused_scheduler_does_not_dequeue() {
        let (scheduler, mut rx) = scheduler_with(3);
        scheduler.start();
        scheduler.pause();
        scheduler.enqueue(ScheduledComment::new("a", "hello", 1)).unwrap();
        scheduler.tick();
        assert_eq!(scheduler.queue_len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn allowed_item_emits_processed_and_drains_queue() {
        let (scheduler, mut rx) = scheduler_with(3);
        scheduler.start();
        scheduler.enqueue(ScheduledComment::new("a", "hello", 1)).unwrap();
        scheduler.tick();
        match rx.recv().await.unwrap() {
            SchedulerEvent::Processed { id } => assert_eq!(id, "a"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(scheduler.queue_len(), 0);
    }

    #[tokio::test]
    async fn duplicate_rejection_drops_without_retry() {
        let (scheduler, mut rx) = scheduler_with(3);
        scheduler.start();
        scheduler.enqueue(ScheduledComment::new("a", "hello", 1)).unwrap();
        scheduler.tick();
        rx.recv().await.unwrap();

        scheduler.enqueue(ScheduledComment::new("b", "hello", 1)).unwrap();
        scheduler.tick();
        match rx.recv().await.unwrap() {
            SchedulerEvent::Failed { id, reason } => {
                assert_eq!(id, "b");
                assert_eq!(reason, "duplicate");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(scheduler.queue_len(), 0);
    }

    #[tokio::test]
    async fn exhausted_retries_emit_failed_max_retries() {
        let (scheduler, mut rx) = scheduler_with(0);
        scheduler.start();
        scheduler.enqueue(ScheduledComment::new("a", "hello", 1)).unwrap();
        scheduler.tick(); // allowed, consumes the window_max=1 slot
        rx.recv().await.unwrap();
        scheduler.enqueue(ScheduledComment::new("b", "world", 1)).unwrap();
        scheduler.tick(); // rate_limit rejection, max_retries=0 -> immediate failure
        match rx.recv().await.unwrap() {
            SchedulerEvent::Failed { id, reason } => {
                assert_eq!(id, "b");
                assert_eq!(reason, "max_retries");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn stop_clears_queue_and_cancels_retries() {
        let (scheduler, _rx) = scheduler_with(3);
        scheduler.start();
        scheduler.enqueue(ScheduledComment::new("a", "hello", 1)).unwrap();
        scheduler.stop();
        assert_eq!(scheduler.queue_len(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }
}
