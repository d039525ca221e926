//! FailoverController (C2): health-aware routing over an ordered,
//! homogeneous provider list.
//!
//! Grounded on the teacher's provider-selection pattern in
//! `llm/factory.rs` (config-driven backend choice, one active provider),
//! generalized here to runtime failover across already-constructed
//! providers, plus the recoverable/retry-delay split in
//! `cim-domain-agent`'s `chat_port.rs`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use castbot_core::{Probeable, ProviderEntry, ProviderError, ProviderRegistry};
use thiserror::Error;
use tracing::{debug, warn};

/// Health-reprobe cadence. Spec leaves this open (5s in source tests,
/// 30s in production) — exposed as a config knob rather than a constant.
#[derive(Debug, Clone, Copy)]
pub struct FailoverConfig {
    pub health_check_interval: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self { health_check_interval: Duration::from_secs(30) }
    }
}

#[derive(Debug, Clone, Error)]
#[error("all providers failed: tried [{}]", .attempted.join(", "))]
pub struct AllProvidersFailed {
    pub attempted: Vec<String>,
    pub last_error: Option<String>,
}

/// Wraps an ordered list of homogeneous providers and routes `execute`
/// calls to the first healthy one, falling forward on retryable failure.
pub struct FailoverController<P> {
    registry: ProviderRegistry<P>,
    config: FailoverConfig,
}

impl<P: Probeable + 'static> FailoverController<P> {
    pub fn new(registry: ProviderRegistry<P>, config: FailoverConfig) -> Self {
        Self { registry, config }
    }

    /// `execute` calls each healthy provider at most once per invocation.
    /// A retryable error marks the provider unhealthy and advances to the
    /// next; a fatal (non-retryable) error propagates immediately without
    /// calling subsequent providers. No partial-result union.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, AllProvidersFailed>
    where
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempted = Vec::new();
        let mut last_error = None;

        for entry in self.registry.entries() {
            if !entry.is_healthy() {
                continue;
            }
            attempted.push(entry.name.clone());
            match op(entry.provider.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.retryable => {
                    warn!(provider = %entry.name, error = %err.message, "provider failed, advancing");
                    entry.mark_unhealthy();
                    last_error = Some(err.message);
                }
                Err(err) => {
                    debug!(provider = %entry.name, error = %err.message, "provider failed fatally, aborting");
                    return Err(AllProvidersFailed { attempted, last_error: Some(err.message) });
                }
            }
        }

        Err(AllProvidersFailed { attempted, last_error })
    }

    /// Re-probes every provider's health operation and resets its flag on
    /// success. Intended to be driven by a periodic tick
    /// (`FailoverConfig::health_check_interval`); concurrent executions
    /// share the health table but do not serialize on it.
    pub async fn reprobe_all(&self) {
        for entry in self.registry.entries() {
            if entry.provider.healthy().await {
                entry.mark_healthy();
            } else {
                entry.mark_unhealthy();
            }
        }
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Spawns a background task that reprobes health on
    /// `config.health_check_interval`. Returns a handle the caller should
    /// keep (or abort) alongside the controller's own lifetime.
    pub fn spawn_health_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        P: Send + Sync,
    {
        let interval = self.config.health_check_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.reprobe_all().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::mocks::MockSttProvider;
    use castbot_core::{SttProvider, SttOptions, Transcript};

    fn registry_of(providers: Vec<(&str, Arc<MockSttProvider>)>) -> ProviderRegistry<MockSttProvider> {
        ProviderRegistry::new(providers.into_iter().map(|(n, p)| (n.to_string(), p)).collect()).unwrap()
    }

    #[tokio::test]
    async fn retryable_failure_advances_to_next_provider() {
        let a = Arc::new(MockSttProvider::failing("a", "timeout"));
        let b = Arc::new(MockSttProvider::healthy("b"));
        b.push(Transcript::new("hello", 0.9, "b"));

        let controller = FailoverController::new(registry_of(vec![("a", a), ("b", b)]), FailoverConfig::default());

        let frame = castbot_core::AudioFrame::new(vec![0u8; 4], castbot_core::SampleRate(16000), castbot_core::Channels::Mono);
        let result = controller
            .execute(|p| {
                let frame = frame.clone();
                async move { p.transcribe(&frame, &SttOptions::default()).await }
            })
            .await
            .unwrap();
        assert_eq!(result.text, "hello");
        assert!(!controller.registry.entries()[0].is_healthy());
    }

    #[tokio::test]
    async fn fatal_error_aborts_without_calling_next() {
        let a = Arc::new(MockSttProvider::healthy("a")); // empty canned queue -> fatal "no canned transcript"
        let b = Arc::new(MockSttProvider::healthy("b"));
        b.push(Transcript::new("unused", 0.9, "b"));

        let controller = FailoverController::new(registry_of(vec![("a", a), ("b", b)]), FailoverConfig::default());
        let frame = castbot_core::AudioFrame::new(vec![0u8; 4], castbot_core::SampleRate(16000), castbot_core::Channels::Mono);
        let result = controller
            .execute(|p| {
                let frame = frame.clone();
                async move { p.transcribe(&frame, &SttOptions::default()).await }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(controller.registry.entries()[1].is_healthy(), true);
    }

    #[tokio::test]
    async fn all_providers_unhealthy_fails() {
        let a = Arc::new(MockSttProvider::failing("a", "down"));
        let controller = FailoverController::new(registry_of(vec![("a", a)]), FailoverConfig::default());
        let frame = castbot_core::AudioFrame::new(vec![0u8; 4], castbot_core::SampleRate(16000), castbot_core::Channels::Mono);
        let result = controller
            .execute(|p| {
                let frame = frame.clone();
                async move { p.transcribe(&frame, &SttOptions::default()).await }
            })
            .await;
        assert!(result.is_err());
        assert!(!controller.registry.entries()[0].is_healthy());
    }

    #[tokio::test]
    async fn reprobe_resets_health_flag() {
        let a = Arc::new(MockSttProvider::healthy("a"));
        a.push(Transcript::new("ok", 0.9, "a"));
        let controller = FailoverController::new(registry_of(vec![("a", a.clone())]), FailoverConfig::default());
        controller.registry.entries()[0].mark_unhealthy();
        assert!(!controller.registry.entries()[0].is_healthy());
        controller.reprobe_all().await;
        assert!(controller.registry.entries()[0].is_healthy());
    }
}
