//! Wires `ConfigDocument` into a runnable `PipelineCoordinator`.
//!
//! No concrete STT/LLM/moderation/chat adapter ships in this workspace
//! (spec's Non-goals: "no concrete third-party protocol clients") so the
//! runtime backend is `castbot-core`'s in-memory mock providers, one per
//! configured provider name. A real deployment swaps these for network
//! adapters implementing the same trait without touching this file.

use std::sync::Arc;
use std::time::Duration;

use castbot_config::ConfigDocument;
use castbot_core::mocks::{MockChatProvider, MockLlmProvider, MockModerationProvider, MockSttProvider};
use castbot_core::ProviderRegistry;
use castbot_coordinator::PipelineCoordinator;
use castbot_failover::{FailoverConfig, FailoverController};
use castbot_moderation::ModerationManager;
use castbot_pipeline::{ContextStore, ContextStoreConfig, OpportunityDetector, OpportunityDetectorConfig, SttPipeline};
use castbot_scheduler::{RateLimiter, RateLimiterConfig};

pub type Coordinator = PipelineCoordinator<MockSttProvider, MockLlmProvider, MockModerationProvider, MockChatProvider>;

fn registry<P>(names: &[String], make: impl Fn(&str) -> Arc<P>) -> ProviderRegistry<P> {
    let providers: Vec<(String, Arc<P>)> = names.iter().map(|name| (name.clone(), make(name))).collect();
    let providers = if providers.is_empty() { vec![("default".to_string(), make("default"))] } else { providers };
    ProviderRegistry::new(providers).expect("at least one provider entry is always constructed")
}

pub fn build_coordinator(doc: &ConfigDocument) -> Coordinator {
    let stt_registry = registry(&doc.providers.stt, |name| Arc::new(MockSttProvider::healthy(name)));
    let stt_failover = FailoverController::new(stt_registry, FailoverConfig::default());
    let stt_pipeline = SttPipeline::new(stt_failover);

    let llm_registry = registry(&doc.providers.llm, |name| Arc::new(MockLlmProvider::new(name, "thanks for watching, let me know what you think!")));
    let classifier = llm_registry.entries().first().map(|e| e.provider.clone());
    let llm_failover = FailoverController::new(llm_registry, FailoverConfig::default());
    let opportunity = OpportunityDetector::new(classifier, OpportunityDetectorConfig::default());

    let moderation_names = &doc.providers.moderation;
    let primary_name = moderation_names.first().cloned().unwrap_or_else(|| "moderation-primary".to_string());
    let fallback_name = moderation_names.get(1).cloned().unwrap_or_else(|| format!("{primary_name}-fallback"));
    let moderation = ModerationManager::new(Arc::new(MockModerationProvider::approving(primary_name)), Arc::new(MockModerationProvider::approving(fallback_name)));

    let rate_limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
        min_interval: Duration::from_secs(doc.rate_limit.min_interval_secs),
        window: Duration::from_secs(doc.rate_limit.window_secs),
        window_max: doc.rate_limit.window_max,
        cooldown: Duration::from_secs(doc.rate_limit.cooldown_secs),
        dedupe_window: Duration::from_secs(doc.rate_limit.dedupe_window_secs),
    }));

    let chat_registry = registry(&doc.providers.chat, |name| Arc::new(MockChatProvider::new(name)));
    let chat_failover = FailoverController::new(chat_registry, FailoverConfig::default());

    PipelineCoordinator::new(
        stt_pipeline,
        ContextStore::new(ContextStoreConfig::default()),
        opportunity,
        llm_failover,
        moderation,
        rate_limiter,
        chat_failover,
        doc.comment_policy.clone(),
        doc.safety_policy.clone(),
        Duration::from_secs(doc.rate_limit.min_interval_secs),
        Duration::from_secs(doc.rate_limit.dedupe_window_secs),
    )
}
