//! PipelineCoordinator (C11): the sole owner of ContextStore,
//! RateLimiter, and Scheduler (spec §3 Ownership). Glues STTPipeline,
//! OpportunityDetector, LLM generation, PolicyEngine, ModerationManager,
//! and the chat FailoverController into `process_audio` (spec §4.10).

use std::sync::Arc;
use std::time::Duration;

use castbot_core::{
    AudioFrame, ChatProvider, CommentPolicy, LlmProvider, ModerationProvider, Probeable,
    ProviderError, ProviderResult, SafetyPolicy, SchedulerState, SttOptions, SttProvider,
    SuggestedAction,
};
use castbot_failover::FailoverController;
use castbot_moderation::ModerationManager;
use castbot_pipeline::{ContextStore, OpportunityDetector, SttPipeline};
use castbot_policy::PolicyEngine;
use castbot_scheduler::RateLimiter;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::result::ProcessResult;

/// Per-provider operation deadline for chat posting (spec §5: "5 s for
/// chat post"). Expiry is treated as a retryable failure, same as any
/// other provider error, so `FailoverController` advances to the next
/// chat provider rather than surfacing the timeout to the caller.
const CHAT_POST_TIMEOUT: Duration = Duration::from_secs(5);

async fn with_timeout<T>(duration: Duration, provider: &str, fut: impl std::future::Future<Output = ProviderResult<T>>) -> ProviderResult<T> {
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::retryable(provider, format!("operation timed out after {duration:?}"))),
    }
}

/// The atomically-swapped bundle of mutable, config-derived state. A
/// config update replaces this `Arc` wholesale so no sub-component ever
/// observes a partial update (spec §5).
struct Runtime {
    comment_policy: CommentPolicy,
    safety_policy: SafetyPolicy,
    policy_engine: PolicyEngine,
    rewrite_guidelines: String,
}

impl Runtime {
    fn new(comment_policy: CommentPolicy, safety_policy: SafetyPolicy, anti_repetition_window: Duration) -> Self {
        let policy_engine = PolicyEngine::new(comment_policy.forbidden_terms.clone(), anti_repetition_window);
        let rewrite_guidelines = format!("Keep the {} tone of a {} persona; avoid flagged content.", comment_policy.tone, comment_policy.persona);
        Self { comment_policy, safety_policy, policy_engine, rewrite_guidelines }
    }
}

pub struct PipelineCoordinator<SttP, LlmP, ModP, ChatP>
where
    SttP: SttProvider + 'static,
    LlmP: LlmProvider + 'static,
    ModP: ModerationProvider + 'static,
    ChatP: ChatProvider + 'static,
{
    stt: SttPipeline<SttP>,
    context: ContextStore,
    opportunity: OpportunityDetector<LlmP>,
    llm: FailoverController<LlmP>,
    moderation: ModerationManager<ModP>,
    rate_limiter: Arc<RateLimiter>,
    chat: FailoverController<ChatP>,
    runtime: RwLock<Arc<Runtime>>,
    state: Mutex<SchedulerState>,
    chat_id: Mutex<Option<String>>,
    last_comment_at: Mutex<Option<chrono::DateTime<Utc>>>,
    min_comment_interval: Duration,
}

impl<SttP, LlmP, ModP, ChatP> PipelineCoordinator<SttP, LlmP, ModP, ChatP>
where
    SttP: SttProvider + 'static,
    LlmP: LlmProvider + 'static,
    ModP: ModerationProvider + 'static,
    ChatP: ChatProvider + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stt: SttPipeline<SttP>,
        context: ContextStore,
        opportunity: OpportunityDetector<LlmP>,
        llm: FailoverController<LlmP>,
        moderation: ModerationManager<ModP>,
        rate_limiter: Arc<RateLimiter>,
        chat: FailoverController<ChatP>,
        comment_policy: CommentPolicy,
        safety_policy: SafetyPolicy,
        min_comment_interval: Duration,
        anti_repetition_window: Duration,
    ) -> Self {
        Self {
            stt,
            context,
            opportunity,
            llm,
            moderation,
            rate_limiter,
            chat,
            runtime: RwLock::new(Arc::new(Runtime::new(comment_policy, safety_policy, anti_repetition_window))),
            state: Mutex::new(SchedulerState::Stopped),
            chat_id: Mutex::new(None),
            last_comment_at: Mutex::new(None),
            min_comment_interval,
        }
    }

    pub fn start(&self, chat_id: impl Into<String>) {
        *self.chat_id.lock() = Some(chat_id.into());
        *self.state.lock() = SchedulerState::Running;
        info!("pipeline coordinator started");
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        if *state == SchedulerState::Running {
            *state = SchedulerState::Paused;
        }
    }

    pub fn resume(&self) {
        let mut state = self.state.lock();
        if *state == SchedulerState::Paused {
            *state = SchedulerState::Running;
        }
    }

    pub fn stop(&self) {
        *self.state.lock() = SchedulerState::Stopped;
        *self.chat_id.lock() = None;
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Propagates a config update to every mutable sub-component
    /// atomically; never drops in-flight work (spec §4.10) because
    /// in-flight calls hold their own `Arc<Runtime>` clone taken at the
    /// start of `process_audio`.
    pub fn update_config(&self, comment_policy: CommentPolicy, safety_policy: SafetyPolicy, anti_repetition_window: Duration) {
        let runtime = Arc::new(Runtime::new(comment_policy, safety_policy, anti_repetition_window));
        *self.runtime.write() = runtime;
    }

    fn snapshot_runtime(&self) -> Arc<Runtime> {
        self.runtime.read().clone()
    }

    /// `processAudio(frame)` per spec §4.10, steps 1-9. Never raises to
    /// its caller; always returns a structured `ProcessResult`.
    pub async fn process_audio(&self, frame: AudioFrame) -> ProcessResult {
        if self.state() != SchedulerState::Running {
            return ProcessResult::error("coordinator is not running");
        }
        let runtime = self.snapshot_runtime();

        // 1. Transcribe via STTPipeline.
        let transcript = match self.stt.transcribe(&frame, &SttOptions::default()).await {
            Ok(t) => t,
            Err(err) => return ProcessResult::error(err.to_string()),
        };

        // 2. Append transcript to context.
        self.context.append_transcript(transcript.clone());
        let ctx = self.context.snapshot();

        // 3. Classify opportunity; if not necessary, return with posted=false.
        let opportunity = self.opportunity.classify(&transcript.text, &ctx).await;
        if !opportunity.is_necessary() {
            return ProcessResult::not_posted(Some(transcript));
        }

        let Some(chat_id) = self.chat_id.lock().clone() else {
            return ProcessResult::error("no active broadcast chat id");
        };

        // 4. Check remaining quota of chat provider - if 0, surface
        // "rate limit exceeded" without requeue (spec §7).
        if let Ok(quota) = self.chat.execute(|provider| async move { provider.get_rate_limit_info().await }).await {
            if quota.remaining == 0 {
                return ProcessResult::error("rate limit exceeded").with_transcript(transcript);
            }
        }

        // 5. Enforce min-interval against last-comment-time.
        if let Some(last) = *self.last_comment_at.lock() {
            let elapsed = Utc::now().signed_duration_since(last);
            if elapsed < chrono::Duration::from_std(self.min_comment_interval).unwrap_or_default() {
                return ProcessResult::not_posted(Some(transcript));
            }
        }

        // 6. Generate via LLM using current policy and context.
        let comment_policy = runtime.comment_policy.clone();
        let generated = self
            .llm
            .execute(|provider| {
                let ctx = ctx.clone();
                let policy = comment_policy.clone();
                async move { provider.generate_comment(&ctx, &policy).await }
            })
            .await;
        let generated = match generated {
            Ok(g) => g,
            Err(err) => return ProcessResult::error(err.to_string()).with_transcript(transcript),
        };

        // 7. Apply PolicyEngine.
        let policed_text = runtime.policy_engine.apply(&generated.comment, &runtime.comment_policy);

        // 8. Moderate; block or accept a valid rewrite.
        let outcome = self
            .moderation
            .rewrite_if_needed(&policed_text, &runtime.rewrite_guidelines, Some(&ctx), &runtime.safety_policy)
            .await;
        if outcome.original_verdict.suggested_action == SuggestedAction::Block {
            return ProcessResult::error("blocked").with_transcript(transcript);
        }
        let mut final_text = policed_text;
        if outcome.was_rewritten {
            if outcome.final_verdict.suggested_action == SuggestedAction::Block {
                return ProcessResult::error("blocked").with_transcript(transcript);
            }
            final_text = outcome.rewritten;
        }

        let decision = self.rate_limiter.check(&final_text, Utc::now());
        if !decision.allowed {
            warn!(reason = ?decision.reason, "comment suppressed by rate limiter");
            return ProcessResult::not_posted(Some(transcript));
        }

        // 9. Post via chat provider; on success, update last-comment-time,
        // append to context.
        let post_result = self
            .chat
            .execute(|provider| {
                let chat_id = chat_id.clone();
                let text = final_text.clone();
                async move {
                    let name = provider.name().to_string();
                    with_timeout(CHAT_POST_TIMEOUT, &name, provider.post(&chat_id, &text)).await
                }
            })
            .await;

        match post_result {
            Ok(result) => {
                *self.last_comment_at.lock() = Some(result.timestamp);
                self.context.append_comment(final_text.clone());
                ProcessResult::posted(Some(transcript), final_text, result.id)
            }
            Err(err) => ProcessResult::error(err.to_string()).with_transcript(transcript),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::mocks::{MockChatProvider, MockLlmProvider, MockModerationProvider, MockSttProvider};
    use castbot_core::{Channels, ModerationVerdict, ProviderRegistry, SampleRate, Transcript};
    use castbot_failover::FailoverConfig;
    use castbot_pipeline::{ContextStoreConfig, OpportunityDetectorConfig};
    use castbot_scheduler::RateLimiterConfig;

    fn registry<P>(providers: Vec<(&str, Arc<P>)>) -> ProviderRegistry<P> {
        ProviderRegistry::new(providers.into_iter().map(|(n, p)| (n.to_string(), p)).collect()).unwrap()
    }

    fn build_coordinator() -> (
        PipelineCoordinator<MockSttProvider, MockLlmProvider, MockModerationProvider, MockChatProvider>,
        Arc<MockChatProvider>,
    ) {
        let stt_provider = Arc::new(MockSttProvider::healthy("stt"));
        stt_provider.push(Transcript::new("what do you think about this stream?", 0.9, "stt"));
        let stt = SttPipeline::new(FailoverController::new(registry(vec![("stt", stt_provider)]), FailoverConfig::default()));

        let llm_provider = Arc::new(MockLlmProvider::new("llm", "great stream everyone, loving it!"));
        let opportunity = OpportunityDetector::new(Some(llm_provider.clone()), OpportunityDetectorConfig { llm_classification_enabled: false });
        let llm = FailoverController::new(registry(vec![("llm", llm_provider)]), FailoverConfig::default());

        let mod_primary = Arc::new(MockModerationProvider::approving("mod"));
        let mod_fallback = Arc::new(MockModerationProvider::approving("mod-fallback"));
        let moderation = ModerationManager::new(mod_primary, mod_fallback);

        let rate_limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default()));

        let chat_provider = Arc::new(MockChatProvider::new("chat"));
        let chat = FailoverController::new(registry(vec![("chat", chat_provider.clone())]), FailoverConfig::default());

        let coordinator = PipelineCoordinator::new(
            stt,
            ContextStore::new(ContextStoreConfig::default()),
            opportunity,
            llm,
            moderation,
            rate_limiter,
            chat,
            CommentPolicy::default(),
            SafetyPolicy::default(),
            Duration::from_secs(0),
            Duration::from_secs(60),
        );
        coordinator.start("broadcast-1");
        (coordinator, chat_provider)
    }

    fn frame() -> AudioFrame {
        AudioFrame::new(vec![0u8; 320], SampleRate::HZ_16K, Channels::Mono)
    }

    #[tokio::test]
    async fn necessary_opportunity_posts_and_updates_context() {
        let (coordinator, chat) = build_coordinator();
        let result = coordinator.process_audio(frame()).await;
        assert!(result.posted, "expected a post, got {result:?}");
        assert_eq!(chat.posts.lock().len(), 1);
        assert_eq!(coordinator.context.snapshot().recent_transcripts.len(), 1);
    }

    #[tokio::test]
    async fn blocked_moderation_prevents_posting() {
        let stt_provider = Arc::new(MockSttProvider::healthy("stt"));
        stt_provider.push(Transcript::new("what do you think?", 0.9, "stt"));
        let stt = SttPipeline::new(FailoverController::new(registry(vec![("stt", stt_provider)]), FailoverConfig::default()));

        let llm_provider = Arc::new(MockLlmProvider::new("llm", "bad content"));
        let opportunity = OpportunityDetector::new(Some(llm_provider.clone()), OpportunityDetectorConfig { llm_classification_enabled: false });
        let llm = FailoverController::new(registry(vec![("llm", llm_provider)]), FailoverConfig::default());

        let mod_primary = Arc::new(MockModerationProvider::approving("mod"));
        *mod_primary.verdict.lock() = Some(ModerationVerdict {
            flagged: false,
            scores: std::collections::HashMap::from([(castbot_core::Category::Hate, 0.95)]),
            flagged_categories: Default::default(),
            suggested_action: SuggestedAction::Approve,
            error_tag: None,
            provider: "mod".to_string(),
        });
        let mod_fallback = Arc::new(MockModerationProvider::approving("mod-fallback"));
        let moderation = ModerationManager::new(mod_primary, mod_fallback);

        let rate_limiter = Arc::new(RateLimiter::new(RateLimiterConfig::default()));
        let chat_provider = Arc::new(MockChatProvider::new("chat"));
        let chat = FailoverController::new(registry(vec![("chat", chat_provider.clone())]), FailoverConfig::default());

        let coordinator = PipelineCoordinator::new(
            stt,
            ContextStore::new(ContextStoreConfig::default()),
            opportunity,
            llm,
            moderation,
            rate_limiter,
            chat,
            CommentPolicy::default(),
            SafetyPolicy::default(),
            Duration::from_secs(0),
            Duration::from_secs(60),
        );
        coordinator.start("broadcast-1");

        let result = coordinator.process_audio(frame()).await;
        assert!(!result.posted);
        assert_eq!(result.error.as_deref(), Some("blocked"));
        assert_eq!(chat_provider.posts.lock().len(), 0);
    }

    #[tokio::test]
    async fn not_running_short_circuits() {
        let (coordinator, _chat) = build_coordinator();
        coordinator.stop();
        let result = coordinator.process_audio(frame()).await;
        assert!(!result.success);
    }
}
