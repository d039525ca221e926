//! In-memory mock providers for exercising the pipeline/coordinator in
//! tests without real network calls (SPEC_FULL §5 supplemented feature).
//!
//! Grounded on the teacher's pattern of trait objects behind `Arc<dyn
//! Trait>` with swappable backends (`llm/factory.rs`).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::audio::AudioFrame;
use crate::context::ContextSnapshot;
use crate::error::ProviderError;
use crate::moderation_types::{ModerationVerdict, RewriteContentResult};
use crate::opportunity::OpportunityLabel;
use crate::policy_types::CommentPolicy;
use crate::traits::{
    ChatCompletion, ChatMessage, ChatProvider, ChatRateLimitInfo, ClassifiedOpportunity,
    ConfigStore, GeneratedComment, LlmProvider, ModerationProvider, PostResult, Probeable,
    ProviderResult, SttOptions, SttProvider, StreamingSink, TokenUsage,
};
use crate::transcript::Transcript;

/// STT mock that either always succeeds with a canned transcript, or
/// always fails — used to exercise FailoverController scenarios.
pub struct MockSttProvider {
    name: String,
    pub fail_retryable: Mutex<Option<String>>,
    pub canned: Mutex<VecDeque<Transcript>>,
    healthy: Mutex<bool>,
}

impl MockSttProvider {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), fail_retryable: Mutex::new(None), canned: Mutex::new(VecDeque::new()), healthy: Mutex::new(true) }
    }

    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), fail_retryable: Mutex::new(Some(message.into())), canned: Mutex::new(VecDeque::new()), healthy: Mutex::new(true) }
    }

    pub fn push(&self, t: Transcript) {
        self.canned.lock().push_back(t);
    }

    pub fn set_unhealthy(&self) {
        *self.healthy.lock() = false;
    }
}

#[async_trait]
impl SttProvider for MockSttProvider {
    async fn transcribe(&self, _audio: &AudioFrame, _options: &SttOptions) -> ProviderResult<Transcript> {
        if let Some(msg) = self.fail_retryable.lock().clone() {
            return Err(ProviderError::retryable(self.name.clone(), msg));
        }
        self.canned
            .lock()
            .pop_front()
            .ok_or_else(|| ProviderError::fatal(self.name.clone(), "no canned transcript"))
    }

    async fn stream(&self) -> ProviderResult<Box<dyn StreamingSink>> {
        Err(ProviderError::fatal(self.name.clone(), "streaming not supported by mock"))
    }
}

#[async_trait]
impl Probeable for MockSttProvider {
    async fn healthy(&self) -> bool {
        *self.healthy.lock()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// LLM mock: returns a fixed comment/opportunity, or fails.
pub struct MockLlmProvider {
    name: String,
    pub comment: Mutex<String>,
    pub opportunity: Mutex<OpportunityLabel>,
    pub fail: Mutex<Option<String>>,
}

impl MockLlmProvider {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: Mutex::new(comment.into()),
            opportunity: Mutex::new(OpportunityLabel::Hold),
            fail: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn generate_comment(&self, _ctx: &ContextSnapshot, _policy: &CommentPolicy) -> ProviderResult<GeneratedComment> {
        if let Some(msg) = self.fail.lock().clone() {
            return Err(ProviderError::retryable(self.name.clone(), msg));
        }
        Ok(GeneratedComment { comment: self.comment.lock().clone(), confidence: 0.9 })
    }

    async fn classify_opportunity(&self, _text: &str, _ctx: &ContextSnapshot) -> ProviderResult<ClassifiedOpportunity> {
        Ok(ClassifiedOpportunity { label: *self.opportunity.lock(), confidence: 0.8, reason: None })
    }

    async fn chat(&self, messages: &[ChatMessage]) -> ProviderResult<ChatCompletion> {
        let total_chars: u32 = messages.iter().map(|m| m.content.len() as u32).sum();
        Ok(ChatCompletion {
            message: self.comment.lock().clone(),
            usage: TokenUsage { prompt: total_chars / 4, completion: 10, total: total_chars / 4 + 10 },
        })
    }
}

#[async_trait]
impl Probeable for MockLlmProvider {
    async fn healthy(&self) -> bool {
        self.fail.lock().is_none()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Moderation mock: returns an approve verdict unless configured to flag.
pub struct MockModerationProvider {
    name: String,
    pub verdict: Mutex<Option<ModerationVerdict>>,
    /// Per-text verdict overrides, checked before `verdict`. Lets tests
    /// exercise the re-moderation-of-the-rewritten-text path (the
    /// rewritten text should moderate differently than the original).
    pub verdict_for_text: Mutex<HashMap<String, ModerationVerdict>>,
    pub fail: Mutex<Option<String>>,
    pub rewritten_text: Mutex<Option<String>>,
}

impl MockModerationProvider {
    pub fn approving(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict: Mutex::new(None),
            verdict_for_text: Mutex::new(HashMap::new()),
            fail: Mutex::new(None),
            rewritten_text: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ModerationProvider for MockModerationProvider {
    async fn moderate(&self, text: &str, _ctx: Option<&ContextSnapshot>) -> ProviderResult<ModerationVerdict> {
        if let Some(msg) = self.fail.lock().clone() {
            return Err(ProviderError::retryable(self.name.clone(), msg));
        }
        if let Some(verdict) = self.verdict_for_text.lock().get(text).cloned() {
            return Ok(verdict);
        }
        Ok(self.verdict.lock().clone().unwrap_or_else(|| ModerationVerdict::approve(self.name.clone())))
    }

    async fn moderate_batch(&self, texts: &[String]) -> ProviderResult<Vec<ModerationVerdict>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.moderate(t, None).await?);
        }
        Ok(out)
    }

    async fn rewrite_content(&self, text: &str, _guidelines: &str, _ctx: Option<&ContextSnapshot>) -> ProviderResult<RewriteContentResult> {
        let rewritten = self.rewritten_text.lock().clone().unwrap_or_else(|| text.to_string());
        Ok(RewriteContentResult { original: text.to_string(), rewritten, was_rewritten: true })
    }
}

#[async_trait]
impl Probeable for MockModerationProvider {
    async fn healthy(&self) -> bool {
        self.fail.lock().is_none()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Chat mock: records posts in order, optionally reports quota exhaustion.
pub struct MockChatProvider {
    name: String,
    pub posts: Mutex<Vec<(String, String)>>,
    pub remaining: Mutex<u32>,
}

impl MockChatProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), posts: Mutex::new(Vec::new()), remaining: Mutex::new(1000) }
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn post(&self, chat_id: &str, text: &str) -> ProviderResult<PostResult> {
        self.posts.lock().push((chat_id.to_string(), text.to_string()));
        Ok(PostResult { id: uuid::Uuid::new_v4().to_string(), timestamp: chrono::Utc::now() })
    }

    async fn get_live_chat_id(&self, broadcast_id: &str) -> ProviderResult<String> {
        Ok(format!("chat-{broadcast_id}"))
    }

    async fn get_rate_limit_info(&self) -> ProviderResult<ChatRateLimitInfo> {
        Ok(ChatRateLimitInfo {
            limit: 1000,
            remaining: *self.remaining.lock(),
            reset_at: chrono::Utc::now() + chrono::Duration::hours(1),
            retry_after: None,
        })
    }
}

#[async_trait]
impl Probeable for MockChatProvider {
    async fn healthy(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct MockConfigStore {
    pub values: Mutex<HashMap<String, String>>,
}

impl MockConfigStore {
    pub fn new() -> Self {
        Self { values: Mutex::new(HashMap::new()) }
    }
}

impl Default for MockConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MockConfigStore {
    async fn get(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn get_all(&self) -> ProviderResult<HashMap<String, String>> {
        Ok(self.values.lock().clone())
    }

    async fn has(&self, key: &str) -> ProviderResult<bool> {
        Ok(self.values.lock().contains_key(key))
    }
}
