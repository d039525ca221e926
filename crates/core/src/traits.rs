//! Provider contracts (C1).
//!
//! The core depends only on these shapes; concrete third-party protocol
//! clients (STT/LLM/moderation/chat APIs) are external collaborators and
//! out of scope for this crate (spec §1, §6).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::ContextSnapshot;
use crate::error::ProviderError;
use crate::moderation_types::{ModerationVerdict, RewriteContentResult};
use crate::policy_types::CommentPolicy;
use crate::transcript::Transcript;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Common capability shared by every provider kind: a health flag the
/// FailoverController can reprobe, and a name for logging/metrics tags.
/// Declared once so `castbot-failover` can be generic over it instead of
/// duplicating bounds per provider kind.
#[async_trait]
pub trait Probeable: Send + Sync {
    async fn healthy(&self) -> bool;
    fn name(&self) -> &str;
}

/// Options accepted by batch transcription.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SttOptions {
    pub language_hint: Option<String>,
}

/// A streaming sink: accepts AudioFrames, emits Transcripts.
///
/// Modeled as a trait rather than a channel pair so providers can own
/// their own backpressure and reconnection state; `StreamingSttPipeline`
/// (in `castbot-pipeline`) drives this from a bounded channel.
#[async_trait]
pub trait StreamingSink: Send + Sync {
    async fn push_frame(&mut self, frame: crate::audio::AudioFrame) -> ProviderResult<()>;
    async fn next_transcript(&mut self) -> Option<ProviderResult<Transcript>>;
    async fn close(&mut self) -> ProviderResult<()>;
}

#[async_trait]
pub trait SttProvider: Probeable {
    async fn transcribe(&self, audio: &crate::audio::AudioFrame, options: &SttOptions) -> ProviderResult<Transcript>;
    async fn stream(&self) -> ProviderResult<Box<dyn StreamingSink>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedComment {
    pub comment: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedOpportunity {
    pub label: crate::opportunity::OpportunityLabel,
    pub confidence: f32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub message: String,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait LlmProvider: Probeable {
    async fn generate_comment(&self, ctx: &ContextSnapshot, policy: &CommentPolicy) -> ProviderResult<GeneratedComment>;
    async fn classify_opportunity(&self, text: &str, ctx: &ContextSnapshot) -> ProviderResult<ClassifiedOpportunity>;
    async fn chat(&self, messages: &[ChatMessage]) -> ProviderResult<ChatCompletion>;
}

#[async_trait]
pub trait ModerationProvider: Probeable {
    async fn moderate(&self, text: &str, ctx: Option<&ContextSnapshot>) -> ProviderResult<ModerationVerdict>;
    async fn moderate_batch(&self, texts: &[String]) -> ProviderResult<Vec<ModerationVerdict>>;
    async fn rewrite_content(&self, text: &str, guidelines: &str, ctx: Option<&ContextSnapshot>) -> ProviderResult<RewriteContentResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResult {
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: chrono::DateTime<chrono::Utc>,
    pub retry_after: Option<std::time::Duration>,
}

#[async_trait]
pub trait ChatProvider: Probeable {
    async fn post(&self, chat_id: &str, text: &str) -> ProviderResult<PostResult>;
    async fn get_live_chat_id(&self, broadcast_id: &str) -> ProviderResult<String>;
    async fn get_rate_limit_info(&self) -> ProviderResult<ChatRateLimitInfo>;
}

/// Chat post text hard limit (spec §6).
pub const CHAT_TEXT_MAX_CHARS: usize = 200;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> ProviderResult<Option<String>>;
    async fn get_all(&self) -> ProviderResult<std::collections::HashMap<String, String>>;
    async fn has(&self, key: &str) -> ProviderResult<bool>;
}
