//! Core traits and data model for the broadcast chat copilot.
//!
//! This crate provides foundational types used across all other crates:
//! - Provider trait contracts (STT, LLM, Moderation, Chat, ConfigStore)
//! - Audio frame and transcript types
//! - Context snapshot, opportunity, policy, moderation, and scheduler types
//! - The crate-wide error type

pub mod audio;
pub mod context;
pub mod error;
pub mod moderation_types;
pub mod opportunity;
pub mod policy_types;
pub mod registry;
pub mod scheduler_types;
pub mod traits;
pub mod transcript;

#[cfg(feature = "mocks")]
pub mod mocks;

pub use audio::{AudioFrame, Channels, SampleRate, MAX_BATCH_AUDIO_BYTES};
pub use context::{ContextSnapshot, KeywordWeight, DEFAULT_CONTEXT_WINDOW};
pub use error::{Error, ProviderError, Result};
pub use moderation_types::{ModerationVerdict, RewriteContentResult, RewriteOutcome, SuggestedAction};
pub use opportunity::{Opportunity, OpportunityLabel};
pub use policy_types::{Category, CommentPolicy, EmojiPolicy, LengthRange, SafetyLevel, SafetyPolicy, ThresholdTable};
pub use registry::{ProviderEntry, ProviderRegistry};
pub use scheduler_types::{RateLimitDecision, RateLimitRejection, ScheduledComment, SchedulerState};
pub use traits::{
    ChatCompletion, ChatMessage, ChatProvider, ChatRateLimitInfo, ClassifiedOpportunity,
    ConfigStore, GeneratedComment, LlmProvider, ModerationProvider, PostResult, Probeable,
    ProviderResult, SttOptions, SttProvider, StreamingSink, TokenUsage, CHAT_TEXT_MAX_CHARS,
};
pub use transcript::{Segment, Transcript};
