//! PolicyEngine (C7): forbidden-term redaction, length adjustment, and
//! emoji normalization (spec §4.6).

pub mod emoji;
pub mod engine;
pub mod forbidden;
pub mod length;
pub mod normalize;

pub use emoji::{extract_emoji, sanitize as sanitize_emoji, validate as validate_emoji, EmojiViolation, RecentEmojiRecord};
pub use engine::PolicyEngine;
pub use forbidden::ForbiddenTermMatcher;
pub use normalize::{normalize, normalize_with_map, NormalizedText};
