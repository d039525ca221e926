//! The typed configuration tree (spec §4.11). Validated on every write;
//! mirrors the teacher's `Settings` (`config/src/settings.rs`) — a single
//! `#[derive(Deserialize)]` struct tree loaded via the `config` crate and
//! checked by a `validate()` pass before being handed to consumers.

use std::collections::HashMap;

use castbot_core::{CommentPolicy, SafetyPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Ordered provider-name lists, one per provider kind; order is the
/// failover priority `ProviderRegistry` is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderNames {
    #[serde(default)]
    pub stt: Vec<String>,
    #[serde(default)]
    pub llm: Vec<String>,
    #[serde(default)]
    pub moderation: Vec<String>,
    #[serde(default)]
    pub chat: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitSettings {
    pub min_interval_secs: u64,
    pub window_secs: u64,
    pub window_max: u32,
    pub cooldown_secs: u64,
    pub dedupe_window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self { min_interval_secs: 15, window_secs: 600, window_max: 20, cooldown_secs: 120, dedupe_window_secs: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncSettings {
    pub enabled: bool,
    pub sync_interval_secs: u64,
    pub remote_document: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { enabled: false, sync_interval_secs: 60, remote_document: "castbot-config".to_string() }
    }
}

/// Immutable config snapshot. Mutation (via `ConfigDocument::merged_with`
/// or a fresh `load`) produces a new snapshot; nothing in this type is
/// mutated in place (spec §4 data model note: "ConfigDocument is shared
/// by value, copy-on-write").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigDocument {
    #[serde(default)]
    pub providers: ProviderNames,
    #[serde(default)]
    pub comment_policy: CommentPolicy,
    #[serde(default)]
    pub safety_policy: SafetyPolicy,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    /// Per-field last-modified timestamps, keyed by JSON-pointer path.
    /// Consulted only by the `timestamp` merge strategy.
    #[serde(default)]
    pub last_modified: HashMap<String, chrono::DateTime<chrono::Utc>>,
}

impl ConfigDocument {
    /// Enumerated tone, persona, provider names, numeric bounds per
    /// spec §4.11: emoji max 0..5; retention windows 1..300 s; length
    /// min 1..100, max 20..200, min ≤ max; thresholds ∈ [0,1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let emoji = &self.comment_policy.emoji_policy;
        if emoji.max_count > 5 {
            return Err(ConfigError::InvalidValue {
                field: "comment_policy.emoji_policy.max_count".into(),
                message: format!("must be 0..=5, got {}", emoji.max_count),
            });
        }

        let len = &self.comment_policy.target_length;
        if !(1..=100).contains(&len.min) {
            return Err(ConfigError::InvalidValue {
                field: "comment_policy.target_length.min".into(),
                message: format!("must be 1..=100, got {}", len.min),
            });
        }
        if !(20..=200).contains(&len.max) {
            return Err(ConfigError::InvalidValue {
                field: "comment_policy.target_length.max".into(),
                message: format!("must be 20..=200, got {}", len.max),
            });
        }
        if len.min > len.max {
            return Err(ConfigError::InvalidValue {
                field: "comment_policy.target_length".into(),
                message: format!("min ({}) must be <= max ({})", len.min, len.max),
            });
        }

        for (category, threshold) in &self.safety_policy.thresholds {
            if !(0.0..=1.0).contains(threshold) {
                return Err(ConfigError::InvalidValue {
                    field: format!("safety_policy.thresholds.{category:?}"),
                    message: format!("must be in [0,1], got {threshold}"),
                });
            }
        }

        if !(1..=300).contains(&self.rate_limit.cooldown_secs) {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.cooldown_secs".into(),
                message: format!("must be 1..=300, got {}", self.rate_limit.cooldown_secs),
            });
        }
        if !(1..=300).contains(&self.rate_limit.dedupe_window_secs) {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.dedupe_window_secs".into(),
                message: format!("must be 1..=300, got {}", self.rate_limit.dedupe_window_secs),
            });
        }

        if self.providers.stt.is_empty() {
            return Err(ConfigError::MissingField("providers.stt".into()));
        }
        if self.providers.llm.is_empty() {
            return Err(ConfigError::MissingField("providers.llm".into()));
        }
        if self.providers.moderation.is_empty() {
            return Err(ConfigError::MissingField("providers.moderation".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::LengthRange;

    fn valid_doc() -> ConfigDocument {
        let mut doc = ConfigDocument::default();
        doc.providers.stt = vec!["primary".into()];
        doc.providers.llm = vec!["primary".into()];
        doc.providers.moderation = vec!["primary".into()];
        doc
    }

    #[test]
    fn default_document_with_providers_validates() {
        assert!(valid_doc().validate().is_ok());
    }

    #[test]
    fn emoji_max_above_five_is_rejected() {
        let mut doc = valid_doc();
        doc.comment_policy.emoji_policy.max_count = 6;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn length_min_greater_than_max_is_rejected() {
        let mut doc = valid_doc();
        doc.comment_policy.target_length = LengthRange::new(50, 30).unwrap_or(LengthRange { min: 50, max: 30 });
        assert!(doc.validate().is_err());
    }

    #[test]
    fn missing_providers_is_rejected() {
        let doc = ConfigDocument::default();
        assert!(doc.validate().is_err());
    }
}
