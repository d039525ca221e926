//! ModerationVerdict / RewriteOutcome data model (C8).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::policy_types::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedAction {
    Approve,
    Review,
    Block,
    Rewrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    pub scores: HashMap<Category, f32>,
    pub flagged_categories: HashSet<Category>,
    pub suggested_action: SuggestedAction,
    pub error_tag: Option<String>,
    pub provider: String,
}

impl ModerationVerdict {
    pub fn approve(provider: impl Into<String>) -> Self {
        Self {
            flagged: false,
            scores: HashMap::new(),
            flagged_categories: HashSet::new(),
            suggested_action: SuggestedAction::Approve,
            error_tag: None,
            provider: provider.into(),
        }
    }

    /// Suggested action derived from the maximum category score, per
    /// spec §4.7 step 4: >=0.8 block, >=0.6 rewrite, >=threshold review,
    /// else approve. `max_threshold` is the lowest per-category threshold
    /// that was actually crossed (used for the "review" tier).
    pub fn action_from_max_score(max_score: f32, crossed_any_threshold: bool) -> SuggestedAction {
        if max_score >= 0.8 {
            SuggestedAction::Block
        } else if max_score >= 0.6 {
            SuggestedAction::Rewrite
        } else if crossed_any_threshold {
            SuggestedAction::Review
        } else {
            SuggestedAction::Approve
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteOutcome {
    pub original: String,
    pub rewritten: String,
    pub was_rewritten: bool,
    pub original_verdict: ModerationVerdict,
    pub final_verdict: ModerationVerdict,
}

/// The external `ModerationProvider::rewriteContent` contract (spec §6):
/// `{original, rewritten, was-rewritten}`, carrying no verdict. Whether
/// the rewrite actually cleared moderation is re-checked independently
/// by `ModerationManager` via its own `moderate` call (spec §4.7 step 2),
/// never trusted from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteContentResult {
    pub original: String,
    pub rewritten: String,
    pub was_rewritten: bool,
}
