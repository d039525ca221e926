//! Opportunity classification (C6 OpportunityDetector data model).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityLabel {
    Necessary,
    Unnecessary,
    /// Defer the decision — not yet observable to the coordinator as "go".
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub label: OpportunityLabel,
    pub confidence: f32,
    pub reason: String,
}

impl Opportunity {
    pub fn new(label: OpportunityLabel, confidence: f32, reason: impl Into<String>) -> Self {
        Self { label, confidence: confidence.clamp(0.0, 1.0), reason: reason.into() }
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(OpportunityLabel::Hold, 0.0, reason)
    }

    pub fn is_necessary(&self) -> bool {
        self.label == OpportunityLabel::Necessary
    }
}
