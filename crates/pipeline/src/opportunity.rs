//! OpportunityDetector (C6): rule layer, optional LLM classification,
//! and engagement lean, tie-broken toward `hold` (spec §4.5).

use castbot_core::{ContextSnapshot, LlmProvider, Opportunity, OpportunityLabel};

/// Question/invitation markers that force `necessary` at confidence 0.9.
const NECESSARY_MARKERS: &[&str] = &["what do you think", "anyone else", "let me know", "comment below", "どう思う", "教えて"];

/// Transition markers that force `unnecessary` at confidence 0.8.
const UNNECESSARY_MARKERS: &[&str] = &["next slide", "let me switch", "moving on", "次のスライド"];

#[derive(Debug, Clone, Copy)]
pub struct OpportunityDetectorConfig {
    pub llm_classification_enabled: bool,
}

impl Default for OpportunityDetectorConfig {
    fn default() -> Self {
        Self { llm_classification_enabled: true }
    }
}

pub struct OpportunityDetector<L: LlmProvider> {
    llm: Option<std::sync::Arc<L>>,
    config: OpportunityDetectorConfig,
}

impl<L: LlmProvider> OpportunityDetector<L> {
    pub fn new(llm: Option<std::sync::Arc<L>>, config: OpportunityDetectorConfig) -> Self {
        Self { llm, config }
    }

    /// Spec §4.5 decision procedure, steps 1-3 in order, rule layer wins
    /// ties over LLM per the spec's tie-break rule.
    pub async fn classify(&self, text: &str, ctx: &ContextSnapshot) -> Opportunity {
        let lower = text.to_lowercase();

        if NECESSARY_MARKERS.iter().any(|m| lower.contains(m)) {
            return Opportunity::new(OpportunityLabel::Necessary, 0.9, "question/invitation marker matched");
        }
        if UNNECESSARY_MARKERS.iter().any(|m| lower.contains(m)) {
            return Opportunity::new(OpportunityLabel::Unnecessary, 0.8, "transition marker matched");
        }

        if self.config.llm_classification_enabled {
            if let Some(llm) = &self.llm {
                if let Ok(classified) = llm.classify_opportunity(text, ctx).await {
                    // Rule layer already exhausted; accept the LLM's verdict
                    // outright, tie-broken toward hold when it is itself
                    // ambiguous (confidence exactly 0.5 is treated as a tie).
                    let label = if (classified.confidence - 0.5).abs() < f32::EPSILON {
                        OpportunityLabel::Hold
                    } else {
                        classified.label
                    };
                    return Opportunity::new(label, classified.confidence, classified.reason.unwrap_or_default());
                }
            }
        }

        if ctx.engagement > 0.7 {
            Opportunity::new(OpportunityLabel::Necessary, ctx.engagement, "engagement above 0.7")
        } else if ctx.engagement < 0.3 {
            Opportunity::new(OpportunityLabel::Unnecessary, 1.0 - ctx.engagement, "engagement below 0.3")
        } else {
            Opportunity::hold("engagement inconclusive")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::mocks::MockLlmProvider;

    #[tokio::test]
    async fn question_marker_forces_necessary() {
        let detector: OpportunityDetector<MockLlmProvider> = OpportunityDetector::new(None, OpportunityDetectorConfig::default());
        let opportunity = detector.classify("what do you think about this?", &ContextSnapshot::empty()).await;
        assert_eq!(opportunity.label, OpportunityLabel::Necessary);
        assert!((opportunity.confidence - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn transition_marker_forces_unnecessary() {
        let detector: OpportunityDetector<MockLlmProvider> = OpportunityDetector::new(None, OpportunityDetectorConfig::default());
        let opportunity = detector.classify("ok, next slide please", &ContextSnapshot::empty()).await;
        assert_eq!(opportunity.label, OpportunityLabel::Unnecessary);
    }

    #[tokio::test]
    async fn high_engagement_leans_necessary_without_markers() {
        let detector: OpportunityDetector<MockLlmProvider> = OpportunityDetector::new(None, OpportunityDetectorConfig { llm_classification_enabled: false });
        let mut ctx = ContextSnapshot::empty();
        ctx.engagement = 0.9;
        let opportunity = detector.classify("just chatting along", &ctx).await;
        assert_eq!(opportunity.label, OpportunityLabel::Necessary);
    }

    #[tokio::test]
    async fn mid_engagement_holds() {
        let detector: OpportunityDetector<MockLlmProvider> = OpportunityDetector::new(None, OpportunityDetectorConfig { llm_classification_enabled: false });
        let mut ctx = ContextSnapshot::empty();
        ctx.engagement = 0.5;
        let opportunity = detector.classify("just chatting along", &ctx).await;
        assert_eq!(opportunity.label, OpportunityLabel::Hold);
    }
}
