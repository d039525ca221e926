//! CommentPolicy / SafetyPolicy data model (C7, C8 inputs).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: usize,
    pub max: usize,
}

impl LengthRange {
    pub fn new(min: usize, max: usize) -> Result<Self, String> {
        if min < 1 {
            return Err("min must be >= 1".into());
        }
        if min > max {
            return Err("min must be <= max".into());
        }
        Ok(Self { min, max })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmojiPolicy {
    pub enabled: bool,
    pub max_count: usize,
    pub allowed: HashSet<String>,
}

impl EmojiPolicy {
    pub fn disabled() -> Self {
        Self { enabled: false, max_count: 0, allowed: HashSet::new() }
    }
}

impl Default for EmojiPolicy {
    fn default() -> Self {
        Self { enabled: true, max_count: 2, allowed: HashSet::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPolicy {
    pub tone: String,
    pub persona: String,
    pub encouraged_expressions: Vec<String>,
    pub forbidden_terms: HashSet<String>,
    pub emoji_policy: EmojiPolicy,
    pub target_length: LengthRange,
}

impl Default for CommentPolicy {
    fn default() -> Self {
        Self {
            tone: "cheerful".to_string(),
            persona: "default".to_string(),
            encouraged_expressions: Vec::new(),
            forbidden_terms: HashSet::new(),
            emoji_policy: EmojiPolicy::default(),
            target_length: LengthRange::new(1, 100).expect("valid default range"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Hate,
    Harassment,
    SelfHarm,
    Sexual,
    Violence,
    Illegal,
    Graphic,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Hate,
        Category::Harassment,
        Category::SelfHarm,
        Category::Sexual,
        Category::Violence,
        Category::Illegal,
        Category::Graphic,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SafetyLevel {
    Relaxed,
    Standard,
    Strict,
}

impl SafetyLevel {
    /// Higher enum rank: `strict > standard > relaxed`.
    pub fn rank(&self) -> u8 {
        match self {
            SafetyLevel::Relaxed => 0,
            SafetyLevel::Standard => 1,
            SafetyLevel::Strict => 2,
        }
    }
}

pub type ThresholdTable = HashMap<Category, f32>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyPolicy {
    pub enabled: bool,
    pub level: SafetyLevel,
    pub block_on_uncertainty: bool,
    pub thresholds: ThresholdTable,
}

impl SafetyPolicy {
    /// The standard threshold table from spec §4.7.
    pub fn standard_thresholds() -> ThresholdTable {
        HashMap::from([
            (Category::Hate, 0.7),
            (Category::Harassment, 0.7),
            (Category::SelfHarm, 0.8),
            (Category::Sexual, 0.7),
            (Category::Violence, 0.7),
            (Category::Illegal, 0.8),
            (Category::Graphic, 0.8),
        ])
    }

    /// Derives a level's table from the standard table: `strict` subtracts
    /// 0.2 per category, `relaxed` adds 0.2 capped at 0.9, `standard` is
    /// unchanged.
    pub fn thresholds_for_level(level: SafetyLevel) -> ThresholdTable {
        Self::standard_thresholds()
            .into_iter()
            .map(|(cat, v)| {
                let adjusted = match level {
                    SafetyLevel::Strict => (v - 0.2).max(0.0),
                    SafetyLevel::Relaxed => (v + 0.2).min(0.9),
                    SafetyLevel::Standard => v,
                };
                (cat, adjusted)
            })
            .collect()
    }

    pub fn new(level: SafetyLevel, block_on_uncertainty: bool) -> Self {
        Self { enabled: true, level, block_on_uncertainty, thresholds: Self::thresholds_for_level(level) }
    }

    /// Merges custom overrides on top of the level-derived table.
    pub fn with_overrides(mut self, overrides: ThresholdTable) -> Self {
        self.thresholds.extend(overrides);
        self
    }

    pub fn threshold_for(&self, category: Category) -> f32 {
        *self.thresholds.get(&category).unwrap_or(&1.0)
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::new(SafetyLevel::Standard, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_thresholds_are_lower_than_standard() {
        let standard = SafetyPolicy::thresholds_for_level(SafetyLevel::Standard);
        let strict = SafetyPolicy::thresholds_for_level(SafetyLevel::Strict);
        for cat in Category::ALL {
            assert!(strict[&cat] <= standard[&cat]);
        }
    }

    #[test]
    fn relaxed_thresholds_cap_at_point_nine() {
        let relaxed = SafetyPolicy::thresholds_for_level(SafetyLevel::Relaxed);
        for cat in Category::ALL {
            assert!(relaxed[&cat] <= 0.9);
        }
    }

    #[test]
    fn length_range_rejects_min_greater_than_max() {
        assert!(LengthRange::new(50, 10).is_err());
        assert!(LengthRange::new(0, 10).is_err());
        assert!(LengthRange::new(1, 10).is_ok());
    }
}
