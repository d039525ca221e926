//! Forbidden-term redaction (spec §4.6).
//!
//! Terms are matched against normalized text; matching also tolerates a
//! single inserted vowel/long-vowel-mark mora between any two
//! characters of the term, so a stretched-out pronunciation ("ばかあ")
//! still matches a short canonical term ("ばか").

use regex::Regex;
use std::collections::HashSet;

use crate::normalize::normalize_with_map;

const INSERTABLE_VOWELS: &str = "ーアイウエオ";

pub struct ForbiddenTermMatcher {
    terms: Vec<CompiledTerm>,
}

struct CompiledTerm {
    pattern: Regex,
}

impl ForbiddenTermMatcher {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut compiled = Vec::new();
        for term in terms {
            let normalized = crate::normalize::normalize(term.as_ref());
            if normalized.is_empty() || !seen.insert(normalized.clone()) {
                continue;
            }
            compiled.push(CompiledTerm { pattern: build_term_pattern(&normalized) });
        }
        Self { terms: compiled }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns true if any forbidden term matches `text` under
    /// normalization (spec §8: "detection is closed under the
    /// normalization map").
    pub fn matches(&self, text: &str) -> bool {
        let normalized = normalize_with_map(text);
        self.terms.iter().any(|t| t.pattern.is_match(&normalized.text))
    }

    /// Redacts every matched span in `text` with `***`, operating on the
    /// original text via the normalized-to-original byte-range map.
    pub fn redact(&self, text: &str) -> String {
        if self.terms.is_empty() {
            return text.to_string();
        }
        let normalized = normalize_with_map(text);

        let mut original_spans: Vec<(usize, usize)> = Vec::new();
        for term in &self.terms {
            for m in term.pattern.find_iter(&normalized.text) {
                original_spans.push(normalized.original_range_for(m.start(), m.end()));
            }
        }
        if original_spans.is_empty() {
            return text.to_string();
        }

        original_spans.sort_unstable();
        merge_overlapping(&mut original_spans);

        let mut redacted = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end) in original_spans {
            if start < cursor {
                continue;
            }
            redacted.push_str(&text[cursor..start]);
            redacted.push_str("***");
            cursor = end;
        }
        redacted.push_str(&text[cursor..]);
        redacted
    }
}

fn merge_overlapping(spans: &mut Vec<(usize, usize)>) {
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for &(start, end) in spans.iter() {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    *spans = merged;
}

/// Builds a regex matching `normalized_term` with an optional single
/// inserted vowel mora (spec: "ka -> ka[a]?") tolerated between any two
/// characters of the term.
fn build_term_pattern(normalized_term: &str) -> Regex {
    let chars: Vec<char> = normalized_term.chars().collect();
    let mut pattern = String::from("(?:");
    for (i, ch) in chars.iter().enumerate() {
        pattern.push_str(&regex::escape(&ch.to_string()));
        if i + 1 < chars.len() {
            pattern.push_str(&format!("(?:[{}])?", regex::escape(INSERTABLE_VOWELS)));
        }
    }
    pattern.push(')');
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new(&regex::escape(normalized_term)).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_under_hiragana_katakana_fold() {
        let matcher = ForbiddenTermMatcher::new(["バカ"]);
        assert!(matcher.matches("ばか野郎"));
    }

    #[test]
    fn stretched_pronunciation_still_matches_via_inserted_vowel() {
        let matcher = ForbiddenTermMatcher::new(["バカ"]);
        assert!(matcher.matches("ばあか"));
    }

    #[test]
    fn redact_replaces_matched_span_with_asterisks() {
        let matcher = ForbiddenTermMatcher::new(["バカ"]);
        let redacted = matcher.redact("ばかああ野郎");
        assert!(redacted.contains("***"));
        assert!(!ForbiddenTermMatcher::new(["バカ"]).matches(&redacted));
    }

    #[test]
    fn unrelated_text_is_untouched() {
        let matcher = ForbiddenTermMatcher::new(["バカ"]);
        assert_eq!(matcher.redact("ありがとう"), "ありがとう");
    }
}
