//! Length adjustment (spec §4.6). Counting is by Unicode code point, not
//! byte or grapheme-cluster count, per the spec's explicit wording.

use castbot_core::LengthRange;

const SENTENCE_BOUNDARIES: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Persona-keyed filler phrases, appended to extend short comments.
/// Falls back to a generic filler for personas with no entry.
fn filler_for(persona: &str) -> &'static str {
    match persona {
        "cheerful" | "default" => "本当にそう思います！",
        "calm" => "なるほど、興味深いですね。",
        "hype" => "これはすごい展開だ！",
        _ => "そうですね。",
    }
}

/// Adjusts `text` so its code-point length falls within `range`.
///
/// Under min: appends persona-appropriate filler (separated by a space)
/// until the minimum is reached. Over max: truncates at the last
/// sentence boundary at or before `max`; if none exists, hard-truncates
/// and appends an ellipsis.
pub fn adjust(text: &str, range: LengthRange, persona: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();

    if chars.len() < range.min {
        let filler = filler_for(persona);
        while chars.len() < range.min {
            chars.push(' ');
            chars.extend(filler.chars());
        }
        // Filler is appended in whole-phrase increments and can overshoot
        // a narrow range; clamp back down so the result still respects
        // `max` (spec §4.6/§8: result length must land in [min, max]).
        chars.truncate(range.max);
        return chars.into_iter().collect();
    }

    if chars.len() > range.max {
        if let Some(cut) = last_sentence_boundary_at_or_before(&chars, range.max) {
            return chars[..=cut].iter().collect();
        }
        // No boundary within budget: hard-truncate, reserving one slot
        // for the ellipsis so the result still respects `max`.
        let keep = range.max.saturating_sub(1);
        let mut truncated: String = chars[..keep].iter().collect();
        truncated.push('…');
        return truncated;
    }

    text.to_string()
}

fn last_sentence_boundary_at_or_before(chars: &[char], max: usize) -> Option<usize> {
    let limit = max.min(chars.len());
    (0..limit).rev().find(|&i| SENTENCE_BOUNDARIES.contains(&chars[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_extended_to_minimum() {
        let range = LengthRange::new(20, 60).unwrap();
        let result = adjust("すごい！", range, "cheerful");
        assert!(result.chars().count() >= 20);
        assert!(result.starts_with("すごい！"));
    }

    #[test]
    fn long_text_truncates_at_sentence_boundary() {
        let range = LengthRange::new(1, 15).unwrap();
        let result = adjust("Great point. Really great point indeed.", range, "default");
        assert_eq!(result, "Great point.");
        assert!(result.chars().count() <= 15);
    }

    #[test]
    fn long_text_without_boundary_hard_truncates_with_ellipsis() {
        let range = LengthRange::new(1, 5).unwrap();
        let result = adjust("abcdefghij", range, "default");
        assert_eq!(result.chars().count(), 5);
        assert!(result.ends_with('…'));
    }

    #[test]
    fn short_text_extension_does_not_overshoot_a_narrow_range() {
        let range = LengthRange::new(20, 20).unwrap();
        let result = adjust("あ", range, "cheerful");
        assert_eq!(result.chars().count(), 20);
        assert!(result.starts_with('あ'));
    }

    #[test]
    fn text_within_range_is_unchanged() {
        let range = LengthRange::new(1, 100).unwrap();
        assert_eq!(adjust("hello", range, "default"), "hello");
    }
}
