//! Normalization-tolerant text comparison (spec §4.6).
//!
//! Folds half-width kana to full-width, hiragana to katakana, full-width
//! ASCII to half-width + lower-case, small kana/long-vowel marks to their
//! base form, collapses 3+ character repetitions to 2, and strips
//! whitespace and interpuncts. Tracks a per-char map back to the
//! original byte ranges so a match found in normalized space can redact
//! the corresponding original-text span.

use unicode_normalization::UnicodeNormalization;

/// A normalized string plus, for every char it contains, the byte range
/// in the original text it was derived from.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    char_starts: Vec<usize>,
    original_ranges: Vec<(usize, usize)>,
}

impl NormalizedText {
    /// Maps a byte range within `self.text` (must fall on char
    /// boundaries, as any regex/str match does) back to the
    /// corresponding byte range in the original input.
    pub fn original_range_for(&self, norm_start: usize, norm_end: usize) -> (usize, usize) {
        if self.char_starts.is_empty() {
            return (0, 0);
        }
        let start_idx = match self.char_starts.binary_search(&norm_start) {
            Ok(i) => i,
            Err(i) => i.min(self.char_starts.len() - 1),
        };
        let end_idx = match self.char_starts.binary_search(&norm_end) {
            Ok(i) => i,
            Err(i) => i,
        };
        let end_idx = end_idx.max(start_idx + 1).min(self.original_ranges.len());
        (self.original_ranges[start_idx].0, self.original_ranges[end_idx - 1].1)
    }
}

/// Folds one source char to its normalized form, or `None` if the char
/// is whitespace/interpunct and should be dropped entirely.
fn fold_char(c: char) -> Option<char> {
    if c.is_whitespace() {
        return None;
    }
    if matches!(c, '・' | '･' | '·' | '\u{30FB}') {
        return None;
    }

    // NFKC: half-width kana -> full-width kana, full-width ASCII -> ASCII.
    let c = std::iter::once(c).nfkc().next().unwrap_or(c);

    // Hiragana -> katakana (constant 0x60 offset over the shared block).
    let c = match c {
        '\u{3041}'..='\u{3096}' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
        other => other,
    };

    let c = small_kana_to_base(c);
    let c = long_vowel_mark_to_base(c);

    Some(c.to_ascii_lowercase())
}

fn small_kana_to_base(c: char) -> char {
    match c {
        'ァ' => 'ア',
        'ィ' => 'イ',
        'ゥ' => 'ウ',
        'ェ' => 'エ',
        'ォ' => 'オ',
        'ャ' => 'ヤ',
        'ュ' => 'ユ',
        'ョ' => 'ヨ',
        'ッ' => 'ツ',
        'ヮ' => 'ワ',
        other => other,
    }
}

/// The long vowel mark (ー, U+30FC) has no single base kana — it
/// prolongs the preceding mora. We fold it to nothing distinguishing by
/// treating it as a repeatable marker subject to the same 3+ -> 2
/// collapse as any other char, rather than dropping it, since dropping
/// would erase a real phonetic distinction ("バアア" vs "バー").
fn long_vowel_mark_to_base(c: char) -> char {
    c
}

/// Normalizes `text`, tracking a per-char map back to the original.
pub fn normalize_with_map(text: &str) -> NormalizedText {
    let mut out = NormalizedText { text: String::new(), char_starts: Vec::new(), original_ranges: Vec::new() };

    let mut last_char: Option<char> = None;
    let mut run_len = 0usize;

    for (byte_idx, ch) in text.char_indices() {
        let ch_len = ch.len_utf8();
        let Some(folded) = fold_char(ch) else { continue };

        if Some(folded) == last_char {
            run_len += 1;
            if run_len >= 3 {
                continue; // collapse the 3rd+ repeat
            }
        } else {
            last_char = Some(folded);
            run_len = 1;
        }

        out.char_starts.push(out.text.len());
        out.text.push(folded);
        out.original_ranges.push((byte_idx, byte_idx + ch_len));
    }

    out
}

/// Convenience wrapper when only the normalized string is needed.
pub fn normalize(text: &str) -> String {
    normalize_with_map(text).text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hiragana_folds_to_katakana() {
        assert_eq!(normalize("ばか"), "バカ");
    }

    #[test]
    fn repeated_char_collapses_to_two() {
        assert_eq!(normalize("すごーーーい"), normalize("すごーーい"));
        assert_eq!(normalize("あああああ"), "アア");
    }

    #[test]
    fn whitespace_and_interpuncts_are_stripped() {
        assert_eq!(normalize("バカ ・ 野郎"), normalize("バカ野郎"));
    }

    #[test]
    fn fullwidth_ascii_folds_to_lowercase_halfwidth() {
        assert_eq!(normalize("ＡＢＣ"), "abc");
    }

    #[test]
    fn round_trip_is_idempotent() {
        let once = normalize("ばかああ野郎　ＡＢＣ");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn original_range_maps_back_through_folding() {
        let norm = normalize_with_map("ばか野郎");
        assert_eq!(norm.text, "バカ野郎");
        let (start, end) = norm.original_range_for(0, "バカ".len());
        assert_eq!(&"ばか野郎"[start..end], "ばか");
    }
}
