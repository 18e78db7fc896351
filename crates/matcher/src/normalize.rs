//! Shared text normalisation
//!
//! Titles and file names from different indexers disagree on casing,
//! punctuation, diacritics and Unicode ligatures. Everything that
//! compares names goes through the folding here first.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Expand the ligatures and letters NFKD leaves intact
fn expand_ligature(c: char) -> Option<&'static str> {
    match c {
        'æ' => Some("ae"),
        'Æ' => Some("AE"),
        'œ' => Some("oe"),
        'Œ' => Some("OE"),
        'ß' => Some("ss"),
        'ø' => Some("o"),
        'Ø' => Some("O"),
        'đ' | 'ð' => Some("d"),
        'Đ' | 'Ð' => Some("D"),
        'ł' => Some("l"),
        'Ł' => Some("L"),
        'þ' => Some("th"),
        'Þ' => Some("Th"),
        _ => None,
    }
}

/// Fold a string to plain ASCII-ish text: NFKD decomposition, strip
/// combining marks, expand ligatures. Case is preserved.
pub fn fold_ascii(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        match expand_ligature(c) {
            Some(expansion) => out.push_str(expansion),
            None => out.push(c),
        }
    }
    out
}

/// Canonical form for title comparison: folded, lowercased, with
/// everything that is not a letter or digit removed.
pub fn normalize_title(input: &str) -> String {
    fold_ascii(input)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
