//! Text normalization used as the equality basis for all name matching.
//!
//! Protocol pages spell team and player names inconsistently (diacritics
//! present or absent, stray whitespace, mixed case), so no component
//! compares raw strings directly; everything goes through [`normalize`].

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics, collapse whitespace, trim, and lowercase.
///
/// Diacritic removal is NFD decomposition followed by dropping combining
/// marks, so `Bērziņš` and `Berzins` normalize identically. Total function:
/// empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_latvian_diacritics() {
        assert_eq!(normalize("Jānis Bērziņš"), "janis berzins");
        assert_eq!(normalize("Jānis Bērziņš"), normalize("janis berzins"));
    }

    #[test]
    fn collapses_whitespace_and_case() {
        assert_eq!(normalize("  Team\t A  "), "team a");
        assert_eq!(normalize("TEAM A"), "team a");
    }

    #[test]
    fn empty_input_yields_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn preserves_punctuation() {
        assert_eq!(normalize("J. Bērziņš"), "j. berzins");
    }
}
