//! Slug derivation for person ids.
//!
//! Slugs are lowercase ASCII with `_` as the only separator. Input is
//! transliterated to ASCII first (`Иван` becomes `ivan`); anything that is
//! still not alphanumeric afterwards becomes a separator.

use deunicode::deunicode;

const SEPARATOR: char = '_';

/// Returned for non-empty input that has nothing sluggable after
/// transliteration.
pub const UNKNOWN_SLUG: &str = "unknown";

/// Turn a display name into an id-safe slug.
///
/// ```
/// use personlink_core::slug::slugify;
/// assert_eq!(slugify("Mary-Jane O'Neil"), "mary_jane_oneil");
/// assert_eq!(slugify("Björn"), "bjorn");
/// assert_eq!(slugify("Иван"), "ivan");
/// ```
pub fn slugify(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let ascii = deunicode(text);
    let mut out = String::with_capacity(ascii.len());
    let mut pending_sep = false;

    for ch in ascii.chars() {
        if ch == '\'' {
            continue;
        }
        if !ch.is_ascii_alphanumeric() {
            pending_sep = true;
            continue;
        }

        if pending_sep && !out.is_empty() {
            out.push(SEPARATOR);
        }
        pending_sep = false;
        out.push(ch.to_ascii_lowercase());
    }

    if out.is_empty() {
        UNKNOWN_SLUG.to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_names() {
        assert_eq!(slugify("Alice"), "alice");
        assert_eq!(slugify("Bob Builder"), "bob_builder");
        assert_eq!(slugify("  padded  "), "padded");
    }

    #[test]
    fn test_separators_collapse() {
        assert_eq!(slugify("a -- b__c"), "a_b_c");
        assert_eq!(slugify("john.doe@example.com"), "john_doe_example_com");
    }

    #[test]
    fn test_apostrophes_are_dropped() {
        assert_eq!(slugify("Bob's phone"), "bobs_phone");
        assert_eq!(slugify("Bob\u{2019}s phone"), "bobs_phone");
    }

    #[test]
    fn test_latin_diacritics_fold() {
        assert_eq!(slugify("Zoë Łukasz"), "zoe_lukasz");
        assert_eq!(slugify("Straße"), "strasse");
        assert_eq!(slugify("Ștefan Țurcanu"), "stefan_turcanu");
    }

    #[test]
    fn test_non_latin_scripts_transliterate() {
        assert_eq!(slugify("Иван"), "ivan");
        assert_eq!(slugify("日本"), "ri_ben");

        let petr = slugify("Пётр");
        assert!(petr.starts_with('p') && petr.ends_with("tr"), "got {petr}");
        assert_ne!(slugify("Иван"), slugify("Мария"));
    }

    #[test]
    fn test_empty_and_unsluggable() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), UNKNOWN_SLUG);
        assert_eq!(slugify(" - "), UNKNOWN_SLUG);
    }
}
