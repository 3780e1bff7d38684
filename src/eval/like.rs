//! `LIKE` pattern matching: `%` matches any run (including empty), `_`
//! matches exactly one character, matching is case-insensitive.
//! Backslash-escaping is not supported — the minimal wildcard-only form
//! is sufficient per this engine's scope.

use regex::RegexBuilder;

use crate::error::{FedSqlError, Result};

/// Returns whether `value` matches the SQL `LIKE` pattern `pattern`.
pub fn like_match(value: &str, pattern: &str) -> Result<bool> {
    let regex_pattern = translate_pattern(pattern);
    let regex = RegexBuilder::new(&regex_pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| FedSqlError::UnsupportedOperator(format!("invalid LIKE pattern: {e}")))?;
    Ok(regex.is_match(value))
}

/// Translates a `LIKE` pattern into an anchored regular expression:
/// `%` → `.*`, `_` → `.`, everything else escaped literally.
fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_matches_any_run_including_empty() {
        assert!(like_match("Hello123", "he%2_").unwrap());
        assert!(like_match("ab", "a%b").unwrap());
    }

    #[test]
    fn underscore_matches_exactly_one_character() {
        assert!(like_match("abc", "a_c").unwrap());
        assert!(!like_match("ac", "a_c").unwrap());
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(like_match("HELLO", "hello").unwrap());
    }

    #[test]
    fn regex_metacharacters_in_pattern_are_literal() {
        assert!(like_match("a.b", "a.b").unwrap());
        assert!(!like_match("axb", "a.b").unwrap());
    }

    #[test]
    fn no_match_returns_false() {
        assert!(!like_match("xyz", "abc").unwrap());
    }
}
