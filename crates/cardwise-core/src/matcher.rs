//! Merchant name matching strategies
//!
//! Raw merchant strings from bank feeds are noisy ("STARBUCKS #123",
//! "Starbucks Store 0456"). The resolver compares an incoming name against a
//! user's known merchants through a `MerchantMatcher`, so the strategy can be
//! swapped (tokenized, phonetic, edit-distance) without touching call sites.

use regex::RegexBuilder;

/// Normalize a raw merchant name for lookup purposes only
///
/// Stored names keep their original casing.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Strategy for deciding whether a stored merchant name refers to the same
/// merchant as a normalized query
pub trait MerchantMatcher: Send + Sync {
    /// `normalized_query` is the output of [`normalize`]; `stored_name` is a
    /// canonical name or raw-name variant as stored.
    fn matches(&self, normalized_query: &str, stored_name: &str) -> bool;
}

/// Case-insensitive substring containment, the default strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl MerchantMatcher for SubstringMatcher {
    fn matches(&self, normalized_query: &str, stored_name: &str) -> bool {
        if normalized_query.is_empty() {
            return false;
        }
        stored_name.to_lowercase().contains(normalized_query)
    }
}

/// Case-insensitive regex containment over the escaped query
///
/// Behaves like `SubstringMatcher` for plain names; serves as the template
/// for richer pattern strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatcher;

impl MerchantMatcher for RegexMatcher {
    fn matches(&self, normalized_query: &str, stored_name: &str) -> bool {
        if normalized_query.is_empty() {
            return false;
        }
        RegexBuilder::new(&regex::escape(normalized_query))
            .case_insensitive(true)
            .build()
            .map(|re| re.is_match(stored_name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  STARBUCKS #123 "), "starbucks #123");
    }

    #[test]
    fn substring_matcher_is_case_insensitive() {
        let m = SubstringMatcher;
        assert!(m.matches("starbucks", "STARBUCKS #123"));
        assert!(m.matches("starbucks #123", "Starbucks #123"));
        assert!(!m.matches("dunkin", "Starbucks #123"));
    }

    #[test]
    fn substring_matcher_rejects_empty_query() {
        let m = SubstringMatcher;
        assert!(!m.matches("", "Starbucks"));
    }

    #[test]
    fn regex_matcher_escapes_metacharacters() {
        let m = RegexMatcher;
        // "#123" and "." must be treated literally, not as regex syntax
        assert!(m.matches("starbucks #123", "STARBUCKS #123 SEATTLE"));
        assert!(m.matches("amazon.com", "AMAZON.COM*ORDER"));
        assert!(!m.matches("amazon.com", "AMAZONXCOM"));
    }

    #[test]
    fn strategies_agree_on_plain_names() {
        let sub = SubstringMatcher;
        let re = RegexMatcher;
        for (query, stored) in [
            ("netflix", "Netflix.com"),
            ("shell", "SHELL OIL 5771"),
            ("whole foods", "WHOLEFDS MKT"),
        ] {
            assert_eq!(sub.matches(query, stored), re.matches(query, stored));
        }
    }
}
