//! Identifier normalization and payload parsing
//!
//! ## Responsibilities
//!
//! - Canonicalize raw strings into comparison keys
//! - Recover a registration number from arbitrary decoded payloads
//!
//! Registration numbers travel inside longer encoded payloads (URLs, vendor
//! wrappers) with inconsistent formatting. The parser heuristics recover the
//! canonical `DDDD-DDD…` shape without requiring the code producer to follow
//! one fixed schema.

use regex::Regex;
use std::sync::LazyLock;

/// Dash-delimited registration number, e.g. "2025-001"
static REGISTRATION_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{3,}").expect("registration number pattern"));

/// Run of 7 or more consecutive digits
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{7,}").expect("digit run pattern"));

/// Canonicalize a raw string into a comparison key.
///
/// Removes every character that is not an ASCII letter or digit, then
/// lowercases. The result is used only for comparisons, never stored or
/// displayed.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Extract a plausible registrant identifier from a decoded payload.
///
/// Ordered heuristics, first match wins:
/// 1. a dash-delimited registration number substring is returned verbatim;
/// 2. a run of 7+ consecutive digits; exactly 7 digits are reformatted as
///    `DDDD-DDD`, longer runs are returned as-is;
/// 3. otherwise the trimmed payload is returned unchanged (deliberate
///    fallback, not a failure).
pub fn parse(payload: &str) -> String {
    if let Some(m) = REGISTRATION_NO.find(payload) {
        return m.as_str().to_string();
    }

    if let Some(m) = DIGIT_RUN.find(payload) {
        let digits = m.as_str();
        if digits.len() == 7 {
            return format!("{}-{}", &digits[..4], &digits[4..]);
        }
        return digits.to_string();
    }

    payload.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_and_lowercases() {
        assert_eq!(normalize("2025-001"), "2025001");
        assert_eq!(normalize("2025 001"), "2025001");
        assert_eq!(normalize("2025001"), "2025001");
        assert_eq!(normalize("OSCA-2025/001"), "osca2025001");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_parse_dash_delimited_inside_url() {
        assert_eq!(parse("https://x/v?id=2025-001"), "2025-001");
    }

    #[test]
    fn test_parse_seven_digit_run_reformatted() {
        assert_eq!(parse("OSCA2025001XYZ"), "2025-001");
    }

    #[test]
    fn test_parse_longer_digit_run_kept_as_is() {
        assert_eq!(parse("id:202500123"), "202500123");
    }

    #[test]
    fn test_parse_fallback_returns_trimmed_input() {
        assert_eq!(parse("no-id-here"), "no-id-here");
        assert_eq!(parse("  free text  "), "free text");
    }

    #[test]
    fn test_parse_prefers_dash_form_over_digit_run() {
        // Both shapes present: the dash-delimited number wins.
        assert_eq!(parse("9999999 then 2025-001"), "2025-001");
    }
}
