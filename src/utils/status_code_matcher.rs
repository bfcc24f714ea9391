//! HTTP Status Code Matching Utilities
//!
//! Provides utilities for matching HTTP status codes against patterns,
//! supporting wildcard patterns like "2xx" alongside exact codes. Status `0`
//! is a valid exact pattern: local and opaque responses report it.

/// Status codes accepted for manifest fetches unless configured otherwise
pub const DEFAULT_ACCEPTED_STATUS_CODES: [&str; 3] = ["200", "206", "0"];

/// Check if a status code matches any of the acceptable status code patterns
pub fn is_status_acceptable<S: AsRef<str>>(status_code: u16, acceptable_codes: &[S]) -> bool {
    acceptable_codes
        .iter()
        .any(|pattern| matches_pattern(status_code, pattern.as_ref()))
}

/// Check if a status code matches a specific pattern
fn matches_pattern(status_code: u16, pattern: &str) -> bool {
    let pattern = pattern.trim();

    if let Some(prefix) = pattern.strip_suffix("xx") {
        // Handle wildcard patterns like "2xx", "4xx"
        if prefix.len() == 1
            && let Ok(prefix_digit) = prefix.parse::<u16>()
        {
            return status_code / 100 == prefix_digit;
        }
        false
    } else {
        // Handle exact matches like "404", "200"
        pattern
            .parse::<u16>()
            .map(|exact_code| status_code == exact_code)
            .unwrap_or(false)
    }
}
