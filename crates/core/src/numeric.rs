//! Lenient integer parsing shared by score entry and table totals.

use once_cell::sync::Lazy;
use regex::Regex;

/// Totals at or above this value mark a player (or table column) as out.
pub const THRESHOLD: i64 = 201;

static LEADING_INT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("failed to compile leading integer regex"));

/// Parse the leading integer of `input`, ignoring any trailing text.
///
/// Leading whitespace and a single sign are accepted, so `" 12 pts"` yields
/// `12` and `"-5x"` yields `-5`. Digits are always decimal, so `"0x1A"` is
/// `0`. Inputs without leading digits, and values that do not fit in an
/// `i64`, yield `None`.
pub fn parse_int(input: &str) -> Option<i64> {
    LEADING_INT_RE
        .captures(input)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Sum a sequence of values, saturating at the `i64` bounds.
pub fn saturating_sum<I>(values: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    values
        .into_iter()
        .fold(0_i64, |acc, value| acc.saturating_add(value))
}

/// Whether a total has reached the out threshold.
pub fn is_over_threshold(total: i64) -> bool {
    total >= THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_integers() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  -17"), Some(-17));
        assert_eq!(parse_int("+8"), Some(8));
        assert_eq!(parse_int("12 points"), Some(12));
        assert_eq!(parse_int("3.9"), Some(3));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("- 4"), None);
        assert_eq!(parse_int("x12"), None);
        assert_eq!(parse_int("99999999999999999999999"), None);
    }

    #[test]
    fn radix_prefixes_are_not_special() {
        assert_eq!(parse_int("0x1A"), Some(0));
        assert_eq!(parse_int("010"), Some(10));
    }

    #[test]
    fn sums_saturate() {
        assert_eq!(saturating_sum([1, 2, 3]), 6);
        assert_eq!(saturating_sum([i64::MAX, 1]), i64::MAX);
        assert_eq!(saturating_sum(Vec::new()), 0);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(!is_over_threshold(200));
        assert!(is_over_threshold(201));
        assert!(is_over_threshold(350));
    }
}
