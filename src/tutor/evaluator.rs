//! Correctness evaluation for "addition within 10"
//!
//! Total over all inputs: anything that is neither a bare number nor an
//! `a + b` expression is judged incorrect.

use once_cell::sync::Lazy;
use regex::Regex;

/// Largest value (or sum) accepted as correct
pub const MAX_SUM: u64 = 10;

/// Leftmost `<digits> + <digits>` with optional spaces around the plus
///
/// ASCII digits and ASCII word boundaries only, matching the bare-number rule.
static ADDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)([0-9]+)\s*\+\s*([0-9]+)(?-u:\b)").expect("addition pattern is valid")
});

/// Decide whether a learner's answer is correct
pub fn is_correct(text: &str) -> bool {
    let text = text.trim();

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        // Overflowing u64 is certainly above the bound
        return text.parse::<u64>().map_or(false, |n| n <= MAX_SUM);
    }

    if let Some(caps) = ADDITION.captures(text) {
        let a = caps[1].parse::<u64>().ok();
        let b = caps[2].parse::<u64>().ok();
        return match (a, b) {
            (Some(a), Some(b)) => a.checked_add(b).map_or(false, |sum| sum <= MAX_SUM),
            _ => false,
        };
    }

    false
}
