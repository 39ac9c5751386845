use std::sync::OnceLock;

use regex::Regex;

use super::{Operation, EMOJI_MARKER, USER_MARKER};

/// Half-width and full-width (U+3000) spaces. Newlines are deliberately absent
/// so a marker and its token must sit on the same line.
const MARKER_GAP: &str = "[ \u{3000}]*";

struct OperationPatterns {
    increment: Regex,
    decrement: Regex,
    query: Regex,
}

fn patterns() -> &'static OperationPatterns {
    static PATTERNS: OnceLock<OperationPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| OperationPatterns {
        increment: token_pattern(r"\+\+"),
        decrement: token_pattern(r"\-\-"),
        query: token_pattern(r"\=\="),
    })
}

fn token_pattern(token: &str) -> Regex {
    let pattern = format!("(?:{USER_MARKER}|{EMOJI_MARKER}){MARKER_GAP}{token}");
    Regex::new(&pattern).expect("operation token pattern is a valid regex")
}

/// Classifies `text` by the first operation family that matches anywhere in it.
///
/// Increment is checked before decrement, and decrement before query, so text
/// carrying several tokens resolves deterministically.
pub fn detect_operation(text: &str) -> Operation {
    let patterns = patterns();
    if patterns.increment.is_match(text) {
        Operation::Increment
    } else if patterns.decrement.is_match(text) {
        Operation::Decrement
    } else if patterns.query.is_match(text) {
        Operation::Query
    } else {
        Operation::None
    }
}
