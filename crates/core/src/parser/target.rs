use std::sync::OnceLock;

use regex::Regex;

use super::{Target, EMOJI_MARKER, USER_MARKER};

fn user_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(USER_MARKER).expect("user marker is a valid regex"))
}

fn emoji_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EMOJI_MARKER).expect("emoji marker is a valid regex"))
}

/// First user id mentioned in `text` (`<@U123>` -> `U123`).
pub fn extract_user_id(text: &str) -> Option<&str> {
    user_pattern().captures(text).and_then(|captures| captures.get(1)).map(|m| m.as_str())
}

/// First emoji shortcode in `text` (`:sake:` -> `sake`).
pub fn extract_emoji_name(text: &str) -> Option<&str> {
    emoji_pattern().captures(text).and_then(|captures| captures.get(1)).map(|m| m.as_str())
}

/// Resolves the single target of a karma request. A user mention anywhere in
/// the text beats any emoji; later mentions are never considered.
pub fn extract_target(text: &str) -> Option<Target> {
    if let Some(user_id) = extract_user_id(text) {
        return Some(Target::user(user_id));
    }

    extract_emoji_name(text).map(Target::emoji)
}
