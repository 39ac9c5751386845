//! Message intent parsing
//!
//! Karma requests are plain chat text such as `<@U123456>++` or `:sake: --`.
//! Parsing is split in two independent passes:
//! - **Operation detection** (`detector`) - classifies the text as an increment,
//!   decrement, query, or nothing at all.
//! - **Target extraction** (`target`) - finds the user mention or emoji the
//!   request refers to. User mentions always win over emoji.
//!
//! Neither pass fails: text that does not match simply yields
//! [`Operation::None`] or no target.

pub mod detector;
pub mod target;

use serde::{Deserialize, Serialize};

pub use detector::detect_operation;
pub use target::{extract_emoji_name, extract_target, extract_user_id};

/// Raw pattern for a user mention marker: `<@U123ABC>`.
pub(crate) const USER_MARKER: &str = r"<@([A-Z0-9]+)>";

/// Raw pattern for an emoji marker: `:beer_mug:`.
pub(crate) const EMOJI_MARKER: &str = r":([a-zA-Z0-9_+\-]+):";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Increment,
    Decrement,
    Query,
    None,
}

impl Operation {
    /// Signed point change applied by this operation, if it mutates.
    pub fn delta(&self) -> Option<i64> {
        match self {
            Self::Increment => Some(1),
            Self::Decrement => Some(-1),
            Self::Query | Self::None => None,
        }
    }

    pub fn token(&self) -> Option<&'static str> {
        match self {
            Self::Increment => Some("++"),
            Self::Decrement => Some("--"),
            Self::Query => Some("=="),
            Self::None => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    User { id: String },
    Emoji { name: String },
}

impl Target {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User { id: id.into() }
    }

    pub fn emoji(name: impl Into<String>) -> Self {
        Self::Emoji { name: name.into() }
    }

    /// Key under which the target's points are stored. User ids and emoji
    /// names share a single keyspace.
    pub fn key(&self) -> &str {
        match self {
            Self::User { id } => id,
            Self::Emoji { name } => name,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}
