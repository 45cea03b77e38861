use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker string stored for questions the user chose not to answer.
///
/// Kept as the on-wire encoding so persisted sessions written before the
/// enum existed still decode to [`Answer::Skipped`].
pub const SKIPPED_MARKER: &str = "Skipped";

/// A user's response to a single interview question.
///
/// Serialises as a plain string: provided answers as their text, skipped
/// questions as the [`SKIPPED_MARKER`] literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Answer {
    /// The user typed a response.
    Provided(String),
    /// The user asked to skip this question.
    Skipped,
}

impl Answer {
    /// Parses the stored string form of an answer
    #[must_use]
    pub fn parse(text: impl Into<String>) -> Self {
        Self::from(text.into())
    }

    /// Renders the stored string form of this answer
    #[must_use]
    pub fn as_text(&self) -> &str {
        match self {
            Self::Provided(text) => text,
            Self::Skipped => SKIPPED_MARKER,
        }
    }

    /// Returns the answer text, or `None` for a skipped question
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Provided(text) => Some(text),
            Self::Skipped => None,
        }
    }

    /// Whether this question was skipped
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        if value == SKIPPED_MARKER {
            Self::Skipped
        } else {
            Self::Provided(value)
        }
    }
}

impl From<Answer> for String {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Provided(text) => text,
            Answer::Skipped => SKIPPED_MARKER.to_string(),
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provided(text) => write!(f, "{text}"),
            Self::Skipped => write!(f, "{SKIPPED_MARKER}"),
        }
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
