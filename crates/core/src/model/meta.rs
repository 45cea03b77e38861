use serde::{Deserialize, Serialize};

/// Descriptive metadata attached to a session when it is persisted.
///
/// All fields are optional: the interview flow works the same whether or
/// not the user told us what kind of interview they were rehearsing. Blank
/// or whitespace-only values are normalised to `None` so the analytics
/// layer never has to distinguish `""` from "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewMeta {
    interview_type: Option<String>,
    interview_role: Option<String>,
    skills: Option<String>,
}

impl InterviewMeta {
    /// Creates metadata from raw optional inputs, trimming whitespace and
    /// mapping blank values to `None`.
    #[must_use]
    pub fn new(
        interview_type: Option<String>,
        interview_role: Option<String>,
        skills: Option<String>,
    ) -> Self {
        Self {
            interview_type: normalize(interview_type),
            interview_role: normalize(interview_role),
            skills: normalize(skills),
        }
    }

    /// Interview category, e.g. "Technical" or "Behavioral"
    #[must_use]
    pub fn interview_type(&self) -> Option<&str> {
        self.interview_type.as_deref()
    }

    /// Target role the user rehearsed for
    #[must_use]
    pub fn interview_role(&self) -> Option<&str> {
        self.interview_role.as_deref()
    }

    /// Free-form skills the questions were generated around
    #[must_use]
    pub fn skills(&self) -> Option<&str> {
        self.skills.as_deref()
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
