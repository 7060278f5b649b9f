use serde::Serialize;
use std::fmt;

/// Outcome of the one-time engine probe a backend performs at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Capability {
    Ready { model: String },
    Unavailable { reason: String },
}

impl Capability {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Capability::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Capability::Ready { .. })
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            Capability::Ready { model } => Some(model),
            Capability::Unavailable { .. } => None,
        }
    }
}

/// Which mode produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// The preferred engine answered.
    Ai,
    /// The deterministic local fallback answered.
    Heuristic,
}

impl AnswerMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            AnswerMode::Ai => "ai",
            AnswerMode::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
