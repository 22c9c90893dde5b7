use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a conversation session as exposed for display.
///
/// `Idle -> Dispatching -> {Completed, Failed} -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Dispatching,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Text shown in the status bar.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Dispatching => "Generating response...",
            Self::Completed => "Response received",
            Self::Failed => "Error",
        }
    }

    #[must_use]
    pub const fn is_dispatching(self) -> bool {
        matches!(self, Self::Dispatching)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
