//! Context modes: Default / Professional / Casual / Creative

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tone selected by the user, read when a prompt is built.
///
/// Names outside the known set are kept as [`ContextMode::Unrecognized`] and
/// contribute an empty instruction rather than failing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextMode {
    #[default]
    Default,
    Professional,
    Casual,
    Creative,
    Unrecognized(String),
}

impl ContextMode {
    /// The selectable modes, in display order.
    pub const KNOWN: [Self; 4] = [
        Self::Default,
        Self::Professional,
        Self::Casual,
        Self::Creative,
    ];

    /// Parse a mode name. Matching ignores case and surrounding whitespace.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "default" | "default context" => Self::Default,
            "professional" => Self::Professional,
            "casual" => Self::Casual,
            "creative" => Self::Creative,
            _ => Self::Unrecognized(trimmed.to_string()),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Default => "Default Context",
            Self::Professional => "Professional",
            Self::Casual => "Casual",
            Self::Creative => "Creative",
            Self::Unrecognized(name) => name,
        }
    }

    /// Instruction appended to the prompt; empty when the mode defines none.
    #[must_use]
    pub const fn instruction(&self) -> &'static str {
        match self {
            Self::Professional => "Maintain a formal, professional tone.",
            Self::Casual => "Use a friendly, conversational tone.",
            Self::Creative => "Respond with creativity and imagination.",
            Self::Default | Self::Unrecognized(_) => "",
        }
    }

    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for ContextMode {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<ContextMode> for String {
    fn from(mode: ContextMode) -> Self {
        mode.label().to_string()
    }
}
