#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;

pub mod context;
pub mod error;
pub mod mode;
pub mod prompt;
pub mod status;

pub use context::{ContextWindow, Exchange, MAX_CONTEXT_LENGTH};
pub use error::GenerationError;
pub use mode::ContextMode;
pub use prompt::build_prompt;
pub use status::SessionStatus;

/// The external text-generation capability.
///
/// Implementations may be slow and may fail for any reason (network,
/// authentication, quota, malformed input); every cause is reported as a
/// [`GenerationError`] carrying a human-readable message.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Name shown next to generated replies.
    fn display_name(&self) -> &str {
        "AI"
    }
}

