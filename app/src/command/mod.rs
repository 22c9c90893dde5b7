//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input type, so
//! dispatch from `main` is resolved at compile time.

use parley_config::Config;
use parley_conversation::SessionConfig;
use parley_providers::GeminiProvider;
use tracing::info;

mod chat;
mod info;
mod init;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Build the Gemini client from configuration, with an optional model
/// override.
fn build_provider(config: &Config, model: Option<String>) -> anyhow::Result<GeminiProvider> {
    let gemini = &config.providers.gemini;
    let api_key = gemini.api_key()?.to_string();
    let model = model.unwrap_or_else(|| gemini.model.clone());

    info!("Using Gemini model {model} at {}", gemini.base_url);

    Ok(GeminiProvider::new(api_key)
        .with_base_url(gemini.base_url.clone())
        .with_model(model))
}

/// Session settings from configuration, with an optional context length
/// override.
fn build_session_config(config: &Config, context_length: Option<usize>) -> SessionConfig {
    SessionConfig::default()
        .with_max_context_length(context_length.unwrap_or(config.session.max_context_length))
        .with_dispatch_timeout(config.session.dispatch_timeout())
}

/// Core trait defining the contract for all command strategies.
///
/// # Design Principles
/// - **Static dispatch**: All calls are monomorphized at compile time
/// - **Type safety**: Each strategy defines its own input type via associated type
/// - **Extensibility**: Adding new commands requires only implementing this trait
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
