//! Multi-turn conversation command.
//!
//! Runs either one request (`-m`) or an interactive session in which input
//! stays responsive while replies are generated in the background.

use std::sync::Arc;

use parley_config::Config;
use parley_conversation::{ConsoleDisplay, SessionController, run_interactive};
use parley_core::{ContextMode, GenerationClient};
use tracing::info;

use super::{build_provider, build_session_config};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional mode override
    pub mode: Option<String>,
    /// Optional model override
    pub model: Option<String>,
    /// Number of exchanges to keep in context
    pub context_length: Option<usize>,
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        let provider = build_provider(&config, input.model)?;
        let assistant_name = provider.display_name().to_string();
        let client: Arc<dyn GenerationClient> = Arc::new(provider);

        let session_config = build_session_config(&config, input.context_length);
        let mode = input.mode.as_deref().map_or_else(
            || config.session.default_mode.clone(),
            ContextMode::from_name,
        );

        info!(
            "Starting conversation (mode={mode}, context_length={})",
            session_config.max_context_length
        );

        if let Some(msg) = input.message {
            // Single message mode: the reply is the only output on stdout; a
            // failure is reported once, by the returned error.
            let display = ConsoleDisplay::stdout(assistant_name).reply_only();
            let mut controller = SessionController::new(client, display, session_config);

            controller.submit_and_wait(&msg, &mode).await?;
        } else {
            let display = ConsoleDisplay::stdout(assistant_name);
            let mut controller = SessionController::new(client, display, session_config);

            run_interactive(&mut controller, mode).await?;
        }

        Ok(())
    }
}
