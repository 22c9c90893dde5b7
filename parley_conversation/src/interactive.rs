//! Interactive terminal loop.
//!
//! The loop owns the controller and waits on stdin and the outcome channel at
//! the same time, so typing is never blocked by an in-flight generation.

use std::io::Write;

use parley_core::ContextMode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::controller::{SessionController, SessionError};
use crate::dispatch::DispatchOutcome;
use crate::observer::SessionObserver;

/// A parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    Exit,
    /// `/mode NAME`
    SetMode(ContextMode),
    /// `/mode` with no argument
    ShowMode,
    /// `/modes`
    ListModes,
    /// `/context`
    ShowContext,
    /// `/status`
    ShowStatus,
    /// Anything else, submitted verbatim
    Message(String),
}

impl InputCommand {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "exit" | "quit" | "q" => return Self::Exit,
            "/modes" => return Self::ListModes,
            "/context" => return Self::ShowContext,
            "/status" => return Self::ShowStatus,
            "/mode" => return Self::ShowMode,
            _ => {}
        }

        if let Some(name) = trimmed.strip_prefix("/mode ") {
            return Self::SetMode(ContextMode::from_name(name));
        }

        Self::Message(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

enum LoopEvent {
    Input(Option<String>),
    Outcome(DispatchOutcome),
}

/// Run an interactive conversation on stdin/stdout until `exit` or EOF.
pub async fn run_interactive<O: SessionObserver>(
    controller: &mut SessionController<O>,
    initial_mode: ContextMode,
) -> anyhow::Result<()> {
    let mut mode = initial_mode;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("=== parley ({mode}) ===");
    println!("Type 'exit', 'quit', or Ctrl+D to end the session.");
    println!("Commands: /mode NAME, /modes, /context, /status\n");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let event = tokio::select! {
            line = lines.next_line() => LoopEvent::Input(line?),
            outcome = controller.next_outcome() => LoopEvent::Outcome(outcome),
        };

        match event {
            LoopEvent::Input(None) => {
                debug!("stdin closed");
                break;
            }
            LoopEvent::Input(Some(line)) => match InputCommand::parse(&line) {
                InputCommand::Exit => break,
                InputCommand::SetMode(next) => {
                    if !next.is_recognized() {
                        println!("Unknown mode '{next}', it adds no instructions.");
                    }
                    info!("Mode changed: {mode} -> {next}");
                    mode = next;
                    println!("Mode: {mode}");
                }
                InputCommand::ShowMode => println!("Mode: {mode}"),
                InputCommand::ListModes => {
                    for known in ContextMode::KNOWN {
                        let marker = if known == mode { "*" } else { " " };
                        println!("{marker} {known}");
                    }
                }
                InputCommand::ShowContext => {
                    let context = controller.context();
                    println!(
                        "Context ({}/{} exchanges):",
                        context.len(),
                        context.capacity()
                    );
                    if !context.is_empty() {
                        println!("{}", context.snapshot_text());
                    }
                }
                InputCommand::ShowStatus => println!("Status: {}", controller.status()),
                InputCommand::Message(text) => match controller.submit(&text, &mode) {
                    Ok(_) | Err(SessionError::EmptyInput) => {}
                    Err(e) => println!("Error: {e}"),
                },
            },
            LoopEvent::Outcome(outcome) => {
                controller.apply_outcome(outcome);
            }
        }
    }

    if let Some(pending) = controller.in_flight() {
        info!("Abandoning in-flight submission {pending}");
    }
    println!(
        "\nSession ended. Exchanges in context: {}",
        controller.context().len()
    );

    Ok(())
}
