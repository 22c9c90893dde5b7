//! Terminal rendering of a conversation transcript.

use std::fmt;
use std::io::Write;

use parley_core::SessionStatus;
use tracing::{debug, warn};

use crate::observer::SessionObserver;

/// Writes the transcript as `You: ...` / `{assistant}: ...` / `Error: ...`.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    assistant_name: String,
    reply_only: bool,
}

impl ConsoleDisplay<std::io::Stdout> {
    #[must_use]
    pub fn stdout(assistant_name: impl Into<String>) -> Self {
        Self::new(std::io::stdout(), assistant_name)
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, assistant_name: impl Into<String>) -> Self {
        Self {
            out,
            assistant_name: assistant_name.into(),
            reply_only: false,
        }
    }

    /// Print replies and nothing else.
    ///
    /// User echoes, the progress line and error lines are suppressed; the
    /// caller reports failures from the returned [`crate::SessionError`].
    #[must_use]
    pub const fn reply_only(mut self) -> Self {
        self.reply_only = true;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        let written = self
            .out
            .write_fmt(args)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            warn!("Failed to write to console: {e}");
        }
    }
}

impl<W: Write> SessionObserver for ConsoleDisplay<W> {
    fn on_user_message_accepted(&mut self, text: &str) {
        if !self.reply_only {
            self.emit(format_args!("You: {text}"));
        }
    }

    fn on_reply_received(&mut self, text: &str) {
        let name = self.assistant_name.clone();
        self.emit(format_args!("{name}: {text}\n"));
    }

    fn on_error(&mut self, message: &str) {
        if !self.reply_only {
            self.emit(format_args!("Error: {message}\n"));
        }
    }

    fn on_status_changed(&mut self, status: SessionStatus) {
        debug!("Status: {status}");
        if status.is_dispatching() && !self.reply_only {
            self.emit(format_args!("[{status}]"));
        }
    }
}
