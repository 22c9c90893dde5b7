//! Session controller: the only mutator of the context window and status.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parley_core::{
    ContextMode, ContextWindow, Exchange, GenerationClient, GenerationError, MAX_CONTEXT_LENGTH,
    SessionStatus,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dispatch::{CorrelationId, DispatchOutcome, TurnSnapshot, dispatch};
use crate::observer::SessionObserver;

/// Configuration for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum exchanges kept in the context window
    pub max_context_length: usize,
    /// Upper bound on a single generation call; `None` waits indefinitely
    pub dispatch_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_context_length: MAX_CONTEXT_LENGTH,
            dispatch_timeout: None,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub const fn with_max_context_length(mut self, max: usize) -> Self {
        self.max_context_length = max;
        self
    }

    #[must_use]
    pub const fn with_dispatch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.dispatch_timeout = timeout;
        self
    }
}

/// Errors that can occur while driving a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// What the controller did with a marshaled outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeDisposition {
    /// Reply appended to the context window
    Replied(String),
    /// Error surfaced; context window untouched
    Failed(GenerationError),
    /// Outcome of a superseded submission, discarded
    Stale,
}

#[derive(Debug, Clone)]
struct PendingTurn {
    correlation_id: CorrelationId,
    user_message: String,
    submitted_at: DateTime<Utc>,
}

/// Owns one conversation: context window, status and the current in-flight
/// submission.
///
/// The controller must stay on a single task. Background dispatches report
/// back through an internal channel; call [`Self::next_outcome`] and
/// [`Self::apply_outcome`] (or [`Self::process_next`]) from the owning task
/// to apply them.
pub struct SessionController<O: SessionObserver> {
    client: Arc<dyn GenerationClient>,
    observer: O,
    config: SessionConfig,
    window: ContextWindow,
    status: SessionStatus,
    in_flight: Option<PendingTurn>,
    outcome_tx: mpsc::UnboundedSender<DispatchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<DispatchOutcome>,
}

impl<O: SessionObserver> SessionController<O> {
    pub fn new(client: Arc<dyn GenerationClient>, observer: O, config: SessionConfig) -> Self {
        info!(
            "Creating session controller (max_context_length={}, dispatch_timeout={:?})",
            config.max_context_length, config.dispatch_timeout
        );
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            client,
            observer,
            window: ContextWindow::with_capacity(config.max_context_length),
            config,
            status: SessionStatus::Idle,
            in_flight: None,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Accept a message and dispatch it in the background.
    ///
    /// Whitespace-only messages are rejected with [`SessionError::EmptyInput`]
    /// and change nothing. A submission made while another is in flight
    /// supersedes it; the older outcome will be discarded on arrival.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(
        &mut self,
        user_message: &str,
        mode: &ContextMode,
    ) -> Result<CorrelationId, SessionError> {
        if user_message.trim().is_empty() {
            debug!("Rejecting empty submission");
            return Err(SessionError::EmptyInput);
        }

        self.observer.on_user_message_accepted(user_message);

        let correlation_id = CorrelationId::new();
        let submitted_at = Utc::now();
        let superseded = self.in_flight.replace(PendingTurn {
            correlation_id,
            user_message: user_message.to_string(),
            submitted_at,
        });
        if let Some(previous) = superseded {
            info!(
                "Submission {correlation_id} supersedes in-flight {}",
                previous.correlation_id
            );
        }
        self.set_status(SessionStatus::Dispatching);

        let snapshot = TurnSnapshot {
            correlation_id,
            submitted_at,
            context: self.window.snapshot_text(),
            mode: mode.clone(),
            user_message: user_message.to_string(),
        };
        info!(
            "Submitting {correlation_id} (mode={mode}, context={} exchanges)",
            self.window.len()
        );

        let client = Arc::clone(&self.client);
        let outcome_tx = self.outcome_tx.clone();
        let timeout = self.config.dispatch_timeout;
        tokio::spawn(async move {
            let outcome = dispatch(client.as_ref(), snapshot, timeout).await;
            if outcome_tx.send(outcome).is_err() {
                debug!("Session closed before outcome {correlation_id} was delivered");
            }
        });

        Ok(correlation_id)
    }

    /// Wait for the next marshaled outcome.
    ///
    /// The controller holds a sender of its own, so the channel never closes
    /// and this waits until some dispatch reports back.
    pub async fn next_outcome(&mut self) -> DispatchOutcome {
        match self.outcome_rx.recv().await {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }

    /// Apply an outcome on the owning task.
    ///
    /// Outcomes whose correlation id is not the current in-flight submission
    /// are stale and leave all state untouched.
    pub fn apply_outcome(&mut self, outcome: DispatchOutcome) -> OutcomeDisposition {
        let Some(pending) = self
            .in_flight
            .take_if(|p| p.correlation_id == outcome.correlation_id)
        else {
            debug!("Discarding stale outcome {}", outcome.correlation_id);
            return OutcomeDisposition::Stale;
        };

        let waited = Utc::now() - pending.submitted_at;
        match outcome.result {
            Ok(reply) => {
                info!(
                    "Applying reply for {} after {}ms",
                    pending.correlation_id,
                    waited.num_milliseconds()
                );
                self.window
                    .append(Exchange::new(pending.user_message, reply.clone()));
                self.observer.on_reply_received(&reply);
                self.set_status(SessionStatus::Completed);
                self.set_status(SessionStatus::Idle);
                OutcomeDisposition::Replied(reply)
            }
            Err(err) => {
                warn!("Generation failed for {}: {err}", pending.correlation_id);
                self.set_status(SessionStatus::Failed);
                self.observer.on_error(&err.message);
                self.set_status(SessionStatus::Idle);
                OutcomeDisposition::Failed(err)
            }
        }
    }

    /// Wait for the next outcome and apply it.
    pub async fn process_next(&mut self) -> OutcomeDisposition {
        let outcome = self.next_outcome().await;
        self.apply_outcome(outcome)
    }

    /// Submit a message and wait until its own outcome has been applied.
    pub async fn submit_and_wait(
        &mut self,
        user_message: &str,
        mode: &ContextMode,
    ) -> Result<String, SessionError> {
        let correlation_id = self.submit(user_message, mode)?;

        loop {
            let outcome = self.next_outcome().await;
            let ours = outcome.correlation_id == correlation_id;
            match self.apply_outcome(outcome) {
                OutcomeDisposition::Replied(reply) if ours => return Ok(reply),
                OutcomeDisposition::Failed(err) if ours => return Err(err.into()),
                _ => {}
            }
        }
    }

    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub const fn context(&self) -> &ContextWindow {
        &self.window
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<CorrelationId> {
        self.in_flight.as_ref().map(|p| p.correlation_id)
    }

    #[must_use]
    pub const fn observer(&self) -> &O {
        &self.observer
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status == status {
            return;
        }
        debug!("Status {:?} -> {:?}", self.status, status);
        self.status = status;
        self.observer.on_status_changed(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoClient;

    #[async_trait]
    impl GenerationClient for EchoClient {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            let message = prompt
                .lines()
                .find_map(|l| l.strip_prefix("User's Latest Message: "))
                .unwrap_or_default();
            Ok(format!("echo: {message}"))
        }
    }

    #[derive(Default)]
    struct Silent;

    impl SessionObserver for Silent {
        fn on_user_message_accepted(&mut self, _text: &str) {}
        fn on_reply_received(&mut self, _text: &str) {}
        fn on_error(&mut self, _message: &str) {}
    }

    fn controller() -> SessionController<Silent> {
        SessionController::new(Arc::new(EchoClient), Silent, SessionConfig::default())
    }

    #[test]
    fn test_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.max_context_length, MAX_CONTEXT_LENGTH);
        assert_eq!(config.dispatch_timeout, None);
    }

    #[tokio::test]
    async fn test_new_controller_is_idle_and_empty() {
        let controller = controller();
        assert_eq!(controller.status(), SessionStatus::Idle);
        assert!(controller.context().is_empty());
        assert_eq!(controller.in_flight(), None);
    }

    #[tokio::test]
    async fn test_submit_and_wait_returns_reply() {
        let mut controller = controller();

        let reply = controller
            .submit_and_wait("ping", &ContextMode::Default)
            .await;

        assert_eq!(reply, Ok("echo: ping".to_string()));
        assert_eq!(controller.context().len(), 1);
        assert_eq!(controller.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_next_outcome_waits_while_nothing_in_flight() {
        let mut controller = controller();

        let waited =
            tokio::time::timeout(Duration::from_millis(20), controller.next_outcome()).await;

        assert!(waited.is_err());
        assert_eq!(controller.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_unknown_correlation_is_stale() {
        let mut controller = controller();

        let disposition = controller.apply_outcome(DispatchOutcome {
            correlation_id: CorrelationId::new(),
            result: Ok("late".to_string()),
        });

        assert_eq!(disposition, OutcomeDisposition::Stale);
        assert!(controller.context().is_empty());
        assert_eq!(controller.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_duplicate_outcome_is_stale() {
        let mut controller = controller();
        let id = controller
            .submit("once", &ContextMode::Default)
            .unwrap_or_default();

        let outcome = DispatchOutcome {
            correlation_id: id,
            result: Ok("first".to_string()),
        };
        assert_eq!(
            controller.apply_outcome(outcome.clone()),
            OutcomeDisposition::Replied("first".to_string())
        );
        assert_eq!(controller.apply_outcome(outcome), OutcomeDisposition::Stale);
        assert_eq!(controller.context().len(), 1);
    }
}
