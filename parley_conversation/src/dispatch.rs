//! Background dispatch of a single submission.
//!
//! A dispatch holds only immutable inputs captured at submit time and hands
//! its result back as a [`DispatchOutcome`]; it never touches session state.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parley_core::{ContextMode, GenerationClient, GenerationError, build_prompt};
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque token distinguishing one submission's in-flight work from another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The request actually sent to the generation service.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub prompt_text: String,
    pub submitted_at: DateTime<Utc>,
    pub correlation_id: CorrelationId,
}

/// Result of one dispatch, tagged with the submission it belongs to.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub correlation_id: CorrelationId,
    pub result: Result<String, GenerationError>,
}

/// Inputs captured on the owning task when a message is submitted.
#[derive(Debug, Clone)]
pub(crate) struct TurnSnapshot {
    pub correlation_id: CorrelationId,
    pub submitted_at: DateTime<Utc>,
    pub context: String,
    pub mode: ContextMode,
    pub user_message: String,
}

impl TurnSnapshot {
    fn into_request(self) -> DispatchRequest {
        DispatchRequest {
            prompt_text: build_prompt(&self.context, &self.mode, &self.user_message),
            submitted_at: self.submitted_at,
            correlation_id: self.correlation_id,
        }
    }
}

/// Build the prompt, call the client and package the result.
///
/// Always produces an outcome; client failures and timeouts become
/// `Err(GenerationError)`.
pub(crate) async fn dispatch(
    client: &dyn GenerationClient,
    snapshot: TurnSnapshot,
    timeout: Option<Duration>,
) -> DispatchOutcome {
    let request = snapshot.into_request();
    debug!(
        "Dispatching {} ({} prompt chars)",
        request.correlation_id,
        request.prompt_text.len()
    );

    let call = client.generate(&request.prompt_text);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(GenerationError::new(format!(
                "generation timed out after {limit:?}"
            )))
        }),
        None => call.await,
    };

    let elapsed = Utc::now() - request.submitted_at;
    info!(
        "Dispatch {} finished in {}ms (ok={})",
        request.correlation_id,
        elapsed.num_milliseconds(),
        result.is_ok()
    );

    DispatchOutcome {
        correlation_id: request.correlation_id,
        result,
    }
}
