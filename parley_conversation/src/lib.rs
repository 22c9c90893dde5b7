#![warn(
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

//! Conversation session core.
//!
//! A [`SessionController`] owns the context window and status of a single
//! conversation. Each submission is dispatched to the generation service on
//! a background task; the task only computes a result and sends it back over
//! a channel, and the controller applies it on the task that owns the
//! session. Outcomes from superseded submissions are discarded by
//! correlation id.
//!
//! # Key Features
//! - Bounded FIFO context window consulted for every prompt
//! - Non-blocking dispatch with stale-result rejection
//! - Optional per-dispatch timeout
//! - Terminal display and interactive loop

mod console;
mod controller;
mod dispatch;
mod interactive;
mod observer;

pub use console::ConsoleDisplay;
pub use controller::{OutcomeDisposition, SessionConfig, SessionController, SessionError};
pub use dispatch::{CorrelationId, DispatchOutcome, DispatchRequest};
pub use interactive::{InputCommand, run_interactive};
pub use observer::SessionObserver;
