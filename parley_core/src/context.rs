//! Bounded memory of recent exchanges.
//!
//! The window is consulted when building each new prompt and is owned by a
//! single session controller; it carries no interior synchronization.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of exchanges kept in the context window.
pub const MAX_CONTEXT_LENGTH: usize = 5;

/// One user message paired with the generated reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    user_text: String,
    reply_text: String,
    created_at: DateTime<Utc>,
}

impl Exchange {
    #[must_use]
    pub fn new(user_text: impl Into<String>, reply_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            reply_text: reply_text.into(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn user_text(&self) -> &str {
        &self.user_text
    }

    #[must_use]
    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn render(&self) -> String {
        format!(
            "User said: {}\nAI responded: {}",
            self.user_text, self.reply_text
        )
    }
}

/// FIFO window over the most recent exchanges, oldest first.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    entries: VecDeque<Exchange>,
    capacity: usize,
}

impl ContextWindow {
    /// Create a window holding at most [`MAX_CONTEXT_LENGTH`] exchanges.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_CONTEXT_LENGTH)
    }

    /// Create a window with a custom bound. A bound of zero keeps nothing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an exchange, evicting from the front while over the bound.
    pub fn append(&mut self, exchange: Exchange) {
        self.entries.push_back(exchange);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Render every entry in order, joined by newlines.
    #[must_use]
    pub fn snapshot_text(&self) -> String {
        self.entries
            .iter()
            .map(Exchange::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entries(&self) -> impl Iterator<Item = &Exchange> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: usize, capacity: usize) -> ContextWindow {
        let mut window = ContextWindow::with_capacity(capacity);
        for i in 0..count {
            window.append(Exchange::new(format!("question {i}"), format!("answer {i}")));
        }
        window
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut window = ContextWindow::new();
        for i in 0..20 {
            window.append(Exchange::new(format!("q{i}"), format!("a{i}")));
            assert!(window.len() <= MAX_CONTEXT_LENGTH);
        }
        assert_eq!(window.len(), MAX_CONTEXT_LENGTH);
    }

    #[test]
    fn test_oldest_evicted_first() {
        let window = filled(7, 5);

        let users: Vec<&str> = window.entries().map(Exchange::user_text).collect();
        assert_eq!(
            users,
            vec!["question 2", "question 3", "question 4", "question 5", "question 6"]
        );
    }

    #[test]
    fn test_snapshot_format() {
        let window = filled(2, 5);

        assert_eq!(
            window.snapshot_text(),
            "User said: question 0\nAI responded: answer 0\nUser said: question 1\nAI responded: answer 1"
        );
    }

    #[test]
    fn test_snapshot_is_stable_without_append() {
        let window = filled(3, 5);
        assert_eq!(window.snapshot_text(), window.snapshot_text());
    }

    #[test]
    fn test_empty_snapshot() {
        let window = ContextWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.snapshot_text(), "");
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let window = filled(3, 0);
        assert!(window.is_empty());
    }
}
