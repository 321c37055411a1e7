//! Forwarding selected text to a chat.
//!
//! The relay hotkey copies the current selection and hands it to a
//! [`Relay`].  Messages are cleaned of non-printable characters, split into
//! parts no longer than the transport allows, and an identical message sent
//! again within the debounce window is skipped.
//!
//! [`TelegramRelay`] is the only transport.

pub mod telegram;

pub use telegram::TelegramRelay;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// RelayError / RelayOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RelayError {
    /// Bot token or chat id missing.
    #[error("relay is not configured (TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID)")]
    NotConfigured,

    #[error("relay request failed: {0}")]
    Request(String),

    #[error("relay endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Some parts of a split message were not delivered.
    #[error("{failed} of {total} message parts failed")]
    Incomplete { failed: usize, total: usize },
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Request(e.to_string())
    }
}

/// What [`Relay::send`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Delivered in this many parts.
    Sent(usize),
    /// Identical to the last delivered message inside the debounce window.
    Duplicate,
    /// Nothing printable left after cleaning.
    Empty,
}

// ---------------------------------------------------------------------------
// Relay trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Relay: Send + Sync {
    async fn send(&self, text: &str) -> Result<RelayOutcome, RelayError>;
}

// ---------------------------------------------------------------------------
// Message preparation
// ---------------------------------------------------------------------------

/// Drop control characters other than newline and tab, normalise line
/// endings and trim surrounding whitespace.
pub fn clean_message(text: &str) -> String {
    text.replace("\r\n", "\n")
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split `text` into parts of at most `max_len` characters.
///
/// Each cut is made at the last newline inside the limit, else at the last
/// space, else exactly at the limit.  Whitespace at the start of the next
/// part is dropped.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let limit = match rest.char_indices().nth(max_len) {
            Some((byte, _)) => byte,
            None => {
                parts.push(rest.to_string());
                break;
            }
        };

        let window = &rest[..limit];
        let cut = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        parts.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }

    parts
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Remembers the last delivered message to suppress quick repeats.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// `true` when `message` equals the last recorded one and was recorded
    /// less than `window` before `now`.
    pub fn is_duplicate(&self, message: &str, now: Instant) -> bool {
        match &self.last {
            Some((last, at)) => last == message && now.saturating_duration_since(*at) < self.window,
            None => false,
        }
    }

    pub fn record(&mut self, message: String, now: Instant) {
        self.last = Some((message, now));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
