//! Telegram Bot API transport.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{clean_message, split_message, Debouncer, Relay, RelayError, RelayOutcome};
use crate::config::RelayConfig;

const API_BASE: &str = "https://api.telegram.org";

/// Pause between the parts of a split message.
const PART_GAP: Duration = Duration::from_millis(500);

/// Sends messages through `sendMessage` of the Telegram Bot API.
pub struct TelegramRelay {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    max_len: usize,
    debouncer: Mutex<Debouncer>,
}

impl TelegramRelay {
    /// Build a relay from config.
    ///
    /// # Errors
    ///
    /// [`RelayError::NotConfigured`] when the token or chat id is missing.
    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let bot_token = non_empty(&config.bot_token).ok_or(RelayError::NotConfigured)?;
        let chat_id = non_empty(&config.chat_id).ok_or(RelayError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            bot_token,
            chat_id,
            max_len: config.max_message_len,
            debouncer: Mutex::new(Debouncer::new(
                Duration::try_from_secs_f32(config.debounce_secs).unwrap_or(Duration::ZERO),
            )),
        })
    }

    /// Point the relay at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn send_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }

    async fn send_part(&self, text: &str) -> Result<(), RelayError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text":    text,
        });
        let response = self.client.post(self.send_url()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Relay for TelegramRelay {
    /// Clean, debounce, split and deliver `text`.
    ///
    /// All parts are attempted even when one fails.  The message counts as
    /// delivered for debouncing only when every part went through.
    async fn send(&self, text: &str) -> Result<RelayOutcome, RelayError> {
        let message = clean_message(text);
        if message.is_empty() {
            return Ok(RelayOutcome::Empty);
        }

        let duplicate = self
            .debouncer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_duplicate(&message, Instant::now());
        if duplicate {
            log::debug!("relay: duplicate message skipped");
            return Ok(RelayOutcome::Duplicate);
        }

        let parts = split_message(&message, self.max_len);
        let total = parts.len();
        let mut failed = 0;
        let mut last_error = None;

        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(PART_GAP).await;
            }
            if let Err(e) = self.send_part(part).await {
                log::warn!("relay: part {}/{total} failed: {e}", i + 1);
                failed += 1;
                last_error = Some(e);
            }
        }

        match (failed, last_error) {
            (0, _) => {
                self.debouncer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record(message, Instant::now());
                log::info!(
                    "relay: sent {} chars in {total} part(s)",
                    text.chars().count()
                );
                Ok(RelayOutcome::Sent(total))
            }
            (_, Some(e)) if total == 1 => Err(e),
            _ => Err(RelayError::Incomplete { failed, total }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
