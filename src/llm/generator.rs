//! Core `ContentProvider` trait and `ApiGenerator` implementation.
//!
//! `ApiGenerator` calls any OpenAI-compatible `/v1/chat/completions` endpoint
//! (DeepSeek by default, also OpenAI, Groq, Ollama in OpenAI mode, …).
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::LlmConfig;
use crate::llm::prompt::{strip_code_fences, PromptBuilder};

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while generating content.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was configured for an endpoint that needs one.
    #[error("no API key configured (set LLM_API_KEY or [llm].api_key)")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("LLM endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The LLM returned a response with no usable text content.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ContentProvider trait
// ---------------------------------------------------------------------------

/// Async trait for anything that turns a prompt into text to type.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn ContentProvider>`).
///
/// # Arguments
/// * `prompt`  – The operator's task, read from the clipboard or selection.
/// * `context` – Optional rendered dialogue history from
///   [`DialogueContext`](crate::llm::DialogueContext).
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String, LlmError>;

    /// Condense a rendered dialogue into a short summary.
    ///
    /// The default forwards `dialogue` to [`generate`](Self::generate)
    /// without context.
    async fn summarize(&self, dialogue: &str) -> Result<String, LlmError> {
        self.generate(dialogue, None).await
    }
}

// ---------------------------------------------------------------------------
// ApiGenerator
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Consecutive requests are spaced at least `min_interval_secs` apart; a
/// call made sooner waits out the remainder before sending.
pub struct ApiGenerator {
    client: reqwest::Client,
    config: LlmConfig,
    prompt_builder: PromptBuilder,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl ApiGenerator {
    /// Build an `ApiGenerator` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            prompt_builder: PromptBuilder::new(config.code_only),
            min_interval: Duration::from_secs(config.min_interval_secs),
            last_request: Mutex::new(None),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, prompt: &str, context: Option<&str>) -> serde_json::Value {
        let (system_msg, user_msg) = self.prompt_builder.build_chat(prompt, context);
        self.chat_body(&system_msg, &user_msg)
    }

    fn summary_body(&self, dialogue: &str) -> serde_json::Value {
        let (system_msg, user_msg) = self.prompt_builder.build_summary(dialogue);
        self.chat_body(&system_msg, &user_msg)
    }

    fn chat_body(&self, system_msg: &str, user_msg: &str) -> serde_json::Value {
        serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  self.config.max_tokens
        })
    }

    /// Sleep until `min_interval` has passed since the previous request,
    /// then record now as the latest request time.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        let wait = remaining_interval(*last, Instant::now(), self.min_interval);
        if !wait.is_zero() {
            log::debug!("llm: pacing request by {} ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
        *last = Some(Instant::now());
    }

    /// Send one chat-completion request and return the answer text.
    ///
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.  Endpoints on loopback hosts
    /// may be used without a key; remote ones fail fast with
    /// [`LlmError::MissingApiKey`].
    async fn complete(&self, body: &serde_json::Value) -> Result<String, LlmError> {
        let key = self.config.api_key.as_deref().unwrap_or("").trim();
        if key.is_empty() && !is_local(&self.config.base_url) {
            return Err(LlmError::MissingApiKey);
        }

        self.pace().await;

        let mut req = self.client.post(self.endpoint()).json(body);
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        completion_text(&json)
    }
}

#[async_trait]
impl ContentProvider for ApiGenerator {
    /// Send `prompt` to the configured OpenAI-compatible endpoint.
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String, LlmError> {
        log::info!(
            "llm: requesting {} ({} prompt chars)",
            self.config.model,
            prompt.chars().count()
        );
        let mut text = self.complete(&self.request_body(prompt, context)).await?;
        if self.config.code_only {
            text = strip_code_fences(&text);
            if text.is_empty() {
                return Err(LlmError::EmptyResponse);
            }
        }
        log::debug!("llm: answer:\n{text}");
        Ok(text)
    }

    /// Ask for a plain-text summary; fences are never stripped here.
    async fn summarize(&self, dialogue: &str) -> Result<String, LlmError> {
        log::info!(
            "llm: summarising dialogue ({} chars)",
            dialogue.chars().count()
        );
        let text = self.complete(&self.summary_body(dialogue)).await?;
        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Extract the first choice's message content.
///
/// Only blank lines around the answer are dropped; leading indentation of
/// the first line is kept.
fn completion_text(json: &serde_json::Value) -> Result<String, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(LlmError::EmptyResponse)?;

    let text = trim_blank_lines(content);
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}

pub(crate) fn trim_blank_lines(text: &str) -> &str {
    let text = text.trim_end();
    match text.find(|c: char| !c.is_whitespace()) {
        Some(first) => {
            let line_start = text[..first].rfind('\n').map_or(0, |i| i + 1);
            &text[line_start..]
        }
        None => "",
    }
}

fn remaining_interval(last: Option<Instant>, now: Instant, interval: Duration) -> Duration {
    match last {
        Some(last) => interval.saturating_sub(now.saturating_duration_since(last)),
        None => Duration::ZERO,
    }
}

fn is_local(base_url: &str) -> bool {
    let rest = base_url.split("://").nth(1).unwrap_or(base_url);
    ["localhost", "127.0.0.1", "[::1]"].iter().any(|host| {
        rest.strip_prefix(host)
            .is_some_and(|tail| tail.is_empty() || tail.starts_with([':', '/']))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
