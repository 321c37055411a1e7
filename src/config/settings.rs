//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a hand-written `settings.toml`
//! only needs the keys it wants to change.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::typing::{CadenceProfile, IndentStyle};

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the language-model content provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible endpoint.
    ///
    /// - DeepSeek default: `https://api.deepseek.com`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key sent as a bearer token.  Usually supplied through the
    /// `LLM_API_KEY` / `DEEPSEEK_API_KEY` environment variables instead.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"deepseek-chat"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).  Lower = more deterministic.
    pub temperature: f32,
    /// Upper bound on the generated answer length.
    pub max_tokens: u32,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
    /// Minimum seconds between two consecutive requests.
    pub min_interval_secs: u64,
    /// Append the "code only, no commentary" instruction to every task.
    pub code_only: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".into(),
            api_key: None,
            model: "deepseek-chat".into(),
            temperature: 0.1,
            max_tokens: 800,
            timeout_secs: 30,
            min_interval_secs: 3,
            code_only: true,
        }
    }
}

// ---------------------------------------------------------------------------
// TypingConfig
// ---------------------------------------------------------------------------

/// Settings for the keystroke playback engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Inter-keystroke timing profile.
    pub cadence: CadenceProfile,
    /// Fixed RNG seed for reproducible cadence.  `None` seeds from entropy.
    pub seed: Option<u64>,
    /// How leading whitespace of generated lines is handled.
    pub indent: IndentStyle,
    /// Pause before the first keystroke so the operator can release the
    /// hotkey and settle focus.
    pub start_delay_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            cadence: CadenceProfile::default(),
            seed: None,
            indent: IndentStyle::default(),
            start_delay_ms: 150,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.  Names are parsed by [`crate::hotkey::parse_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Read input, generate and start typing.
    pub start_key: String,
    /// Pause / resume the running job.
    pub pause_key: String,
    /// Abort the running job (and any pending generation).
    pub cancel_key: String,
    /// Copy the current selection and forward it to the relay.
    pub relay_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            start_key: "F8".into(),
            pause_key: "F9".into(),
            cancel_key: "F10".into(),
            relay_key: "Insert".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// InputConfig
// ---------------------------------------------------------------------------

/// Where the generation prompt is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Whatever plain text is on the clipboard.
    #[default]
    Clipboard,
    /// The current selection, captured by simulating the copy shortcut.
    Selection,
}

/// Settings for the text source feeding the Start hotkey.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub source: InputSource,
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Telegram relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// `Some(false)` turns the relay off even with credentials present.
    /// Unset means on whenever both credentials are known, whether they come
    /// from this file or the environment.
    pub enabled: Option<bool>,
    /// Bot token; usually supplied through `TELEGRAM_BOT_TOKEN`.
    pub bot_token: Option<String>,
    /// Destination chat; usually supplied through `TELEGRAM_CHAT_ID`.
    pub chat_id: Option<String>,
    /// Identical messages within this window are sent only once.
    pub debounce_secs: f32,
    /// Messages longer than this are split (Telegram hard limit is 4096).
    pub max_message_len: usize,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Also send a short notice to the chat when a Start cycle fails.
    pub notify_errors: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            bot_token: None,
            chat_id: None,
            debounce_secs: 2.0,
            max_message_len: 4000,
            timeout_secs: 6,
            notify_errors: true,
        }
    }
}

impl RelayConfig {
    /// `true` when the relay is not switched off and both credentials are
    /// present.
    pub fn is_usable(&self) -> bool {
        self.enabled != Some(false) && self.has_credentials()
    }

    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.bot_token) && present(&self.chat_id)
    }
}

// ---------------------------------------------------------------------------
// ContextConfig
// ---------------------------------------------------------------------------

/// Settings for the rolling dialogue context sent with every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Number of previous task/answer pairs kept.  `0` disables context.
    pub window_size: usize,
    /// Estimated token count above which older exchanges are condensed
    /// into a summary by the language model.  `0` disables summaries.
    pub summary_threshold_tokens: usize,
    /// Minimum time between two summary requests.
    pub summary_interval_secs: u64,
    /// Exchanges kept verbatim after a summary.
    pub keep_recent: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            summary_threshold_tokens: 1500,
            summary_interval_secs: 60,
            keep_recent: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use autotypist::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Write it back, e.g. to create the file on first run
/// config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Language-model settings.
    pub llm: LlmConfig,
    /// Keystroke playback settings.
    pub typing: TypingConfig,
    /// Global hotkey bindings.
    pub hotkey: HotkeyConfig,
    /// Prompt source.
    pub input: InputConfig,
    /// Telegram relay settings.
    pub relay: RelayConfig,
    /// Rolling dialogue context settings.
    pub context: ContextConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`,
    /// then apply environment overrides.
    ///
    /// Returns defaults when the file does not exist yet (first-run
    /// scenario) so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&AppPaths::new().settings_file)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override secrets from the environment.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a closure over
    /// a fixed map.  Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("LLM_API_KEY").or_else(|| get("DEEPSEEK_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.relay.bot_token = Some(token);
        }
        if let Some(chat) = get("TELEGRAM_CHAT_ID") {
            self.relay.chat_id = Some(chat);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
