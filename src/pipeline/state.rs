//! Session state machine and shared application state.
//!
//! [`PipelineState`] is the orchestrator's view of what the assistant is
//! doing.  [`AppState`] is the single record other threads (the binary's
//! status logging, tests) read through [`SharedState`].

use std::sync::{Arc, Mutex};

use crate::config::AppConfig;

use super::AssistError;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of one Start → type cycle.
///
/// ```text
/// Idle ──Start──▶ Generating ──answer──▶ Typing ◀──toggle──▶ Paused
///                    │                    │  │                  │
///                    │                    │  └──end of text──▶ Finished
///                    ├──Cancel────────────┴───────Cancel───────┴──▶ Cancelled
///                    └──input / generation / injection error──▶ Error
/// Finished / Cancelled / Error ──Start──▶ Generating
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Nothing has been started yet.
    #[default]
    Idle,

    /// Reading the prompt and waiting for the language model.
    Generating,

    /// The player is emitting the answer.
    Typing,

    /// Playback is suspended.
    Paused,

    /// The whole answer was typed.
    Finished,

    /// The operator cancelled generation or typing.
    Cancelled,

    /// The last cycle failed; see [`AppState::last_error`].
    Error,
}

impl PipelineState {
    /// `true` while a cycle is in progress.
    ///
    /// ```
    /// use autotypist::pipeline::PipelineState;
    ///
    /// assert!(PipelineState::Generating.is_busy());
    /// assert!(PipelineState::Paused.is_busy());
    /// assert!(!PipelineState::Finished.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PipelineState::Generating | PipelineState::Typing | PipelineState::Paused
        )
    }

    /// A short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Generating => "Generating",
            PipelineState::Typing => "Typing",
            PipelineState::Paused => "Paused",
            PipelineState::Finished => "Done",
            PipelineState::Cancelled => "Cancelled",
            PipelineState::Error => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state.
///
/// Held behind [`SharedState`].  Only the orchestrator mutates it.
pub struct AppState {
    /// Current phase of the Start cycle.
    pub pipeline: PipelineState,

    /// The most recent answer handed to the player.
    pub last_text: Option<String>,

    /// Why the last cycle failed.  Cleared when a new cycle starts.
    pub last_error: Option<AssistError>,

    /// Number of completed generations.
    pub generations: u64,

    /// Number of times the dialogue context was condensed.
    pub summaries: u64,

    /// Configuration the session was started with.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            pipeline: PipelineState::Idle,
            last_text: None,
            last_error: None,
            generations: 0,
            summaries: 0,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`AppState`].
///
/// Cheap to clone (`Arc` clone).  Keep critical sections short and never
/// hold the lock across `.await` points.
pub type SharedState = Arc<Mutex<AppState>>;

/// Construct a new [`SharedState`] wrapping a fresh [`AppState`].
pub fn new_shared_state(config: AppConfig) -> SharedState {
    Arc::new(Mutex::new(AppState::new(config)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
