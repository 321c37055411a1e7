//! Orchestration: hotkey signals in, generations and typing jobs out.
//!
//! # Architecture
//!
//! ```text
//! ControlSignal (mpsc) ─────────────┐
//! JobReport (mpsc, from player) ────┤
//! pending generation (JoinHandle) ──┤
//! pending summary (JoinHandle) ─────┤
//!                                   ▼
//!                 Orchestrator::run()  ← tokio::select! loop
//!                                   │
//!    Start ─▶ abort pending, cancel job, spawn:
//!               spawn_blocking(TextSource::read_text)
//!               └─▶ ContentProvider::generate          [Generating]
//!             on answer: IndentStyle::apply
//!               └─▶ spawn_blocking(TypingPlayer::submit)  [Typing]
//!               └─▶ DialogueContext due? spawn ContentProvider::summarize
//!    TogglePause ─▶ TypingPlayer::toggle_pause          [Typing ⇄ Paused]
//!    Cancel ─▶ abort pending + TypingPlayer::cancel     [Cancelled]
//!    RelaySelection ─▶ spawn: read selection ─▶ Relay::send
//!    any failure ─▶ spawn: Relay::send(error notice)    [Error]
//!
//! SharedState (Arc<Mutex<AppState>>) ←── read by main / tests
//! ```
//!
//! Control signals keep being handled while a generation is in flight.

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{Orchestrator, Services};
pub use state::{new_shared_state, AppState, PipelineState, SharedState};

use thiserror::Error;

// ---------------------------------------------------------------------------
// AssistError
// ---------------------------------------------------------------------------

/// Failures of one Start cycle.
///
/// Each is logged, recorded in [`AppState::last_error`] and leaves no job
/// running.  Nothing is retried; the operator presses Start again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistError {
    /// The clipboard or selection held no usable text, or could not be read.
    #[error("input unavailable: {0}")]
    InputUnavailable(String),

    /// The language model failed, timed out or returned nothing usable.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// Keystrokes could not be delivered.
    #[error("injection failed: {0}")]
    InjectionFailure(String),
}
