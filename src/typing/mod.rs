//! Human-paced keystroke playback.
//!
//! # Architecture
//!
//! ```text
//!  control path (any thread)              job thread (one per job)
//!  ─────────────────────────              ────────────────────────
//!  submit / toggle_pause / cancel         checkpoint ─▶ emit ─▶ advance ─▶ pace
//!            │                                 ▲                            │
//!            ▼                                 └────────────────────────────┘
//!     Mutex<PlayerInner> + Condvar  ◀── shared, compared by generation ──▶
//! ```
//!
//! * [`TypingPlayer`] — cloneable control handle; owns the shared state.
//! * [`Cadence`] / [`sample_delay`] — seedable inter-keystroke delay sampler.
//! * [`IndentStyle`] — how leading whitespace of generated lines is typed.
//! * [`PlaybackState`] — `Idle`, `Running`, `Paused`, `Cancelled`, `Completed`.

pub mod cadence;
pub mod indent;
pub mod player;
pub mod state;

pub use cadence::{sample_delay, Cadence, CadenceProfile};
pub use indent::IndentStyle;
pub use player::{JobOutcome, JobReport, PlayerError, PlayerOptions, TypingPlayer};
pub use state::{PlaybackState, Progress};
