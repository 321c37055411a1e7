//! autotypist: a hotkey-driven assistant that sends the clipboard or the
//! current selection to a language model and types the answer back with
//! human-like pacing.
//!
//! The binary in `main.rs` wires these modules together; everything here is
//! usable (and tested) without a display or a network.

pub mod config;
pub mod hotkey;
pub mod inject;
pub mod llm;
pub mod pipeline;
pub mod relay;
pub mod typing;
