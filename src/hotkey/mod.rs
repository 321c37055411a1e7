//! Global hotkeys, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive.  It must run on a **dedicated OS thread**; it cannot be
//! used inside a tokio task.
//!
//! [`HotkeyListener::start`] spawns that thread and forwards
//! [`ControlSignal`]s over a `tokio::sync::mpsc` channel to the orchestrator.
//! Which physical key raises which signal is described by
//! [`HotkeyBindings`], built from the `[hotkey]` config section.
//!
//! Holding a key down makes the OS repeat `KeyPress` events.  [`KeyFilter`]
//! turns those into a single signal per physical press.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use autotypist::config::HotkeyConfig;
//! use autotypist::hotkey::{HotkeyBindings, HotkeyListener};
//!
//! let bindings = HotkeyBindings::from_config(&HotkeyConfig::default()).expect("bad key name");
//! let (tx, mut rx) = mpsc::channel(16);
//! let _listener = HotkeyListener::start(bindings, tx);
//!
//! // In your async loop:
//! // while let Some(signal) = rx.recv().await { ... }
//! ```

pub mod listener;

pub use listener::HotkeyListener;

use std::collections::HashSet;

use thiserror::Error;

use crate::config::HotkeyConfig;

// ---------------------------------------------------------------------------
// ControlSignal
// ---------------------------------------------------------------------------

/// Operator commands raised by the hotkey listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSignal {
    /// Read input, generate, type the answer.
    Start,
    /// Pause a running job or resume a paused one.
    TogglePause,
    /// Stop typing and abort any generation in flight.
    Cancel,
    /// Copy the selection and forward it to the relay.
    RelaySelection,
}

impl ControlSignal {
    pub fn label(self) -> &'static str {
        match self {
            ControlSignal::Start => "start",
            ControlSignal::TogglePause => "toggle-pause",
            ControlSignal::Cancel => "cancel",
            ControlSignal::RelaySelection => "relay",
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyBindings
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("unknown key name '{name}' for {action}")]
    UnknownKey { action: &'static str, name: String },

    #[error("key '{name}' is bound to both {first} and {second}")]
    Duplicate {
        name: String,
        first: &'static str,
        second: &'static str,
    },
}

/// Physical keys mapped to control signals.
#[derive(Debug, Clone, PartialEq)]
pub struct HotkeyBindings {
    pub start: rdev::Key,
    pub pause: rdev::Key,
    pub cancel: rdev::Key,
    /// `None` when the relay key is configured as an empty string.
    pub relay: Option<rdev::Key>,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            start: rdev::Key::F8,
            pause: rdev::Key::F9,
            cancel: rdev::Key::F10,
            relay: Some(rdev::Key::Insert),
        }
    }
}

impl HotkeyBindings {
    /// Resolve the key names of the `[hotkey]` section.
    ///
    /// # Errors
    ///
    /// Fails on unknown names and when two actions share a key.
    pub fn from_config(config: &HotkeyConfig) -> Result<Self, HotkeyError> {
        let resolve = |action: &'static str, name: &str| {
            parse_key(name).ok_or_else(|| HotkeyError::UnknownKey {
                action,
                name: name.to_string(),
            })
        };

        let bindings = Self {
            start: resolve("start", &config.start_key)?,
            pause: resolve("pause", &config.pause_key)?,
            cancel: resolve("cancel", &config.cancel_key)?,
            relay: match config.relay_key.trim() {
                "" => None,
                name => Some(resolve("relay", name)?),
            },
        };

        let named = [
            ("start", Some(bindings.start), config.start_key.as_str()),
            ("pause", Some(bindings.pause), config.pause_key.as_str()),
            ("cancel", Some(bindings.cancel), config.cancel_key.as_str()),
            ("relay", bindings.relay, config.relay_key.as_str()),
        ];
        for (i, (first, a, name)) in named.iter().enumerate() {
            for (second, b, _) in &named[i + 1..] {
                if a.is_some() && a == b {
                    return Err(HotkeyError::Duplicate {
                        name: name.to_string(),
                        first,
                        second,
                    });
                }
            }
        }

        Ok(bindings)
    }

    /// The signal bound to `key`, if any.
    pub fn signal_for(&self, key: rdev::Key) -> Option<ControlSignal> {
        if key == self.start {
            Some(ControlSignal::Start)
        } else if key == self.pause {
            Some(ControlSignal::TogglePause)
        } else if key == self.cancel {
            Some(ControlSignal::Cancel)
        } else if Some(key) == self.relay {
            Some(ControlSignal::RelaySelection)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// KeyFilter
// ---------------------------------------------------------------------------

/// Turns raw press/release events into one signal per physical press.
#[derive(Debug, Default)]
pub struct KeyFilter {
    held: HashSet<ControlSignal>,
}

impl KeyFilter {
    /// A key went down.  Returns the signal unless it is an auto-repeat.
    pub fn press(&mut self, signal: ControlSignal) -> Option<ControlSignal> {
        self.held.insert(signal).then_some(signal)
    }

    /// A key came up.
    pub fn release(&mut self, signal: ControlSignal) {
        self.held.remove(&signal);
    }
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Supports F1–F12, common named keys, and single uppercase or lowercase ASCII
/// letters.
///
/// Returns `None` for unrecognised names so callers can fall back to a default
/// or display an error to the user.
///
/// # Examples
///
/// ```
/// use autotypist::hotkey::parse_key;
///
/// assert_eq!(parse_key("F8"),      Some(rdev::Key::F8));
/// assert_eq!(parse_key("Insert"),  Some(rdev::Key::Insert));
/// assert_eq!(parse_key("a"),       Some(rdev::Key::KeyA));
/// assert_eq!(parse_key("xyz"),     None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    match key_str {
        // Function keys
        "F1" => Some(rdev::Key::F1),
        "F2" => Some(rdev::Key::F2),
        "F3" => Some(rdev::Key::F3),
        "F4" => Some(rdev::Key::F4),
        "F5" => Some(rdev::Key::F5),
        "F6" => Some(rdev::Key::F6),
        "F7" => Some(rdev::Key::F7),
        "F8" => Some(rdev::Key::F8),
        "F9" => Some(rdev::Key::F9),
        "F10" => Some(rdev::Key::F10),
        "F11" => Some(rdev::Key::F11),
        "F12" => Some(rdev::Key::F12),

        // Navigation / control
        "Escape" | "Esc" => Some(rdev::Key::Escape),
        "Insert" | "Ins" => Some(rdev::Key::Insert),
        "Delete" | "Del" => Some(rdev::Key::Delete),
        "Home" => Some(rdev::Key::Home),
        "End" => Some(rdev::Key::End),
        "PageUp" => Some(rdev::Key::PageUp),
        "PageDown" => Some(rdev::Key::PageDown),
        "UpArrow" | "Up" => Some(rdev::Key::UpArrow),
        "DownArrow" | "Down" => Some(rdev::Key::DownArrow),
        "LeftArrow" | "Left" => Some(rdev::Key::LeftArrow),
        "RightArrow" | "Right" => Some(rdev::Key::RightArrow),

        // Lock / special
        "CapsLock" => Some(rdev::Key::CapsLock),
        "NumLock" => Some(rdev::Key::NumLock),
        "ScrollLock" => Some(rdev::Key::ScrollLock),
        "PrintScreen" => Some(rdev::Key::PrintScreen),
        "Pause" => Some(rdev::Key::Pause),

        // Letter keys (case-insensitive)
        "A" | "a" => Some(rdev::Key::KeyA),
        "B" | "b" => Some(rdev::Key::KeyB),
        "C" | "c" => Some(rdev::Key::KeyC),
        "D" | "d" => Some(rdev::Key::KeyD),
        "E" | "e" => Some(rdev::Key::KeyE),
        "F" | "f" => Some(rdev::Key::KeyF),
        "G" | "g" => Some(rdev::Key::KeyG),
        "H" | "h" => Some(rdev::Key::KeyH),
        "I" | "i" => Some(rdev::Key::KeyI),
        "J" | "j" => Some(rdev::Key::KeyJ),
        "K" | "k" => Some(rdev::Key::KeyK),
        "L" | "l" => Some(rdev::Key::KeyL),
        "M" | "m" => Some(rdev::Key::KeyM),
        "N" | "n" => Some(rdev::Key::KeyN),
        "O" | "o" => Some(rdev::Key::KeyO),
        "P" | "p" => Some(rdev::Key::KeyP),
        "Q" | "q" => Some(rdev::Key::KeyQ),
        "R" | "r" => Some(rdev::Key::KeyR),
        "S" | "s" => Some(rdev::Key::KeyS),
        "T" | "t" => Some(rdev::Key::KeyT),
        "U" | "u" => Some(rdev::Key::KeyU),
        "V" | "v" => Some(rdev::Key::KeyV),
        "W" | "w" => Some(rdev::Key::KeyW),
        "X" | "x" => Some(rdev::Key::KeyX),
        "Y" | "y" => Some(rdev::Key::KeyY),
        "Z" | "z" => Some(rdev::Key::KeyZ),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
