//! Keyboard simulation backed by the `enigo` crate.
//!
//! [`EnigoSink`] types one [`Keystroke`] at a time into the focused window.
//! [`simulate_copy`] sends the OS-appropriate copy shortcut:
//!
//! | Platform | Shortcut |
//! |----------|----------|
//! | macOS    | ⌘C (Meta + C) |
//! | Windows  | Ctrl+C |
//! | Linux    | Ctrl+C |

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use super::{InjectError, KeySink, Keystroke, SinkFactory};

fn sim_err(e: impl std::fmt::Display) -> InjectError {
    InjectError::KeySimulation(e.to_string())
}

// ---------------------------------------------------------------------------
// EnigoSink
// ---------------------------------------------------------------------------

/// A [`KeySink`] that owns one `Enigo` connection for the lifetime of a job.
pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    /// Connect to the platform input backend.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::KeySimulation`] when no backend is reachable
    /// (e.g. no X display / no accessibility permission).
    pub fn new() -> Result<Self, InjectError> {
        let enigo = Enigo::new(&Settings::default()).map_err(sim_err)?;
        Ok(Self { enigo })
    }
}

impl KeySink for EnigoSink {
    fn emit(&mut self, key: Keystroke) -> Result<(), InjectError> {
        match key {
            // `text` handles shifted and non-ASCII characters on every
            // backend; a raw Unicode key click does not.
            Keystroke::Char(c) => {
                let mut buf = [0u8; 4];
                self.enigo.text(c.encode_utf8(&mut buf)).map_err(sim_err)
            }
            Keystroke::Enter => self.enigo.key(Key::Return, Direction::Click).map_err(sim_err),
            Keystroke::Tab => self.enigo.key(Key::Tab, Direction::Click).map_err(sim_err),
        }
    }
}

/// Opens an [`EnigoSink`] per typing job.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnigoSinkFactory;

impl SinkFactory for EnigoSinkFactory {
    fn open(&self) -> Result<Box<dyn KeySink>, InjectError> {
        Ok(Box::new(EnigoSink::new()?))
    }
}

// ---------------------------------------------------------------------------
// simulate_copy
// ---------------------------------------------------------------------------

/// Simulate the system copy shortcut in the currently focused window.
///
/// A new [`Enigo`] instance is created for each call because `Enigo` is not
/// `Send` and the handle is cheap to construct.
pub fn simulate_copy() -> Result<(), InjectError> {
    let mut enigo = Enigo::new(&Settings::default()).map_err(sim_err)?;

    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    enigo.key(modifier, Direction::Press).map_err(sim_err)?;
    let clicked = enigo.key(Key::Unicode('c'), Direction::Click).map_err(sim_err);
    // Always release the modifier, even if the click failed.
    enigo.key(modifier, Direction::Release).map_err(sim_err)?;
    clicked
}
