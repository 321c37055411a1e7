//! Text sources and keystroke sinks.
//!
//! # Overview
//!
//! Two narrow seams connect the core to the desktop:
//!
//! * [`TextSource`] — where the generation prompt comes from.
//!   [`ClipboardSource`] reads the clipboard as-is; [`SelectionSource`]
//!   simulates the copy shortcut first and only accepts text that actually
//!   changed.
//! * [`KeySink`] — where synthetic keystrokes go.  [`EnigoSink`] delivers
//!   them to whichever window currently has focus.  Sinks are opened through
//!   a [`SinkFactory`] on the thread that will use them, because `Enigo` is
//!   not `Send` on every platform.
//!
//! # Usage
//!
//! ```no_run
//! use autotypist::inject::{keystrokes, EnigoSinkFactory, SinkFactory};
//!
//! let mut sink = EnigoSinkFactory.open().expect("no input backend");
//! for key in keystrokes("print(1)\n") {
//!     sink.emit(key).expect("injection failed");
//! }
//! ```

pub mod clipboard;
pub mod keyboard;

pub use clipboard::{read_clipboard, ClipboardSource, SelectionSource};
pub use keyboard::{simulate_copy, EnigoSink, EnigoSinkFactory};

use thiserror::Error;

// ---------------------------------------------------------------------------
// InjectError
// ---------------------------------------------------------------------------

/// All errors that can surface while reading input or injecting keys.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Could not open or read the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// The clipboard holds no usable text.
    #[error("clipboard is empty")]
    EmptyInput,

    /// The copy shortcut did not put new text on the clipboard.
    #[error("nothing selected")]
    NoSelection,

    /// Could not initialise the keyboard backend or deliver a key event.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// Keystroke
// ---------------------------------------------------------------------------

/// One unit of synthetic keyboard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// A printable character, typed as text.
    Char(char),
    /// Line break.  Editors that auto-indent will add their own indentation.
    Enter,
    /// Horizontal tab key.
    Tab,
}

impl Keystroke {
    /// The character this keystroke produces in a plain text field.
    pub fn as_char(self) -> char {
        match self {
            Keystroke::Char(c) => c,
            Keystroke::Enter => '\n',
            Keystroke::Tab => '\t',
        }
    }
}

/// Convert text into the keystroke sequence that reproduces it.
///
/// `\n` becomes [`Keystroke::Enter`], `\t` becomes [`Keystroke::Tab`] and
/// carriage returns are dropped so `\r\n` input yields a single Enter.
pub fn keystrokes(text: &str) -> Vec<Keystroke> {
    text.chars()
        .filter(|&c| c != '\r')
        .map(|c| match c {
            '\n' => Keystroke::Enter,
            '\t' => Keystroke::Tab,
            other => Keystroke::Char(other),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Delivers keystrokes to the focused application, in order.
pub trait KeySink {
    fn emit(&mut self, key: Keystroke) -> Result<(), InjectError>;
}

/// Opens a [`KeySink`] on the calling thread.
pub trait SinkFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn KeySink>, InjectError>;
}

/// Supplies the text a generation is based on.
pub trait TextSource: Send + Sync {
    fn read_text(&self) -> Result<String, InjectError>;
}

// test-only doubles shared by the typing and pipeline test modules.
#[cfg(test)]
pub mod testing;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
