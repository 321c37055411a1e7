//! Clipboard-backed text sources using the `arboard` crate.
//!
//! Every read creates a short-lived [`arboard::Clipboard`] handle rather than
//! sharing one across calls, because `arboard::Clipboard` is not `Send` on
//! all platforms and the handle is cheap to create.

use std::time::Duration;

use arboard::Clipboard;

use super::{simulate_copy, InjectError, TextSource};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read the current clipboard plain-text content.
///
/// Returns `Ok(None)` when the clipboard is empty or holds non-text data
/// (e.g. an image).
///
/// # Errors
///
/// Returns [`InjectError::ClipboardAccess`] if the OS clipboard cannot be
/// opened.
pub fn read_clipboard() -> Result<Option<String>, InjectError> {
    let mut clipboard = open_clipboard()?;
    // `get_text` returns Err if empty or non-text — treat both as None
    Ok(clipboard.get_text().ok())
}

/// Reads whatever text is on the clipboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipboardSource;

impl TextSource for ClipboardSource {
    fn read_text(&self) -> Result<String, InjectError> {
        non_blank(read_clipboard()?).ok_or(InjectError::EmptyInput)
    }
}

/// Captures the current selection by simulating the copy shortcut.
///
/// The clipboard is sampled before and after the shortcut; text is only
/// accepted when it changed, so a stale clipboard is never mistaken for a
/// fresh selection.
#[derive(Debug, Clone)]
pub struct SelectionSource {
    /// How long to wait for the target application to update the clipboard.
    pub settle: Duration,
}

impl Default for SelectionSource {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(150),
        }
    }
}

impl TextSource for SelectionSource {
    fn read_text(&self) -> Result<String, InjectError> {
        let before = read_clipboard()?;
        simulate_copy()?;
        std::thread::sleep(self.settle);
        let after = read_clipboard()?;
        fresh_selection(before, after)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Open an `arboard::Clipboard` handle, mapping the error to [`InjectError`].
fn open_clipboard() -> Result<Clipboard, InjectError> {
    Clipboard::new().map_err(|e| InjectError::ClipboardAccess(e.to_string()))
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

fn fresh_selection(before: Option<String>, after: Option<String>) -> Result<String, InjectError> {
    match non_blank(after) {
        Some(text) if before.as_deref() != Some(text.as_str()) => Ok(text),
        _ => Err(InjectError::NoSelection),
    }
}
