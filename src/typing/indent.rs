//! Leading-whitespace handling for generated text.
//!
//! Keystrokes land in whatever editor has focus, and many editors indent on
//! Enter by themselves.  The player never tries to detect that; instead the
//! operator picks the strategy that matches the target:
//!
//! * [`IndentStyle::Verbatim`] types exactly what was generated.  In an
//!   auto-indenting editor nested lines end up over-indented.
//! * [`IndentStyle::Dedent`] strips the indentation common to all lines
//!   first (answers that arrive uniformly indented).
//! * [`IndentStyle::EditorManaged`] drops all leading whitespace after each
//!   line break and lets the editor supply it.  Dedents (closing a block)
//!   are then up to the editor and are usually wrong for Python.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentStyle {
    #[default]
    Verbatim,
    Dedent,
    EditorManaged,
}

impl IndentStyle {
    /// Rewrite `text` according to this strategy.
    pub fn apply(self, text: &str) -> String {
        match self {
            IndentStyle::Verbatim => text.to_string(),
            IndentStyle::Dedent => dedent(text),
            IndentStyle::EditorManaged => strip_continuation_indent(text),
        }
    }
}

fn is_indent(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|&c| is_indent(c)).count()
}

/// Remove the leading whitespace shared by every non-blank line.
///
/// Blank lines are emptied and do not take part in the minimum.  A trailing
/// line break is kept, so the final Enter is typed just as with
/// [`IndentStyle::Verbatim`].
pub fn dedent(text: &str) -> String {
    let common = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(indent_width)
        .min()
        .unwrap_or(0);

    let mut out = text
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                // Indent chars are single-byte, so `common` chars == bytes.
                &line[common..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Keep the first line as-is, strip leading whitespace from the rest.
pub fn strip_continuation_indent(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line
            } else {
                line.trim_start_matches(is_indent)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
