//! Prompt construction and answer clean-up.
//!
//! [`PromptBuilder`] produces the `(system_msg, user_msg)` pair sent to an
//! OpenAI-compatible chat endpoint.  In code-only mode the user message ends
//! with an instruction to return nothing but correctly indented code, and
//! [`strip_code_fences`] removes the markdown fences models add anyway.

use crate::llm::generator::trim_blank_lines;

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const SYSTEM_INSTRUCTION_CODE: &str = "\
You are a programming assistant whose answers are typed verbatim into an editor.
Rules:
1. Reply with ONLY the solution code.
2. No explanations, no comments, no markdown.
3. Use 4 spaces per indentation level and no trailing whitespace.";

const SYSTEM_INSTRUCTION_TEXT: &str = "\
You are an assistant whose answers are typed verbatim into a text field.
Reply with the answer only, without preamble or markdown.";

const CODE_ONLY_SUFFIX: &str = "\
Provide only the correct code solution without any comments, explanations or \
additional text. The code must be perfectly formatted with proper indentation \
(without extra spaces) and no typos. Return only the code.";

const SYSTEM_INSTRUCTION_SUMMARY: &str = "\
You condense earlier turns of a working session so they can be passed along \
as context for the next task.";

const SUMMARY_REQUEST: &str = "\
Summarise the dialogue below. Keep the important technical details (code, \
SQL, APIs, requirements) and keep the summary short.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds chat prompts for content generation.
///
/// # Example
/// ```rust
/// use autotypist::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new(true);
/// let (system, user) = builder.build_chat("Sum a list in Python", None);
/// assert!(system.contains("ONLY the solution code"));
/// assert!(user.starts_with("Sum a list in Python"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    code_only: bool,
}

impl PromptBuilder {
    pub fn new(code_only: bool) -> Self {
        Self { code_only }
    }

    /// Build a **(system_msg, user_msg)** pair.
    ///
    /// * `system_msg` — role instruction.
    /// * `user_msg` — the task, then the dialogue context (if any), then the
    ///   code-only instruction (in code-only mode).
    pub fn build_chat(&self, task: &str, context: Option<&str>) -> (String, String) {
        let system_msg = if self.code_only {
            SYSTEM_INSTRUCTION_CODE
        } else {
            SYSTEM_INSTRUCTION_TEXT
        }
        .to_string();

        let mut user_msg = String::with_capacity(task.len() + 512);
        user_msg.push_str(task.trim());
        if let Some(ctx) = context.filter(|c| !c.trim().is_empty()) {
            user_msg.push_str("\n\nContext from earlier tasks:\n");
            user_msg.push_str(ctx);
        }
        if self.code_only {
            user_msg.push_str("\n\n");
            user_msg.push_str(CODE_ONLY_SUFFIX);
        }

        (system_msg, user_msg)
    }

    /// Build the **(system_msg, user_msg)** pair asking for a summary of
    /// `dialogue`.  Independent of the code-only mode.
    pub fn build_summary(&self, dialogue: &str) -> (String, String) {
        let user_msg = format!(
            "{SUMMARY_REQUEST}\n\nDialogue:\n{}\n\nShort summary:",
            dialogue.trim()
        );
        (SYSTEM_INSTRUCTION_SUMMARY.to_string(), user_msg)
    }
}

// ---------------------------------------------------------------------------
// Answer clean-up
// ---------------------------------------------------------------------------

/// Remove markdown code-fence lines (```` ``` ```` with or without a
/// language tag) and the blank lines around the remaining text.
///
/// Indentation inside the code is preserved.
pub fn strip_code_fences(text: &str) -> String {
    let kept = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");
    trim_blank_lines(&kept).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_only_prompt_has_suffix() {
        let (system, user) = PromptBuilder::new(true).build_chat("  fizzbuzz  ", None);
        assert!(system.contains("ONLY the solution code"));
        assert!(user.starts_with("fizzbuzz\n\n"));
        assert!(user.ends_with("Return only the code."));
    }

    #[test]
    fn plain_prompt_is_just_the_task() {
        let (system, user) = PromptBuilder::new(false).build_chat("Summarise this", None);
        assert_eq!(system, SYSTEM_INSTRUCTION_TEXT);
        assert_eq!(user, "Summarise this");
    }

    #[test]
    fn context_is_embedded_between_task_and_suffix() {
        let (_, user) = PromptBuilder::new(true).build_chat("next", Some("Q: a\nA: b"));
        let ctx = user.find("Q: a").unwrap();
        assert!(user.find("next").unwrap() < ctx);
        assert!(ctx < user.find("Return only the code.").unwrap());
    }

    #[test]
    fn blank_context_is_ignored() {
        let (_, user) = PromptBuilder::new(false).build_chat("task", Some("  \n"));
        assert_eq!(user, "task");
    }

    #[test]
    fn summary_prompt_ignores_code_only_mode() {
        let (system, user) = PromptBuilder::new(true).build_summary("Q: a\nA: b\n");
        assert_eq!(system, SYSTEM_INSTRUCTION_SUMMARY);
        assert!(user.contains("Dialogue:\nQ: a\nA: b\n\nShort summary:"));
        assert!(!user.contains("Return only the code."));
    }

    #[test]
    fn fences_are_removed_and_indent_kept() {
        let answer = "```python\nfor i in range(3):\n    print(i)\n```\n";
        assert_eq!(strip_code_fences(answer), "for i in range(3):\n    print(i)");
    }

    #[test]
    fn unfenced_answer_is_untouched() {
        let answer = "def f():\n    return 1";
        assert_eq!(strip_code_fences(answer), answer);
    }

    #[test]
    fn fence_only_answer_becomes_empty() {
        assert_eq!(strip_code_fences("```\n```"), "");
    }
}
