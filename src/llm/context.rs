//! Rolling dialogue context for consecutive generations.
//!
//! [`DialogueContext`] keeps the last *N* (task, answer) pairs and renders
//! them into the `context` argument of
//! [`ContentProvider::generate`](crate::llm::ContentProvider::generate), so
//! follow-up tasks ("now make it recursive") can refer to earlier answers.
//!
//! # Summaries
//!
//! Once the estimated token count of the window passes a threshold, the
//! older exchanges are condensed by the language model:
//!
//! ```text
//! push ─▶ summary_due? ─▶ begin_summary() ─▶ ContentProvider::summarize
//!                                                   │
//!          render(): summary + recent Q/A  ◀── apply_summary()
//! ```
//!
//! Requests are spaced at least `summary_interval` apart, counted from the
//! previous request whether or not it succeeded.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::ContextConfig;

/// Entries longer than this are cut when rendered.
const MAX_ENTRY_CHARS: usize = 1_500;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Exchange {
    task: String,
    answer: String,
}

/// Rough token estimate: one per word plus one per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.split_whitespace().count() + text.chars().count() / 4
}

// ---------------------------------------------------------------------------
// DialogueContext
// ---------------------------------------------------------------------------

/// Maintains a rolling window of previous exchanges and an optional summary
/// of the ones before them.
///
/// # Example
/// ```rust
/// use autotypist::llm::DialogueContext;
///
/// let mut ctx = DialogueContext::new(4);
/// ctx.push("reverse a list", "xs[::-1]");
/// assert!(ctx.render().unwrap().contains("xs[::-1]"));
/// ```
#[derive(Debug, Clone)]
pub struct DialogueContext {
    exchanges: VecDeque<Exchange>,
    window_size: usize,
    summary: Option<String>,
    /// `0` disables summaries.
    summary_threshold: usize,
    summary_interval: Duration,
    keep_recent: usize,
    last_request: Option<Instant>,
    /// Total exchanges ever pushed.
    pushed: u64,
    /// `pushed` at the time of the outstanding summary request.
    requested_at: Option<u64>,
}

impl DialogueContext {
    /// Keep at most `window_size` exchanges, without summaries.  `0`
    /// disables the context.
    pub fn new(window_size: usize) -> Self {
        Self {
            exchanges: VecDeque::with_capacity(window_size),
            window_size,
            summary: None,
            summary_threshold: 0,
            summary_interval: Duration::ZERO,
            keep_recent: 0,
            last_request: None,
            pushed: 0,
            requested_at: None,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            summary_threshold: config.summary_threshold_tokens,
            summary_interval: Duration::from_secs(config.summary_interval_secs),
            keep_recent: config.keep_recent,
            ..Self::new(config.window_size)
        }
    }

    /// Record a finished exchange, dropping the oldest beyond the window.
    pub fn push(&mut self, task: impl Into<String>, answer: impl Into<String>) {
        if self.window_size == 0 {
            return;
        }
        self.exchanges.push_back(Exchange {
            task: task.into(),
            answer: answer.into(),
        });
        self.pushed += 1;
        while self.exchanges.len() > self.window_size {
            self.exchanges.pop_front();
        }
    }

    /// Estimated tokens of everything [`render`](Self::render) would emit.
    pub fn token_estimate(&self) -> usize {
        let summary = self.summary.as_deref().map_or(0, estimate_tokens);
        self.exchanges
            .iter()
            .map(|e| estimate_tokens(&e.task) + estimate_tokens(&e.answer))
            .sum::<usize>()
            + summary
    }

    /// `true` when the window is over budget, no request is outstanding and
    /// the interval since the previous request has passed.
    pub fn summary_due(&self, now: Instant) -> bool {
        self.summary_threshold > 0
            && self.requested_at.is_none()
            && self.exchanges.len() > self.keep_recent
            && self.token_estimate() > self.summary_threshold
            && self
                .last_request
                .map_or(true, |t| now.saturating_duration_since(t) >= self.summary_interval)
    }

    /// Start a summary round if one is due.  Returns the dialogue to hand to
    /// [`ContentProvider::summarize`](crate::llm::ContentProvider::summarize).
    pub fn begin_summary(&mut self, now: Instant) -> Option<String> {
        if !self.summary_due(now) {
            return None;
        }
        self.last_request = Some(now);
        self.requested_at = Some(self.pushed);

        let mut dialogue = String::new();
        if let Some(summary) = &self.summary {
            dialogue.push_str("Earlier summary:\n");
            dialogue.push_str(summary);
            dialogue.push_str("\n\n");
        }
        for exchange in &self.exchanges {
            push_exchange(&mut dialogue, exchange);
        }
        Some(dialogue)
    }

    /// Install the summary produced for the last
    /// [`begin_summary`](Self::begin_summary) round.
    ///
    /// Only the `keep_recent` newest exchanges stay verbatim, plus any that
    /// were pushed while the request was in flight.  A blank summary leaves
    /// the window as it is.
    pub fn apply_summary(&mut self, summary: &str) {
        let Some(mark) = self.requested_at.take() else {
            return;
        };
        let summary = summary.trim();
        if summary.is_empty() {
            return;
        }

        let fresh = usize::try_from(self.pushed - mark).unwrap_or(usize::MAX);
        let keep = self.keep_recent.max(fresh);
        while self.exchanges.len() > keep {
            self.exchanges.pop_front();
        }
        self.summary = Some(summary.to_string());
    }

    /// Forget the outstanding request after it failed.  The interval still
    /// applies before the next attempt.
    pub fn abandon_summary(&mut self) {
        self.requested_at = None;
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Render the summary (if any), then the window, oldest first.  `None`
    /// when both are empty.
    ///
    /// ```text
    /// Summary of earlier context:
    /// <summary>
    ///
    /// Q: <task>
    /// A: <answer>
    /// ```
    pub fn render(&self) -> Option<String> {
        if self.exchanges.is_empty() && self.summary.is_none() {
            return None;
        }

        let mut out = String::with_capacity(512);
        if let Some(summary) = &self.summary {
            out.push_str("Summary of earlier context:\n");
            out.push_str(summary);
            out.push_str("\n\n");
        }
        for exchange in &self.exchanges {
            push_exchange(&mut out, exchange);
        }
        Some(out)
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

impl Default for DialogueContext {
    fn default() -> Self {
        Self::from_config(&ContextConfig::default())
    }
}

fn push_exchange(out: &mut String, exchange: &Exchange) {
    out.push_str("Q: ");
    out.push_str(&clip(&exchange.task));
    out.push_str("\nA: ");
    out.push_str(&clip(&exchange.answer));
    out.push('\n');
}

fn clip(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_ENTRY_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn summarizing(threshold: usize, interval_secs: u64, keep_recent: usize) -> DialogueContext {
        DialogueContext::from_config(&ContextConfig {
            window_size: 8,
            summary_threshold_tokens: threshold,
            summary_interval_secs: interval_secs,
            keep_recent,
        })
    }

    #[test]
    fn starts_empty() {
        let ctx = DialogueContext::default();
        assert!(ctx.is_empty());
        assert_eq!(ctx.render(), None);
    }

    #[test]
    fn renders_oldest_first() {
        let mut ctx = DialogueContext::new(4);
        ctx.push("first", "1");
        ctx.push("second", "2");
        let out = ctx.render().unwrap();
        assert_eq!(out, "Q: first\nA: 1\nQ: second\nA: 2\n");
    }

    #[test]
    fn window_drops_oldest() {
        let mut ctx = DialogueContext::new(2);
        for i in 0..5 {
            ctx.push(format!("task{i}"), format!("answer{i}"));
        }
        assert_eq!(ctx.len(), 2);
        let out = ctx.render().unwrap();
        assert!(!out.contains("task2"));
        assert!(out.contains("task3"));
        assert!(out.contains("answer4"));
    }

    #[test]
    fn zero_window_keeps_nothing() {
        let mut ctx = DialogueContext::new(0);
        ctx.push("t", "a");
        assert!(ctx.is_empty());
    }

    #[test]
    fn long_entries_are_clipped() {
        let mut ctx = DialogueContext::new(1);
        ctx.push("ж".repeat(MAX_ENTRY_CHARS + 10), "ok");
        let out = ctx.render().unwrap();
        assert!(out.contains('…'));
        assert!(out.chars().filter(|&c| c == 'ж').count() == MAX_ENTRY_CHARS);
    }

    #[test]
    fn token_estimate_counts_words_and_chars() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd efgh"), 2 + 9 / 4);

        let mut ctx = DialogueContext::new(4);
        ctx.push("abcd", "efgh");
        assert_eq!(ctx.token_estimate(), 4);
    }

    #[test]
    fn summary_waits_for_threshold() {
        let now = Instant::now();
        let mut ctx = summarizing(1000, 0, 1);
        ctx.push("short", "task");
        ctx.push("another", "one");
        assert!(!ctx.summary_due(now));
        assert_eq!(ctx.begin_summary(now), None);
    }

    #[test]
    fn new_context_never_summarises() {
        let mut ctx = DialogueContext::new(4);
        ctx.push("word ".repeat(500), "answer");
        ctx.push("more", "text");
        assert!(!ctx.summary_due(Instant::now()));
    }

    #[test]
    fn summary_replaces_older_exchanges() {
        let now = Instant::now();
        let mut ctx = summarizing(5, 0, 1);
        ctx.push("first task", "first answer");
        ctx.push("second task", "second answer");

        let dialogue = ctx.begin_summary(now).expect("summary due");
        assert!(dialogue.contains("Q: first task\nA: first answer\n"));
        assert!(dialogue.contains("Q: second task"));

        ctx.apply_summary("  the operator asked two things  ");
        assert_eq!(ctx.summary(), Some("the operator asked two things"));
        assert_eq!(ctx.len(), 1);
        assert_eq!(
            ctx.render().unwrap(),
            "Summary of earlier context:\nthe operator asked two things\n\n\
             Q: second task\nA: second answer\n"
        );
    }

    #[test]
    fn exchanges_pushed_during_request_are_kept() {
        let now = Instant::now();
        let mut ctx = summarizing(5, 0, 1);
        ctx.push("one", "1 1 1 1");
        ctx.push("two", "2 2 2 2");
        ctx.begin_summary(now).expect("summary due");

        ctx.push("three", "3");
        ctx.push("four", "4");
        ctx.apply_summary("s");

        let out = ctx.render().unwrap();
        assert!(!out.contains("Q: two"));
        assert!(out.contains("Q: three"));
        assert!(out.contains("Q: four"));
    }

    #[test]
    fn requests_are_rate_limited() {
        let now = Instant::now();
        let mut ctx = summarizing(5, 60, 0);
        ctx.push("first task", "first answer");
        assert!(ctx.begin_summary(now).is_some());
        // Outstanding request blocks a second one.
        assert!(ctx.begin_summary(now).is_none());

        ctx.abandon_summary();
        ctx.push("second task", "second answer");
        assert!(ctx.begin_summary(now + Duration::from_secs(30)).is_none());
        assert!(ctx.begin_summary(now + Duration::from_secs(61)).is_some());
    }

    #[test]
    fn previous_summary_is_fed_back() {
        let now = Instant::now();
        let mut ctx = summarizing(5, 0, 0);
        ctx.push("first task", "first answer");
        ctx.begin_summary(now).expect("first round");
        ctx.apply_summary("older facts");
        assert!(ctx.is_empty());

        ctx.push("next task", "next answer");
        let dialogue = ctx.begin_summary(now).expect("second round");
        assert!(dialogue.starts_with("Earlier summary:\nolder facts\n\n"));
        assert!(dialogue.contains("Q: next task"));
    }

    #[test]
    fn blank_summary_is_ignored() {
        let now = Instant::now();
        let mut ctx = summarizing(5, 0, 0);
        ctx.push("first task", "first answer");
        ctx.begin_summary(now).expect("summary due");
        ctx.apply_summary("  \n");
        assert_eq!(ctx.summary(), None);
        assert_eq!(ctx.len(), 1);
    }
}
