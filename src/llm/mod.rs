//! Language-model content generation.
//!
//! This module provides:
//! * [`ContentProvider`] — async trait implemented by all generator backends.
//! * [`ApiGenerator`] — OpenAI-compatible REST API generator (DeepSeek by
//!   default) with request pacing.
//! * [`PromptBuilder`] — builds code-only or plain chat prompts.
//! * [`strip_code_fences`] — removes markdown fences from answers.
//! * [`DialogueContext`] — rolling window of previous (task, answer) pairs,
//!   condensed into a model-written summary once it grows too large.
//! * [`LlmError`] — error variants for LLM operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use autotypist::config::AppConfig;
//! use autotypist::llm::{ApiGenerator, ContentProvider, DialogueContext};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::load().unwrap_or_default();
//!     let generator = ApiGenerator::from_config(&config.llm);
//!     let mut context = DialogueContext::from_config(&config.context);
//!
//!     let task = "Write a function that reverses a string";
//!     let answer = generator
//!         .generate(task, context.render().as_deref())
//!         .await
//!         .unwrap();
//!
//!     context.push(task, answer.clone());
//!     println!("{}", answer);
//! }
//! ```

pub mod context;
pub mod generator;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use context::{estimate_tokens, DialogueContext};
pub use generator::{ApiGenerator, ContentProvider, LlmError};
pub use prompt::{strip_code_fences, PromptBuilder};
