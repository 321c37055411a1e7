//! Orchestrator: maps control signals onto generations and typing jobs.
//!
//! [`Orchestrator`] owns the [`SharedState`], the [`TypingPlayer`] and the
//! dialogue context, and responds to [`ControlSignal`]s received over a
//! `tokio::sync::mpsc` channel.
//!
//! # Flow
//!
//! ```text
//! Start
//!   └─▶ abort pending generation, cancel job         [Generating]
//!         └─▶ spawn: read_text → generate
//!               ├─ Err → record AssistError          [Error]
//!               └─ Ok  → indent, submit to player    [Typing]
//!                     └─▶ JobReport
//!                           ├─ Completed             [Finished]
//!                           ├─ Cancelled             [Cancelled]
//!                           └─ Failed                [Error]
//! ```
//!
//! After each typed answer the dialogue context may ask the provider for a
//! summary of older exchanges; that request runs beside the cycle and never
//! delays typing.  Failures are also sent through the relay when one is
//! configured.
//!
//! Blocking work (clipboard I/O, `TypingPlayer::submit`) is pushed onto
//! `tokio::task::spawn_blocking` so the signal loop never stalls.

use std::sync::{Arc, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

use crate::config::AppConfig;
use crate::hotkey::ControlSignal;
use crate::inject::{SinkFactory, TextSource};
use crate::llm::{ContentProvider, DialogueContext, LlmError};
use crate::relay::{Relay, RelayOutcome};
use crate::typing::{
    IndentStyle, JobOutcome, JobReport, PlaybackState, PlayerError, PlayerOptions, TypingPlayer,
};

use super::state::{AppState, PipelineState, SharedState};
use super::AssistError;

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// The external seams an [`Orchestrator`] drives.
pub struct Services {
    /// Where the Start prompt comes from.
    pub source: Arc<dyn TextSource>,
    /// Turns the prompt into text to type.
    pub provider: Arc<dyn ContentProvider>,
    /// Opens the keystroke sink for each typing job.
    pub sinks: Arc<dyn SinkFactory>,
    /// `None` disables the relay hotkey.
    pub relay: Option<Arc<dyn Relay>>,
    /// Where relayed text comes from (normally the selection).
    pub relay_source: Arc<dyn TextSource>,
}

struct Generated {
    task: String,
    answer: String,
}

type PendingGeneration = JoinHandle<Result<Generated, AssistError>>;
type PendingSummary = JoinHandle<Result<String, LlmError>>;

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives the Start → generate → type cycle.
///
/// Create with [`Orchestrator::new`], then call [`run`](Self::run) inside a
/// tokio task.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use autotypist::config::AppConfig;
/// use autotypist::inject::{ClipboardSource, EnigoSinkFactory, SelectionSource};
/// use autotypist::llm::ApiGenerator;
/// use autotypist::pipeline::{new_shared_state, Orchestrator, Services};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let services = Services {
///     source: Arc::new(ClipboardSource),
///     provider: Arc::new(ApiGenerator::from_config(&config.llm)),
///     sinks: Arc::new(EnigoSinkFactory),
///     relay: None,
///     relay_source: Arc::new(SelectionSource::default()),
/// };
/// let state = new_shared_state(config.clone());
///
/// let (signal_tx, signal_rx) = tokio::sync::mpsc::channel(16);
/// let orchestrator = Orchestrator::new(&config, state, services);
/// orchestrator.run(signal_rx).await;
/// # }
/// ```
pub struct Orchestrator {
    state: SharedState,
    player: TypingPlayer,
    reports: mpsc::UnboundedReceiver<JobReport>,
    source: Arc<dyn TextSource>,
    provider: Arc<dyn ContentProvider>,
    relay: Option<Arc<dyn Relay>>,
    relay_source: Arc<dyn TextSource>,
    indent: IndentStyle,
    context: DialogueContext,
    pending: Option<PendingGeneration>,
    summary: Option<PendingSummary>,
    /// Generation of the player job started by the current cycle.
    job: Option<u64>,
    notify_errors: bool,
    relay_tasks: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn new(config: &AppConfig, state: SharedState, services: Services) -> Self {
        let (report_tx, reports) = mpsc::unbounded_channel();
        let player = TypingPlayer::new(services.sinks, PlayerOptions::from_config(&config.typing))
            .with_reports(report_tx);

        Self {
            state,
            player,
            reports,
            source: services.source,
            provider: services.provider,
            relay: services.relay,
            relay_source: services.relay_source,
            indent: config.typing.indent,
            context: DialogueContext::from_config(&config.context),
            pending: None,
            summary: None,
            job: None,
            notify_errors: config.relay.notify_errors,
            relay_tasks: Vec::new(),
        }
    }

    /// A control handle to the player this orchestrator drives.
    pub fn player(&self) -> TypingPlayer {
        self.player.clone()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `signals` is closed, then cancel whatever is in progress.
    pub async fn run(mut self, mut signals: mpsc::Receiver<ControlSignal>) {
        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(signal) => self.handle_signal(signal),
                    None => break,
                },
                joined = join_pending(&mut self.pending), if self.pending.is_some() => {
                    self.pending = None;
                    self.finish_generation(joined).await;
                }
                summarized = join_pending(&mut self.summary), if self.summary.is_some() => {
                    self.summary = None;
                    self.finish_summary(summarized);
                }
                Some(report) = self.reports.recv() => self.handle_report(report),
            }
        }

        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        if let Some(summary) = self.summary.take() {
            summary.abort();
        }
        self.player.cancel();
        for task in self.relay_tasks.drain(..) {
            let _ = task.await;
        }
        log::info!("pipeline: signal channel closed, orchestrator shutting down");
    }

    // -----------------------------------------------------------------------
    // Signal handlers
    // -----------------------------------------------------------------------

    fn handle_signal(&mut self, signal: ControlSignal) {
        log::debug!("pipeline: signal {}", signal.label());
        match signal {
            ControlSignal::Start => self.start(),
            ControlSignal::TogglePause => self.toggle_pause(),
            ControlSignal::Cancel => self.cancel(),
            ControlSignal::RelaySelection => self.relay_selection(),
        }
    }

    /// Abandon whatever the previous cycle was doing and begin a new one.
    fn start(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
            log::info!("pipeline: pending generation replaced");
        }
        self.player.cancel();
        self.job = None;

        self.update(|st| {
            st.pipeline = PipelineState::Generating;
            st.last_error = None;
        });

        let source = Arc::clone(&self.source);
        let provider = Arc::clone(&self.provider);
        let context = self.context.render();
        self.pending = Some(tokio::spawn(generate(source, provider, context)));
    }

    fn toggle_pause(&mut self) {
        if self.job.is_none() {
            log::debug!("pipeline: nothing to pause");
            return;
        }
        match self.player.toggle_pause() {
            PlaybackState::Paused => self.update(|st| st.pipeline = PipelineState::Paused),
            PlaybackState::Running => self.update(|st| st.pipeline = PipelineState::Typing),
            other => log::debug!("pipeline: toggle ignored, job is {}", other.label()),
        }
    }

    fn cancel(&mut self) {
        let aborted = match self.pending.take() {
            Some(pending) => {
                pending.abort();
                true
            }
            None => false,
        };
        let stopped = self.player.cancel();

        if aborted || stopped {
            log::info!(
                "pipeline: cancelled ({})",
                if aborted { "generation" } else { "typing" }
            );
            self.update(|st| st.pipeline = PipelineState::Cancelled);
        } else {
            log::debug!("pipeline: nothing to cancel");
        }
    }

    fn relay_selection(&mut self) {
        self.relay_tasks.retain(|task| !task.is_finished());

        let Some(relay) = self.relay.clone() else {
            log::warn!("relay: not configured, ignoring hotkey");
            return;
        };
        let source = Arc::clone(&self.relay_source);

        self.relay_tasks.push(tokio::spawn(async move {
            let text = match tokio::task::spawn_blocking(move || source.read_text()).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    log::warn!("relay: {e}");
                    return;
                }
                Err(e) => {
                    log::error!("relay: selection task failed: {e}");
                    return;
                }
            };

            match relay.send(&text).await {
                Ok(RelayOutcome::Sent(parts)) => log::info!("relay: delivered ({parts} part(s))"),
                Ok(RelayOutcome::Duplicate) => log::info!("relay: duplicate within window, skipped"),
                Ok(RelayOutcome::Empty) => log::info!("relay: nothing printable to send"),
                Err(e) => log::error!("relay: {e}"),
            }
        }));
    }

    // -----------------------------------------------------------------------
    // Completion handlers
    // -----------------------------------------------------------------------

    async fn finish_generation(&mut self, joined: Result<Result<Generated, AssistError>, JoinError>) {
        let Generated { task, answer } = match joined {
            Ok(Ok(generated)) => generated,
            Ok(Err(e)) => return self.fail(e),
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                return self.fail(AssistError::GenerationFailure(format!(
                    "generation task failed: {e}"
                )))
            }
        };

        let text = self.indent.apply(&answer);
        let player = self.player.clone();
        let to_type = text.clone();
        let submitted = tokio::task::spawn_blocking(move || player.submit(&to_type)).await;

        match submitted {
            Ok(Ok(job)) => {
                self.job = Some(job);
                self.context.push(task, answer);
                self.maybe_summarize();
                log::info!(
                    "pipeline: typing {} chars (job #{job})",
                    text.chars().count()
                );
                self.update(|st| {
                    st.pipeline = PipelineState::Typing;
                    st.last_text = Some(text);
                    st.generations += 1;
                });
            }
            Ok(Err(PlayerError::EmptyJob)) => self.fail(AssistError::GenerationFailure(
                "answer has nothing to type".into(),
            )),
            Ok(Err(PlayerError::Superseded(job))) => {
                log::info!("pipeline: job #{job} was replaced through another player handle");
            }
            Ok(Err(e)) => self.fail(AssistError::InjectionFailure(e.to_string())),
            Err(e) => self.fail(AssistError::InjectionFailure(e.to_string())),
        }
    }

    /// Ask the provider to condense the dialogue when the context is due.
    fn maybe_summarize(&mut self) {
        if self.summary.is_some() {
            return;
        }
        let Some(dialogue) = self.context.begin_summary(Instant::now()) else {
            return;
        };
        log::info!(
            "pipeline: summarising {} earlier exchange(s)",
            self.context.len()
        );
        let provider = Arc::clone(&self.provider);
        self.summary = Some(tokio::spawn(async move {
            provider.summarize(&dialogue).await
        }));
    }

    fn finish_summary(&mut self, joined: Result<Result<String, LlmError>, JoinError>) {
        match joined {
            Ok(Ok(summary)) => {
                self.context.apply_summary(&summary);
                log::info!(
                    "pipeline: context summarised ({} chars, {} exchange(s) kept)",
                    summary.chars().count(),
                    self.context.len()
                );
                self.update(|st| st.summaries += 1);
            }
            Ok(Err(e)) => {
                log::warn!("pipeline: summary failed: {e}");
                self.context.abandon_summary();
            }
            Err(e) => {
                if !e.is_cancelled() {
                    log::error!("pipeline: summary task failed: {e}");
                }
                self.context.abandon_summary();
            }
        }
    }

    fn handle_report(&mut self, report: JobReport) {
        if self.job != Some(report.generation) {
            log::debug!("pipeline: stale report for job #{}", report.generation);
            return;
        }
        self.job = None;

        match report.outcome {
            JobOutcome::Completed => {
                log::info!("pipeline: typed {} keystrokes", report.typed);
                self.update(|st| st.pipeline = PipelineState::Finished);
            }
            JobOutcome::Cancelled => {
                self.update(|st| st.pipeline = PipelineState::Cancelled);
            }
            JobOutcome::Failed(msg) => self.fail(AssistError::InjectionFailure(msg)),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn update(&self, f: impl FnOnce(&mut AppState)) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut st);
    }

    fn fail(&mut self, error: AssistError) {
        log::error!("pipeline error: {error}");
        self.notify(&error);
        self.update(|st| {
            st.pipeline = PipelineState::Error;
            st.last_error = Some(error);
        });
    }

    /// Forward a short notice about `error` through the relay, if any.
    fn notify(&mut self, error: &AssistError) {
        if !self.notify_errors {
            return;
        }
        let Some(relay) = self.relay.clone() else {
            return;
        };
        self.relay_tasks.retain(|task| !task.is_finished());

        let notice = error_notice(error);
        self.relay_tasks.push(tokio::spawn(async move {
            if let Err(e) = relay.send(&notice).await {
                log::warn!("relay: error notice not delivered: {e}");
            }
        }));
    }
}

/// Operator-facing text for a failed cycle.
fn error_notice(error: &AssistError) -> String {
    match error {
        AssistError::GenerationFailure(msg) if msg.contains("returned 429") => {
            "⚠️ Quota exceeded (429): the API rate limit was hit. Try again in a minute.".into()
        }
        other => format!("⚠️ autotypist: {other}"),
    }
}

/// Read the prompt and ask the provider for an answer.
async fn generate(
    source: Arc<dyn TextSource>,
    provider: Arc<dyn ContentProvider>,
    context: Option<String>,
) -> Result<Generated, AssistError> {
    let task = tokio::task::spawn_blocking(move || source.read_text())
        .await
        .map_err(|e| AssistError::InputUnavailable(e.to_string()))?
        .map_err(|e| AssistError::InputUnavailable(e.to_string()))?;
    log::info!("pipeline: task read ({} chars)", task.chars().count());
    log::debug!("pipeline: task = {:?}", task);

    let answer = provider
        .generate(&task, context.as_deref())
        .await
        .map_err(|e| AssistError::GenerationFailure(e.to_string()))?;

    Ok(Generated { task, answer })
}

/// Await a pending task; never resolves when there is none.
async fn join_pending<T>(pending: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
