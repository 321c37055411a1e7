//! The typing player: one job at a time, pausable, cancellable.
//!
//! [`TypingPlayer`] is a cheap-to-clone handle around a single
//! `Mutex<PlayerInner>` + `Condvar` pair.  Control calls (`submit`,
//! `toggle_pause`, `cancel`) only flip state under the lock and notify; the
//! job thread does all the emitting and re-reads the state at every
//! checkpoint.
//!
//! # Job isolation
//!
//! Every `submit` bumps a generation counter.  A job thread compares its own
//! generation at each checkpoint and exits as soon as it differs, and
//! `submit` waits for the previous thread's exit acknowledgement (`live`)
//! before spawning the next one.  A keystroke of the old job can therefore
//! never follow the first keystroke of the new job.
//!
//! # Pacing
//!
//! Inter-keystroke delays are waited on the condition variable, so a pause or
//! cancel wakes the job immediately instead of after the delay elapses.
//! While paused the job thread blocks on the condition variable without
//! spinning.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::TypingConfig;
use crate::inject::{keystrokes, KeySink, Keystroke, SinkFactory};

use super::cadence::{Cadence, CadenceProfile};
use super::state::{PlaybackState, Progress};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Errors returned by [`TypingPlayer::submit`].
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The text produced no keystrokes.
    #[error("nothing to type")]
    EmptyJob,

    /// The OS refused to create the job thread.
    #[error("cannot spawn typing thread: {0}")]
    Spawn(String),

    /// Another `submit` on the same player took over before this job's
    /// thread could start.  Nothing was typed for it.
    #[error("job #{0} superseded before it started")]
    Superseded(u64),
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
    /// The key sink failed; the job was aborted without retrying.
    Failed(String),
}

/// Sent once per job when its thread exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub generation: u64,
    pub outcome: JobOutcome,
    /// Keystrokes emitted before the job ended.
    pub typed: usize,
}

/// Tuning for a [`TypingPlayer`].
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub cadence: CadenceProfile,
    pub seed: Option<u64>,
    /// Wait before the first keystroke of every job.
    pub start_delay: Duration,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self::from_config(&TypingConfig::default())
    }
}

impl PlayerOptions {
    pub fn from_config(config: &TypingConfig) -> Self {
        Self {
            cadence: config.cadence.clone(),
            seed: config.seed,
            start_delay: Duration::from_millis(config.start_delay_ms),
        }
    }

    /// Zero delays everywhere.
    pub fn instant() -> Self {
        Self {
            cadence: CadenceProfile::instant(),
            seed: Some(0),
            start_delay: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PlayerInner {
    generation: u64,
    state: PlaybackState,
    cursor: usize,
    len: usize,
    /// Generation whose thread has not acknowledged exit yet.
    live: Option<u64>,
    last_error: Option<String>,
}

#[derive(Default)]
struct PlayerShared {
    inner: Mutex<PlayerInner>,
    changed: Condvar,
}

impl PlayerShared {
    fn lock(&self) -> MutexGuard<'_, PlayerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, PlayerInner>) -> MutexGuard<'a, PlayerInner> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// TypingPlayer
// ---------------------------------------------------------------------------

/// Replays text as human-paced synthetic keystrokes.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use autotypist::inject::EnigoSinkFactory;
/// use autotypist::typing::{PlayerOptions, TypingPlayer};
///
/// let player = TypingPlayer::new(Arc::new(EnigoSinkFactory), PlayerOptions::default());
/// player.submit("print('hi')").unwrap();
/// player.toggle_pause(); // pause
/// player.toggle_pause(); // resume
/// player.wait(Duration::from_secs(30));
/// ```
#[derive(Clone)]
pub struct TypingPlayer {
    shared: Arc<PlayerShared>,
    sinks: Arc<dyn SinkFactory>,
    options: Arc<PlayerOptions>,
    reports: Option<mpsc::UnboundedSender<JobReport>>,
}

impl TypingPlayer {
    pub fn new(sinks: Arc<dyn SinkFactory>, options: PlayerOptions) -> Self {
        Self {
            shared: Arc::new(PlayerShared::default()),
            sinks,
            options: Arc::new(options),
            reports: None,
        }
    }

    /// Deliver a [`JobReport`] on `tx` whenever a job thread exits.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<JobReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Start typing `text`, replacing any running or paused job.
    ///
    /// Blocks only until the replaced job's thread has exited (at most one
    /// in-flight keystroke); playback itself runs on a new thread.  Returns
    /// the job's generation number.
    ///
    /// When a later `submit` from another handle bumps the generation while
    /// this one is still waiting, this call returns
    /// [`PlayerError::Superseded`] right away.
    pub fn submit(&self, text: &str) -> Result<u64, PlayerError> {
        let keys = keystrokes(text);
        if keys.is_empty() {
            return Err(PlayerError::EmptyJob);
        }

        let mut inner = self.shared.lock();
        if inner.state.is_active() {
            log::info!(
                "typing: job #{} {} → cancelled (replaced)",
                inner.generation,
                inner.state.label()
            );
            inner.state = PlaybackState::Cancelled;
        }
        inner.generation += 1;
        let generation = inner.generation;
        self.shared.changed.notify_all();

        while inner.live.is_some() && inner.generation == generation {
            inner = self.shared.wait(inner);
        }
        if inner.generation != generation {
            log::debug!("typing: job #{generation} superseded before start");
            return Err(PlayerError::Superseded(generation));
        }

        inner.state = PlaybackState::Running;
        inner.cursor = 0;
        inner.len = keys.len();
        inner.live = Some(generation);
        inner.last_error = None;
        drop(inner);

        let job = Job {
            generation,
            keys,
            shared: Arc::clone(&self.shared),
            sinks: Arc::clone(&self.sinks),
            options: Arc::clone(&self.options),
            reports: self.reports.clone(),
        };
        let len = job.keys.len();

        let spawned = thread::Builder::new()
            .name(format!("typing-job-{generation}"))
            .spawn(move || job.run());

        if let Err(e) = spawned {
            let mut inner = self.shared.lock();
            if inner.live == Some(generation) {
                inner.live = None;
                inner.state = PlaybackState::Cancelled;
                inner.last_error = Some(e.to_string());
            }
            self.shared.changed.notify_all();
            return Err(PlayerError::Spawn(e.to_string()));
        }

        log::info!("typing: job #{generation} started ({len} keystrokes)");
        Ok(generation)
    }

    /// Running ⇄ Paused.  No-op in any other state.  Returns the state after
    /// the call.
    pub fn toggle_pause(&self) -> PlaybackState {
        let mut inner = self.shared.lock();
        let next = match inner.state {
            PlaybackState::Running => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Running,
            other => return other,
        };
        inner.state = next;
        let progress = Progress {
            cursor: inner.cursor,
            len: inner.len,
        };
        log::info!(
            "typing: job #{} {} at {}/{} ({} left)",
            inner.generation,
            next.label(),
            progress.cursor,
            progress.len,
            progress.remaining()
        );
        self.shared.changed.notify_all();
        next
    }

    /// Cancel the running or paused job.  Idempotent; returns `true` only
    /// when a job was actually cancelled by this call.
    pub fn cancel(&self) -> bool {
        let mut inner = self.shared.lock();
        if !inner.state.is_active() {
            return false;
        }
        inner.state = PlaybackState::Cancelled;
        log::info!(
            "typing: job #{} cancelled at {}/{}",
            inner.generation,
            inner.cursor,
            inner.len
        );
        self.shared.changed.notify_all();
        true
    }

    /// Block until no job is active and its thread has exited, or until
    /// `timeout` elapses.  Returns the state observed last.
    pub fn wait(&self, timeout: Duration) -> PlaybackState {
        let inner = self.shared.lock();
        let (inner, _) = self
            .shared
            .changed
            .wait_timeout_while(inner, timeout, |i| i.state.is_active() || i.live.is_some())
            .unwrap_or_else(PoisonError::into_inner);
        inner.state
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.shared.lock().state
    }

    pub fn cursor(&self) -> usize {
        self.shared.lock().cursor
    }

    pub fn progress(&self) -> Progress {
        let inner = self.shared.lock();
        Progress {
            cursor: inner.cursor,
            len: inner.len,
        }
    }

    /// Generation of the most recently submitted job (0 before any).
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Why the last job was aborted, if it was.
    pub fn last_error(&self) -> Option<String> {
        self.shared.lock().last_error.clone()
    }
}

// ---------------------------------------------------------------------------
// Job thread
// ---------------------------------------------------------------------------

enum Exit {
    Completed,
    /// Cancelled, or superseded by a newer generation.
    Stopped,
    Failed(String),
}

struct Job {
    generation: u64,
    keys: Vec<Keystroke>,
    shared: Arc<PlayerShared>,
    sinks: Arc<dyn SinkFactory>,
    options: Arc<PlayerOptions>,
    reports: Option<mpsc::UnboundedSender<JobReport>>,
}

impl Job {
    fn run(self) {
        let exit = self.play();

        let mut inner = self.shared.lock();
        let current = inner.generation == self.generation;
        let outcome = match exit {
            Exit::Completed if current && inner.state.is_active() => {
                inner.state = PlaybackState::Completed;
                JobOutcome::Completed
            }
            Exit::Failed(msg) => {
                log::error!(
                    "typing: job #{} aborted at {}/{}: {msg}",
                    self.generation,
                    inner.cursor,
                    inner.len
                );
                if current {
                    inner.state = PlaybackState::Cancelled;
                    inner.last_error = Some(msg.clone());
                }
                JobOutcome::Failed(msg)
            }
            _ => JobOutcome::Cancelled,
        };
        let typed = if current { inner.cursor } else { 0 };
        if inner.live == Some(self.generation) {
            inner.live = None;
        }

        log::debug!(
            "typing: job #{} exited ({:?}, {typed} typed)",
            self.generation,
            outcome
        );
        if let Some(tx) = &self.reports {
            // Sent before waking waiters so anyone returning from `wait` can
            // already find the report queued.
            let _ = tx.send(JobReport {
                generation: self.generation,
                outcome,
                typed,
            });
        }
        self.shared.changed.notify_all();
    }

    fn play(&self) -> Exit {
        let mut sink: Box<dyn KeySink> = match self.sinks.open() {
            Ok(sink) => sink,
            Err(e) => return Exit::Failed(e.to_string()),
        };
        let mut cadence = Cadence::new(self.options.cadence.clone(), self.options.seed);

        self.pace(self.options.start_delay);

        loop {
            let Some(index) = self.checkpoint() else {
                return Exit::Stopped;
            };
            let Some(&key) = self.keys.get(index) else {
                return Exit::Completed;
            };

            if let Err(e) = sink.emit(key) {
                return Exit::Failed(e.to_string());
            }

            {
                let mut inner = self.shared.lock();
                if inner.generation != self.generation {
                    return Exit::Stopped;
                }
                inner.cursor = index + 1;
                if inner.cursor >= self.keys.len() {
                    return Exit::Completed;
                }
            }

            self.pace(cadence.next_delay(key));
        }
    }

    /// Re-read the control state.  Blocks while paused; returns the cursor
    /// when running and `None` when the job must stop.
    fn checkpoint(&self) -> Option<usize> {
        let mut inner = self.shared.lock();
        loop {
            if inner.generation != self.generation {
                return None;
            }
            match inner.state {
                PlaybackState::Running => return Some(inner.cursor),
                PlaybackState::Paused => inner = self.shared.wait(inner),
                _ => return None,
            }
        }
    }

    /// Sleep for `delay` unless the job stops running first.
    fn pace(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let inner = self.shared.lock();
        let _ = self.shared.changed.wait_timeout_while(inner, delay, |i| {
            i.generation == self.generation && i.state == PlaybackState::Running
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::testing::RecordingSinkFactory;
    use std::sync::mpsc as std_mpsc;
    use std::sync::OnceLock;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn player_with(sinks: &RecordingSinkFactory, options: PlayerOptions) -> TypingPlayer {
        TypingPlayer::new(Arc::new(sinks.clone()), options)
    }

    fn fixed(ms: u64) -> PlayerOptions {
        PlayerOptions {
            cadence: CadenceProfile::fixed(Duration::from_millis(ms)),
            seed: Some(0),
            start_delay: Duration::ZERO,
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + WAIT;
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    // ---- completion ---

    #[test]
    fn full_run_emits_every_char_once_in_order() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, PlayerOptions::instant());
        let text = "Hello, world.\n\tBye!";

        player.submit(text).unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Completed);
        assert_eq!(sinks.text(), text);
        let progress = player.progress();
        assert_eq!(progress.cursor, progress.len);
        assert_eq!(progress.len, keystrokes(text).len());
        assert!(player.last_error().is_none());
    }

    #[test]
    fn newline_is_emitted_as_enter() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, PlayerOptions::instant());

        player.submit("a\nb").unwrap();
        player.wait(WAIT);

        assert_eq!(
            sinks.keys(),
            vec![Keystroke::Char('a'), Keystroke::Enter, Keystroke::Char('b')]
        );
    }

    #[test]
    fn empty_text_is_rejected() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, PlayerOptions::instant());

        assert!(matches!(player.submit(""), Err(PlayerError::EmptyJob)));
        assert_eq!(player.state(), PlaybackState::Idle);
        assert_eq!(sinks.opens(), 0);
    }

    // ---- pause / resume ---

    #[test]
    fn pause_after_five_chars_then_resume() {
        let text = "for i in range(3):\n    print(i)";
        let (reached_tx, reached_rx) = std_mpsc::channel::<()>();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let reached_tx = Mutex::new(reached_tx);
        let release_rx = Mutex::new(release_rx);

        let sinks = RecordingSinkFactory::new().with_hook(move |n| {
            if n == 5 {
                reached_tx.lock().unwrap().send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
            }
        });
        let player = player_with(&sinks, PlayerOptions::instant());

        player.submit(text).unwrap();
        reached_rx.recv_timeout(WAIT).expect("five chars emitted");
        assert_eq!(player.toggle_pause(), PlaybackState::Paused);
        release_tx.send(()).unwrap();

        wait_until(|| player.cursor() == 5);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sinks.text(), "for i");
        assert_eq!(player.cursor(), 5);
        assert_eq!(player.state(), PlaybackState::Paused);

        // Still frozen after another gap.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sinks.len(), 5);

        assert_eq!(player.toggle_pause(), PlaybackState::Running);
        assert_eq!(player.wait(WAIT), PlaybackState::Completed);
        assert_eq!(sinks.text(), text);
    }

    #[test]
    fn pause_wakes_a_job_sleeping_between_keystrokes() {
        let sinks = RecordingSinkFactory::new();
        // One keystroke per 10 s: the job is always asleep in `pace`.
        let player = player_with(&sinks, fixed(10_000));

        player.submit("abc").unwrap();
        wait_until(|| sinks.len() == 1);
        let started = Instant::now();
        player.toggle_pause();
        player.cancel();

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(sinks.text(), "a");
    }

    #[test]
    fn toggle_is_noop_outside_a_job() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, PlayerOptions::instant());

        assert_eq!(player.toggle_pause(), PlaybackState::Idle);

        player.submit("x").unwrap();
        player.wait(WAIT);
        assert_eq!(player.toggle_pause(), PlaybackState::Completed);
        assert_eq!(player.state(), PlaybackState::Completed);
    }

    // ---- cancel ---

    #[test]
    fn cancel_stops_at_cursor() {
        let text: String = "abcdefghij".repeat(10);
        let cell: Arc<OnceLock<TypingPlayer>> = Arc::new(OnceLock::new());
        let hook_cell = Arc::clone(&cell);
        let sinks = RecordingSinkFactory::new().with_hook(move |n| {
            if n == 7 {
                if let Some(p) = hook_cell.get() {
                    p.cancel();
                }
            }
        });
        let player = player_with(&sinks, PlayerOptions::instant());
        let _ = cell.set(player.clone());

        player.submit(&text).unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sinks.text(), &text[..7]);
        assert_eq!(player.cursor(), 7);
    }

    #[test]
    fn cancel_during_start_delay_types_nothing() {
        let sinks = RecordingSinkFactory::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let options = PlayerOptions {
            start_delay: Duration::from_millis(300),
            ..PlayerOptions::instant()
        };
        let player = player_with(&sinks, options).with_reports(tx);

        player.submit("abc").unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(player.cancel());

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        assert_eq!(sinks.len(), 0);
        assert_eq!(player.cursor(), 0);
        let report = rx.try_recv().expect("report for cancelled job");
        assert_eq!(report.outcome, JobOutcome::Cancelled);
        assert_eq!(report.typed, 0);
    }

    #[test]
    fn cancel_after_last_keystroke_is_not_completed() {
        let text = "abcde";
        let cell: Arc<OnceLock<TypingPlayer>> = Arc::new(OnceLock::new());
        let hook_cell = Arc::clone(&cell);
        let sinks = RecordingSinkFactory::new().with_hook(move |n| {
            if n == text.len() {
                if let Some(p) = hook_cell.get() {
                    p.cancel();
                }
            }
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = player_with(&sinks, PlayerOptions::instant()).with_reports(tx);
        let _ = cell.set(player.clone());

        player.submit(text).unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        assert_eq!(sinks.text(), text);
        assert_eq!(player.cursor(), text.len());
        let report = rx.try_recv().expect("report for cancelled job");
        assert_eq!(report.outcome, JobOutcome::Cancelled);
        assert_eq!(report.typed, text.len());
    }

    #[test]
    fn cancel_while_paused_ends_job() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, fixed(5));

        player.submit(&"z".repeat(500)).unwrap();
        wait_until(|| sinks.len() >= 3);
        player.toggle_pause();
        assert!(player.cancel());

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        let emitted = sinks.len();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(sinks.len(), emitted);
        assert_eq!(emitted, player.cursor());
    }

    #[test]
    fn cancel_is_idempotent() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, fixed(5));

        assert!(!player.cancel());
        assert_eq!(player.state(), PlaybackState::Idle);

        player.submit(&"q".repeat(500)).unwrap();
        wait_until(|| sinks.len() >= 2);
        assert!(player.cancel());
        assert!(!player.cancel());

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        assert_eq!(player.state(), PlaybackState::Cancelled);
        assert_eq!(sinks.len(), player.cursor());
    }

    // ---- replacement ---

    #[test]
    fn new_job_never_interleaves_with_replaced_one() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, fixed(2));

        player.submit(&"a".repeat(300)).unwrap();
        wait_until(|| sinks.len() >= 5);
        player.submit("bbbb").unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Completed);
        let out = sinks.text();
        let first_b = out.find('b').expect("second job typed");
        assert!(out[..first_b].chars().all(|c| c == 'a'));
        assert_eq!(&out[first_b..], "bbbb");
        assert_eq!(player.generation(), 2);
    }

    #[test]
    fn new_job_replaces_paused_one() {
        let sinks = RecordingSinkFactory::new();
        let player = player_with(&sinks, fixed(2));

        player.submit(&"a".repeat(300)).unwrap();
        wait_until(|| sinks.len() >= 3);
        player.toggle_pause();
        player.submit("xy").unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Completed);
        assert!(sinks.text().ends_with("axy"));
        assert_eq!(sinks.opens(), 2);
    }

    #[test]
    fn overtaken_submit_returns_without_waiting_for_newer_job() {
        let (held_tx, held_rx) = std_mpsc::channel::<()>();
        let (release_tx, release_rx) = std_mpsc::channel::<()>();
        let held_tx = Mutex::new(held_tx);
        let release_rx = Mutex::new(release_rx);
        let sinks = RecordingSinkFactory::new().with_hook(move |n| {
            if n == 1 {
                held_tx.lock().unwrap().send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
            }
        });
        let player = player_with(&sinks, PlayerOptions::instant());

        player.submit("xxxx").unwrap();
        held_rx.recv_timeout(WAIT).expect("first job inside emit");

        // Both submits queue behind the job stuck in `emit`.
        let (done_tx, done_rx) = std_mpsc::channel();
        let first = {
            let player = player.clone();
            let done_tx = done_tx.clone();
            thread::spawn(move || done_tx.send(("A", player.submit("A"))).unwrap())
        };
        wait_until(|| player.generation() == 2);
        let second = {
            let player = player.clone();
            thread::spawn(move || {
                done_tx
                    .send(("B", player.submit(&"b".repeat(150))))
                    .unwrap()
            })
        };

        let (who, result) = done_rx.recv_timeout(WAIT).expect("overtaken submit returned");
        assert_eq!(who, "A");
        assert!(matches!(result, Err(PlayerError::Superseded(2))));

        release_tx.send(()).unwrap();
        let (who, result) = done_rx.recv_timeout(WAIT).expect("newest submit returned");
        assert_eq!(who, "B");
        assert_eq!(result.unwrap(), 3);
        first.join().unwrap();
        second.join().unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Completed);
        assert_eq!(sinks.text(), format!("x{}", "b".repeat(150)));
    }

    #[test]
    fn reports_are_sent_per_job() {
        let sinks = RecordingSinkFactory::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = player_with(&sinks, fixed(2)).with_reports(tx);

        player.submit(&"a".repeat(300)).unwrap();
        wait_until(|| sinks.len() >= 2);
        player.submit("ok").unwrap();
        player.wait(WAIT);

        let first = rx.try_recv().expect("report for replaced job");
        assert_eq!(first.generation, 1);
        assert_eq!(first.outcome, JobOutcome::Cancelled);
        let second = rx.try_recv().expect("report for second job");
        assert_eq!(second.generation, 2);
        assert_eq!(second.outcome, JobOutcome::Completed);
        assert_eq!(second.typed, 2);
    }

    // ---- failures ---

    #[test]
    fn injection_failure_cancels_job() {
        let sinks = RecordingSinkFactory::new().failing_at(3);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = player_with(&sinks, PlayerOptions::instant()).with_reports(tx);

        player.submit("abcdef").unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        assert_eq!(sinks.text(), "abc");
        assert!(player.last_error().unwrap().contains("focus lost"));
        let report = rx.try_recv().unwrap();
        assert!(matches!(report.outcome, JobOutcome::Failed(_)));
        assert_eq!(report.typed, 3);
    }

    #[test]
    fn sink_open_failure_cancels_job() {
        let sinks = RecordingSinkFactory::new().failing_open();
        let player = player_with(&sinks, PlayerOptions::instant());

        player.submit("abc").unwrap();

        assert_eq!(player.wait(WAIT), PlaybackState::Cancelled);
        assert_eq!(sinks.len(), 0);
        assert!(player.last_error().is_some());
    }

    #[test]
    fn failure_is_cleared_by_next_job() {
        let sinks = RecordingSinkFactory::new().failing_at(1);
        let player = player_with(&sinks, PlayerOptions::instant());

        player.submit("ab").unwrap();
        player.wait(WAIT);
        assert!(player.last_error().is_some());

        // The injected failure fires only once.
        player.submit("cd").unwrap();
        assert_eq!(player.wait(WAIT), PlaybackState::Completed);
        assert!(player.last_error().is_none());
        assert_eq!(sinks.text(), "acd");
    }
}
