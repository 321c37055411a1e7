//! Inter-keystroke delay sampling.
//!
//! [`sample_delay`] is a pure function of the profile, the RNG, the keystroke
//! just emitted and the length of the word it ended; [`Cadence`] wraps it
//! with a seeded [`StdRng`] and the running word length.  Nothing here
//! sleeps, so the whole module is testable without real time.
//!
//! Default profile:
//!
//! | After            | Delay                                               |
//! |------------------|-----------------------------------------------------|
//! | any character    | normal(140 ms, σ 80 ms) clamped to 80–270 ms         |
//! | space after a word of 4+ chars | + 400–800 ms with 30 % probability    |
//! | `.` `!` `?`      | + 250–600 ms                                        |
//! | Enter            | 300–900 ms (replaces the base delay)                |

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::inject::Keystroke;

/// Words at least this long may be followed by a thinking pause.
const THINKING_WORD_LEN: usize = 4;

// ---------------------------------------------------------------------------
// CadenceProfile
// ---------------------------------------------------------------------------

/// Timing parameters, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceProfile {
    /// Mean of the per-keystroke base delay.
    pub mean_ms: f64,
    /// Standard deviation of the base delay.
    pub jitter_ms: f64,
    /// Lower clamp of the base delay.
    pub min_ms: u64,
    /// Upper clamp of the base delay.
    pub max_ms: u64,
    /// Probability (0.0 – 1.0) of a thinking pause after a long word.
    pub word_pause_chance: f64,
    pub word_pause_min_ms: u64,
    pub word_pause_max_ms: u64,
    /// Extra pause after sentence-ending punctuation.
    pub sentence_pause_min_ms: u64,
    pub sentence_pause_max_ms: u64,
    /// Pause after a line break.
    pub line_pause_min_ms: u64,
    pub line_pause_max_ms: u64,
}

impl Default for CadenceProfile {
    fn default() -> Self {
        Self {
            mean_ms: 140.0,
            jitter_ms: 80.0,
            min_ms: 80,
            max_ms: 270,
            word_pause_chance: 0.3,
            word_pause_min_ms: 400,
            word_pause_max_ms: 800,
            sentence_pause_min_ms: 250,
            sentence_pause_max_ms: 600,
            line_pause_min_ms: 300,
            line_pause_max_ms: 900,
        }
    }
}

impl CadenceProfile {
    /// Constant delay after every keystroke, no extra pauses.
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self {
            mean_ms: ms as f64,
            jitter_ms: 0.0,
            min_ms: ms,
            max_ms: ms,
            word_pause_chance: 0.0,
            word_pause_min_ms: 0,
            word_pause_max_ms: 0,
            sentence_pause_min_ms: 0,
            sentence_pause_max_ms: 0,
            line_pause_min_ms: ms,
            line_pause_max_ms: ms,
        }
    }

    /// No delay at all.
    pub fn instant() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// Upper bound of any delay [`sample_delay`] can return.
    ///
    /// This is also the worst-case latency before a control signal issued
    /// during a pause is observed by a job that ignores wake-ups.
    pub fn max_delay(&self) -> Duration {
        let base = self.max_ms.max(self.min_ms);
        let word = base + self.word_pause_max_ms.max(self.word_pause_min_ms);
        let sentence = base + self.sentence_pause_max_ms.max(self.sentence_pause_min_ms);
        let line = self.line_pause_max_ms.max(self.line_pause_min_ms);
        Duration::from_millis(word.max(sentence).max(line))
    }
}

// ---------------------------------------------------------------------------
// sample_delay
// ---------------------------------------------------------------------------

/// Delay to wait after emitting `key`.
///
/// `word_len` is the length of the word that `key` terminates (only
/// meaningful when `key` is a space).
pub fn sample_delay<R: Rng + ?Sized>(
    profile: &CadenceProfile,
    rng: &mut R,
    key: Keystroke,
    word_len: usize,
) -> Duration {
    if key == Keystroke::Enter {
        return Duration::from_millis(between(
            rng,
            profile.line_pause_min_ms,
            profile.line_pause_max_ms,
        ));
    }

    let mut ms = base_delay(profile, rng);

    match key {
        Keystroke::Char(' ') if word_len >= THINKING_WORD_LEN => {
            let chance = profile.word_pause_chance.clamp(0.0, 1.0);
            if chance > 0.0 && rng.gen_bool(chance) {
                ms += between(rng, profile.word_pause_min_ms, profile.word_pause_max_ms) as f64;
            }
        }
        Keystroke::Char('.' | '!' | '?') => {
            ms += between(
                rng,
                profile.sentence_pause_min_ms,
                profile.sentence_pause_max_ms,
            ) as f64;
        }
        _ => {}
    }

    Duration::from_micros((ms * 1000.0).round() as u64)
}

fn base_delay<R: Rng + ?Sized>(profile: &CadenceProfile, rng: &mut R) -> f64 {
    let lo = profile.min_ms as f64;
    let hi = profile.max_ms.max(profile.min_ms) as f64;
    let raw = if profile.jitter_ms > 0.0 {
        Normal::new(profile.mean_ms, profile.jitter_ms)
            .map(|normal| normal.sample(rng))
            .unwrap_or(profile.mean_ms)
    } else {
        profile.mean_ms
    };
    if raw.is_finite() {
        raw.clamp(lo, hi)
    } else {
        lo
    }
}

fn between<R: Rng + ?Sized>(rng: &mut R, lo: u64, hi: u64) -> u64 {
    if hi <= lo {
        lo
    } else {
        rng.gen_range(lo..=hi)
    }
}

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

/// Stateful sampler used by one typing job.
pub struct Cadence {
    profile: CadenceProfile,
    rng: StdRng,
    word_len: usize,
}

impl Cadence {
    /// Create a sampler.  `seed` makes the delay sequence reproducible.
    pub fn new(profile: CadenceProfile, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            profile,
            rng,
            word_len: 0,
        }
    }

    /// Delay to wait after `key` has been emitted.
    pub fn next_delay(&mut self, key: Keystroke) -> Duration {
        let word_len = self.word_len;
        match key {
            Keystroke::Char(c) if !c.is_whitespace() => self.word_len += 1,
            _ => self.word_len = 0,
        }
        sample_delay(&self.profile, &mut self.rng, key, word_len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
