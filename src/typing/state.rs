//! Playback state of the typing player.

/// Status of the one job a [`TypingPlayer`](super::TypingPlayer) owns.
///
/// ```text
/// Idle ──submit──▶ Running ◀──toggle──▶ Paused
///                    │  │                  │
///                    │  └──cancel / emit failure──▶ Cancelled
///                    │                     │
///                    └──end of text──▶ Completed
/// Cancelled / Completed ──submit──▶ Running
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No job has been submitted yet.
    #[default]
    Idle,
    /// The job thread is emitting keystrokes.
    Running,
    /// Emission is suspended; the cursor is frozen.
    Paused,
    /// The job was cancelled or aborted by an injection failure.
    Cancelled,
    /// Every keystroke was emitted.
    Completed,
}

impl PlaybackState {
    /// `true` while a job owns the keyboard (running or paused).
    ///
    /// ```
    /// use autotypist::typing::PlaybackState;
    ///
    /// assert!(PlaybackState::Running.is_active());
    /// assert!(PlaybackState::Paused.is_active());
    /// assert!(!PlaybackState::Completed.is_active());
    /// ```
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Running | PlaybackState::Paused)
    }

    /// A short label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Running => "running",
            PlaybackState::Paused => "paused",
            PlaybackState::Cancelled => "cancelled",
            PlaybackState::Completed => "completed",
        }
    }
}

/// Snapshot of how far the current job has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Index of the next keystroke to emit.
    pub cursor: usize,
    /// Total keystrokes in the job.
    pub len: usize,
}

impl Progress {
    pub fn remaining(&self) -> usize {
        self.len.saturating_sub(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
    }

    #[test]
    fn terminal_states_are_inactive() {
        for s in [
            PlaybackState::Idle,
            PlaybackState::Cancelled,
            PlaybackState::Completed,
        ] {
            assert!(!s.is_active(), "{} should be inactive", s.label());
        }
    }

    #[test]
    fn remaining_saturates() {
        let p = Progress { cursor: 7, len: 5 };
        assert_eq!(p.remaining(), 0);
        assert_eq!(Progress { cursor: 2, len: 5 }.remaining(), 3);
    }
}
