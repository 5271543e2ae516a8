//! The reveal state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::pacing::delay_after;
use super::RevealOptions;

/// Lifecycle of a reveal cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Running,
    Paused,
    Complete,
}

/// Why a cycle reached [`RevealState::Complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// Every character was revealed by ticks
    Finished,
    /// `skip()` was called
    Skipped,
    /// Empty text, or longer than the auto-skip threshold
    AutoSkipped,
    /// The host prefers reduced motion
    ReducedMotion,
    /// Nothing was revealed within the watchdog grace period
    Watchdog,
}

/// A revealed prefix of the session text.
///
/// Cheap to clone; shares the text with the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealFrame {
    text: Arc<str>,
    end: usize,
    revealed: usize,
}

impl RevealFrame {
    /// The visible prefix.
    pub fn as_str(&self) -> &str {
        &self.text[..self.end]
    }

    /// Number of characters visible.
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// The full text of the session.
    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn is_full(&self) -> bool {
        self.end == self.text.len()
    }
}

/// Something the owner of a session should publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    /// Entered Running; once per cycle
    Started { cycle: u64 },
    /// One more character is visible
    Progress(RevealFrame),
    Paused,
    Resumed,
    /// Entered Complete; once per cycle
    Completed {
        cycle: u64,
        frame: RevealFrame,
        reason: CompletionReason,
    },
}

/// What to do with the pending tick after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Leave whatever is pending alone
    Keep,
    /// Replace any pending tick with one after this delay
    After(Duration),
    /// Drop the pending tick
    Cancel,
}

/// Result of one state machine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub events: Vec<RevealEvent>,
    pub schedule: Schedule,
}

impl Step {
    fn noop() -> Self {
        Self {
            events: Vec::new(),
            schedule: Schedule::Keep,
        }
    }

    fn schedule(events: Vec<RevealEvent>, schedule: Schedule) -> Self {
        Self { events, schedule }
    }
}

/// Point-in-time view of a session, including the advisory metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealSnapshot {
    pub state: RevealState,
    pub cycle: u64,
    pub revealed: usize,
    pub total: usize,
    pub progress_percent: f64,
    pub estimated_remaining: Duration,
}

/// One message's typewriter state.
///
/// Operations that make no sense in the current state are no-ops and
/// return an empty [`Step`]; UI races (double clicks, re-renders) never
/// turn into errors.
#[derive(Debug, Clone)]
pub struct RevealSession {
    text: Arc<str>,
    chars: Vec<char>,
    /// Byte offset just past each character
    ends: Vec<usize>,
    revealed: usize,
    state: RevealState,
    started_at: Option<Instant>,
    options: RevealOptions,
    reduced_motion: bool,
    cycle: u64,
}

impl RevealSession {
    pub fn new(options: RevealOptions) -> Self {
        Self {
            text: Arc::from(""),
            chars: Vec::new(),
            ends: Vec::new(),
            revealed: 0,
            state: RevealState::Idle,
            started_at: None,
            options,
            reduced_motion: false,
            cycle: 0,
        }
    }

    /// Begin revealing `text`, discarding any cycle in progress.
    pub fn start(
        &mut self,
        text: impl Into<Arc<str>>,
        options: RevealOptions,
        reduced_motion: bool,
    ) -> Step {
        if matches!(self.state, RevealState::Running | RevealState::Paused) {
            tracing::debug!(
                cycle = self.cycle,
                revealed = self.revealed,
                "Restarting reveal with new text"
            );
        }

        self.text = text.into();
        self.chars = self.text.chars().collect();
        self.ends = self
            .text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .collect();
        self.options = options;
        self.reduced_motion = reduced_motion;
        self.begin_cycle()
    }

    /// Reveal one more character.
    pub fn tick(&mut self) -> Step {
        if self.state != RevealState::Running {
            return Step::noop();
        }

        self.revealed += 1;
        let mut events = vec![RevealEvent::Progress(self.frame())];

        if self.revealed >= self.chars.len() {
            events.extend(self.complete(CompletionReason::Finished).events);
            return Step::schedule(events, Schedule::Cancel);
        }

        Step::schedule(events, Schedule::After(self.next_delay()))
    }

    pub fn pause(&mut self) -> Step {
        if self.state != RevealState::Running {
            return Step::noop();
        }
        self.state = RevealState::Paused;
        Step::schedule(vec![RevealEvent::Paused], Schedule::Cancel)
    }

    pub fn resume(&mut self) -> Step {
        if self.state != RevealState::Paused {
            return Step::noop();
        }
        self.state = RevealState::Running;
        Step::schedule(
            vec![RevealEvent::Resumed],
            Schedule::After(self.next_delay()),
        )
    }

    /// Show everything now. No-op once complete.
    pub fn skip(&mut self) -> Step {
        if self.state == RevealState::Complete {
            return Step::noop();
        }
        self.complete(CompletionReason::Skipped)
    }

    /// Replay the same text from the beginning. Only valid once complete.
    pub fn restart(&mut self) -> Step {
        if self.state != RevealState::Complete {
            return Step::noop();
        }
        self.begin_cycle()
    }

    /// The host's reduced-motion preference changed.
    pub fn set_reduced_motion(&mut self, reduced_motion: bool) -> Step {
        self.note_reduced_motion(reduced_motion);
        if reduced_motion
            && self.options.respect_reduced_motion
            && matches!(self.state, RevealState::Running | RevealState::Paused)
        {
            return self.complete(CompletionReason::ReducedMotion);
        }
        Step::noop()
    }

    /// Record the host preference without acting on it. It applies from the
    /// next cycle entry.
    pub fn note_reduced_motion(&mut self, reduced_motion: bool) {
        self.reduced_motion = reduced_motion;
    }

    /// The watchdog grace period ran out.
    ///
    /// Only acts when the cycle is running and has not revealed anything;
    /// a paused or progressing cycle is left alone.
    pub fn watchdog_expired(&mut self) -> Step {
        if self.state != RevealState::Running || self.revealed > 0 {
            return Step::noop();
        }
        tracing::warn!(cycle = self.cycle, "Reveal stalled, showing full text");
        self.complete(CompletionReason::Watchdog)
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Characters revealed so far.
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// Total characters in the text.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &RevealOptions {
        &self.options
    }

    /// When the current cycle entered Running.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// The currently visible prefix.
    pub fn frame(&self) -> RevealFrame {
        RevealFrame {
            text: Arc::clone(&self.text),
            end: self.visible_end(),
            revealed: self.revealed,
        }
    }

    pub fn visible_text(&self) -> &str {
        &self.text[..self.visible_end()]
    }

    /// Byte offset just past the last revealed character.
    fn visible_end(&self) -> usize {
        match self.revealed {
            0 => 0,
            n => self.ends[n - 1],
        }
    }

    /// Percentage of characters revealed. Empty text counts as fully revealed.
    pub fn progress_percent(&self) -> f64 {
        if self.chars.is_empty() {
            return 100.0;
        }
        self.revealed as f64 / self.chars.len() as f64 * 100.0
    }

    /// Remaining characters at the base delay. Ignores punctuation pauses.
    pub fn estimated_remaining(&self) -> Duration {
        let remaining = (self.chars.len() - self.revealed) as u64;
        Duration::from_millis(remaining.saturating_mul(self.options.base_delay_ms))
    }

    /// Observed reveal rate since the cycle started.
    pub fn chars_per_minute(&self, now: Instant) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(started_at).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.revealed as f64 / elapsed * 60.0
    }

    pub fn snapshot(&self) -> RevealSnapshot {
        RevealSnapshot {
            state: self.state,
            cycle: self.cycle,
            revealed: self.revealed,
            total: self.chars.len(),
            progress_percent: self.progress_percent(),
            estimated_remaining: self.estimated_remaining(),
        }
    }

    fn begin_cycle(&mut self) -> Step {
        self.cycle += 1;
        self.revealed = 0;
        self.state = RevealState::Idle;
        self.started_at = None;

        if self.chars.is_empty() || self.chars.len() > self.options.auto_skip_threshold {
            return self.complete(CompletionReason::AutoSkipped);
        }
        if self.reduced_motion && self.options.respect_reduced_motion {
            return self.complete(CompletionReason::ReducedMotion);
        }

        self.state = RevealState::Running;
        self.started_at = Some(Instant::now());
        Step::schedule(
            vec![RevealEvent::Started { cycle: self.cycle }],
            Schedule::After(Duration::ZERO),
        )
    }

    fn complete(&mut self, reason: CompletionReason) -> Step {
        self.revealed = self.chars.len();
        self.state = RevealState::Complete;
        tracing::debug!(cycle = self.cycle, ?reason, chars = self.revealed, "Reveal complete");
        Step::schedule(
            vec![RevealEvent::Completed {
                cycle: self.cycle,
                frame: self.frame(),
                reason,
            }],
            Schedule::Cancel,
        )
    }

    /// Pacing after the last revealed character; immediate if none.
    fn next_delay(&self) -> Duration {
        match self.revealed {
            0 => Duration::ZERO,
            n => {
                let prev = if n >= 2 { Some(self.chars[n - 2]) } else { None };
                delay_after(self.chars[n - 1], prev, &self.options)
            }
        }
    }
}
