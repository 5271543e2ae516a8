//! Typewriter-style incremental reveal of chat message text
//!
//! A [`RevealSession`] is a plain state machine: every operation returns a
//! [`Step`] with the events to emit and what to do with the pending tick.
//! [`Typewriter`] runs one session inside a tokio task that owns the only
//! tick deadline, so a cancelled tick can never fire late.
//!
//! ```text
//!   Idle ──start──▶ Running ──pause──▶ Paused
//!    ▲                │   ▲◀──resume────┘
//!    │ restart        │   │
//!    │                ▼ last tick / skip / watchdog
//!    └──────────── Complete
//! ```

mod driver;
mod pacing;
mod session;

pub use driver::{Typewriter, TypewriterHandle};
pub use pacing::{delay_after, total_delay, CharClass};
pub use session::{
    CompletionReason, RevealEvent, RevealFrame, RevealSession, RevealSnapshot, RevealState,
    Schedule, Step,
};

use std::time::Duration;

use crate::config::RevealConfig;

/// Pacing and policy for one reveal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealOptions {
    /// Delay between plain characters
    pub base_delay_ms: u64,
    /// Extra pause after `.!?`
    pub punctuation_pause_ms: u64,
    /// Texts with more characters than this are shown at once
    pub auto_skip_threshold: usize,
    /// Show text at once when the host asks for reduced motion
    pub respect_reduced_motion: bool,
    /// Grace period for the first character before falling back to full text
    pub watchdog_ms: u64,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            base_delay_ms: 50,
            punctuation_pause_ms: 200,
            auto_skip_threshold: 500,
            respect_reduced_motion: true,
            watchdog_ms: 2000,
        }
    }
}

impl RevealOptions {
    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }
}

impl From<&RevealConfig> for RevealOptions {
    fn from(config: &RevealConfig) -> Self {
        Self {
            base_delay_ms: config.base_delay_ms,
            punctuation_pause_ms: config.punctuation_pause_ms,
            auto_skip_threshold: config.auto_skip_threshold,
            respect_reduced_motion: config.respect_reduced_motion,
            watchdog_ms: config.watchdog_ms,
        }
    }
}
