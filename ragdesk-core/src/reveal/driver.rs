//! Actor that drives a [`RevealSession`] on the tokio clock.
//!
//! ```text
//!   TypewriterHandle (Clone)     mpsc       Typewriter task
//!   ┌────────────────────┐   ─────────▶  ┌──────────────────────────┐
//!   │ .start() .pause()  │               │ RevealSession            │
//!   │ .skip() .restart() │   ◀─────────  │ tick deadline, watchdog  │
//!   └────────────────────┘     watch     └──────────────────────────┘
//!                                              │ mpsc
//!                                              ▼ RevealEvent
//! ```
//!
//! The task is the only owner of the tick deadline. A command that cancels
//! the tick is applied before any tick that is due at the same moment, and
//! a cancelled deadline simply stops existing, so stale ticks cannot fire.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::error::{Error, Result};

use super::session::{RevealEvent, RevealSession, RevealSnapshot, Schedule, Step};
use super::RevealOptions;

/// Internal command sent from [`TypewriterHandle`] to the task.
enum Command {
    Start {
        text: Arc<str>,
        options: Option<RevealOptions>,
    },
    Pause,
    Resume,
    Skip,
    Restart,
    Shutdown,
}

/// Cloneable handle to a running typewriter.
///
/// Dropping every handle stops the task.
#[derive(Clone)]
pub struct TypewriterHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<RevealSnapshot>,
}

impl TypewriterHandle {
    /// Reveal `text` with the options the typewriter was spawned with.
    pub fn start(&self, text: impl Into<Arc<str>>) -> Result<()> {
        self.send(Command::Start {
            text: text.into(),
            options: None,
        })
    }

    /// Reveal `text` with different options; they stick for later cycles.
    pub fn start_with(&self, text: impl Into<Arc<str>>, options: RevealOptions) -> Result<()> {
        self.send(Command::Start {
            text: text.into(),
            options: Some(options),
        })
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn skip(&self) -> Result<()> {
        self.send(Command::Skip)
    }

    pub fn restart(&self) -> Result<()> {
        self.send(Command::Restart)
    }

    /// Stop the task. Pending ticks are dropped and no further events are sent.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// Resolves once the task has stopped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Latest state, progress and metrics.
    pub fn snapshot(&self) -> RevealSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch snapshots as they change.
    pub fn subscribe(&self) -> watch::Receiver<RevealSnapshot> {
        self.snapshot.clone()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| Error::SessionClosed)
    }
}

/// The typewriter task. Construct with [`Typewriter::spawn`].
pub struct Typewriter {
    session: RevealSession,
    options: RevealOptions,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<RevealEvent>,
    snapshot: watch::Sender<RevealSnapshot>,
    reduced_motion: watch::Receiver<bool>,
    /// False once the reduced-motion sender is gone
    motion_open: bool,
    tick_at: Option<Instant>,
    watchdog_at: Option<Instant>,
}

impl Typewriter {
    /// Spawn a typewriter on the current tokio runtime.
    ///
    /// `reduced_motion` is the host preference; it is read at every
    /// start/restart and watched for changes while a reveal runs.
    pub fn spawn(
        options: RevealOptions,
        reduced_motion: watch::Receiver<bool>,
    ) -> (TypewriterHandle, mpsc::UnboundedReceiver<RevealEvent>) {
        let (typewriter, handle, events) = Self::new(options, reduced_motion);
        tokio::spawn(typewriter.run());
        (handle, events)
    }

    fn new(
        options: RevealOptions,
        reduced_motion: watch::Receiver<bool>,
    ) -> (Self, TypewriterHandle, mpsc::UnboundedReceiver<RevealEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let session = RevealSession::new(options.clone());
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let typewriter = Typewriter {
            session,
            options,
            commands: cmd_rx,
            events: event_tx,
            snapshot: snapshot_tx,
            reduced_motion,
            motion_open: true,
            tick_at: None,
            watchdog_at: None,
        };

        (
            typewriter,
            TypewriterHandle {
                tx: cmd_tx,
                snapshot: snapshot_rx,
            },
            event_rx,
        )
    }

    async fn run(mut self) {
        tracing::debug!("Typewriter started");

        loop {
            let tick_at = self.tick_at;
            let watchdog_at = self.watchdog_at;

            let step = tokio::select! {
                biased;

                command = self.commands.recv() => match command.and_then(|c| self.apply(c)) {
                    Some(step) => step,
                    None => break,
                },

                changed = self.reduced_motion.changed(), if self.motion_open => match changed {
                    Ok(()) => {
                        let reduced = *self.reduced_motion.borrow_and_update();
                        tracing::debug!(reduced, "Reduced motion preference changed");
                        self.session.set_reduced_motion(reduced)
                    }
                    Err(_) => {
                        self.motion_open = false;
                        continue;
                    }
                },

                _ = sleep_until(tick_at.unwrap_or_else(Instant::now)), if tick_at.is_some() => {
                    self.tick_at = None;
                    self.session.tick()
                }

                _ = sleep_until(watchdog_at.unwrap_or_else(Instant::now)), if watchdog_at.is_some() => {
                    self.watchdog_at = None;
                    self.session.watchdog_expired()
                }
            };

            self.handle(step);
        }

        tracing::debug!(cycle = self.session.cycle(), "Typewriter stopped");
    }

    /// Apply a command to the session. `None` means stop.
    fn apply(&mut self, command: Command) -> Option<Step> {
        let step = match command {
            Command::Start { text, options } => {
                if let Some(options) = options {
                    self.options = options;
                }
                let reduced = *self.reduced_motion.borrow_and_update();
                self.session.start(text, self.options.clone(), reduced)
            }
            Command::Pause => self.session.pause(),
            Command::Resume => self.session.resume(),
            Command::Skip => self.session.skip(),
            Command::Restart => {
                let reduced = *self.reduced_motion.borrow_and_update();
                // Pick up a preference change that happened while complete
                self.session.note_reduced_motion(reduced);
                self.session.restart()
            }
            Command::Shutdown => return None,
        };
        Some(step)
    }

    /// Deadlines past the end of the clock never fire.
    fn handle(&mut self, step: Step) {
        let now = Instant::now();

        match step.schedule {
            Schedule::Keep => {}
            Schedule::After(delay) => self.tick_at = now.checked_add(delay),
            Schedule::Cancel => self.tick_at = None,
        }

        for event in step.events {
            match &event {
                RevealEvent::Started { .. } => {
                    self.watchdog_at = now.checked_add(self.options.watchdog());
                }
                RevealEvent::Completed { .. } => self.watchdog_at = None,
                _ => {}
            }
            // Nobody listening is fine; the snapshot still updates
            let _ = self.events.send(event);
        }

        self.snapshot.send_replace(self.session.snapshot());
    }
}
