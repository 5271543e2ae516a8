//! `ragdesk type`: drive the typewriter on stdout.

use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ragdesk_core::{RevealEvent, RevealOptions, RevealState, Typewriter, TypewriterHandle};
use tokio::sync::{mpsc, watch};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    TogglePause,
    Skip,
    Restart,
    ToggleReducedMotion,
    Quit,
}

impl Action {
    fn from_key(key: KeyEvent) -> Option<Self> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char(' ') => Some(Action::TogglePause),
            KeyCode::Char('s') | KeyCode::Enter => Some(Action::Skip),
            KeyCode::Char('r') => Some(Action::Restart),
            KeyCode::Char('m') => Some(Action::ToggleReducedMotion),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        }
    }
}

pub async fn run(text: String, options: RevealOptions, reduced_motion: bool) -> Result<()> {
    let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();

    let (motion_tx, motion_rx) = watch::channel(reduced_motion);
    let (handle, mut events) = Typewriter::spawn(options, motion_rx);

    let mut keys = if interactive {
        Some(KeyReader::start()?)
    } else {
        None
    };
    let mut screen = Screen::new(interactive);

    tracing::info!(
        chars = text.chars().count(),
        interactive,
        reduced_motion,
        "Starting reveal"
    );
    handle.start(text)?;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let completed = matches!(event, RevealEvent::Completed { .. });
                screen.show(&event)?;
                if completed && keys.is_none() {
                    break;
                }
            }
            action = next_action(&mut keys) => {
                match action {
                    Some(Action::Quit) | None => break,
                    Some(action) => apply(&handle, &motion_tx, action)?,
                }
            }
        }
    }

    // Restore the terminal before the final newline
    drop(keys);
    screen.finish()?;
    let _ = handle.shutdown();

    Ok(())
}

fn apply(handle: &TypewriterHandle, motion: &watch::Sender<bool>, action: Action) -> Result<()> {
    match action {
        Action::TogglePause => match handle.snapshot().state {
            RevealState::Running => handle.pause()?,
            RevealState::Paused => handle.resume()?,
            _ => {}
        },
        Action::Skip => handle.skip()?,
        Action::Restart => handle.restart()?,
        Action::ToggleReducedMotion => {
            motion.send_modify(|reduced| *reduced = !*reduced);
            tracing::debug!(reduced = *motion.borrow(), "Toggled reduced motion");
        }
        Action::Quit => {}
    }
    Ok(())
}

/// Next key action, or never when not interactive.
async fn next_action(keys: &mut Option<KeyReader>) -> Option<Action> {
    match keys {
        Some(reader) => reader.actions.recv().await,
        None => std::future::pending().await,
    }
}

/// Writes reveal events to stdout.
struct Screen {
    interactive: bool,
    /// Bytes of the current cycle already on screen
    printed: usize,
    at_line_start: bool,
}

impl Screen {
    fn new(interactive: bool) -> Self {
        Self {
            interactive,
            printed: 0,
            at_line_start: true,
        }
    }

    fn show(&mut self, event: &RevealEvent) -> Result<()> {
        match event {
            RevealEvent::Started { cycle } => {
                tracing::debug!(cycle, "Reveal started");
                if !self.at_line_start {
                    self.newline()?;
                }
                self.printed = 0;
            }
            RevealEvent::Progress(frame) => self.catch_up(frame.as_str())?,
            RevealEvent::Paused | RevealEvent::Resumed => {}
            RevealEvent::Completed { frame, reason, .. } => {
                tracing::debug!(?reason, "Reveal completed");
                self.catch_up(frame.as_str())?;
                self.newline()?;
                if self.interactive {
                    self.write(&format!(
                        "{}",
                        "[r] replay  [m] reduced motion  [q] quit".dark_grey()
                    ))?;
                }
                self.printed = 0;
            }
        }
        Ok(())
    }

    /// Print whatever part of `visible` is not on screen yet.
    fn catch_up(&mut self, visible: &str) -> Result<()> {
        if let Some(rest) = visible.get(self.printed..) {
            if !rest.is_empty() {
                self.write(rest)?;
            }
        }
        self.printed = visible.len();
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        self.write("\n")?;
        self.at_line_start = true;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.at_line_start {
            self.newline()?;
        }
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        if self.interactive {
            // Raw mode does not translate line feeds
            stdout.write_all(text.replace('\n', "\r\n").as_bytes())?;
        } else {
            stdout.write_all(text.as_bytes())?;
        }
        stdout.flush()?;
        self.at_line_start = text.ends_with('\n');
        Ok(())
    }
}

/// Raw-mode key input on a background thread.
///
/// Dropping it stops the thread and restores the terminal.
struct KeyReader {
    actions: mpsc::UnboundedReceiver<Action>,
    stop: Arc<AtomicBool>,
}

impl KeyReader {
    fn start() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;

        let (tx, actions) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stopped = stop.clone();

        thread::spawn(move || {
            while !stopped.load(Ordering::SeqCst) {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to poll terminal events");
                        break;
                    }
                }
                let key = match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read terminal event");
                        break;
                    }
                };
                if let Some(action) = Action::from_key(key) {
                    if tx.send(action).is_err() {
                        break;
                    }
                }
            }
        });

        Ok(Self { actions, stop })
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "Failed to disable raw mode");
        }
    }
}
