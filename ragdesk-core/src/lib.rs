//! # ragdesk-core
//!
//! Core library for ragdesk - a terminal client for a document Q&A service.
//!
//! This library provides:
//! - A typewriter-style progressive reveal engine for assistant answers
//! - Background reconciliation of document processing status
//! - An HTTP client for the document API
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Both engines are split into a pure state machine and a tokio driver:
//! - **[`reveal`]:** [`RevealSession`] decides what to show next and when;
//!   [`Typewriter`] owns the timer and serializes commands.
//! - **[`polling`]:** [`Reconciler`] runs one polling task per document and
//!   merges results into a shared [`DocumentCollection`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use ragdesk_core::{Config, RevealEvent, Typewriter};
//! use tokio::sync::watch;
//!
//! # async fn run() -> ragdesk_core::Result<()> {
//! let config = Config::load()?;
//! let (_motion_tx, motion_rx) = watch::channel(config.reveal.reduced_motion);
//! let (handle, mut events) = Typewriter::spawn((&config.reveal).into(), motion_rx);
//!
//! handle.start("Hello, world!")?;
//! while let Some(event) = events.recv().await {
//!     if let RevealEvent::Completed { frame, .. } = event {
//!         println!("{}", frame.as_str());
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use client::DocumentClient;
pub use config::Config;
pub use error::{Error, Result};
pub use polling::{DocumentCollection, DocumentSource, Reconciler};
pub use reveal::{
    CompletionReason, RevealEvent, RevealOptions, RevealSession, RevealSnapshot, RevealState,
    Typewriter, TypewriterHandle,
};
pub use types::*;

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod polling;
pub mod reveal;
pub mod types;
