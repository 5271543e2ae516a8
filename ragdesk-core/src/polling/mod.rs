//! Background polling of document processing status
//!
//! Uploaded documents are processed asynchronously by the backend. The
//! [`Reconciler`] keeps every non-terminal document under periodic status
//! checks, merges what it learns into the shared [`DocumentCollection`], and
//! forgets a document once it is `Processed` or `Failed`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragdesk_core::client::DocumentClient;
//! use ragdesk_core::polling::{DocumentCollection, Reconciler};
//! use ragdesk_core::Config;
//!
//! # async fn run() -> ragdesk_core::Result<()> {
//! let config = Config::load()?;
//! let client = DocumentClient::new(config.api.clone())?;
//! let documents = DocumentCollection::default();
//! let reconciler = Reconciler::new(Arc::new(client), documents.clone(), &config.polling);
//!
//! // Picks up anything already processing on the server
//! reconciler.load().await?;
//!
//! // After an upload completes
//! reconciler.register_for_polling(["doc-42"]);
//! # Ok(())
//! # }
//! ```

mod collection;
mod reconciler;

pub use collection::DocumentCollection;
pub use reconciler::{PollRegistration, Reconciler, TerminalPredicate};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Document;

/// Where document records come from.
///
/// Implemented over HTTP by [`DocumentClient`](crate::client::DocumentClient);
/// tests use in-memory fakes.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch one document's current record.
    async fn fetch_status(&self, id: &str) -> Result<Document>;

    /// Fetch the complete document list.
    async fn fetch_all(&self) -> Result<Vec<Document>>;
}
