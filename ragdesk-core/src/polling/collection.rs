//! Shared, observable document list.

use std::sync::Arc;

use tokio::sync::watch;

use crate::types::Document;

/// The application's document list.
///
/// Cloning gives another handle to the same list. Readers subscribe for
/// change notifications; the reconciler writes polled statuses through
/// [`merge`](Self::merge) and full reloads through
/// [`replace_all`](Self::replace_all).
#[derive(Debug, Clone)]
pub struct DocumentCollection {
    tx: Arc<watch::Sender<Vec<Document>>>,
}

impl Default for DocumentCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DocumentCollection {
    pub fn new(documents: Vec<Document>) -> Self {
        let (tx, _rx) = watch::channel(documents);
        Self { tx: Arc::new(tx) }
    }

    /// Current documents, in server order.
    pub fn snapshot(&self) -> Vec<Document> {
        self.tx.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.tx.borrow().iter().find(|d| d.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Replace the stored record for `document.id`, or append it if unknown.
    pub fn merge(&self, document: Document) {
        self.tx.send_modify(|documents| {
            match documents.iter_mut().find(|d| d.id == document.id) {
                Some(existing) => *existing = document,
                None => documents.push(document),
            }
        });
    }

    /// Swap in a freshly fetched list.
    pub fn replace_all(&self, documents: Vec<Document>) {
        self.tx.send_replace(documents);
    }

    /// Receive a notification every time the list changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Document>> {
        self.tx.subscribe()
    }
}
