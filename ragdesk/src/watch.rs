//! `ragdesk watch`: follow document processing in the terminal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ragdesk_core::{Config, Document, DocumentClient, DocumentCollection, DocumentStatus, Reconciler};
use tokio::sync::mpsc;

pub async fn run(config: &Config, ids: Vec<String>) -> Result<()> {
    let client = DocumentClient::new(config.api.clone()).context("invalid [api] configuration")?;
    let reconciler = Reconciler::new(
        Arc::new(client),
        DocumentCollection::default(),
        &config.polling,
    );

    let loaded = reconciler
        .load()
        .await
        .context("failed to load documents")?;
    let added = reconciler.register_for_polling(ids);
    tracing::info!(loaded, added, "Watching documents");

    if reconciler.in_flight().is_empty() {
        println!("No documents in flight.");
        return Ok(());
    }

    // Set up signal handler for graceful shutdown
    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("failed to set Ctrl+C handler")?;

    println!(
        "Watching {} document(s), polling every {}ms. Press Ctrl+C to stop.",
        reconciler.in_flight().len(),
        config.polling.interval_ms
    );

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .context("invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let summary = follow(&reconciler, &mut stop_rx, &pb).await;
    pb.finish_and_clear();

    if summary.interrupted {
        println!("Stopped.");
    }
    println!();
    println!("Processed: {}", summary.processed);
    println!("Failed:    {}", summary.failed);
    println!("Pending:   {}", summary.pending);

    tracing::info!(
        interrupted = summary.interrupted,
        processed = summary.processed,
        failed = summary.failed,
        "Watch finished"
    );
    Ok(())
}

/// Final tally once watching ends.
#[derive(Debug, PartialEq, Eq)]
struct Summary {
    interrupted: bool,
    processed: usize,
    failed: usize,
    pending: usize,
}

/// Report status changes until nothing is in flight or `stop` fires.
///
/// Natural completion waits for the refresh that follows the last terminal
/// status, so the tally reflects the server listing. Only an interrupt
/// cancels polling.
async fn follow(
    reconciler: &Reconciler,
    stop: &mut mpsc::UnboundedReceiver<()>,
    pb: &ProgressBar,
) -> Summary {
    let documents = reconciler.documents();
    let mut in_flight = reconciler.subscribe_in_flight();
    let mut updates = documents.subscribe();
    let mut known = statuses(&documents.snapshot());
    set_spinner_message(pb, in_flight.borrow_and_update().len());

    let mut interrupted = loop {
        tokio::select! {
            biased;

            _ = stop.recv() => break true,

            changed = updates.changed() => {
                if changed.is_err() {
                    break false;
                }
                let snapshot = updates.borrow_and_update().clone();
                report_changes(pb, &mut known, &snapshot);
            }

            changed = in_flight.changed() => {
                if changed.is_err() {
                    break false;
                }
                let remaining = in_flight.borrow_and_update().len();
                if remaining == 0 {
                    break false;
                }
                set_spinner_message(pb, remaining);
            }
        }
    };

    if !interrupted {
        pb.set_message("Refreshing document list");
        tokio::select! {
            biased;

            _ = stop.recv() => interrupted = true,
            _ = reconciler.wait_until_idle() => {}
        }
    }
    if interrupted {
        reconciler.stop_all_polling();
    }
    report_changes(pb, &mut known, &documents.snapshot());

    let all = documents.snapshot();
    let processed = count(&all, DocumentStatus::Processed);
    let failed = count(&all, DocumentStatus::Failed);
    Summary {
        interrupted,
        processed,
        failed,
        pending: all.len() - processed - failed,
    }
}

fn set_spinner_message(pb: &ProgressBar, in_flight: usize) {
    pb.set_message(format!("{} document(s) in flight", in_flight));
}

fn statuses(documents: &[Document]) -> HashMap<String, DocumentStatus> {
    documents.iter().map(|d| (d.id.clone(), d.status)).collect()
}

fn count(documents: &[Document], status: DocumentStatus) -> usize {
    documents.iter().filter(|d| d.status == status).count()
}

/// Print every status that differs from what was last seen.
fn report_changes(
    pb: &ProgressBar,
    known: &mut HashMap<String, DocumentStatus>,
    documents: &[Document],
) {
    for doc in documents {
        let previous = known.insert(doc.id.clone(), doc.status);
        if previous == Some(doc.status) {
            continue;
        }
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let transition = match previous {
            Some(previous) => format!("{} -> {}", previous, doc.status),
            None => doc.status.to_string(),
        };
        pb.println(format!("[{}] {}: {}", timestamp, doc.display_name(), transition));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragdesk_core::config::PollingConfig;
    use std::sync::Mutex;

    /// Server where every document is already processed and listing is slow.
    struct SlowListing {
        listed: Vec<Document>,
        lists: Mutex<usize>,
    }

    #[async_trait]
    impl ragdesk_core::DocumentSource for SlowListing {
        async fn fetch_status(&self, id: &str) -> ragdesk_core::Result<Document> {
            Ok(Document::new(id, DocumentStatus::Processed))
        }

        async fn fetch_all(&self) -> ragdesk_core::Result<Vec<Document>> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            *self.lists.lock().unwrap() += 1;
            Ok(self.listed.clone())
        }
    }

    fn reconciler(source: Arc<SlowListing>) -> Reconciler {
        let config = PollingConfig {
            interval_ms: 1000,
            ..Default::default()
        };
        Reconciler::new(source, DocumentCollection::default(), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_counts_refreshed_listing() {
        let source = Arc::new(SlowListing {
            listed: vec![
                Document::new("a", DocumentStatus::Processed),
                Document::new("b", DocumentStatus::Failed),
                Document::new("c", DocumentStatus::Queued),
            ],
            lists: Mutex::new(0),
        });
        let reconciler = reconciler(source.clone());
        let (_stop_tx, mut stop_rx) = mpsc::unbounded_channel();

        reconciler.register_for_polling(["a"]);
        let summary = follow(&reconciler, &mut stop_rx, &ProgressBar::hidden()).await;

        assert_eq!(
            summary,
            Summary {
                interrupted: false,
                processed: 1,
                failed: 1,
                pending: 1,
            }
        );
        assert_eq!(*source.lists.lock().unwrap(), 1);
        assert_eq!(reconciler.documents().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_stops_polling_on_interrupt() {
        let source = Arc::new(SlowListing {
            listed: Vec::new(),
            lists: Mutex::new(0),
        });
        let reconciler = reconciler(source.clone());
        let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();

        reconciler
            .documents()
            .merge(Document::new("a", DocumentStatus::Processing));
        reconciler.register_for_polling(["a"]);
        stop_tx.send(()).unwrap();
        let summary = follow(&reconciler, &mut stop_rx, &ProgressBar::hidden()).await;

        assert!(summary.interrupted);
        assert_eq!(summary.pending, 1);
        assert!(reconciler.in_flight().is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*source.lists.lock().unwrap(), 0);
        assert_eq!(
            reconciler.documents().get("a").map(|d| d.status),
            Some(DocumentStatus::Processing)
        );
    }

    #[test]
    fn test_report_changes_tracks_transitions() {
        let pb = ProgressBar::hidden();
        let mut known = HashMap::new();

        report_changes(&pb, &mut known, &[Document::new("a", DocumentStatus::Queued)]);
        report_changes(&pb, &mut known, &[Document::new("a", DocumentStatus::Processed)]);

        assert_eq!(known.get("a"), Some(&DocumentStatus::Processed));
        let processed = [Document::new("a", DocumentStatus::Processed)];
        assert_eq!(count(&processed, DocumentStatus::Processed), 1);
    }
}
