//! Per-document polling tasks and their bookkeeping.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::PollingConfig;
use crate::error::Result;
use crate::types::{Document, DocumentStatus};

use super::{DocumentCollection, DocumentSource};

/// Decides whether a document needs no further polling.
pub type TerminalPredicate = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Bookkeeping for one document under polling.
///
/// The cancellation token and task never leave the reconciler.
#[derive(Debug)]
pub struct PollRegistration {
    document_id: String,
    serial: u64,
    cancel: CancellationToken,
    last_observed: DocumentStatus,
}

impl PollRegistration {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Status from the most recent successful fetch (or the status known at
    /// registration time).
    pub fn last_observed(&self) -> DocumentStatus {
        self.last_observed
    }
}

/// What a poll task does after handling one fetch.
enum TickOutcome {
    /// Still in flight; wait for the next interval
    Continue,
    /// Deregistered. `refresh` is set when this emptied the in-flight set.
    Done { refresh: bool },
}

/// Keeps in-flight documents under periodic status checks.
///
/// Each registered document gets exactly one tokio task that sleeps for
/// the polling interval, fetches, merges, and repeats until the document
/// reaches a terminal status, its fetch fails, or polling is stopped.
/// Cloning yields another handle to the same reconciler; dropping the last
/// handle stops all polling.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn DocumentSource>,
    documents: DocumentCollection,
    /// Mutated only while holding `registrations`
    in_flight: watch::Sender<BTreeSet<String>>,
    /// Refreshes triggered by an emptied in-flight set that have not finished
    refreshing: watch::Sender<usize>,
    registrations: Mutex<HashMap<String, PollRegistration>>,
    interval: Duration,
    status_retries: u32,
    is_terminal: TerminalPredicate,
    next_serial: AtomicU64,
    /// Bumped by `stop_all_polling` so in-progress refreshes don't write back
    epoch: AtomicU64,
}

impl Reconciler {
    /// Create a reconciler that treats `Processed` and `Failed` as terminal.
    pub fn new(
        source: Arc<dyn DocumentSource>,
        documents: DocumentCollection,
        config: &PollingConfig,
    ) -> Self {
        Self::with_terminal_predicate(
            source,
            documents,
            config,
            Arc::new(|doc: &Document| doc.status.is_terminal()),
        )
    }

    /// Create a reconciler with a custom terminal-status predicate.
    pub fn with_terminal_predicate(
        source: Arc<dyn DocumentSource>,
        documents: DocumentCollection,
        config: &PollingConfig,
        is_terminal: TerminalPredicate,
    ) -> Self {
        let (in_flight, _rx) = watch::channel(BTreeSet::new());
        let (refreshing, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                source,
                documents,
                in_flight,
                refreshing,
                registrations: Mutex::new(HashMap::new()),
                interval: config.interval(),
                status_retries: config.status_retries,
                is_terminal,
                next_serial: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Start polling every id that isn't already being polled.
    ///
    /// Returns how many ids were newly registered. Must be called from
    /// within a tokio runtime.
    pub fn register_for_polling<I, S>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = Vec::new();
        {
            let mut registrations = self.inner.registrations();
            for id in ids {
                let id: String = id.into();
                if registrations.contains_key(&id) {
                    tracing::debug!(document_id = %id, "Already polling");
                    continue;
                }

                let serial = self.inner.next_serial.fetch_add(1, Ordering::Relaxed);
                let cancel = CancellationToken::new();
                let last_observed = self
                    .inner
                    .documents
                    .get(&id)
                    .map(|d| d.status)
                    .unwrap_or(DocumentStatus::Queued);

                tokio::spawn(poll_loop(
                    Arc::downgrade(&self.inner),
                    id.clone(),
                    serial,
                    cancel.clone(),
                ));

                registrations.insert(
                    id.clone(),
                    PollRegistration {
                        document_id: id.clone(),
                        serial,
                        cancel,
                        last_observed,
                    },
                );
                added.push(id);
            }

            if !added.is_empty() {
                self.inner
                    .in_flight
                    .send_modify(|set| set.extend(added.iter().cloned()));
            }
        }

        if !added.is_empty() {
            tracing::info!(count = added.len(), ids = ?added, "Polling documents");
        }
        added.len()
    }

    /// Cancel every poll and forget all registrations.
    pub fn stop_all_polling(&self) {
        self.inner.stop_all();
    }

    /// Initial discovery: load the full list and poll every document that
    /// is not yet terminal.
    ///
    /// Returns how many documents were registered.
    pub async fn load(&self) -> Result<usize> {
        let documents = self.inner.source.fetch_all().await?;
        let pending: Vec<String> = documents
            .iter()
            .filter(|d| !(self.inner.is_terminal)(*d))
            .map(|d| d.id.clone())
            .collect();

        tracing::debug!(
            total = documents.len(),
            pending = pending.len(),
            "Loaded documents"
        );
        self.inner.documents.replace_all(documents);
        Ok(self.register_for_polling(pending))
    }

    /// Reload the full list without registering anything.
    pub async fn refresh(&self) -> Result<()> {
        self.inner.refresh().await
    }

    /// Ids currently being polled.
    pub fn in_flight(&self) -> BTreeSet<String> {
        self.inner.in_flight.borrow().clone()
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.inner.in_flight.borrow().contains(id)
    }

    /// Resolves once nothing is in flight and the refresh triggered by the
    /// last document leaving the in-flight set has been applied (or failed).
    pub async fn wait_until_idle(&self) {
        let mut in_flight = self.inner.in_flight.subscribe();
        let mut refreshing = self.inner.refreshing.subscribe();

        loop {
            let idle = in_flight.borrow_and_update().is_empty()
                && *refreshing.borrow_and_update() == 0;
            if idle {
                return;
            }
            tokio::select! {
                changed = in_flight.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                changed = refreshing.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Watch the in-flight set, e.g. to drive progress indicators.
    pub fn subscribe_in_flight(&self) -> watch::Receiver<BTreeSet<String>> {
        self.inner.in_flight.subscribe()
    }

    /// Last observed status of a document under polling.
    pub fn last_observed(&self, id: &str) -> Option<DocumentStatus> {
        self.inner.registrations().get(id).map(|r| r.last_observed())
    }

    pub fn registration_count(&self) -> usize {
        self.inner.registrations().len()
    }

    pub fn documents(&self) -> &DocumentCollection {
        &self.inner.documents
    }
}

impl Inner {
    fn registrations(&self) -> MutexGuard<'_, HashMap<String, PollRegistration>> {
        // Nothing panics while holding the lock; recover the data if it ever does
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stop_all(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let drained: Vec<PollRegistration> = {
            let mut registrations = self.registrations();
            self.in_flight.send_if_modified(|set| {
                let changed = !set.is_empty();
                set.clear();
                changed
            });
            registrations.drain().map(|(_, r)| r).collect()
        };
        for registration in &drained {
            registration.cancel.cancel();
        }
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Stopped all document polling");
        }
    }

    async fn refresh(&self) -> Result<()> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let documents = self.source.fetch_all().await?;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::debug!("Polling stopped during refresh, discarding result");
            return Ok(());
        }
        tracing::debug!(total = documents.len(), "Refreshed documents");
        self.documents.replace_all(documents);
        Ok(())
    }

    /// Fetch one status, retrying transient failures with exponential backoff.
    async fn fetch_with_retry(&self, id: &str) -> Result<Document> {
        let mut delay = Duration::from_millis(500);
        let mut attempt = 0;

        loop {
            match self.source.fetch_status(id).await {
                Ok(document) => return Ok(document),
                Err(e) if attempt < self.status_retries && e.is_transient() => {
                    attempt += 1;
                    tracing::debug!(
                        document_id = %id,
                        attempt,
                        max_retries = self.status_retries,
                        ?delay,
                        error = %e,
                        "Retrying status fetch"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply one fetch result for `id`, unless its registration was replaced
    /// or removed in the meantime.
    fn apply(&self, id: &str, serial: u64, result: Result<Document>) -> TickOutcome {
        let mut registrations = self.registrations();
        match registrations.get(id) {
            Some(r) if r.serial == serial => {}
            _ => return TickOutcome::Done { refresh: false },
        }

        let finished = match result {
            Ok(document) => {
                let terminal = (self.is_terminal)(&document);
                let status = document.status;
                if let Some(registration) = registrations.get_mut(id) {
                    registration.last_observed = status;
                }
                self.documents.merge(document);

                if terminal {
                    tracing::info!(document_id = %id, %status, "Document finished processing");
                } else {
                    tracing::trace!(document_id = %id, %status, "Document still in flight");
                }
                terminal
            }
            Err(e) => {
                tracing::warn!(
                    document_id = %id,
                    error = %e,
                    "Status fetch failed, no longer polling document"
                );
                true
            }
        };

        if !finished {
            return TickOutcome::Continue;
        }

        registrations.remove(id);

        let emptied = {
            let set = self.in_flight.borrow();
            set.len() == 1 && set.contains(id)
        };
        if emptied {
            // Raised before the set empties so idle waiters never see a gap
            self.refreshing.send_modify(|n| *n += 1);
        }
        self.in_flight.send_if_modified(|set| set.remove(id));
        drop(registrations);

        TickOutcome::Done { refresh: emptied }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Poll one document until it is deregistered.
///
/// Holds only a weak reference between ticks so that dropping the
/// reconciler ends the task.
async fn poll_loop(inner: Weak<Inner>, id: String, serial: u64, cancel: CancellationToken) {
    let Some(interval) = inner.upgrade().map(|i| i.interval) else {
        return;
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let Some(inner) = inner.upgrade() else {
            return;
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = inner.fetch_with_retry(&id) => result,
        };

        if cancel.is_cancelled() {
            return;
        }

        match inner.apply(&id, serial, result) {
            TickOutcome::Continue => {}
            TickOutcome::Done { refresh } => {
                if refresh {
                    tracing::debug!("No documents in flight, refreshing list");
                    if let Err(e) = inner.refresh().await {
                        tracing::warn!(error = %e, "Failed to refresh documents");
                    }
                    inner.refreshing.send_modify(|n| *n = n.saturating_sub(1));
                }
                return;
            }
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("in_flight", &*self.inner.in_flight.borrow())
            .field("interval", &self.inner.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    const INTERVAL: Duration = Duration::from_millis(3000);

    #[derive(Clone, Copy)]
    enum Reply {
        Status(DocumentStatus),
        Fail,
    }

    /// In-memory source with scripted replies per id. The last reply repeats.
    #[derive(Default)]
    struct FakeSource {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        calls: Mutex<Vec<String>>,
        all: Mutex<Vec<Document>>,
        fetch_all_calls: AtomicUsize,
        list_delay: Duration,
    }

    impl FakeSource {
        fn script(self, id: &str, replies: &[Reply]) -> Self {
            self.replies
                .lock()
                .unwrap()
                .insert(id.to_string(), replies.iter().copied().collect());
            self
        }

        fn with_all(self, documents: Vec<Document>) -> Self {
            *self.all.lock().unwrap() = documents;
            self
        }

        fn with_list_delay(mut self, delay: Duration) -> Self {
            self.list_delay = delay;
            self
        }

        fn calls_for(&self, id: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DocumentSource for FakeSource {
        async fn fetch_status(&self, id: &str) -> Result<Document> {
            self.calls.lock().unwrap().push(id.to_string());
            let reply = {
                let mut replies = self.replies.lock().unwrap();
                let queue = replies.entry(id.to_string()).or_default();
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().copied()
                }
            };
            match reply.unwrap_or(Reply::Status(DocumentStatus::Processing)) {
                Reply::Status(status) => Ok(Document::new(id, status)),
                Reply::Fail => Err(Error::Http("connection refused".to_string())),
            }
        }

        async fn fetch_all(&self) -> Result<Vec<Document>> {
            self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
            if !self.list_delay.is_zero() {
                tokio::time::sleep(self.list_delay).await;
            }
            Ok(self.all.lock().unwrap().clone())
        }
    }

    fn reconciler(source: &Arc<FakeSource>) -> Reconciler {
        reconciler_with(source, PollingConfig::default())
    }

    fn reconciler_with(source: &Arc<FakeSource>, config: PollingConfig) -> Reconciler {
        let source: Arc<dyn DocumentSource> = source.clone();
        Reconciler::new(source, DocumentCollection::default(), &config)
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    async fn one_interval() {
        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_document_leaves_in_flight() {
        let source = Arc::new(
            FakeSource::default()
                .script("a", &[Reply::Status(DocumentStatus::Processing)])
                .script("b", &[Reply::Status(DocumentStatus::Failed)])
                .script("c", &[Reply::Status(DocumentStatus::Processing)]),
        );
        let reconciler = reconciler(&source);

        assert_eq!(reconciler.register_for_polling(["a", "b", "c"]), 3);
        assert_eq!(reconciler.in_flight(), ids(&["a", "b", "c"]));

        one_interval().await;

        assert_eq!(reconciler.in_flight(), ids(&["a", "c"]));
        assert_eq!(
            reconciler.documents().get("b").map(|d| d.status),
            Some(DocumentStatus::Failed)
        );
        assert_eq!(
            reconciler.last_observed("a"),
            Some(DocumentStatus::Processing)
        );

        one_interval().await;
        assert_eq!(source.calls_for("b"), 1);
        assert_eq!(source.calls_for("a"), 2);
        // a and c are still in flight, so no refresh yet
        assert_eq!(source.fetch_all_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_twice_polls_once() {
        let source = Arc::new(FakeSource::default());
        let reconciler = reconciler(&source);

        assert_eq!(reconciler.register_for_polling(["a"]), 1);
        assert_eq!(reconciler.register_for_polling(["a", "a"]), 0);
        assert_eq!(reconciler.registration_count(), 1);

        one_interval().await;
        assert_eq!(source.calls_for("a"), 1);

        one_interval().await;
        assert_eq!(source.calls_for("a"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_stops_polling_and_refreshes() {
        let source = Arc::new(
            FakeSource::default()
                .script(
                    "a",
                    &[
                        Reply::Status(DocumentStatus::Processing),
                        Reply::Status(DocumentStatus::Processed),
                    ],
                )
                .with_all(vec![
                    Document::new("a", DocumentStatus::Processed),
                    Document::new("z", DocumentStatus::Processed),
                ]),
        );
        let reconciler = reconciler(&source);
        let mut in_flight = reconciler.subscribe_in_flight();

        reconciler.register_for_polling(["a"]);
        in_flight.borrow_and_update();

        one_interval().await;
        assert!(reconciler.is_in_flight("a"));

        one_interval().await;
        assert!(!reconciler.is_in_flight("a"));
        assert!(in_flight.has_changed().unwrap());
        assert_eq!(reconciler.registration_count(), 0);

        // Emptying the in-flight set triggers a full refresh
        assert_eq!(source.fetch_all_calls.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.documents().len(), 2);

        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(source.calls_for("a"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_abandons_document() {
        let source = Arc::new(
            FakeSource::default()
                .script(
                    "a",
                    &[Reply::Status(DocumentStatus::Processing), Reply::Fail],
                )
                .script("b", &[Reply::Status(DocumentStatus::Processing)]),
        );
        let reconciler = reconciler(&source);
        reconciler.register_for_polling(["a", "b"]);

        one_interval().await;
        one_interval().await;

        assert_eq!(reconciler.in_flight(), ids(&["b"]));
        // Last known status survives
        assert_eq!(
            reconciler.documents().get("a").map(|d| d.status),
            Some(DocumentStatus::Processing)
        );

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(source.calls_for("a"), 2);
        assert!(source.calls_for("b") >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_transient_failure() {
        let source = Arc::new(
            FakeSource::default()
                .script(
                    "a",
                    &[Reply::Fail, Reply::Status(DocumentStatus::Processed)],
                )
                .with_all(vec![Document::new("a", DocumentStatus::Processed)]),
        );
        let config = PollingConfig {
            status_retries: 2,
            ..Default::default()
        };
        let reconciler = reconciler_with(&source, config);
        reconciler.register_for_polling(["a"]);

        tokio::time::sleep(INTERVAL + Duration::from_millis(600)).await;

        assert_eq!(source.calls_for("a"), 2);
        assert!(!reconciler.is_in_flight("a"));
        assert_eq!(
            reconciler.documents().get("a").map(|d| d.status),
            Some(DocumentStatus::Processed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_polling() {
        let source = Arc::new(FakeSource::default());
        let reconciler = reconciler(&source);

        // Safe with nothing registered
        reconciler.stop_all_polling();

        reconciler.register_for_polling(["a", "b"]);
        reconciler.stop_all_polling();

        assert!(reconciler.in_flight().is_empty());
        assert_eq!(reconciler.registration_count(), 0);

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(source.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reregister_after_stop_starts_fresh() {
        let source = Arc::new(FakeSource::default());
        let reconciler = reconciler(&source);

        reconciler.register_for_polling(["a"]);
        tokio::time::sleep(INTERVAL / 2).await;
        reconciler.stop_all_polling();
        reconciler.register_for_polling(["a"]);

        one_interval().await;
        // Only the new registration fired, a full interval after it was made
        assert_eq!(source.calls_for("a"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_reconciler_stops_polling() {
        let source = Arc::new(FakeSource::default());
        let reconciler = reconciler(&source);
        reconciler.register_for_polling(["a"]);
        drop(reconciler);

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(source.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_registers_unfinished_documents() {
        let source = Arc::new(FakeSource::default().with_all(vec![
            Document::new("a", DocumentStatus::Processing),
            Document::new("b", DocumentStatus::Processed),
            Document::new("c", DocumentStatus::Queued),
            Document::new("d", DocumentStatus::Failed),
        ]));
        let reconciler = reconciler(&source);

        assert_eq!(reconciler.load().await.unwrap(), 2);
        assert_eq!(reconciler.in_flight(), ids(&["a", "c"]));
        assert_eq!(reconciler.documents().len(), 4);
        assert_eq!(
            reconciler.last_observed("c"),
            Some(DocumentStatus::Queued)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_terminal_predicate() {
        let source = Arc::new(
            FakeSource::default().script("a", &[Reply::Status(DocumentStatus::Queued)]),
        );
        let source_dyn: Arc<dyn DocumentSource> = source.clone();
        let reconciler = Reconciler::with_terminal_predicate(
            source_dyn,
            DocumentCollection::default(),
            &PollingConfig::default(),
            Arc::new(|doc: &Document| doc.status != DocumentStatus::Processing),
        );
        reconciler.register_for_polling(["a"]);

        one_interval().await;
        assert!(reconciler.in_flight().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_idle_includes_refresh() {
        let source = Arc::new(
            FakeSource::default()
                .script("a", &[Reply::Status(DocumentStatus::Processed)])
                .with_all(vec![
                    Document::new("a", DocumentStatus::Processed),
                    Document::new("z", DocumentStatus::Processed),
                ])
                .with_list_delay(Duration::from_millis(500)),
        );
        let reconciler = reconciler(&source);
        reconciler.register_for_polling(["a"]);

        let started = tokio::time::Instant::now();
        reconciler.wait_until_idle().await;
        assert!(tokio::time::Instant::now() - started >= INTERVAL + Duration::from_millis(500));

        // Stopping after idle must not discard the refreshed list
        reconciler.stop_all_polling();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(source.fetch_all_calls.load(Ordering::SeqCst), 1);
        let ids: Vec<String> = reconciler
            .documents()
            .snapshot()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a", "z"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_idle_returns_when_nothing_registered() {
        let source = Arc::new(FakeSource::default());
        reconciler(&source).wait_until_idle().await;
        assert_eq!(source.fetch_all_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_matches_registrations_under_contention() {
        let source = Arc::new(FakeSource::default());
        let reconciler = reconciler(&source);

        let mut workers = Vec::new();
        for worker in 0..4 {
            let reconciler = reconciler.clone();
            workers.push(tokio::spawn(async move {
                for round in 0..200 {
                    if (round + worker) % 3 == 0 {
                        reconciler.stop_all_polling();
                    } else {
                        reconciler.register_for_polling(["a", "b", "c"]);
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        let in_flight = reconciler.in_flight();
        assert_eq!(in_flight.len(), reconciler.registration_count());
        for id in &in_flight {
            assert!(reconciler.last_observed(id).is_some(), "{} has no registration", id);
        }

        reconciler.stop_all_polling();
        assert!(reconciler.in_flight().is_empty());
    }
}
