use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use dtodash_core::{
    CatalogRecord, CatalogSource, CatalogStore, CoreError, Notification, NotificationLevel,
    PipelineSimulator, PipelineStatus, PipelineTimings, StageStatus,
};

use StageStatus::{Idle, Ready, Running};

/// Catalog whose listing contains `file_name` once `visible_from` fetches have happened.
/// Every fetch from `fail_from` on returns an error.
struct FakeCatalog {
    file_name: &'static str,
    visible_from: Option<usize>,
    fail_from: Option<usize>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    fn new(file_name: &'static str, visible_from: Option<usize>) -> Self {
        Self {
            file_name,
            visible_from,
            fail_from: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self::failing_from(0)
    }

    fn failing_from(call: usize) -> Self {
        Self {
            fail_from: Some(call),
            ..Self::new("doc.pdf", None)
        }
    }
}

impl CatalogSource for FakeCatalog {
    async fn fetch_items(&self) -> Result<Vec<CatalogRecord>, CoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|from| call >= from) {
            return Err(CoreError::RemoteFetch {
                status: Some(502),
                message: "Bad Gateway".into(),
            });
        }
        match self.visible_from {
            Some(from) if call >= from => Ok(vec![CatalogRecord {
                id: "rec-1".into(),
                file_name: self.file_name.into(),
                ..CatalogRecord::default()
            }]),
            _ => Ok(Vec::new()),
        }
    }
}

struct Harness {
    store: Arc<CatalogStore<FakeCatalog>>,
    sim: PipelineSimulator<FakeCatalog>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    start: Instant,
}

impl Harness {
    fn new(catalog: FakeCatalog) -> Self {
        let store = Arc::new(CatalogStore::new(catalog));
        let (tx, notifications) = mpsc::unbounded_channel();
        let sim = PipelineSimulator::new(store.clone(), PipelineTimings::default(), tx);
        Self {
            store,
            sim,
            notifications,
            start: Instant::now(),
        }
    }

    async fn at_ms(&self, ms: u64) {
        sleep_until(self.start + Duration::from_millis(ms)).await;
    }

    fn calls(&self) -> usize {
        self.store.source().calls.load(Ordering::SeqCst)
    }

    fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }
}

fn status(
    upload: StageStatus,
    extraction: StageStatus,
    persistence: StageStatus,
) -> PipelineStatus {
    PipelineStatus {
        upload,
        extraction,
        persistence,
    }
}

fn titles(notifications: &[Notification]) -> Vec<&str> {
    notifications.iter().map(|n| n.title.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn upload_start_marks_upload_running() {
    let h = Harness::new(FakeCatalog::new("doc.pdf", Some(0)));
    assert_eq!(h.sim.status(), PipelineStatus::IDLE);
    h.sim.on_upload_start();
    assert_eq!(h.sim.status(), status(Running, Idle, Idle));
}

#[tokio::test(start_paused = true)]
async fn immediate_match_completes_after_extraction() {
    let mut h = Harness::new(FakeCatalog::new("doc.pdf", Some(0)));
    h.sim.on_upload_start();
    h.sim.on_upload_success("doc.pdf");
    assert_eq!(h.sim.status(), status(Ready, Idle, Idle));
    assert_eq!(h.sim.file_name().as_deref(), Some("doc.pdf"));

    h.at_ms(1_400).await;
    assert_eq!(h.sim.status(), status(Ready, Idle, Idle));

    h.at_ms(1_600).await;
    assert_eq!(h.sim.status(), status(Ready, Running, Idle));

    h.at_ms(11_400).await;
    assert_eq!(h.sim.status(), status(Ready, Running, Idle));
    assert_eq!(h.calls(), 0);

    h.at_ms(11_600).await;
    assert!(h.sim.status().is_complete());
    assert_eq!(h.sim.pending_timers(), 0);
    // one refetch of the cached list plus one lookup
    assert_eq!(h.calls(), 2);
    assert!(h.store.snapshot().catalog.find_by_file_name("doc.pdf").is_some());

    let sent = h.drain();
    assert_eq!(titles(&sent), vec!["Pipeline complete!"]);
    assert_eq!(sent[0].level, NotificationLevel::Success);

    h.at_ms(60_000).await;
    assert_eq!(h.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn record_found_on_retry() {
    let mut h = Harness::new(FakeCatalog::new("doc.pdf", Some(2)));
    h.sim.on_upload_success("doc.pdf");

    h.at_ms(11_600).await;
    assert_eq!(h.sim.status(), status(Ready, Ready, Running));
    assert_eq!(h.calls(), 2);
    assert!(h.drain().is_empty());

    h.at_ms(13_400).await;
    assert_eq!(h.sim.status().persistence, Running);

    h.at_ms(13_600).await;
    assert!(h.sim.status().is_complete());
    assert_eq!(h.calls(), 4);
    assert_eq!(titles(&h.drain()), vec!["Pipeline complete!"]);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_single_retry() {
    let mut h = Harness::new(FakeCatalog::new("doc.pdf", None));
    h.sim.on_upload_success("doc.pdf");

    h.at_ms(13_600).await;
    assert_eq!(h.sim.status(), status(Ready, Ready, Ready));
    assert_eq!(h.sim.pending_timers(), 0);

    let sent = h.drain();
    assert_eq!(titles(&sent), vec!["Processing..."]);
    assert_eq!(sent[0].level, NotificationLevel::Info);

    let calls = h.calls();
    h.at_ms(120_000).await;
    assert_eq!(h.calls(), calls);
    assert_eq!(h.sim.status(), status(Ready, Ready, Ready));
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn lookup_failure_fails_open() {
    let mut h = Harness::new(FakeCatalog::failing());
    h.sim.on_upload_success("doc.pdf");

    h.at_ms(11_600).await;
    assert_eq!(h.sim.status(), status(Ready, Ready, Ready));
    // refetch, failed lookup, then a refetch to keep the list current
    assert_eq!(h.calls(), 3);
    assert!(h.store.snapshot().error.is_some());

    let sent = h.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].level, NotificationLevel::Warning);
    assert!(sent[0].description.contains("502"));

    h.at_ms(30_000).await;
    assert_eq!(h.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_lookup_failure_fails_open() {
    // first refetch and lookup miss; everything from the re-check on errors
    let mut h = Harness::new(FakeCatalog::failing_from(2));
    h.sim.on_upload_success("doc.pdf");

    h.at_ms(11_600).await;
    assert_eq!(h.sim.status(), status(Ready, Ready, Running));
    assert_eq!(h.calls(), 2);
    assert!(h.drain().is_empty());

    h.at_ms(13_400).await;
    assert_eq!(h.sim.status().persistence, Running);

    h.at_ms(13_600).await;
    assert_eq!(h.sim.status(), status(Ready, Ready, Ready));
    assert_eq!(h.sim.pending_timers(), 0);
    // refetch, failed re-check, then the refetch after the failure
    assert_eq!(h.calls(), 5);

    let sent = h.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].level, NotificationLevel::Warning);
    assert_eq!(sent[0].title, "Catalog check failed");

    h.at_ms(120_000).await;
    assert_eq!(h.calls(), 5);
    assert_eq!(h.sim.status(), status(Ready, Ready, Ready));
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn clear_during_extraction_cancels_everything() {
    let mut h = Harness::new(FakeCatalog::new("doc.pdf", Some(0)));
    h.sim.on_upload_success("doc.pdf");

    h.at_ms(5_000).await;
    assert_eq!(h.sim.status(), status(Ready, Running, Idle));
    h.sim.on_clear();
    assert_eq!(h.sim.status(), PipelineStatus::IDLE);
    assert_eq!(h.sim.file_name(), None);

    h.at_ms(60_000).await;
    assert_eq!(h.sim.status(), PipelineStatus::IDLE);
    assert_eq!(h.calls(), 0);
    assert_eq!(titles(&h.drain()), vec!["Cleared"]);
}

#[tokio::test(start_paused = true)]
async fn clear_during_retry_wait_cancels_retry() {
    let mut h = Harness::new(FakeCatalog::new("doc.pdf", None));
    h.sim.on_upload_success("doc.pdf");

    h.at_ms(12_500).await;
    assert_eq!(h.sim.status().persistence, Running);
    h.sim.on_clear();
    h.sim.on_clear();

    h.at_ms(60_000).await;
    assert_eq!(h.sim.status(), PipelineStatus::IDLE);
    assert_eq!(h.calls(), 2);
    assert_eq!(titles(&h.drain()), vec!["Cleared", "Cleared"]);
}

#[tokio::test(start_paused = true)]
async fn second_upload_supersedes_first() {
    let mut h = Harness::new(FakeCatalog::new("second.pdf", Some(0)));
    h.sim.on_upload_success("first.pdf");

    h.at_ms(1_000).await;
    h.sim.on_upload_success("second.pdf");

    // the first run's extraction timer would have fired here
    h.at_ms(1_600).await;
    assert_eq!(h.sim.status(), status(Ready, Idle, Idle));

    h.at_ms(2_600).await;
    assert_eq!(h.sim.status(), status(Ready, Running, Idle));

    h.at_ms(11_600).await;
    assert_eq!(h.calls(), 0);

    h.at_ms(12_600).await;
    assert!(h.sim.status().is_complete());
    assert_eq!(h.calls(), 2);
    assert_eq!(titles(&h.drain()), vec!["Pipeline complete!"]);

    h.at_ms(60_000).await;
    assert_eq!(h.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_upload_returns_to_idle() {
    let mut h = Harness::new(FakeCatalog::new("doc.pdf", Some(0)));
    h.sim.on_upload_start();
    h.sim.on_upload_failed();
    assert_eq!(h.sim.status(), PipelineStatus::IDLE);
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_simulator_stops_timers() {
    let h = Harness::new(FakeCatalog::new("doc.pdf", Some(0)));
    let Harness {
        store,
        sim,
        mut notifications,
        start,
    } = h;
    sim.on_upload_success("doc.pdf");

    sleep_until(start + Duration::from_millis(5_000)).await;
    drop(sim);

    sleep_until(start + Duration::from_millis(60_000)).await;
    assert_eq!(store.source().calls.load(Ordering::SeqCst), 0);
    assert!(notifications.try_recv().is_err());
}
