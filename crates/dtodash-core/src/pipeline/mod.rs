//! Pipeline status estimate for an uploaded document.
//!
//! The ingestion backend runs out-of-band and publishes nothing but its final
//! catalog record, so the dashboard estimates progress: fixed delays move the
//! upload, extraction and persistence stages forward, and a catalog lookup
//! (with a single re-check) confirms persistence. The estimate always reaches
//! a terminal state: after the re-check, or when the lookup fails, persistence
//! is reported ready.
//!
//! Timed work for one upload runs as a task tracked in a [`TimerSet`]. Every
//! reset bumps a run generation; a task from an older generation never
//! mutates the status, even if it was mid-poll when the reset happened.

mod state;
mod timers;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::catalog::CatalogSource;
use crate::config::PipelineTimings;
use crate::store::CatalogStore;

pub use state::{PersistenceCheck, PipelineStatus, Stage, StageStatus};
pub use timers::TimerSet;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A short message for the user (rendered as a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, description)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, description)
    }

    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, description)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, description)
    }

    fn pipeline_complete() -> Self {
        Self::success("Pipeline complete!", "File processed and saved to the catalog")
    }

    fn still_processing() -> Self {
        Self::info(
            "Processing...",
            "File is being processed. Check back in a moment.",
        )
    }
}

#[derive(Debug, Default)]
struct Run {
    status: PipelineStatus,
    file_name: Option<String>,
    generation: u64,
}

struct Shared<C> {
    store: Arc<CatalogStore<C>>,
    timings: PipelineTimings,
    run: Mutex<Run>,
    notify: mpsc::UnboundedSender<Notification>,
}

impl<C: CatalogSource> Shared<C> {
    fn run(&self) -> MutexGuard<'_, Run> {
        // A poisoned lock only means a panic mid-update; the status is still usable.
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn send(&self, notification: Notification) {
        let _ = self.notify.send(notification);
    }

    /// Apply `transition` if `generation` is still current. Returns false for a stale run.
    fn advance(
        &self,
        generation: u64,
        transition: impl FnOnce(PipelineStatus) -> PipelineStatus,
        notification: Option<Notification>,
    ) -> bool {
        let mut run = self.run();
        if run.generation != generation {
            return false;
        }
        run.status = transition(run.status);
        log::debug!("pipeline status: {:?}", run.status);
        drop(run);
        if let Some(n) = notification {
            self.send(n);
        }
        true
    }

    /// Refresh the cached catalog, then look for `file_name` in a fresh listing.
    async fn check_persisted(&self, file_name: &str) -> Result<bool, crate::CoreError> {
        self.store.refetch().await;
        let items = self.store.source().fetch_items().await?;
        Ok(items.iter().any(|item| item.file_name == file_name))
    }

    async fn lookup_failed(&self, generation: u64, err: crate::CoreError) {
        log::error!("error checking catalog for uploaded file: {err}");
        self.store.refetch().await;
        self.advance(
            generation,
            |s| s.persistence_check_resolved(PersistenceCheck::LookupFailed),
            Some(Notification::warning(
                "Catalog check failed",
                format!("{err}. The document list will update once processing finishes."),
            )),
        );
    }
}

/// Timed sequence for one upload.
async fn drive<C: CatalogSource>(shared: Arc<Shared<C>>, generation: u64, file_name: String) {
    let timings = shared.timings;

    tokio::time::sleep(timings.extraction_start_delay).await;
    if !shared.advance(generation, PipelineStatus::extraction_started, None) {
        return;
    }
    log::info!("extraction running for {file_name}");

    tokio::time::sleep(timings.extraction_duration).await;
    if !shared.advance(generation, PipelineStatus::extraction_elapsed, None) {
        return;
    }

    match shared.check_persisted(&file_name).await {
        Ok(true) => {
            log::info!("{file_name} found in catalog");
            shared.advance(
                generation,
                |s| s.persistence_check_resolved(PersistenceCheck::Found),
                Some(Notification::pipeline_complete()),
            );
            return;
        }
        Ok(false) => {
            let missing = PersistenceCheck::Missing {
                retry_pending: true,
            };
            if !shared.advance(generation, |s| s.persistence_check_resolved(missing), None) {
                return;
            }
        }
        Err(err) => {
            shared.lookup_failed(generation, err).await;
            return;
        }
    }

    log::info!(
        "{file_name} not in catalog yet, re-checking in {:?}",
        timings.retry_delay
    );
    tokio::time::sleep(timings.retry_delay).await;

    match shared.check_persisted(&file_name).await {
        Ok(true) => {
            log::info!("{file_name} found in catalog on re-check");
            shared.advance(
                generation,
                |s| s.persistence_check_resolved(PersistenceCheck::Found),
                Some(Notification::pipeline_complete()),
            );
        }
        Ok(false) => {
            log::info!("{file_name} still not in catalog; reporting ready");
            let gave_up = PersistenceCheck::Missing {
                retry_pending: false,
            };
            shared.advance(
                generation,
                |s| s.persistence_check_resolved(gave_up),
                Some(Notification::still_processing()),
            );
        }
        Err(err) => shared.lookup_failed(generation, err).await,
    }
}

/// Drives [`PipelineStatus`] through the upload, extraction and persistence stages.
pub struct PipelineSimulator<C> {
    shared: Arc<Shared<C>>,
    timers: Mutex<TimerSet>,
}

impl<C: CatalogSource + 'static> PipelineSimulator<C> {
    pub fn new(
        store: Arc<CatalogStore<C>>,
        timings: PipelineTimings,
        notify: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                timings,
                run: Mutex::new(Run::default()),
                notify,
            }),
            timers: Mutex::new(TimerSet::new()),
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.shared.run().status
    }

    /// Name of the file the current run is tracking, if any.
    pub fn file_name(&self) -> Option<String> {
        self.shared.run().file_name.clone()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers().pending()
    }

    pub fn timings(&self) -> PipelineTimings {
        self.shared.timings
    }

    fn timers(&self) -> MutexGuard<'_, TimerSet> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel pending work and start a new generation with the given status.
    ///
    /// The timers lock is taken before the run lock everywhere.
    fn reset(
        &self,
        timers: &mut TimerSet,
        transition: impl FnOnce(PipelineStatus) -> PipelineStatus,
        file_name: Option<String>,
    ) -> u64 {
        timers.cancel_all();
        let mut run = self.shared.run();
        run.generation += 1;
        run.status = transition(run.status);
        run.file_name = file_name;
        run.generation
    }

    pub fn on_upload_start(&self) {
        let mut timers = self.timers();
        self.reset(&mut timers, PipelineStatus::start_upload, None);
    }

    pub fn on_upload_success(&self, file_name: &str) {
        let mut timers = self.timers();
        let generation = self.reset(
            &mut timers,
            PipelineStatus::upload_succeeded,
            Some(file_name.to_string()),
        );
        log::info!("upload of {file_name} complete; tracking pipeline");
        timers.spawn(drive(self.shared.clone(), generation, file_name.to_string()));
    }

    /// Return to idle after a failed upload without announcing a clear.
    pub fn on_upload_failed(&self) {
        let mut timers = self.timers();
        self.reset(&mut timers, PipelineStatus::clear, None);
    }

    pub fn on_clear(&self) {
        let mut timers = self.timers();
        self.reset(&mut timers, PipelineStatus::clear, None);
        drop(timers);
        self.shared.send(Notification::info("Cleared", "Upload cleared"));
    }

    /// Cancel all pending work. No transition fires afterwards.
    pub fn shutdown(&self) {
        let mut timers = self.timers();
        timers.cancel_all();
        self.shared.run().generation += 1;
    }
}

impl<C> Drop for PipelineSimulator<C> {
    fn drop(&mut self) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.cancel_all();
        let mut run = self.shared.run.lock().unwrap_or_else(|e| e.into_inner());
        run.generation += 1;
    }
}
