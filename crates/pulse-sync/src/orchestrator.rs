//! Per-source sync scheduling with a single in-flight lock.

use futures::FutureExt;
use pulse_core::{
    Clock, FreshnessVerdict, PulseError, StatusStore, SyncScheduleEntry, SyncStatusRecord,
    SyncTask, observe,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, info, instrument, warn};

use crate::{
    freshness::{FreshnessBoard, SourceDisplay, classify},
    lock::SyncLock,
    scheduler::{CancelHandle, Job, Scheduler},
};

struct Source {
    entry: SyncScheduleEntry,
    task: Arc<dyn SyncTask>,
}

/// Runs registered [`SyncTask`]s on their schedules and records the outcome
/// of every attempt in a [`StatusStore`].
///
/// At most one sync runs at a time across every source sharing the
/// orchestrator's [`SyncLock`]. A sync requested while the lock is held is
/// rejected with a `Pending` record and leaves the stored record untouched.
pub struct SyncOrchestrator {
    sources: Vec<Source>,
    displays: HashMap<String, SourceDisplay>,
    status: Arc<dyn StatusStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    lock: SyncLock,
    timers: Mutex<HashMap<String, CancelHandle>>,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field(
                "sources",
                &self.sources.iter().map(|s| &s.entry.source).collect::<Vec<_>>(),
            )
            .field("scheduler", &self.scheduler)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    /// Create an orchestrator with no sources and its own lock.
    #[must_use]
    pub fn new(
        status: Arc<dyn StatusStore>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sources: Vec::new(),
            displays: HashMap::new(),
            status,
            scheduler,
            clock,
            lock: SyncLock::new(),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Shares `lock` with other orchestrators.
    #[must_use]
    pub fn with_lock(mut self, lock: SyncLock) -> Self {
        self.lock = lock;
        self
    }

    /// Registers `task` under `entry.source`, replacing any previous task
    /// for that source.
    #[must_use]
    pub fn with_source(mut self, entry: SyncScheduleEntry, task: Arc<dyn SyncTask>) -> Self {
        self.sources.retain(|s| s.entry.source != entry.source);
        self.sources.push(Source { entry, task });
        self
    }

    /// Display name shown for `source` on the freshness board.
    #[must_use]
    pub fn with_display(mut self, source: impl Into<String>, name: impl Into<String>) -> Self {
        let source = source.into();
        if let Some(entry) = self.entry(&source) {
            let display = SourceDisplay::new(name, entry.frequency);
            self.displays.insert(source, display);
        }
        self
    }

    /// The schedule, in registration order.
    #[must_use]
    pub fn schedule(&self) -> Vec<SyncScheduleEntry> {
        self.sources.iter().map(|s| s.entry.clone()).collect()
    }

    /// The lock guarding syncs.
    #[must_use]
    pub const fn lock(&self) -> &SyncLock {
        &self.lock
    }

    fn entry(&self, source: &str) -> Option<&SyncScheduleEntry> {
        self.sources
            .iter()
            .find(|s| s.entry.source == source)
            .map(|s| &s.entry)
    }

    async fn persist(&self, record: &SyncStatusRecord) {
        if let Err(e) = self.status.upsert(record).await {
            observe::swallowed("orchestrator.persist", &e);
        }
    }

    /// Syncs one source and returns the record of the attempt.
    ///
    /// Never fails: task errors become `Failed` records, an unknown source
    /// yields a `Failed` record that is not stored, and a request made while
    /// another sync holds the lock yields a `Pending` record.
    #[instrument(skip(self))]
    pub async fn sync_one(&self, source: &str) -> SyncStatusRecord {
        let Some(registered) = self.sources.iter().find(|s| s.entry.source == source) else {
            let err = PulseError::UnknownSource(source.to_string());
            warn!(error = %err, "Sync requested for unscheduled source");
            return SyncStatusRecord::pending(source).failed(err.to_string());
        };

        let Some(_guard) = self.lock.try_acquire() else {
            debug!("Sync already in progress, request rejected");
            return SyncStatusRecord::pending(source);
        };

        let now = self.clock.now();
        let running =
            SyncStatusRecord::in_progress(source, now, registered.entry.next_after(now));
        self.persist(&running).await;

        let record = match registered.task.sync().await {
            Ok(updated) => {
                info!(records = updated, "Sync succeeded");
                running.succeeded(updated)
            }
            Err(e) => {
                warn!(error = %e, "Sync failed");
                running.failed(e.to_string())
            }
        };
        self.persist(&record).await;
        record
    }

    /// Registers one recurring timer per source, cancelling any earlier
    /// timer first, then syncs every source once in schedule order.
    pub async fn start_automatic_sync(self: &Arc<Self>) -> Vec<SyncStatusRecord> {
        {
            let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
            for source in &self.sources {
                let name = source.entry.source.clone();
                if let Some(previous) = timers.remove(&name) {
                    previous.cancel();
                }
                let handle = self.scheduler.schedule(
                    &name,
                    source.entry.interval,
                    Self::job(Arc::downgrade(self), name.clone()),
                );
                timers.insert(name, handle);
            }
        }
        info!(sources = self.sources.len(), "Automatic sync started");

        self.sync_all().await
    }

    fn job(orchestrator: Weak<Self>, source: String) -> Job {
        Arc::new(move || {
            let orchestrator = orchestrator.clone();
            let source = source.clone();
            async move {
                if let Some(orchestrator) = orchestrator.upgrade() {
                    let _ = orchestrator.sync_one(&source).await;
                }
            }
            .boxed()
        })
    }

    /// Cancels every timer. Syncs already running are not interrupted.
    pub fn stop_automatic_sync(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in timers.drain() {
            handle.cancel();
        }
        info!("Automatic sync stopped");
    }

    /// Number of timers currently registered.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|h| !h.is_cancelled())
            .count()
    }

    /// Syncs `source` now, or every source in schedule order if `None`.
    pub async fn force_sync(&self, source: Option<&str>) -> Vec<SyncStatusRecord> {
        match source {
            Some(source) => vec![self.sync_one(source).await],
            None => self.sync_all().await,
        }
    }

    async fn sync_all(&self) -> Vec<SyncStatusRecord> {
        let mut records = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            records.push(self.sync_one(&source.entry.source).await);
        }
        records
    }

    /// Stored records, most recent attempt first; never-attempted last.
    pub async fn get_sync_status(&self) -> Vec<SyncStatusRecord> {
        let mut records = match self.status.all().await {
            Ok(records) => records,
            Err(e) => {
                observe::swallowed("orchestrator.status", &e);
                Vec::new()
            }
        };
        records.sort_by(|a, b| b.last_sync.cmp(&a.last_sync));
        records
    }

    /// Fresh/stale verdict for every scheduled source, in schedule order.
    pub async fn get_data_freshness(&self) -> Vec<FreshnessVerdict> {
        let records = self.get_sync_status().await;
        let now = self.clock.now();
        self.sources
            .iter()
            .map(|s| {
                let last_sync = records
                    .iter()
                    .find(|r| r.source == s.entry.source)
                    .and_then(|r| r.last_sync);
                classify(&s.entry.source, s.entry.frequency, last_sync, now)
            })
            .collect()
    }

    /// Freshness of every source joined with its status and display name.
    pub async fn freshness_board(&self) -> FreshnessBoard {
        let records = self.get_sync_status().await;
        FreshnessBoard::build(&self.schedule(), &self.displays, &records, self.clock.now())
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        self.stop_automatic_sync();
    }
}
