//! Recurring timers for scheduled syncs.
//!
//! - [`TokioScheduler`] - Spawned interval loops on the current runtime
//! - [`ManualScheduler`] - Virtual time, advanced explicitly by tests

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::BoxFuture;
use pulse_core::{Clock, ManualClock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace, warn};

/// Work run on every tick of a timer.
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Shortest accepted interval; zero would fire forever.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Registers recurring jobs.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Runs `job` every `interval`, first one interval from now, until the
    /// returned handle is cancelled.
    fn schedule(&self, source: &str, interval: Duration, job: Job) -> CancelHandle;
}

/// Stops a registered timer. Runs already started are not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    timer: Option<AbortHandle>,
}

impl CancelHandle {
    fn detached() -> Self {
        Self::default()
    }

    /// Stops the timer. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(timer) = &self.timer {
            timer.abort();
        }
    }

    /// Returns true once [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Scheduler backed by the tokio runtime.
///
/// Each tick spawns the job as its own task, so cancelling the timer never
/// aborts a sync that is already running.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    /// Create a new scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, source: &str, interval: Duration, job: Job) -> CancelHandle {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(source, "No tokio runtime, timer not started");
            let handle = CancelHandle::detached();
            handle.cancel();
            return handle;
        };

        let interval = interval.max(MIN_INTERVAL);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let source = source.to_string();

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                trace!(source = %source, "Timer fired");
                drop(tokio::spawn(job()));
            }
        });

        debug!(interval_secs = interval.as_secs(), "Timer registered");
        CancelHandle {
            cancelled,
            timer: Some(task.abort_handle()),
        }
    }
}

struct ManualTimer {
    source: String,
    interval: Duration,
    next_due: DateTime<Utc>,
    job: Job,
    handle: CancelHandle,
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimer")
            .field("source", &self.source)
            .field("interval", &self.interval)
            .field("next_due", &self.next_due)
            .finish_non_exhaustive()
    }
}

fn after(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|by| at.checked_add_signed(by))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Scheduler on a [`ManualClock`]. Nothing fires until [`advance`](Self::advance).
#[derive(Debug)]
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    timers: Mutex<Vec<ManualTimer>>,
}

impl ManualScheduler {
    /// Create a scheduler driving `clock`.
    #[must_use]
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Timers not yet cancelled.
    #[must_use]
    pub fn active(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| !t.handle.is_cancelled())
            .count()
    }

    /// Moves the clock forward by `by`, running every job that falls due, in
    /// deadline order, with the clock set to each deadline while it runs.
    pub async fn advance(&self, by: Duration) {
        let target = after(self.clock.now(), by);
        loop {
            let (due, source, job) = {
                let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
                timers.retain(|t| !t.handle.is_cancelled());
                let Some(timer) = timers
                    .iter_mut()
                    .filter(|t| t.next_due <= target)
                    .min_by_key(|t| t.next_due)
                else {
                    break;
                };
                let due = timer.next_due;
                timer.next_due = after(due, timer.interval);
                (due, timer.source.clone(), timer.job.clone())
            };
            self.clock.set(due);
            trace!(source = %source, at = %due, "Timer fired");
            job().await;
        }
        self.clock.set(target);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, source: &str, interval: Duration, job: Job) -> CancelHandle {
        let interval = interval.max(MIN_INTERVAL);
        let handle = CancelHandle::detached();
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManualTimer {
                source: source.to_string(),
                interval,
                next_due: after(self.clock.now(), interval),
                job,
                handle: handle.clone(),
            });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    fn counting_job(counter: Arc<AtomicUsize>) -> Job {
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_manual_scheduler_fires_on_interval() {
        let clock = clock();
        let scheduler = ManualScheduler::new(clock.clone());
        let count = Arc::new(AtomicUsize::new(0));
        scheduler.schedule("fx", Duration::from_secs(3600), counting_job(count.clone()));

        scheduler.advance(Duration::from_secs(3599)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        scheduler.advance(Duration::from_secs(3 * 3600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2024, 3, 1, 4, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_manual_scheduler_runs_in_deadline_order() {
        let clock = clock();
        let scheduler = ManualScheduler::new(clock.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        for (source, minutes) in [("slow", 90u64), ("fast", 60)] {
            let log = log.clone();
            let clock = clock.clone();
            let job: Job = Arc::new(move || {
                let log = log.clone();
                let clock = clock.clone();
                async move {
                    log.lock().unwrap().push((source, clock.now()));
                }
                .boxed()
            });
            scheduler.schedule(source, Duration::from_secs(minutes * 60), job);
        }

        scheduler.advance(Duration::from_secs(3 * 3600)).await;
        let sources: Vec<&str> = log.lock().unwrap().iter().map(|(s, _)| *s).collect();
        // Ties at 03:00 run in registration order.
        assert_eq!(sources, vec!["fast", "slow", "fast", "slow", "fast"]);
    }

    #[tokio::test]
    async fn test_cancelled_timer_stops_firing() {
        let scheduler = ManualScheduler::new(clock());
        let count = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule("q", Duration::from_secs(60), counting_job(count.clone()));

        scheduler.advance(Duration::from_secs(60)).await;
        handle.cancel();
        handle.cancel();
        scheduler.advance(Duration::from_secs(600)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_first_tick_after_one_interval() {
        let scheduler = TokioScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule("q", Duration::from_secs(60), counting_job(count.clone()));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
