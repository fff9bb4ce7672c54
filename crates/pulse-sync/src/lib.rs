#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/pulse/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Sync orchestration for the pulse data-freshness layer.
//!
//! - [`SyncOrchestrator`] - Runs [`SyncTask`](pulse_core::SyncTask)s on their schedules
//! - [`Scheduler`] - Recurring timers ([`TokioScheduler`], [`ManualScheduler`])
//! - [`FreshnessBoard`] - Fresh/stale view of every scheduled source

/// Fresh/stale classification and the freshness board.
pub mod freshness;
/// Single in-flight sync guard.
pub mod lock;
/// Per-source sync orchestration.
pub mod orchestrator;
/// Recurring timers.
pub mod scheduler;

pub use freshness::{FreshnessBoard, FreshnessRow, SourceDisplay, classify};
pub use lock::{SyncGuard, SyncLock};
pub use orchestrator::SyncOrchestrator;
pub use scheduler::{CancelHandle, Job, ManualScheduler, Scheduler, TokioScheduler};
