//! Single reporting point for errors that are deliberately not propagated.
//!
//! Durable-storage failures and failed live fetches are non-fatal in this
//! layer. Every such site calls [`swallowed`] so the fail-open policy leaves
//! one structured trail instead of ad hoc log lines.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::error::PulseError;

static SWALLOWED: AtomicU64 = AtomicU64::new(0);

/// Records a non-fatal error at `site`.
pub fn swallowed(site: &str, error: &PulseError) {
    SWALLOWED.fetch_add(1, Ordering::Relaxed);
    warn!(target: "pulse::swallowed", site, error = %error, "Non-fatal error swallowed");
}

/// Number of errors swallowed since process start.
#[must_use]
pub fn swallowed_count() -> u64 {
    SWALLOWED.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swallowed_is_counted() {
        let before = swallowed_count();
        swallowed("test", &PulseError::Storage("disk full".to_string()));
        assert!(swallowed_count() > before);
    }
}
