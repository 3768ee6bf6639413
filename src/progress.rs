//! Cooperative cancellation for tile synthesis.
//!
//! The core never spawns threads; blocking happens inside drivers and
//! cache backends. Callers that want to abandon or retry a request hand
//! a [`Progress`] implementation down the call chain, and the core polls
//! it at fetch boundaries. A canceled or retry-flagged fetch failure is
//! treated as transient and does not blacklist the tile.

use std::sync::atomic::{AtomicBool, Ordering};

/// Progress callback polled at fetch boundaries.
pub trait Progress: Send + Sync {
    /// True if the caller has abandoned this request.
    fn is_canceled(&self) -> bool {
        false
    }

    /// True if the caller wants the request retried later.
    fn needs_retry(&self) -> bool {
        false
    }
}

/// Null progress object: never canceled, never retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Shareable progress flags backed by atomics.
///
/// Suitable for handing one instance to a worker while the owner flips
/// the flags from another thread.
#[derive(Debug, Default)]
pub struct ProgressFlags {
    canceled: AtomicBool,
    retry: AtomicBool,
}

impl ProgressFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub fn request_retry(&self) {
        self.retry.store(true, Ordering::Relaxed);
    }
}

impl Progress for ProgressFlags {
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    fn needs_retry(&self) -> bool {
        self.retry.load(Ordering::Relaxed)
    }
}

/// True if the failure witnessed under `progress` is transient, meaning
/// the key must not be blacklisted.
pub(crate) fn is_transient_failure(progress: Option<&dyn Progress>) -> bool {
    progress.is_some_and(|p| p.is_canceled() || p.needs_retry())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_progress_defaults() {
        let p = NoProgress;
        assert!(!p.is_canceled());
        assert!(!p.needs_retry());
    }

    #[test]
    fn test_progress_flags_cancel() {
        let p = ProgressFlags::new();
        assert!(!p.is_canceled());
        p.cancel();
        assert!(p.is_canceled());
        assert!(!p.needs_retry());
    }

    #[test]
    fn test_progress_flags_retry() {
        let p = ProgressFlags::new();
        p.request_retry();
        assert!(p.needs_retry());
    }

    #[test]
    fn test_transient_failure_classification() {
        assert!(!is_transient_failure(None));

        let idle = ProgressFlags::new();
        assert!(!is_transient_failure(Some(&idle)));

        let canceled = ProgressFlags::new();
        canceled.cancel();
        assert!(is_transient_failure(Some(&canceled)));

        let retry = ProgressFlags::new();
        retry.request_retry();
        assert!(is_transient_failure(Some(&retry)));
    }
}
