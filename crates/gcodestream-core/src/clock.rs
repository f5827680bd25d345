//! Time source for program timing.
//!
//! The sender records wall-clock timestamps in milliseconds since the Unix
//! epoch. Injecting the clock keeps the elapsed/remaining estimates testable.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A source of millisecond timestamps.
///
/// Implementations must never go backwards within one clock instance.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Starting time of a default [`ManualClock`] (2024-01-01T00:00:00Z)
pub const MANUAL_CLOCK_EPOCH: i64 = 1_704_067_200_000;

/// Manually advanced clock.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to a sender. A sender treats a start time of 0 as "not started",
/// so a clock that starts at 0 yields no elapsed or remaining time; the
/// default clock starts at [`MANUAL_CLOCK_EPOCH`] instead.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock starting at `start_millis`
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    /// Jump to an absolute time. Earlier values are ignored.
    pub fn set(&self, millis: i64) {
        self.now.fetch_max(millis, Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, millis: i64) {
        if millis > 0 {
            self.now.fetch_add(millis, Ordering::SeqCst);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(MANUAL_CLOCK_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
