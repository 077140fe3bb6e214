//! Wall-clock abstraction for expiration
//!
//! The accumulator stamps every stored snapshot with the time it was last
//! updated and compares those stamps against the clock on `collect`. Going
//! through this trait lets tests drive expiration deterministically.

use crate::metrics::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Clock trait for time operations
///
/// Implementations:
/// - `SystemClock`: real wall-clock time
/// - `SimulatedClock`: controlled virtual time for tests
pub trait Clock: Send + Sync + Clone + 'static {
    /// Get current time
    fn now(&self) -> Timestamp;
}

/// Production clock reading the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp::from_nanos(u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX))
    }
}

/// Simulated clock for deterministic testing
///
/// Time only advances when explicitly told to via `advance()` or `set()`.
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    time_ns: Arc<AtomicU64>,
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(Timestamp::ZERO)
    }
}

impl SimulatedClock {
    /// Create a new simulated clock starting at the given time
    pub fn new(start: Timestamp) -> Self {
        SimulatedClock {
            time_ns: Arc::new(AtomicU64::new(start.as_nanos())),
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.time_ns.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Set time to a specific value
    pub fn set(&self, time: Timestamp) {
        self.time_ns.store(time.as_nanos(), Ordering::SeqCst);
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.time_ns.load(Ordering::SeqCst))
    }
}
