//! # Boxoffice Testing
//!
//! Testing utilities for the boxoffice ticketing core.
//!
//! This crate provides:
//! - `InMemoryTicketStore`: a transactional, fault-injectable store
//! - Deterministic and manually advanced clocks
//! - A recording audit sink
//! - Fixtures for seeding events and users
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_testing::{InMemoryTicketStore, ManualClock, fixtures};
//!
//! #[tokio::test]
//! async fn test_checkout() {
//!     let store = InMemoryTicketStore::new();
//!     let clock = ManualClock::starting_at_test_epoch();
//!     let event = fixtures::seed_event(&store, &[("GA", 5000, 2)]).await;
//!     // ...
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use boxoffice_core::environment::Clock;

pub mod audit;
pub mod fixtures;
pub mod memory_store;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{Arc, PoisonError, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use boxoffice_testing::mocks::FixedClock;
    /// use boxoffice_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can hold one handle while the
    /// sweeper and checkout hold others.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Create a clock at the shared test epoch (2025-01-01 00:00:00 UTC).
        #[must_use]
        pub fn starting_at_test_epoch() -> Self {
            Self::new(test_epoch())
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time.
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_735_689_600)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; output goes through the test harness writer so it is
/// only shown for failing tests.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use audit::RecordingAuditLog;
pub use memory_store::InMemoryTicketStore;
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at_test_epoch();
        let handle = clock.clone();
        handle.advance(Duration::minutes(16));
        assert_eq!(clock.now() - test_epoch(), Duration::minutes(16));
    }
}
