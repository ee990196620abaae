//! # Series Pass Testing
//!
//! Testing utilities for series pass check-in resolution.
//!
//! This crate provides:
//! - [`InMemoryRecordStore`]: `BTreeMap`-backed record store with synchronous notifications
//! - [`InMemoryCalendar`]: occurrence calendar with provisional ids
//! - [`RecordingTicketProvider`]: ticket provider that records every call
//! - [`RecordingListener`]: captures store notifications for assertions
//! - [`FixedClock`]: deterministic time
//!
//! ## Example
//!
//! ```
//! use series_pass_testing::{InMemoryRecordStore, RecordingTicketProvider};
//! use series_pass_core::RecordDraft;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryRecordStore::new());
//! let provider = RecordingTicketProvider::rsvp(store.clone());
//!
//! let id = store.insert(RecordDraft::new("tribe_rsvp_attendees"));
//! assert!(store.contains(id));
//! assert!(provider.checkins().is_empty());
//! ```

pub mod calendar;
pub mod provider;
pub mod store;

use chrono::{DateTime, Utc};
use series_pass_core::environment::Clock;

pub use calendar::{InMemoryCalendar, PROVISIONAL_ID_OFFSET};
pub use provider::{CheckinCall, RecordingTicketProvider};
pub use store::{InMemoryRecordStore, RecordingListener};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making check-in windows reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use series_pass_testing::mocks::FixedClock;
    /// use series_pass_core::environment::Clock;
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

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a test-friendly tracing subscriber.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }
}
