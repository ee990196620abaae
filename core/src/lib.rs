//! # Series Pass Core
//!
//! Core types and collaborator traits for series pass check-in resolution.
//!
//! A series pass is one purchased admission right that is valid at every
//! occurrence of a series. The check-in machinery it plugs into only knows
//! about attendee records tied to one specific occurrence, so the resolution
//! engine materializes per-occurrence *clones* of the purchased (*canonical*)
//! attendee and keeps them in sync.
//!
//! This crate holds the vocabulary shared by the engine and its collaborators:
//!
//! - **Records**: generic stored entities with fields and attributes ([`record`])
//! - **Occurrences**: time-bound instances of a series or event ([`occurrence`])
//! - **Record Store**: CRUD plus change notifications ([`store`])
//! - **Ticket Providers**: the capability that performs the actual check-in ([`provider`])
//! - **Environment**: injected dependencies such as the [`environment::Clock`]
//!
//! ## Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use series_pass_core::occurrence::{CheckinWindow, Occurrence};
//! use series_pass_core::record::RecordId;
//!
//! let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
//! let occurrence = Occurrence {
//!     id: RecordId::new(10_000_001),
//!     event_id: RecordId::new(42),
//!     series_id: Some(RecordId::new(7)),
//!     start: now + Duration::hours(2),
//!     end: now + Duration::hours(4),
//!     multi_instance: false,
//! };
//!
//! let window = CheckinWindow::starting_at(now, Duration::hours(6));
//! assert!(window.intersects(&occurrence));
//! assert_eq!(occurrence.normalize(), RecordId::new(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod occurrence;
pub mod provider;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use occurrence::{CheckinWindow, Occurrence, OccurrenceQuery};
pub use provider::TicketProvider;
pub use record::{Record, RecordDraft, RecordId};
pub use store::{
    ChangeListener, InsertOutcome, RecordChange, RecordStore, StoreError, SubscriptionId,
};

/// Environment module - Injected dependencies that are not domain collaborators
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic check-in windows
    /// let clock = FixedClock::new(time);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
