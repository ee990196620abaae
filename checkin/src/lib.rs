//! # Series Pass Check-in
//!
//! Occurrence check-in resolution and attendee clone synchronization for
//! series passes.
//!
//! A series pass holder owns one *canonical* attendee record. When the holder
//! checks in, the engine works out which occurrence of the series they are
//! attending, materializes a per-occurrence *clone* of the attendee and lets
//! the ticket provider check that clone in. Edits to the canonical attendee
//! or any clone are mirrored across all of them, except check-in state.
//!
//! ## Components
//!
//! - [`CandidateResolver`]: narrows eligible occurrences to exactly one
//! - [`CloneManager`]: creates, finds and deletes clones
//! - [`SyncEngine`]: two-way attribute sync, guarded by a [`SyncSuppressor`]
//! - [`CheckinResolver`]: the per-request check-in / un-check-in state machine
//! - [`SeriesPassService`]: subscribes the sync engine and builds resolvers
//!
//! ## Example
//!
//! ```
//! use chrono::Duration;
//! use series_pass_checkin::{
//!     CheckinConfig, CheckinOutcome, ProviderRegistry, SeriesPassEnvironment, SeriesPassService,
//! };
//! use series_pass_core::environment::Clock;
//! use series_pass_core::record::{SERIES_PASS_TICKET_TYPE, TICKET_TYPE_KEY};
//! use series_pass_core::{RecordDraft, RecordId};
//! use series_pass_testing::{InMemoryCalendar, InMemoryRecordStore, RecordingTicketProvider, test_clock};
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryRecordStore::new());
//! let calendar = Arc::new(InMemoryCalendar::new());
//! let provider = Arc::new(RecordingTicketProvider::rsvp(store.clone()));
//!
//! let series = RecordId::new(1);
//! let event = RecordId::new(2);
//! let now = test_clock().now();
//! calendar.add_event(event, Some(series));
//! calendar.add_occurrence(event, now - Duration::hours(1), now + Duration::hours(1));
//!
//! let ticket = store.insert(RecordDraft::new("ticket").with_attribute(TICKET_TYPE_KEY, SERIES_PASS_TICKET_TYPE));
//! let attendee = store.insert(
//!     RecordDraft::new("tribe_rsvp_attendees")
//!         .with_attribute("_tribe_rsvp_event", series)
//!         .with_attribute("_tribe_rsvp_product", ticket),
//! );
//!
//! let service = SeriesPassService::new(SeriesPassEnvironment::new(
//!     Arc::new(test_clock()),
//!     store.clone(),
//!     calendar,
//!     Arc::new(ProviderRegistry::new().with_provider(provider.clone())),
//!     CheckinConfig::default(),
//! ));
//!
//! let mut request = service.request();
//! assert_eq!(request.handle_checkin(attendee, None, true), CheckinOutcome::Succeeded);
//! assert_eq!(provider.checkins()[0].occurrence_id, event);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod candidates;
pub mod clones;
pub mod config;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod resolution;
pub mod response;
pub mod service;
pub mod suppression;
pub mod sync;

pub use candidates::{CandidateResolver, CandidateSet};
pub use clones::{CloneManager, PENDING_CLONE_KIND};
pub use config::CheckinConfig;
pub use environment::SeriesPassEnvironment;
pub use error::CheckinError;
pub use registry::ProviderRegistry;
pub use resolution::{CheckinFailure, CheckinOutcome, CheckinResolver};
pub use response::{CheckinResponse, ResponseStatus};
pub use service::SeriesPassService;
pub use suppression::{SuppressionGuard, SyncSuppressor};
pub use sync::SyncEngine;
