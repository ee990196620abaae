//! Shared fixture for the check-in scenario tests.

#![allow(dead_code)] // Each test binary uses a different subset
#![allow(clippy::unwrap_used, clippy::new_without_default)]

use chrono::{DateTime, Duration, Utc};
use series_pass_checkin::{
    CheckinConfig, ProviderRegistry, SeriesPassEnvironment, SeriesPassService,
};
use series_pass_core::environment::Clock;
use series_pass_core::record::{SERIES_PASS_TICKET_TYPE, TICKET_TYPE_KEY};
use series_pass_core::{Record, RecordDraft, RecordId};
use series_pass_testing::{
    InMemoryCalendar, InMemoryRecordStore, RecordingTicketProvider, init_tracing, test_clock,
};
use serde_json::Value;
use std::sync::Arc;

pub const ATTENDEE_KIND: &str = "tribe_rsvp_attendees";
pub const LINK: &str = "_tribe_rsvp_event";
pub const TICKET: &str = "_tribe_rsvp_product";
pub const FLAG: &str = "_tribe_rsvp_checkedin";
pub const NAME: &str = "_tribe_rsvp_full_name";

/// In-memory series with one RSVP provider and a subscribed service.
pub struct Harness {
    pub store: Arc<InMemoryRecordStore>,
    pub calendar: Arc<InMemoryCalendar>,
    pub provider: Arc<RecordingTicketProvider>,
    pub service: SeriesPassService,
    pub series: RecordId,
    pub now: DateTime<Utc>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CheckinConfig::default())
    }

    pub fn with_config(config: CheckinConfig) -> Self {
        init_tracing();

        let store = Arc::new(InMemoryRecordStore::new());
        let calendar = Arc::new(InMemoryCalendar::new());
        let provider = Arc::new(RecordingTicketProvider::rsvp(store.clone()));
        let service = SeriesPassService::new(SeriesPassEnvironment::new(
            Arc::new(test_clock()),
            store.clone(),
            calendar.clone(),
            Arc::new(ProviderRegistry::new().with_provider(provider.clone())),
            config,
        ));

        Self {
            store,
            calendar,
            provider,
            service,
            series: RecordId::new(1_000),
            now: test_clock().now(),
        }
    }

    /// A single-occurrence event of the series, `start..end` hours from now.
    /// Its occurrence normalizes to the event id.
    pub fn event(&self, id: u64, start_hours: i64, end_hours: i64) -> RecordId {
        let event = RecordId::new(id);
        self.calendar.add_event(event, Some(self.series));
        self.calendar.add_occurrence(
            event,
            self.now + Duration::hours(start_hours),
            self.now + Duration::hours(end_hours),
        );
        event
    }

    /// A recurring event of the series; returns the provisional occurrence ids.
    pub fn recurring_event(&self, id: u64, slots: &[(i64, i64)]) -> Vec<RecordId> {
        let event = RecordId::new(id);
        self.calendar.add_event(event, Some(self.series));
        slots
            .iter()
            .map(|(start, end)| {
                self.calendar.add_occurrence(
                    event,
                    self.now + Duration::hours(*start),
                    self.now + Duration::hours(*end),
                )
            })
            .collect()
    }

    /// A canonical series pass attendee linked to the series.
    pub fn pass_holder(&self, name: &str) -> RecordId {
        self.attendee(name, SERIES_PASS_TICKET_TYPE)
    }

    /// An attendee holding a ticket of `ticket_type`, linked to the series.
    pub fn attendee(&self, name: &str, ticket_type: &str) -> RecordId {
        let ticket = self.store.insert(
            RecordDraft::new("tribe_rsvp_tickets").with_attribute(TICKET_TYPE_KEY, ticket_type),
        );
        self.store.insert(
            RecordDraft::new(ATTENDEE_KIND)
                .with_field("status", "publish")
                .with_field("title", name)
                .with_attribute(LINK, self.series)
                .with_attribute(TICKET, ticket)
                .with_attribute(NAME, name),
        )
    }

    /// Clones of a canonical attendee, ordered by id.
    pub fn clones_of(&self, canonical: RecordId) -> Vec<Record> {
        self.store
            .records_of_kind(ATTENDEE_KIND)
            .into_iter()
            .filter(|record| record.clone_of() == Some(canonical))
            .collect()
    }

    /// The clone of `canonical` linked to `occurrence`.
    pub fn clone_for(&self, canonical: RecordId, occurrence: RecordId) -> Option<Record> {
        self.clones_of(canonical)
            .into_iter()
            .find(|clone| clone.attribute_id(LINK) == Some(occurrence))
    }

    pub fn attribute(&self, id: RecordId, key: &str) -> Option<Value> {
        self.store.record(id).unwrap().attribute(key).cloned()
    }

    pub fn status(&self, id: RecordId) -> String {
        self.store
            .record(id)
            .unwrap()
            .field("status")
            .unwrap_or_default()
            .to_string()
    }

    pub fn is_checked_in(&self, id: RecordId) -> bool {
        self.store.record(id).unwrap().attribute_flag(FLAG)
    }
}
