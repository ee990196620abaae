//! In-memory occurrence calendar.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning is the only panic source

use chrono::{DateTime, Utc};
use series_pass_core::occurrence::{CheckinWindow, Occurrence, OccurrenceQuery};
use series_pass_core::{RecordId, StoreError};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Provisional occurrence ids start above this value so they never collide
/// with record ids handed out by the in-memory store.
pub const PROVISIONAL_ID_OFFSET: u64 = 10_000_000;

#[derive(Debug, Clone)]
struct StoredOccurrence {
    id: RecordId,
    event_id: RecordId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CalendarState {
    events: BTreeMap<RecordId, Option<RecordId>>,
    occurrences: Vec<StoredOccurrence>,
}

impl CalendarState {
    fn materialize(&self, stored: &StoredOccurrence) -> Occurrence {
        Occurrence {
            id: stored.id,
            event_id: stored.event_id,
            series_id: self.events.get(&stored.event_id).copied().flatten(),
            start: stored.start,
            end: stored.end,
            multi_instance: self.occurrence_count(stored.event_id) > 1,
        }
    }

    fn occurrence_count(&self, event_id: RecordId) -> usize {
        self.occurrences
            .iter()
            .filter(|stored| stored.event_id == event_id)
            .count()
    }

    fn collect<F>(&self, window: &CheckinWindow, mut belongs: F) -> Vec<Occurrence>
    where
        F: FnMut(&StoredOccurrence) -> bool,
    {
        let mut found: Vec<Occurrence> = self
            .occurrences
            .iter()
            .filter(|stored| belongs(stored))
            .filter(|stored| window.intersects_range(stored.start, stored.end))
            .map(|stored| self.materialize(stored))
            .collect();
        found.sort_by_key(|occurrence| (occurrence.start, occurrence.id));
        found
    }

    fn event_of(&self, id: RecordId) -> RecordId {
        self.occurrences
            .iter()
            .find(|stored| stored.id == id)
            .map_or(id, |stored| stored.event_id)
    }
}

/// Occurrence calendar keyed by event, with optional series membership.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use series_pass_core::{CheckinWindow, OccurrenceQuery, RecordId};
/// use series_pass_testing::InMemoryCalendar;
///
/// let calendar = InMemoryCalendar::new();
/// let series = RecordId::new(1);
/// let event = RecordId::new(2);
/// calendar.add_event(event, Some(series));
///
/// let now = Utc::now();
/// calendar.add_occurrence(event, now, now + Duration::hours(2));
///
/// let found = calendar
///     .occurrences_of_series(series, &CheckinWindow::unrestricted())
///     .unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].normalize(), event);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    state: RwLock<CalendarState>,
}

impl InMemoryCalendar {
    /// Create a new empty calendar
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event, optionally as part of a series
    pub fn add_event(&self, event_id: RecordId, series_id: Option<RecordId>) {
        self.state.write().unwrap().events.insert(event_id, series_id);
    }

    /// Add an occurrence to a registered event and return its provisional id
    pub fn add_occurrence(
        &self,
        event_id: RecordId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RecordId {
        let mut state = self.state.write().unwrap();
        state.events.entry(event_id).or_insert(None);
        let id = RecordId::new(PROVISIONAL_ID_OFFSET + state.occurrences.len() as u64 + 1);
        state.occurrences.push(StoredOccurrence {
            id,
            event_id,
            start,
            end,
        });
        id
    }

    /// Materialized occurrence by provisional id
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<Occurrence> {
        let state = self.state.read().unwrap();
        state
            .occurrences
            .iter()
            .find(|stored| stored.id == id)
            .map(|stored| state.materialize(stored))
    }
}

impl OccurrenceQuery for InMemoryCalendar {
    fn occurrence(&self, id: RecordId) -> Result<Option<Occurrence>, StoreError> {
        Ok(self.get(id))
    }

    fn occurrences_of_series(
        &self,
        series_id: RecordId,
        window: &CheckinWindow,
    ) -> Result<Vec<Occurrence>, StoreError> {
        let state = self.state.read().unwrap();
        Ok(state.collect(window, |stored| {
            state.events.get(&stored.event_id).copied().flatten() == Some(series_id)
        }))
    }

    fn occurrences_of_event(
        &self,
        event_id: RecordId,
        window: &CheckinWindow,
    ) -> Result<Vec<Occurrence>, StoreError> {
        let state = self.state.read().unwrap();
        Ok(state.collect(window, |stored| stored.event_id == event_id))
    }

    fn is_occurrence_in_series(&self, id: RecordId, series_id: RecordId) -> Result<bool, StoreError> {
        let state = self.state.read().unwrap();
        let event_id = state.event_of(id);
        Ok(state.events.get(&event_id).copied().flatten() == Some(series_id))
    }

    fn is_multi_instance(&self, id: RecordId) -> Result<bool, StoreError> {
        let state = self.state.read().unwrap();
        Ok(state.occurrence_count(state.event_of(id)) > 1)
    }
}
