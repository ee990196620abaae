//! Occurrences, check-in windows and the occurrence query collaborator.
//!
//! Occurrences live in a *provisional* id space. When the owning event does not
//! actually recur, the provisional id is an artifact and the event's own id is
//! the one attendee records should link to; [`Occurrence::normalize`] performs
//! that mapping.

use crate::record::RecordId;
use crate::store::StoreError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One time-bound instance of a series or standalone event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Provisional occurrence id
    pub id: RecordId,
    /// Event that owns this occurrence
    pub event_id: RecordId,
    /// Series the owning event belongs to, if any
    pub series_id: Option<RecordId>,
    /// When the occurrence starts
    pub start: DateTime<Utc>,
    /// When the occurrence ends
    pub end: DateTime<Utc>,
    /// Whether the owning event has more than one occurrence
    pub multi_instance: bool,
}

impl Occurrence {
    /// The id attendee records should link to.
    ///
    /// Multi-instance events keep the provisional id; single-instance events
    /// collapse to the event id.
    #[must_use]
    pub const fn normalize(&self) -> RecordId {
        if self.multi_instance {
            self.id
        } else {
            self.event_id
        }
    }
}

/// Time range within which an occurrence may be resolved for check-in.
///
/// Missing bounds are unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinWindow {
    /// Lower bound
    pub start: Option<DateTime<Utc>>,
    /// Upper bound
    pub end: Option<DateTime<Utc>>,
}

impl CheckinWindow {
    /// A window that every occurrence intersects
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// `[now, now + buffer]`
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>, buffer: Duration) -> Self {
        Self {
            start: Some(now),
            end: now.checked_add_signed(buffer),
        }
    }

    /// Whether this window places no restriction at all
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// An occurrence intersects when `end > window.start` and `start <= window.end`.
    #[must_use]
    pub fn intersects(&self, occurrence: &Occurrence) -> bool {
        self.intersects_range(occurrence.start, occurrence.end)
    }

    /// Range form of [`CheckinWindow::intersects`]
    #[must_use]
    pub fn intersects_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let ends_after_start = self.start.is_none_or(|window_start| end > window_start);
        let starts_before_end = self.end.is_none_or(|window_end| start <= window_end);
        ends_after_start && starts_before_end
    }
}

/// Read access to the occurrence calendar.
///
/// How occurrences are generated from recurrence rules is not this crate's
/// concern; implementations only answer membership and window queries.
pub trait OccurrenceQuery: Send + Sync {
    /// Look up an occurrence by its provisional id.
    ///
    /// Returns `Ok(None)` when `id` is not an occurrence id (it may still be an
    /// event or series id).
    ///
    /// # Errors
    ///
    /// Returns error if the calendar backend fails.
    fn occurrence(&self, id: RecordId) -> Result<Option<Occurrence>, StoreError>;

    /// All occurrences of a series intersecting `window`, ordered by start.
    ///
    /// # Errors
    ///
    /// Returns error if the calendar backend fails.
    fn occurrences_of_series(
        &self,
        series_id: RecordId,
        window: &CheckinWindow,
    ) -> Result<Vec<Occurrence>, StoreError>;

    /// All occurrences of an event intersecting `window`, ordered by start.
    ///
    /// # Errors
    ///
    /// Returns error if the calendar backend fails.
    fn occurrences_of_event(
        &self,
        event_id: RecordId,
        window: &CheckinWindow,
    ) -> Result<Vec<Occurrence>, StoreError>;

    /// Whether `id` (an occurrence or an event) belongs to the series.
    ///
    /// # Errors
    ///
    /// Returns error if the calendar backend fails.
    fn is_occurrence_in_series(&self, id: RecordId, series_id: RecordId) -> Result<bool, StoreError>;

    /// Whether the event behind `id` has more than one occurrence.
    ///
    /// # Errors
    ///
    /// Returns error if the calendar backend fails.
    fn is_multi_instance(&self, id: RecordId) -> Result<bool, StoreError>;
}
