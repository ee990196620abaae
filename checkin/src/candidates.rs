//! Candidate resolution: which occurrence is a pass holder trying to attend?
//!
//! QR check-ins only consider occurrences that intersect `[now, now + buffer]`;
//! check-ins from the admin side consider every occurrence. An explicit target
//! narrows the search to one occurrence or to the occurrences of one event,
//! and must belong to the pass's series. Exactly one candidate must remain.

use crate::environment::SeriesPassEnvironment;
use crate::error::CheckinError;
use chrono::Duration;
use series_pass_core::environment::Clock;
use series_pass_core::{CheckinWindow, Occurrence, OccurrenceQuery, RecordId};
use smallvec::SmallVec;
use std::sync::Arc;

/// Occurrences eligible for one check-in attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet {
    occurrences: SmallVec<[Occurrence; 4]>,
}

impl CandidateSet {
    /// Number of candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    /// Check if no occurrence is eligible
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// The candidates, ordered by start
    #[must_use]
    pub fn as_slice(&self) -> &[Occurrence] {
        &self.occurrences
    }

    /// Collapse to the single normalized occurrence id.
    ///
    /// # Errors
    ///
    /// - [`CheckinError::NoCandidateWindow`] when the set is empty
    /// - [`CheckinError::AmbiguousCandidate`] when it holds more than one occurrence
    pub fn into_sole(
        self,
        attendee_id: RecordId,
        series_id: RecordId,
    ) -> Result<RecordId, CheckinError> {
        if self.occurrences.len() > 1 {
            return Err(CheckinError::AmbiguousCandidate {
                attendee_id,
                series_id,
                candidates: self.occurrences.into_vec(),
            });
        }

        self.occurrences
            .first()
            .map(Occurrence::normalize)
            .ok_or(CheckinError::NoCandidateWindow {
                attendee_id,
                series_id,
            })
    }
}

impl FromIterator<Occurrence> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Occurrence>>(iter: I) -> Self {
        Self {
            occurrences: iter.into_iter().collect(),
        }
    }
}

/// Computes candidate occurrences for check-in attempts.
#[derive(Clone)]
pub struct CandidateResolver {
    occurrences: Arc<dyn OccurrenceQuery>,
    clock: Arc<dyn Clock>,
    checkin_buffer: Duration,
}

impl CandidateResolver {
    /// Creates a new `CandidateResolver`
    #[must_use]
    pub fn new(
        occurrences: Arc<dyn OccurrenceQuery>,
        clock: Arc<dyn Clock>,
        checkin_buffer: Duration,
    ) -> Self {
        Self {
            occurrences,
            clock,
            checkin_buffer,
        }
    }

    /// Build a resolver from the shared environment
    #[must_use]
    pub fn from_env(env: &SeriesPassEnvironment) -> Self {
        Self::new(
            Arc::clone(&env.occurrences),
            Arc::clone(&env.clock),
            env.config.checkin_buffer(),
        )
    }

    /// The check-in window for a QR or non-QR attempt
    #[must_use]
    pub fn window(&self, qr: bool) -> CheckinWindow {
        if qr {
            CheckinWindow::starting_at(self.clock.now(), self.checkin_buffer)
        } else {
            CheckinWindow::unrestricted()
        }
    }

    /// Every occurrence eligible for the attempt.
    ///
    /// # Errors
    ///
    /// - [`CheckinError::Membership`] when `explicit_target` is outside the series
    /// - [`CheckinError::Store`] when the calendar fails
    pub fn candidates(
        &self,
        series_id: RecordId,
        explicit_target: Option<RecordId>,
        qr: bool,
    ) -> Result<CandidateSet, CheckinError> {
        let window = self.window(qr);

        let Some(target_id) = explicit_target.filter(|target| *target != series_id) else {
            return Ok(self
                .occurrences
                .occurrences_of_series(series_id, &window)?
                .into_iter()
                .collect());
        };

        if !self.occurrences.is_occurrence_in_series(target_id, series_id)? {
            return Err(CheckinError::Membership {
                target_id,
                series_id,
            });
        }

        if let Some(occurrence) = self.occurrences.occurrence(target_id)? {
            return Ok(std::iter::once(occurrence)
                .filter(|occurrence| window.intersects(occurrence))
                .collect());
        }

        Ok(self
            .occurrences
            .occurrences_of_event(target_id, &window)?
            .into_iter()
            .collect())
    }

    /// Resolve the attempt to exactly one normalized occurrence id.
    ///
    /// # Errors
    ///
    /// Any error of [`CandidateResolver::candidates`] or [`CandidateSet::into_sole`].
    pub fn resolve(
        &self,
        attendee_id: RecordId,
        series_id: RecordId,
        explicit_target: Option<RecordId>,
        qr: bool,
    ) -> Result<RecordId, CheckinError> {
        let candidates = self.candidates(series_id, explicit_target, qr)?;
        tracing::debug!(
            attendee_id = %attendee_id,
            series_id = %series_id,
            qr,
            candidates = candidates.len(),
            "Resolved check-in candidates"
        );
        candidates.into_sole(attendee_id, series_id)
    }
}
