//! Check-in and un-check-in resolution for series pass holders.
//!
//! A [`CheckinResolver`] serves one incoming request. It decides whether an
//! attendee is a canonical series pass holder, resolves the occurrence the
//! holder is attending, materializes the occurrence clone and delegates the
//! actual check-in to the ticket provider. Anything else is
//! [`CheckinOutcome::Deferred`] to the caller's default check-in logic.
//!
//! Failures that the calling layer can render richer responses for (ambiguous
//! candidates, already checked in) are kept in the resolver until the request
//! ends; see [`CheckinResolver::describe_failure`].

use crate::candidates::CandidateResolver;
use crate::clones::CloneManager;
use crate::environment::SeriesPassEnvironment;
use crate::error::CheckinError;
use crate::metrics;
use crate::response::{CheckinResponse, render_attendee};
use crate::suppression::SyncSuppressor;
use serde::{Deserialize, Serialize};
use serde_json::json;
use series_pass_core::{CheckinWindow, Occurrence, Record, RecordId, TicketProvider};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Result of a check-in or un-check-in request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckinOutcome {
    /// The request was resolved and carried out
    Succeeded,
    /// The request was resolved but could not be carried out
    Failed,
    /// Not a series pass holder: the caller applies its default logic
    Deferred,
}

impl CheckinOutcome {
    /// Stable label, used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Deferred => "deferred",
        }
    }

    /// Whether the request succeeded
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Whether the caller should fall back to its default logic
    #[must_use]
    pub const fn is_deferred(self) -> bool {
        matches!(self, Self::Deferred)
    }
}

impl From<bool> for CheckinOutcome {
    fn from(succeeded: bool) -> Self {
        if succeeded { Self::Succeeded } else { Self::Failed }
    }
}

/// Failure recorded for an attendee during the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckinFailure {
    /// The occurrence clone was already checked in
    AlreadyCheckedIn,
    /// Several occurrences matched; the caller must pick one
    Ambiguous {
        /// Series of the pass
        series_id: RecordId,
        /// Every matching occurrence
        candidates: Vec<Occurrence>,
    },
}

/// Per-request check-in resolution state machine.
///
/// Owns the request's failure map and reload set. Build a fresh resolver for
/// every request, or [`reset`](CheckinResolver::reset) it between requests.
pub struct CheckinResolver {
    env: SeriesPassEnvironment,
    candidates: CandidateResolver,
    clones: CloneManager,
    suppressor: SyncSuppressor,
    failures: HashMap<RecordId, CheckinFailure>,
    reload: BTreeSet<RecordId>,
}

impl CheckinResolver {
    /// Creates a new `CheckinResolver`
    ///
    /// `suppressor` must be the one shared with the store's sync engine.
    #[must_use]
    pub fn new(env: SeriesPassEnvironment, suppressor: SyncSuppressor) -> Self {
        let candidates = CandidateResolver::from_env(&env);
        let clones = CloneManager::new(Arc::clone(&env.store), suppressor.clone());
        Self {
            env,
            candidates,
            clones,
            suppressor,
            failures: HashMap::new(),
            reload: BTreeSet::new(),
        }
    }

    /// Check a series pass holder in.
    ///
    /// `explicit_target` may name an occurrence or an event of the pass's
    /// series; `qr` restricts candidates to the check-in window.
    pub fn handle_checkin(
        &mut self,
        attendee_id: RecordId,
        explicit_target: Option<RecordId>,
        qr: bool,
    ) -> CheckinOutcome {
        let outcome = match self.try_checkin(attendee_id, explicit_target, qr) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.record_failure(attendee_id, error);
                CheckinOutcome::Failed
            }
        };

        tracing::debug!(
            attendee_id = %attendee_id,
            outcome = outcome.as_str(),
            "Check-in resolved"
        );
        metrics::record_checkin(outcome);
        outcome
    }

    fn try_checkin(
        &mut self,
        attendee_id: RecordId,
        explicit_target: Option<RecordId>,
        qr: bool,
    ) -> Result<CheckinOutcome, CheckinError> {
        let Some((attendee, provider)) = self.canonical_holder(attendee_id)? else {
            return Ok(CheckinOutcome::Deferred);
        };
        let Some(series_id) = attendee.attribute_id(provider.link_attribute_name()) else {
            tracing::debug!(attendee_id = %attendee_id, "Series pass attendee has no series link");
            return Ok(CheckinOutcome::Deferred);
        };

        let occurrence_id = self
            .candidates
            .resolve(attendee_id, series_id, explicit_target, qr)?;

        let clone = match self
            .clones
            .find_clone(attendee_id, provider.as_ref(), occurrence_id)?
        {
            Some(clone) => {
                if qr && clone.attribute_flag(provider.checkin_flag_attribute_name()) {
                    return Err(CheckinError::AlreadyCheckedIn {
                        attendee_id,
                        clone_id: clone.id,
                    });
                }
                tracing::debug!(
                    attendee_id = %attendee_id,
                    clone_id = %clone.id,
                    "Found existing attendee clone"
                );
                clone
            }
            None => self
                .clones
                .create_clone(&attendee, provider.as_ref(), occurrence_id)?,
        };

        let checked_in = provider.checkin(clone.id, qr, occurrence_id);
        if checked_in {
            // A retry that succeeded supersedes earlier failures of this request
            self.failures.remove(&attendee_id);
            self.failures.remove(&clone.id);
            self.reload.insert(attendee_id);
            tracing::info!(
                attendee_id = %attendee_id,
                clone_id = %clone.id,
                occurrence_id = %occurrence_id,
                qr,
                "Series pass holder checked in"
            );
        }
        Ok(CheckinOutcome::from(checked_in))
    }

    /// Undo a series pass holder's check-in.
    ///
    /// Materializes a clone for every occurrence of the series that lacks
    /// one, and un-checks only the clone of `context_occurrence`. Existing
    /// clones keep their check-in state.
    pub fn handle_uncheckin(
        &mut self,
        attendee_id: RecordId,
        context_occurrence: Option<RecordId>,
    ) -> CheckinOutcome {
        let outcome = match self.try_uncheckin(attendee_id, context_occurrence) {
            Ok(outcome) => outcome,
            Err(error) => {
                self.record_failure(attendee_id, error);
                CheckinOutcome::Failed
            }
        };

        tracing::debug!(
            attendee_id = %attendee_id,
            outcome = outcome.as_str(),
            "Un-check-in resolved"
        );
        metrics::record_uncheckin(outcome);
        outcome
    }

    fn try_uncheckin(
        &mut self,
        attendee_id: RecordId,
        context_occurrence: Option<RecordId>,
    ) -> Result<CheckinOutcome, CheckinError> {
        let Some((attendee, _)) = self.canonical_holder(attendee_id)? else {
            return Ok(CheckinOutcome::Deferred);
        };
        let Some((provider, series_id)) = self.env.providers.probe_link(&attendee) else {
            return Err(CheckinError::ProviderResolution { attendee_id });
        };

        let _guard = self.suppressor.suppress();

        let occurrences = self
            .env
            .occurrences
            .occurrences_of_series(series_id, &CheckinWindow::unrestricted())?;

        let mut created = 0_usize;
        for occurrence in &occurrences {
            let occurrence_id = occurrence.normalize();
            let existing = match self
                .clones
                .find_clone(attendee_id, provider.as_ref(), occurrence_id)
            {
                Ok(existing) => existing,
                Err(error) => {
                    tracing::error!(
                        attendee_id = %attendee_id,
                        occurrence_id = %occurrence_id,
                        error = %error,
                        "Failed to look up attendee clone"
                    );
                    metrics::record_failure(CheckinError::from(error).kind());
                    continue;
                }
            };
            let clone = match existing {
                Some(clone) => Some(clone),
                None => match self
                    .clones
                    .create_clone(&attendee, provider.as_ref(), occurrence_id)
                {
                    Ok(clone) => {
                        created += 1;
                        Some(clone)
                    }
                    Err(error) => {
                        metrics::record_failure(error.kind());
                        None
                    }
                },
            };

            if let Some(clone) = clone.filter(|_| context_occurrence == Some(occurrence_id)) {
                let unchecked = provider.uncheckin(clone.id);
                tracing::debug!(
                    attendee_id = %attendee_id,
                    clone_id = %clone.id,
                    occurrence_id = %occurrence_id,
                    unchecked,
                    "Un-checked occurrence clone"
                );
            }
        }

        self.reload.insert(attendee_id);
        tracing::info!(
            attendee_id = %attendee_id,
            series_id = %series_id,
            occurrences = occurrences.len(),
            created,
            "Materialized clones for un-check-in"
        );
        Ok(CheckinOutcome::Succeeded)
    }

    /// The attendee and its provider, if it is a canonical series pass holder.
    fn canonical_holder(
        &self,
        attendee_id: RecordId,
    ) -> Result<Option<(Record, Arc<dyn TicketProvider>)>, CheckinError> {
        let Some(attendee) = self.env.store.get(attendee_id)? else {
            tracing::debug!(attendee_id = %attendee_id, "Attendee not found, deferring");
            return Ok(None);
        };
        let Some(provider) = self.env.providers.for_record(&attendee) else {
            tracing::debug!(attendee_id = %attendee_id, kind = %attendee.kind, "No provider for attendee kind, deferring");
            return Ok(None);
        };

        let is_series_pass = match attendee.attribute_id(provider.ticket_attribute_name()) {
            Some(ticket_id) => self
                .env
                .store
                .get(ticket_id)?
                .is_some_and(|ticket| ticket.is_series_pass_ticket()),
            None => false,
        };
        if !is_series_pass {
            tracing::debug!(attendee_id = %attendee_id, "Not a series pass attendee, deferring");
            return Ok(None);
        }

        if attendee.is_clone() {
            tracing::debug!(attendee_id = %attendee_id, "Attendee is a clone, deferring");
            return Ok(None);
        }

        Ok(Some((attendee, provider)))
    }

    fn record_failure(&mut self, attendee_id: RecordId, error: CheckinError) {
        tracing::warn!(
            attendee_id = %attendee_id,
            kind = error.kind(),
            error = %error,
            "Series pass check-in failed"
        );
        metrics::record_failure(error.kind());

        match error {
            CheckinError::AmbiguousCandidate {
                series_id,
                candidates,
                ..
            } => {
                self.failures.insert(
                    attendee_id,
                    CheckinFailure::Ambiguous {
                        series_id,
                        candidates,
                    },
                );
            }
            CheckinError::AlreadyCheckedIn { clone_id, .. } => {
                self.failures
                    .insert(clone_id, CheckinFailure::AlreadyCheckedIn);
                self.failures
                    .insert(attendee_id, CheckinFailure::AlreadyCheckedIn);
            }
            _ => {}
        }
    }

    /// Shape the response for an attendee whose check-in failed.
    ///
    /// Returns `original` unchanged when nothing was recorded for the attendee.
    #[must_use]
    pub fn describe_failure(
        &self,
        attendee_id: RecordId,
        original: CheckinResponse,
    ) -> CheckinResponse {
        match self.failures.get(&attendee_id) {
            Some(CheckinFailure::AlreadyCheckedIn) => {
                let attendee = match self.env.store.get(attendee_id) {
                    Ok(Some(record)) => render_attendee(&record),
                    Ok(None) | Err(_) => json!({ "id": attendee_id }),
                };
                CheckinResponse::already_checked_in(attendee)
            }
            Some(CheckinFailure::Ambiguous { candidates, .. }) => {
                CheckinResponse::multiple_candidates(attendee_id, candidates)
            }
            None => original,
        }
    }

    /// Failure recorded for an attendee during this request
    #[must_use]
    pub fn failure(&self, attendee_id: RecordId) -> Option<&CheckinFailure> {
        self.failures.get(&attendee_id)
    }

    /// Whether the attendee listing should refresh for this attendee
    #[must_use]
    pub fn reload_requested(&self, attendee_id: RecordId) -> bool {
        self.reload.contains(&attendee_id)
    }

    /// Every attendee whose listing should refresh
    #[must_use]
    pub fn reload_ids(&self) -> &BTreeSet<RecordId> {
        &self.reload
    }

    /// Clear the per-request state
    pub fn reset(&mut self) {
        self.failures.clear();
        self.reload.clear();
    }

    /// Whether `id` is a clone, optionally of `original_id`.
    ///
    /// Store failures count as "not a clone".
    #[must_use]
    pub fn is_clone(&self, id: RecordId, original_id: Option<RecordId>) -> bool {
        self.clones
            .is_clone(id, original_id)
            .unwrap_or_else(|error| {
                tracing::warn!(record_id = %id, error = %error, "Clone lookup failed");
                false
            })
    }

    /// The canonical attendee `id` was cloned from
    #[must_use]
    pub fn clone_of(&self, id: RecordId) -> Option<RecordId> {
        self.env
            .store
            .get(id)
            .ok()
            .flatten()
            .and_then(|record| record.clone_of())
    }

    /// Ids of every clone of a canonical attendee
    #[must_use]
    pub fn clones_of(&self, canonical_id: RecordId) -> Vec<RecordId> {
        self.clones
            .clones_of(canonical_id)
            .map(|clones| clones.into_iter().map(|clone| clone.id).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CheckinConfig;
    use crate::registry::ProviderRegistry;
    use crate::response::ResponseStatus;
    use chrono::Duration;
    use series_pass_core::{RecordDraft, RecordStore};
    use series_pass_core::environment::Clock;
    use series_pass_core::record::{SERIES_PASS_TICKET_TYPE, TICKET_TYPE_KEY};
    use series_pass_testing::{
        InMemoryCalendar, InMemoryRecordStore, RecordingTicketProvider, test_clock,
    };

    const KIND: &str = "tribe_rsvp_attendees";

    struct Fixture {
        store: Arc<InMemoryRecordStore>,
        calendar: Arc<InMemoryCalendar>,
        provider: Arc<RecordingTicketProvider>,
        resolver: CheckinResolver,
        series: RecordId,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryRecordStore::new());
        let calendar = Arc::new(InMemoryCalendar::new());
        let provider = Arc::new(RecordingTicketProvider::rsvp(store.clone()));
        let env = SeriesPassEnvironment::new(
            Arc::new(test_clock()),
            store.clone(),
            calendar.clone(),
            Arc::new(ProviderRegistry::new().with_provider(provider.clone())),
            CheckinConfig::default(),
        );
        Fixture {
            store,
            calendar,
            provider,
            resolver: CheckinResolver::new(env, SyncSuppressor::new()),
            series: RecordId::new(1),
        }
    }

    impl Fixture {
        fn attendee(&self, ticket_type: &str) -> RecordId {
            let ticket = self
                .store
                .insert(RecordDraft::new("tribe_rsvp_tickets").with_attribute(TICKET_TYPE_KEY, ticket_type));
            self.store.insert(
                RecordDraft::new(KIND)
                    .with_attribute("_tribe_rsvp_event", self.series)
                    .with_attribute("_tribe_rsvp_product", ticket),
            )
        }

        fn event(&self, event: u64, start_hours: i64) -> RecordId {
            let event = RecordId::new(event);
            let now = test_clock().now();
            self.calendar.add_event(event, Some(self.series));
            self.calendar.add_occurrence(
                event,
                now + Duration::hours(start_hours),
                now + Duration::hours(start_hours + 2),
            );
            event
        }
    }

    #[test]
    fn regular_tickets_are_deferred() {
        let mut f = fixture();
        f.event(10, -1);
        let attendee = f.attendee("default");

        assert_eq!(f.resolver.handle_checkin(attendee, None, true), CheckinOutcome::Deferred);
        assert_eq!(f.resolver.handle_uncheckin(attendee, None), CheckinOutcome::Deferred);
        assert!(f.provider.checkins().is_empty());
    }

    #[test]
    fn clones_are_deferred() {
        let mut f = fixture();
        f.event(10, -1);
        let attendee = f.attendee(SERIES_PASS_TICKET_TYPE);
        assert!(f.resolver.handle_checkin(attendee, None, true).is_success());

        let clone = f.resolver.clones_of(attendee)[0];
        assert!(f.resolver.is_clone(clone, Some(attendee)));
        assert_eq!(f.resolver.clone_of(clone), Some(attendee));
        assert!(f.resolver.handle_checkin(clone, None, true).is_deferred());
    }

    #[test]
    fn ambiguity_is_recorded_and_described() {
        let mut f = fixture();
        f.event(10, -1);
        f.event(11, 1);
        let attendee = f.attendee(SERIES_PASS_TICKET_TYPE);

        assert_eq!(f.resolver.handle_checkin(attendee, None, true), CheckinOutcome::Failed);
        assert!(f.resolver.clones_of(attendee).is_empty());

        let original = CheckinResponse::new(ResponseStatus::BadRequest, json!({}));
        let response = f.resolver.describe_failure(attendee, original.clone());
        assert_eq!(response.status, ResponseStatus::MultipleChoices);
        assert_eq!(response.body["candidates"].as_array().unwrap().len(), 2);

        f.resolver.reset();
        assert!(f.resolver.failure(attendee).is_none());
        assert_eq!(f.resolver.describe_failure(attendee, original.clone()), original);
    }

    #[test]
    fn successful_retry_clears_the_recorded_ambiguity() {
        let mut f = fixture();
        let first = f.event(10, -1);
        f.event(11, 1);
        let attendee = f.attendee(SERIES_PASS_TICKET_TYPE);

        assert_eq!(f.resolver.handle_checkin(attendee, None, true), CheckinOutcome::Failed);
        assert!(f.resolver.failure(attendee).is_some());

        assert!(f.resolver.handle_checkin(attendee, Some(first), true).is_success());
        assert!(f.resolver.failure(attendee).is_none());

        let original = CheckinResponse::new(ResponseStatus::Ok, json!({ "msg": "Checked in" }));
        assert_eq!(f.resolver.describe_failure(attendee, original.clone()), original);
    }

    #[test]
    fn provider_refusal_fails_without_reload() {
        let mut f = fixture();
        f.event(10, -1);
        let attendee = f.attendee(SERIES_PASS_TICKET_TYPE);
        f.provider.accept_checkins(false);

        assert_eq!(f.resolver.handle_checkin(attendee, None, true), CheckinOutcome::Failed);
        assert!(!f.resolver.reload_requested(attendee));
        assert_eq!(f.resolver.clones_of(attendee).len(), 1);
    }

    #[test]
    fn uncheckin_without_link_fails() {
        let mut f = fixture();
        let attendee = f.attendee(SERIES_PASS_TICKET_TYPE);
        f.store.delete_attribute(attendee, "_tribe_rsvp_event").unwrap();

        assert_eq!(f.resolver.handle_uncheckin(attendee, None), CheckinOutcome::Failed);
        assert!(f.resolver.reload_ids().is_empty());
    }
}
