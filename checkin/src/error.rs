//! Check-in resolution errors.

use series_pass_core::{Occurrence, RecordId, StoreError};
use thiserror::Error;

/// Why a check-in or un-check-in could not be resolved.
///
/// None of these cross the public boundary: the resolution engine folds them
/// into a failed [`crate::CheckinOutcome`] after logging and recording them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckinError {
    /// The explicit target is not part of the attendee's series
    #[error("Target {target_id} is not part of series {series_id}")]
    Membership {
        /// Requested target
        target_id: RecordId,
        /// Series of the pass
        series_id: RecordId,
    },

    /// No occurrence is open for check-in
    #[error("No occurrence of series {series_id} is open for check-in by attendee {attendee_id}")]
    NoCandidateWindow {
        /// Canonical attendee
        attendee_id: RecordId,
        /// Series of the pass
        series_id: RecordId,
    },

    /// More than one occurrence is open for check-in
    #[error("Attendee {attendee_id} matches {} occurrences of series {series_id}", .candidates.len())]
    AmbiguousCandidate {
        /// Canonical attendee
        attendee_id: RecordId,
        /// Series of the pass
        series_id: RecordId,
        /// Every matching occurrence
        candidates: Vec<Occurrence>,
    },

    /// The occurrence clone has already been checked in
    #[error("Clone {clone_id} of attendee {attendee_id} is already checked in")]
    AlreadyCheckedIn {
        /// Canonical attendee
        attendee_id: RecordId,
        /// Checked-in clone
        clone_id: RecordId,
    },

    /// The store refused to materialize a clone
    #[error("Failed to clone attendee {original_id} for occurrence {occurrence_id}: {source}")]
    CloneCreation {
        /// Canonical attendee
        original_id: RecordId,
        /// Target occurrence
        occurrence_id: RecordId,
        /// Underlying store failure
        source: StoreError,
    },

    /// No ticket provider owns the attendee's link attributes
    #[error("No ticket provider found for attendee {attendee_id}")]
    ProviderResolution {
        /// Canonical attendee
        attendee_id: RecordId,
    },

    /// A collaborator failed outside clone creation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckinError {
    /// Stable label, used in logs and metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Membership { .. } => "membership",
            Self::NoCandidateWindow { .. } => "no_candidate_window",
            Self::AmbiguousCandidate { .. } => "ambiguous_candidate",
            Self::AlreadyCheckedIn { .. } => "already_checked_in",
            Self::CloneCreation { .. } => "clone_creation",
            Self::ProviderResolution { .. } => "provider_resolution",
            Self::Store(_) => "store",
        }
    }
}
