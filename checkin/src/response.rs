//! Responses handed back to the calling layer after a failed check-in.
//!
//! The payload shapes are consumed by existing check-in clients (the QR
//! scanner app and the admin attendee list), so their keys and messages are
//! fixed.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use series_pass_core::{Occurrence, Record, RecordId};

/// Message of the already-checked-in payload.
pub const ALREADY_CHECKED_IN_MESSAGE: &str = "Already checked in!";

/// Error code of the already-checked-in payload.
pub const ALREADY_CHECKED_IN_ERROR: &str = "attendee_already_checked_in";

/// Message of the ambiguous-candidates payload.
pub const MULTIPLE_CANDIDATES_MESSAGE: &str =
    "Multiple Event options, pick one and specify the context id.";

/// Status a response is tagged with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The request succeeded
    Ok,
    /// The request was malformed or failed
    BadRequest,
    /// The attendee is not allowed to check in again
    Forbidden,
    /// The caller must pick one of several occurrences
    MultipleChoices,
}

impl ResponseStatus {
    /// HTTP status code equivalent
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::MultipleChoices => 300,
        }
    }
}

/// A status-tagged JSON payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckinResponse {
    /// Status tag
    pub status: ResponseStatus,
    /// JSON body
    pub body: Value,
}

impl CheckinResponse {
    /// Creates a new `CheckinResponse`
    #[must_use]
    pub const fn new(status: ResponseStatus, body: Value) -> Self {
        Self { status, body }
    }

    /// Payload for an attendee whose occurrence clone is already checked in.
    ///
    /// `attendee` is the rendered attendee, see [`render_attendee`].
    #[must_use]
    pub fn already_checked_in(attendee: Value) -> Self {
        Self::new(
            ResponseStatus::Forbidden,
            json!({
                "msg": ALREADY_CHECKED_IN_MESSAGE,
                "error": ALREADY_CHECKED_IN_ERROR,
                "attendee": attendee,
            }),
        )
    }

    /// Payload asking the caller to pick one occurrence.
    #[must_use]
    pub fn multiple_candidates(attendee_id: RecordId, candidates: &[Occurrence]) -> Self {
        Self::new(
            ResponseStatus::MultipleChoices,
            json!({
                "msg": MULTIPLE_CANDIDATES_MESSAGE,
                "attendee_id": attendee_id,
                "candidates": candidates.iter().map(render_occurrence).collect::<Vec<_>>(),
            }),
        )
    }
}

/// Render an attendee record for a response body.
#[must_use]
pub fn render_attendee(attendee: &Record) -> Value {
    json!({
        "id": attendee.id,
        "kind": attendee.kind,
        "fields": attendee.fields,
        "attributes": attendee.attributes,
    })
}

/// Render an occurrence for a response body.
#[must_use]
pub fn render_occurrence(occurrence: &Occurrence) -> Value {
    json!({
        "id": occurrence.normalize(),
        "occurrence_id": occurrence.id,
        "event_id": occurrence.event_id,
        "series_id": occurrence.series_id,
        "start": occurrence.start.to_rfc3339(),
        "end": occurrence.end.to_rfc3339(),
    })
}
