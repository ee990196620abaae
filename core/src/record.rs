//! Stored records: attendees, tickets, events and series all share this shape.
//!
//! A [`Record`] is a classified entity (its `kind`) with a flat map of fields
//! (status, title, author, ...) and a map of JSON attributes. Attendee
//! semantics live entirely in attributes: link attributes point at the parent
//! series or occurrence, the clone-of attribute marks a clone, check-in state
//! is provider specific.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute holding the canonical attendee id on a clone.
pub const CLONE_OF_KEY: &str = "_tec_attendee_clone_of";

/// Attribute holding the QR check-in status of an attendee.
pub const QR_STATUS_KEY: &str = "_tec_qr_status";

/// Attribute on a ticket record naming its ticket type.
pub const TICKET_TYPE_KEY: &str = "_type";

/// Ticket type value of a series pass.
pub const SERIES_PASS_TICKET_TYPE: &str = "series_pass";

/// Field holding the publication status of a record.
pub const STATUS_FIELD: &str = "status";

/// Status value of a trashed record.
pub const TRASH_STATUS: &str = "trash";

/// Identifier of a stored record, or of an occurrence in the provisional id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Create a `RecordId` from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse an id out of an attribute value.
    ///
    /// Stores hand link attributes back either as JSON numbers or as numeric
    /// strings; both are accepted. Zero is not a valid id.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let raw = match value {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }?;
        (raw != 0).then_some(Self(raw))
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Self::from(id.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identity assigned by the store
    pub id: RecordId,
    /// Classification (attendee kind, ticket kind, event kind, ...)
    pub kind: String,
    /// Plain fields such as status and title
    pub fields: BTreeMap<String, String>,
    /// Keyed attributes
    pub attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Look up an attribute value
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Look up an attribute and read it as a record id
    #[must_use]
    pub fn attribute_id(&self, key: &str) -> Option<RecordId> {
        self.attribute(key).and_then(RecordId::from_value)
    }

    /// Read an attribute as a boolean flag.
    ///
    /// `true`, any non-zero number and any non-empty string other than `"0"`
    /// count as set.
    #[must_use]
    pub fn attribute_flag(&self, key: &str) -> bool {
        match self.attribute(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n.abs() > f64::EPSILON),
            Some(Value::String(text)) => !text.is_empty() && text != "0",
            _ => false,
        }
    }

    /// Look up a field value
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The canonical attendee this record was cloned from, if it is a clone
    #[must_use]
    pub fn clone_of(&self) -> Option<RecordId> {
        self.attribute_id(CLONE_OF_KEY)
    }

    /// Whether this record is an occurrence-scoped clone
    #[must_use]
    pub fn is_clone(&self) -> bool {
        self.clone_of().is_some()
    }

    /// Whether this record is a ticket of the series pass type
    #[must_use]
    pub fn is_series_pass_ticket(&self) -> bool {
        self.attribute(TICKET_TYPE_KEY)
            .and_then(Value::as_str)
            .is_some_and(|ticket_type| ticket_type == SERIES_PASS_TICKET_TYPE)
    }
}

/// A record that has not been stored yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Classification to store the record under
    pub kind: String,
    /// Plain fields
    pub fields: BTreeMap<String, String>,
    /// Keyed attributes
    pub attributes: BTreeMap<String, Value>,
}

impl RecordDraft {
    /// Start a draft of the given kind
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Set a field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
