//! Record store abstraction with change notifications.
//!
//! The store is a generic CRUD backend: records, fields, attributes and a
//! find-by-attribute index. Every observable write is announced to subscribed
//! [`ChangeListener`]s as a [`RecordChange`], synchronously and after the
//! write has been applied.
//!
//! Two writes deliberately bypass notifications or add atomicity on top of
//! plain CRUD:
//!
//! - [`RecordStore::insert_unique`] inserts only if no record already matches
//!   the given attribute keys (insert-if-absent).
//! - [`RecordStore::set_kind_silently`] reclassifies a record without telling
//!   anyone, so a record can be created under an unobserved classification and
//!   then moved into its real one.

use crate::record::{Record, RecordDraft, RecordId};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record does not exist
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// The write conflicts with existing data
    #[error("Conflict on record {id}: {reason}")]
    Conflict {
        /// The record the write targeted
        id: RecordId,
        /// Why the write was rejected
        reason: String,
    },

    /// The storage backend failed
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result of an insert-if-absent write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new record was stored
    Inserted(RecordId),
    /// A record with the same unique attributes already existed
    Existing(RecordId),
}

impl InsertOutcome {
    /// The id of the new or existing record
    #[must_use]
    pub const fn id(self) -> RecordId {
        match self {
            Self::Inserted(id) | Self::Existing(id) => id,
        }
    }
}

/// A change applied to the store.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordChange {
    /// A record was created
    Created {
        /// The stored record
        record: Record,
    },

    /// Plain fields were edited
    FieldsEdited {
        /// Edited record
        id: RecordId,
        /// New values of the edited fields
        fields: BTreeMap<String, String>,
    },

    /// An attribute was added
    AttributeAdded {
        /// Edited record
        id: RecordId,
        /// Attribute key
        key: String,
        /// New value
        value: Value,
    },

    /// An existing attribute changed value
    AttributeUpdated {
        /// Edited record
        id: RecordId,
        /// Attribute key
        key: String,
        /// Value before the update
        previous: Value,
        /// New value
        value: Value,
    },

    /// An attribute was removed
    AttributeDeleted {
        /// Edited record
        id: RecordId,
        /// Attribute key
        key: String,
        /// Value before deletion
        previous: Value,
    },

    /// A record was deleted
    Deleted {
        /// Snapshot of the record as it was before deletion
        record: Record,
    },
}

impl RecordChange {
    /// The record this change applies to
    #[must_use]
    pub const fn record_id(&self) -> RecordId {
        match self {
            Self::Created { record } | Self::Deleted { record } => record.id,
            Self::FieldsEdited { id, .. }
            | Self::AttributeAdded { id, .. }
            | Self::AttributeUpdated { id, .. }
            | Self::AttributeDeleted { id, .. } => *id,
        }
    }

    /// Stable notification name, used in logs and metrics
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "record_created",
            Self::FieldsEdited { .. } => "fields_edited",
            Self::AttributeAdded { .. } => "attribute_added",
            Self::AttributeUpdated { .. } => "attribute_updated",
            Self::AttributeDeleted { .. } => "attribute_deleted",
            Self::Deleted { .. } => "record_deleted",
        }
    }
}

/// Receives store change notifications.
///
/// Listeners run synchronously inside the write that triggered them and may
/// write back to the store.
pub trait ChangeListener: Send + Sync {
    /// Handle one applied change
    fn on_change(&self, change: &RecordChange);
}

/// Handle returned by [`RecordStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Create a subscription id from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Generic entity store.
pub trait RecordStore: Send + Sync {
    /// Load a record.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails. A missing record is `Ok(None)`.
    fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError>;

    /// Store a new record and announce it.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn create(&self, draft: RecordDraft) -> Result<RecordId, StoreError>;

    /// Store a new record unless one already has the same values for every key
    /// in `unique_on`; check and insert are atomic.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn insert_unique(&self, draft: RecordDraft, unique_on: &[&str]) -> Result<InsertOutcome, StoreError>;

    /// Overwrite plain fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    fn update_fields(&self, id: RecordId, fields: BTreeMap<String, String>) -> Result<(), StoreError>;

    /// Reclassify a record without emitting any notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    fn set_kind_silently(&self, id: RecordId, kind: &str) -> Result<(), StoreError>;

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    fn delete(&self, id: RecordId) -> Result<(), StoreError>;

    /// Add or update an attribute. Writing the current value is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    fn set_attribute(&self, id: RecordId, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove an attribute. Removing a missing attribute is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record does not exist.
    fn delete_attribute(&self, id: RecordId, key: &str) -> Result<(), StoreError>;

    /// All records whose attribute `key` equals `value`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn find_by_attribute(&self, key: &str, value: &Value) -> Result<Vec<Record>, StoreError>;

    /// Register a change listener
    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId;

    /// Remove a change listener. Unknown ids are ignored.
    fn unsubscribe(&self, subscription: SubscriptionId);
}
