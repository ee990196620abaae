//! Per-occurrence clones of canonical series pass attendees.
//!
//! A clone duplicates every attribute of its canonical attendee, points back to
//! it through the clone-of attribute, and links to exactly one occurrence
//! through the provider's link attribute. At most one clone exists per
//! `(canonical, occurrence)` pair; creation is an insert-if-absent on that pair.
//!
//! Clones are first stored under [`PENDING_CLONE_KIND`], which nothing reacts
//! to, and then silently moved into the provider's attendee kind. Listeners that
//! send tickets or emails on attendee creation therefore never see a clone.

use crate::error::CheckinError;
use crate::metrics;
use crate::suppression::SyncSuppressor;
use series_pass_core::record::CLONE_OF_KEY;
use series_pass_core::{
    InsertOutcome, Record, RecordDraft, RecordId, RecordStore, StoreError, TicketProvider,
};
use serde_json::Value;
use std::sync::Arc;

/// Record kind clones are stored under until they are fully written.
pub const PENDING_CLONE_KIND: &str = "tec_series_pass_clone_pending";

/// Creates, finds and deletes attendee clones.
#[derive(Clone)]
pub struct CloneManager {
    store: Arc<dyn RecordStore>,
    suppressor: SyncSuppressor,
}

impl CloneManager {
    /// Creates a new `CloneManager`
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, suppressor: SyncSuppressor) -> Self {
        Self { store, suppressor }
    }

    /// Every clone of a canonical attendee, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub fn clones_of(&self, canonical_id: RecordId) -> Result<Vec<Record>, StoreError> {
        self.store
            .find_by_attribute(CLONE_OF_KEY, &Value::from(canonical_id))
    }

    /// The clone of `canonical_id` linked to `occurrence_id`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub fn find_clone(
        &self,
        canonical_id: RecordId,
        provider: &dyn TicketProvider,
        occurrence_id: RecordId,
    ) -> Result<Option<Record>, StoreError> {
        let link = provider.link_attribute_name();
        Ok(self
            .clones_of(canonical_id)?
            .into_iter()
            .find(|clone| clone.attribute_id(link) == Some(occurrence_id)))
    }

    /// Materialize the clone of `canonical` for `occurrence_id`.
    ///
    /// Callers look the clone up with [`CloneManager::find_clone`] first; if a
    /// concurrent request created it in between, the existing clone is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::CloneCreation`] if any store write fails.
    pub fn create_clone(
        &self,
        canonical: &Record,
        provider: &dyn TicketProvider,
        occurrence_id: RecordId,
    ) -> Result<Record, CheckinError> {
        let _guard = self.suppressor.suppress();

        self.write_clone(canonical, provider, occurrence_id)
            .map_err(|source| {
                tracing::error!(
                    original_id = %canonical.id,
                    occurrence_id = %occurrence_id,
                    error = %source,
                    "Failed to create attendee clone"
                );
                CheckinError::CloneCreation {
                    original_id: canonical.id,
                    occurrence_id,
                    source,
                }
            })
    }

    fn write_clone(
        &self,
        canonical: &Record,
        provider: &dyn TicketProvider,
        occurrence_id: RecordId,
    ) -> Result<Record, StoreError> {
        let link = provider.link_attribute_name();

        let mut draft = RecordDraft::new(PENDING_CLONE_KIND);
        draft.fields.clone_from(&canonical.fields);
        draft.attributes.clone_from(&canonical.attributes);
        draft
            .attributes
            .insert(CLONE_OF_KEY.to_string(), Value::from(canonical.id));
        draft
            .attributes
            .insert(link.to_string(), Value::from(occurrence_id));

        let clone_id = match self.store.insert_unique(draft, &[CLONE_OF_KEY, link])? {
            InsertOutcome::Inserted(id) => {
                self.store.set_kind_silently(id, &canonical.kind)?;
                metrics::record_clone_created(provider.slug());
                tracing::info!(
                    original_id = %canonical.id,
                    occurrence_id = %occurrence_id,
                    clone_id = %id,
                    "Created attendee clone"
                );
                id
            }
            InsertOutcome::Existing(id) => {
                tracing::debug!(
                    original_id = %canonical.id,
                    occurrence_id = %occurrence_id,
                    clone_id = %id,
                    "Attendee clone already existed"
                );
                id
            }
        };

        self.store
            .get(clone_id)?
            .ok_or(StoreError::NotFound(clone_id))
    }

    /// Delete every clone of a canonical attendee and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails; clones deleted before the failure stay deleted.
    pub fn delete_clones_of(&self, canonical_id: RecordId) -> Result<usize, StoreError> {
        let _guard = self.suppressor.suppress();
        let clones = self.clones_of(canonical_id)?;
        for clone in &clones {
            self.store.delete(clone.id)?;
        }
        if !clones.is_empty() {
            tracing::info!(
                canonical_id = %canonical_id,
                deleted = clones.len(),
                "Deleted attendee clones"
            );
        }
        Ok(clones.len())
    }

    /// Whether `id` is a clone, optionally of a specific canonical attendee.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub fn is_clone(&self, id: RecordId, original_id: Option<RecordId>) -> Result<bool, StoreError> {
        let clone_of = self.store.get(id)?.and_then(|record| record.clone_of());
        Ok(match (clone_of, original_id) {
            (Some(canonical), Some(original)) => canonical == original,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}
