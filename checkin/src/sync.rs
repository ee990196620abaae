//! Two-way synchronization between canonical attendees and their clones.
//!
//! The engine listens to record store notifications for every registered
//! attendee kind:
//!
//! - an edit on a canonical attendee is mirrored onto all of its clones
//! - an edit on a clone is mirrored onto its canonical attendee and its siblings
//! - occurrence-local attributes (check-in state, links, clone-of) never sync
//! - a clone's status (trash included) never leaves the clone
//! - deleting or moving a canonical attendee deletes its clones
//!
//! Mirrored writes happen under a [`SuppressionGuard`](crate::SuppressionGuard),
//! so they do not bounce back into the engine.

use crate::clones::CloneManager;
use crate::metrics;
use crate::registry::ProviderRegistry;
use crate::suppression::SyncSuppressor;
use series_pass_core::record::STATUS_FIELD;
use series_pass_core::{
    ChangeListener, Record, RecordChange, RecordId, RecordStore, StoreError,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Store listener that keeps clones and canonical attendees in sync.
pub struct SyncEngine {
    store: Arc<dyn RecordStore>,
    providers: Arc<ProviderRegistry>,
    clones: CloneManager,
    suppressor: SyncSuppressor,
    local_keys: BTreeSet<String>,
}

impl SyncEngine {
    /// Creates a new `SyncEngine`
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        providers: Arc<ProviderRegistry>,
        suppressor: SyncSuppressor,
    ) -> Self {
        let local_keys = providers.occurrence_local_keys();
        let clones = CloneManager::new(Arc::clone(&store), suppressor.clone());
        Self {
            store,
            providers,
            clones,
            suppressor,
            local_keys,
        }
    }

    /// Whether `key` stays local to one occurrence
    #[must_use]
    pub fn is_occurrence_local(&self, key: &str) -> bool {
        self.local_keys.contains(key)
    }

    /// Records a change on `record` must be mirrored onto.
    ///
    /// For a clone: its canonical attendee and every sibling clone. For a
    /// canonical attendee: every clone.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails.
    pub fn targets(&self, record: &Record) -> Result<Vec<RecordId>, StoreError> {
        let Some(canonical_id) = record.clone_of() else {
            return Ok(self
                .clones
                .clones_of(record.id)?
                .into_iter()
                .map(|clone| clone.id)
                .collect());
        };

        let mut targets = Vec::new();
        if self.store.get(canonical_id)?.is_some() {
            targets.push(canonical_id);
        }
        targets.extend(
            self.clones
                .clones_of(canonical_id)?
                .into_iter()
                .map(|sibling| sibling.id)
                .filter(|id| *id != record.id),
        );
        Ok(targets)
    }

    fn propagate(&self, change: &RecordChange) -> Result<(), StoreError> {
        if let RecordChange::Deleted { record } = change {
            return self.propagate_delete(record);
        }

        let Some(record) = self.store.get(change.record_id())? else {
            return Ok(());
        };
        if self.providers.for_record(&record).is_none() {
            return Ok(());
        }

        match change {
            RecordChange::FieldsEdited { fields, .. } => self.propagate_fields(&record, fields),
            RecordChange::AttributeAdded { key, value, .. } => {
                self.propagate_attribute(&record, change, key, Some(value))
            }
            RecordChange::AttributeUpdated {
                key,
                previous,
                value,
                ..
            } => {
                if self.is_move(&record, key, Some(previous), Some(value)) {
                    return self.drop_moved_clones(&record);
                }
                self.propagate_attribute(&record, change, key, Some(value))
            }
            RecordChange::AttributeDeleted { key, previous, .. } => {
                if self.is_move(&record, key, Some(previous), None) {
                    return self.drop_moved_clones(&record);
                }
                self.propagate_attribute(&record, change, key, None)
            }
            RecordChange::Created { .. } | RecordChange::Deleted { .. } => Ok(()),
        }
    }

    fn propagate_fields(
        &self,
        record: &Record,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut fields = fields.clone();
        // Status only ever flows from the canonical attendee down
        let clone_status = if record.is_clone() {
            fields.remove(STATUS_FIELD)
        } else {
            None
        };
        if let Some(status) = clone_status {
            tracing::debug!(clone_id = %record.id, status = %status, "Not propagating clone status");
        }
        if fields.is_empty() {
            return Ok(());
        }

        let targets = self.targets(record)?;
        let _guard = self.suppressor.suppress();
        for target in &targets {
            self.store.update_fields(*target, fields.clone())?;
        }
        Self::log_propagation(record, "fields_edited", targets.len());
        Ok(())
    }

    fn propagate_attribute(
        &self,
        record: &Record,
        change: &RecordChange,
        key: &str,
        value: Option<&Value>,
    ) -> Result<(), StoreError> {
        if self.is_occurrence_local(key) {
            tracing::debug!(
                record_id = %record.id,
                key,
                "Skipping occurrence-local attribute"
            );
            return Ok(());
        }

        let targets = self.targets(record)?;
        let _guard = self.suppressor.suppress();
        for target in &targets {
            match value {
                Some(value) => self.store.set_attribute(*target, key, value.clone())?,
                None => self.store.delete_attribute(*target, key)?,
            }
        }
        Self::log_propagation(record, change.name(), targets.len());
        Ok(())
    }

    fn propagate_delete(&self, record: &Record) -> Result<(), StoreError> {
        if self.providers.for_record(record).is_none() {
            return Ok(());
        }
        if record.is_clone() {
            tracing::debug!(clone_id = %record.id, "Clone deleted, not cascading");
            return Ok(());
        }

        let deleted = self.clones.delete_clones_of(record.id)?;
        metrics::record_sync_propagation("record_deleted", deleted);
        Ok(())
    }

    /// A canonical attendee whose link attribute now points elsewhere has moved
    /// to another parent; its clones belong to the old one.
    fn is_move(
        &self,
        record: &Record,
        key: &str,
        previous: Option<&Value>,
        value: Option<&Value>,
    ) -> bool {
        if record.is_clone() {
            return false;
        }
        let Some(provider) = self.providers.for_record(record) else {
            return false;
        };
        if provider.link_attribute_name() != key {
            return false;
        }
        previous.and_then(RecordId::from_value) != value.and_then(RecordId::from_value)
    }

    fn drop_moved_clones(&self, record: &Record) -> Result<(), StoreError> {
        let deleted = self.clones.delete_clones_of(record.id)?;
        tracing::info!(
            attendee_id = %record.id,
            deleted,
            "Attendee moved, deleted its clones"
        );
        metrics::record_sync_propagation("attendee_moved", deleted);
        Ok(())
    }

    fn log_propagation(record: &Record, kind: &'static str, targets: usize) {
        if targets == 0 {
            return;
        }
        tracing::debug!(
            record_id = %record.id,
            kind,
            targets,
            "Propagated attendee change"
        );
        metrics::record_sync_propagation(kind, targets);
    }
}

impl ChangeListener for SyncEngine {
    fn on_change(&self, change: &RecordChange) {
        if self.suppressor.is_suppressed() {
            return;
        }
        if let Err(error) = self.propagate(change) {
            tracing::error!(
                record_id = %change.record_id(),
                change = change.name(),
                error = %error,
                "Failed to synchronize attendee change"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use series_pass_core::RecordDraft;
    use series_pass_testing::{InMemoryRecordStore, RecordingTicketProvider};
    use serde_json::json;

    const KIND: &str = "tribe_rsvp_attendees";
    const LINK: &str = "_tribe_rsvp_event";
    const FLAG: &str = "_tribe_rsvp_checkedin";

    struct Fixture {
        store: Arc<InMemoryRecordStore>,
        canonical: RecordId,
        clones: Vec<RecordId>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryRecordStore::new());
        let provider = RecordingTicketProvider::rsvp(store.clone());
        let providers = Arc::new(ProviderRegistry::new().with_provider(Arc::new(provider)));
        let suppressor = SyncSuppressor::new();
        let manager = CloneManager::new(store.clone(), suppressor.clone());

        let canonical = store.insert(
            RecordDraft::new(KIND)
                .with_field("status", "publish")
                .with_attribute(LINK, 5_u64)
                .with_attribute("_tribe_rsvp_full_name", "Ada"),
        );
        let record = store.record(canonical).unwrap();
        let rsvp = RecordingTicketProvider::rsvp(store.clone());
        let clones = [10_000_001, 10_000_002]
            .into_iter()
            .map(|occurrence| {
                manager
                    .create_clone(&record, &rsvp, RecordId::new(occurrence))
                    .unwrap()
                    .id
            })
            .collect();

        store.subscribe(Arc::new(SyncEngine::new(store.clone(), providers, suppressor)));

        Fixture {
            store,
            canonical,
            clones,
        }
    }

    impl Fixture {
        fn attribute(&self, id: RecordId, key: &str) -> Option<Value> {
            self.store.record(id).unwrap().attribute(key).cloned()
        }

        fn status(&self, id: RecordId) -> String {
            self.store.record(id).unwrap().field("status").unwrap_or_default().to_string()
        }
    }

    #[test]
    fn canonical_attribute_reaches_every_clone() {
        let f = fixture();
        f.store
            .set_attribute(f.canonical, "_tribe_rsvp_full_name", json!("Ada Lovelace"))
            .unwrap();

        for clone in &f.clones {
            assert_eq!(f.attribute(*clone, "_tribe_rsvp_full_name"), Some(json!("Ada Lovelace")));
        }
    }

    #[test]
    fn clone_attribute_reaches_canonical_and_siblings() {
        let f = fixture();
        f.store
            .set_attribute(f.clones[0], "_tribe_rsvp_email", json!("ada@example.com"))
            .unwrap();

        assert_eq!(f.attribute(f.canonical, "_tribe_rsvp_email"), Some(json!("ada@example.com")));
        assert_eq!(f.attribute(f.clones[1], "_tribe_rsvp_email"), Some(json!("ada@example.com")));
    }

    #[test]
    fn attribute_deletion_is_mirrored() {
        let f = fixture();
        f.store.delete_attribute(f.clones[1], "_tribe_rsvp_full_name").unwrap();

        assert_eq!(f.attribute(f.canonical, "_tribe_rsvp_full_name"), None);
        assert_eq!(f.attribute(f.clones[0], "_tribe_rsvp_full_name"), None);
    }

    #[test]
    fn checkin_state_stays_local() {
        let f = fixture();
        f.store.set_attribute(f.clones[0], FLAG, json!("1")).unwrap();
        f.store
            .set_attribute(f.clones[0], series_pass_core::record::QR_STATUS_KEY, json!("1"))
            .unwrap();

        assert_eq!(f.attribute(f.canonical, FLAG), None);
        assert_eq!(f.attribute(f.clones[1], FLAG), None);
        assert_eq!(f.attribute(f.canonical, series_pass_core::record::QR_STATUS_KEY), None);
    }

    #[test]
    fn clone_trash_is_isolated() {
        let f = fixture();
        f.store
            .update_fields(
                f.clones[0],
                BTreeMap::from([("status".to_string(), "trash".to_string())]),
            )
            .unwrap();

        assert_eq!(f.status(f.clones[0]), "trash");
        assert_eq!(f.status(f.canonical), "publish");
        assert_eq!(f.status(f.clones[1]), "publish");
    }

    #[test]
    fn clone_status_changes_stay_on_the_clone() {
        let f = fixture();
        for status in ["private", "draft", "publish"] {
            f.store
                .update_fields(
                    f.clones[0],
                    BTreeMap::from([("status".to_string(), status.to_string())]),
                )
                .unwrap();

            assert_eq!(f.status(f.clones[0]), status);
            assert_eq!(f.status(f.canonical), "publish");
            assert_eq!(f.status(f.clones[1]), "publish");
        }
    }

    #[test]
    fn restoring_a_clone_leaves_a_trashed_canonical_alone() {
        let f = fixture();
        let trash = BTreeMap::from([("status".to_string(), "trash".to_string())]);
        f.store.update_fields(f.canonical, trash).unwrap();

        f.store
            .update_fields(
                f.clones[0],
                BTreeMap::from([("status".to_string(), "publish".to_string())]),
            )
            .unwrap();

        assert_eq!(f.status(f.clones[0]), "publish");
        assert_eq!(f.status(f.canonical), "trash");
        assert_eq!(f.status(f.clones[1]), "trash");
    }

    #[test]
    fn clone_field_edits_other_than_status_propagate() {
        let f = fixture();
        f.store
            .update_fields(
                f.clones[0],
                BTreeMap::from([
                    ("status".to_string(), "trash".to_string()),
                    ("title".to_string(), "Ada L.".to_string()),
                ]),
            )
            .unwrap();

        assert_eq!(f.store.record(f.canonical).unwrap().field("title"), Some("Ada L."));
        assert_eq!(f.status(f.canonical), "publish");
    }

    #[test]
    fn canonical_trash_propagates_down() {
        let f = fixture();
        f.store
            .update_fields(
                f.canonical,
                BTreeMap::from([("status".to_string(), "trash".to_string())]),
            )
            .unwrap();

        for clone in &f.clones {
            assert_eq!(f.status(*clone), "trash");
        }
    }

    #[test]
    fn deleting_canonical_deletes_clones() {
        let f = fixture();
        f.store.delete(f.canonical).unwrap();

        for clone in &f.clones {
            assert!(!f.store.contains(*clone));
        }
    }

    #[test]
    fn deleting_clone_does_not_cascade() {
        let f = fixture();
        f.store.delete(f.clones[0]).unwrap();

        assert!(f.store.contains(f.canonical));
        assert!(f.store.contains(f.clones[1]));
    }

    #[test]
    fn moving_canonical_deletes_clones() {
        let f = fixture();
        f.store.set_attribute(f.canonical, LINK, json!(6)).unwrap();

        assert_eq!(f.attribute(f.canonical, LINK), Some(json!(6)));
        for clone in &f.clones {
            assert!(!f.store.contains(*clone));
        }
    }

    #[test]
    fn clone_links_are_never_mirrored() {
        let f = fixture();
        f.store.set_attribute(f.clones[0], LINK, json!(10_000_009)).unwrap();

        assert_eq!(f.attribute(f.canonical, LINK), Some(json!(5)));
        assert_eq!(f.attribute(f.clones[1], LINK), Some(json!(10_000_002)));
    }

    #[test]
    fn records_of_other_kinds_are_ignored() {
        let f = fixture();
        let post = f.store.insert(
            RecordDraft::new("post").with_attribute(series_pass_core::record::CLONE_OF_KEY, f.canonical.get()),
        );
        f.store.set_attribute(post, "_tribe_rsvp_full_name", json!("Grace")).unwrap();

        assert_eq!(f.attribute(f.canonical, "_tribe_rsvp_full_name"), Some(json!("Ada")));
    }
}
