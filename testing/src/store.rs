//! In-memory record store for fast, deterministic testing.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning is the only panic source

use series_pass_core::store::{
    ChangeListener, InsertOutcome, RecordChange, RecordStore, StoreError, SubscriptionId,
};
use series_pass_core::{Record, RecordDraft, RecordId};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Default)]
struct StoreState {
    records: BTreeMap<RecordId, Record>,
    next_id: u64,
}

impl StoreState {
    fn allocate(&mut self, draft: RecordDraft) -> Record {
        self.next_id += 1;
        let record = Record {
            id: RecordId::new(self.next_id),
            kind: draft.kind,
            fields: draft.fields,
            attributes: draft.attributes,
        };
        self.records.insert(record.id, record.clone());
        record
    }

    fn record_mut(&mut self, id: RecordId) -> Result<&mut Record, StoreError> {
        self.records.get_mut(&id).ok_or(StoreError::NotFound(id))
    }
}

/// Attribute equality, treating ids stored as numbers or numeric strings alike.
fn same_attribute(stored: Option<&Value>, wanted: Option<&Value>) -> bool {
    match (stored, wanted) {
        (Some(stored), Some(wanted)) if stored != wanted => {
            RecordId::from_value(wanted).is_some_and(|id| RecordId::from_value(stored) == Some(id))
        }
        (stored, wanted) => stored == wanted,
    }
}

/// `BTreeMap`-backed record store.
///
/// Listeners are notified synchronously after each write, with no lock held,
/// so they can write back into the store.
///
/// # Example
///
/// ```
/// use series_pass_testing::InMemoryRecordStore;
/// use series_pass_core::{RecordDraft, RecordStore};
/// use serde_json::json;
///
/// let store = InMemoryRecordStore::new();
/// let id = store.create(RecordDraft::new("ticket").with_attribute("_type", "series_pass")).unwrap();
///
/// let found = store.find_by_attribute("_type", &json!("series_pass")).unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].id, id);
/// ```
#[derive(Default)]
pub struct InMemoryRecordStore {
    state: RwLock<StoreState>,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn ChangeListener>)>>,
    next_subscription: AtomicU64,
    failing_inserts: AtomicBool,
    failing_lookups: AtomicBool,
}

impl InMemoryRecordStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, bypassing the `Result` for test setup
    pub fn insert(&self, draft: RecordDraft) -> RecordId {
        self.create(draft).unwrap()
    }

    /// Make every following create and insert fail with a backend error
    pub fn fail_inserts(&self, failing: bool) {
        self.failing_inserts.store(failing, Ordering::SeqCst);
    }

    /// Make every following attribute lookup fail with a backend error
    pub fn fail_lookups(&self, failing: bool) {
        self.failing_lookups.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of a record
    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<Record> {
        self.state.read().unwrap().records.get(&id).cloned()
    }

    /// Check if a record exists
    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.state.read().unwrap().records.contains_key(&id)
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap().records.len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().unwrap().records.is_empty()
    }

    /// All records of a kind, ordered by id
    #[must_use]
    pub fn records_of_kind(&self, kind: &str) -> Vec<Record> {
        self.state
            .read()
            .unwrap()
            .records
            .values()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of active listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap().len()
    }

    fn notify(&self, change: &RecordChange) {
        let listeners: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .read()
            .unwrap()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener.on_change(change);
        }
    }

    fn check_inserts(&self) -> Result<(), StoreError> {
        if self.failing_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("insert rejected".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.record(id))
    }

    fn create(&self, draft: RecordDraft) -> Result<RecordId, StoreError> {
        self.check_inserts()?;
        let record = self.state.write().unwrap().allocate(draft);
        let id = record.id;
        self.notify(&RecordChange::Created { record });
        Ok(id)
    }

    fn insert_unique(&self, draft: RecordDraft, unique_on: &[&str]) -> Result<InsertOutcome, StoreError> {
        self.check_inserts()?;
        let record = {
            let mut state = self.state.write().unwrap();
            let existing = state.records.values().find(|record| {
                unique_on
                    .iter()
                    .all(|key| same_attribute(record.attributes.get(*key), draft.attributes.get(*key)))
            });
            if let Some(existing) = existing {
                return Ok(InsertOutcome::Existing(existing.id));
            }
            state.allocate(draft)
        };
        let id = record.id;
        self.notify(&RecordChange::Created { record });
        Ok(InsertOutcome::Inserted(id))
    }

    fn update_fields(&self, id: RecordId, fields: BTreeMap<String, String>) -> Result<(), StoreError> {
        {
            let mut state = self.state.write().unwrap();
            let record = state.record_mut(id)?;
            for (name, value) in &fields {
                record.fields.insert(name.clone(), value.clone());
            }
        }
        self.notify(&RecordChange::FieldsEdited { id, fields });
        Ok(())
    }

    fn set_kind_silently(&self, id: RecordId, kind: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        state.record_mut(id)?.kind = kind.to_string();
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let record = self
            .state
            .write()
            .unwrap()
            .records
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;
        self.notify(&RecordChange::Deleted { record });
        Ok(())
    }

    fn set_attribute(&self, id: RecordId, key: &str, value: Value) -> Result<(), StoreError> {
        let change = {
            let mut state = self.state.write().unwrap();
            let record = state.record_mut(id)?;
            match record.attributes.insert(key.to_string(), value.clone()) {
                Some(previous) if previous == value => None,
                Some(previous) => Some(RecordChange::AttributeUpdated {
                    id,
                    key: key.to_string(),
                    previous,
                    value,
                }),
                None => Some(RecordChange::AttributeAdded {
                    id,
                    key: key.to_string(),
                    value,
                }),
            }
        };
        if let Some(change) = change {
            self.notify(&change);
        }
        Ok(())
    }

    fn delete_attribute(&self, id: RecordId, key: &str) -> Result<(), StoreError> {
        let previous = {
            let mut state = self.state.write().unwrap();
            state.record_mut(id)?.attributes.remove(key)
        };
        if let Some(previous) = previous {
            self.notify(&RecordChange::AttributeDeleted {
                id,
                key: key.to_string(),
                previous,
            });
        }
        Ok(())
    }

    fn find_by_attribute(&self, key: &str, value: &Value) -> Result<Vec<Record>, StoreError> {
        if self.failing_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("lookup rejected".to_string()));
        }
        Ok(self
            .state
            .read()
            .unwrap()
            .records
            .values()
            .filter(|record| {
                record.attributes.contains_key(key)
                    && same_attribute(record.attributes.get(key), Some(value))
            })
            .cloned()
            .collect())
    }

    fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().unwrap().push((id, listener));
        id
    }

    fn unsubscribe(&self, subscription: SubscriptionId) {
        self.listeners
            .write()
            .unwrap()
            .retain(|(id, _)| *id != subscription);
    }
}

/// Captures every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    changes: Mutex<Vec<RecordChange>>,
}

impl RecordingListener {
    /// Create a new empty listener
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured changes, oldest first
    #[must_use]
    pub fn changes(&self) -> Vec<RecordChange> {
        self.changes.lock().unwrap().clone()
    }

    /// Kinds of every record announced as created
    #[must_use]
    pub fn created_kinds(&self) -> Vec<String> {
        self.changes
            .lock()
            .unwrap()
            .iter()
            .filter_map(|change| match change {
                RecordChange::Created { record } => Some(record.kind.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget everything captured so far
    pub fn clear(&self) {
        self.changes.lock().unwrap().clear();
    }
}

impl ChangeListener for RecordingListener {
    fn on_change(&self, change: &RecordChange) {
        self.changes.lock().unwrap().push(change.clone());
    }
}
