//! In-memory entity cache.
//!
//! The store holds the dashboard's last-known view of the world: canonical
//! entity records plus, for subscribers, the flat per-event child record
//! lists. It is mutated only by the reconciliation service and only after an
//! execution batch has fully drained, so readers never observe intermediate
//! state of an in-flight patch.
//!
//! Cached entities are always overwritten wholesale from a re-fetched
//! canonical record; partial relation state is never hand-merged in, which
//! would risk caching a state the server never held.

use std::collections::HashMap;
use std::sync::RwLock;

use crest_remote::{ChildRecord, EntityId, EntityRecord};

use crate::op::{OpOutcome, Operation, OperationResult};

/// Thread-safe in-memory store of entity records and child record lists.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: RwLock<HashMap<EntityId, EntityRecord>>,
    child_records: RwLock<HashMap<EntityId, Vec<ChildRecord>>>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached entity.
    pub fn get(&self, id: &EntityId) -> Option<EntityRecord> {
        self.entities.read().expect("entity cache poisoned").get(id).cloned()
    }

    /// Overwrite the cached record for an entity.
    pub fn insert(&self, record: EntityRecord) {
        self.entities
            .write()
            .expect("entity cache poisoned")
            .insert(record.id.clone(), record);
    }

    /// The cached child records of a parent (empty when unknown).
    pub fn child_records(&self, parent: &EntityId) -> Vec<ChildRecord> {
        self.child_records
            .read()
            .expect("child record cache poisoned")
            .get(parent)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the cached child record list of a parent.
    pub fn set_child_records(&self, parent: EntityId, records: Vec<ChildRecord>) {
        self.child_records
            .write()
            .expect("child record cache poisoned")
            .insert(parent, records);
    }

    /// Apply the succeeded child-record operations of a batch to the cached
    /// list: deleted ids are removed, created and updated records upserted
    /// from the payload the server returned. Failed operations leave their
    /// records untouched.
    pub fn apply_child_results(&self, parent: &EntityId, results: &[OperationResult]) {
        let mut map = self.child_records.write().expect("child record cache poisoned");
        let records = map.entry(parent.clone()).or_default();

        for result in results {
            match (&result.operation, &result.outcome) {
                (Operation::DeleteChildRecord { id }, OpOutcome::Ok { .. }) => {
                    records.retain(|record| &record.id != id);
                }
                (_, OpOutcome::Ok { child: Some(record) }) => {
                    match records.iter_mut().find(|existing| existing.id == record.id) {
                        Some(existing) => *existing = record.clone(),
                        None => records.push(record.clone()),
                    }
                }
                _ => {}
            }
        }
    }
}
