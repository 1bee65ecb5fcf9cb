//! Entity data model.
//!
//! An [`EntityRecord`] is the aggregate root being edited: scalar core
//! fields, zero or one singleton relations (leader, parent organization),
//! and zero or more collection relations (members, subordinate
//! organizations). Collection members are independently addressable on the
//! server; the record only carries their references.
//!
//! The publish-subscribe case materializes one [`ChildRecord`] per
//! (subscriber, event) pair. [`collapse_child_records`] folds a subscriber's
//! records into the collapsed `EntityRecord` view the UI edits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::fields::FieldSet;
use crate::ids::{EntityId, RecordId, RefId};

/// Relation name used for the collapsed event collection of a subscriber.
pub const EVENTS_RELATION: &str = "events";

/// Field name carrying a subscriber's delivery address in the collapsed view.
pub const ADDRESS_FIELD: &str = "address";

/// Field name carrying a subscriber's shared secret in the collapsed view.
pub const SECRET_FIELD: &str = "secret";

/// An aggregate entity as known to the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity identifier.
    pub id: EntityId,
    /// Scalar core fields, replaced as a whole.
    #[serde(default)]
    pub fields: FieldSet,
    /// Singleton (to-one) relations by name. Absent key means unset.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub singletons: BTreeMap<String, RefId>,
    /// Collection (to-many) relations by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, Vec<RefId>>,
}

impl EntityRecord {
    /// Create an entity with no fields or relations.
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            fields: FieldSet::new(),
            singletons: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    /// Set the core fields, builder style.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldSet) -> Self {
        self.fields = fields;
        self
    }

    /// Set a singleton relation, builder style.
    #[must_use]
    pub fn with_singleton(mut self, relation: impl Into<String>, target: impl Into<RefId>) -> Self {
        self.singletons.insert(relation.into(), target.into());
        self
    }

    /// Set a collection relation, builder style.
    #[must_use]
    pub fn with_collection<I, R>(mut self, relation: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RefId>,
    {
        self.collections
            .insert(relation.into(), members.into_iter().map(Into::into).collect());
        self
    }

    /// Current target of a singleton relation, if set.
    pub fn singleton(&self, relation: &str) -> Option<&RefId> {
        self.singletons.get(relation)
    }

    /// Members of a collection relation (empty slice when absent).
    pub fn collection(&self, relation: &str) -> &[RefId] {
        self.collections.get(relation).map_or(&[], Vec::as_slice)
    }

    /// Whether a reference is a member of a collection relation.
    pub fn has_member(&self, relation: &str, member: &RefId) -> bool {
        self.collection(relation).contains(member)
    }
}

/// One independently addressable (subscriber, event) subscription record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRecord {
    /// Server-assigned record identifier.
    pub id: RecordId,
    /// The subscriber this record belongs to.
    pub parent: EntityId,
    /// The subscribed event name.
    pub event: String,
    /// Delivery address shared by all of the subscriber's records.
    pub address: String,
    /// Shared secret used to sign deliveries, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl ChildRecord {
    /// The draft that would recreate this record.
    pub fn to_draft(&self) -> ChildRecordDraft {
        ChildRecordDraft {
            parent: self.parent.clone(),
            event: self.event.clone(),
            address: self.address.clone(),
            secret: self.secret.clone(),
        }
    }
}

/// Payload for creating or updating a child record. Identity (the record id)
/// is never part of the draft: updates keep the record's id, creates receive
/// one from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRecordDraft {
    /// The subscriber the record belongs to.
    pub parent: EntityId,
    /// The subscribed event name.
    pub event: String,
    /// Delivery address.
    pub address: String,
    /// Shared secret, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl ChildRecordDraft {
    /// Create a draft for a subscriber/event pair.
    pub fn new(
        parent: impl Into<EntityId>,
        event: impl Into<String>,
        address: impl Into<String>,
        secret: Option<String>,
    ) -> Self {
        Self {
            parent: parent.into(),
            event: event.into(),
            address: address.into(),
            secret,
        }
    }

    /// Materialize the draft into a record with the given id.
    pub fn into_record(self, id: RecordId) -> ChildRecord {
        ChildRecord {
            id,
            parent: self.parent,
            event: self.event,
            address: self.address,
            secret: self.secret,
        }
    }
}

/// Fold a subscriber's flat child records into the collapsed entity view:
/// one `events` collection plus the shared address/secret fields.
///
/// The address and secret are taken from the first record; after a
/// reconciliation all surviving records carry the same values.
pub fn collapse_child_records(parent: &EntityId, records: &[ChildRecord]) -> EntityRecord {
    let mut entity = EntityRecord::new(parent.clone());

    if let Some(first) = records.first() {
        entity.fields.set(ADDRESS_FIELD, first.address.as_str());
        match &first.secret {
            Some(secret) => entity.fields.set(SECRET_FIELD, secret.as_str()),
            None => entity.fields.set(SECRET_FIELD, crate::fields::FieldValue::Null),
        }
    }

    let events: Vec<RefId> = records.iter().map(|r| RefId::new(r.event.as_str())).collect();
    entity.collections.insert(EVENTS_RELATION.to_string(), events);
    entity
}
