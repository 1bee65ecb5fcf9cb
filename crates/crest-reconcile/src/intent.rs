//! Edit intents: the user-confirmed description of desired relation changes.
//!
//! Intents are explicit rather than computed from two entity snapshots, so
//! the form layer stays in control of what the operator actually confirmed.
//! Validation here catches malformed intents before any remote call; these
//! are precondition errors and never appear among per-operation failures.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crest_remote::{FieldSet, RefId};

/// An invalid intent, rejected before any operation is planned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    /// A singleton cannot be both removed and re-pointed in one edit.
    #[error("singleton relation '{relation}' marked removed and given a new value")]
    ConflictingSingletonEdit { relation: String },

    /// The same reference appears in both to_add and to_remove.
    #[error("reference '{reference}' appears in both to_add and to_remove of '{relation}'")]
    OverlappingCollectionEdit { relation: String, reference: RefId },

    /// A subscription edit must carry a delivery address.
    #[error("subscription edit is missing a delivery address")]
    MissingAddress,
}

/// Desired change to a singleton (to-one) relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SingletonEdit {
    /// Clear the relation.
    #[serde(default)]
    pub removed: bool,
    /// Point the relation at a new target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<RefId>,
}

impl SingletonEdit {
    /// Intent to point the relation at `target`.
    pub fn set(target: impl Into<RefId>) -> Self {
        Self {
            removed: false,
            new_value: Some(target.into()),
        }
    }

    /// Intent to clear the relation.
    pub fn remove() -> Self {
        Self {
            removed: true,
            new_value: None,
        }
    }

    /// Intent to leave the relation untouched.
    pub fn keep() -> Self {
        Self::default()
    }
}

/// Desired change to a collection (to-many) relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionEdit {
    /// References to add, in submission order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to_add: Vec<RefId>,
    /// References to remove, in submission order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to_remove: Vec<RefId>,
}

impl CollectionEdit {
    /// An edit touching nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference, builder style.
    #[must_use]
    pub fn add(mut self, reference: impl Into<RefId>) -> Self {
        self.to_add.push(reference.into());
        self
    }

    /// Remove a reference, builder style.
    #[must_use]
    pub fn remove(mut self, reference: impl Into<RefId>) -> Self {
        self.to_remove.push(reference.into());
        self
    }

    /// Whether the edit changes nothing.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// One batch of relation changes to an entity, as confirmed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditIntent {
    /// Replacement core fields, if any field was edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldSet>,
    /// Singleton relation edits by relation name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub singletons: BTreeMap<String, SingletonEdit>,
    /// Collection relation edits by relation name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collections: BTreeMap<String, CollectionEdit>,
}

impl EditIntent {
    /// An intent changing nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set replacement core fields, builder style.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldSet) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Record a singleton edit, builder style.
    #[must_use]
    pub fn with_singleton(mut self, relation: impl Into<String>, edit: SingletonEdit) -> Self {
        self.singletons.insert(relation.into(), edit);
        self
    }

    /// Record a collection edit, builder style.
    #[must_use]
    pub fn with_collection(mut self, relation: impl Into<String>, edit: CollectionEdit) -> Self {
        self.collections.insert(relation.into(), edit);
        self
    }

    /// Check the intent invariants.
    pub fn validate(&self) -> Result<(), IntentError> {
        for (relation, edit) in &self.singletons {
            if edit.removed && edit.new_value.is_some() {
                return Err(IntentError::ConflictingSingletonEdit {
                    relation: relation.clone(),
                });
            }
        }

        for (relation, edit) in &self.collections {
            let removing: BTreeSet<&RefId> = edit.to_remove.iter().collect();
            if let Some(reference) = edit.to_add.iter().find(|r| removing.contains(r)) {
                return Err(IntentError::OverlappingCollectionEdit {
                    relation: relation.clone(),
                    reference: reference.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Desired subscription state for one subscriber: the set of events plus the
/// shared delivery address and secret applied to every surviving record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSetIntent {
    /// Delivery address for all of the subscriber's records.
    pub address: String,
    /// Shared signing secret, if configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// The full desired set of subscribed events.
    pub events: BTreeSet<String>,
}

impl ChildSetIntent {
    /// Create a subscription intent.
    pub fn new(address: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            address: address.into(),
            secret,
            events: BTreeSet::new(),
        }
    }

    /// Add a desired event, builder style.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.insert(event.into());
        self
    }

    /// Check the intent invariants.
    pub fn validate(&self) -> Result<(), IntentError> {
        if self.address.trim().is_empty() {
            return Err(IntentError::MissingAddress);
        }
        Ok(())
    }
}
