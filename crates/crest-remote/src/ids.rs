//! Typed identifiers for remote objects.
//!
//! Newtype wrappers so an entity id, a relation reference, and a child record
//! id cannot be confused at a call site. All three are string-backed: the
//! remote API uses UUIDs for most objects but composite keys for some child
//! records, so the engine never assumes UUID shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of an aggregate entity (organization, subscriber, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id from its string form.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty. An empty id must be rejected before any
    /// remote call is attempted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Reference to another entity used in a relation (a leader, a member, a
/// parent organization).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(String);

impl RefId {
    /// Create a reference id from its string form.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RefId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RefId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of an independently addressable child record (one per
/// subscriber/event pair in the publish-subscribe case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a record id from its string form.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mint a fresh UUID-backed record id.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
