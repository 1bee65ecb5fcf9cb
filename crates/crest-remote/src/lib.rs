//! # Crest Remote
//!
//! The seam between the Crest admin console and its remote API.
//!
//! The remote API exposes only coarse, single-purpose mutation endpoints
//! (set-leader, add-member, create-subscription, ...) with no endpoint that
//! atomically replaces an entity's full relation graph. This crate defines
//! the pieces the reconciliation engine needs to talk about that API without
//! owning the HTTP details:
//!
//! - Typed identifiers ([`EntityId`], [`RefId`], [`RecordId`])
//! - The entity data model ([`EntityRecord`], [`ChildRecord`], [`FieldSet`])
//! - The error taxonomy for remote calls ([`RemoteError`])
//! - The [`RelationTransport`] trait, one method per primitive endpoint
//!
//! Concrete transports (HTTP client, retry/auth policy) live with the
//! surrounding application and implement [`RelationTransport`].

pub mod entity;
pub mod error;
pub mod fields;
pub mod ids;
pub mod transport;

pub use entity::{
    collapse_child_records, ChildRecord, ChildRecordDraft, EntityRecord, ADDRESS_FIELD,
    EVENTS_RELATION, SECRET_FIELD,
};
pub use error::{RemoteError, RemoteResult};
pub use fields::{FieldSet, FieldValue};
pub use ids::{EntityId, RecordId, RefId};
pub use transport::RelationTransport;
