//! Transport trait for the remote API's primitive mutation endpoints.

use async_trait::async_trait;

use crate::entity::{ChildRecord, ChildRecordDraft, EntityRecord};
use crate::error::RemoteResult;
use crate::fields::FieldSet;
use crate::ids::{EntityId, RecordId, RefId};

/// One method per primitive remote operation.
///
/// Implementations own connection management, authentication, timeouts, and
/// any retry policy. The reconciliation engine calls each method at most once
/// per planned operation and converts any error into that operation's failed
/// result without inspecting it.
///
/// Every mutation is a separate request server-side; there is no batch or
/// transactional endpoint, which is exactly why the engine exists.
#[async_trait]
pub trait RelationTransport: Send + Sync {
    /// Replace an entity's scalar core fields as a whole.
    async fn replace_fields(&self, id: &EntityId, fields: FieldSet) -> RemoteResult<EntityRecord>;

    /// Point a singleton relation at a new target.
    async fn set_singleton(
        &self,
        id: &EntityId,
        relation: &str,
        target: &RefId,
    ) -> RemoteResult<()>;

    /// Clear a singleton relation.
    async fn remove_singleton(&self, id: &EntityId, relation: &str) -> RemoteResult<()>;

    /// Add one member to a collection relation.
    async fn add_to_collection(
        &self,
        id: &EntityId,
        relation: &str,
        member: &RefId,
    ) -> RemoteResult<()>;

    /// Remove one member from a collection relation.
    async fn remove_from_collection(
        &self,
        id: &EntityId,
        relation: &str,
        member: &RefId,
    ) -> RemoteResult<()>;

    /// Create a child record; the server assigns its id.
    async fn create_child_record(&self, draft: ChildRecordDraft) -> RemoteResult<ChildRecord>;

    /// Update a surviving child record in place, keeping its identity.
    async fn update_child_record(
        &self,
        id: &RecordId,
        draft: ChildRecordDraft,
    ) -> RemoteResult<ChildRecord>;

    /// Delete a child record.
    async fn delete_child_record(&self, id: &RecordId) -> RemoteResult<()>;

    /// Fetch the canonical entity record, the source of truth for cache
    /// reconciliation after a batch of mutations.
    async fn fetch_entity(&self, id: &EntityId) -> RemoteResult<EntityRecord>;
}
