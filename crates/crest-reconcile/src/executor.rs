//! Sequential operation executor with isolated failure domains.

use std::sync::Arc;

use crest_remote::{EntityId, RelationTransport};

use crate::op::{Operation, OperationResult};

/// Executes planned operations against the remote transport.
///
/// Operations run strictly sequentially, in plan order: the remote endpoints
/// are not safe under concurrent mutation of one parent (the server's own
/// read-modify-write of a child list can lose updates), so the executor never
/// overlaps calls even though the operations are logically independent.
///
/// Each call is awaited individually. A failure is recorded in that
/// operation's result and execution continues with the next operation; one
/// failed relation mutation must not block unrelated ones. No retries here —
/// retry policy belongs to the transport.
pub struct OperationExecutor<T> {
    transport: Arc<T>,
}

impl<T: RelationTransport> OperationExecutor<T> {
    /// Create an executor over the given transport.
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Execute a batch of operations for one entity, returning one result
    /// per operation in execution order.
    pub async fn execute(&self, entity_id: &EntityId, ops: Vec<Operation>) -> Vec<OperationResult> {
        let mut results = Vec::with_capacity(ops.len());

        for op in ops {
            let kind = op.kind();
            let result = self.execute_one(entity_id, op).await;

            if let Some(error) = result.error() {
                tracing::warn!(
                    entity_id = %entity_id,
                    operation = %kind,
                    error = %error,
                    "Operation failed, continuing with remaining operations"
                );
            } else {
                tracing::debug!(
                    entity_id = %entity_id,
                    operation = %kind,
                    "Operation applied"
                );
            }

            results.push(result);
        }

        results
    }

    async fn execute_one(&self, entity_id: &EntityId, op: Operation) -> OperationResult {
        match op {
            Operation::ReplaceFields { fields } => {
                let call = self.transport.replace_fields(entity_id, fields.clone()).await;
                let op = Operation::ReplaceFields { fields };
                match call {
                    // The refreshed record comes from the post-batch fetch;
                    // the replace response is not merged into the cache here.
                    Ok(_) => OperationResult::success(op),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
            Operation::SetSingleton { relation, target } => {
                let call = self.transport.set_singleton(entity_id, &relation, &target).await;
                let op = Operation::SetSingleton { relation, target };
                match call {
                    Ok(()) => OperationResult::success(op),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
            Operation::RemoveSingleton { relation } => {
                let call = self.transport.remove_singleton(entity_id, &relation).await;
                let op = Operation::RemoveSingleton { relation };
                match call {
                    Ok(()) => OperationResult::success(op),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
            Operation::AddToCollection { relation, member } => {
                let call = self
                    .transport
                    .add_to_collection(entity_id, &relation, &member)
                    .await;
                let op = Operation::AddToCollection { relation, member };
                match call {
                    Ok(()) => OperationResult::success(op),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
            Operation::RemoveFromCollection { relation, member } => {
                let call = self
                    .transport
                    .remove_from_collection(entity_id, &relation, &member)
                    .await;
                let op = Operation::RemoveFromCollection { relation, member };
                match call {
                    Ok(()) => OperationResult::success(op),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
            Operation::CreateChildRecord { draft } => {
                let call = self.transport.create_child_record(draft.clone()).await;
                let op = Operation::CreateChildRecord { draft };
                match call {
                    Ok(record) => OperationResult::success_with_child(op, record),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
            Operation::UpdateChildRecord { id, draft } => {
                let call = self.transport.update_child_record(&id, draft.clone()).await;
                let op = Operation::UpdateChildRecord { id, draft };
                match call {
                    Ok(record) => OperationResult::success_with_child(op, record),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
            Operation::DeleteChildRecord { id } => {
                let call = self.transport.delete_child_record(&id).await;
                let op = Operation::DeleteChildRecord { id };
                match call {
                    Ok(()) => OperationResult::success(op),
                    Err(error) => OperationResult::failure(op, error),
                }
            }
        }
    }
}
