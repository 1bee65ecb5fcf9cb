//! Primitive operations and their per-operation results.
//!
//! One [`Operation`] maps to exactly one remote endpoint call. Results keep
//! the originating operation so the UI can report, per relation or event,
//! which change did not apply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crest_remote::{ChildRecord, ChildRecordDraft, FieldSet, RecordId, RefId, RemoteError};

/// One primitive remote mutation derived from the diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Replace the entity's scalar core fields as a whole.
    ReplaceFields { fields: FieldSet },
    /// Point a singleton relation at a new target.
    SetSingleton { relation: String, target: RefId },
    /// Clear a singleton relation.
    RemoveSingleton { relation: String },
    /// Add one member to a collection relation.
    AddToCollection { relation: String, member: RefId },
    /// Remove one member from a collection relation.
    RemoveFromCollection { relation: String, member: RefId },
    /// Create one child record (one subscription per event).
    CreateChildRecord { draft: ChildRecordDraft },
    /// Update a surviving child record in place.
    UpdateChildRecord { id: RecordId, draft: ChildRecordDraft },
    /// Delete one child record.
    DeleteChildRecord { id: RecordId },
}

impl Operation {
    /// The operation's kind, for logging and summaries.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ReplaceFields { .. } => OperationKind::ReplaceFields,
            Operation::SetSingleton { .. } => OperationKind::SetSingleton,
            Operation::RemoveSingleton { .. } => OperationKind::RemoveSingleton,
            Operation::AddToCollection { .. } => OperationKind::AddToCollection,
            Operation::RemoveFromCollection { .. } => OperationKind::RemoveFromCollection,
            Operation::CreateChildRecord { .. } => OperationKind::CreateChildRecord,
            Operation::UpdateChildRecord { .. } => OperationKind::UpdateChildRecord,
            Operation::DeleteChildRecord { .. } => OperationKind::DeleteChildRecord,
        }
    }

    /// Human-readable description for operator-facing failure reports.
    pub fn describe(&self) -> String {
        match self {
            Operation::ReplaceFields { .. } => "replace core fields".to_string(),
            Operation::SetSingleton { relation, target } => {
                format!("set {relation} to {target}")
            }
            Operation::RemoveSingleton { relation } => format!("remove {relation}"),
            Operation::AddToCollection { relation, member } => {
                format!("add {member} to {relation}")
            }
            Operation::RemoveFromCollection { relation, member } => {
                format!("remove {member} from {relation}")
            }
            Operation::CreateChildRecord { draft } => {
                format!("subscribe to {}", draft.event)
            }
            Operation::UpdateChildRecord { draft, .. } => {
                format!("update subscription for {}", draft.event)
            }
            Operation::DeleteChildRecord { id } => format!("cancel subscription {id}"),
        }
    }
}

/// Kind discriminant for [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ReplaceFields,
    RemoveSingleton,
    SetSingleton,
    AddToCollection,
    RemoveFromCollection,
    CreateChildRecord,
    UpdateChildRecord,
    DeleteChildRecord,
}

impl OperationKind {
    /// Stable string form used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::ReplaceFields => "replace_fields",
            OperationKind::SetSingleton => "set_singleton",
            OperationKind::RemoveSingleton => "remove_singleton",
            OperationKind::AddToCollection => "add_to_collection",
            OperationKind::RemoveFromCollection => "remove_from_collection",
            OperationKind::CreateChildRecord => "create_child_record",
            OperationKind::UpdateChildRecord => "update_child_record",
            OperationKind::DeleteChildRecord => "delete_child_record",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of executing one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpOutcome {
    /// The remote call succeeded. Child-record calls carry the record the
    /// server returned, used to upsert the local record list.
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        child: Option<ChildRecord>,
    },
    /// The remote call failed; later operations still run.
    Failed { error: RemoteError },
}

/// Result of one executed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// The operation that was attempted.
    pub operation: Operation,
    /// What happened.
    pub outcome: OpOutcome,
    /// When the call completed.
    pub executed_at: DateTime<Utc>,
}

impl OperationResult {
    /// A successful result with no returned payload.
    pub fn success(operation: Operation) -> Self {
        Self {
            operation,
            outcome: OpOutcome::Ok { child: None },
            executed_at: Utc::now(),
        }
    }

    /// A successful result carrying the created/updated child record.
    pub fn success_with_child(operation: Operation, child: ChildRecord) -> Self {
        Self {
            operation,
            outcome: OpOutcome::Ok { child: Some(child) },
            executed_at: Utc::now(),
        }
    }

    /// A failed result.
    pub fn failure(operation: Operation, error: RemoteError) -> Self {
        Self {
            operation,
            outcome: OpOutcome::Failed { error },
            executed_at: Utc::now(),
        }
    }

    /// Whether the operation applied.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, OpOutcome::Ok { .. })
    }

    /// Whether the operation failed.
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, OpOutcome::Failed { .. })
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&RemoteError> {
        match &self.outcome {
            OpOutcome::Failed { error } => Some(error),
            OpOutcome::Ok { .. } => None,
        }
    }

    /// Operator-facing failure message, if the operation failed.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    /// The child record returned by a successful child-record call.
    pub fn child(&self) -> Option<&ChildRecord> {
        match &self.outcome {
            OpOutcome::Ok { child } => child.as_ref(),
            OpOutcome::Failed { .. } => None,
        }
    }
}
