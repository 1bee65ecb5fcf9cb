//! Remote call error taxonomy.
//!
//! Errors carry only owned data so per-operation results stay `Clone` and
//! `Serialize` all the way to the UI. The reconciliation engine treats every
//! variant uniformly as the failure of one operation; classification exists
//! for transport implementations and operator-facing messages, not for
//! engine control flow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::EntityId;

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Error returned by a remote API call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteError {
    /// The remote API could not be reached.
    #[error("remote unreachable: {message}")]
    Unreachable { message: String },

    /// The call timed out.
    #[error("remote call timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Credentials were rejected.
    #[error("authentication failed")]
    Unauthorized,

    /// The operator lacks permission for this mutation.
    #[error("permission denied for {operation}")]
    Forbidden { operation: String },

    /// The target object does not exist on the server.
    #[error("not found: {entity_id}")]
    NotFound { entity_id: EntityId },

    /// The mutation conflicts with current server state.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The server rejected the request payload.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The server failed while processing the request.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },
}

impl RemoteError {
    /// Whether a retry by the transport layer could plausibly succeed.
    ///
    /// The engine itself never retries; this informs transport
    /// implementations and operator messaging.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Unreachable { .. }
                | RemoteError::Timeout { .. }
                | RemoteError::Server { .. }
        )
    }
}
