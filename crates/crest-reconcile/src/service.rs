//! Reconciliation service: the engine's public entry point.
//!
//! One service instance is constructed per transport/cache pair (explicit
//! dependency injection, no ambient globals) and handles one edit
//! transaction per call: validate, plan, execute, aggregate, reconcile the
//! cache, return the outcome.
//!
//! Error surface, mirroring the precondition/outcome split:
//!
//! - A missing entity id or invalid intent fails synchronously before any
//!   remote call ([`ReconcileError::MissingEntityId`],
//!   [`ReconcileError::InvalidIntent`]).
//! - A batch where *every* attempted operation failed is
//!   [`ReconcileError::Failed`], carrying the full FAIL outcome.
//! - Success and partial outcomes are `Ok`; callers inspect
//!   [`PatchOutcome::status`] — partial failure is a domain outcome, not an
//!   error path.

use std::sync::Arc;

use thiserror::Error;

use crest_remote::{collapse_child_records, ChildRecord, EntityId, EntityRecord, RelationTransport};

use crate::cache::EntityStore;
use crate::diff;
use crate::executor::OperationExecutor;
use crate::intent::{ChildSetIntent, EditIntent, IntentError};
use crate::op::OperationResult;
use crate::outcome::{self, PatchOutcome};

/// Result type for reconciliation calls.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Error returned by [`ReconciliationService`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The entity id was absent or empty; nothing was attempted.
    #[error("entity id is missing or empty")]
    MissingEntityId,

    /// The intent violated its invariants; nothing was attempted.
    #[error("invalid edit intent: {0}")]
    InvalidIntent(#[from] IntentError),

    /// Every attempted operation failed. Remote state was touched (calls
    /// were made) but nothing applied; the outcome itemizes each failure.
    #[error("no operation in the batch succeeded")]
    Failed(PatchOutcome),
}

/// Orchestrates one relation edit transaction end to end.
pub struct ReconciliationService<T> {
    transport: Arc<T>,
    store: Arc<EntityStore>,
    executor: OperationExecutor<T>,
}

impl<T: RelationTransport> ReconciliationService<T> {
    /// Create a service over the given transport and cache.
    #[must_use]
    pub fn new(transport: Arc<T>, store: Arc<EntityStore>) -> Self {
        Self {
            executor: OperationExecutor::new(transport.clone()),
            transport,
            store,
        }
    }

    /// The injected cache, shared with the read side of the dashboard.
    #[must_use]
    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// Reconcile a relation edit on an entity (organization editor flavor).
    ///
    /// `original` is the last-known state the operator edited against.
    pub async fn reconcile(
        &self,
        original: &EntityRecord,
        intent: &EditIntent,
    ) -> ReconcileResult<PatchOutcome> {
        if original.id.is_empty() {
            return Err(ReconcileError::MissingEntityId);
        }
        intent.validate()?;

        let ops = diff::plan(original, intent);
        if ops.is_empty() {
            tracing::debug!(entity_id = %original.id, "Intent plans no operations");
            return Ok(PatchOutcome::unchanged(original.clone()));
        }

        tracing::info!(
            entity_id = %original.id,
            operations = ops.len(),
            "Executing relation patch"
        );

        let results = self.executor.execute(&original.id, ops).await;
        let succeeded = results.iter().filter(|r| r.is_success()).count();

        if succeeded == 0 {
            return Err(self.total_failure(&original.id, results));
        }

        let refreshed = self.refresh_entity(&original.id).await;
        let outcome = outcome::aggregate(results, refreshed);
        tracing::info!(
            entity_id = %original.id,
            status = %outcome.status,
            failed = outcome.summary.failed,
            "Relation patch finished"
        );
        Ok(outcome)
    }

    /// Reconcile a subscription edit against the flat per-event record set
    /// (publish/subscribe editor flavor).
    ///
    /// `original` is the last-known list of the subscriber's records; a
    /// brand-new subscriber passes an empty slice.
    pub async fn reconcile_children(
        &self,
        parent: &EntityId,
        original: &[ChildRecord],
        intent: &ChildSetIntent,
    ) -> ReconcileResult<PatchOutcome> {
        if parent.is_empty() {
            return Err(ReconcileError::MissingEntityId);
        }
        intent.validate()?;

        let ops = diff::plan_child_records(parent, original, intent);
        if ops.is_empty() {
            tracing::debug!(entity_id = %parent, "Subscription intent plans no operations");
            return Ok(PatchOutcome::unchanged(collapse_child_records(parent, original)));
        }

        tracing::info!(
            entity_id = %parent,
            operations = ops.len(),
            "Executing subscription patch"
        );

        let results = self.executor.execute(parent, ops).await;
        let succeeded = results.iter().filter(|r| r.is_success()).count();

        if succeeded == 0 {
            return Err(self.total_failure(parent, results));
        }

        // Seed the cache with the caller's last-known records before the
        // in-place upserts; the store may not have seen this parent yet.
        if self.store.child_records(parent).is_empty() && !original.is_empty() {
            self.store.set_child_records(parent.clone(), original.to_vec());
        }
        self.store.apply_child_results(parent, &results);

        let collapsed = collapse_child_records(parent, &self.store.child_records(parent));
        self.store.insert(collapsed.clone());

        let outcome = outcome::aggregate(results, Some(collapsed));
        tracing::info!(
            entity_id = %parent,
            status = %outcome.status,
            failed = outcome.summary.failed,
            "Subscription patch finished"
        );
        Ok(outcome)
    }

    /// Build the FAIL outcome for a batch where nothing applied. The cache
    /// stays untouched: no remote mutation succeeded, so the last-known
    /// state is still accurate.
    fn total_failure(&self, entity_id: &EntityId, results: Vec<OperationResult>) -> ReconcileError {
        tracing::error!(
            entity_id = %entity_id,
            attempted = results.len(),
            "Every operation in the batch failed"
        );
        ReconcileError::Failed(outcome::aggregate(results, None))
    }

    /// Re-fetch the canonical record and overwrite the cache entry.
    ///
    /// If the re-fetch fails the stale entry is left in place and the
    /// outcome carries no entity; inventing a merged record here would cache
    /// a state the server never held.
    async fn refresh_entity(&self, entity_id: &EntityId) -> Option<EntityRecord> {
        match self.transport.fetch_entity(entity_id).await {
            Ok(record) => {
                self.store.insert(record.clone());
                Some(record)
            }
            Err(error) => {
                tracing::warn!(
                    entity_id = %entity_id,
                    error = %error,
                    "Post-patch refresh failed; cache entry left stale"
                );
                None
            }
        }
    }
}
