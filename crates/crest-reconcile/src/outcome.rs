//! Tri-state patch outcomes.
//!
//! A batch of operations ends in exactly one of three states: everything
//! applied (SUCCESS), some operations failed while others applied (PARTIAL),
//! or nothing applied (FAIL). Partial is a meaningful domain outcome, not an
//! exception — callers inspect [`PatchOutcome::status`] rather than relying
//! on an error path to detect it.

use serde::{Deserialize, Serialize};

use crest_remote::EntityRecord;

use crate::op::OperationResult;

/// Classification of a completed patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    /// Every attempted operation applied (or nothing needed changing).
    Success,
    /// At least one operation applied and at least one failed.
    Partial,
    /// Every attempted operation failed.
    Fail,
}

impl PatchStatus {
    /// Stable string form used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchStatus::Success => "success",
            PatchStatus::Partial => "partial",
            PatchStatus::Fail => "fail",
        }
    }
}

impl std::fmt::Display for PatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts over one executed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSummary {
    /// Operations attempted.
    pub attempted: usize,
    /// Operations that applied.
    pub succeeded: usize,
    /// Operations that failed.
    pub failed: usize,
}

/// Result of one reconciliation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOutcome {
    /// Tri-state classification.
    pub status: PatchStatus,
    /// The entity after the batch: the unchanged original when nothing
    /// needed changing, otherwise the re-fetched canonical record. `None`
    /// on total failure, or when the post-apply re-fetch itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityRecord>,
    /// The failed operations only, each retaining the originating
    /// [`Operation`](crate::op::Operation) so the UI can report per relation
    /// what did not apply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<OperationResult>,
    /// Batch counts.
    pub summary: PatchSummary,
}

impl PatchOutcome {
    /// Outcome for a batch that planned zero operations.
    pub fn unchanged(original: EntityRecord) -> Self {
        Self {
            status: PatchStatus::Success,
            entity: Some(original),
            failures: Vec::new(),
            summary: PatchSummary::default(),
        }
    }

    /// Whether every operation applied.
    pub fn is_success(&self) -> bool {
        self.status == PatchStatus::Success
    }

    /// Whether some but not all operations applied.
    pub fn is_partial(&self) -> bool {
        self.status == PatchStatus::Partial
    }

    /// Whether nothing applied.
    pub fn is_fail(&self) -> bool {
        self.status == PatchStatus::Fail
    }
}

/// Classify executed results into a [`PatchOutcome`].
///
/// `refreshed` is the canonical record re-fetched after the batch; it is
/// attached whenever at least one operation applied. Must not be called with
/// an empty result set — the service short-circuits no-op batches through
/// [`PatchOutcome::unchanged`].
pub fn aggregate(results: Vec<OperationResult>, refreshed: Option<EntityRecord>) -> PatchOutcome {
    let attempted = results.len();
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let failed = attempted - succeeded;

    let status = if failed == 0 {
        PatchStatus::Success
    } else if succeeded == 0 {
        PatchStatus::Fail
    } else {
        PatchStatus::Partial
    };

    let failures: Vec<OperationResult> =
        results.into_iter().filter(OperationResult::is_failure).collect();

    PatchOutcome {
        status,
        entity: if succeeded > 0 { refreshed } else { None },
        failures,
        summary: PatchSummary {
            attempted,
            succeeded,
            failed,
        },
    }
}
