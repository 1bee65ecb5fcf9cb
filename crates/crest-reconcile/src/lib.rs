//! # Crest Reconciliation Engine
//!
//! Turns one whole-graph edit from the admin console into the smallest batch
//! of primitive remote operations, executes them with isolated failure
//! domains, and keeps the local cache consistent with what actually applied.
//!
//! The remote API offers only coarse single-purpose endpoints (set-leader,
//! add-member, create-subscription, ...), no atomic replace-relations call.
//! The Organization editor and the Publish/Subscribe editor both submit one
//! batch of relation changes per save; this engine is the shared machinery
//! behind both.
//!
//! ## Pipeline
//!
//! ```text
//! UI submit
//!    │
//!    ▼
//! ReconciliationService::reconcile / reconcile_children
//!    │  validate (entity id, intent invariants)     — precondition errors
//!    ▼
//! diff::plan / diff::plan_child_records             — Vec<Operation>
//!    ▼
//! OperationExecutor::execute                        — sequential, failures isolated
//!    ▼
//! outcome::aggregate                                — SUCCESS / PARTIAL / FAIL
//!    ▼
//! EntityStore reconciliation                        — only what succeeded
//! ```
//!
//! Partial failure is a first-class outcome, not an exception: a failed
//! member removal never blocks an unrelated leader change, and the returned
//! [`PatchOutcome`] itemizes exactly which operations did not apply.

pub mod cache;
pub mod diff;
pub mod executor;
pub mod intent;
pub mod op;
pub mod outcome;
pub mod service;

pub use cache::EntityStore;
pub use executor::OperationExecutor;
pub use intent::{ChildSetIntent, CollectionEdit, EditIntent, IntentError, SingletonEdit};
pub use op::{OpOutcome, Operation, OperationKind, OperationResult};
pub use outcome::{PatchOutcome, PatchStatus, PatchSummary};
pub use service::{ReconcileError, ReconcileResult, ReconciliationService};
