//! Diff planners: from (original, intent) to an ordered operation list.
//!
//! Pure functions, no I/O. Relation axes are independent: core fields,
//! each singleton, and each collection contribute operations without any
//! cross-axis ordering dependency. The only ordering guarantees are that a
//! core-field replacement comes first and that within one collection the
//! adds precede the removes, each in submission order.

use std::collections::{BTreeSet, HashMap};

use crest_remote::{ChildRecord, ChildRecordDraft, EntityId, EntityRecord};

use crate::intent::{ChildSetIntent, EditIntent};
use crate::op::Operation;

/// Plan the operations realizing a relation edit on an entity.
///
/// Unchanged axes emit nothing, so a no-op intent plans an empty batch.
pub fn plan(original: &EntityRecord, intent: &EditIntent) -> Vec<Operation> {
    let mut ops = Vec::new();

    if let Some(fields) = &intent.fields {
        if *fields != original.fields {
            ops.push(Operation::ReplaceFields {
                fields: fields.clone(),
            });
        }
    }

    for (relation, edit) in &intent.singletons {
        if edit.removed {
            // Clearing an already-unset relation is still an explicit intent;
            // only skip when there is nothing to clear.
            if original.singleton(relation).is_some() {
                ops.push(Operation::RemoveSingleton {
                    relation: relation.clone(),
                });
            }
        } else if let Some(target) = &edit.new_value {
            if original.singleton(relation) != Some(target) {
                ops.push(Operation::SetSingleton {
                    relation: relation.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    for (relation, edit) in &intent.collections {
        for member in &edit.to_add {
            ops.push(Operation::AddToCollection {
                relation: relation.clone(),
                member: member.clone(),
            });
        }
        for member in &edit.to_remove {
            ops.push(Operation::RemoveFromCollection {
                relation: relation.clone(),
                member: member.clone(),
            });
        }
    }

    ops
}

/// Plan the operations realizing a subscription edit against the flat
/// per-event record set.
///
/// The desired state is "this set of events, this address/secret"; the
/// server materializes one record per (subscriber, event) pair, so the plan
/// decomposes into:
///
/// - an update for every *surviving* record (event in both sets) whose
///   stored address/secret differ from the desired values — identity is
///   preserved, the record id never changes;
/// - a create for every desired event with no existing record;
/// - a delete for every record whose event left the desired set.
///
/// A brand-new subscriber (no original records) plans only creates.
pub fn plan_child_records(
    parent: &EntityId,
    original: &[ChildRecord],
    intent: &ChildSetIntent,
) -> Vec<Operation> {
    let existing_by_event: HashMap<&str, &ChildRecord> = original
        .iter()
        .map(|record| (record.event.as_str(), record))
        .collect();
    let existing_events: BTreeSet<&str> =
        original.iter().map(|record| record.event.as_str()).collect();

    let mut ops = Vec::new();

    // Survivors first: propagate address/secret to every record staying
    // subscribed, skipping records already carrying the desired values.
    for event in &intent.events {
        if let Some(record) = existing_by_event.get(event.as_str()) {
            if record.address != intent.address || record.secret != intent.secret {
                ops.push(Operation::UpdateChildRecord {
                    id: record.id.clone(),
                    draft: ChildRecordDraft::new(
                        parent.clone(),
                        event.clone(),
                        intent.address.clone(),
                        intent.secret.clone(),
                    ),
                });
            }
        }
    }

    for event in &intent.events {
        if !existing_events.contains(event.as_str()) {
            ops.push(Operation::CreateChildRecord {
                draft: ChildRecordDraft::new(
                    parent.clone(),
                    event.clone(),
                    intent.address.clone(),
                    intent.secret.clone(),
                ),
            });
        }
    }

    for record in original {
        if !intent.events.contains(&record.event) {
            ops.push(Operation::DeleteChildRecord {
                id: record.id.clone(),
            });
        }
    }

    ops
}
