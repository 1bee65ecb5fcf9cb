//! End-to-end tests for the reconciliation service over a mock transport.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crest_reconcile::{
    ChildSetIntent, CollectionEdit, EditIntent, EntityStore, OperationKind, PatchStatus,
    ReconcileError, ReconciliationService, SingletonEdit,
};
use crest_remote::{
    ChildRecord, ChildRecordDraft, EntityId, EntityRecord, FieldSet, RecordId, RefId, RemoteError,
    RemoteResult, RelationTransport, ADDRESS_FIELD, EVENTS_RELATION,
};

/// Scriptable in-memory transport recording every call in order.
struct MockTransport {
    log: Mutex<Vec<String>>,
    fail_kinds: Mutex<HashSet<OperationKind>>,
    fail_fetch: AtomicBool,
    fetch_result: Mutex<Option<EntityRecord>>,
    created: AtomicUsize,
}

impl MockTransport {
    fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            fail_kinds: Mutex::new(HashSet::new()),
            fail_fetch: AtomicBool::new(false),
            fetch_result: Mutex::new(None),
            created: AtomicUsize::new(0),
        }
    }

    fn fail_on(&self, kind: OperationKind) {
        self.fail_kinds.lock().unwrap().insert(kind);
    }

    fn fail_fetch(&self) {
        self.fail_fetch.store(true, Ordering::SeqCst);
    }

    fn on_fetch(&self, record: EntityRecord) {
        *self.fetch_result.lock().unwrap() = Some(record);
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.log.lock().unwrap().push(call.into());
    }

    fn check(&self, kind: OperationKind) -> RemoteResult<()> {
        if self.fail_kinds.lock().unwrap().contains(&kind) {
            return Err(RemoteError::Timeout { timeout_secs: 30 });
        }
        Ok(())
    }
}

#[async_trait]
impl RelationTransport for MockTransport {
    async fn replace_fields(
        &self,
        entity_id: &EntityId,
        _fields: FieldSet,
    ) -> RemoteResult<EntityRecord> {
        self.record(format!("replace_fields {entity_id}"));
        self.check(OperationKind::ReplaceFields)?;
        Ok(EntityRecord::new(entity_id.clone()))
    }

    async fn set_singleton(
        &self,
        entity_id: &EntityId,
        relation: &str,
        target: &RefId,
    ) -> RemoteResult<()> {
        self.record(format!("set_singleton {entity_id} {relation} {target}"));
        self.check(OperationKind::SetSingleton)
    }

    async fn remove_singleton(&self, entity_id: &EntityId, relation: &str) -> RemoteResult<()> {
        self.record(format!("remove_singleton {entity_id} {relation}"));
        self.check(OperationKind::RemoveSingleton)
    }

    async fn add_to_collection(
        &self,
        entity_id: &EntityId,
        relation: &str,
        member: &RefId,
    ) -> RemoteResult<()> {
        self.record(format!("add_to_collection {entity_id} {relation} {member}"));
        self.check(OperationKind::AddToCollection)
    }

    async fn remove_from_collection(
        &self,
        entity_id: &EntityId,
        relation: &str,
        member: &RefId,
    ) -> RemoteResult<()> {
        self.record(format!(
            "remove_from_collection {entity_id} {relation} {member}"
        ));
        self.check(OperationKind::RemoveFromCollection)
    }

    async fn create_child_record(&self, draft: ChildRecordDraft) -> RemoteResult<ChildRecord> {
        self.record(format!("create_child_record {}", draft.event));
        self.check(OperationKind::CreateChildRecord)?;
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(draft.into_record(RecordId::new(format!("rec-new-{n}"))))
    }

    async fn update_child_record(
        &self,
        id: &RecordId,
        draft: ChildRecordDraft,
    ) -> RemoteResult<ChildRecord> {
        self.record(format!("update_child_record {id} {}", draft.event));
        self.check(OperationKind::UpdateChildRecord)?;
        Ok(draft.into_record(id.clone()))
    }

    async fn delete_child_record(&self, id: &RecordId) -> RemoteResult<()> {
        self.record(format!("delete_child_record {id}"));
        self.check(OperationKind::DeleteChildRecord)
    }

    async fn fetch_entity(&self, entity_id: &EntityId) -> RemoteResult<EntityRecord> {
        self.record(format!("fetch_entity {entity_id}"));
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Unreachable {
                message: "connection refused".to_string(),
            });
        }
        let scripted = self.fetch_result.lock().unwrap().clone();
        Ok(scripted.unwrap_or_else(|| EntityRecord::new(entity_id.clone())))
    }
}

fn make_service() -> (Arc<MockTransport>, Arc<EntityStore>, ReconciliationService<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let store = Arc::new(EntityStore::new());
    let service = ReconciliationService::new(transport.clone(), store.clone());
    (transport, store, service)
}

fn make_org() -> EntityRecord {
    EntityRecord::new("o1")
        .with_singleton("leader", "p1")
        .with_collection("members", ["m1", "m2"])
}

fn org_edit_intent() -> EditIntent {
    EditIntent::new()
        .with_singleton("leader", SingletonEdit::set("p2"))
        .with_collection("members", CollectionEdit::new().add("m3").remove("m1"))
}

fn make_subscription(id: &str, event: &str, address: &str) -> ChildRecord {
    ChildRecord {
        id: RecordId::new(id),
        parent: EntityId::new("sub-1"),
        event: event.to_string(),
        address: address.to_string(),
        secret: None,
    }
}

#[tokio::test]
async fn test_org_edit_success_updates_cache() {
    let (transport, store, service) = make_service();
    let refreshed = EntityRecord::new("o1")
        .with_singleton("leader", "p2")
        .with_collection("members", ["m2", "m3"]);
    transport.on_fetch(refreshed.clone());

    let outcome = service.reconcile(&make_org(), &org_edit_intent()).await.unwrap();

    assert_eq!(outcome.status, PatchStatus::Success);
    assert_eq!(outcome.entity, Some(refreshed.clone()));
    assert_eq!(outcome.summary.attempted, 3);
    assert_eq!(outcome.summary.succeeded, 3);
    assert!(outcome.failures.is_empty());

    assert_eq!(
        transport.calls(),
        vec![
            "set_singleton o1 leader p2",
            "add_to_collection o1 members m3",
            "remove_from_collection o1 members m1",
            "fetch_entity o1",
        ]
    );
    assert_eq!(store.get(&EntityId::new("o1")), Some(refreshed));
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let (transport, store, service) = make_service();
    transport.fail_on(OperationKind::AddToCollection);
    let refreshed = EntityRecord::new("o1").with_singleton("leader", "p2");
    transport.on_fetch(refreshed.clone());

    let outcome = service.reconcile(&make_org(), &org_edit_intent()).await.unwrap();

    assert_eq!(outcome.status, PatchStatus::Partial);
    assert_eq!(outcome.summary.attempted, 3);
    assert_eq!(outcome.summary.succeeded, 2);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(
        outcome.failures[0].operation.kind(),
        OperationKind::AddToCollection
    );
    assert_eq!(
        outcome.failures[0].error(),
        Some(&RemoteError::Timeout { timeout_secs: 30 })
    );

    // The removal after the failed add still ran.
    let calls = transport.calls();
    assert!(calls.contains(&"remove_from_collection o1 members m1".to_string()));

    // Cache was overwritten from the re-fetch, not hand-merged.
    assert_eq!(outcome.entity, Some(refreshed.clone()));
    assert_eq!(store.get(&EntityId::new("o1")), Some(refreshed));
}

#[tokio::test]
async fn test_failed_member_removal_reported_per_relation() {
    let (transport, _store, service) = make_service();
    transport.fail_on(OperationKind::RemoveFromCollection);
    transport.on_fetch(EntityRecord::new("o1"));

    let outcome = service.reconcile(&make_org(), &org_edit_intent()).await.unwrap();

    assert_eq!(outcome.status, PatchStatus::Partial);
    assert_eq!(outcome.failures.len(), 1);
    // The retained operation lets the UI say which member was not removed.
    assert_eq!(
        outcome.failures[0].operation.describe(),
        "remove m1 from members"
    );
}

#[tokio::test]
async fn test_missing_entity_id_rejected_before_any_call() {
    let (transport, _store, service) = make_service();

    let result = service.reconcile(&EntityRecord::new(""), &org_edit_intent()).await;

    assert!(matches!(result, Err(ReconcileError::MissingEntityId)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_intent_rejected_before_any_call() {
    let (transport, _store, service) = make_service();
    let intent = EditIntent::new()
        .with_collection("members", CollectionEdit::new().add("m1").remove("m1"));

    let result = service.reconcile(&make_org(), &intent).await;

    assert!(matches!(result, Err(ReconcileError::InvalidIntent(_))));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_noop_intent_short_circuits() {
    let (transport, store, service) = make_service();
    let original = make_org();
    let intent = EditIntent::new()
        .with_singleton("leader", SingletonEdit::set("p1"))
        .with_collection("members", CollectionEdit::new());

    let outcome = service.reconcile(&original, &intent).await.unwrap();

    assert_eq!(outcome.status, PatchStatus::Success);
    assert_eq!(outcome.entity, Some(original));
    assert_eq!(outcome.summary.attempted, 0);
    assert!(transport.calls().is_empty());
    assert!(store.get(&EntityId::new("o1")).is_none());
}

#[tokio::test]
async fn test_total_failure_is_error_and_cache_untouched() {
    let (transport, store, service) = make_service();
    transport.fail_on(OperationKind::SetSingleton);
    transport.fail_on(OperationKind::AddToCollection);
    transport.fail_on(OperationKind::RemoveFromCollection);

    let stale = make_org();
    store.insert(stale.clone());

    let result = service.reconcile(&stale, &org_edit_intent()).await;

    let outcome = match result {
        Err(ReconcileError::Failed(outcome)) => outcome,
        other => panic!("expected total failure, got {other:?}"),
    };
    assert_eq!(outcome.status, PatchStatus::Fail);
    assert_eq!(outcome.entity, None);
    assert_eq!(outcome.failures.len(), 3);
    assert_eq!(outcome.summary.failed, 3);

    // No post-batch refresh on total failure; stale entry stays.
    assert!(!transport.calls().iter().any(|c| c.starts_with("fetch_entity")));
    assert_eq!(store.get(&EntityId::new("o1")), Some(stale));
}

#[tokio::test]
async fn test_failed_refresh_keeps_status_and_stale_cache() {
    let (transport, store, service) = make_service();
    transport.fail_fetch();

    let stale = make_org();
    store.insert(stale.clone());

    let outcome = service.reconcile(&stale, &org_edit_intent()).await.unwrap();

    assert_eq!(outcome.status, PatchStatus::Success);
    assert_eq!(outcome.entity, None);
    assert_eq!(store.get(&EntityId::new("o1")), Some(stale));
}

#[tokio::test]
async fn test_subscription_edit_end_to_end() {
    let (transport, store, service) = make_service();
    let parent = EntityId::new("sub-1");
    let original = vec![
        make_subscription("rec-a", "event.a", "https://hooks.example/old"),
        make_subscription("rec-b", "event.b", "https://hooks.example/old"),
    ];
    let intent = ChildSetIntent::new("https://hooks.example/new", None)
        .with_event("event.b")
        .with_event("event.c");

    let outcome = service
        .reconcile_children(&parent, &original, &intent)
        .await
        .unwrap();

    assert_eq!(outcome.status, PatchStatus::Success);
    assert_eq!(
        transport.calls(),
        vec![
            "update_child_record rec-b event.b",
            "create_child_record event.c",
            "delete_child_record rec-a",
        ]
    );

    // Cache: rec-b updated in place (same id), event.c created, rec-a gone.
    let records = store.child_records(&parent);
    assert_eq!(records.len(), 2);
    let survivor = records.iter().find(|r| r.event == "event.b").unwrap();
    assert_eq!(survivor.id, RecordId::new("rec-b"));
    assert_eq!(survivor.address, "https://hooks.example/new");
    assert!(records.iter().any(|r| r.event == "event.c"));
    assert!(records.iter().all(|r| r.id != RecordId::new("rec-a")));

    // Collapsed view attached to the outcome and cached under the parent id.
    let entity = outcome.entity.unwrap();
    let events = entity.collection(EVENTS_RELATION);
    assert_eq!(events.len(), 2);
    assert!(events.contains(&RefId::new("event.b")));
    assert!(events.contains(&RefId::new("event.c")));
    assert_eq!(
        entity.fields.get_str(ADDRESS_FIELD),
        Some("https://hooks.example/new")
    );
    assert_eq!(store.get(&parent), Some(entity));
}

#[tokio::test]
async fn test_subscription_partial_keeps_failed_delete_cached() {
    let (transport, store, service) = make_service();
    transport.fail_on(OperationKind::DeleteChildRecord);
    let parent = EntityId::new("sub-1");
    let original = vec![
        make_subscription("rec-a", "event.a", "https://hooks.example/a"),
        make_subscription("rec-b", "event.b", "https://hooks.example/a"),
    ];
    let intent = ChildSetIntent::new("https://hooks.example/a", None)
        .with_event("event.b")
        .with_event("event.c");

    let outcome = service
        .reconcile_children(&parent, &original, &intent)
        .await
        .unwrap();

    assert_eq!(outcome.status, PatchStatus::Partial);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(
        outcome.failures[0].operation.kind(),
        OperationKind::DeleteChildRecord
    );

    // The undeleted record stays in the cache and in the collapsed view.
    let records = store.child_records(&parent);
    assert_eq!(records.len(), 3);
    assert!(records.iter().any(|r| r.id == RecordId::new("rec-a")));
    let entity = outcome.entity.unwrap();
    assert!(entity
        .collection(EVENTS_RELATION)
        .contains(&RefId::new("event.a")));
}

#[tokio::test]
async fn test_brand_new_subscriber_creates_all_records() {
    let (transport, store, service) = make_service();
    let parent = EntityId::new("sub-9");
    let intent = ChildSetIntent::new("https://hooks.example/a", Some("s3cr3t".into()))
        .with_event("event.a")
        .with_event("event.b");

    let outcome = service.reconcile_children(&parent, &[], &intent).await.unwrap();

    assert_eq!(outcome.status, PatchStatus::Success);
    assert_eq!(transport.calls().len(), 2);
    let records = store.child_records(&parent);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.secret.as_deref() == Some("s3cr3t")));
}

#[tokio::test]
async fn test_subscription_total_failure_leaves_cache_untouched() {
    let (transport, store, service) = make_service();
    transport.fail_on(OperationKind::CreateChildRecord);
    let parent = EntityId::new("sub-1");
    let intent = ChildSetIntent::new("https://hooks.example/a", None).with_event("event.a");

    let result = service.reconcile_children(&parent, &[], &intent).await;

    assert!(matches!(result, Err(ReconcileError::Failed(_))));
    assert!(store.child_records(&parent).is_empty());
    assert!(store.get(&parent).is_none());
}

#[tokio::test]
async fn test_subscription_missing_address_rejected() {
    let (transport, _store, service) = make_service();
    let intent = ChildSetIntent::new("", None).with_event("event.a");

    let result = service
        .reconcile_children(&EntityId::new("sub-1"), &[], &intent)
        .await;

    assert!(matches!(result, Err(ReconcileError::InvalidIntent(_))));
    assert!(transport.calls().is_empty());
}
