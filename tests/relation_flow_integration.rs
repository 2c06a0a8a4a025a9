use parking_lot::Mutex;
use relwatch::{
    ChangeLedger, ChangeObserver, ChangeSubject, ChangeType, EntityRef, HookRegistry, ItemList,
    ManyToMany, MemoryList, RelationHooks, RelationList, StaticResolver,
};
use serde_json::Map;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Records every aggregated notification the registry fans out
#[derive(Default)]
struct NotificationLog {
    relation_changed: AtomicUsize,
    named_changed: AtomicUsize,
    last_ledger: Mutex<Option<ChangeLedger>>,
    last_owner: Mutex<Option<EntityRef>>,
}

impl RelationHooks for NotificationLog {
    fn relation_changed(&self, owner: &EntityRef, relation: &str, changed: &ChangeLedger) {
        assert_eq!(relation, "Tags");
        self.relation_changed.fetch_add(1, Ordering::SeqCst);
        *self.last_ledger.lock() = Some(changed.clone());
        *self.last_owner.lock() = Some(owner.clone());
    }

    fn named_relation_changed(&self, _owner: &EntityRef, _changed: &ChangeLedger) {
        self.named_changed.fetch_add(1, Ordering::SeqCst);
    }
}

fn tags_relation() -> (RelationList, MemoryList, Arc<NotificationLog>) {
    let registry = Arc::new(HookRegistry::new());
    let notifications = Arc::new(NotificationLog::default());
    registry.register(notifications.clone());
    registry.register_named("Tags", notifications.clone());

    let resolver = Arc::new(StaticResolver::new().with("Article", EntityRef::new(42, "Article")));
    let observer = ChangeObserver::new("Tag", "Article", "Tags", registry, resolver);

    let memory = MemoryList::new();
    let list = RelationList::new(
        Arc::new(memory.clone()),
        Arc::new(ManyToMany::new("article_tags", "article_id", "tag_id")),
    )
    .observe(observer);

    (list, memory, notifications)
}

// Drives the per-item application path the way the underlying mutation layer
// would: one report per affected item.
fn apply_items(list: RelationList, ids: &[i64], change_type: ChangeType) -> RelationList {
    ids.iter().fold(list, |current, id| {
        current.update_item(&ChangeSubject::Identity(*id), Map::new(), change_type)
    })
}

#[test]
fn test_full_prescribe_apply_notify_workflow() {
    let _ = env_logger::builder().is_test(true).try_init();

    println!("🚀 Starting relation change-tracking workflow test");

    // Step 1: Scope the relation to its owner
    println!("1. Scoping the Tags relation to article 42");
    let (list, memory, notifications) = tags_relation();
    let list = list.for_foreign_id(42).expect("Failed to scope relation");
    assert_eq!(memory.filters().len(), 1, "Owner scope should install one filter");

    // Step 2: Bulk-add routes through one prescription cycle
    println!("2. Adding tags 1 and 2");
    let items = vec![
        ChangeSubject::Entity(EntityRef::new(1, "Tag")),
        ChangeSubject::Identity(2),
    ];
    let list = list.add_many(&items).expect("Failed to add tags");
    assert_eq!(memory.ids().unwrap(), vec![1, 2]);

    let observer = list.observer().expect("Observer should be attached");
    assert!(observer.is_prescribed(), "Add should have installed a prescription");
    assert!(!observer.all_changed(), "Nothing has been applied yet");
    assert_eq!(
        notifications.relation_changed.load(Ordering::SeqCst),
        0,
        "No notification before the prescription is fulfilled"
    );

    // Step 3: The per-item path lands each addition
    println!("3. Applying the two additions item by item");
    let list = apply_items(list, &[1, 2], ChangeType::Added);
    assert_eq!(
        notifications.relation_changed.load(Ordering::SeqCst),
        1,
        "Exactly one aggregated notification per completed cycle"
    );
    assert_eq!(notifications.named_changed.load(Ordering::SeqCst), 1);

    let owner = notifications.last_owner.lock().clone().unwrap();
    assert_eq!(owner, EntityRef::new(42, "Article"));

    let ledger = notifications.last_ledger.lock().clone().unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[&1].class, "Tag");
    assert_eq!(ledger[&1].change_type, Some(ChangeType::Added));
    assert_eq!(ledger[&2].change_type, Some(ChangeType::Added));

    // Step 4: Reset before the next cycle
    println!("4. Resetting the fulfilled prescription");
    let list = list.observe(list.observer().unwrap().reset());
    assert!(!list.observer().unwrap().is_prescribed());

    // Step 5: Replace membership; only the removal diff is observed
    println!("5. Replacing membership {{1,2}} with {{2,3}}");
    let list = list.set_by_id_list(&[2, 3]).expect("Failed to replace membership");
    assert_eq!(memory.ids().unwrap(), vec![2, 3]);

    let ledger = list.observer().unwrap().changed();
    assert_eq!(ledger.len(), 1, "Only the dropped id is prescribed");
    assert!(ledger.contains_key(&1));

    // Step 6: The removal lands, completing the second cycle
    println!("6. Applying the removal of tag 1");
    let list = apply_items(list, &[1], ChangeType::Removed);
    assert_eq!(
        notifications.relation_changed.load(Ordering::SeqCst),
        2,
        "Two completed cycles, two notifications"
    );
    assert_eq!(notifications.named_changed.load(Ordering::SeqCst), 2);

    let ledger = notifications.last_ledger.lock().clone().unwrap();
    assert_eq!(ledger[&1].change_type, Some(ChangeType::Removed));

    // Step 7: A conflicting prescription is rejected until reset
    println!("7. Verifying prescription conflict handling");
    let err = list
        .prepare_observer(&[ChangeSubject::Identity(9)], false)
        .unwrap_err();
    assert!(
        err.to_string().contains("prescription in flight"),
        "Unexpected error: {err}"
    );
    let list = list
        .prepare_observer(&[ChangeSubject::Identity(9)], true)
        .expect("Force reset should succeed");
    assert_eq!(list.observer().unwrap().changed().len(), 1);

    println!("✅ Workflow completed with exactly two aggregated notifications");
}

#[test]
fn test_remove_all_cycle() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (list, memory, notifications) = tags_relation();
    let list = list.for_foreign_id(vec![42]).expect("Failed to scope relation");

    // Seed membership without observation, as a loader would
    memory
        .set_by_id_list(&[10, 11])
        .expect("Failed to seed membership");

    println!("1. Clearing the relation prescribes the full membership");
    let list = list.remove_all().expect("Failed to clear relation");
    assert_eq!(memory.count().unwrap(), 0);

    let ledger = list.observer().unwrap().changed();
    assert_eq!(ledger.len(), 2);
    assert!(ledger.contains_key(&10) && ledger.contains_key(&11));

    println!("2. Applying both removals fires one notification");
    let _list = apply_items(list, &[10, 11], ChangeType::Removed);
    assert_eq!(notifications.relation_changed.load(Ordering::SeqCst), 1);

    let ledger = notifications.last_ledger.lock().clone().unwrap();
    assert!(ledger
        .values()
        .all(|record| record.change_type == Some(ChangeType::Removed)));
}

#[test]
fn test_unobserved_relation_is_pure_delegation() {
    let memory = MemoryList::new();
    let list = RelationList::new(
        Arc::new(memory.clone()),
        Arc::new(ManyToMany::new("article_tags", "article_id", "tag_id")),
    );

    let list = list
        .add_many(&[ChangeSubject::Identity(1), ChangeSubject::Identity(2)])
        .expect("add_many should delegate");
    assert_eq!(memory.ids().unwrap(), vec![1, 2]);

    let list = list.remove_all().expect("remove_all should delegate");
    assert_eq!(memory.count().unwrap(), 0);

    let list = list.set_by_id_list(&[3]).expect("set_by_id_list should delegate");
    assert_eq!(memory.ids().unwrap(), vec![3]);

    assert!(list.observer().is_none(), "No observer was ever attached");
}
