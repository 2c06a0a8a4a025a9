use crate::model::{ChangeLedger, ChangeSubject, ChangeType, EntityRef, ExtraFields};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Extension hook surface. Every method has an empty default body; handlers
/// override what they care about. Return values are never consulted - a
/// handler cannot veto the operation that fired it.
pub trait RelationHooks: Send + Sync {
    /// Pass-through notification point fired before each ledger write.
    fn on_before_update(
        &self,
        _item: &ChangeSubject,
        _extra: &ExtraFields,
        _change_type: ChangeType,
    ) {
    }

    /// Fired with the coverage predicate's value after each ledger write.
    fn update_all_changed(&self, _all_changed: bool) {}

    /// Aggregated notification carrying the relation name and full ledger.
    fn relation_changed(&self, _owner: &EntityRef, _relation: &str, _changed: &ChangeLedger) {}

    /// Relation-name-specific notification, fired only on handlers
    /// registered under the matching relation name.
    fn named_relation_changed(&self, _owner: &EntityRef, _changed: &ChangeLedger) {}
}

/// Resolves the process-wide representative instance used as the address for
/// relation-changed notifications.
pub trait OwnerResolver: Send + Sync {
    fn representative(&self, class: &str) -> Option<EntityRef>;
}

/// Static class -> representative table, sufficient for embedders that know
/// their owner classes up front.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    representatives: HashMap<String, EntityRef>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class: impl Into<String>, representative: EntityRef) -> Self {
        self.representatives.insert(class.into(), representative);
        self
    }
}

impl OwnerResolver for StaticResolver {
    fn representative(&self, class: &str) -> Option<EntityRef> {
        self.representatives.get(class).cloned()
    }
}

/// Fan-out registry: zero or more handlers per hook point, registered
/// globally or under a relation name.
#[derive(Default)]
pub struct HookRegistry {
    global: RwLock<Vec<Arc<dyn RelationHooks>>>,
    named: RwLock<HashMap<String, Vec<Arc<dyn RelationHooks>>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<dyn RelationHooks>) {
        self.global.write().push(handler);
    }

    /// Register a handler for one relation's name-specific notification.
    pub fn register_named(&self, relation: &str, handler: Arc<dyn RelationHooks>) {
        self.named
            .write()
            .entry(relation.to_string())
            .or_default()
            .push(handler);
    }

    pub(crate) fn fire_before_update(
        &self,
        item: &ChangeSubject,
        extra: &ExtraFields,
        change_type: ChangeType,
    ) {
        for handler in self.global.read().iter() {
            handler.on_before_update(item, extra, change_type);
        }
    }

    pub(crate) fn fire_update_all_changed(&self, all_changed: bool) {
        for handler in self.global.read().iter() {
            handler.update_all_changed(all_changed);
        }
    }

    pub(crate) fn fire_relation_changed(
        &self,
        owner: &EntityRef,
        relation: &str,
        changed: &ChangeLedger,
    ) {
        for handler in self.global.read().iter() {
            handler.relation_changed(owner, relation, changed);
        }
        if let Some(handlers) = self.named.read().get(relation) {
            for handler in handlers {
                handler.named_relation_changed(owner, changed);
            }
        }
    }
}
