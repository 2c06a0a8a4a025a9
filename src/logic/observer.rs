use crate::logic::{HookRegistry, OwnerResolver};
use crate::model::{ChangeLedger, ChangeRecord, ChangeSubject, ChangeType, ExtraFields, Id};
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

/// Immutable change ledger for one relation. Records which item identities
/// an in-flight mutation is expected to touch, fills each entry in as the
/// per-item mutation path reports it, and fires the aggregated
/// relation-changed notification once coverage is complete.
///
/// Every mutator clones the receiver and returns the clone; an observer
/// value is never altered after construction.
#[derive(Clone)]
pub struct ChangeObserver {
    data_class: String,
    foreign_class: String,
    foreign_relation: String,
    changed: ChangeLedger,
    hooks: Arc<HookRegistry>,
    resolver: Arc<dyn OwnerResolver>,
}

impl ChangeObserver {
    /// `data_class` labels items supplied by bare identity; `foreign_class`
    /// and `foreign_relation` address the aggregated notification. The hook
    /// registry and owner resolver are injected here rather than looked up
    /// from process-wide state.
    pub fn new(
        data_class: impl Into<String>,
        foreign_class: impl Into<String>,
        foreign_relation: impl Into<String>,
        hooks: Arc<HookRegistry>,
        resolver: Arc<dyn OwnerResolver>,
    ) -> Self {
        Self {
            data_class: data_class.into(),
            foreign_class: foreign_class.into(),
            foreign_relation: foreign_relation.into(),
            changed: ChangeLedger::new(),
            hooks,
            resolver,
        }
    }

    pub fn data_class(&self) -> &str {
        &self.data_class
    }

    pub fn foreign_class(&self) -> &str {
        &self.foreign_class
    }

    pub fn foreign_relation(&self) -> &str {
        &self.foreign_relation
    }

    /// Ledger of the current prescription; empty when none is in flight.
    pub fn changed(&self) -> &ChangeLedger {
        &self.changed
    }

    /// Declare the closed set of identities the upcoming mutation affects.
    /// Duplicates collapse; any prior ledger is replaced wholesale.
    pub fn prescribe_update(&self, ids: impl IntoIterator<Item = Id>) -> Self {
        let mut next = self.clone();
        next.changed = ids
            .into_iter()
            .unique()
            .map(|id| (id, ChangeRecord::pending(id, &self.data_class)))
            .collect();
        next
    }

    /// Record one landed mutation. Entities classify under their own class
    /// tag, bare identities under the configured data class. When the write
    /// completes coverage of the prescription, the aggregated notification
    /// fires before this call returns.
    pub fn update_item(
        &self,
        item: &ChangeSubject,
        extra: ExtraFields,
        change_type: ChangeType,
    ) -> Self {
        self.hooks.fire_before_update(item, &extra, change_type);

        let id = item.id();
        let class = item.class().unwrap_or(&self.data_class).to_string();

        let mut next = self.clone();
        if !next.changed.contains_key(&id) {
            log::debug!(
                "relation '{}': identity {} was not prescribed, recording anyway",
                next.foreign_relation,
                id
            );
        }
        next.changed.insert(
            id,
            ChangeRecord {
                id,
                class,
                extra,
                change_type: Some(change_type),
            },
        );

        let all_changed = next.all_changed();
        next.hooks.fire_update_all_changed(all_changed);
        if all_changed {
            next.notify_relation_changed();
        }
        next
    }

    /// True once every ledger entry is classified. Vacuously true on an
    /// empty ledger; callers guard with `is_prescribed`.
    pub fn all_changed(&self) -> bool {
        self.changed.values().all(|record| !record.is_pending())
    }

    pub fn is_prescribed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Drop the ledger, keeping everything else.
    pub fn reset(&self) -> Self {
        let mut next = self.clone();
        next.changed = ChangeLedger::new();
        next
    }

    fn notify_relation_changed(&self) {
        let Some(owner) = self.resolver.representative(&self.foreign_class) else {
            log::debug!(
                "no representative for '{}', skipping relation-changed notification",
                self.foreign_class
            );
            return;
        };
        log::trace!(
            "relation '{}' changed: {} entries",
            self.foreign_relation,
            self.changed.len()
        );
        self.hooks
            .fire_relation_changed(&owner, &self.foreign_relation, &self.changed);
    }
}

impl fmt::Debug for ChangeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeObserver")
            .field("data_class", &self.data_class)
            .field("foreign_class", &self.foreign_class)
            .field("foreign_relation", &self.foreign_relation)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}
