use crate::logic::{ChangeObserver, RelationKind};
use crate::model::{ChangeSubject, ChangeType, ExtraFields, FilterExpr, ForeignKey, Id};
use crate::store::ItemList;
use anyhow::Result;
use itertools::Itertools;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Namespace of the relation-scoping parameters recorded on the underlying
/// query. `query_params` strips this namespace back out.
pub const FOREIGN_PARAM_PREFIX: &str = "Foreign.";

const FOREIGN_ID_PARAM: &str = "Foreign.id";
const FOREIGN_FILTER_PARAM: &str = "Foreign.filter";

#[derive(Debug, Error)]
pub enum RelationError {
    /// An unresolved prescription is still in flight on this list's
    /// observer. Starting a new one over it would silently drop the pending
    /// change tracking, so the caller must reset first (or pass force).
    #[error("relation '{relation}' already has a prescription in flight; reset it before prescribing a new change set")]
    PrescriptionConflict { relation: String },
}

/// Foreign-key-scoped view over a collection of related entities. Bulk
/// mutations delegate to the underlying `ItemList`; when an observer is
/// attached they are routed through a prescribe-then-apply protocol first,
/// so the observer knows the full affected set before any item lands.
///
/// A list value is never mutated after construction. Every operation returns
/// a new instance sharing the underlying collection handle; cloning
/// deep-copies the observer so two lists never share ledger state.
#[derive(Clone)]
pub struct RelationList {
    list: Arc<dyn ItemList>,
    kind: Arc<dyn RelationKind>,
    foreign_id: Option<ForeignKey>,
    observer: Option<ChangeObserver>,
}

impl RelationList {
    pub fn new(list: Arc<dyn ItemList>, kind: Arc<dyn RelationKind>) -> Self {
        Self {
            list,
            kind,
            foreign_id: None,
            observer: None,
        }
    }

    /// Attach an observer, returning the observed view. The observer is
    /// exclusively owned by the returned list.
    pub fn observe(&self, observer: ChangeObserver) -> Self {
        let mut next = self.clone();
        next.observer = Some(observer);
        next
    }

    pub fn observer(&self) -> Option<&ChangeObserver> {
        self.observer.as_ref()
    }

    pub fn list(&self) -> &Arc<dyn ItemList> {
        &self.list
    }

    pub fn count(&self) -> Result<usize> {
        self.list.count()
    }

    /// Install a prescription covering `items` on the attached observer.
    /// Pass-through when unobserved. An unresolved prior prescription is a
    /// conflict unless `force_reset` is set.
    pub fn prepare_observer(&self, items: &[ChangeSubject], force_reset: bool) -> Result<Self> {
        let Some(observer) = &self.observer else {
            return Ok(self.clone());
        };
        if observer.is_prescribed() && !force_reset {
            return Err(RelationError::PrescriptionConflict {
                relation: observer.foreign_relation().to_string(),
            }
            .into());
        }
        let ids = items.iter().map(ChangeSubject::id);
        let mut next = self.clone();
        next.observer = Some(observer.prescribe_update(ids));
        Ok(next)
    }

    /// Bulk-add. An unobserved or already-prescribed list delegates straight
    /// to the store; otherwise one prescription cycle covering exactly the
    /// incoming identities precedes the delegated add. Never nests.
    pub fn add_many(&self, items: &[ChangeSubject]) -> Result<Self> {
        if let Some(observer) = &self.observer {
            // An empty batch prescribes nothing, so it delegates directly
            if !observer.is_prescribed() && !items.is_empty() {
                let prepared = self.prepare_observer(items, false)?;
                return prepared.add_many(items);
            }
        }
        self.list.add_many(items)?;
        Ok(self.clone())
    }

    /// Bulk-remove of the whole membership. A non-empty observed list with
    /// no prescription in flight prescribes its full current membership
    /// first, then re-invokes through the delegate path.
    pub fn remove_all(&self) -> Result<Self> {
        let needs_prescription = match &self.observer {
            Some(observer) => !observer.is_prescribed() && self.list.count()? > 0,
            None => false,
        };
        if needs_prescription {
            let members: Vec<ChangeSubject> = self
                .list
                .ids()?
                .into_iter()
                .map(ChangeSubject::from)
                .collect();
            if !members.is_empty() {
                let prepared = self.prepare_observer(&members, false)?;
                return prepared.remove_all();
            }
        }
        self.list.remove_all()?;
        Ok(self.clone())
    }

    /// Replace the membership with exactly `target`. Identities falling out
    /// of the membership are prescribed and removed through the observed
    /// path; the replacement itself is always delegated to the store.
    /// Identities newly introduced by the replacement are not observed here.
    pub fn set_by_id_list(&self, target: &[Id]) -> Result<Self> {
        let diff: Vec<Id> = self
            .list
            .ids()?
            .into_iter()
            .filter(|id| !target.contains(id))
            .unique()
            .collect();

        let mut next = self.clone();
        if !diff.is_empty() {
            if let Some(observer) = &self.observer {
                if !observer.is_prescribed() {
                    let removals: Vec<ChangeSubject> =
                        diff.into_iter().map(ChangeSubject::from).collect();
                    next = self.prepare_observer(&removals, false)?.remove_all()?;
                }
            }
        }
        next.list.set_by_id_list(target)?;
        Ok(next)
    }

    /// Rescope the view to `key` (a one-element set collapses to its single
    /// element). Any previously installed foreign filter is removed
    /// best-effort, the new filter is installed, and both the raw key and
    /// its filter expression are recorded as `Foreign.` parameters.
    pub fn for_foreign_id(&self, key: impl Into<ForeignKey>) -> Result<Self> {
        let key = key.into();
        let filter = self.kind.foreign_id_filter(&key);

        if let Some(previous) = self.list.param(FOREIGN_FILTER_PARAM)? {
            match serde_json::from_value::<FilterExpr>(previous) {
                Ok(previous_filter) => match self.list.remove_filter(&previous_filter) {
                    Ok(removed) => {
                        if !removed {
                            log::debug!("previous foreign filter not present on the query");
                        }
                    }
                    Err(err) => log::debug!("failed to remove previous foreign filter: {err}"),
                },
                Err(err) => log::debug!("unreadable previous foreign filter parameter: {err}"),
            }
        }

        self.list.add_filter(filter.clone())?;
        self.list
            .set_param(FOREIGN_ID_PARAM, serde_json::to_value(&key)?)?;
        self.list
            .set_param(FOREIGN_FILTER_PARAM, serde_json::to_value(&filter)?)?;

        let mut next = self.clone();
        next.foreign_id = Some(key);
        Ok(next)
    }

    /// The raw owner-side key recorded by the last `for_foreign_id`.
    pub fn foreign_id(&self) -> Result<Option<ForeignKey>> {
        match self.list.param(FOREIGN_ID_PARAM)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(self.foreign_id.clone()),
        }
    }

    /// Query parameters with the relation-scoping `Foreign.` namespace
    /// stripped. New entities seeded from these parameters must not inherit
    /// the relation's owner scope.
    pub fn query_params(&self) -> Result<HashMap<String, Value>> {
        Ok(self
            .list
            .params()?
            .into_iter()
            .filter(|(key, _)| !key.starts_with(FOREIGN_PARAM_PREFIX))
            .collect())
    }

    /// Per-item application path: the mutation driver reports each landed
    /// item here once. Unobserved lists ignore the report.
    pub fn update_item(
        &self,
        item: &ChangeSubject,
        extra: ExtraFields,
        change_type: ChangeType,
    ) -> Self {
        match &self.observer {
            Some(observer) => {
                let mut next = self.clone();
                next.observer = Some(observer.update_item(item, extra, change_type));
                next
            }
            None => self.clone(),
        }
    }
}

impl fmt::Debug for RelationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationList")
            .field("foreign_id", &self.foreign_id)
            .field("observer", &self.observer)
            .finish_non_exhaustive()
    }
}
