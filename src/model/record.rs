use crate::model::{ChangeType, Id};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Free-form per-item fields reported alongside a change.
pub type ExtraFields = Map<String, Value>;

/// One entry in an observer's ledger. `change_type` stays unset while the
/// item's mutation has not landed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: Id,
    pub class: String,
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub extra: ExtraFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl ChangeRecord {
    /// Entry created at prescription time: identity known, nothing landed.
    pub fn pending(id: Id, class: impl Into<String>) -> Self {
        Self {
            id,
            class: class.into(),
            extra: Map::new(),
            change_type: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.change_type.is_none()
    }
}

/// Identity -> change record map accumulated during a prescribed mutation.
pub type ChangeLedger = HashMap<Id, ChangeRecord>;
