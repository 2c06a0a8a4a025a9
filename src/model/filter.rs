use crate::model::Id;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field path on the stored items, e.g. "$.id" or "$.owner_id".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(pub String);

impl FieldPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }
}

/// Predicate expression handed to the underlying store. The store interprets
/// it against its own query language; this crate only builds and compares
/// these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterExpr {
    /// Logical AND - all conditions must hold
    All { all: Vec<FilterExpr> },
    /// Logical OR - any condition must hold
    Any { any: Vec<FilterExpr> },
    /// Logical NOT
    Not { not: Box<FilterExpr> },
    /// Equality check
    Eq { eq: (FieldPath, Value) },
    /// Membership in a value list
    In { r#in: (FieldPath, Vec<Value>) },
    /// Junction-table membership
    Junction { junction: JunctionFilter },
}

/// Item appears in `table` rows whose `owner_field` matches one of `owners`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionFilter {
    pub table: String,
    pub owner_field: String,
    pub item_field: String,
    pub owners: Vec<Id>,
}

/// Owner-side scope of a relation: one identity or a set of identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForeignKey {
    Many(Vec<Id>),
    One(Id),
}

impl ForeignKey {
    pub fn ids(&self) -> Vec<Id> {
        match self {
            ForeignKey::One(id) => vec![*id],
            ForeignKey::Many(ids) => ids.clone(),
        }
    }
}

impl From<Id> for ForeignKey {
    fn from(id: Id) -> Self {
        ForeignKey::One(id)
    }
}

impl From<Vec<Id>> for ForeignKey {
    // A one-element set scopes identically to the bare identity
    fn from(mut ids: Vec<Id>) -> Self {
        if ids.len() == 1 {
            ForeignKey::One(ids.remove(0))
        } else {
            ForeignKey::Many(ids)
        }
    }
}
