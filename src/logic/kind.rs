use crate::model::{FieldPath, FilterExpr, ForeignKey, JunctionFilter};
use serde_json::Value;

/// Maps an owner-side key to the storage predicate scoping the relation.
/// Each relation variant supplies its own mapping; nothing is shared.
pub trait RelationKind: Send + Sync {
    fn foreign_id_filter(&self, key: &ForeignKey) -> FilterExpr;
}

/// Related rows point back at the owner through a foreign-key field.
#[derive(Debug, Clone)]
pub struct HasMany {
    pub foreign_field: FieldPath,
}

impl HasMany {
    pub fn new(foreign_field: impl Into<String>) -> Self {
        Self {
            foreign_field: FieldPath::new(foreign_field),
        }
    }
}

impl RelationKind for HasMany {
    fn foreign_id_filter(&self, key: &ForeignKey) -> FilterExpr {
        match key {
            ForeignKey::One(id) => FilterExpr::Eq {
                eq: (self.foreign_field.clone(), Value::from(*id)),
            },
            ForeignKey::Many(ids) => FilterExpr::In {
                r#in: (
                    self.foreign_field.clone(),
                    ids.iter().copied().map(Value::from).collect(),
                ),
            },
        }
    }
}

/// Membership recorded in a junction table between owner and item.
#[derive(Debug, Clone)]
pub struct ManyToMany {
    pub junction: String,
    pub owner_field: String,
    pub item_field: String,
}

impl ManyToMany {
    pub fn new(
        junction: impl Into<String>,
        owner_field: impl Into<String>,
        item_field: impl Into<String>,
    ) -> Self {
        Self {
            junction: junction.into(),
            owner_field: owner_field.into(),
            item_field: item_field.into(),
        }
    }
}

impl RelationKind for ManyToMany {
    fn foreign_id_filter(&self, key: &ForeignKey) -> FilterExpr {
        FilterExpr::Junction {
            junction: JunctionFilter {
                table: self.junction.clone(),
                owner_field: self.owner_field.clone(),
                item_field: self.item_field.clone(),
                owners: key.ids(),
            },
        }
    }
}
