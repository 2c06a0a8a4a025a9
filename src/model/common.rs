use serde::{Deserialize, Serialize};

pub type Id = i64;

/// Classification recorded for an item once its mutation has landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    #[default]
    Added,
    Removed,
}

/// Minimal entity reference: an identity plus the entity's runtime class tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: Id,
    pub class: String,
}

impl EntityRef {
    pub fn new(id: Id, class: impl Into<String>) -> Self {
        Self {
            id,
            class: class.into(),
        }
    }
}

/// Item handed to the mutation paths: either a bare identity or an entity
/// reference carrying its own class tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeSubject {
    // Entity comes first - untagged matching is order-sensitive and a bare
    // number never parses as an object
    Entity(EntityRef),
    Identity(Id),
}

impl ChangeSubject {
    pub fn id(&self) -> Id {
        match self {
            ChangeSubject::Entity(entity) => entity.id,
            ChangeSubject::Identity(id) => *id,
        }
    }

    /// Class tag when the item was supplied as an entity; bare identities
    /// have none and fall back to the observer's configured data class.
    pub fn class(&self) -> Option<&str> {
        match self {
            ChangeSubject::Entity(entity) => Some(&entity.class),
            ChangeSubject::Identity(_) => None,
        }
    }
}

impl From<Id> for ChangeSubject {
    fn from(id: Id) -> Self {
        ChangeSubject::Identity(id)
    }
}

impl From<EntityRef> for ChangeSubject {
    fn from(entity: EntityRef) -> Self {
        ChangeSubject::Entity(entity)
    }
}
