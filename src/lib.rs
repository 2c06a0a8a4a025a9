pub mod logic;
pub mod model;
pub mod store;

// Export logic types
pub use logic::{
    ChangeObserver, HasMany, HookRegistry, ManyToMany, OwnerResolver, RelationError,
    RelationHooks, RelationKind, RelationList, StaticResolver, FOREIGN_PARAM_PREFIX,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{ItemList, MemoryList, ID_FIELD};
