use crate::model::{ChangeSubject, FilterExpr, Id};
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Field every stored item exposes its identity under.
pub const ID_FIELD: &str = "$.id";

/// Contract of the underlying queryable, mutable collection a relation view
/// delegates to. Implementations own durability and atomicity; the view
/// layer assumes nothing about partial failure mid-batch.
pub trait ItemList: Send + Sync {
    fn count(&self) -> Result<usize>;

    /// Scalar projection of `field` across the whole list.
    fn column(&self, field: &str) -> Result<Vec<Value>>;

    fn add_many(&self, items: &[ChangeSubject]) -> Result<()>;

    fn remove_all(&self) -> Result<()>;

    /// Replace the full membership with exactly `ids`.
    fn set_by_id_list(&self, ids: &[Id]) -> Result<()>;

    fn param(&self, key: &str) -> Result<Option<Value>>;

    fn set_param(&self, key: &str, value: Value) -> Result<()>;

    fn params(&self) -> Result<HashMap<String, Value>>;

    fn add_filter(&self, filter: FilterExpr) -> Result<()>;

    /// Remove a previously installed filter. Returns whether one was found.
    fn remove_filter(&self, filter: &FilterExpr) -> Result<bool>;

    /// Identity column, parsed.
    fn ids(&self) -> Result<Vec<Id>> {
        Ok(self
            .column(ID_FIELD)?
            .iter()
            .filter_map(Value::as_i64)
            .collect())
    }
}
