use crate::model::{ChangeSubject, FilterExpr, Id};
use crate::store::{ItemList, ID_FIELD};
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct MemberItem {
    id: Id,
    class: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<MemberItem>,
    params: HashMap<String, Value>,
    filters: Vec<FilterExpr>,
}

/// In-memory `ItemList`. Cloning yields another handle onto the same
/// underlying collection, so views sharing the handle observe each other's
/// membership changes - the same way a storage-backed list behaves.
#[derive(Debug, Clone, Default)]
pub struct MemoryList {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: impl IntoIterator<Item = Id>) -> Self {
        let list = Self::new();
        {
            let mut state = list.state.write();
            state.items = ids
                .into_iter()
                .map(|id| MemberItem { id, class: None })
                .collect();
        }
        list
    }

    /// Filters currently installed, oldest first.
    pub fn filters(&self) -> Vec<FilterExpr> {
        self.state.read().filters.clone()
    }
}

impl ItemList for MemoryList {
    fn count(&self) -> Result<usize> {
        Ok(self.state.read().items.len())
    }

    fn column(&self, field: &str) -> Result<Vec<Value>> {
        let state = self.state.read();
        match field {
            ID_FIELD => Ok(state
                .items
                .iter()
                .map(|item| Value::from(item.id))
                .collect()),
            "$.class" => Ok(state
                .items
                .iter()
                .map(|item| {
                    item.class
                        .clone()
                        .map(Value::String)
                        .unwrap_or(Value::Null)
                })
                .collect()),
            other => Err(anyhow!("unknown column '{}'", other)),
        }
    }

    fn add_many(&self, items: &[ChangeSubject]) -> Result<()> {
        let mut state = self.state.write();
        for item in items {
            // Membership is a set; re-adding an existing id is a no-op
            if state.items.iter().any(|member| member.id == item.id()) {
                continue;
            }
            state.items.push(MemberItem {
                id: item.id(),
                class: item.class().map(str::to_string),
            });
        }
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        self.state.write().items.clear();
        Ok(())
    }

    fn set_by_id_list(&self, ids: &[Id]) -> Result<()> {
        let mut state = self.state.write();
        let retained: HashMap<Id, Option<String>> = state
            .items
            .iter()
            .map(|member| (member.id, member.class.clone()))
            .collect();
        state.items = ids
            .iter()
            .map(|id| MemberItem {
                id: *id,
                class: retained.get(id).cloned().flatten(),
            })
            .collect();
        Ok(())
    }

    fn param(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.state.read().params.get(key).cloned())
    }

    fn set_param(&self, key: &str, value: Value) -> Result<()> {
        self.state.write().params.insert(key.to_string(), value);
        Ok(())
    }

    fn params(&self) -> Result<HashMap<String, Value>> {
        Ok(self.state.read().params.clone())
    }

    fn add_filter(&self, filter: FilterExpr) -> Result<()> {
        self.state.write().filters.push(filter);
        Ok(())
    }

    fn remove_filter(&self, filter: &FilterExpr) -> Result<bool> {
        let mut state = self.state.write();
        let before = state.filters.len();
        state.filters.retain(|installed| installed != filter);
        Ok(state.filters.len() != before)
    }
}
