//! In-memory store.
//!
//! Used by tests and by ephemeral runs where nothing should touch disk.

use super::{Store, StoreError, validate_name};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self, name: &str, default: Value) -> Result<Value, StoreError> {
        validate_name(name)?;
        Ok(self
            .documents
            .get(name)
            .map(|v| v.value().clone())
            .unwrap_or(default))
    }

    async fn save(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        validate_name(name)?;
        self.documents.insert(name.to_string(), value.clone());
        Ok(())
    }
}
