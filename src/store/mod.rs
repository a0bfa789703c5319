//! Persistence abstraction for plugin data.
//!
//! Plugins keep their own data as named JSON documents. The core never
//! looks inside them; it only makes sure save hooks run at the right
//! moments.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod json;
pub mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid document name: {0:?}")]
    InvalidName(String),
}

/// A named key-value document store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load a document, returning `default` when it has never been saved.
    async fn load(&self, name: &str, default: Value) -> Result<Value, StoreError>;

    /// Save a document, replacing any previous version.
    async fn save(&self, name: &str, value: &Value) -> Result<(), StoreError>;
}

/// Load a document into a typed value.
pub async fn load_typed<T>(store: &dyn Store, name: &str, default: T) -> Result<T, StoreError>
where
    T: Serialize + DeserializeOwned,
{
    let value = store.load(name, serde_json::to_value(&default)?).await?;
    Ok(serde_json::from_value(value)?)
}

/// Save a typed value as a document.
pub async fn save_typed<T>(store: &dyn Store, name: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    store.save(name, &serde_json::to_value(value)?).await
}

/// Document names become file names, so keep them to a safe alphabet.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn document_names() {
        assert!(validate_name("lambda-config").is_ok());
        assert!(validate_name("owner").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("a/b").is_err());
    }

    #[tokio::test]
    async fn typed_round_trip() {
        let store = MemoryStore::new();
        let empty: BTreeMap<String, String> =
            load_typed(&store, "lambdas", BTreeMap::new()).await.unwrap();
        assert!(empty.is_empty());

        let mut map = BTreeMap::new();
        map.insert("hello".to_string(), "hi {author}".to_string());
        save_typed(&store, "lambdas", &map).await.unwrap();

        let loaded: BTreeMap<String, String> =
            load_typed(&store, "lambdas", BTreeMap::new()).await.unwrap();
        assert_eq!(loaded, map);
    }

    #[tokio::test]
    async fn typed_load_rejects_wrong_shape() {
        let store = MemoryStore::new();
        store.save("count", &Value::from("not a number")).await.unwrap();
        let result: Result<u64, _> = load_typed(&store, "count", 0).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
