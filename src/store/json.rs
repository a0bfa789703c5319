//! JSON file store.
//!
//! Each document lives in `<dir>/<name>.json`. Saves write a temporary
//! file first and rename it into place, so a crash mid-save never leaves
//! a truncated document behind.

use super::{Store, StoreError, validate_name};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn load(&self, name: &str, default: Value) -> Result<Value, StoreError> {
        let path = self.path_for(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(document = %name, "No saved document, using default");
                Ok(default)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, name: &str, value: &Value) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
