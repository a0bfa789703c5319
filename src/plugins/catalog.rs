//! Name to factory mapping for loadable plugins.

use super::{PluginDef, PluginError, PluginFactory};
use crate::store::Store;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// Names ending in `lib` or wrapped in double underscores mark support
/// units that are never loadable.
pub fn is_reserved(name: &str) -> bool {
    name.ends_with("lib") || (name.len() >= 4 && name.starts_with("__") && name.ends_with("__"))
}

/// Plugin names are lowercase ASCII words, digits, `-` and `_`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_'))
}

/// Every plugin the process knows how to build, keyed by name.
#[derive(Clone, Default)]
pub struct Catalog {
    factories: BTreeMap<String, Arc<dyn PluginFactory>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the factory for `name`.
    pub fn insert(&mut self, name: impl Into<String>, factory: impl PluginFactory + 'static) -> &mut Self {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Catalog names in sorted order, reserved ones included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

type BuildFn =
    dyn Fn(Arc<dyn Store>) -> BoxFuture<'static, Result<PluginDef, PluginError>> + Send + Sync;

/// A factory backed by a closure.
pub struct FnFactory {
    build: Box<BuildFn>,
}

impl FnFactory {
    pub fn new<F, Fut>(build: F) -> Self
    where
        F: Fn(Arc<dyn Store>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PluginDef, PluginError>> + Send + 'static,
    {
        Self {
            build: Box::new(move |store| Box::pin(build(store))),
        }
    }
}

#[async_trait]
impl PluginFactory for FnFactory {
    async fn build(&self, store: Arc<dyn Store>) -> Result<PluginDef, PluginError> {
        (self.build)(store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names() {
        assert!(is_reserved("stringlib"));
        assert!(is_reserved("__init__"));
        assert!(!is_reserved("__"));
        assert!(!is_reserved("builtin"));
        assert!(!is_reserved("__private"));
    }

    #[test]
    fn valid_names() {
        assert!(is_valid_name("wordsearch"));
        assert!(is_valid_name("my_plugin-2"));
        assert!(!is_valid_name("Math"));
        assert!(!is_valid_name("../x"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn names_are_sorted() {
        let mut catalog = Catalog::new();
        catalog
            .insert("zeta", FnFactory::new(|_| async { Ok(PluginDef::new()) }))
            .insert("alpha", FnFactory::new(|_| async { Ok(PluginDef::new()) }));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
        assert!(catalog.remove("zeta"));
        assert!(!catalog.contains("zeta"));
    }
}
