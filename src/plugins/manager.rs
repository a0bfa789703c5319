//! Plugin lifecycle.
//!
//! The loaded set is an ordered list of `Arc<Plugin>` behind a
//! `parking_lot::RwLock`. Readers (the dispatcher) take a snapshot and never
//! hold the lock across an await. Every lifecycle change runs under one
//! async mutex, which the autosave task also takes, so a save never
//! overlaps a reload.

use super::catalog::is_valid_name;
use super::{Catalog, Plugin, PluginError, is_reserved};
use crate::store::Store;
use crate::telemetry::spans;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, warn};

/// Loaded first by [`PluginManager::load_all`].
pub const BUILTIN: &str = "builtin";

pub struct PluginManager {
    catalog: Catalog,
    store: Arc<dyn Store>,
    disabled: HashSet<String>,
    loaded: RwLock<Vec<Arc<Plugin>>>,
    lifecycle: Mutex<()>,
}

impl PluginManager {
    pub fn new(catalog: Catalog, store: Arc<dyn Store>) -> Self {
        Self {
            catalog,
            store,
            disabled: HashSet::new(),
            loaded: RwLock::new(Vec::new()),
            lifecycle: Mutex::new(()),
        }
    }

    /// Names `load_all` skips.
    pub fn with_disabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Load a plugin. Returns `false`, and logs why, on any failure.
    pub async fn load(&self, name: &str) -> bool {
        let _guard = self.lifecycle.lock().await;
        self.load_locked(name)
            .instrument(spans::plugin("load", name))
            .await
    }

    async fn load_locked(&self, name: &str) -> bool {
        match self.try_load(name).await {
            Ok(plugin) => {
                info!(plugin = %name, commands = plugin.commands().len(), "Loaded plugin");
                self.loaded.write().push(plugin);
                self.after_change("load", true);
                true
            }
            Err(e) => {
                warn!(plugin = %name, error = %e, "Could not load plugin");
                self.after_change("load", false);
                false
            }
        }
    }

    async fn try_load(&self, name: &str) -> Result<Arc<Plugin>, PluginError> {
        if is_reserved(name) {
            return Err(PluginError::Reserved(name.to_string()));
        }
        if !is_valid_name(name) {
            return Err(PluginError::InvalidName(name.to_string()));
        }
        if self.is_loaded(name) {
            return Err(PluginError::AlreadyLoaded(name.to_string()));
        }
        self.build(name).await
    }

    async fn build(&self, name: &str) -> Result<Arc<Plugin>, PluginError> {
        let factory = self
            .catalog
            .get(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        let def = factory.build(Arc::clone(&self.store)).await?;
        Ok(Arc::new(Plugin::new(name, def)))
    }

    /// Drop a plugin and its commands. A no-op returning `false` when the
    /// plugin is not loaded.
    pub async fn unload(&self, name: &str) -> bool {
        let _guard = self.lifecycle.lock().await;
        self.unload_locked(name)
    }

    /// Run a plugin's save hook, then unload it, under one lifecycle guard.
    ///
    /// A failed save is logged and does not prevent the unload. Returns
    /// `false` when the plugin is not loaded.
    pub async fn save_and_unload(&self, name: &str) -> bool {
        let _guard = self.lifecycle.lock().await;
        let Some(plugin) = self.get(name) else {
            debug!(plugin = %name, "Unload of a plugin that is not loaded");
            return false;
        };
        if let Err(e) = plugin.save().await {
            error!(plugin = %name, error = %e, "Save before unload failed");
            crate::metrics::record_plugin_op("save", false);
        }
        self.unload_locked(name)
    }

    fn unload_locked(&self, name: &str) -> bool {
        let removed = {
            let mut loaded = self.loaded.write();
            let before = loaded.len();
            loaded.retain(|p| p.name() != name);
            loaded.len() != before
        };
        if removed {
            info!(plugin = %name, "Unloaded plugin");
            self.after_change("unload", true);
        } else {
            debug!(plugin = %name, "Unload of a plugin that is not loaded");
        }
        removed
    }

    /// Save, rebuild, and swap a loaded plugin in place.
    ///
    /// The new instance replaces the old one in a single write, so readers
    /// see either the old command tree or the new one. If the rebuild
    /// fails the old instance stays loaded and this returns `false`.
    pub async fn reload(&self, name: &str) -> bool {
        let _guard = self.lifecycle.lock().await;
        self.reload_locked(name)
            .instrument(spans::plugin("reload", name))
            .await
    }

    async fn reload_locked(&self, name: &str) -> bool {
        let Some(current) = self.get(name) else {
            warn!(plugin = %name, "Reload of a plugin that is not loaded");
            self.after_change("reload", false);
            return false;
        };

        if let Err(e) = current.save().await {
            error!(plugin = %name, error = %e, "Save before reload failed");
        }

        match self.build(name).await {
            Ok(fresh) => {
                let mut loaded = self.loaded.write();
                if let Some(slot) = loaded.iter_mut().find(|p| p.name() == name) {
                    *slot = fresh;
                }
                drop(loaded);
                info!(plugin = %name, "Reloaded plugin");
                self.after_change("reload", true);
                true
            }
            Err(e) => {
                warn!(plugin = %name, error = %e, "Reload failed, keeping the running instance");
                self.after_change("reload", false);
                false
            }
        }
    }

    /// Reload every loaded plugin in load order. Returns how many succeeded.
    pub async fn reload_all(&self) -> usize {
        let _guard = self.lifecycle.lock().await;
        let mut reloaded = 0;
        for name in self.names() {
            if self.reload_locked(&name).await {
                reloaded += 1;
            }
        }
        reloaded
    }

    /// Run one plugin's save hook. `false` if not loaded or the save failed.
    pub async fn save(&self, name: &str) -> bool {
        let _guard = self.lifecycle.lock().await;
        let Some(plugin) = self.get(name) else {
            return false;
        };
        match plugin.save().await {
            Ok(()) => true,
            Err(e) => {
                error!(plugin = %name, error = %e, "An error occurred when saving plugin");
                false
            }
        }
    }

    /// Run every save hook, logging failures without stopping.
    ///
    /// Returns the number of plugins whose save failed.
    pub async fn save_all(&self) -> usize {
        let _guard = self.lifecycle.lock().await;
        let mut failed = 0;
        for plugin in self.snapshot() {
            if let Err(e) = plugin.save().await {
                error!(plugin = %plugin.name(), error = %e, "An error occurred when saving plugin");
                crate::metrics::record_plugin_op("save", false);
                failed += 1;
            }
        }
        debug!(failed, "Plugins saved");
        failed
    }

    /// Load the builtin plugin and then every other catalog entry in name
    /// order, skipping reserved and disabled names. Returns how many
    /// plugins were newly loaded.
    pub async fn load_all(&self) -> usize {
        let _guard = self.lifecycle.lock().await;
        let names: Vec<String> = std::iter::once(BUILTIN)
            .filter(|name| self.catalog.contains(name))
            .chain(self.catalog.names().filter(|name| *name != BUILTIN))
            .map(str::to_string)
            .collect();

        let mut count = 0;
        for name in names {
            if is_reserved(&name) {
                debug!(plugin = %name, "Skipping reserved name");
                continue;
            }
            if self.disabled.contains(&name) {
                info!(plugin = %name, "Skipping disabled plugin");
                continue;
            }
            if self.is_loaded(&name) {
                continue;
            }
            if self.load_locked(&name).await {
                count += 1;
            }
        }
        count
    }

    /// Loaded plugin names in load order.
    pub fn names(&self) -> Vec<String> {
        self.loaded.read().iter().map(|p| p.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        self.loaded.read().iter().find(|p| p.name() == name).cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.read().iter().any(|p| p.name() == name)
    }

    /// The loaded set in load order, detached from the lock.
    pub fn snapshot(&self) -> Vec<Arc<Plugin>> {
        self.loaded.read().clone()
    }

    fn after_change(&self, op: &'static str, ok: bool) {
        crate::metrics::record_plugin_op(op, ok);
        crate::metrics::set_plugins_loaded(self.loaded.read().len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::Param;
    use crate::commands::Command;
    use crate::plugins::{FnFactory, PluginDef};
    use crate::store::{MemoryStore, load_typed, save_typed};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn noop(name: &str) -> Command {
        Command::new(name, |_, _, _| async { Ok(()) })
    }

    fn math_factory() -> FnFactory {
        FnFactory::new(|_| async {
            let mut def = PluginDef::new();
            def.command(noop("add").param(Param::required("a")))?
                .command(noop("mul"))?;
            Ok(def)
        })
    }

    fn manager(catalog: Catalog) -> PluginManager {
        PluginManager::new(catalog, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn load_unknown_reserved_and_duplicate() {
        let mut catalog = Catalog::new();
        catalog.insert("math", math_factory()).insert("mathlib", math_factory());
        let pm = manager(catalog);

        assert!(!pm.load("nope").await);
        assert!(!pm.load("mathlib").await);
        assert!(pm.load("math").await);
        assert!(!pm.load("math").await);
        assert_eq!(pm.names(), vec!["math"]);
    }

    #[tokio::test]
    async fn malformed_plugin_is_absent() {
        let mut catalog = Catalog::new();
        catalog.insert(
            "broken",
            FnFactory::new(|_| async {
                let mut def = PluginDef::new();
                def.command(noop("x"))?.command(noop("x"))?;
                Ok(def)
            }),
        );
        let pm = manager(catalog);
        assert!(!pm.load("broken").await);
        assert!(pm.get("broken").is_none());
    }

    #[tokio::test]
    async fn unload_is_idempotent() {
        let mut catalog = Catalog::new();
        catalog.insert("math", math_factory());
        let pm = manager(catalog);

        assert!(!pm.unload("math").await);
        assert!(pm.names().is_empty());

        pm.load("math").await;
        assert!(pm.unload("math").await);
        assert!(!pm.unload("math").await);
        assert!(pm.names().is_empty());
    }

    #[tokio::test]
    async fn save_and_unload_saves_once_then_drops() {
        let saved = Arc::new(AtomicUsize::new(0));
        let mut catalog = Catalog::new();
        {
            let saved = Arc::clone(&saved);
            catalog.insert(
                "notes",
                FnFactory::new(move |_| {
                    let saved = Arc::clone(&saved);
                    async move {
                        let mut def = PluginDef::new();
                        def.command(noop("note"))?.on_save(move || {
                            let saved = Arc::clone(&saved);
                            async move {
                                saved.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        });
                        Ok(def)
                    }
                }),
            );
        }
        let pm = manager(catalog);
        pm.load("notes").await;

        assert!(pm.save_and_unload("notes").await);
        assert_eq!(saved.load(Ordering::SeqCst), 1);
        assert!(!pm.is_loaded("notes"));

        assert!(!pm.save_and_unload("notes").await);
        assert_eq!(saved.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reload_twice_gives_the_same_commands() {
        let mut catalog = Catalog::new();
        catalog.insert("math", math_factory());
        let pm = manager(catalog);
        pm.load("math").await;

        let before = pm.get("math").unwrap().commands().paths();
        assert!(pm.reload("math").await);
        let first = pm.get("math").unwrap().commands().paths();
        assert!(pm.reload("math").await);
        let second = pm.get("math").unwrap().commands().paths();
        assert_eq!(before, first);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn reload_saves_first_and_keeps_old_on_failure() {
        let saved = Arc::new(AtomicUsize::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let mut catalog = Catalog::new();
        {
            let saved = Arc::clone(&saved);
            let fail = Arc::clone(&fail);
            catalog.insert(
                "flaky",
                FnFactory::new(move |_| {
                    let saved = Arc::clone(&saved);
                    let fail = fail.load(Ordering::SeqCst);
                    async move {
                        if fail {
                            return Err(PluginError::Build("unit vanished".into()));
                        }
                        let mut def = PluginDef::new();
                        def.command(noop("flake"))?.on_save(move || {
                            let saved = Arc::clone(&saved);
                            async move {
                                saved.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        });
                        Ok(def)
                    }
                }),
            );
        }
        let pm = manager(catalog);
        pm.load("flaky").await;
        let original = pm.get("flaky").unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(!pm.reload("flaky").await);
        assert_eq!(saved.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&original, &pm.get("flaky").unwrap()));

        fail.store(false, Ordering::SeqCst);
        assert!(pm.reload("flaky").await);
        assert!(!Arc::ptr_eq(&original, &pm.get("flaky").unwrap()));
        assert!(!pm.reload("ghost").await);
    }

    #[tokio::test]
    async fn save_all_continues_past_failures() {
        let mut catalog = Catalog::new();
        catalog
            .insert(
                "bad",
                FnFactory::new(|_| async {
                    let mut def = PluginDef::new();
                    def.on_save(|| async {
                        Err(crate::store::StoreError::InvalidName("..".into()))
                    });
                    Ok(def)
                }),
            )
            .insert(
                "good",
                FnFactory::new(|store| async move {
                    let mut def = PluginDef::new();
                    def.on_save(move || {
                        let store = Arc::clone(&store);
                        async move { save_typed(store.as_ref(), "good", &1u32).await }
                    });
                    Ok(def)
                }),
            );
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let pm = PluginManager::new(catalog, Arc::clone(&store));
        assert_eq!(pm.load_all().await, 2);

        assert_eq!(pm.save_all().await, 1);
        assert_eq!(load_typed(store.as_ref(), "good", 0u32).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn load_all_order_and_skips() {
        let mut catalog = Catalog::new();
        catalog
            .insert("zeta", math_factory())
            .insert("builtin", FnFactory::new(|_| async { Ok(PluginDef::new()) }))
            .insert("alpha", math_factory())
            .insert("textlib", math_factory())
            .insert("__init__", math_factory())
            .insert("off", math_factory());
        let pm = manager(catalog).with_disabled(["off"]);

        assert_eq!(pm.load_all().await, 3);
        assert_eq!(pm.names(), vec!["builtin", "alpha", "zeta"]);
        // A second pass loads nothing new.
        assert_eq!(pm.load_all().await, 0);
    }
}
