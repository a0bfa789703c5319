//! Plugins: hot-swappable units of commands, hooks, and state.
//!
//! A plugin is produced by a [`PluginFactory`] registered in the
//! [`Catalog`] under its name. Building a plugin yields a [`PluginDef`]:
//! its command tree plus optional lifecycle hooks. The [`PluginManager`]
//! owns the loaded set and drives load, unload, reload, and save.
//!
//! Plugin state lives in whatever the factory captures into its handlers
//! and hooks (typically an `Arc<Mutex<_>>` seeded from the [`Store`]), so
//! rebuilding a plugin after its save hook ran is how a reload picks up
//! persisted state.

mod catalog;
mod manager;

pub mod builtin;
pub mod wordsearch;

pub use catalog::{Catalog, FnFactory, is_reserved};
pub use manager::PluginManager;

use crate::bot::Context;
use crate::commands::{Command, CommandSet, RegistryError};
use crate::error::{HandlerError, HandlerResult};
use crate::proto::Message;
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

pub type ReadyHook = Arc<dyn Fn(Context) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Generic-message hook. Returns `true` when the message was handled.
pub type MessageHook = Arc<
    dyn Fn(Context, Message, Arc<[String]>) -> BoxFuture<'static, Result<bool, HandlerError>>
        + Send
        + Sync,
>;

/// Flushes plugin state to the store. Must be safe to call repeatedly.
pub type SaveHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), StoreError>> + Send + Sync>;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("no plugin named '{0}'")]
    NotFound(String),
    #[error("'{0}' is a reserved name")]
    Reserved(String),
    #[error("invalid plugin name: {0:?}")]
    InvalidName(String),
    #[error("plugin '{0}' is already loaded")]
    AlreadyLoaded(String),
    #[error("plugin '{0}' is not loaded")]
    NotLoaded(String),
    #[error("invalid command table: {0}")]
    Registry(#[from] RegistryError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Build(String),
}

impl PluginError {
    /// Get a static error code string for metrics labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Reserved(_) => "reserved",
            Self::InvalidName(_) => "invalid_name",
            Self::AlreadyLoaded(_) => "already_loaded",
            Self::NotLoaded(_) => "not_loaded",
            Self::Registry(_) => "registry_error",
            Self::Store(_) => "store_error",
            Self::Build(_) => "build_error",
        }
    }
}

/// Builds fresh instances of one plugin.
#[async_trait]
pub trait PluginFactory: Send + Sync {
    /// Build the plugin, reading any persisted state from `store`.
    async fn build(&self, store: Arc<dyn Store>) -> Result<PluginDef, PluginError>;
}

/// What a factory produces: commands plus optional hooks.
#[derive(Default)]
pub struct PluginDef {
    commands: CommandSet,
    on_ready: Option<ReadyHook>,
    on_message: Option<MessageHook>,
    on_save: Option<SaveHook>,
}

impl PluginDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level command.
    pub fn command(&mut self, command: Command) -> Result<&mut Self, RegistryError> {
        self.commands.register(command, None)?;
        Ok(self)
    }

    /// Register a sub-command under the command at `parent`.
    pub fn subcommand(&mut self, parent: &str, command: Command) -> Result<&mut Self, RegistryError> {
        self.commands.register(command, Some(parent))?;
        Ok(self)
    }

    pub fn on_ready<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_ready = Some(Arc::new(move |ctx| Box::pin(hook(ctx))));
        self
    }

    pub fn on_message<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(Context, Message, Arc<[String]>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, HandlerError>> + Send + 'static,
    {
        self.on_message = Some(Arc::new(move |ctx, msg, args| Box::pin(hook(ctx, msg, args))));
        self
    }

    pub fn on_save<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        self.on_save = Some(Arc::new(move || Box::pin(hook())));
        self
    }
}

/// A loaded plugin.
pub struct Plugin {
    name: String,
    commands: CommandSet,
    on_ready: Option<ReadyHook>,
    on_message: Option<MessageHook>,
    on_save: Option<SaveHook>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, def: PluginDef) -> Self {
        Self {
            name: name.into(),
            commands: def.commands,
            on_ready: def.on_ready,
            on_message: def.on_message,
            on_save: def.on_save,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn has_message_hook(&self) -> bool {
        self.on_message.is_some()
    }

    /// Start the ready hook, if any.
    pub fn ready(&self, ctx: Context) -> Option<BoxFuture<'static, HandlerResult>> {
        self.on_ready.as_ref().map(|hook| hook(ctx))
    }

    /// Start the generic-message hook, if any.
    pub fn handle_message(
        &self,
        ctx: Context,
        message: Message,
        args: Arc<[String]>,
    ) -> Option<BoxFuture<'static, Result<bool, HandlerError>>> {
        self.on_message.as_ref().map(|hook| hook(ctx, message, args))
    }

    /// Run the save hook. Plugins without one succeed trivially.
    pub async fn save(&self) -> Result<(), StoreError> {
        match &self.on_save {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("commands", &self.commands.paths())
            .field("on_ready", &self.on_ready.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_save", &self.on_save.is_some())
            .finish()
    }
}

/// The catalog shipped with the binary.
pub fn default_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .insert(builtin::NAME, builtin::Factory)
        .insert(wordsearch::NAME, wordsearch::Factory);
    catalog
}
