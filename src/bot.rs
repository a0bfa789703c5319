//! Shared bot state and the event loop.
//!
//! [`Context`] is the cheap, cloneable handle every handler and hook
//! receives. It dereferences to [`Bot`], which holds the transport, the
//! store, the plugin manager, and the owner identity.

use crate::config::Config;
use crate::dispatch;
use crate::error::HandlerError;
use crate::plugins::PluginManager;
use crate::proto::{Message, User};
use crate::store::{self, Store, StoreError};
use crate::tasks;
use crate::transport::{Event, MessageHandle, Transport};
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Store document holding the assigned owner's user ID.
pub const OWNER_DOC: &str = "owner";

/// Runtime settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub prefix: String,
    /// Owner user ID fixed by configuration. Overrides an assigned owner.
    pub owner: Option<String>,
    pub autosave_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            owner: None,
            autosave_interval: Duration::from_secs(crate::config::DEFAULT_AUTOSAVE_SECS),
        }
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            prefix: config.bot.prefix.clone(),
            owner: config.bot.owner.clone(),
            autosave_interval: Duration::from_secs(config.bot.autosave_interval),
        }
    }
}

pub struct Bot {
    settings: Settings,
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store>,
    plugins: PluginManager,
    owner: RwLock<Option<String>>,
    started: DateTime<Local>,
    ready: AtomicBool,
    shutdown: CancellationToken,
}

impl Bot {
    pub fn prefix(&self) -> &str {
        &self.settings.prefix
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    pub fn owner(&self) -> Option<String> {
        self.owner.read().clone()
    }

    pub fn is_owner(&self, user: &User) -> bool {
        self.owner.read().as_deref() == Some(user.id.as_str())
    }

    /// Assign and persist the owner.
    pub async fn set_owner(&self, user: &User) -> Result<(), StoreError> {
        *self.owner.write() = Some(user.id.clone());
        store::save_typed(self.store.as_ref(), OWNER_DOC, &Some(user.id.clone())).await?;
        info!(owner = %user.name, id = %user.id, "Owner assigned");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn request_shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.cancel();
    }

    /// Send `text` to the channel `message` came from.
    pub async fn say(&self, message: &Message, text: &str) -> Result<MessageHandle, HandlerError> {
        Ok(self.transport.send_message(&message.channel, text).await?)
    }
}

#[derive(Clone)]
pub struct Context(Arc<Bot>);

impl Deref for Context {
    type Target = Bot;

    fn deref(&self) -> &Bot {
        &self.0
    }
}

impl Context {
    /// Assemble the bot. Reads the persisted owner unless configuration
    /// fixes one.
    pub async fn new(
        settings: Settings,
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store>,
        plugins: PluginManager,
    ) -> Result<Self, StoreError> {
        let owner = match &settings.owner {
            Some(id) => Some(id.clone()),
            None => store::load_typed::<Option<String>>(store.as_ref(), OWNER_DOC, None).await?,
        };

        Ok(Self(Arc::new(Bot {
            settings,
            transport,
            store,
            plugins,
            owner: RwLock::new(owner),
            started: Local::now(),
            ready: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })))
    }

    /// Handle the transport's ready event: run every ready hook and start
    /// autosave. Only the first call has any effect.
    pub fn mark_ready(&self) -> Vec<JoinHandle<()>> {
        if self.ready.swap(true, Ordering::AcqRel) {
            return Vec::new();
        }
        let me = self.transport.me();
        info!(user = %me.name, id = %me.id, "Logged in");

        let mut handles: Vec<JoinHandle<()>> = self
            .plugins
            .snapshot()
            .iter()
            .filter_map(|plugin| self.spawn_ready(plugin.name()))
            .collect();
        handles.push(tasks::spawn_autosave(self.clone()));
        handles
    }

    fn spawn_ready(&self, name: &str) -> Option<JoinHandle<()>> {
        let plugin = self.plugins.get(name)?;
        let hook = plugin.ready(self.clone())?;
        Some(tasks::spawn_ready(name.to_string(), hook))
    }

    /// Load a plugin, running its ready hook when the bot is already up.
    pub async fn load_plugin(&self, name: &str) -> bool {
        let loaded = self.plugins.load(name).await;
        if loaded && self.is_ready() {
            self.spawn_ready(name);
        }
        loaded
    }

    /// Reload a plugin, running the new instance's ready hook when the bot
    /// is already up.
    pub async fn reload_plugin(&self, name: &str) -> bool {
        let reloaded = self.plugins.reload(name).await;
        if reloaded && self.is_ready() {
            self.spawn_ready(name);
        }
        reloaded
    }

    pub async fn reload_all(&self) -> usize {
        let count = self.plugins.reload_all().await;
        if self.is_ready() {
            for name in self.plugins.names() {
                self.spawn_ready(&name);
            }
        }
        count
    }
}

/// Consume transport events until shutdown or until the transport closes.
pub async fn run(ctx: Context, mut events: mpsc::UnboundedReceiver<Event>) {
    loop {
        tokio::select! {
            _ = ctx.shutdown_token().cancelled() => break,
            event = events.recv() => match event {
                Some(Event::Ready) => {
                    ctx.mark_ready();
                }
                Some(Event::Message(message)) => {
                    dispatch::dispatch(&ctx, message).await;
                }
                None => {
                    warn!("Transport event stream closed");
                    break;
                }
            },
        }
    }
    info!("Event loop stopped");
}
