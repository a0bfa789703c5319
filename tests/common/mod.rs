//! Integration test common infrastructure.
//!
//! Builds a bot on the in-process transport and a memory store, and drives
//! messages through dispatch so tests can assert on what the bot sent.

#![allow(dead_code)]

use plugbot::bot::{Context, Settings};
use plugbot::dispatch::dispatch;
use plugbot::plugins::{Catalog, PluginManager};
use plugbot::proto::{Channel, Message, User};
use plugbot::store::{MemoryStore, Store};
use plugbot::transport::{Event, MemoryTransport};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const OWNER_ID: &str = "100";

pub fn owner() -> User {
    User::new(OWNER_ID, "root")
}

pub fn alice() -> User {
    User::new("200", "alice")
}

pub fn general() -> Channel {
    Channel::new("c1", "general", "g1")
}

pub fn dm(user: &User) -> Channel {
    Channel::private(format!("dm-{}", user.id), user.name.clone())
}

/// A bot wired to an in-memory transport and store.
pub struct TestBot {
    pub ctx: Context,
    pub transport: Arc<MemoryTransport>,
    pub store: Arc<dyn Store>,
    _events: mpsc::UnboundedReceiver<Event>,
}

impl TestBot {
    /// Bot with [`owner`] configured as owner, `!` prefix, every catalog
    /// entry loaded.
    pub async fn start(catalog: Catalog) -> Self {
        Self::builder(catalog).owner(OWNER_ID).build().await
    }

    pub fn builder(catalog: Catalog) -> TestBotBuilder {
        TestBotBuilder {
            catalog,
            settings: Settings::default(),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Deliver a message and dispatch it, returning the spawned tasks
    /// without waiting for them.
    pub async fn dispatch(&self, author: &User, channel: &Channel, text: &str) -> Vec<JoinHandle<()>> {
        let message = Message::new(author.clone(), channel.clone(), text);
        self.transport.deliver(message.clone());
        dispatch(&self.ctx, message).await
    }

    /// Deliver, dispatch, and wait for every spawned task.
    pub async fn send(&self, author: &User, channel: &Channel, text: &str) {
        join(self.dispatch(author, channel, text).await).await;
    }

    /// Texts sent since the last call.
    pub fn replies(&self) -> Vec<String> {
        let texts = self.transport.sent_texts();
        self.transport.take_outbox();
        texts
    }

    /// `wait_for_message` calls started so far.
    pub fn waits(&self) -> usize {
        self.transport.waits_started()
    }

    /// Wait until more than `seen` `wait_for_message` calls have started,
    /// so the next delivery reaches a fresh waiter.
    pub async fn until_waits_exceed(&self, seen: usize) {
        while self.transport.waits_started() <= seen {
            tokio::task::yield_now().await;
        }
    }

    /// Deliver a reply to a task blocked in `wait_for_message` and wait
    /// for that task to start its next wait.
    pub async fn answer(&self, author: &User, channel: &Channel, text: &str) {
        let seen = self.waits();
        self.send(author, channel, text).await;
        self.until_waits_exceed(seen).await;
    }
}

pub struct TestBotBuilder {
    catalog: Catalog,
    settings: Settings,
    store: Arc<dyn Store>,
}

impl TestBotBuilder {
    pub fn owner(mut self, id: &str) -> Self {
        self.settings.owner = Some(id.to_string());
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = store;
        self
    }

    pub async fn build(self) -> TestBot {
        let (transport, events) = MemoryTransport::new(User::new("0", "plugbot"));
        transport.add_channel(general());

        let manager = PluginManager::new(self.catalog, Arc::clone(&self.store));
        let ctx = Context::new(self.settings, transport.clone(), Arc::clone(&self.store), manager)
            .await
            .expect("context");
        ctx.plugins().load_all().await;

        TestBot {
            ctx,
            transport,
            store: self.store,
            _events: events,
        }
    }
}

pub async fn join(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        handle.await.expect("task panicked");
    }
}
