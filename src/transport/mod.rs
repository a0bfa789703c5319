//! Transport abstraction.
//!
//! The transport connects to the chat service, delivers inbound events,
//! and performs outbound actions. The dispatch core only ever talks to
//! this trait.

use crate::proto::{Channel, Member, Message, User};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod memory;

pub use memory::{MemoryTransport, Outbound};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("unknown message: {0}")]
    UnknownMessage(String),
    #[error("transport closed")]
    Closed,
}

/// Reference to a message the bot sent, used for later edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: String,
    pub message_id: String,
}

/// Inbound events, delivered in order on the bot's event loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// The connection is up and the bot identity is known.
    Ready,
    /// A chat message arrived.
    Message(Message),
}

/// Predicate for [`Transport::wait_for_message`].
pub type MessageFilter = Box<dyn Fn(&Message) -> bool + Send + Sync>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// The bot's own identity.
    fn me(&self) -> &User;

    async fn send_message(
        &self,
        channel: &Channel,
        text: &str,
    ) -> Result<MessageHandle, TransportError>;

    async fn edit_message(&self, handle: &MessageHandle, text: &str)
    -> Result<(), TransportError>;

    /// Wait for the next inbound message accepted by `filter`.
    ///
    /// Returns `None` when `timeout` expires first.
    async fn wait_for_message(&self, timeout: Duration, filter: MessageFilter) -> Option<Message>;

    /// Resolve a member by ID, mention, or (fuzzy) name within a group.
    async fn find_member(&self, group: Option<&str>, name: &str) -> Option<Member>;

    /// Resolve a channel by ID, mention, or name within a group.
    async fn find_channel(&self, group: Option<&str>, name: &str) -> Option<Channel>;

    /// Set or clear the bot's presence line ("Playing ...").
    async fn set_presence(&self, activity: Option<&str>) -> Result<(), TransportError>;
}
