//! In-process transport.
//!
//! Holds groups, members, and channels in memory, records every outbound
//! action, and fans inbound messages out to both the bot's event queue and
//! any pending `wait_for_message` calls. The binary drives it from stdin
//! as a console session; tests drive it directly.

use super::{Event, MessageFilter, MessageHandle, Transport, TransportError};
use crate::proto::{Channel, Member, Message, User};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// Inbound fan-out capacity for `wait_for_message` subscribers.
const INBOUND_CAPACITY: usize = 256;

/// Outbound actions and editable messages kept before the oldest are dropped.
pub const RECORD_LIMIT: usize = 1024;

/// One recorded outbound action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Sent {
        handle: MessageHandle,
        channel: Channel,
        text: String,
    },
    Edited {
        handle: MessageHandle,
        text: String,
    },
    Presence(Option<String>),
}

#[derive(Debug, Default)]
struct Group {
    members: Vec<Member>,
    channels: Vec<Channel>,
}

pub struct MemoryTransport {
    me: User,
    groups: DashMap<String, Group>,
    outbox: Mutex<VecDeque<Outbound>>,
    sent: DashMap<String, String>,
    sent_order: Mutex<VecDeque<String>>,
    inbound: broadcast::Sender<Message>,
    waits: AtomicUsize,
    events: mpsc::UnboundedSender<Event>,
    echo: bool,
}

impl MemoryTransport {
    /// Create a transport and the event queue the bot loop consumes.
    pub fn new(me: User) -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        Self::build(me, false)
    }

    /// Like [`new`](Self::new), but also prints outbound text to stdout.
    pub fn console(me: User) -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        Self::build(me, true)
    }

    fn build(me: User, echo: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let transport = Arc::new(Self {
            me,
            groups: DashMap::new(),
            outbox: Mutex::new(VecDeque::new()),
            sent: DashMap::new(),
            sent_order: Mutex::new(VecDeque::new()),
            inbound,
            waits: AtomicUsize::new(0),
            events,
            echo,
        });
        (transport, rx)
    }

    /// Add a member to its group, creating the group if needed.
    pub fn add_member(&self, member: Member) {
        self.groups
            .entry(member.group.clone())
            .or_default()
            .members
            .push(member);
    }

    /// Add a group channel. Private channels need no registration.
    pub fn add_channel(&self, channel: Channel) {
        if let Some(group) = channel.group.clone() {
            self.groups.entry(group).or_default().channels.push(channel);
        }
    }

    /// Announce that the connection is ready.
    pub fn ready(&self) {
        let _ = self.events.send(Event::Ready);
    }

    /// Deliver an inbound message to waiters and to the event queue.
    pub fn deliver(&self, message: Message) {
        // No receivers just means nobody is waiting right now.
        let _ = self.inbound.send(message.clone());
        if self.events.send(Event::Message(message)).is_err() {
            debug!("Event queue closed, inbound message only fanned out to waiters");
        }
    }

    /// Number of live `wait_for_message` subscriptions. A waiter that has
    /// matched but not yet returned still counts.
    pub fn waiters(&self) -> usize {
        self.inbound.receiver_count()
    }

    /// Total `wait_for_message` calls that have subscribed so far.
    ///
    /// Only ever grows, so a caller can wait for it to pass a value read
    /// earlier to know a new waiter is listening.
    pub fn waits_started(&self) -> usize {
        self.waits.load(Ordering::Acquire)
    }

    /// Snapshot of the recorded outbound actions, oldest first.
    pub fn outbox(&self) -> Vec<Outbound> {
        self.outbox.lock().iter().cloned().collect()
    }

    /// Drain the recorded outbound actions.
    pub fn take_outbox(&self) -> Vec<Outbound> {
        self.outbox.lock().drain(..).collect()
    }

    /// Texts of sent (not edited) messages, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.outbox
            .lock()
            .iter()
            .filter_map(|o| match o {
                Outbound::Sent { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Outbound) {
        let mut outbox = self.outbox.lock();
        if outbox.len() == RECORD_LIMIT {
            outbox.pop_front();
        }
        outbox.push_back(action);
    }

    /// Remember a sent message for later edits, forgetting the oldest.
    fn remember(&self, id: &str, text: &str) {
        let mut order = self.sent_order.lock();
        if order.len() == RECORD_LIMIT
            && let Some(oldest) = order.pop_front()
        {
            self.sent.remove(&oldest);
        }
        order.push_back(id.to_string());
        self.sent.insert(id.to_string(), text.to_string());
    }

    fn candidates<T, F>(&self, group: Option<&str>, pick: F) -> Vec<T>
    where
        F: Fn(&Group) -> &Vec<T>,
        T: Clone,
    {
        match group {
            Some(id) => self
                .groups
                .get(id)
                .map(|g| pick(g.value()).clone())
                .unwrap_or_default(),
            None => self
                .groups
                .iter()
                .flat_map(|g| pick(g.value()).clone())
                .collect(),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn me(&self) -> &User {
        &self.me
    }

    async fn send_message(
        &self,
        channel: &Channel,
        text: &str,
    ) -> Result<MessageHandle, TransportError> {
        let handle = MessageHandle {
            channel_id: channel.id.clone(),
            message_id: uuid::Uuid::new_v4().to_string(),
        };
        if self.echo {
            println!("[#{}] {}", channel.name, text);
        }
        self.remember(&handle.message_id, text);
        self.record(Outbound::Sent {
            handle: handle.clone(),
            channel: channel.clone(),
            text: text.to_string(),
        });
        Ok(handle)
    }

    async fn edit_message(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Result<(), TransportError> {
        let Some(mut entry) = self.sent.get_mut(&handle.message_id) else {
            return Err(TransportError::UnknownMessage(handle.message_id.clone()));
        };
        *entry = text.to_string();
        drop(entry);

        if self.echo {
            println!("[edit] {}", text);
        }
        self.record(Outbound::Edited {
            handle: handle.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn wait_for_message(&self, timeout: Duration, filter: MessageFilter) -> Option<Message> {
        let mut rx = self.inbound.subscribe();
        self.waits.fetch_add(1, Ordering::AcqRel);
        let wait = async move {
            loop {
                match rx.recv().await {
                    Ok(message) if filter(&message) => return Some(message),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }

    async fn find_member(&self, group: Option<&str>, name: &str) -> Option<Member> {
        resolve_member(&self.candidates(group, |g| &g.members), name)
    }

    async fn find_channel(&self, group: Option<&str>, name: &str) -> Option<Channel> {
        resolve_channel(&self.candidates(group, |g| &g.channels), name)
    }

    async fn set_presence(&self, activity: Option<&str>) -> Result<(), TransportError> {
        self.record(Outbound::Presence(activity.map(str::to_string)));
        Ok(())
    }
}

/// Member match policy: mention or ID, then exact name or nick, then
/// case-insensitive name or nick, then case-insensitive prefix.
pub fn resolve_member(members: &[Member], query: &str) -> Option<Member> {
    let id = query
        .strip_prefix("<@")
        .and_then(|s| s.strip_suffix('>'))
        .map(|s| s.trim_start_matches('!'));
    if let Some(id) = id {
        return members.iter().find(|m| m.user.id == id).cloned();
    }

    let lower = query.to_lowercase();
    members
        .iter()
        .find(|m| m.user.id == query || m.user.name == query || m.nick.as_deref() == Some(query))
        .or_else(|| {
            members.iter().find(|m| {
                m.user.name.to_lowercase() == lower
                    || m.nick.as_deref().is_some_and(|n| n.to_lowercase() == lower)
            })
        })
        .or_else(|| {
            members.iter().find(|m| {
                m.display_name().to_lowercase().starts_with(&lower)
                    || m.user.name.to_lowercase().starts_with(&lower)
            })
        })
        .cloned()
}

/// Channel match policy: mention or ID, then name with or without `#`.
pub fn resolve_channel(channels: &[Channel], query: &str) -> Option<Channel> {
    if let Some(id) = query.strip_prefix("<#").and_then(|s| s.strip_suffix('>')) {
        return channels.iter().find(|c| c.id == id).cloned();
    }

    let name = query.trim_start_matches('#').to_lowercase();
    channels
        .iter()
        .find(|c| c.id == query || c.name.to_lowercase() == name)
        .cloned()
}
