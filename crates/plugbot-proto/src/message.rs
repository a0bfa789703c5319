//! Inbound message model.
//!
//! These are the values a transport hands to the dispatcher. They carry
//! identities only; resolving names to members or channels is the
//! transport's job.

use crate::token::{Token, tokenize};
use std::fmt;

/// A user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    /// Stable user ID.
    pub id: String,
    /// Account name.
    pub name: String,
}

impl User {
    /// Create a user identity.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The mention form of this user (`<@id>`).
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A user as seen inside one group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    /// The underlying user.
    pub user: User,
    /// Group-specific nickname, if set.
    pub nick: Option<String>,
    /// ID of the group this membership belongs to.
    pub group: String,
}

impl Member {
    /// Create a member without a nickname.
    pub fn new(user: User, group: impl Into<String>) -> Self {
        Self {
            user,
            nick: None,
            group: group.into(),
        }
    }

    /// Attach a group nickname.
    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    /// Nickname if present, account name otherwise.
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.user.name)
    }
}

/// A channel identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    /// Stable channel ID.
    pub id: String,
    /// Channel name without any leading `#`.
    pub name: String,
    /// Owning group; `None` for direct conversations.
    pub group: Option<String>,
    /// Whether this is a private (direct) conversation.
    pub private: bool,
}

impl Channel {
    /// A channel inside a group.
    pub fn new(id: impl Into<String>, name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: Some(group.into()),
            private: false,
        }
    }

    /// A private conversation outside any group.
    pub fn private(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: None,
            private: true,
        }
    }

    /// The mention form of this channel (`<#id>`).
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Transport-assigned message ID.
    pub id: String,
    /// Who sent it.
    pub author: User,
    /// Where it was sent.
    pub channel: Channel,
    /// Raw text as typed.
    pub content: String,
    /// Display-sanitized text (mentions replaced by display names).
    pub clean_content: String,
}

impl Message {
    /// Build a message whose clean text equals its raw text.
    pub fn new(author: User, channel: Channel, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author,
            channel,
            clean_content: content.clone(),
            content,
        }
    }

    /// Replace the display-sanitized text.
    pub fn with_clean_content(mut self, clean: impl Into<String>) -> Self {
        self.clean_content = clean.into();
        self
    }

    /// The group the message originated from, if any.
    #[inline]
    pub fn group(&self) -> Option<&str> {
        self.channel.group.as_deref()
    }

    /// Tokenize the raw content.
    pub fn tokens(&self) -> Vec<Token> {
        tokenize(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_copies_content_to_clean() {
        let msg = Message::new(
            User::new("1", "alice"),
            Channel::new("10", "general", "g1"),
            "hi <@2>",
        );
        assert_eq!(msg.clean_content, "hi <@2>");
        assert_eq!(msg.group(), Some("g1"));

        let msg = msg.with_clean_content("hi @bob");
        assert_eq!(msg.clean_content, "hi @bob");
        assert_eq!(msg.content, "hi <@2>");
    }

    #[test]
    fn private_channel_has_no_group() {
        let chan = Channel::private("dm-1", "alice");
        assert!(chan.private);
        assert!(chan.group.is_none());
    }

    #[test]
    fn member_display_name_prefers_nick() {
        let member = Member::new(User::new("2", "bob"), "g1");
        assert_eq!(member.display_name(), "bob");
        assert_eq!(member.with_nick("Bobby").display_name(), "Bobby");
    }

    #[test]
    fn mentions() {
        assert_eq!(User::new("7", "x").mention(), "<@7>");
        assert_eq!(Channel::new("9", "dev", "g").mention(), "<#9>");
    }
}
