//! plugbot - command dispatch and hot-reloadable plugins for chat services.
//!
//! Inbound messages are tokenized ([`proto`]), matched against the command
//! trees of the loaded plugins ([`commands`], [`plugins`]), bound to typed
//! parameters ([`binder`]), and run as supervised tasks ([`dispatch`],
//! [`tasks`]). The chat service itself sits behind [`transport::Transport`]
//! and plugin state behind [`store::Store`].

pub use plugbot_proto as proto;

pub mod binder;
pub mod bot;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod metrics;
pub mod plugins;
pub mod script;
pub mod store;
pub mod tasks;
pub mod telemetry;
pub mod transport;
