//! Inbound message dispatch.
//!
//! For every message and every loaded plugin, in load order:
//!
//! 1. If the first token is the prefix followed by a command name that
//!    plugin registered, walk down its sub-commands along the following
//!    tokens, bind the remaining tokens, and either report the binding
//!    failure or spawn the handler.
//! 2. Whether or not a command matched, spawn the plugin's
//!    generic-message hook if it has one.
//!
//! Dispatch keeps no state between messages.

use crate::binder::{self, BindSource};
use crate::bot::Context;
use crate::commands::{Command, help};
use crate::metrics;
use crate::plugins::Plugin;
use crate::proto::{Message, Token};
use crate::tasks;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Log a command-shaped message as `{prefix}@author -> content`.
pub fn log_message(message: &Message, prefix: &str) {
    info!("{prefix}@{} -> {}", message.author, message.content);
}

/// Dispatch one inbound message.
///
/// Returns the handles of every task spawned for it, which the event loop
/// drops and tests await.
pub async fn dispatch(ctx: &Context, message: Message) -> Vec<JoinHandle<()>> {
    let started = Instant::now();

    if message.author.id == ctx.transport().me().id || message.content.trim().is_empty() {
        return Vec::new();
    }

    let tokens = message.tokens();
    if tokens.is_empty() {
        return Vec::new();
    }
    metrics::record_message_dispatched();
    let args: Arc<[String]> = tokens.iter().map(|t| t.text.clone()).collect();
    let name = tokens[0]
        .text
        .strip_prefix(ctx.prefix())
        .filter(|name| !name.is_empty());

    let mut handles = Vec::new();
    for plugin in ctx.plugins().snapshot() {
        if let Some(name) = name
            && let Some((command, consumed)) = plugin.commands().resolve(name, &tokens[1..])
            && let Some(handle) =
                run_command(ctx, &plugin, command, &tokens, 1 + consumed, &message, started).await
        {
            handles.push(handle);
        }

        if let Some(hook) = plugin.handle_message(ctx.clone(), message.clone(), Arc::clone(&args)) {
            handles.push(tasks::spawn_hook(
                ctx.clone(),
                message.clone(),
                plugin.name().to_string(),
                hook,
            ));
        }
    }
    handles
}

async fn run_command(
    ctx: &Context,
    plugin: &Plugin,
    command: &Command,
    tokens: &[Token],
    start: usize,
    message: &Message,
    started: Instant,
) -> Option<JoinHandle<()>> {
    let path = command.path();

    if command.is_owner_only() && !ctx.is_owner(&message.author) {
        debug!(command = %path, author = %message.author, "Ignoring owner-only command from non-owner");
        return None;
    }

    let source = BindSource {
        message,
        transport: ctx.transport().as_ref(),
    };
    let invocation = binder::bind(command.params(), command.validator_fn(), tokens, start, &source).await;
    log_message(message, "");

    if !invocation.complete {
        debug!(command = %path, plugin = %plugin.name(), bound = invocation.bound, "Binding incomplete");
        metrics::record_binding_failure(&path);
        let text = match command.error_text() {
            Some(error) => error.to_string(),
            None => help::describe(command, ctx.prefix()),
        };
        if let Err(e) = ctx.say(message, &text).await {
            warn!(command = %path, error = %e, "Could not send usage");
        }
        return None;
    }

    let fut = command.invoke(ctx.clone(), message.clone(), invocation.into_args());
    let handle = tasks::spawn_command(ctx.clone(), message.clone(), path, fut);
    debug!(
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Time spent parsing command"
    );
    Some(handle)
}
