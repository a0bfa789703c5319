//! Supervised background tasks.
//!
//! Handlers and hooks never run inline with dispatch. Each is spawned on
//! the runtime behind a boundary that catches both `HandlerError`s and
//! panics, so one failing handler cannot take down the event loop.

use crate::bot::Context;
use crate::dispatch::log_message;
use crate::error::{HandlerError, HandlerResult};
use crate::metrics;
use crate::proto::Message;
use crate::telemetry::{CommandTimer, spans};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, debug, error, info, warn};

/// Run `fut`, turning a panic into `None`.
async fn guarded<T>(label: &str, fut: BoxFuture<'static, T>) -> Option<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(out) => Some(out),
        Err(panic) => {
            error!(task = %label, panic = %panic_message(panic.as_ref()), "Task panicked");
            metrics::record_command_error(label, "panic");
            None
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

/// Log a failed handler and, for script errors raised by the owner, echo
/// the error back to the channel.
async fn report(ctx: &Context, message: &Message, label: &str, err: HandlerError) {
    metrics::record_command_error(label, err.error_code());
    warn!(task = %label, error = %err, code = err.error_code(), "Handler failed");

    if err.is_operator_visible() && ctx.is_owner(&message.author) {
        let text = format!("```{err}```");
        if let Err(e) = ctx.say(message, &text).await {
            warn!(error = %e, "Could not echo handler error");
        }
    }
}

/// Spawn a command handler.
pub fn spawn_command(
    ctx: Context,
    message: Message,
    label: String,
    fut: BoxFuture<'static, HandlerResult>,
) -> JoinHandle<()> {
    let span = spans::command(&label, &message.author.to_string(), &message.channel.name);
    tokio::spawn(
        async move {
            let _timer = CommandTimer::new(label.clone());
            if let Some(Err(e)) = guarded(&label, fut).await {
                report(&ctx, &message, &label, e).await;
            }
        }
        .instrument(span),
    )
}

/// Spawn a plugin's generic-message hook. A hook that reports the message
/// as handled gets it logged like a command.
pub fn spawn_hook(
    ctx: Context,
    message: Message,
    plugin: String,
    fut: BoxFuture<'static, Result<bool, HandlerError>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let label = format!("{plugin}:on_message");
        match guarded(&label, fut).await {
            Some(Ok(true)) => log_message(&message, "... "),
            Some(Ok(false)) | None => {}
            Some(Err(e)) => report(&ctx, &message, &label, e).await,
        }
    })
}

/// Spawn a plugin's ready hook.
pub fn spawn_ready(plugin: String, fut: BoxFuture<'static, HandlerResult>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let label = format!("{plugin}:on_ready");
        if let Some(Err(e)) = guarded(&label, fut).await {
            error!(plugin = %plugin, error = %e, "Ready hook failed");
        }
    })
}

/// Save all plugins on the configured interval until shutdown.
///
/// Saves go through the plugin manager's lifecycle lock, so they never
/// overlap a reload.
pub fn spawn_autosave(ctx: Context) -> JoinHandle<()> {
    let period = ctx.settings().autosave_interval;
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = period.as_secs(), "Autosave started");

        loop {
            tokio::select! {
                _ = ctx.shutdown_token().cancelled() => break,
                _ = ticker.tick() => {
                    let failed = ctx.plugins().save_all().await;
                    debug!(failed, "Autosave complete");
                }
            }
        }
        debug!("Autosave stopped");
    })
}
