//! Built-in commands.
//!
//! Loaded before every other plugin. Besides the basics (`help`, `ping`,
//! `uptime`) it carries owner administration (`setowner`, `stop`, `game`),
//! runtime plugin management (`plugin ...`), and operator scripting
//! (`lambda ...`, `do`, `eval`).

mod lambda;
mod manage;

pub use lambda::{LAMBDAS_DOC, LAMBDA_CONFIG_DOC, LambdaConfig, Lambdas};

use super::{PluginDef, PluginError, PluginFactory};
use crate::binder::{Annotation, Args, Param, Value};
use crate::bot::Context;
use crate::commands::{Command, help};
use crate::error::HandlerResult;
use crate::proto::{Message, tokenize};
use crate::store::Store;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const NAME: &str = "builtin";

/// How long `setowner` waits for the code.
pub const OWNER_CODE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Factory;

#[async_trait]
impl PluginFactory for Factory {
    async fn build(&self, store: Arc<dyn Store>) -> Result<PluginDef, PluginError> {
        let lambdas = Lambdas::open(store).await?;

        let mut def = PluginDef::new();
        def.command(help_command())?
            .command(ping_command())?
            .command(uptime_command())?
            .command(setowner_command())?
            .command(stop_command())?
            .command(game_command())?;
        manage::register(&mut def)?;
        lambda::register(&mut def, &lambdas)?;

        {
            let lambdas = Arc::clone(&lambdas);
            def.on_ready(move |_ctx| {
                let count = lambdas.len();
                async move {
                    info!(lambdas = count, "Lambdas ready");
                    Ok(())
                }
            });
        }
        {
            let lambdas = Arc::clone(&lambdas);
            def.on_message(move |ctx, message, args| {
                lambda::run_trigger(Arc::clone(&lambdas), ctx, message, args)
            });
        }
        def.on_save(move || {
            let lambdas = Arc::clone(&lambdas);
            async move { lambdas.save().await }
        });

        Ok(def)
    }
}

/// `help [command]`: list commands or describe one.
pub fn help_command() -> Command {
    Command::new("help", show_help)
        .usage("[command]")
        .doc("Display commands or their usage and description.")
        .param(Param::optional("command", Value::None).annotate(Annotation::LowerRawContent))
}

async fn show_help(ctx: Context, message: Message, args: Args) -> HandlerResult {
    let prefix = ctx.prefix();

    let Some(query) = args.str("command") else {
        let is_owner = ctx.is_owner(&message.author);
        let mut names: Vec<String> = ctx
            .plugins()
            .snapshot()
            .iter()
            .flat_map(|plugin| {
                plugin
                    .commands()
                    .iter()
                    .filter(|cmd| !cmd.is_hidden() && (!cmd.is_owner_only() || is_owner))
                    .map(|cmd| cmd.name().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();
        names.sort();
        ctx.say(&message, &help::listing(&names, prefix)).await?;
        return Ok(());
    };

    let tokens = tokenize(query);
    let Some(first) = tokens.first() else {
        return Ok(());
    };
    let name = first.text.strip_prefix(prefix).unwrap_or(&first.text);

    let description = ctx.plugins().snapshot().iter().find_map(|plugin| {
        plugin
            .commands()
            .resolve(name, &tokens[1..])
            .map(|(cmd, _)| help::describe(cmd, prefix))
    });

    match description {
        Some(text) => ctx.say(&message, &text).await?,
        None => {
            ctx.say(&message, &format!("Command `{name}` does not exist."))
                .await?
        }
    };
    Ok(())
}

/// `ping`: reply, then edit the reply with the round-trip time.
pub fn ping_command() -> Command {
    Command::new("ping", ping).doc("Tracks the time spent parsing the command and sending a message.")
}

async fn ping(ctx: Context, message: Message, _args: Args) -> HandlerResult {
    let start = Instant::now();
    let handle = ctx.say(&message, "Pong!").await?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;

    ctx.transport()
        .edit_message(&handle, &format!("Pong! `{elapsed:.4}ms`"))
        .await?;
    Ok(())
}

fn uptime_command() -> Command {
    Command::new("uptime", |ctx: Context, message: Message, _args: Args| async move {
        let since = ctx.started().format("%a %b %e %H:%M:%S %Y");
        ctx.say(&message, &format!("I've been running since `{since}`."))
            .await?;
        Ok(())
    })
    .doc("Return the time this bot started.")
}

fn setowner_command() -> Command {
    Command::new("setowner", setowner)
        .doc("Set the bot owner. Only works in private messages.")
        .hidden()
}

async fn setowner(ctx: Context, message: Message, _args: Args) -> HandlerResult {
    if !message.channel.private {
        return Ok(());
    }
    if ctx.owner().is_some() {
        ctx.say(&message, "An owner is already set.").await?;
        return Ok(());
    }

    let code = rand::thread_rng().gen_range(100..=999).to_string();
    warn!(code = %code, "Owner code for assignment");
    ctx.say(
        &message,
        "A code has been printed in the console for you to repeat within 60 seconds.",
    )
    .await?;

    let channel_id = message.channel.id.clone();
    let author_id = message.author.id.clone();
    let reply = ctx
        .transport()
        .wait_for_message(
            OWNER_CODE_TIMEOUT,
            Box::new(move |m| m.channel.id == channel_id && m.author.id == author_id),
        )
        .await;

    let text = match reply {
        None => "You failed to send the desired code.",
        Some(reply) if reply.content.trim() == code => {
            ctx.set_owner(&message.author).await?;
            "You have been assigned bot owner."
        }
        Some(_) => "That is not the code.",
    };
    ctx.say(&message, text).await?;
    Ok(())
}

fn stop_command() -> Command {
    Command::new("stop", |ctx: Context, message: Message, _args: Args| async move {
        ctx.say(&message, ":boom: :gun:").await?;
        ctx.plugins().save_all().await;
        ctx.request_shutdown();
        Ok(())
    })
    .doc("Stops the bot.")
    .owner_only()
}

fn game_command() -> Command {
    Command::new("game", |ctx: Context, message: Message, args: Args| async move {
        let name = args.str("name").unwrap_or_default().trim().to_string();
        if name.is_empty() {
            ctx.transport().set_presence(None).await?;
            ctx.say(&message, "*No longer playing.*").await?;
        } else {
            ctx.transport().set_presence(Some(&name)).await?;
            ctx.say(&message, &format!("*Set the game to* **{name}**."))
                .await?;
        }
        Ok(())
    })
    .usage("[name ...]")
    .doc("Stop playing or set game to `name`.")
    .owner_only()
    .param(Param::optional("name", "").annotate(Annotation::RawContent))
}
