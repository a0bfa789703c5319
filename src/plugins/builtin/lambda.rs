//! Operator scripting: persisted lambda triggers plus `do` and `eval`.
//!
//! A lambda maps a trigger word to a template script. Whenever a message's
//! first token names an enabled trigger, the script is rendered against a
//! fresh [`ExecContext`] and the output is sent back.

use crate::binder::{Annotation, Args, Param, coerce};
use crate::bot::Context;
use crate::commands::{Command, RegistryError, with_state};
use crate::error::{HandlerError, HandlerResult};
use crate::plugins::PluginDef;
use crate::proto::Message;
use crate::script::{self, ExecContext};
use crate::store::{Store, StoreError, load_typed, save_typed};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const LAMBDAS_DOC: &str = "lambdas";
pub const LAMBDA_CONFIG_DOC: &str = "lambda-config";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaConfig {
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Trigger table and blacklist, backed by the store.
pub struct Lambdas {
    store: Arc<dyn Store>,
    table: Mutex<BTreeMap<String, String>>,
    config: Mutex<LambdaConfig>,
}

impl Lambdas {
    pub async fn open(store: Arc<dyn Store>) -> Result<Arc<Self>, StoreError> {
        let table = load_typed(store.as_ref(), LAMBDAS_DOC, BTreeMap::new()).await?;
        let config = load_typed(store.as_ref(), LAMBDA_CONFIG_DOC, LambdaConfig::default()).await?;
        Ok(Arc::new(Self {
            store,
            table: Mutex::new(table),
            config: Mutex::new(config),
        }))
    }

    pub async fn save(&self) -> Result<(), StoreError> {
        let table = self.table.lock().clone();
        let config = self.config.lock().clone();
        save_typed(self.store.as_ref(), LAMBDAS_DOC, &table).await?;
        save_typed(self.store.as_ref(), LAMBDA_CONFIG_DOC, &config).await
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    pub fn triggers(&self) -> Vec<String> {
        self.table.lock().keys().cloned().collect()
    }

    pub fn source(&self, trigger: &str) -> Option<String> {
        self.table.lock().get(trigger).cloned()
    }

    /// Script for `trigger` unless it is missing or disabled.
    pub fn enabled_script(&self, trigger: &str) -> Option<String> {
        if self.config.lock().blacklist.iter().any(|t| t == trigger) {
            return None;
        }
        self.source(trigger)
    }

    /// Add a trigger. `false` if it already exists.
    pub fn add(&self, trigger: &str, script: &str) -> bool {
        let mut table = self.table.lock();
        if table.contains_key(trigger) {
            return false;
        }
        table.insert(trigger.to_string(), script.to_string());
        true
    }

    pub fn remove(&self, trigger: &str) -> bool {
        let removed = self.table.lock().remove(trigger).is_some();
        if removed {
            self.config.lock().blacklist.retain(|t| t != trigger);
        }
        removed
    }

    /// Enable or disable an existing trigger.
    pub fn set_enabled(&self, trigger: &str, enabled: bool) -> Toggle {
        if !self.table.lock().contains_key(trigger) {
            return Toggle::Missing;
        }
        let mut config = self.config.lock();
        let listed = config.blacklist.iter().any(|t| t == trigger);
        match (enabled, listed) {
            (true, true) => {
                config.blacklist.retain(|t| t != trigger);
                Toggle::Changed
            }
            (false, false) => {
                config.blacklist.push(trigger.to_string());
                Toggle::Changed
            }
            _ => Toggle::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Changed,
    Unchanged,
    Missing,
}

fn trigger_param() -> Param {
    Param::required("trigger").annotate(Annotation::coerce(coerce::lower))
}

fn script_param() -> Param {
    Param::required("script").annotate(Annotation::CodeExtraction)
}

pub(super) fn register(def: &mut PluginDef, lambdas: &Arc<Lambdas>) -> Result<(), RegistryError> {
    def.command(
        Command::new("lambda", with_state(lambdas, list))
            .usage("[add <trigger> <script> | [remove | enable | disable | source] <trigger>]")
            .doc(
                "Create commands. See `help do` for how scripts work.\n\n\
                 Lambda scripts also get `{0}`, `{1}`, ... for the words of the triggering \
                 message, where `{0}` is the trigger.  /\n\
                 **Owner command unless no argument is specified.**",
            ),
    )?
    .subcommand(
        "lambda",
        Command::new("add", with_state(lambdas, add))
            .doc("Add a command that runs the specified script.")
            .owner_only()
            .param(trigger_param())
            .param(script_param()),
    )?
    .subcommand(
        "lambda",
        Command::new("remove", with_state(lambdas, remove))
            .doc("Remove a command.")
            .owner_only()
            .param(trigger_param()),
    )?
    .subcommand(
        "lambda",
        Command::new("enable", with_state(lambdas, |l, ctx, msg, args| {
            toggle(l, ctx, msg, args, true)
        }))
        .doc("Enable a command.")
        .owner_only()
        .param(trigger_param()),
    )?
    .subcommand(
        "lambda",
        Command::new("disable", with_state(lambdas, |l, ctx, msg, args| {
            toggle(l, ctx, msg, args, false)
        }))
        .doc("Disable a command.")
        .owner_only()
        .param(trigger_param()),
    )?
    .subcommand(
        "lambda",
        Command::new("source", with_state(lambdas, source))
            .doc("Display the source of a command.")
            .param(trigger_param()),
    )?
    .command(
        Command::new("do", run_do)
            .usage("<script ...>")
            .doc(
                "Run a script and send its output.\n\
                 Scripts are text with `{name}` placeholders: `{author}`, `{mention}`, \
                 `{channel}` and `{message}` are bound. Use `{name|fallback}` for a \
                 default and `{{` or `}}` for literal braces.",
            )
            .owner_only()
            .param(script_param()),
    )?
    .command(
        Command::new("eval", run_eval)
            .usage("<script ...>")
            .doc("Render a script and show the result or the error.")
            .owner_only()
            .param(script_param()),
    )?;
    Ok(())
}

/// Bindings every script execution sees.
fn exec_context(message: &Message) -> ExecContext {
    ExecContext::new()
        .with("author", message.author.name.clone())
        .with("mention", message.author.mention())
        .with("channel", message.channel.name.clone())
        .with("message", message.content.clone())
}

async fn list(lambdas: Arc<Lambdas>, ctx: Context, message: Message, _args: Args) -> HandlerResult {
    let triggers = lambdas.triggers().join(", ");
    ctx.say(&message, &format!("**Lambdas:** ```\n{triggers}```")).await?;
    Ok(())
}

async fn add(lambdas: Arc<Lambdas>, ctx: Context, message: Message, args: Args) -> HandlerResult {
    let trigger = required(&args, "trigger")?;
    let script = required(&args, "script")?;
    let text = if lambdas.add(trigger, script) {
        lambdas.save().await?;
        format!("Command `{trigger}` set.")
    } else {
        format!("Command `{trigger}` already exists.")
    };
    ctx.say(&message, &text).await?;
    Ok(())
}

async fn remove(lambdas: Arc<Lambdas>, ctx: Context, message: Message, args: Args) -> HandlerResult {
    let trigger = required(&args, "trigger")?;
    let text = if lambdas.remove(trigger) {
        lambdas.save().await?;
        format!("Command `{trigger}` removed.")
    } else {
        format!("Command `{trigger}` does not exist.")
    };
    ctx.say(&message, &text).await?;
    Ok(())
}

async fn toggle(
    lambdas: Arc<Lambdas>,
    ctx: Context,
    message: Message,
    args: Args,
    enable: bool,
) -> HandlerResult {
    let trigger = required(&args, "trigger")?;
    let state = if enable { "enabled" } else { "disabled" };
    let text = match lambdas.set_enabled(trigger, enable) {
        Toggle::Changed => {
            lambdas.save().await?;
            format!("Command `{trigger}` {state}.")
        }
        Toggle::Unchanged => format!("Command `{trigger}` is already {state}."),
        Toggle::Missing => format!("Command `{trigger}` does not exist."),
    };
    ctx.say(&message, &text).await?;
    Ok(())
}

async fn source(lambdas: Arc<Lambdas>, ctx: Context, message: Message, args: Args) -> HandlerResult {
    let trigger = required(&args, "trigger")?;
    let text = match lambdas.source(trigger) {
        Some(script) => format!("Source for `{trigger}`:\n{script}"),
        None => format!("Command `{trigger}` does not exist."),
    };
    ctx.say(&message, &text).await?;
    Ok(())
}

async fn run_do(ctx: Context, message: Message, args: Args) -> HandlerResult {
    let script = required(&args, "script")?;
    let output = script::render(script, &exec_context(&message))?;
    if !output.is_empty() {
        ctx.say(&message, &output).await?;
    }
    Ok(())
}

async fn run_eval(ctx: Context, message: Message, args: Args) -> HandlerResult {
    let script = required(&args, "script")?;
    let result = match script::render(script, &exec_context(&message)) {
        Ok(output) => output,
        Err(e) => e.to_string(),
    };
    ctx.say(&message, &format!("**Result:** \n```{result}\n```")).await?;
    Ok(())
}

/// Generic-message hook: run the lambda named by the first token.
pub(super) async fn run_trigger(
    lambdas: Arc<Lambdas>,
    ctx: Context,
    message: Message,
    args: Arc<[String]>,
) -> Result<bool, HandlerError> {
    let Some(trigger) = args.first().map(|t| t.to_lowercase()) else {
        return Ok(false);
    };
    let Some(script) = lambdas.enabled_script(&trigger) else {
        return Ok(false);
    };

    debug!(trigger = %trigger, "Running lambda");
    let exec = exec_context(&message)
        .with("args", args[1..].join(" "))
        .with_args(args.to_vec());
    let output = script::render(&script, &exec)?;
    if !output.is_empty() {
        ctx.say(&message, &output).await?;
    }
    Ok(true)
}

fn required<'a>(args: &'a Args, name: &str) -> Result<&'a str, HandlerError> {
    args.str(name)
        .ok_or_else(|| HandlerError::MissingArgument(name.to_string()))
}
