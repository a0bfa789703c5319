//! `plugin` command tree: list, reload, load, and unload plugins at runtime.

use crate::binder::{Annotation, Args, Param, Value, coerce};
use crate::bot::Context;
use crate::commands::{Command, RegistryError};
use crate::error::HandlerResult;
use crate::plugins::PluginDef;
use crate::proto::Message;

pub(super) fn register(def: &mut PluginDef) -> Result<(), RegistryError> {
    def.command(
        Command::new("plugin", list)
            .usage("[reload | load | unload] [plugin]")
            .doc("Manage plugins.\n**Owner command unless no argument is specified.**"),
    )?
    .subcommand(
        "plugin",
        Command::new("reload", reload)
            .doc("Reloads a plugin, or every plugin when no name is given.")
            .owner_only()
            .param(plugin_name(Param::optional("name", Value::None))),
    )?
    .subcommand(
        "plugin",
        Command::new("load", load)
            .doc("Loads a plugin.")
            .error("You need to specify the name of the plugin to load.")
            .owner_only()
            .param(plugin_name(Param::required("name"))),
    )?
    .subcommand(
        "plugin",
        Command::new("unload", unload)
            .doc("Unloads a plugin.")
            .error("You need to specify the name of the plugin to unload.")
            .owner_only()
            .param(plugin_name(Param::required("name"))),
    )?;
    Ok(())
}

fn plugin_name(param: Param) -> Param {
    param.annotate(Annotation::coerce(coerce::lower))
}

async fn list(ctx: Context, message: Message, _args: Args) -> HandlerResult {
    let names = ctx.plugins().names().join(",\n");
    ctx.say(&message, &format!("**Plugins:** ```\n{names}```")).await?;
    Ok(())
}

async fn reload(ctx: Context, message: Message, args: Args) -> HandlerResult {
    let prefix = ctx.prefix();
    let text = match args.str("name") {
        Some(name) if !ctx.plugins().is_loaded(name) => {
            format!("`{name}` is not a plugin. See `{prefix}plugin`.")
        }
        Some(name) => {
            if ctx.reload_plugin(name).await {
                format!("Reloaded plugin `{name}`.")
            } else {
                format!("Plugin `{name}` could not be reloaded.")
            }
        }
        None => {
            ctx.reload_all().await;
            "All plugins reloaded.".to_string()
        }
    };
    ctx.say(&message, &text).await?;
    Ok(())
}

async fn load(ctx: Context, message: Message, args: Args) -> HandlerResult {
    let name = args.str("name").unwrap_or_default();
    let text = if ctx.plugins().is_loaded(name) {
        format!("Plugin `{name}` is already loaded.")
    } else if ctx.load_plugin(name).await {
        format!("Plugin `{name}` loaded.")
    } else {
        format!("Plugin `{name}` could not be loaded.")
    };
    ctx.say(&message, &text).await?;
    Ok(())
}

async fn unload(ctx: Context, message: Message, args: Args) -> HandlerResult {
    let name = args.str("name").unwrap_or_default();
    let text = if ctx.plugins().save_and_unload(name).await {
        format!("Plugin `{name}` unloaded.")
    } else {
        format!("`{name}` is not a plugin. See `{}plugin`.", ctx.prefix())
    };
    ctx.say(&message, &text).await?;
    Ok(())
}
