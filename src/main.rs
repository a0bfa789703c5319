//! plugbot - console front end.
//!
//! Runs the bot against the in-process transport, reading one chat message
//! per line from stdin as the `console` user in a private channel.

use plugbot::bot::{self, Context, Settings};
use plugbot::config::{self, Config, ConfigError, LogFormat};
use plugbot::plugins::{self, PluginManager};
use plugbot::proto::{Channel, Message, User};
use plugbot::store::JsonStore;
use plugbot::transport::MemoryTransport;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &config::LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let (config, missing) = match Config::load(&config_path) {
        Ok(config) => (config, false),
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => (Config::default(), true),
        Err(e) => {
            eprintln!("Failed to load config {config_path}: {e}");
            return Err(e.into());
        }
    };

    init_tracing(&config.logging);
    if missing {
        warn!(path = %config_path, "Config file not found, using defaults");
    }

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }

    info!(prefix = %config.bot.prefix, storage = %config.storage.path, "Starting plugbot");

    plugbot::metrics::init();
    if config.bot.metrics_port != 0 {
        tokio::spawn(plugbot::http::run_http_server(config.bot.metrics_port));
    }

    let store = Arc::new(JsonStore::new(&config.storage.path));
    let (transport, events) = MemoryTransport::console(User::new("0", "plugbot"));

    let manager = PluginManager::new(plugins::default_catalog(), store.clone())
        .with_disabled(config.plugins.disabled.iter().cloned());
    let ctx = Context::new(Settings::from(&config), transport.clone(), store, manager).await?;

    let loaded = ctx.plugins().load_all().await;
    info!(loaded, plugins = ?ctx.plugins().names(), "Plugins loaded");

    // Console session
    {
        let ctx = ctx.clone();
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let user = User::new("console", "console");
            let channel = Channel::private("console", "console");
            transport.ready();

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        transport.deliver(Message::new(user.clone(), channel.clone(), line));
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
            info!("Console closed");
            ctx.request_shutdown();
        });
    }

    // Ctrl-C
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received");
                ctx.request_shutdown();
            }
        });
    }

    bot::run(ctx.clone(), events).await;

    let failed = ctx.plugins().save_all().await;
    if failed > 0 {
        warn!(failed, "Some plugins failed to save on shutdown");
    }
    info!("Shut down");
    Ok(())
}
