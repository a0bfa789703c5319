//! Plugin load, unload, reload, and persistence through a running bot.

mod common;

use common::{TestBot, general, owner};
use plugbot::binder::Args;
use plugbot::bot::{Context, Settings};
use plugbot::commands::Command;
use plugbot::plugins::{Catalog, FnFactory, PluginDef, builtin};
use plugbot::proto::Message;
use plugbot::store::{Store, load_typed, save_typed};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const COUNTER_DOC: &str = "counter";

/// A plugin whose count only reaches the store through its save hook.
fn counter_factory() -> FnFactory {
    FnFactory::new(|store: Arc<dyn Store>| async move {
        let start: u64 = load_typed(store.as_ref(), COUNTER_DOC, 0).await?;
        let count = Arc::new(AtomicU64::new(start));

        let mut def = PluginDef::new();
        {
            let count = Arc::clone(&count);
            def.command(Command::new(
                "count",
                move |ctx: Context, message: Message, _args: Args| {
                    let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        ctx.say(&message, &n.to_string()).await?;
                        Ok(())
                    }
                },
            ))?;
        }
        def.on_save(move || {
            let count = Arc::clone(&count);
            let store = Arc::clone(&store);
            async move { save_typed(store.as_ref(), COUNTER_DOC, &count.load(Ordering::SeqCst)).await }
        });
        Ok(def)
    })
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .insert(builtin::NAME, builtin::Factory)
        .insert("counter", counter_factory());
    catalog
}

#[tokio::test]
async fn save_all_then_load_all_restores_state() {
    let bot = TestBot::start(catalog()).await;
    for _ in 0..3 {
        bot.send(&owner(), &general(), "!count").await;
    }
    bot.send(&owner(), &general(), "!lambda add hey hey {author}").await;
    assert_eq!(bot.ctx.plugins().save_all().await, 0);

    let again = TestBot::builder(catalog())
        .owner(common::OWNER_ID)
        .store(Arc::clone(&bot.store))
        .build()
        .await;
    again.send(&owner(), &general(), "!count").await;
    again.send(&common::alice(), &general(), "hey").await;

    assert_eq!(again.replies(), vec!["4", "hey alice"]);
}

#[tokio::test]
async fn reload_twice_gives_the_same_commands() {
    let bot = TestBot::start(catalog()).await;
    let paths = |bot: &TestBot| {
        bot.ctx
            .plugins()
            .get(builtin::NAME)
            .map(|p| p.commands().paths())
            .unwrap_or_default()
    };
    let before = paths(&bot);
    assert!(before.contains(&"plugin reload".to_string()));

    assert!(bot.ctx.reload_plugin(builtin::NAME).await);
    assert!(bot.ctx.reload_plugin(builtin::NAME).await);

    assert_eq!(paths(&bot), before);
    assert_eq!(bot.ctx.plugins().names(), vec![builtin::NAME, "counter"]);
}

#[tokio::test]
async fn reload_keeps_saved_state() {
    let bot = TestBot::start(catalog()).await;
    bot.send(&owner(), &general(), "!count").await;
    bot.send(&owner(), &general(), "!count").await;
    bot.replies();

    bot.send(&owner(), &general(), "!plugin reload counter").await;
    assert_eq!(bot.replies(), vec!["Reloaded plugin `counter`."]);

    bot.send(&owner(), &general(), "!count").await;
    assert_eq!(bot.replies(), vec!["3"]);
}

#[tokio::test]
async fn unload_is_idempotent() {
    let bot = TestBot::start(catalog()).await;

    bot.send(&owner(), &general(), "!plugin unload counter").await;
    bot.send(&owner(), &general(), "!plugin unload counter").await;
    assert_eq!(
        bot.replies(),
        vec![
            "Plugin `counter` unloaded.",
            "`counter` is not a plugin. See `!plugin`.",
        ]
    );
    assert!(!bot.ctx.plugins().unload("counter").await);

    // Its commands are gone with it.
    bot.send(&owner(), &general(), "!count").await;
    assert!(bot.replies().is_empty());

    bot.send(&owner(), &general(), "!plugin load counter").await;
    bot.send(&owner(), &general(), "!count").await;
    assert_eq!(bot.replies(), vec!["Plugin `counter` loaded.", "1"]);
}

#[tokio::test]
async fn unload_command_saves_before_dropping() {
    let bot = TestBot::start(catalog()).await;
    bot.send(&owner(), &general(), "!count").await;
    bot.send(&owner(), &general(), "!count").await;
    bot.replies();

    bot.send(&owner(), &general(), "!plugin unload counter").await;
    assert_eq!(bot.replies(), vec!["Plugin `counter` unloaded."]);
    assert_eq!(load_typed(bot.store.as_ref(), COUNTER_DOC, 0u64).await.unwrap(), 2);

    bot.send(&owner(), &general(), "!plugin load counter").await;
    bot.send(&owner(), &general(), "!count").await;
    assert_eq!(bot.replies(), vec!["Plugin `counter` loaded.", "3"]);
}

#[tokio::test]
async fn reserved_and_unknown_names_do_not_load() {
    let bot = TestBot::start(catalog()).await;

    bot.send(&owner(), &general(), "!plugin load mathlib").await;
    bot.send(&owner(), &general(), "!plugin load nothing").await;
    bot.send(&owner(), &general(), "!plugin load counter").await;

    assert_eq!(
        bot.replies(),
        vec![
            "Plugin `mathlib` could not be loaded.",
            "Plugin `nothing` could not be loaded.",
            "Plugin `counter` is already loaded.",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn autosave_runs_after_ready() {
    let settings = Settings {
        autosave_interval: Duration::from_secs(10),
        ..Settings::default()
    };
    let bot = TestBot::builder(catalog()).settings(settings).build().await;
    bot.send(&owner(), &general(), "!count").await;

    let saved = || async { load_typed(bot.store.as_ref(), COUNTER_DOC, 0u64).await.unwrap() };
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(saved().await, 0, "autosave must wait for ready");

    let handles = bot.ctx.mark_ready();
    assert!(bot.ctx.mark_ready().is_empty());
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(saved().await, 1);

    bot.ctx.request_shutdown();
    common::join(handles).await;
}
