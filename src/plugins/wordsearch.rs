//! Word guessing game.
//!
//! `wordsearch` asks the host for a secret word in a private message, then
//! everyone in the channel guesses by sending a word ending in `!`. Each
//! wrong guess is answered with whether the secret sorts before or after
//! it, plus the longest prefix guessed correctly so far.
//! `wordsearch auto [count]` picks the word from a built-in list instead.

use super::{PluginDef, PluginError, PluginFactory};
use crate::binder::{Annotation, Args, Param, coerce};
use crate::bot::Context;
use crate::commands::{Command, with_state};
use crate::error::HandlerResult;
use crate::proto::{Channel, Message, User};
use crate::store::Store;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const NAME: &str = "wordsearch";

pub const TUTORIAL: &str = "Write any word ending with `!` to guess the word!";

/// How long the host has to choose a word.
pub const WORD_TIMEOUT: Duration = Duration::from_secs(30);

/// A game with no guesses for this long is cancelled.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const MAX_WORD_LEN: usize = 32;
const MAX_AUTO_WORDS: i64 = 5;

const WORDS: &[&str] = &[
    "anchor", "badger", "cactus", "dragon", "ember", "falcon", "garden", "harbor", "island",
    "jungle", "kettle", "lantern", "meadow", "nectar", "orbit", "pepper", "quartz", "rocket",
    "saddle", "thunder", "umbrella", "velvet", "walnut", "yonder", "zephyr",
];

/// Channels with a running game.
type Active = Mutex<HashSet<String>>;

pub struct Factory;

#[async_trait]
impl PluginFactory for Factory {
    async fn build(&self, _store: Arc<dyn Store>) -> Result<PluginDef, PluginError> {
        let active: Arc<Active> = Arc::new(Mutex::new(HashSet::new()));

        let mut def = PluginDef::new();
        def.command(
            Command::new("wordsearch", with_state(&active, start))
                .usage("[auto <count>]")
                .doc(
                    "Start a wordsearch! Enter *any word* ending with `!` to guess the word!\n\
                     `auto` automatically sets a word for you. Default is one word, or enter up \
                     to 5 with `count`.  /\n\
                     **Example**: `wordsearch auto 4`",
                ),
        )?
        .subcommand(
            "wordsearch",
            Command::new("auto", with_state(&active, auto))
                .doc("Start an automatic wordsearch.")
                .param(Param::optional("count", 1i64).annotate(Annotation::coerce(coerce::int))),
        )?;
        Ok(def)
    }
}

/// A word is `a-z`, `æ`, `ø`, `å` and digits only, shorter than 32
/// characters. Case is ignored.
pub fn valid_word(text: &str) -> bool {
    let text = text.to_lowercase();
    !text.is_empty()
        && text.chars().count() < MAX_WORD_LEN
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, 'æ' | 'ø' | 'å'))
}

/// A guess is a valid word followed by `!`.
pub fn valid_guess(text: &str) -> bool {
    text.strip_suffix('!').is_some_and(valid_word)
}

/// Extend `hint` with the prefix of `guess` that matches `word`.
///
/// The hint only grows from guesses that already start with it.
pub fn update_hint(hint: &str, guess: &str, word: &str) -> String {
    if !guess.starts_with(hint) {
        return hint.to_string();
    }
    guess
        .chars()
        .zip(word.chars())
        .take_while(|(g, w)| g == w)
        .map(|(g, _)| g)
        .collect()
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!(" The word starts with `{hint}`.")
    }
}

fn auto_word(count: i64) -> String {
    let mut rng = rand::thread_rng();
    (0..count.clamp(1, MAX_AUTO_WORDS))
        .filter_map(|_| WORDS.choose(&mut rng))
        .copied()
        .collect()
}

async fn start(active: Arc<Active>, ctx: Context, message: Message, _args: Args) -> HandlerResult {
    run_game(active, ctx, message.channel.clone(), message.author.clone(), None).await
}

async fn auto(active: Arc<Active>, ctx: Context, message: Message, args: Args) -> HandlerResult {
    let word = auto_word(args.int("count").unwrap_or(1));
    debug!(word = %word, "Picked wordsearch word");
    run_game(active, ctx, message.channel.clone(), message.author.clone(), Some(word)).await
}

async fn run_game(
    active: Arc<Active>,
    ctx: Context,
    channel: Channel,
    host: User,
    word: Option<String>,
) -> HandlerResult {
    let transport = Arc::clone(ctx.transport());

    if !active.lock().insert(channel.id.clone()) {
        transport
            .send_message(&channel, "A wordsearch is already active in this channel!")
            .await?;
        return Ok(());
    }

    let result = play(&ctx, &channel, &host, word).await;
    active.lock().remove(&channel.id);
    result
}

async fn play(ctx: &Context, channel: &Channel, host: &User, word: Option<String>) -> HandlerResult {
    let transport = ctx.transport();

    let word = match word {
        Some(word) => {
            transport
                .send_message(channel, &format!("{} made me set a word! {TUTORIAL}", host.mention()))
                .await?;
            word
        }
        None => {
            transport
                .send_message(channel, &format!("Waiting for {} to choose a word!", host.mention()))
                .await?;
            let private = Channel::private(host.id.clone(), host.name.clone());
            transport
                .send_message(
                    &private,
                    "**Please enter a word!**\nThe word should be **maximum 32 characters long** \
                     and may **only** contain *letters a-z, æ, ø, å* and *numbers*.",
                )
                .await?;

            let host_id = host.id.clone();
            let reply = transport
                .wait_for_message(
                    WORD_TIMEOUT,
                    Box::new(move |m| {
                        m.author.id == host_id && m.channel.private && valid_word(&m.content)
                    }),
                )
                .await;
            let Some(reply) = reply else {
                transport
                    .send_message(
                        channel,
                        &format!("{} failed to enter a valid word.", host.mention()),
                    )
                    .await?;
                return Ok(());
            };

            let word = reply.content.to_lowercase();
            transport
                .send_message(&private, &format!("Set the word to `{word}`."))
                .await?;
            transport
                .send_message(
                    channel,
                    &format!("{} has entered a word! {TUTORIAL}", host.mention()),
                )
                .await?;
            word
        }
    };

    let mut tries = 0u32;
    let mut hint = String::new();
    loop {
        let channel_id = channel.id.clone();
        let reply = transport
            .wait_for_message(
                IDLE_TIMEOUT,
                Box::new(move |m| m.channel.id == channel_id && valid_guess(&m.content)),
            )
            .await;
        let Some(reply) = reply else {
            transport
                .send_message(
                    channel,
                    &format!(
                        "**The wordsearch was cancelled after 30 minutes of inactivity.**\n\
                         The word was `{word}`."
                    ),
                )
                .await?;
            return Ok(());
        };

        let lowered = reply.content.to_lowercase();
        let guess = lowered.trim_end_matches('!');
        tries += 1;
        hint = update_hint(&hint, guess, &word);

        let who = reply.author.mention();
        if guess.starts_with(word.as_str()) {
            transport
                .send_message(
                    channel,
                    &format!("{who} ***got it*** after **{tries}** tries! The word was `{word}`."),
                )
                .await?;
            return Ok(());
        }

        let position = if guess > word.as_str() { "after" } else { "before" };
        transport
            .send_message(
                channel,
                &format!(
                    "{who} `{guess}` is *{position}* in the dictionary.{}",
                    format_hint(&hint)
                ),
            )
            .await?;
    }
}
