//! Parameter binding.
//!
//! Turns the tokens that follow a resolved command into the values its
//! handler receives. Parameters are walked in declaration order with a
//! token cursor; each parameter's [`Annotation`] decides how a token (or
//! the rest of the message from that token on) becomes a [`Value`].
//!
//! A token that cannot be interpreted yields "no value". That falls back
//! to the parameter's default when it has one; otherwise binding stops and
//! the [`Invocation`] is incomplete. Inside a variadic capture such tokens
//! are just dropped.

mod annotation;
pub mod coerce;
mod param;
mod value;

pub use annotation::{Annotation, Coercion, CoercionError};
pub use param::{Param, ParamKind, PassKind};
pub use value::{Args, Value};

use crate::proto::{Message, Token, extract_code, tail};
use crate::transport::Transport;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::debug;

/// Predicate over raw tokens captured by a variadic parameter.
pub type Validator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Result of one binding attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub positional: Vec<(String, Value)>,
    pub keyword: HashMap<String, Value>,
    /// Every declared parameter received a value.
    pub complete: bool,
    /// Number of parameters bound before binding stopped.
    pub bound: usize,
}

impl Invocation {
    fn push(&mut self, param: &Param, value: Value) {
        match param.pass {
            PassKind::Positional => self.positional.push((param.name.clone(), value)),
            PassKind::KeywordOnly => {
                self.keyword.insert(param.name.clone(), value);
            }
        }
        self.bound += 1;
    }

    pub fn into_args(self) -> Args {
        Args::new(self.positional, self.keyword)
    }
}

/// Where the tokens came from, for the content-capturing directives.
pub struct BindSource<'a> {
    pub message: &'a Message,
    pub transport: &'a dyn Transport,
}

/// Bind `params` against `tokens[start..]`.
///
/// `tokens` is the full token list of `source.message.content`, so token
/// spans and indexes line up with the message text.
pub async fn bind(
    params: &[Param],
    validator: Option<&Validator>,
    tokens: &[Token],
    start: usize,
    source: &BindSource<'_>,
) -> Invocation {
    let mut invocation = Invocation::default();
    let mut cursor = start.min(tokens.len());

    for (i, param) in params.iter().enumerate() {
        if param.is_variadic() {
            let reserved = params[i + 1..].iter().filter(|p| p.reserves_token()).count();
            let end = tokens.len().saturating_sub(reserved).max(cursor);

            let mut items = Vec::with_capacity(end - cursor);
            for index in cursor..end {
                let token = &tokens[index];
                if validator.is_some_and(|accept| !accept(&token.text)) {
                    debug!(param = %param.name, token = %token.text, "Variadic token rejected");
                    continue;
                }
                if let Some(value) = resolve(&param.annotation, tokens, index, source).await {
                    items.push(value);
                }
            }
            cursor = end;
            invocation.push(param, Value::List(items));
            continue;
        }

        if cursor >= tokens.len() {
            match &param.default {
                Some(default) => {
                    invocation.push(param, default.clone());
                    continue;
                }
                None => return invocation,
            }
        }

        let value = resolve(&param.annotation, tokens, cursor, source).await;
        cursor += 1;
        match (value, &param.default) {
            (Some(value), _) => invocation.push(param, value),
            (None, Some(default)) => invocation.push(param, default.clone()),
            (None, None) => {
                debug!(param = %param.name, "Token did not coerce, binding incomplete");
                return invocation;
            }
        }
    }

    invocation.complete = true;
    invocation
}

/// Apply `annotation` to the token at `index`. `None` means "no value".
async fn resolve(
    annotation: &Annotation,
    tokens: &[Token],
    index: usize,
    source: &BindSource<'_>,
) -> Option<Value> {
    let token = &tokens[index];
    let message = source.message;
    let raw = || message.content.get(token.start..);
    let clean = || tail(&message.clean_content, index);

    match annotation {
        Annotation::None => Some(Value::Str(token.text.clone())),
        Annotation::RawContent => raw().map(Value::from),
        Annotation::LowerRawContent => raw().map(|s| Value::Str(s.to_lowercase())),
        Annotation::CleanContent => clean().map(Value::from),
        Annotation::LowerCleanContent => clean().map(|s| Value::Str(s.to_lowercase())),
        Annotation::CodeExtraction => raw().map(|s| Value::from(extract_code(s))),
        Annotation::MemberLookup => source
            .transport
            .find_member(message.group(), &token.text)
            .await
            .map(Value::Member),
        Annotation::ChannelLookup => source
            .transport
            .find_channel(message.group(), &token.text)
            .await
            .map(Value::Channel),
        Annotation::Coerce(f) => match catch_unwind(AssertUnwindSafe(|| f(&token.text))) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                debug!(error = %e, "Coercion failed");
                None
            }
            Err(_) => {
                debug!(token = %token.text, "Coercion panicked");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{Channel, Member, User, tokenize};
    use crate::transport::MemoryTransport;

    struct Fixture {
        transport: Arc<MemoryTransport>,
        channel: Channel,
    }

    impl Fixture {
        fn new() -> Self {
            let (transport, _rx) = MemoryTransport::new(User::new("0", "bot"));
            let channel = Channel::new("c1", "general", "g1");
            transport.add_channel(channel.clone());
            transport.add_channel(Channel::new("c2", "dev", "g1"));
            transport.add_member(Member::new(User::new("u1", "alice"), "g1"));
            Self { transport, channel }
        }

        fn message(&self, content: &str) -> Message {
            Message::new(User::new("u1", "alice"), self.channel.clone(), content)
        }

        async fn bind(&self, params: &[Param], message: &Message, start: usize) -> Invocation {
            let tokens = tokenize(&message.content);
            let source = BindSource {
                message,
                transport: self.transport.as_ref(),
            };
            bind(params, None, &tokens, start, &source).await
        }
    }

    #[tokio::test]
    async fn binds_required_positionals() {
        let fx = Fixture::new();
        let msg = fx.message("!add hello print(1)");
        let params = [
            Param::required("trigger"),
            Param::required("code").annotate(Annotation::RawContent),
        ];
        let inv = fx.bind(&params, &msg, 1).await;
        assert!(inv.complete);
        let args = inv.into_args();
        assert_eq!(args.str("trigger"), Some("hello"));
        assert_eq!(args.str("code"), Some("print(1)"));
    }

    #[tokio::test]
    async fn missing_token_without_default_is_incomplete() {
        let fx = Fixture::new();
        let msg = fx.message("!add hello");
        let params = [Param::required("trigger"), Param::required("code")];
        let inv = fx.bind(&params, &msg, 1).await;
        assert!(!inv.complete);
        assert_eq!(inv.bound, 1);
    }

    #[tokio::test]
    async fn defaults_fill_missing_and_failed_tokens() {
        let fx = Fixture::new();
        let params = [
            Param::optional("count", 5i64).annotate(Annotation::coerce(coerce::int)),
            Param::optional("label", "none"),
        ];

        let inv = fx.bind(&params, &fx.message("!roll abc"), 1).await;
        assert!(inv.complete);
        let args = inv.into_args();
        assert_eq!(args.int("count"), Some(5));
        assert_eq!(args.str("label"), Some("none"));
    }

    #[tokio::test]
    async fn failed_coercion_without_default_stops() {
        let fx = Fixture::new();
        let params = [Param::required("n").annotate(Annotation::coerce(coerce::int))];
        assert!(!fx.bind(&params, &fx.message("!sq x"), 1).await.complete);
        assert!(fx.bind(&params, &fx.message("!sq 3"), 1).await.complete);
    }

    #[tokio::test]
    async fn panicking_coercion_is_no_value() {
        let fx = Fixture::new();
        let params = [Param::optional("n", 0i64).annotate(Annotation::coerce(|_| panic!("boom")))];
        let inv = fx.bind(&params, &fx.message("!x 1"), 1).await;
        assert!(inv.complete);
        assert_eq!(inv.into_args().int("n"), Some(0));
    }

    #[tokio::test]
    async fn extra_tokens_are_ignored() {
        let fx = Fixture::new();
        let params = [Param::required("name")];
        let inv = fx.bind(&params, &fx.message("!x a b c"), 1).await;
        assert!(inv.complete);
        assert_eq!(inv.positional.len(), 1);
    }

    #[tokio::test]
    async fn variadic_captures_rest_and_drops_failures() {
        let fx = Fixture::new();
        let params = [Param::variadic("nums").annotate(Annotation::coerce(coerce::int))];
        let inv = fx.bind(&params, &fx.message("!sum 1 two 3"), 1).await;
        assert!(inv.complete);
        assert_eq!(
            inv.into_args().list("nums"),
            &[Value::Int(1), Value::Int(3)]
        );
    }

    #[tokio::test]
    async fn empty_variadic_is_complete() {
        let fx = Fixture::new();
        let params = [Param::variadic("words")];
        let inv = fx.bind(&params, &fx.message("!game"), 1).await;
        assert!(inv.complete);
        assert!(inv.into_args().list("words").is_empty());
    }

    #[tokio::test]
    async fn variadic_reserves_tokens_for_keyword_only_params() {
        let fx = Fixture::new();
        let params = [
            Param::variadic("words"),
            Param::required("target").keyword_only(),
            Param::optional("flag", false).keyword_only(),
        ];
        let inv = fx.bind(&params, &fx.message("!say a b c dest"), 1).await;
        assert!(inv.complete);
        let args = inv.into_args();
        assert_eq!(args.list("words"), &[Value::from("a"), "b".into(), "c".into()]);
        assert_eq!(args.keyword().get("target"), Some(&Value::from("dest")));
        assert_eq!(args.get("flag"), Some(&Value::Bool(false)));
    }

    #[tokio::test]
    async fn validator_filters_variadic_tokens() {
        let fx = Fixture::new();
        let msg = fx.message("!tag ok BAD fine");
        let tokens = tokenize(&msg.content);
        let source = BindSource {
            message: &msg,
            transport: fx.transport.as_ref(),
        };
        let lowercase: Validator = Arc::new(|s| s.chars().all(|c| c.is_ascii_lowercase()));
        let inv = bind(&[Param::variadic("tags")], Some(&lowercase), &tokens, 1, &source).await;
        assert_eq!(inv.into_args().list("tags"), &[Value::from("ok"), "fine".into()]);
    }

    #[tokio::test]
    async fn content_directives_read_the_message_tail() {
        let fx = Fixture::new();
        let msg = fx
            .message("!say Hello  <@u1> there")
            .with_clean_content("!say Hello  @alice there");

        let raw = [Param::required("text").annotate(Annotation::RawContent)];
        let inv = fx.bind(&raw, &msg, 1).await;
        assert_eq!(inv.into_args().str("text"), Some("Hello  <@u1> there"));

        let lower = [Param::required("text").annotate(Annotation::LowerCleanContent)];
        let inv = fx.bind(&lower, &msg, 1).await;
        assert_eq!(inv.into_args().str("text"), Some("hello  @alice there"));
    }

    #[tokio::test]
    async fn code_extraction_strips_fences() {
        let fx = Fixture::new();
        let msg = fx.message("!eval ```py\n1 + 2\n```");
        let params = [Param::required("code").annotate(Annotation::CodeExtraction)];
        let inv = fx.bind(&params, &msg, 1).await;
        assert_eq!(inv.into_args().str("code"), Some("1 + 2"));
    }

    #[tokio::test]
    async fn lookups_resolve_within_the_group() {
        let fx = Fixture::new();
        let params = [
            Param::required("who").annotate(Annotation::MemberLookup),
            Param::optional("where", Value::None).annotate(Annotation::ChannelLookup),
        ];

        let inv = fx.bind(&params, &fx.message("!poke alice #dev"), 1).await;
        assert!(inv.complete);
        let args = inv.into_args();
        assert_eq!(args.member("who").map(|m| m.user.id.as_str()), Some("u1"));
        assert_eq!(args.channel("where").map(|c| c.id.as_str()), Some("c2"));

        let inv = fx.bind(&params, &fx.message("!poke mallory"), 1).await;
        assert!(!inv.complete);
    }
}
