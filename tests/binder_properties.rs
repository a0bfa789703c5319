//! Completeness properties of parameter binding.

use plugbot::binder::{BindSource, Invocation, Param, bind};
use plugbot::proto::{Channel, Message, User, tokenize};
use plugbot::transport::MemoryTransport;
use proptest::prelude::*;

/// Bind `params` against `!cmd <words...>`.
fn bind_words(params: &[Param], words: &[String]) -> Invocation {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    runtime.block_on(async {
        let (transport, _events) = MemoryTransport::new(User::new("0", "bot"));
        let content = std::iter::once("!cmd".to_string())
            .chain(words.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        let message = Message::new(
            User::new("1", "alice"),
            Channel::new("c1", "general", "g1"),
            content,
        );
        let tokens = tokenize(&message.content);
        let source = BindSource {
            message: &message,
            transport: transport.as_ref(),
        };
        bind(params, None, &tokens, 1, &source).await
    })
}

fn word() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}"
}

proptest! {
    #[test]
    fn required_params_complete_iff_enough_tokens(
        required in 0usize..5,
        words in prop::collection::vec(word(), 0..8),
    ) {
        let params: Vec<Param> = (0..required).map(|i| Param::required(format!("p{i}"))).collect();
        let invocation = bind_words(&params, &words);
        prop_assert_eq!(invocation.complete, words.len() >= required);
        prop_assert_eq!(invocation.bound, required.min(words.len()));
    }

    #[test]
    fn variadic_alone_is_always_complete(words in prop::collection::vec(word(), 0..8)) {
        let invocation = bind_words(&[Param::variadic("rest")], &words);
        prop_assert!(invocation.complete);
        let rest = invocation.into_args();
        prop_assert_eq!(rest.list("rest").len(), words.len());
    }

    #[test]
    fn optional_params_never_block_completion(
        optional in 0usize..4,
        words in prop::collection::vec(word(), 0..6),
    ) {
        let params: Vec<Param> = (0..optional)
            .map(|i| Param::optional(format!("o{i}"), "default"))
            .collect();
        let invocation = bind_words(&params, &words);
        prop_assert!(invocation.complete);
        prop_assert_eq!(invocation.bound, optional);
    }
}
