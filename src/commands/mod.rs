//! Command definitions.
//!
//! A [`Command`] pairs a name and an explicit parameter table with an async
//! handler. Commands are grouped per plugin in a [`CommandSet`], which owns
//! the command tree (top-level commands and their sub-commands).

pub mod help;
mod registry;

pub use registry::{CommandSet, RegistryError};

use crate::binder::{Args, Param, Validator};
use crate::bot::Context;
use crate::error::HandlerResult;
use crate::proto::{Message, reformat_doc};
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Type-erased async command handler.
pub type Handler = Arc<dyn Fn(Context, Message, Args) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

const UNDOCUMENTED: &str = "Undocumented.";

pub struct Command {
    name: String,
    usage: Option<String>,
    description: Option<String>,
    hidden: bool,
    owner_only: bool,
    error: Option<String>,
    validator: Option<Validator>,
    params: Vec<Param>,
    handler: Handler,
    /// Space-separated path of the parent command, set at registration.
    parent: Option<String>,
    children: Vec<Command>,
}

impl Command {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Context, Message, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            usage: None,
            description: None,
            hidden: false,
            owner_only: false,
            error: None,
            validator: None,
            params: Vec::new(),
            handler: Arc::new(move |ctx, msg, args| Box::pin(handler(ctx, msg, args))),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Usage template following the command name, e.g. `[command]`.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Documentation text, reformatted into the description.
    ///
    /// A line ending in `  /` keeps its line break, a blank line starts a
    /// new paragraph, and other lines are joined with spaces.
    pub fn doc(mut self, doc: &str) -> Self {
        self.description = Some(reformat_doc(doc));
        self
    }

    /// Description used verbatim.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    /// Fixed text sent instead of usage when binding fails.
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Predicate applied to tokens captured by a variadic parameter.
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage_template(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or(UNDOCUMENTED)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_owner_only(&self) -> bool {
        self.owner_only
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn validator_fn(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn children(&self) -> &[Command] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&Command> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Full space-separated name path, e.g. `plugin reload`.
    pub fn path(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent} {}", self.name),
            None => self.name.clone(),
        }
    }

    /// Start the handler. The returned future owns everything it needs.
    pub fn invoke(&self, ctx: Context, message: Message, args: Args) -> BoxFuture<'static, HandlerResult> {
        (self.handler)(ctx, message, args)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("params", &self.params)
            .field("hidden", &self.hidden)
            .field("owner_only", &self.owner_only)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// Build a handler that receives a shared piece of state.
///
/// Plugins keep their state in an `Arc` captured by every handler; this
/// saves the clone-into-async-block boilerplate.
pub fn with_state<S, F, Fut>(
    state: &Arc<S>,
    f: F,
) -> impl Fn(Context, Message, Args) -> Fut + Send + Sync + 'static
where
    S: Send + Sync + 'static + ?Sized,
    F: Fn(Arc<S>, Context, Message, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let state = Arc::clone(state);
    move |ctx, msg, args| f(Arc::clone(&state), ctx, msg, args)
}
