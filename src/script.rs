//! Template scripts for operator-defined commands.
//!
//! Scripts are plain text with `{placeholder}` substitutions evaluated
//! against an explicit [`ExecContext`]:
//!
//! - `{name}` substitutes a named binding (`author`, `channel`, `args`, ...)
//! - `{0}`, `{1}`, ... substitute message arguments by position
//! - `{1|fallback}` uses `fallback` when the binding or argument is absent
//! - `{{` and `}}` produce literal braces
//!
//! Nothing is shared between executions: every caller builds its own
//! context and passes it in. Rendering is synchronous and unsandboxed.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while rendering a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("name '{0}' is not defined")]
    Unbound(String),

    #[error("argument {0} was not given")]
    MissingArgument(usize),

    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),

    #[error("unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),

    #[error("empty placeholder at byte {0}")]
    Empty(usize),
}

/// Named bindings and positional arguments visible to one execution.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    bindings: BTreeMap<String, String>,
    args: Vec<String>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named binding.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    /// Builder form of [`bind`](Self::bind).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bind(name, value);
        self
    }

    /// Set the positional arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Render `script` against `ctx`.
pub fn render(script: &str, ctx: &ExecContext) -> Result<String, ScriptError> {
    let mut out = String::with_capacity(script.len());
    let mut chars = script.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, n)| n == '{').is_some() {
                    out.push('{');
                    continue;
                }
                let close = script[i + 1..]
                    .find('}')
                    .ok_or(ScriptError::Unterminated(i))?;
                let end = i + 1 + close;
                out.push_str(&resolve(&script[i + 1..end], ctx, i)?);
                while chars.next_if(|&(j, _)| j <= end).is_some() {}
            }
            '}' => {
                if chars.next_if(|&(_, n)| n == '}').is_none() {
                    return Err(ScriptError::UnmatchedClose(i));
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

fn resolve(body: &str, ctx: &ExecContext, at: usize) -> Result<String, ScriptError> {
    let (key, fallback) = match body.split_once('|') {
        Some((key, fallback)) => (key.trim(), Some(fallback)),
        None => (body.trim(), None),
    };
    if key.is_empty() {
        return Err(ScriptError::Empty(at));
    }

    let found = match key.parse::<usize>() {
        Ok(index) => ctx.arg(index).ok_or(ScriptError::MissingArgument(index)),
        Err(_) => ctx
            .get(key)
            .ok_or_else(|| ScriptError::Unbound(key.to_string())),
    };

    match (found, fallback) {
        (Ok(value), _) => Ok(value.to_string()),
        (Err(_), Some(fallback)) => Ok(fallback.to_string()),
        (Err(e), None) => Err(e),
    }
}
