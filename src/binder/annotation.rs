//! Extraction and coercion directives attached to parameters.

use super::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A coercion function could not interpret its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot interpret {input:?} as {expected}")]
pub struct CoercionError {
    pub input: String,
    pub expected: &'static str,
}

impl CoercionError {
    pub fn new(input: &str, expected: &'static str) -> Self {
        Self {
            input: input.to_string(),
            expected,
        }
    }
}

/// Custom coercion applied to a single token.
pub type Coercion = Arc<dyn Fn(&str) -> Result<Value, CoercionError> + Send + Sync>;

/// How a parameter turns a token into a value.
#[derive(Clone, Default)]
pub enum Annotation {
    /// Bind the token text unchanged.
    #[default]
    None,
    /// Rest of the raw message from this token on.
    RawContent,
    LowerRawContent,
    /// Rest of the display-sanitized message from this token on.
    CleanContent,
    LowerCleanContent,
    /// Resolve a member of the message's group.
    MemberLookup,
    /// Resolve a channel of the message's group.
    ChannelLookup,
    /// Raw rest of the message with code fences stripped.
    CodeExtraction,
    Coerce(Coercion),
}

impl Annotation {
    /// Wrap a coercion function.
    pub fn coerce<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, CoercionError> + Send + Sync + 'static,
    {
        Self::Coerce(Arc::new(f))
    }

    /// Whether the directive reads the message tail rather than one token.
    pub fn captures_content(&self) -> bool {
        matches!(
            self,
            Self::RawContent
                | Self::LowerRawContent
                | Self::CleanContent
                | Self::LowerCleanContent
                | Self::CodeExtraction
        )
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::RawContent => "RawContent",
            Self::LowerRawContent => "LowerRawContent",
            Self::CleanContent => "CleanContent",
            Self::LowerCleanContent => "LowerCleanContent",
            Self::MemberLookup => "MemberLookup",
            Self::ChannelLookup => "ChannelLookup",
            Self::CodeExtraction => "CodeExtraction",
            Self::Coerce(_) => "Coerce(..)",
        };
        f.write_str(name)
    }
}
