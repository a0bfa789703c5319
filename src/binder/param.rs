//! Parameter descriptors.
//!
//! A command declares its parameters explicitly, in order, with a builder.
//! The two infrastructure parameters (context and message) are implicit and
//! never appear here.

use super::{Annotation, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    OptionalWithDefault,
    VariadicCapture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Positional,
    KeywordOnly,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub pass: PassKind,
    pub annotation: Annotation,
    pub default: Option<Value>,
}

impl Param {
    fn new(name: impl Into<String>, kind: ParamKind, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            pass: PassKind::Positional,
            annotation: Annotation::None,
            default,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Required, None)
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self::new(name, ParamKind::OptionalWithDefault, Some(default.into()))
    }

    /// Captures all remaining tokens into a list.
    pub fn variadic(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VariadicCapture, None)
    }

    pub fn keyword_only(mut self) -> Self {
        self.pass = PassKind::KeywordOnly;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotation = annotation;
        self
    }

    #[inline]
    pub fn is_variadic(&self) -> bool {
        self.kind == ParamKind::VariadicCapture
    }

    /// Keyword-only without a default: a variadic before it must leave it a token.
    #[inline]
    pub(crate) fn reserves_token(&self) -> bool {
        self.pass == PassKind::KeywordOnly && self.default.is_none() && !self.is_variadic()
    }

    /// Usage fragment: `<name>`, `[name]`, or `[name ...]`.
    pub fn usage(&self) -> String {
        match self.kind {
            ParamKind::Required => format!("<{}>", self.name),
            ParamKind::OptionalWithDefault => format!("[{}]", self.name),
            ParamKind::VariadicCapture => format!("[{} ...]", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_fragments() {
        assert_eq!(Param::required("name").usage(), "<name>");
        assert_eq!(Param::optional("name", Value::None).usage(), "[name]");
        assert_eq!(Param::variadic("words").usage(), "[words ...]");
    }

    #[test]
    fn only_keyword_required_params_reserve_tokens() {
        assert!(Param::required("a").keyword_only().reserves_token());
        assert!(!Param::required("a").reserves_token());
        assert!(!Param::optional("a", 1i64).keyword_only().reserves_token());
    }
}
