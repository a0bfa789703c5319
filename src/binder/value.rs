//! Bound argument values.

use crate::proto::{Channel, Member};
use std::collections::HashMap;
use std::fmt;

/// A value bound to one handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Member(Member),
    Channel(Channel),
    List(Vec<Value>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<&Member> {
        match self {
            Self::Member(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            Self::Channel(c) => Some(c),
            _ => None,
        }
    }

    /// List contents; empty for anything that is not a list.
    pub fn as_list(&self) -> &[Value] {
        match self {
            Self::List(items) => items,
            _ => &[],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Member(m) => f.write_str(m.display_name()),
            Self::Channel(c) => write!(f, "#{}", c.name),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

impl From<Member> for Value {
    fn from(m: Member) -> Self {
        Self::Member(m)
    }
}

impl From<Channel> for Value {
    fn from(c: Channel) -> Self {
        Self::Channel(c)
    }
}

/// Arguments handed to a command handler.
///
/// Positional values keep declaration order; keyword-only values are
/// looked up by name. [`get`](Self::get) searches both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<(String, Value)>,
    keyword: HashMap<String, Value>,
}

impl Args {
    pub fn new(positional: Vec<(String, Value)>, keyword: HashMap<String, Value>) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.positional
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.keyword.get(name))
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.get(name).and_then(Value::as_member)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.get(name).and_then(Value::as_channel)
    }

    /// Items of a variadic parameter; empty when absent.
    pub fn list(&self, name: &str) -> &[Value] {
        self.get(name).map(Value::as_list).unwrap_or(&[])
    }

    /// Positional values in declaration order.
    pub fn positional(&self) -> impl Iterator<Item = &Value> {
        self.positional.iter().map(|(_, v)| v)
    }

    pub fn keyword(&self) -> &HashMap<String, Value> {
        &self.keyword
    }

    /// Total number of bound values.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
