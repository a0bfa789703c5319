//! Quote-aware tokenizer for command messages.
//!
//! Tokens are separated by whitespace. Single or double quotes group a
//! run of text (including whitespace) into one token; the quotes are
//! removed from [`Token::text`] but stay inside the token's span. A
//! backslash escapes the next character outside quotes, and `"` or `\`
//! inside double quotes.
//!
//! [`tokenize`] never fails: text with unbalanced quotes or a dangling
//! escape is split on whitespace only, with no quote processing at all.

use crate::error::{ProtoError, Result};
use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

/// A single token and where it came from in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token text with quotes and escapes resolved.
    pub text: String,
    /// Byte offset of the first character of the token.
    pub start: usize,
    /// Byte offset one past the last character of the token.
    pub end: usize,
}

impl Token {
    /// Byte span of the token in the original text.
    #[inline]
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The token exactly as written, quotes and escapes included.
    #[inline]
    pub fn raw<'a>(&self, input: &'a str) -> &'a str {
        &input[self.span()]
    }
}

/// Split `input` into tokens, falling back to plain whitespace splitting
/// when the quoting is malformed.
pub fn tokenize(input: &str) -> Vec<Token> {
    tokenize_strict(input).unwrap_or_else(|_| split_plain(input))
}

/// Split `input` into tokens, reporting malformed quoting as an error.
pub fn tokenize_strict(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    loop {
        while chars.peek().is_some_and(|&(_, c)| c.is_whitespace()) {
            chars.next();
        }
        let Some(&(start, _)) = chars.peek() else {
            break;
        };

        let mut text = String::new();
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            end = i + c.len_utf8();
            match c {
                '\\' => {
                    let (j, escaped) = chars
                        .next()
                        .ok_or(ProtoError::TrailingEscape { position: i })?;
                    end = j + escaped.len_utf8();
                    text.push(escaped);
                }
                '"' | '\'' => end = read_quoted(&mut chars, c, i, &mut text)?,
                _ => text.push(c),
            }
        }
        tokens.push(Token { text, start, end });
    }

    Ok(tokens)
}

/// Consume a quoted run up to and including the closing quote.
///
/// Returns the byte offset just past the closing quote.
fn read_quoted(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    open: usize,
    text: &mut String,
) -> Result<usize> {
    while let Some((i, c)) = chars.next() {
        if c == quote {
            return Ok(i + c.len_utf8());
        }
        if c == '\\' && quote == '"' {
            match chars.peek() {
                Some(&(_, next)) if next == '"' || next == '\\' => {
                    chars.next();
                    text.push(next);
                    continue;
                }
                _ => {}
            }
        }
        text.push(c);
    }
    Err(ProtoError::UnbalancedQuote {
        quote,
        position: open,
    })
}

fn split_plain(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start = None;

    for (i, c) in input.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push(Token {
                    text: input[s..i].to_string(),
                    start: s,
                    end: i,
                });
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: input[s..].to_string(),
            start: s,
            end: input.len(),
        });
    }

    tokens
}

/// Split `input` into token strings.
pub fn split(input: &str) -> Vec<String> {
    tokenize(input).into_iter().map(|t| t.text).collect()
}

/// The original text starting at the `skip`th token, untouched.
///
/// Returns `None` when the text has `skip` tokens or fewer.
///
/// # Examples
///
/// ```
/// use plugbot_proto::token::tail;
///
/// assert_eq!(tail("!game Half  Life 3", 1), Some("Half  Life 3"));
/// assert_eq!(tail("!game", 1), None);
/// ```
pub fn tail(input: &str, skip: usize) -> Option<&str> {
    tokenize(input).get(skip).map(|t| &input[t.start..])
}
