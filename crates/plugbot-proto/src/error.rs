//! Error types for the text layer.
//!
//! Tokenizing in lenient mode never fails; these errors surface only from
//! the strict entry points so callers can report malformed quoting.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtoError`].
pub type Result<T, E = ProtoError> = std::result::Result<T, E>;

/// Errors raised while splitting message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtoError {
    /// A quote was opened but never closed.
    #[error("no closing quotation for {quote} opened at byte {position}")]
    UnbalancedQuote {
        /// The quote character that was left open.
        quote: char,
        /// Byte offset of the opening quote.
        position: usize,
    },

    /// The text ended right after an escape character.
    #[error("no escaped character after backslash at byte {position}")]
    TrailingEscape {
        /// Byte offset of the dangling backslash.
        position: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbalanced_quote_message_names_the_quote() {
        let err = ProtoError::UnbalancedQuote {
            quote: '"',
            position: 4,
        };
        assert_eq!(err.to_string(), "no closing quotation for \" opened at byte 4");
    }
}
