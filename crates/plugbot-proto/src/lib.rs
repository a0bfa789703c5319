//! # plugbot-proto
//!
//! The leaf layer of plugbot: the inbound message model and the text
//! handling that the command language is built on.
//!
//! ## Features
//!
//! - Quote-aware tokenizer that keeps byte spans into the original text
//! - "Rest of the message" slicing used by content-capturing parameters
//! - Fenced code-block extraction
//! - Documentation reformatting for command descriptions
//!
//! ## Quick Start
//!
//! ```rust
//! use plugbot_proto::token::{tokenize, tail};
//!
//! let tokens = tokenize(r#"!add "two words" rest of it"#);
//! assert_eq!(tokens[1].text, "two words");
//! assert_eq!(tail(r#"!add "two words" rest of it"#, 2), Some("rest of it"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod code;
pub mod doc;
pub mod error;
pub mod message;
pub mod token;

pub use code::extract_code;
pub use doc::reformat_doc;
pub use error::ProtoError;
pub use message::{Channel, Member, Message, User};
pub use token::{Token, split, tail, tokenize};
