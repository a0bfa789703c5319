//! Unified error handling for plugbot.
//!
//! Every layer has its own error enum next to the code that raises it
//! (`RegistryError`, `PluginError`, `StoreError`, `TransportError`,
//! `ScriptError`, `ConfigError`). This module holds the error type that
//! crosses the handler task boundary, with automatic conversions and
//! metric labeling.

use crate::script::ScriptError;
use crate::store::StoreError;
use crate::transport::TransportError;
use thiserror::Error;

// ============================================================================
// Handler Errors (command and hook execution)
// ============================================================================

/// Errors raised inside a scheduled handler or hook task.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Failure inside operator-supplied script code.
    #[error("{0}")]
    Script(#[from] ScriptError),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::Store(_) => "store_error",
            Self::Script(_) => "script_error",
            Self::MissingArgument(_) => "missing_argument",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Whether the error may be shown to a trusted operator in chat.
    ///
    /// Only script failures qualify; everything else stays in the logs.
    #[inline]
    pub fn is_operator_visible(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;
