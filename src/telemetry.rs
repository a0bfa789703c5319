//! Telemetry utilities for command timing and tracing spans.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for a spawned command handler or hook.
    pub fn command(name: &str, author: &str, channel: &str) -> Span {
        info_span!("command", name = %name, author = %author, channel = %channel)
    }

    /// Span for a plugin lifecycle operation.
    pub fn plugin(op: &str, name: &str) -> Span {
        info_span!("plugin", op = %op, name = %name)
    }
}
