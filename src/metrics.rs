//! Prometheus metrics collection for plugbot.
//!
//! Exposed on the optional `/metrics` endpoint (see [`crate::http`]).
//!
//! - `bot_messages_dispatched_total` - Inbound messages that reached dispatch
//! - `bot_command_total{command}` - Handler runs by command path
//! - `bot_command_duration_seconds{command}` - Handler latency histogram
//! - `bot_command_errors_total{command,error}` - Failed handlers and hooks
//! - `bot_binding_failures_total{command}` - Invocations with missing arguments
//! - `bot_plugin_operations_total{op,result}` - Load/unload/reload/save outcomes
//! - `bot_plugins_loaded` - Currently loaded plugins (gauge)

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Inbound messages that were tokenized and offered to plugins.
pub static MESSAGES_DISPATCHED: OnceLock<IntCounter> = OnceLock::new();

/// Commands run, by full command path.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Handler latency by command path.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Handler failures by command path and error code.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Invocations rejected because a required argument was missing.
pub static BINDING_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Plugin lifecycle operations by kind and outcome.
pub static PLUGIN_OPERATIONS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

pub static PLUGINS_LOADED: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(MESSAGES_DISPATCHED, IntCounter::new("bot_messages_dispatched_total", "Inbound messages dispatched"));
    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("bot_command_total", "Commands run by path"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("bot_command_duration_seconds", "Command handler latency by path")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("bot_command_errors_total", "Command errors by path"), &["command", "error"]));
    register!(BINDING_FAILURES, IntCounterVec::new(Opts::new("bot_binding_failures_total", "Invocations with missing arguments"), &["command"]));
    register!(PLUGIN_OPERATIONS, IntCounterVec::new(Opts::new("bot_plugin_operations_total", "Plugin lifecycle operations"), &["op", "result"]));
    register!(PLUGINS_LOADED, IntGauge::new("bot_plugins_loaded", "Currently loaded plugins"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

fn get_counter_vec(metric: &OnceLock<IntCounterVec>) -> Option<&IntCounterVec> {
    metric.get()
}

fn get_histogram_vec(metric: &OnceLock<HistogramVec>) -> Option<&HistogramVec> {
    metric.get()
}

#[inline]
pub fn record_message_dispatched() {
    if let Some(c) = MESSAGES_DISPATCHED.get() {
        c.inc();
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = get_counter_vec(&COMMAND_COUNTER) {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = get_histogram_vec(&COMMAND_LATENCY) {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = get_counter_vec(&COMMAND_ERRORS) {
        c.with_label_values(&[command, error]).inc();
    }
}

#[inline]
pub fn record_binding_failure(command: &str) {
    if let Some(c) = get_counter_vec(&BINDING_FAILURES) {
        c.with_label_values(&[command]).inc();
    }
}

/// Record a plugin lifecycle operation (`load`, `unload`, `reload`, `save`).
#[inline]
pub fn record_plugin_op(op: &str, ok: bool) {
    if let Some(c) = get_counter_vec(&PLUGIN_OPERATIONS) {
        let result = if ok { "ok" } else { "failed" };
        c.with_label_values(&[op, result]).inc();
    }
}

#[inline]
pub fn set_plugins_loaded(count: usize) {
    if let Some(g) = PLUGINS_LOADED.get() {
        g.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_command("ping", 0.001);
        record_binding_failure("plugin load");
        record_plugin_op("reload", true);
        set_plugins_loaded(2);

        let output = gather_metrics();
        assert!(output.contains("bot_command_total"));
        assert!(output.contains("bot_binding_failures_total"));
        assert!(output.contains("bot_plugins_loaded"));
    }
}
