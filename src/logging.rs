//! # Tracing Module
//!
//! Environment-aware console logging for the router.
//!
//! - Level from `LOG_LEVEL` or `RUST_LOG`, otherwise derived from the
//!   environment name (`production` logs at info, everything else at debug)
//! - TTY-aware ANSI colors
//! - JSON lines instead of the human format when `LOGISTIK_LOG_FORMAT=json`
//!
//! Dropped payloads are emitted on their own target
//! ([`crate::sinks::DROPPED_TARGET`]) so a filter directive such as
//! `logistik::dropped=info` can route or silence them independently.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::detect_environment;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Output format of the console layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let log_level = resolve_log_level(
            std::env::var("LOG_LEVEL").ok(),
            std::env::var("RUST_LOG").ok(),
            &environment,
        );
        let format = LogFormat::from_env_value(std::env::var("LOGISTIK_LOG_FORMAT").ok().as_deref());
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let json_layer = (format == LogFormat::Json).then(|| {
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_filter(EnvFilter::new(&log_level))
        });
        let pretty_layer = (format == LogFormat::Pretty).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level))
        });

        let subscriber = tracing_subscriber::registry()
            .with(json_layer)
            .with(pretty_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                format = ?format,
                ansi_colors = use_ansi,
                "Console logging initialized"
            );
        }
    });
}

/// Pick the filter directive: explicit `LOG_LEVEL`, then `RUST_LOG`, then the
/// environment default
fn resolve_log_level(
    log_level: Option<String>,
    rust_log: Option<String>,
    environment: &str,
) -> String {
    if let Some(level) = log_level.filter(|l| !l.trim().is_empty()) {
        return level.to_lowercase();
    }
    if let Some(directives) = rust_log.filter(|l| !l.trim().is_empty()) {
        return directives;
    }

    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
