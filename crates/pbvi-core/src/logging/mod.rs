//! Structured logging for the planner.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSON lines for scripted solver runs
//!
//! # Usage
//!
//! ```ignore
//! use pbvi_core::logging::{init_logging, LogConfig, Stage, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! pbvi_core::log_event!(INFO, event_names::SOLVE_STARTED, Stage::Solve,
//!     "starting backups", horizon = 20);
//! ```
//!
//! # Design Notes
//!
//! - stdout is reserved for command payloads (JSON summaries, policies)
//! - stderr receives all log output (human or JSONL)
//! - the library only emits events; installing a subscriber is the
//!   binary's job

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Stage};

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. Full `RUST_LOG`
/// directives are honored unless `PBVI_LOG` is set, in which case
/// `config.level` applies to everything. Calling it a second time is a no-op.
pub fn init_logging(config: &LogConfig) {
    let level_pinned = std::env::var_os(config::LOG_LEVEL_ENV_VAR).is_some();
    let filter = if level_pinned {
        EnvFilter::new(config.level.as_directive())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()))
    };

    let result = match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let trace = config.level == LogLevel::Trace;
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(config.is_verbose())
                .with_file(trace)
                .with_line_number(trace)
                .with_ansi(use_ansi);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
    };

    if result.is_err() {
        tracing::debug!("logging already initialized; keeping existing subscriber");
    }
}

/// Format a probability vector compactly for log lines.
pub fn format_probs(probs: &[f64]) -> String {
    let parts: Vec<String> = probs.iter().map(|p| format!("{p:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

/// Convenience macro for structured event logging.
///
/// The event name becomes the tracing target, so it can be filtered with
/// `RUST_LOG=solve.iteration=debug`.
///
/// Usage:
/// ```ignore
/// log_event!(INFO, event_names::SOLVE_STARTED, Stage::Solve, "starting backups");
/// log_event!(DEBUG, event_names::SOLVE_ITERATION, Stage::Solve, "sweep done",
///     iteration = 3, alpha_vectors = 12);
/// ```
#[macro_export]
macro_rules! log_event {
    (INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    (DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    (WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    (ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            target: $event,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}
