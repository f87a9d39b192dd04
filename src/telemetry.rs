//! Tracing setup for the sidecar.
//!
//! Stdout carries the JSON-lines protocol, so every log line goes to stderr.

use std::io;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` wins over `level`; later calls
/// are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let json_lines = json.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .json()
    });
    let plain_lines = (!json).then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_lines)
        .with(plain_lines)
        .try_init();
}
