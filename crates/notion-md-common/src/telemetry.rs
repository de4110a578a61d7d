//! Tracing setup for the binary.
//!
//! `RUST_LOG` takes precedence. Otherwise the level is `info`, or `debug`
//! when verbose output is requested.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub console_level: Level,
}

impl TelemetryConfig {
    pub fn new(verbose: bool) -> Self {
        let console_level = if verbose { Level::DEBUG } else { Level::INFO };
        Self { console_level }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(config: TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry().with(console_layer).init();

    tracing::debug!(level = %config.console_level, "tracing initialized");
}
