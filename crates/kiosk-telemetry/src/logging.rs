//! Structured logging configuration.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::TelemetryConfig;

/// Initializes logging based on configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Subsequent calls
/// are no-ops, so tests can initialize freely.
pub fn init_logging(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let format = if config.json_logs {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().with_target(true).compact().boxed()
    };

    let initialized = Registry::default().with(filter).with(format).try_init();

    if initialized.is_ok() {
        tracing::info!(
            service = %config.service_name,
            level = %config.log_level,
            json = config.json_logs,
            "Logging initialized"
        );
    }
}
