//! # Tollbooth Telemetry
//!
//! Structured logging setup shared by every Tollbooth binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tollbooth_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//!
//!     // Application runs here; the guard is dropped on exit.
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TB_SERVICE_NAME` | `tollbooth` | Service name stamped on log lines |
//! | `TB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `TB_JSON_LOGS` | `false` (true in containers) | JSON formatted output |
//! | `TB_CONSOLE_OUTPUT` | `true` | Human-readable console output |

mod config;

pub use config::TelemetryConfig;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install global subscriber: {0}")]
    Install(String),
}

/// Initialize structured logging.
///
/// Returns a guard that must be held for the lifetime of the application.
/// Initializing twice (e.g. from multiple tests) fails with
/// [`TelemetryError::Install`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else if config.console_output {
        registry.with(fmt::layer().with_target(true)).try_init()
    } else {
        registry.try_init()
    };

    result.map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _private: () })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _private: (),
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
