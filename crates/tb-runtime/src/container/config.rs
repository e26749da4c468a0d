//! # Runtime Configuration
//!
//! Everything the binary needs to wire itself, loaded from environment
//! variables and validated before any service is constructed.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TB_TOYYIB_BASE_URL` | `https://toyyibpay.com` | Gateway API base |
//! | `TB_TOYYIB_SECRET_KEY` | — (required) | Merchant secret key |
//! | `TB_TOYYIB_CATEGORY_CODE` | — (required) | Bill category code |
//! | `TB_RETURN_URL` | — (required) | Post-payment landing URL |
//! | `TB_CALLBACK_URL` | — (required) | Gateway webhook URL |
//! | `TB_SERVERS` | — (required) | JSON array of server profiles |
//! | `TB_SESSION_BACKEND` | `store` | `store` or `memory` |
//! | `TB_SWEEP_PERIOD_SECS` | `300` | Expiry sweep tick |
//! | `TB_PENDING_ORDER_MAX_AGE_SECS` | `3600` | Unpaid-order lifetime |
//! | `TB_LEASE_TTL_SECS` | `120` | Per-server lease ownership TTL |
//! | `TB_SSH_TIMEOUT_SECS` | `60` | Remote invocation wall-clock bound |

use shared_types::ServerProfile;
use std::time::Duration;
use tb_payment::{CheckoutConfig, GatewayConfig};
use tb_provisioning::{RetryPolicy, SshConfig};
use thiserror::Error;

/// Configuration errors. Startup aborts on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is present but unusable.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// Which variable.
        var: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The server fleet is empty; nothing could ever be provisioned.
    #[error("server fleet is empty")]
    NoServers,
}

/// Where per-user UI sessions live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionBackend {
    /// Persisted in the state store; survives restarts.
    #[default]
    Store,
    /// Process-local map; cheap, lost on restart.
    Memory,
}

/// Complete runtime configuration.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Payment gateway credentials and endpoint.
    pub gateway: GatewayConfig,
    /// URLs stamped onto every created bill.
    pub checkout: CheckoutConfig,
    /// Remote invocation knobs.
    pub ssh: SshConfig,
    /// The provisionable fleet.
    pub servers: Vec<ServerProfile>,
    /// Session persistence selection.
    pub session_backend: SessionBackend,
    /// Provisioning retry policy.
    pub retry: RetryPolicy,
    /// Expiry sweep tick period.
    pub sweep_period: Duration,
    /// How long a PENDING order may sit unpaid.
    pub pending_order_max_age: Duration,
    /// Per-server lease ownership TTL.
    pub lease_ttl: Duration,
}

impl RuntimeConfig {
    /// Load and validate from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway = GatewayConfig {
            base_url: env_or("TB_TOYYIB_BASE_URL", "https://toyyibpay.com"),
            secret_key: required("TB_TOYYIB_SECRET_KEY")?,
            category_code: required("TB_TOYYIB_CATEGORY_CODE")?,
        };
        let checkout = CheckoutConfig {
            return_url: required_url("TB_RETURN_URL")?,
            callback_url: required_url("TB_CALLBACK_URL")?,
        };

        let servers_raw = required("TB_SERVERS")?;
        let servers: Vec<ServerProfile> =
            serde_json::from_str(&servers_raw).map_err(|e| ConfigError::Invalid {
                var: "TB_SERVERS",
                reason: e.to_string(),
            })?;

        let session_backend = match env_or("TB_SESSION_BACKEND", "store").as_str() {
            "store" => SessionBackend::Store,
            "memory" => SessionBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    var: "TB_SESSION_BACKEND",
                    reason: format!("expected 'store' or 'memory', got '{other}'"),
                })
            }
        };

        let ssh = SshConfig {
            command_timeout: duration_or("TB_SSH_TIMEOUT_SECS", 60)?,
            ..SshConfig::default()
        };

        let config = Self {
            gateway,
            checkout,
            ssh,
            servers,
            session_backend,
            retry: RetryPolicy::default(),
            sweep_period: duration_or("TB_SWEEP_PERIOD_SECS", 300)?,
            pending_order_max_age: duration_or("TB_PENDING_ORDER_MAX_AGE_SECS", 3600)?,
            lease_ttl: duration_or("TB_LEASE_TTL_SECS", 120)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks beyond per-variable parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        for server in &self.servers {
            if server.hostname.is_empty() {
                return Err(ConfigError::Invalid {
                    var: "TB_SERVERS",
                    reason: format!("server {} has an empty hostname", server.server_id),
                });
            }
        }
        if self.pending_order_max_age < Duration::from_secs(60) {
            return Err(ConfigError::Invalid {
                var: "TB_PENDING_ORDER_MAX_AGE_SECS",
                reason: "below 60s, buyers could not finish checkout".into(),
            });
        }
        Ok(())
    }
}

fn env_or(var: &'static str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn required_url(var: &'static str) -> Result<String, ConfigError> {
    let value = required(var)?;
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            reason: "must be an http(s) URL".into(),
        })
    }
}

fn duration_or(var: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
        _ => Ok(Duration::from_secs(default_secs)),
    }
}
