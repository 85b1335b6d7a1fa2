//! Lifecycle configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Default number of rounds to wait for a transaction to confirm.
pub const DEFAULT_MAX_WAIT_ROUNDS: u64 = 4;

/// Confirmation wait settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Rounds to wait before reporting a timeout. Zero never polls.
    pub max_rounds_to_wait: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            max_rounds_to_wait: DEFAULT_MAX_WAIT_ROUNDS,
        }
    }
}

/// Configuration of the lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Network name, used in log fields (sandnet, testnet, mainnet)
    pub network: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Confirmation wait settings
    pub confirmation: ConfirmationConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            network: "sandnet".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl LifecycleConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `APP_NETWORK`: Network name (default: sandnet)
    /// - `APP_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `APP_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `APP_MAX_WAIT_ROUNDS`: Confirmation round budget (default: 4)
    pub fn from_env() -> Self {
        Self {
            network: env::var("APP_NETWORK").unwrap_or_else(|_| "sandnet".to_string()),

            log_level: env::var("APP_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("APP_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            confirmation: ConfirmationConfig {
                max_rounds_to_wait: env::var("APP_MAX_WAIT_ROUNDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_WAIT_ROUNDS),
            },
        }
    }
}
