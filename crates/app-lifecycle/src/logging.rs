//! Tracing subscriber setup.

use crate::config::LifecycleConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global `fmt` subscriber filtered by `RUST_LOG` or the
/// configured level.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_tracing(config: &LifecycleConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| e.to_string())?;

    if config.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| e.to_string())?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|e| e.to_string())?;
    }

    tracing::info!(network = %config.network, level = %config.log_level, "Tracing initialized");
    Ok(())
}
