//! Tracing subscriber setup
//!
//! The VM only emits `tracing` events; installing a subscriber is left to the
//! embedding process. `init_tracing` is the default way to do that.

use serde::{Deserialize, Serialize};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Logging section of the VM configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives (e.g. `eager_vm=debug,info`). Falls back to
    /// `RUST_LOG`, then to `default_directive`.
    pub directives: Option<String>,
    pub default_directive: String,
    /// Show event targets (module paths)
    pub include_targets: bool,
    /// ANSI colour codes; disable for CI logs
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    fn resolve_filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Some(directives) = &self.directives {
            EnvFilter::try_new(directives).map_err(|err| LoggingError::InvalidFilter(err.to_string()))
        } else {
            match EnvFilter::try_from_default_env() {
                Ok(filter) => Ok(filter),
                Err(_) => EnvFilter::try_new(&self.default_directive)
                    .map_err(|err| LoggingError::InvalidFilter(err.to_string())),
            }
        }
    }
}

/// Errors raised while installing the subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid tracing directive: {0}")]
    InvalidFilter(String),

    /// Usually because a subscriber is already installed
    #[error("failed to install global tracing subscriber: {0}")]
    SubscriberInit(#[from] TryInitError),
}

/// Install a fmt subscriber as the process-wide default
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = config.resolve_filter()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_targets)
        .with_ansi(config.ansi)
        .finish()
        .try_init()?;
    Ok(())
}
