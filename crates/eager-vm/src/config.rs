//! VM configuration
//!
//! Which streams exist and how logging is set up. Loaded from JSON:
//!
//! ```json
//! {
//!   "streams": [
//!     { "category": "host" },
//!     { "category": "cpu", "device_id": 0 }
//!   ],
//!   "logging": { "directives": "eager_vm=debug" }
//! }
//! ```

use crate::error::VmError;
use crate::logging::LoggingConfig;
use anyhow::Context;
use eager_types::StreamCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One stream to create at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub category: StreamCategory,
    #[serde(default)]
    pub device_id: u32,
}

impl StreamConfig {
    pub fn new(category: StreamCategory, device_id: u32) -> Self {
        Self { category, device_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    pub streams: Vec<StreamConfig>,
    pub logging: LoggingConfig,
}

impl Default for VmConfig {
    /// One host stream and one CPU stream
    fn default() -> Self {
        Self {
            streams: vec![
                StreamConfig::new(StreamCategory::Host, 0),
                StreamConfig::new(StreamCategory::Cpu, 0),
            ],
            logging: LoggingConfig::default(),
        }
    }
}

impl VmConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: VmConfig = serde_json::from_str(json).context("failed to parse VM configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read VM configuration from '{}'", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in '{}'", path.display()))
    }

    /// Streams are selected by category, so each category may appear once.
    pub fn validate(&self) -> Result<(), VmError> {
        if self.streams.is_empty() {
            return Err(VmError::InvalidConfig("no streams configured".to_string()));
        }

        let mut seen = HashSet::new();
        for stream in &self.streams {
            if !seen.insert(stream.category) {
                return Err(VmError::InvalidConfig(format!(
                    "stream category '{}' configured more than once",
                    stream.category
                )));
            }
        }
        Ok(())
    }
}
