//! Stream categories
//!
//! A category names the kind of execution context an instruction runs under.
//! It carries no behavior: the executor only compares categories to decide
//! which stream an instruction belongs to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors raised when parsing type tags from external input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Unknown stream category name
    #[error("unknown stream category: '{0}'")]
    UnknownStreamCategory(String),

    /// Unknown data type name
    #[error("unknown data type: '{0}'")]
    UnknownDataType(String),
}

/// Accelerator families with their own device-context flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AcceleratorFamily {
    Cuda,
    Metal,
}

impl AcceleratorFamily {
    pub const fn as_str(self) -> &'static str {
        match self {
            AcceleratorFamily::Cuda => "cuda",
            AcceleratorFamily::Metal => "metal",
        }
    }
}

/// Execution-context category of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StreamCategory {
    /// Host-control stream (no device memory semantics)
    Host,
    /// CPU device stream
    Cpu,
    /// Accelerator device stream
    Accelerator(AcceleratorFamily),
}

impl StreamCategory {
    /// Every category the runtime knows about, in a stable order
    pub const ALL: [StreamCategory; 4] = [
        StreamCategory::Host,
        StreamCategory::Cpu,
        StreamCategory::Accelerator(AcceleratorFamily::Cuda),
        StreamCategory::Accelerator(AcceleratorFamily::Metal),
    ];

    /// Lowercase tag used in configuration files
    pub const fn as_str(self) -> &'static str {
        match self {
            StreamCategory::Host => "host",
            StreamCategory::Cpu => "cpu",
            StreamCategory::Accelerator(family) => family.as_str(),
        }
    }

    /// Prefix used for category-qualified registry keys.
    ///
    /// Host-level instruction kinds are registered under bare names, so the
    /// host category has no prefix.
    pub const fn registry_prefix(self) -> Option<&'static str> {
        match self {
            StreamCategory::Host => None,
            other => Some(other.as_str()),
        }
    }

    /// Build the registry key for a logical instruction name
    ///
    /// `Cpu` + `"WriteBlobByCallback"` gives `"cpu.WriteBlobByCallback"`,
    /// `Host` + `"WriteBlobByCallback"` gives `"WriteBlobByCallback"`.
    pub fn qualified_name(self, logical: &str) -> String {
        match self.registry_prefix() {
            Some(prefix) => format!("{}.{}", prefix, logical),
            None => logical.to_string(),
        }
    }

    /// Whether streams of this category own device memory
    pub const fn is_device(self) -> bool {
        !matches!(self, StreamCategory::Host)
    }
}

impl fmt::Display for StreamCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamCategory {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(StreamCategory::Host),
            "cpu" => Ok(StreamCategory::Cpu),
            "cuda" => Ok(StreamCategory::Accelerator(AcceleratorFamily::Cuda)),
            "metal" => Ok(StreamCategory::Accelerator(AcceleratorFamily::Metal)),
            _ => Err(TypeError::UnknownStreamCategory(s.to_string())),
        }
    }
}

impl From<StreamCategory> for String {
    fn from(category: StreamCategory) -> Self {
        category.as_str().to_string()
    }
}

impl TryFrom<String> for StreamCategory {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
