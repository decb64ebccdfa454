//! Error types for the registry and the executor
//!
//! Only wiring and configuration problems are recoverable. Broken
//! invariants between trusted components (unknown instruction names reaching
//! dispatch, empty or mismatched operands, phase re-entry) go through
//! [`contract_violation`], which logs and panics.

use eager_types::StreamCategory;

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Name already present in the catalog
    #[error("instruction type '{0}' already registered")]
    Duplicate(String),

    /// Name never registered
    #[error("instruction type '{0}' not registered")]
    NotFound(String),
}

/// VM wiring and scheduling errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    /// Instruction handed to a stream of another category
    #[error("instruction '{instruction}' requires a {expected} stream, got a {actual} stream")]
    StreamMismatch {
        instruction: String,
        expected: StreamCategory,
        actual: StreamCategory,
    },

    /// No stream configured for the category an instruction requires
    #[error("no {category} stream configured for instruction '{instruction}'")]
    NoStream {
        instruction: String,
        category: StreamCategory,
    },

    /// Registry failure surfaced through a fallible path
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The process-wide registry was already populated
    #[error("global instruction type registry already initialized")]
    RegistryInitialized,

    /// Invalid VM configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stream worker task could not be joined
    #[error("stream worker failed: {0}")]
    Scheduler(String),
}

/// Report a broken internal invariant and abort the current thread.
#[cold]
#[track_caller]
pub(crate) fn contract_violation(message: String) -> ! {
    tracing::error!("instruction contract violated: {}", message);
    panic!("{}", message);
}
