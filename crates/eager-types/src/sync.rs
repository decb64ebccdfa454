//! Unified synchronization types for blob storage and runtime tables.
//!
//! parking_lot locks do not poison, so a panicking host callback does not
//! leave every later access to the same blob returning an error.

pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use std::sync::Arc;

/// Alias for the common pattern Arc<RwLock<T>>
pub type Shared<T> = Arc<RwLock<T>>;

/// Helper to create Shared<T> easily
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}
