//! Data types shared by the eager instruction VM.
//!
//! - `stream`: execution-context categories (host, CPU, accelerators)
//! - `blob`: tensor storage and the re-bindable eager blob handle
//! - `sync`: parking_lot-based shared-state aliases

pub mod blob;
pub mod stream;
pub mod sync;

// Re-exports
pub use blob::{Blob, BlobError, DataType, EagerBlobObject, Shape};
pub use stream::{AcceleratorFamily, StreamCategory, TypeError};
