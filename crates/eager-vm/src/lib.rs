//! Eager instruction VM
//!
//! This crate implements the instruction-type dispatch core of an
//! asynchronous VM that runs device-bound operations against tensor blobs.
//!
//! # Architecture
//!
//! - Every kind of work is an *instruction type*: a stateless behavior bound
//!   at compile time to one stream category, executed in two phases
//!   (`infer`, then `compute`).
//! - Instruction types live in a registry keyed by wire names such as
//!   `"cpu.WriteBlobByCallback"`. The registry is populated once at startup
//!   and read-only afterwards.
//! - Each instruction carries one operand whose concrete shape its type
//!   expects; a mismatch is a wiring bug and aborts.
//! - Streams execute their instructions strictly in submission order.
//!
//! # Modules
//!
//! - `registry`: name -> instruction type catalog
//! - `instruction_type`: the behavior trait and stream bindings
//! - `instruction`: queued messages and live instructions
//! - `operand`: operand payloads
//! - `ofblob`: host accessor handed to blob callbacks
//! - `instructions`: built-in instruction kinds
//! - `stream`: device contexts and sequential executors
//! - `vm`: routing and scheduling front-end
//! - `config`, `logging`: startup configuration and tracing setup

pub mod config;
pub mod error;
pub mod instruction;
pub mod instruction_type;
pub mod instructions;
pub mod logging;
pub mod ofblob;
pub mod operand;
pub mod registry;
pub mod stream;
pub mod vm;

// Re-export main types
pub use config::{StreamConfig, VmConfig};
pub use error::{RegistryError, VmError};
pub use instruction::{Instruction, InstructionMsg, InstructionStatus};
pub use instruction_type::{CpuStreamType, HostStreamType, InstructionType, StreamType};
pub use instructions::{create_instruction_type_registry, global_registry, init_global_registry};
pub use ofblob::OfBlob;
pub use operand::{Operand, OperandKind};
pub use registry::{InstructionTypeDescriptor, InstructionTypeRegistry};
pub use stream::{DeviceCtx, LazyBlobCatalog, Stream};
pub use vm::VirtualMachine;

#[cfg(test)]
mod tests;
