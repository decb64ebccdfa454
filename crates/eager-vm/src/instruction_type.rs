//! Instruction type abstraction
//!
//! An instruction type is the stateless behavior behind one registry name.
//! It is bound to a single stream category and executes in two phases:
//! `infer` resolves whatever must be known before running (shapes, sizes),
//! `compute` performs the side effect. Both phases are always invoked, in
//! that order, even when `infer` has nothing to do.
//!
//! The stream binding is a type parameter rather than a runtime field, so a
//! behavior written once can be registered for several categories:
//!
//! ```rust,ignore
//! registry.register::<WriteBlobByCallback<HostStreamType>>("WriteBlobByCallback");
//! registry.register::<WriteBlobByCallback<CpuStreamType>>("cpu.WriteBlobByCallback");
//! ```

use crate::instruction::Instruction;
use eager_types::{AcceleratorFamily, StreamCategory};

/// Behavior of one registered instruction kind
pub trait InstructionType: Send + Sync + 'static {
    /// Category of the only streams allowed to run this kind
    fn stream_category(&self) -> StreamCategory;

    /// Pre-execution inference. Must not perform the side effect.
    fn infer(&self, instruction: &Instruction<'_>);

    /// Perform the side effect
    fn compute(&self, instruction: &Instruction<'_>);
}

/// Compile-time stream binding
pub trait StreamType: Send + Sync + 'static {
    const CATEGORY: StreamCategory;
    /// Short name used in logs, matching `CATEGORY.as_str()`
    const NAME: &'static str;
}

/// Host-control stream
#[derive(Debug, Default, Clone, Copy)]
pub struct HostStreamType;

impl StreamType for HostStreamType {
    const CATEGORY: StreamCategory = StreamCategory::Host;
    const NAME: &'static str = "host";
}

/// CPU device stream
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuStreamType;

impl StreamType for CpuStreamType {
    const CATEGORY: StreamCategory = StreamCategory::Cpu;
    const NAME: &'static str = "cpu";
}

/// CUDA device stream
#[derive(Debug, Default, Clone, Copy)]
pub struct CudaStreamType;

impl StreamType for CudaStreamType {
    const CATEGORY: StreamCategory = StreamCategory::Accelerator(AcceleratorFamily::Cuda);
    const NAME: &'static str = "cuda";
}

/// Metal device stream
#[derive(Debug, Default, Clone, Copy)]
pub struct MetalStreamType;

impl StreamType for MetalStreamType {
    const CATEGORY: StreamCategory = StreamCategory::Accelerator(AcceleratorFamily::Metal);
    const NAME: &'static str = "metal";
}
