//! Lazy reference
//!
//! Makes an eager blob object alias a blob owned by a compiled graph. The
//! graph side publishes its blobs in the device context's lazy blob catalog;
//! this instruction looks one up by name and rebinds the eager handle to it,
//! so later instructions on the eager handle read and write graph memory.

use crate::error::contract_violation;
use crate::instruction::Instruction;
use crate::instruction_type::{CpuStreamType, InstructionType, StreamType};
use eager_types::StreamCategory;
use std::marker::PhantomData;

pub struct LazyReference<S: StreamType> {
    _stream: PhantomData<fn() -> S>,
}

impl<S: StreamType> Default for LazyReference<S> {
    fn default() -> Self {
        Self { _stream: PhantomData }
    }
}

impl<S: StreamType> InstructionType for LazyReference<S> {
    fn stream_category(&self) -> StreamCategory {
        S::CATEGORY
    }

    fn infer(&self, _instruction: &Instruction<'_>) {}

    fn compute(&self, instruction: &Instruction<'_>) {
        let operand = instruction.operand().expect_lazy_reference(instruction.name());
        let device_ctx = instruction.device_ctx();

        let Some(lazy_blob) = device_ctx.lazy_blobs().get(operand.lazy_blob_name()) else {
            contract_violation(format!(
                "instruction '{}' references lazy blob '{}' which no graph has published",
                instruction.name(),
                operand.lazy_blob_name()
            ));
        };

        tracing::debug!(
            stream = S::NAME,
            eager_blob = operand.eager_blob_object().name(),
            lazy_blob = operand.lazy_blob_name(),
            "rebinding eager blob to lazy storage"
        );
        operand.eager_blob_object().rebind(lazy_blob);
    }
}

pub type CpuLazyReference = LazyReference<CpuStreamType>;
