//! Instructions
//!
//! `InstructionMsg` is the owned, queued form produced by the scheduler: a
//! resolved descriptor plus its operand. When a stream picks it up it becomes
//! an `Instruction`, which additionally borrows the stream (and through it the
//! device context) for exactly one execution.

use crate::error::contract_violation;
use crate::operand::Operand;
use crate::registry::InstructionTypeDescriptor;
use crate::stream::{DeviceCtx, Stream};
use std::fmt;
use std::sync::Arc;

/// Queued instruction
#[derive(Debug)]
pub struct InstructionMsg {
    descriptor: Arc<InstructionTypeDescriptor>,
    operand: Option<Operand>,
}

impl InstructionMsg {
    pub fn new(descriptor: Arc<InstructionTypeDescriptor>, operand: impl Into<Operand>) -> Self {
        Self {
            descriptor,
            operand: Some(operand.into()),
        }
    }

    /// Message carrying no operand. Executing it is a contract violation;
    /// this exists for instruction kinds defined elsewhere that are built
    /// incrementally.
    pub fn without_operand(descriptor: Arc<InstructionTypeDescriptor>) -> Self {
        Self {
            descriptor,
            operand: None,
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &Arc<InstructionTypeDescriptor> {
        &self.descriptor
    }

    pub fn operand(&self) -> Option<&Operand> {
        self.operand.as_ref()
    }
}

/// Execution phase of a live instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionStatus {
    Created,
    Inferred,
    Computed,
}

impl fmt::Display for InstructionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstructionStatus::Created => "created",
            InstructionStatus::Inferred => "inferred",
            InstructionStatus::Computed => "computed",
        };
        f.write_str(name)
    }
}

/// Instruction being executed on a stream
pub struct Instruction<'s> {
    msg: InstructionMsg,
    stream: &'s Stream,
    status: InstructionStatus,
}

impl<'s> Instruction<'s> {
    pub fn new(msg: InstructionMsg, stream: &'s Stream) -> Self {
        Self {
            msg,
            stream,
            status: InstructionStatus::Created,
        }
    }

    pub fn instr_msg(&self) -> &InstructionMsg {
        &self.msg
    }

    pub fn name(&self) -> &str {
        self.msg.name()
    }

    pub fn status(&self) -> InstructionStatus {
        self.status
    }

    pub fn stream(&self) -> &'s Stream {
        self.stream
    }

    pub fn device_ctx(&self) -> &'s DeviceCtx {
        self.stream.device_ctx()
    }

    /// The operand this instruction was built with
    ///
    /// # Panics
    /// Panics if the instruction carries no operand.
    #[track_caller]
    pub fn operand(&self) -> &Operand {
        match self.msg.operand() {
            Some(operand) => operand,
            None => contract_violation(format!("instruction '{}' carries no operand", self.name())),
        }
    }

    /// Run the inference phase
    ///
    /// # Panics
    /// Panics unless the instruction is freshly created.
    pub fn infer(&mut self) {
        self.expect_status(InstructionStatus::Created, "infer");
        let descriptor = Arc::clone(self.msg.descriptor());
        descriptor.behavior().infer(self);
        self.status = InstructionStatus::Inferred;
    }

    /// Run the compute phase
    ///
    /// # Panics
    /// Panics unless inference has run.
    pub fn compute(&mut self) {
        self.expect_status(InstructionStatus::Inferred, "compute");
        let descriptor = Arc::clone(self.msg.descriptor());
        descriptor.behavior().compute(self);
        self.status = InstructionStatus::Computed;
    }

    /// Run both phases in order
    pub fn run(&mut self) {
        self.infer();
        self.compute();
    }

    fn expect_status(&self, expected: InstructionStatus, phase: &str) {
        if self.status != expected {
            contract_violation(format!(
                "instruction '{}' cannot {} from status {}",
                self.name(),
                phase,
                self.status
            ));
        }
    }
}

impl fmt::Debug for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("name", &self.name())
            .field("stream", &self.stream.stream_category())
            .field("status", &self.status)
            .finish()
    }
}
