//! Instruction operands
//!
//! Each instruction kind expects exactly one operand shape. Operands are a
//! closed enum for the kinds this crate ships plus a `Custom` escape hatch for
//! kinds registered by embedders. Getting the wrong shape is a dispatch
//! wiring bug, so the `expect_*` accessors abort instead of returning errors.

use crate::error::contract_violation;
use crate::ofblob::OfBlob;
use eager_types::EagerBlobObject;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Host callback allowed to read and write a blob
pub type WriteCallback = Arc<dyn Fn(&mut OfBlob<'_>) + Send + Sync>;

/// Host callback allowed to read a blob
pub type ReadCallback = Arc<dyn Fn(&OfBlob<'_>) + Send + Sync>;

/// Operand of the write-by-callback instruction kinds
#[derive(Clone)]
pub struct WriteBlobArgCbOperand {
    eager_blob_object: Arc<EagerBlobObject>,
    callback: WriteCallback,
}

impl WriteBlobArgCbOperand {
    pub fn new(eager_blob_object: Arc<EagerBlobObject>, callback: WriteCallback) -> Self {
        Self {
            eager_blob_object,
            callback,
        }
    }

    pub fn eager_blob_object(&self) -> &Arc<EagerBlobObject> {
        &self.eager_blob_object
    }

    pub fn callback(&self) -> &WriteCallback {
        &self.callback
    }
}

/// Operand of the read-by-callback instruction kinds
#[derive(Clone)]
pub struct ReadBlobArgCbOperand {
    eager_blob_object: Arc<EagerBlobObject>,
    callback: ReadCallback,
}

impl ReadBlobArgCbOperand {
    pub fn new(eager_blob_object: Arc<EagerBlobObject>, callback: ReadCallback) -> Self {
        Self {
            eager_blob_object,
            callback,
        }
    }

    pub fn eager_blob_object(&self) -> &Arc<EagerBlobObject> {
        &self.eager_blob_object
    }

    pub fn callback(&self) -> &ReadCallback {
        &self.callback
    }
}

/// Operand of the lazy-reference instruction kinds
#[derive(Debug, Clone)]
pub struct LazyReferenceOperand {
    eager_blob_object: Arc<EagerBlobObject>,
    lazy_blob_name: String,
}

impl LazyReferenceOperand {
    pub fn new(eager_blob_object: Arc<EagerBlobObject>, lazy_blob_name: impl Into<String>) -> Self {
        Self {
            eager_blob_object,
            lazy_blob_name: lazy_blob_name.into(),
        }
    }

    pub fn eager_blob_object(&self) -> &Arc<EagerBlobObject> {
        &self.eager_blob_object
    }

    pub fn lazy_blob_name(&self) -> &str {
        &self.lazy_blob_name
    }
}

/// Tag of an operand's concrete shape, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    WriteBlobArgCb,
    ReadBlobArgCb,
    LazyReference,
    Custom,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandKind::WriteBlobArgCb => "WriteBlobArgCb",
            OperandKind::ReadBlobArgCb => "ReadBlobArgCb",
            OperandKind::LazyReference => "LazyReference",
            OperandKind::Custom => "Custom",
        };
        f.write_str(name)
    }
}

/// Argument payload of one instruction invocation
pub enum Operand {
    WriteBlobArgCb(WriteBlobArgCbOperand),
    ReadBlobArgCb(ReadBlobArgCbOperand),
    LazyReference(LazyReferenceOperand),
    /// Payload of an instruction kind defined outside this crate
    Custom(Box<dyn Any + Send + Sync>),
}

impl Operand {
    /// Wrap an embedder-defined payload
    pub fn custom<T: Any + Send + Sync>(payload: T) -> Self {
        Operand::Custom(Box::new(payload))
    }

    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::WriteBlobArgCb(_) => OperandKind::WriteBlobArgCb,
            Operand::ReadBlobArgCb(_) => OperandKind::ReadBlobArgCb,
            Operand::LazyReference(_) => OperandKind::LazyReference,
            Operand::Custom(_) => OperandKind::Custom,
        }
    }

    /// # Panics
    /// Panics if this is not a `WriteBlobArgCb` operand.
    #[track_caller]
    pub fn expect_write_blob_arg_cb(&self, instruction: &str) -> &WriteBlobArgCbOperand {
        match self {
            Operand::WriteBlobArgCb(operand) => operand,
            other => mismatch(instruction, OperandKind::WriteBlobArgCb, other.kind()),
        }
    }

    /// # Panics
    /// Panics if this is not a `ReadBlobArgCb` operand.
    #[track_caller]
    pub fn expect_read_blob_arg_cb(&self, instruction: &str) -> &ReadBlobArgCbOperand {
        match self {
            Operand::ReadBlobArgCb(operand) => operand,
            other => mismatch(instruction, OperandKind::ReadBlobArgCb, other.kind()),
        }
    }

    /// # Panics
    /// Panics if this is not a `LazyReference` operand.
    #[track_caller]
    pub fn expect_lazy_reference(&self, instruction: &str) -> &LazyReferenceOperand {
        match self {
            Operand::LazyReference(operand) => operand,
            other => mismatch(instruction, OperandKind::LazyReference, other.kind()),
        }
    }

    /// Downcast a `Custom` payload to `T`
    ///
    /// # Panics
    /// Panics if this is not a `Custom` operand or the payload is not a `T`.
    #[track_caller]
    pub fn expect_custom<T: Any>(&self, instruction: &str) -> &T {
        match self {
            Operand::Custom(payload) => match payload.downcast_ref::<T>() {
                Some(value) => value,
                None => contract_violation(format!(
                    "instruction '{}' expects a Custom<{}> operand, got a Custom operand of another type",
                    instruction,
                    type_name::<T>()
                )),
            },
            other => contract_violation(format!(
                "instruction '{}' expects a Custom<{}> operand, got {}",
                instruction,
                type_name::<T>(),
                other.kind()
            )),
        }
    }
}

#[cold]
#[track_caller]
fn mismatch(instruction: &str, expected: OperandKind, actual: OperandKind) -> ! {
    contract_violation(format!(
        "instruction '{}' expects a {} operand, got {}",
        instruction, expected, actual
    ))
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::WriteBlobArgCb(operand) => f
                .debug_struct("WriteBlobArgCb")
                .field("blob", &operand.eager_blob_object.name())
                .finish_non_exhaustive(),
            Operand::ReadBlobArgCb(operand) => f
                .debug_struct("ReadBlobArgCb")
                .field("blob", &operand.eager_blob_object.name())
                .finish_non_exhaustive(),
            Operand::LazyReference(operand) => f
                .debug_struct("LazyReference")
                .field("blob", &operand.eager_blob_object.name())
                .field("lazy_blob_name", &operand.lazy_blob_name)
                .finish(),
            Operand::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<WriteBlobArgCbOperand> for Operand {
    fn from(operand: WriteBlobArgCbOperand) -> Self {
        Operand::WriteBlobArgCb(operand)
    }
}

impl From<ReadBlobArgCbOperand> for Operand {
    fn from(operand: ReadBlobArgCbOperand) -> Self {
        Operand::ReadBlobArgCb(operand)
    }
}

impl From<LazyReferenceOperand> for Operand {
    fn from(operand: LazyReferenceOperand) -> Self {
        Operand::LazyReference(operand)
    }
}
