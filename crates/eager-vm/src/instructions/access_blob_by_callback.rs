//! Blob access by host callback
//!
//! These instruction kinds hand a blob to host code at a fixed point in the
//! stream. The callback runs synchronously on the stream's thread while the
//! blob's storage lock is held, and the accessor it receives is dropped
//! together with that lock before `compute` returns.

use crate::instruction::Instruction;
use crate::instruction_type::{CpuStreamType, InstructionType, StreamType};
use crate::ofblob::OfBlob;
use eager_types::StreamCategory;
use std::marker::PhantomData;

/// Let a host callback read and write a blob
pub struct WriteBlobByCallback<S: StreamType> {
    _stream: PhantomData<fn() -> S>,
}

impl<S: StreamType> Default for WriteBlobByCallback<S> {
    fn default() -> Self {
        Self { _stream: PhantomData }
    }
}

impl<S: StreamType> InstructionType for WriteBlobByCallback<S> {
    fn stream_category(&self) -> StreamCategory {
        S::CATEGORY
    }

    // The blob already exists; nothing to resolve.
    fn infer(&self, _instruction: &Instruction<'_>) {}

    fn compute(&self, instruction: &Instruction<'_>) {
        let operand = instruction.operand().expect_write_blob_arg_cb(instruction.name());
        let device_ctx = instruction.device_ctx();

        tracing::trace!(
            stream = S::NAME,
            blob = operand.eager_blob_object().name(),
            "running write callback"
        );
        let storage = operand.eager_blob_object().blob();
        let mut blob = storage.write();
        let mut ofblob = OfBlob::new(device_ctx, &mut blob);
        (operand.callback())(&mut ofblob);
    }
}

/// Let a host callback read a blob
pub struct ReadBlobByCallback<S: StreamType> {
    _stream: PhantomData<fn() -> S>,
}

impl<S: StreamType> Default for ReadBlobByCallback<S> {
    fn default() -> Self {
        Self { _stream: PhantomData }
    }
}

impl<S: StreamType> InstructionType for ReadBlobByCallback<S> {
    fn stream_category(&self) -> StreamCategory {
        S::CATEGORY
    }

    fn infer(&self, _instruction: &Instruction<'_>) {}

    fn compute(&self, instruction: &Instruction<'_>) {
        let operand = instruction.operand().expect_read_blob_arg_cb(instruction.name());
        let device_ctx = instruction.device_ctx();

        tracing::trace!(
            stream = S::NAME,
            blob = operand.eager_blob_object().name(),
            "running read callback"
        );
        let storage = operand.eager_blob_object().blob();
        let blob = storage.read();
        let ofblob = OfBlob::new_read_only(device_ctx, &blob);
        (operand.callback())(&ofblob);
    }
}

pub type CpuWriteBlobByCallback = WriteBlobByCallback<CpuStreamType>;
pub type CpuReadBlobByCallback = ReadBlobByCallback<CpuStreamType>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{InstructionMsg, InstructionStatus};
    use crate::instruction_type::HostStreamType;
    use crate::operand::{LazyReferenceOperand, Operand, ReadBlobArgCbOperand, WriteBlobArgCbOperand};
    use crate::registry::InstructionTypeRegistry;
    use crate::stream::{LazyBlobCatalog, Stream};
    use eager_types::{Blob, EagerBlobObject, Shape};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn f32_blob(name: &str, values: &[f32]) -> Arc<EagerBlobObject> {
        let blob = Blob::from_f32s(Shape::new(vec![values.len()]), values).unwrap();
        Arc::new(EagerBlobObject::new(name, blob))
    }

    fn cpu_stream() -> Stream {
        Stream::new(StreamCategory::Cpu, 0, Arc::new(LazyBlobCatalog::new()))
    }

    #[test]
    fn test_stream_binding_follows_type_parameter() {
        assert_eq!(
            WriteBlobByCallback::<HostStreamType>::default().stream_category(),
            StreamCategory::Host
        );
        assert_eq!(CpuWriteBlobByCallback::default().stream_category(), StreamCategory::Cpu);
        assert_eq!(CpuReadBlobByCallback::default().stream_category(), StreamCategory::Cpu);
    }

    #[test]
    fn test_write_callback_invoked_once_and_mutates_blob() {
        let mut registry = InstructionTypeRegistry::new();
        let descriptor = registry.register::<CpuWriteBlobByCallback>("cpu.WriteBlobByCallback");

        let object = f32_blob("x", &[0.0, 0.0, 0.0]);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_cb = Arc::clone(&calls);
        let operand = WriteBlobArgCbOperand::new(
            Arc::clone(&object),
            Arc::new(move |ofblob: &mut OfBlob<'_>| {
                calls_in_cb.fetch_add(1, Ordering::SeqCst);
                assert_eq!(ofblob.device_ctx().stream_category(), StreamCategory::Cpu);
                ofblob.write_f32s(&[1.0, 2.0, 3.0]).unwrap();
            }),
        );

        let stream = cpu_stream();
        let mut instruction = Instruction::new(InstructionMsg::new(descriptor, operand), &stream);
        instruction.run();

        assert_eq!(instruction.status(), InstructionStatus::Computed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(object.snapshot().to_f32s().unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_storage_lock_released_after_compute() {
        let mut registry = InstructionTypeRegistry::new();
        let descriptor = registry.register::<CpuWriteBlobByCallback>("cpu.WriteBlobByCallback");

        let object = f32_blob("x", &[5.0]);
        let operand = WriteBlobArgCbOperand::new(Arc::clone(&object), Arc::new(|_: &mut OfBlob<'_>| {}));

        let stream = cpu_stream();
        Instruction::new(InstructionMsg::new(descriptor, operand), &stream).run();

        // The accessor held the write lock; it must be free again.
        let storage = object.blob();
        assert!(storage.try_write().is_some());
    }

    #[test]
    fn test_infer_leaves_blob_untouched() {
        let mut registry = InstructionTypeRegistry::new();
        let descriptor = registry.register::<CpuWriteBlobByCallback>("cpu.WriteBlobByCallback");

        let object = f32_blob("x", &[4.0, 2.0]);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_cb = Arc::clone(&calls);
        let operand = WriteBlobArgCbOperand::new(
            Arc::clone(&object),
            Arc::new(move |ofblob: &mut OfBlob<'_>| {
                calls_in_cb.fetch_add(1, Ordering::SeqCst);
                ofblob.mut_bytes().fill(0xff);
            }),
        );

        let stream = cpu_stream();
        let before = object.snapshot();
        let mut instruction = Instruction::new(InstructionMsg::new(descriptor, operand), &stream);
        instruction.infer();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(object.snapshot(), before);
        assert_eq!(instruction.operand().kind(), crate::operand::OperandKind::WriteBlobArgCb);
    }

    #[test]
    fn test_read_callback_sees_contents() {
        let mut registry = InstructionTypeRegistry::new();
        let descriptor = registry.register::<CpuReadBlobByCallback>("cpu.ReadBlobByCallback");

        let object = f32_blob("y", &[3.5, -1.0]);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_in_cb = Arc::clone(&seen);
        let operand = ReadBlobArgCbOperand::new(
            Arc::clone(&object),
            Arc::new(move |ofblob: &OfBlob<'_>| {
                seen_in_cb.lock().extend(ofblob.read_f32s().unwrap());
            }),
        );

        let stream = cpu_stream();
        Instruction::new(InstructionMsg::new(descriptor, operand), &stream).run();

        assert_eq!(*seen.lock(), vec![3.5, -1.0]);
    }

    #[test]
    #[should_panic(expected = "instruction 'cpu.WriteBlobByCallback' carries no operand")]
    fn test_missing_operand_fails_before_callback() {
        let mut registry = InstructionTypeRegistry::new();
        let descriptor = registry.register::<CpuWriteBlobByCallback>("cpu.WriteBlobByCallback");

        let stream = cpu_stream();
        Instruction::new(InstructionMsg::without_operand(descriptor), &stream).run();
    }

    #[test]
    #[should_panic(expected = "expects a WriteBlobArgCb operand, got LazyReference")]
    fn test_wrong_operand_fails_at_downcast() {
        let mut registry = InstructionTypeRegistry::new();
        let descriptor = registry.register::<CpuWriteBlobByCallback>("cpu.WriteBlobByCallback");

        let operand: Operand = LazyReferenceOperand::new(f32_blob("x", &[0.0]), "graph.x").into();
        let stream = cpu_stream();
        Instruction::new(InstructionMsg::new(descriptor, operand), &stream).run();
    }
}
