//! Virtual machine front-end
//!
//! Receives instructions by registry name, routes each to the stream of the
//! category its instruction type requires, and drives the streams. Each
//! stream executes sequentially; `schedule_concurrently` lets different
//! streams run at the same time.

use crate::config::VmConfig;
use crate::error::VmError;
use crate::instruction::InstructionMsg;
use crate::instructions::global_registry;
use crate::operand::Operand;
use crate::registry::InstructionTypeRegistry;
use crate::stream::{LazyBlobCatalog, Stream};
use eager_types::StreamCategory;
use std::sync::Arc;

pub struct VirtualMachine {
    registry: Arc<InstructionTypeRegistry>,
    streams: Vec<Arc<Stream>>,
    lazy_blobs: Arc<LazyBlobCatalog>,
}

impl VirtualMachine {
    /// Create a VM with the streams named in `config`
    pub fn new(config: &VmConfig, registry: Arc<InstructionTypeRegistry>) -> Result<Self, VmError> {
        config.validate()?;

        let lazy_blobs = Arc::new(LazyBlobCatalog::new());
        let streams = config
            .streams
            .iter()
            .map(|stream| {
                Arc::new(Stream::new(
                    stream.category,
                    stream.device_id,
                    Arc::clone(&lazy_blobs),
                ))
            })
            .collect::<Vec<_>>();

        tracing::info!(
            streams = streams.len(),
            instruction_types = registry.len(),
            "virtual machine created"
        );

        Ok(Self {
            registry,
            streams,
            lazy_blobs,
        })
    }

    /// Create a VM over the process-wide registry
    pub fn with_global_registry(config: &VmConfig) -> Result<Self, VmError> {
        Self::new(config, Arc::clone(global_registry()))
    }

    pub fn registry(&self) -> &Arc<InstructionTypeRegistry> {
        &self.registry
    }

    pub fn streams(&self) -> &[Arc<Stream>] {
        &self.streams
    }

    pub fn stream(&self, category: StreamCategory) -> Option<&Arc<Stream>> {
        self.streams.iter().find(|s| s.stream_category() == category)
    }

    /// Catalog through which compiled graphs publish their blobs
    pub fn lazy_blobs(&self) -> &Arc<LazyBlobCatalog> {
        &self.lazy_blobs
    }

    /// Resolve `name` and queue it with `operand`
    ///
    /// # Panics
    /// Panics if `name` is not registered: instruction names come from a
    /// trusted producer, so an unknown one means the producer and this
    /// runtime were built against different catalogs.
    pub fn receive(&self, name: &str, operand: impl Into<Operand>) -> Result<(), VmError> {
        let descriptor = self.registry.lookup(name);
        self.receive_msg(InstructionMsg::new(descriptor, operand))
    }

    /// Queue an already-resolved instruction
    pub fn receive_msg(&self, msg: InstructionMsg) -> Result<(), VmError> {
        let category = msg.descriptor().stream_category();
        let stream = self.stream(category).ok_or_else(|| VmError::NoStream {
            instruction: msg.name().to_string(),
            category,
        })?;
        stream.enqueue(msg)
    }

    /// Number of instructions waiting across all streams
    pub fn pending_len(&self) -> usize {
        self.streams.iter().map(|s| s.pending_len()).sum()
    }

    /// Drain every stream on the calling thread, one stream after another
    pub fn schedule(&self) -> usize {
        self.streams.iter().map(|stream| stream.run_pending()).sum()
    }

    /// Drain every stream on its own blocking task
    ///
    /// Order within a stream is preserved; streams make progress
    /// independently. A panic inside an instruction is re-raised here
    /// once every stream has stopped.
    pub async fn schedule_concurrently(&self) -> Result<usize, VmError> {
        let handles = self
            .streams
            .iter()
            .map(|stream| {
                let stream = Arc::clone(stream);
                tokio::task::spawn_blocking(move || stream.run_pending())
            })
            .collect::<Vec<_>>();

        let mut executed = 0;
        let mut panic_payload = None;
        for handle in handles {
            match handle.await {
                Ok(count) => executed += count,
                Err(err) if err.is_panic() => {
                    if panic_payload.is_none() {
                        panic_payload = Some(err.into_panic());
                    }
                }
                Err(err) => return Err(VmError::Scheduler(err.to_string())),
            }
        }

        if let Some(payload) = panic_payload {
            std::panic::resume_unwind(payload);
        }
        Ok(executed)
    }
}

impl std::fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("streams", &self.streams)
            .field("instruction_types", &self.registry.len())
            .finish()
    }
}
