//! Streams and device contexts
//!
//! A stream is a sequential executor bound to one device context. It runs
//! its queued instructions strictly in submission order; ordering between
//! different streams is somebody else's problem.

use crate::error::VmError;
use crate::instruction::{Instruction, InstructionMsg};
use eager_types::sync::{Mutex, RwLock, Shared};
use eager_types::{Blob, StreamCategory};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Blobs owned by compiled (lazy) graphs, addressable by name
#[derive(Debug, Default)]
pub struct LazyBlobCatalog {
    blobs: RwLock<HashMap<String, Shared<Blob>>>,
}

impl LazyBlobCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish storage under `name`, returning what it replaced
    pub fn insert(&self, name: impl Into<String>, storage: Shared<Blob>) -> Option<Shared<Blob>> {
        self.blobs.write().insert(name.into(), storage)
    }

    pub fn get(&self, name: &str) -> Option<Shared<Blob>> {
        self.blobs.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Shared<Blob>> {
        self.blobs.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

/// Device state an instruction runs against
#[derive(Debug, Clone)]
pub struct DeviceCtx {
    stream_category: StreamCategory,
    device_id: u32,
    lazy_blobs: Arc<LazyBlobCatalog>,
}

impl DeviceCtx {
    pub fn new(stream_category: StreamCategory, device_id: u32, lazy_blobs: Arc<LazyBlobCatalog>) -> Self {
        Self {
            stream_category,
            device_id,
            lazy_blobs,
        }
    }

    pub fn stream_category(&self) -> StreamCategory {
        self.stream_category
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn lazy_blobs(&self) -> &LazyBlobCatalog {
        &self.lazy_blobs
    }
}

/// Sequential instruction executor for one device context
pub struct Stream {
    device_ctx: DeviceCtx,
    pending: Mutex<VecDeque<InstructionMsg>>,
    // Held by whichever caller is draining; separate from `pending` so
    // callbacks can still enqueue.
    executing: Mutex<()>,
    completed: AtomicUsize,
}

impl Stream {
    pub fn new(stream_category: StreamCategory, device_id: u32, lazy_blobs: Arc<LazyBlobCatalog>) -> Self {
        Self {
            device_ctx: DeviceCtx::new(stream_category, device_id, lazy_blobs),
            pending: Mutex::new(VecDeque::new()),
            executing: Mutex::new(()),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn device_ctx(&self) -> &DeviceCtx {
        &self.device_ctx
    }

    pub fn stream_category(&self) -> StreamCategory {
        self.device_ctx.stream_category
    }

    /// Queue an instruction behind everything already submitted
    ///
    /// The instruction's required category is checked here, once, so the
    /// instruction types never have to.
    pub fn enqueue(&self, msg: InstructionMsg) -> Result<(), VmError> {
        let expected = msg.descriptor().stream_category();
        if expected != self.stream_category() {
            return Err(VmError::StreamMismatch {
                instruction: msg.name().to_string(),
                expected,
                actual: self.stream_category(),
            });
        }

        tracing::debug!(
            instruction = msg.name(),
            stream = %self.stream_category(),
            device = self.device_ctx.device_id,
            "enqueued instruction"
        );
        self.pending.lock().push_back(msg);
        Ok(())
    }

    /// Number of instructions waiting to run
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of instructions run to completion on this stream
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Execute queued instructions in submission order until the queue is
    /// empty, returning how many ran in this call.
    ///
    /// Only one caller drains a stream at a time. A concurrent or reentrant
    /// call (for example `schedule` from inside a host callback) returns 0
    /// and leaves the queue to the caller already draining it. The queue
    /// lock is not held while an instruction executes, so host callbacks may
    /// submit follow-up work to the same stream; it runs in this same drain.
    pub fn run_pending(&self) -> usize {
        let mut executed = 0;
        loop {
            let Some(guard) = self.executing.try_lock() else {
                return executed;
            };
            executed += self.drain();
            drop(guard);

            // Work enqueued by a caller that found the guard taken just
            // before it was released would otherwise sit until the next drain.
            if self.pending_len() == 0 {
                return executed;
            }
        }
    }

    fn drain(&self) -> usize {
        let mut executed = 0;
        loop {
            let msg = match self.pending.lock().pop_front() {
                Some(msg) => msg,
                None => break,
            };

            let span = tracing::debug_span!(
                "instruction",
                name = msg.name(),
                stream = %self.stream_category()
            );
            let _enter = span.enter();

            let mut instruction = Instruction::new(msg, self);
            instruction.run();

            executed += 1;
            self.completed.fetch_add(1, Ordering::AcqRel);
        }
        executed
    }

    /// Whether some caller is currently draining this stream
    pub fn is_executing(&self) -> bool {
        self.executing.is_locked()
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("category", &self.stream_category())
            .field("device_id", &self.device_ctx.device_id)
            .field("pending", &self.pending_len())
            .field("completed", &self.completed_count())
            .finish()
    }
}
