//! Built-in instruction types
//!
//! This module provides the instruction kinds shipped with the VM and the
//! single function that enumerates them into a registry:
//! - Blob access: host callbacks reading or writing a blob
//! - Lazy reference: aliasing graph-owned blobs from eager handles
//!
//! The registry names below are a wire contract with whatever serializes
//! instruction streams. Renaming one breaks previously produced streams.

pub mod access_blob_by_callback;
pub mod lazy_reference;

use crate::error::{contract_violation, VmError};
use crate::instruction_type::HostStreamType;
use crate::registry::InstructionTypeRegistry;
use access_blob_by_callback::{CpuReadBlobByCallback, CpuWriteBlobByCallback, ReadBlobByCallback, WriteBlobByCallback};
use lazy_reference::CpuLazyReference;
use once_cell::sync::OnceCell;
use std::cell::Cell;
use std::sync::Arc;

pub const WRITE_BLOB_BY_CALLBACK: &str = "WriteBlobByCallback";
pub const CPU_WRITE_BLOB_BY_CALLBACK: &str = "cpu.WriteBlobByCallback";
pub const READ_BLOB_BY_CALLBACK: &str = "ReadBlobByCallback";
pub const CPU_READ_BLOB_BY_CALLBACK: &str = "cpu.ReadBlobByCallback";
pub const CPU_LAZY_REFERENCE: &str = "cpu.LazyReference";

/// Register every built-in instruction kind
pub fn register_builtin_instruction_types(registry: &mut InstructionTypeRegistry) {
    // ========================================================================
    // Blob access by callback
    // ========================================================================

    registry.register::<WriteBlobByCallback<HostStreamType>>(WRITE_BLOB_BY_CALLBACK);
    registry.register::<CpuWriteBlobByCallback>(CPU_WRITE_BLOB_BY_CALLBACK);
    registry.register::<ReadBlobByCallback<HostStreamType>>(READ_BLOB_BY_CALLBACK);
    registry.register::<CpuReadBlobByCallback>(CPU_READ_BLOB_BY_CALLBACK);

    // ========================================================================
    // Lazy reference
    // ========================================================================

    registry.register::<CpuLazyReference>(CPU_LAZY_REFERENCE);
}

/// Create and populate the instruction type registry
pub fn create_instruction_type_registry() -> InstructionTypeRegistry {
    let mut registry = InstructionTypeRegistry::new();
    register_builtin_instruction_types(&mut registry);
    registry
}

static GLOBAL_REGISTRY: OnceCell<Arc<InstructionTypeRegistry>> = OnceCell::new();

thread_local! {
    static EXTENDING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running an `extend` closure
struct ExtendScope;

impl ExtendScope {
    fn enter() -> Self {
        EXTENDING.with(|flag| flag.set(true));
        ExtendScope
    }
}

impl Drop for ExtendScope {
    fn drop(&mut self) {
        EXTENDING.with(|flag| flag.set(false));
    }
}

fn init_registry_cell<F>(
    cell: &'static OnceCell<Arc<InstructionTypeRegistry>>,
    extend: F,
) -> Result<&'static Arc<InstructionTypeRegistry>, VmError>
where
    F: FnOnce(&mut InstructionTypeRegistry),
{
    let mut initialized_here = false;
    let registry = cell.get_or_init(|| {
        initialized_here = true;
        let mut registry = create_instruction_type_registry();
        {
            let _scope = ExtendScope::enter();
            extend(&mut registry);
        }
        tracing::debug!(count = registry.len(), "global instruction type registry initialized");
        Arc::new(registry)
    });

    if initialized_here {
        Ok(registry)
    } else {
        Err(VmError::RegistryInitialized)
    }
}

fn registry_cell(cell: &'static OnceCell<Arc<InstructionTypeRegistry>>) -> &'static Arc<InstructionTypeRegistry> {
    if EXTENDING.with(Cell::get) {
        contract_violation(
            "the global instruction type registry was requested while it is being initialized".to_string(),
        );
    }
    cell.get_or_init(|| Arc::new(create_instruction_type_registry()))
}

/// Populate the process-wide registry with the built-ins plus whatever
/// `extend` registers.
///
/// Must run before the first call to [`global_registry`]; afterwards the
/// catalog is frozen and this returns [`VmError::RegistryInitialized`].
///
/// # Panics
/// Panics if `extend` calls [`global_registry`] or [`VirtualMachine::with_global_registry`]:
/// the registry does not exist until `extend` returns.
///
/// [`VirtualMachine::with_global_registry`]: crate::vm::VirtualMachine::with_global_registry
pub fn init_global_registry<F>(extend: F) -> Result<&'static Arc<InstructionTypeRegistry>, VmError>
where
    F: FnOnce(&mut InstructionTypeRegistry),
{
    init_registry_cell(&GLOBAL_REGISTRY, extend)
}

/// The process-wide registry, populated with the built-ins on first use
pub fn global_registry() -> &'static Arc<InstructionTypeRegistry> {
    registry_cell(&GLOBAL_REGISTRY)
}
