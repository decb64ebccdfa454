//! Helper functions and common imports for integration tests.

use crate::config::{StreamConfig, VmConfig};
use crate::instructions::create_instruction_type_registry;
use crate::registry::InstructionTypeRegistry;
use crate::vm::VirtualMachine;
use eager_types::{Blob, EagerBlobObject, Shape, StreamCategory};
use std::sync::Arc;

/// VM over a fresh built-in registry with host and CPU streams
pub fn default_vm() -> VirtualMachine {
    VirtualMachine::new(&VmConfig::default(), Arc::new(create_instruction_type_registry())).unwrap()
}

/// VM over `registry` with one stream per listed category
pub fn vm_with(registry: InstructionTypeRegistry, categories: &[StreamCategory]) -> VirtualMachine {
    let config = VmConfig {
        streams: categories
            .iter()
            .map(|&category| StreamConfig::new(category, 0))
            .collect(),
        ..VmConfig::default()
    };
    VirtualMachine::new(&config, Arc::new(registry)).unwrap()
}

/// Rank-1 `f32` blob handle
pub fn f32_blob(name: &str, values: &[f32]) -> Arc<EagerBlobObject> {
    let blob = Blob::from_f32s(Shape::new(vec![values.len()]), values).unwrap();
    Arc::new(EagerBlobObject::new(name, blob))
}
