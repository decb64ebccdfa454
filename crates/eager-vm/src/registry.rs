//! Instruction type registry
//!
//! This module provides the catalog mapping wire names (e.g.
//! `"cpu.WriteBlobByCallback"`) to instruction type behaviors. Names come from
//! whatever produced the instruction stream, so a name that fails to resolve
//! means the producer and this runtime disagree about the catalog.
//!
//! The registry is mutable only while it is being populated. Once it is
//! wrapped in an `Arc` and handed to a VM it is read-only.

use crate::error::{contract_violation, RegistryError};
use crate::instruction_type::InstructionType;
use eager_types::StreamCategory;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One registered instruction kind
pub struct InstructionTypeDescriptor {
    /// Registry name (unique)
    name: String,
    /// Registration index
    id: usize,
    /// Stream category captured from the behavior at registration
    stream_category: StreamCategory,
    /// Singleton behavior
    behavior: Arc<dyn InstructionType>,
}

impl InstructionTypeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn stream_category(&self) -> StreamCategory {
        self.stream_category
    }

    pub fn behavior(&self) -> &dyn InstructionType {
        self.behavior.as_ref()
    }
}

impl fmt::Debug for InstructionTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstructionTypeDescriptor")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("stream_category", &self.stream_category)
            .finish_non_exhaustive()
    }
}

/// Registry of all instruction types
///
/// Provides O(1) lookup by both name (for dispatch) and index.
#[derive(Default)]
pub struct InstructionTypeRegistry {
    /// Name to index mapping
    name_to_id: HashMap<String, usize>,
    /// Index to descriptor mapping
    descriptors: Vec<Arc<InstructionTypeDescriptor>>,
}

impl InstructionTypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior under `name`, failing if the name is taken.
    ///
    /// A rejected registration leaves the existing entry untouched.
    pub fn try_register(
        &mut self,
        name: &str,
        behavior: Arc<dyn InstructionType>,
    ) -> Result<Arc<InstructionTypeDescriptor>, RegistryError> {
        if self.name_to_id.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        let id = self.descriptors.len();
        let descriptor = Arc::new(InstructionTypeDescriptor {
            name: name.to_string(),
            id,
            stream_category: behavior.stream_category(),
            behavior,
        });

        tracing::debug!(
            name,
            id,
            stream = %descriptor.stream_category,
            "registered instruction type"
        );

        self.name_to_id.insert(name.to_string(), id);
        self.descriptors.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Register a behavior instance
    ///
    /// # Panics
    /// Panics if the name is already registered.
    #[track_caller]
    pub fn register_instance(
        &mut self,
        name: &str,
        behavior: Arc<dyn InstructionType>,
    ) -> Arc<InstructionTypeDescriptor> {
        match self.try_register(name, behavior) {
            Ok(descriptor) => descriptor,
            Err(err) => contract_violation(err.to_string()),
        }
    }

    /// Register the default instance of `T`
    ///
    /// # Panics
    /// Panics if the name is already registered.
    #[track_caller]
    pub fn register<T: InstructionType + Default>(&mut self, name: &str) -> Arc<InstructionTypeDescriptor> {
        self.register_instance(name, Arc::new(T::default()))
    }

    /// Resolve a name
    pub fn try_lookup(&self, name: &str) -> Result<Arc<InstructionTypeDescriptor>, RegistryError> {
        self.name_to_id
            .get(name)
            .map(|&id| Arc::clone(&self.descriptors[id]))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Resolve a name produced by an upstream instruction stream
    ///
    /// # Panics
    /// Panics if the name was never registered.
    #[track_caller]
    pub fn lookup(&self, name: &str) -> Arc<InstructionTypeDescriptor> {
        match self.try_lookup(name) {
            Ok(descriptor) => descriptor,
            Err(err) => contract_violation(err.to_string()),
        }
    }

    /// Get descriptor by registration index
    #[inline]
    pub fn get(&self, id: usize) -> Option<&Arc<InstructionTypeDescriptor>> {
        self.descriptors.get(id)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name())
    }

    /// Get number of registered instruction types
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if registry is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Debug for InstructionTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
