//! Blob storage
//!
//! A `Blob` is the byte buffer behind one tensor. The VM never interprets the
//! bytes itself; instructions and host callbacks do. `EagerBlobObject` is the
//! handle instructions carry: it names a blob and points at its current
//! storage, which lazy reference may swap for storage owned elsewhere.

use crate::stream::TypeError;
use crate::sync::{shared, Arc, RwLock, Shared};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors raised by typed blob access
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    /// Source/destination length differs from the blob's byte size
    #[error("size mismatch: blob holds {blob_bytes} bytes, buffer holds {buffer_bytes}")]
    SizeMismatch {
        blob_bytes: usize,
        buffer_bytes: usize,
    },

    /// Typed view requested with the wrong element type
    #[error("data type mismatch: expected {expected}, blob is {actual}")]
    DataTypeMismatch {
        expected: DataType,
        actual: DataType,
    },

    /// Element count does not match the shape
    #[error("element count mismatch: shape {shape} needs {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Byte size of the requested blob does not fit in `usize`
    #[error("blob of shape {shape} and type {data_type} is too large to allocate")]
    TooLarge { shape: Shape, data_type: DataType },
}

/// Element type of a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    F32,
    F64,
    I32,
    I64,
    U8,
}

impl DataType {
    /// Size of one element in bytes
    pub const fn size_of(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 => 4,
            DataType::F64 | DataType::I64 => 8,
            DataType::U8 => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f32" => Ok(DataType::F32),
            "f64" => Ok(DataType::F64),
            "i32" => Ok(DataType::I32),
            "i64" => Ok(DataType::I64),
            "u8" => Ok(DataType::U8),
            _ => Err(TypeError::UnknownDataType(s.to_string())),
        }
    }
}

/// Tensor shape (row-major dimensions)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// Number of elements; a rank-0 shape holds one scalar.
    /// Saturates at `usize::MAX` for shapes no blob can hold.
    pub fn elem_cnt(&self) -> usize {
        self.checked_elem_cnt().unwrap_or(usize::MAX)
    }

    /// Number of elements, or `None` if the product overflows
    pub fn checked_elem_cnt(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, ")")
    }
}

/// Owned tensor storage
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    shape: Shape,
    data_type: DataType,
    bytes: Vec<u8>,
}

impl Blob {
    /// Allocate a zero-filled blob
    ///
    /// # Panics
    /// Panics if the byte size overflows `usize`; use [`Blob::try_zeros`]
    /// for shapes from untrusted input.
    pub fn zeros(shape: Shape, data_type: DataType) -> Self {
        Self::try_zeros(shape, data_type).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Allocate a zero-filled blob, rejecting shapes whose byte size overflows
    pub fn try_zeros(shape: Shape, data_type: DataType) -> Result<Self, BlobError> {
        let len = shape
            .checked_elem_cnt()
            .and_then(|count| count.checked_mul(data_type.size_of()));
        let Some(len) = len else {
            return Err(BlobError::TooLarge { shape, data_type });
        };
        Ok(Self {
            shape,
            data_type,
            bytes: vec![0; len],
        })
    }

    /// Build an `f32` blob from host values
    pub fn from_f32s(shape: Shape, values: &[f32]) -> Result<Self, BlobError> {
        let mut blob = Blob::try_zeros(shape, DataType::F32)?;
        blob.write_f32s(values)?;
        Ok(blob)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Decode the contents as little-endian `f32` values
    pub fn to_f32s(&self) -> Result<Vec<f32>, BlobError> {
        self.check_data_type(DataType::F32)?;
        Ok(self
            .bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Overwrite the contents with little-endian `f32` values
    pub fn write_f32s(&mut self, values: &[f32]) -> Result<(), BlobError> {
        self.check_data_type(DataType::F32)?;
        let expected = self.shape.elem_cnt();
        if values.len() != expected {
            return Err(BlobError::ElementCountMismatch {
                shape: self.shape.clone(),
                expected,
                got: values.len(),
            });
        }
        for (chunk, value) in self.bytes.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        Ok(())
    }

    fn check_data_type(&self, expected: DataType) -> Result<(), BlobError> {
        if self.data_type != expected {
            return Err(BlobError::DataTypeMismatch {
                expected,
                actual: self.data_type,
            });
        }
        Ok(())
    }
}

/// Named handle to the storage an eager instruction reads or writes.
///
/// The storage pointer itself sits behind a lock so lazy reference can
/// rebind it to a blob owned by a compiled graph without the instruction
/// holding the handle noticing.
#[derive(Debug)]
pub struct EagerBlobObject {
    name: String,
    storage: RwLock<Shared<Blob>>,
}

impl EagerBlobObject {
    /// Create a handle over freshly owned storage
    pub fn new(name: impl Into<String>, blob: Blob) -> Self {
        Self {
            name: name.into(),
            storage: RwLock::new(shared(blob)),
        }
    }

    /// Create a handle over existing storage
    pub fn with_storage(name: impl Into<String>, storage: Shared<Blob>) -> Self {
        Self {
            name: name.into(),
            storage: RwLock::new(storage),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current storage
    pub fn blob(&self) -> Shared<Blob> {
        Arc::clone(&*self.storage.read())
    }

    /// Point this handle at different storage
    pub fn rebind(&self, storage: Shared<Blob>) {
        *self.storage.write() = storage;
    }

    /// Whether this handle currently aliases `storage`
    pub fn shares_storage_with(&self, storage: &Shared<Blob>) -> bool {
        Arc::ptr_eq(&*self.storage.read(), storage)
    }

    /// Snapshot of the current contents
    pub fn snapshot(&self) -> Blob {
        self.blob().read().clone()
    }
}
