//! Host-side blob accessor
//!
//! `OfBlob` is what host callbacks see of a blob: the bytes plus the device
//! context they live under. It borrows both for the duration of one
//! `compute` call, so the borrow checker keeps it from escaping the callback.

use crate::stream::DeviceCtx;
use eager_types::{Blob, BlobError, DataType, Shape};

enum BlobAccess<'a> {
    Read(&'a Blob),
    Write(&'a mut Blob),
}

/// Lifetime-scoped accessor over one blob
pub struct OfBlob<'a> {
    device_ctx: &'a DeviceCtx,
    blob: BlobAccess<'a>,
}

impl<'a> OfBlob<'a> {
    /// Accessor allowing writes; handed to callbacks as `&mut OfBlob`
    pub(crate) fn new(device_ctx: &'a DeviceCtx, blob: &'a mut Blob) -> Self {
        Self {
            device_ctx,
            blob: BlobAccess::Write(blob),
        }
    }

    /// Read-only accessor; only ever handed to callbacks as `&OfBlob`
    pub(crate) fn new_read_only(device_ctx: &'a DeviceCtx, blob: &'a Blob) -> Self {
        Self {
            device_ctx,
            blob: BlobAccess::Read(blob),
        }
    }

    pub fn device_ctx(&self) -> &DeviceCtx {
        self.device_ctx
    }

    fn blob(&self) -> &Blob {
        match &self.blob {
            BlobAccess::Read(blob) => *blob,
            BlobAccess::Write(blob) => &**blob,
        }
    }

    fn blob_mut(&mut self) -> &mut Blob {
        match &mut self.blob {
            BlobAccess::Write(blob) => &mut **blob,
            // Read-only accessors are never lent out mutably.
            BlobAccess::Read(_) => unreachable!("read-only OfBlob borrowed mutably"),
        }
    }

    pub fn shape(&self) -> &Shape {
        self.blob().shape()
    }

    pub fn data_type(&self) -> DataType {
        self.blob().data_type()
    }

    pub fn byte_size(&self) -> usize {
        self.blob().byte_size()
    }

    pub fn bytes(&self) -> &[u8] {
        self.blob().bytes()
    }

    pub fn mut_bytes(&mut self) -> &mut [u8] {
        self.blob_mut().bytes_mut()
    }

    /// Copy the blob's bytes into `dst`, which must match the byte size exactly
    pub fn copy_to_buffer(&self, dst: &mut [u8]) -> Result<(), BlobError> {
        let src = self.bytes();
        if src.len() != dst.len() {
            return Err(BlobError::SizeMismatch {
                blob_bytes: src.len(),
                buffer_bytes: dst.len(),
            });
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    /// Overwrite the blob's bytes from `src`, which must match the byte size exactly
    pub fn copy_from_buffer(&mut self, src: &[u8]) -> Result<(), BlobError> {
        let dst = self.mut_bytes();
        if src.len() != dst.len() {
            return Err(BlobError::SizeMismatch {
                blob_bytes: dst.len(),
                buffer_bytes: src.len(),
            });
        }
        dst.copy_from_slice(src);
        Ok(())
    }

    pub fn read_f32s(&self) -> Result<Vec<f32>, BlobError> {
        self.blob().to_f32s()
    }

    pub fn write_f32s(&mut self, values: &[f32]) -> Result<(), BlobError> {
        self.blob_mut().write_f32s(values)
    }
}
