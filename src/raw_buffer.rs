//! Raw whole-file read target.

use crate::alloc::{AllocError, ByteBlock};
use std::fmt;

/// Exclusively owned byte block sized to the source file.
///
/// The block is allocated before the read is issued and freed exactly once:
/// explicitly through [`RawBuffer::release`], or on drop. Contents start
/// zeroed, so bytes the read never reached act as the scan terminator.
#[derive(Default)]
pub struct RawBuffer {
    block: ByteBlock,
}

impl RawBuffer {
    /// Alignment of the backing block. Page alignment keeps the buffer a
    /// valid direct-I/O target.
    pub const ALIGN: usize = 4096;

    /// Allocates a zeroed buffer of exactly `len` bytes.
    pub fn alloc(len: usize) -> Result<Self, AllocError> {
        Ok(Self {
            block: ByteBlock::alloc_zeroed(len, Self::ALIGN)?,
        })
    }

    /// Allocates a buffer holding a copy of `bytes`.
    pub fn copy_from(bytes: &[u8]) -> Result<Self, AllocError> {
        Ok(Self {
            block: ByteBlock::copy_from(bytes, Self::ALIGN)?,
        })
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        self.block.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.block.as_mut_slice()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.block.as_mut_ptr()
    }

    /// Frees the block. Idempotent; later views are empty.
    pub fn release(&mut self) {
        self.block.release();
    }

    /// True once [`RawBuffer::release`] has run.
    pub fn is_released(&self) -> bool {
        self.block.is_released()
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("len", &self.len())
            .field("released", &self.is_released())
            .finish()
    }
}
