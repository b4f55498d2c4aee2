//! Explicitly allocated byte blocks shared by the pipeline's owned buffers.
//!
//! # Scope
//! Every buffer the ingest path owns (the raw read target, the scan scratch,
//! each parsed name) is one `ByteBlock`: a single `std::alloc` allocation
//! with an explicit, idempotent `release`. Nothing here grows or reallocates.
//!
//! # Invariants
//! - A block owns at most one allocation; `layout` is `Some` exactly while
//!   that allocation is live.
//! - Zero-length blocks never allocate. They carry a dangling pointer that is
//!   aligned for the requested alignment so slice views stay valid.
//! - After `release`, `len == 0` and the pointer is dangling again, so any
//!   stale view observes an empty slice instead of freed memory.
//!
//! # Failure modes
//! - Invalid layouts and allocator failures are reported via `AllocError`.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::slice;

/// Errors returned when allocating a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The size/alignment pair is not a representable layout.
    InvalidLayout { len: usize, align: usize },
    /// The allocator returned null.
    OutOfMemory { len: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLayout { len, align } => {
                write!(f, "invalid allocation layout: {len} bytes aligned to {align}")
            }
            Self::OutOfMemory { len } => write!(f, "out of memory allocating {len} bytes"),
        }
    }
}

impl std::error::Error for AllocError {}

/// Zero-initialised, exclusively owned byte allocation.
pub(crate) struct ByteBlock {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
    layout: Option<Layout>,
    released: bool,
}

// SAFETY: ByteBlock owns its allocation exclusively, like Box<[u8]>.
unsafe impl Send for ByteBlock {}
unsafe impl Sync for ByteBlock {}

impl ByteBlock {
    /// Block that owns nothing. Used for empty values and `Default` impls.
    pub(crate) const fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            align: 1,
            layout: None,
            released: false,
        }
    }

    /// Allocates `len` zeroed bytes aligned to `align`.
    ///
    /// # Errors
    /// - `InvalidLayout` if `align` is not a power of two or the size
    ///   overflows `isize::MAX` after rounding.
    /// - `OutOfMemory` if the allocator returns null.
    pub(crate) fn alloc_zeroed(len: usize, align: usize) -> Result<Self, AllocError> {
        let layout =
            Layout::from_size_align(len, align).map_err(|_| AllocError::InvalidLayout { len, align })?;

        if len == 0 {
            return Ok(Self {
                ptr: dangling_aligned(align),
                len: 0,
                align,
                layout: None,
                released: false,
            });
        }

        // SAFETY: layout is valid and has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(AllocError::OutOfMemory { len })?;

        Ok(Self {
            ptr,
            len,
            align,
            layout: Some(layout),
            released: false,
        })
    }

    /// Allocates a block holding a copy of `bytes`.
    pub(crate) fn copy_from(bytes: &[u8], align: usize) -> Result<Self, AllocError> {
        let mut block = Self::alloc_zeroed(bytes.len(), align)?;
        block.as_mut_slice().copy_from_slice(bytes);
        Ok(block)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_released(&self) -> bool {
        self.released
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        // SAFETY: `ptr` is valid for `len` initialised bytes, or dangling and
        // aligned with `len == 0`.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: uniquely borrowed through `&mut self`; same bounds as above.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Raw base pointer for handing the block to an I/O submission.
    #[inline]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Frees the allocation. Returns `false` if nothing was freed.
    ///
    /// Idempotent: releasing twice, or releasing a zero-length block, is a
    /// no-op.
    pub(crate) fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        let freed = match self.layout.take() {
            Some(layout) => {
                // SAFETY: `ptr` came from `alloc_zeroed(layout)` and `take()`
                // guarantees this runs once.
                unsafe { dealloc(self.ptr.as_ptr(), layout) };
                true
            }
            None => false,
        };
        self.ptr = dangling_aligned(self.align);
        self.len = 0;
        freed
    }
}

impl Default for ByteBlock {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for ByteBlock {
    fn drop(&mut self) {
        self.release();
    }
}

fn dangling_aligned(align: usize) -> NonNull<u8> {
    debug_assert!(align.is_power_of_two());
    // SAFETY: `align` is a non-zero power of two.
    unsafe { NonNull::new_unchecked(align as *mut u8) }
}
