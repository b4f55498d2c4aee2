//! Fixed-length, manually allocated record table.
//!
//! # Invariants
//! - `len` is fixed when the table is created and never changes.
//! - Slots `0..filled` are initialised; `filled..len` are not and are never
//!   read or dropped.
//! - `layout` is `Some` exactly while the slot array is allocated.
//! - `dispose` releases every filled record's name before the array itself,
//!   then clears `created`; disposing again is a no-op.

use crate::alloc::AllocError;
use crate::record::Record;
use std::alloc::{alloc, dealloc, Layout};
use std::fmt;
use std::mem::MaybeUninit;
use std::ops::Index;
use std::ptr::NonNull;
use std::slice;

/// The pipeline's durable artifact: one slot per line-feed-terminated line.
pub struct RecordTable {
    ptr: NonNull<MaybeUninit<Record>>,
    len: usize,
    filled: usize,
    layout: Option<Layout>,
    created: bool,
}

// SAFETY: the table exclusively owns its slots, like Box<[Record]>.
unsafe impl Send for RecordTable {}
unsafe impl Sync for RecordTable {}

impl RecordTable {
    /// A table that was never created. Disposing it is a no-op.
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            filled: 0,
            layout: None,
            created: false,
        }
    }

    /// Allocates `len` uninitialised slots.
    ///
    /// A zero-length table is created without allocating.
    pub(crate) fn with_len(len: usize) -> Result<Self, AllocError> {
        let layout = Layout::array::<Record>(len).map_err(|_| AllocError::InvalidLayout {
            len: len.saturating_mul(size_of::<Record>()),
            align: align_of::<Record>(),
        })?;

        if layout.size() == 0 {
            return Ok(Self {
                created: true,
                ..Self::new()
            });
        }

        // SAFETY: layout is valid and has non-zero size.
        let raw = unsafe { alloc(layout) };
        let ptr = NonNull::new(raw.cast::<MaybeUninit<Record>>()).ok_or(
            AllocError::OutOfMemory {
                len: layout.size(),
            },
        )?;

        Ok(Self {
            ptr,
            len,
            filled: 0,
            layout: Some(layout),
            created: true,
        })
    }

    /// Writes `record` into the next unfilled slot.
    ///
    /// # Panics
    /// Panics if every slot is already filled; the table never resizes.
    pub(crate) fn push(&mut self, record: Record) {
        assert!(self.filled < self.len, "record table is full ({} slots)", self.len);
        // SAFETY: `filled < len`, so the slot is inside the allocation and
        // currently uninitialised.
        unsafe {
            (*self.ptr.as_ptr().add(self.filled)).write(record);
        }
        self.filled += 1;
    }

    /// Number of initialised slots.
    pub(crate) fn filled(&self) -> usize {
        self.filled
    }

    /// Fixed length chosen at creation.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True between creation and disposal.
    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn as_slice(&self) -> &[Record] {
        // SAFETY: `0..filled` is initialised and contiguous; an unallocated
        // table has `filled == 0` and a dangling, aligned pointer.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr().cast::<Record>(), self.filled) }
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.as_slice().get(index)
    }

    pub fn iter(&self) -> slice::Iter<'_, Record> {
        self.as_slice().iter()
    }

    /// Renders record `index` for display.
    ///
    /// # Panics
    /// Panics if `index` is out of range; callers check bounds.
    pub fn show_record(&self, index: usize) -> String {
        self[index].to_string()
    }

    /// Disposes every record's name, then frees the slot array.
    ///
    /// Idempotent: a disposed or never-created table is left untouched.
    pub fn dispose(&mut self) {
        if !self.created {
            return;
        }

        let base = self.ptr.as_ptr().cast::<Record>();
        for i in 0..self.filled {
            // SAFETY: slot `i < filled` is initialised and dropped exactly
            // once; `filled` is reset below.
            unsafe {
                let record = &mut *base.add(i);
                record.dispose();
                std::ptr::drop_in_place(record);
            }
        }
        self.filled = 0;

        if let Some(layout) = self.layout.take() {
            // SAFETY: same pointer and layout as the `alloc` in `with_len`.
            unsafe { dealloc(self.ptr.as_ptr().cast::<u8>(), layout) };
        }

        self.ptr = NonNull::dangling();
        self.len = 0;
        self.created = false;
    }
}

impl Default for RecordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RecordTable {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Index<usize> for RecordTable {
    type Output = Record;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<'a> IntoIterator for &'a RecordTable {
    type Item = &'a Record;
    type IntoIter = slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordTable")
            .field("len", &self.len)
            .field("created", &self.created)
            .field("records", &self.as_slice())
            .finish()
    }
}
