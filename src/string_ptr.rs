//! Owned copies of parsed text fields.

use crate::alloc::{AllocError, ByteBlock};
use std::borrow::Cow;
use std::fmt;

/// Independently allocated copy of a byte range.
///
/// A `StringPtr` never aliases the buffer it was copied from, so the raw
/// read buffer can be freed as soon as the scan finishes. Bytes are stored
/// with an explicit length (no NUL terminator) and are only interpreted as
/// UTF-8 when rendered.
#[derive(Default)]
pub struct StringPtr {
    block: ByteBlock,
}

impl StringPtr {
    /// Allocates `span.len()` zeroed bytes and copies `span` into them.
    pub fn copy_from(span: &[u8]) -> Result<Self, AllocError> {
        Ok(Self {
            block: ByteBlock::copy_from(span, 1)?,
        })
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.block.as_slice()
    }

    /// Decodes the bytes as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Frees the copy. Idempotent.
    pub fn dispose(&mut self) {
        self.block.release();
    }

    pub fn is_disposed(&self) -> bool {
        self.block.is_released()
    }
}

impl fmt::Display for StringPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for StringPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl PartialEq<[u8]> for StringPtr {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<str> for StringPtr {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for StringPtr {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
