//! Load pipeline errors.
//!
//! `Stat` and `Read` are I/O outcomes the host reports and moves past.
//! `Malformed` means the source file (or the scanner) is broken; the parse
//! is abandoned rather than filled with defaults.

use crate::alloc::AllocError;
use crate::async_io::ReadFailure;
use crate::scanner::ScanError;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
#[non_exhaustive]
pub enum LoadError {
    /// Metadata lookup failed; no read was issued.
    Stat { path: PathBuf, source: io::Error },
    /// The raw buffer or the record table could not be allocated.
    Alloc { path: PathBuf, source: AllocError },
    /// The read handle reported `Failed`.
    Read { path: PathBuf, failure: ReadFailure },
    /// The buffer did not hold well-formed records.
    Malformed { path: PathBuf, source: ScanError },
    /// A read is already outstanding.
    Busy,
}

impl LoadError {
    /// True for the I/O category (stat or read failure).
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Stat { .. } | Self::Read { .. })
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stat { path, source } => {
                write!(f, "cannot stat {}: {source}", path.display())
            }
            Self::Alloc { path, source } => {
                write!(f, "cannot load {}: {source}", path.display())
            }
            Self::Read { path, failure } => {
                write!(f, "async read of {} failed: {failure}", path.display())
            }
            Self::Malformed { path, source } => {
                write!(f, "malformed input in {}: {source}", path.display())
            }
            Self::Busy => f.write_str("a read is already outstanding"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stat { source, .. } => Some(source),
            Self::Alloc { source, .. } => Some(source),
            Self::Read { failure, .. } => Some(failure),
            Self::Malformed { source, .. } => Some(source),
            Self::Busy => None,
        }
    }
}
