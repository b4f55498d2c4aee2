//! Asynchronous whole-file CSV ingest into manually managed record tables.
//!
//! ## Scope
//! Reads a `name,hp,mp,attack,defense\n` file with one asynchronous read,
//! scans the bytes in two passes, and produces a fixed-length
//! [`RecordTable`] whose records own independently allocated name copies.
//! Per-record heap objects are avoided: the only allocations are the raw
//! read buffer, one scratch block, the table, and one block per name.
//!
//! ## Key invariants
//! - One read is outstanding per [`ReadHandle`]; its buffer is owned by the
//!   handle until disposal, so it is never read while the kernel writes it.
//! - Status moves only `Pending -> Complete | Failed`.
//! - The table length equals the number of line feeds before the terminator
//!   byte and never changes.
//! - Every owned block has an idempotent release; tables dispose names
//!   before their slot array.
//!
//! ## Pipeline flow
//! `Path -> AsyncFileReader -> ReadHandle (poll) -> RawBuffer -> scan -> RecordTable`
//!
//! ## Notable entry points
//! - [`UnmanagedLoader`]: tick-driven host component (`read_data`/`update`).
//! - [`AsyncFileReader`] / [`ReadHandle`]: the read protocol on its own.
//! - [`scan`] / [`scan_bytes`]: the scanner over an in-memory buffer.
//! - [`baseline`]: the managed line-split reference used for differential
//!   checks.

pub mod alloc;
pub mod async_io;
pub mod baseline;
pub mod error;
pub mod loader;
pub mod raw_buffer;
pub mod record;
pub mod scanner;
pub mod string_ptr;
pub mod table;
#[cfg(test)]
pub mod test_utils;

pub use alloc::AllocError;
pub use async_io::{
    AsyncFileReader, AsyncReadConfig, ReadBackend, ReadFailure, ReadHandle, ReadStage,
    ReadStatus, DEFAULT_MAX_OP_LEN,
};
pub use baseline::{parse_managed, read_managed, BaselineError, ManagedRecord};
pub use error::LoadError;
pub use loader::{LoadStats, LoaderConfig, Tick, UnmanagedLoader, DEFAULT_DATA_PATH};
pub use raw_buffer::RawBuffer;
pub use record::{Column, Record, COLUMN_COUNT};
pub use scanner::{count_records, parse_int, scan, scan_bytes, ScanError};
pub use string_ptr::StringPtr;
pub use table::RecordTable;
