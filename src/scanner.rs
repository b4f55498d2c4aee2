//! Two-pass byte scanner that turns a raw read buffer into a [`RecordTable`].
//!
//! # Input format
//! ```text
//! name,hp,mp,attack,defense\n
//! name,hp,mp,attack,defense\n
//! \0   (optional terminator; bytes at or after it are ignored)
//! ```
//!
//! # Passes
//! 1. Locate the terminator, copy the content before it into a scratch block,
//!    and count line feeds. The count is the exact table length; the table
//!    never resizes.
//! 2. Walk the scratch block once with a comma counter. Commas close the
//!    name/hp/mp/attack fields; a line feed closes `defense` and stores the
//!    record. No per-line or per-token collections are built; the only
//!    allocations are the scratch block, the table, and one copy per name.
//!
//! # Edge policy
//! - A line feed must close exactly the fifth column; anything else is a
//!   `ColumnCount` error.
//! - Empty or non-numeric integer spans are `InvalidInteger` errors, never
//!   coerced to zero.
//! - Trailing bytes after the last line feed are discarded.
//!
//! All exit paths free what they allocated: the scratch block and any
//! partially built record or table are owned values dropped on return.

use crate::alloc::{AllocError, ByteBlock};
use crate::raw_buffer::RawBuffer;
use crate::record::{Column, Record, COLUMN_COUNT};
use crate::string_ptr::StringPtr;
use crate::table::RecordTable;
use std::fmt;
use std::num::ParseIntError;

/// Terminator byte; scanning stops at the first occurrence.
pub const TERMINATOR: u8 = 0;
/// Field delimiter.
pub const COMMA: u8 = b',';
/// Record delimiter.
pub const LINE_FEED: u8 = b'\n';

/// Errors from scanning a buffer.
#[derive(Debug)]
#[non_exhaustive]
pub enum ScanError {
    /// Allocating the scratch block, the table, or a name copy failed.
    Alloc(AllocError),
    /// A line feed closed a line with the wrong number of commas.
    ColumnCount {
        record: usize,
        offset: usize,
        commas: usize,
    },
    /// An integer column did not parse as base-10 `i32`.
    InvalidInteger {
        record: usize,
        column: Column,
        offset: usize,
        source: ParseIntError,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(err) => write!(f, "scan allocation failed: {err}"),
            Self::ColumnCount {
                record,
                offset,
                commas,
            } => write!(
                f,
                "record {record} at byte {offset}: expected {} commas, found {commas}",
                COLUMN_COUNT - 1
            ),
            Self::InvalidInteger {
                record,
                column,
                offset,
                source,
            } => write!(
                f,
                "record {record} column {column} at byte {offset}: invalid integer: {source}"
            ),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alloc(err) => Some(err),
            Self::InvalidInteger { source, .. } => Some(source),
            Self::ColumnCount { .. } => None,
        }
    }
}

impl From<AllocError> for ScanError {
    fn from(err: AllocError) -> Self {
        Self::Alloc(err)
    }
}

/// Scans a completed read buffer. The buffer is only read.
pub fn scan(buffer: &RawBuffer) -> Result<RecordTable, ScanError> {
    scan_bytes(buffer.as_slice())
}

/// Scans `src` up to its first terminator byte (or its end).
pub fn scan_bytes(src: &[u8]) -> Result<RecordTable, ScanError> {
    let (scratch, records) = stage_content(src)?;
    let table = extract_records(scratch.as_slice(), records)?;
    debug_assert_eq!(table.filled(), records, "extraction must fill every slot");
    Ok(table)
}

/// Number of records `src` holds: line feeds before the first terminator.
pub fn count_records(src: &[u8]) -> usize {
    memchr::memchr_iter(LINE_FEED, content(src)).count()
}

#[inline]
fn content(src: &[u8]) -> &[u8] {
    let end = memchr::memchr(TERMINATOR, src).unwrap_or(src.len());
    &src[..end]
}

/// Pass 1: copy the content before the terminator and count records in it.
fn stage_content(src: &[u8]) -> Result<(ByteBlock, usize), ScanError> {
    let scratch = ByteBlock::copy_from(content(src), 1)?;
    let records = memchr::memchr_iter(LINE_FEED, scratch.as_slice()).count();
    Ok((scratch, records))
}

/// Fields accumulated for the line currently being scanned.
#[derive(Default)]
struct PendingRecord {
    name: StringPtr,
    hp: i32,
    mp: i32,
    attack: i32,
}

impl PendingRecord {
    fn finish(self, defense: i32) -> Record {
        Record {
            name: self.name,
            hp: self.hp,
            mp: self.mp,
            attack: self.attack,
            defense,
        }
    }
}

/// Pass 2: single forward walk over terminator-free content.
fn extract_records(content: &[u8], records: usize) -> Result<RecordTable, ScanError> {
    let mut table = RecordTable::with_len(records)?;

    let mut field_start = 0usize;
    let mut comma_count = 0usize;
    let mut record_index = 0usize;
    let mut pending = PendingRecord::default();

    for (i, &byte) in content.iter().enumerate() {
        match byte {
            COMMA => {
                let span = &content[field_start..i];
                match Column::from_index(comma_count) {
                    Some(Column::Name) => pending.name = StringPtr::copy_from(span)?,
                    Some(column @ Column::Hp) => {
                        pending.hp = parse_field(span, record_index, column, field_start)?
                    }
                    Some(column @ Column::Mp) => {
                        pending.mp = parse_field(span, record_index, column, field_start)?
                    }
                    Some(column @ Column::Attack) => {
                        pending.attack = parse_field(span, record_index, column, field_start)?
                    }
                    // Surplus commas; the line feed rejects the line.
                    Some(Column::Defense) | None => {}
                }
                comma_count += 1;
                field_start = i + 1;
            }
            LINE_FEED => {
                if comma_count != COLUMN_COUNT - 1 {
                    return Err(ScanError::ColumnCount {
                        record: record_index,
                        offset: i,
                        commas: comma_count,
                    });
                }
                let defense = parse_field(
                    &content[field_start..i],
                    record_index,
                    Column::Defense,
                    field_start,
                )?;
                table.push(std::mem::take(&mut pending).finish(defense));
                record_index += 1;
                comma_count = 0;
                field_start = i + 1;
            }
            _ => {}
        }
    }

    Ok(table)
}

fn parse_field(
    span: &[u8],
    record: usize,
    column: Column,
    offset: usize,
) -> Result<i32, ScanError> {
    let value = parse_int(span).map_err(|source| ScanError::InvalidInteger {
        record,
        column,
        offset,
        source,
    })?;
    #[cfg(feature = "field-trace")]
    tracing::trace!(record, %column, value, "parsed field");
    Ok(value)
}

/// Strict base-10 `i32` parse: optional sign, digits only, no whitespace.
pub fn parse_int(span: &[u8]) -> Result<i32, ParseIntError> {
    match std::str::from_utf8(span) {
        Ok(text) => text.parse(),
        // Digits are ASCII; the lossy form fails with `InvalidDigit`.
        Err(_) => String::from_utf8_lossy(span).parse(),
    }
}
