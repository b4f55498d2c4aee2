//! Managed reference parser: read all lines, split on commas, allocate a
//! `String` per name.
//!
//! Used only for differential checks and throughput comparison against the
//! unmanaged path. Lines are split with [`str::lines`], so a trailing line
//! without a line feed still yields a record here while the scanner drops
//! it; the two agree on line-feed-terminated input. Fields past the fifth
//! are ignored.

use crate::record::{Column, Record};
use crate::scanner::parse_int;
use std::fmt;
use std::fs;
use std::io;
use std::num::ParseIntError;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagedRecord {
    pub name: String,
    pub hp: i32,
    pub mp: i32,
    pub attack: i32,
    pub defense: i32,
}

impl ManagedRecord {
    /// Field-for-field comparison with an unmanaged record.
    pub fn same_fields(&self, other: &Record) -> bool {
        let ints = [
            (Column::Hp, self.hp),
            (Column::Mp, self.mp),
            (Column::Attack, self.attack),
            (Column::Defense, self.defense),
        ];
        other.name == self.name.as_str()
            && ints
                .into_iter()
                .all(|(column, value)| other.int_field(column) == Some(value))
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum BaselineError {
    Io(io::Error),
    MissingField {
        line: usize,
        column: Column,
    },
    InvalidInteger {
        line: usize,
        column: Column,
        source: ParseIntError,
    },
}

impl fmt::Display for BaselineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "read failed: {err}"),
            Self::MissingField { line, column } => {
                write!(f, "line {line}: missing {column} field")
            }
            Self::InvalidInteger {
                line,
                column,
                source,
            } => write!(f, "line {line}: invalid {column}: {source}"),
        }
    }
}

impl std::error::Error for BaselineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidInteger { source, .. } => Some(source),
            Self::MissingField { .. } => None,
        }
    }
}

impl From<io::Error> for BaselineError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Reads `path` as UTF-8 and parses every line.
pub fn read_managed(path: impl AsRef<Path>) -> Result<Vec<ManagedRecord>, BaselineError> {
    let text = fs::read_to_string(path)?;
    parse_managed(&text)
}

pub fn parse_managed(text: &str) -> Result<Vec<ManagedRecord>, BaselineError> {
    text.lines()
        .enumerate()
        .map(|(line, text)| parse_line(line, text))
        .collect()
}

fn parse_line(line: usize, text: &str) -> Result<ManagedRecord, BaselineError> {
    let args: Vec<&str> = text.split(',').collect();
    let field = |column: Column| {
        args.get(column.index())
            .copied()
            .ok_or(BaselineError::MissingField { line, column })
    };
    let int = |column: Column| {
        parse_int(field(column)?.as_bytes()).map_err(|source| BaselineError::InvalidInteger {
            line,
            column,
            source,
        })
    };

    Ok(ManagedRecord {
        name: field(Column::Name)?.to_string(),
        hp: int(Column::Hp)?,
        mp: int(Column::Mp)?,
        attack: int(Column::Attack)?,
        defense: int(Column::Defense)?,
    })
}
