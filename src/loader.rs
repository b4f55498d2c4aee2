//! Tick-driven host component that owns one load at a time.
//!
//! The host calls [`UnmanagedLoader::read_data`] once, then
//! [`UnmanagedLoader::update`] every tick. While the read is pending a tick
//! costs one non-blocking poll. The tick that observes a terminal status
//! disposes the handle, scans the buffer (on success), releases the buffer,
//! and reports the outcome exactly once.
//!
//! # Ordering
//! - Parsing starts only after the handle reports `Complete`.
//! - The raw buffer is released after handle disposal and after the scan.
//! - A new `read_data` releases the previously loaded table first.

use crate::alloc::AllocError;
use crate::async_io::{
    AsyncFileReader, AsyncReadConfig, ReadBackend, ReadHandle, ReadStatus,
};
use crate::error::LoadError;
use crate::scanner::{self, ScanError};
use crate::table::RecordTable;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Data file loaded when no path is configured.
pub const DEFAULT_DATA_PATH: &str = "Sample_full.csv";
/// Environment variable overriding the data path.
pub const DATA_PATH_ENV: &str = "RECORD_SCANNER_DATA";
/// Environment variable overriding the read backend.
pub const BACKEND_ENV: &str = "RECORD_SCANNER_BACKEND";

#[derive(Clone, Debug)]
pub struct LoaderConfig {
    pub path: PathBuf,
    pub read: AsyncReadConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            read: AsyncReadConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Defaults overridden by `RECORD_SCANNER_DATA` and
    /// `RECORD_SCANNER_BACKEND`.
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> io::Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup(DATA_PATH_ENV).filter(|p| !p.is_empty()) {
            config.path = PathBuf::from(path);
        }
        if let Some(backend) = lookup(BACKEND_ENV).filter(|b| !b.is_empty()) {
            config.read.backend = backend
                .parse::<ReadBackend>()
                .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;
        }
        Ok(config)
    }
}

/// Outcome of one [`UnmanagedLoader::update`] tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// No read outstanding.
    Idle,
    /// The read is still in flight.
    Pending,
    /// The read finished and the table now holds `records` entries.
    Loaded { records: usize },
}

/// Measurements for the most recent load.
#[derive(Clone, Debug, Default)]
pub struct LoadStats {
    pub file_len: usize,
    pub bytes_read: usize,
    pub records: usize,
    pub polls: u64,
    pub backend: Option<ReadBackend>,
    pub read_elapsed: Option<Duration>,
    pub parse_elapsed: Option<Duration>,
}

/// Loads records from one file into a manually managed [`RecordTable`].
pub struct UnmanagedLoader {
    config: LoaderConfig,
    reader: AsyncFileReader,
    handle: Option<ReadHandle>,
    table: RecordTable,
    stats: LoadStats,
}

impl UnmanagedLoader {
    pub fn new(config: LoaderConfig) -> io::Result<Self> {
        let reader = AsyncFileReader::new(config.read.clone())?;
        Ok(Self {
            config,
            reader,
            handle: None,
            table: RecordTable::new(),
            stats: LoadStats::default(),
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Issues the whole-file read for the configured path.
    ///
    /// # Errors
    /// `Busy` if a read is outstanding; `Stat`/`Alloc` if the file cannot be
    /// sized or its buffer allocated. Nothing is outstanding after an error.
    pub fn read_data(&mut self) -> Result<(), LoadError> {
        if self.handle.is_some() {
            return Err(LoadError::Busy);
        }
        self.release();
        self.stats = LoadStats::default();

        let path = self.config.path.as_path();
        match self.reader.begin_read(path) {
            Ok(handle) => {
                debug!(path = %path.display(), backend = %handle.backend(), "load started");
                self.stats.file_len = handle.file_len();
                self.stats.backend = Some(handle.backend());
                self.handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                let err = begin_error(path, err);
                error!(%err, "load failed");
                Err(err)
            }
        }
    }

    /// Per-tick poll. Never blocks.
    pub fn update(&mut self) -> Result<Tick, LoadError> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(Tick::Idle);
        };
        if handle.poll() == ReadStatus::Pending {
            self.handle = Some(handle);
            return Ok(Tick::Pending);
        }

        self.stats.polls = handle.polls();
        self.stats.bytes_read = handle.bytes_read();
        self.stats.read_elapsed = handle.elapsed();
        let failure = handle.failure().cloned();
        let path = handle.path().to_path_buf();
        let mut buffer = handle.dispose();

        if let Some(failure) = failure {
            buffer.release();
            let err = LoadError::Read { path, failure };
            error!(%err, "load failed");
            return Err(err);
        }

        let started = Instant::now();
        let scanned = scanner::scan(&buffer);
        buffer.release();
        self.stats.parse_elapsed = Some(started.elapsed());

        match scanned {
            Ok(table) => {
                let records = table.len();
                self.stats.records = records;
                self.table = table;
                info!(
                    path = %path.display(),
                    records,
                    bytes = self.stats.bytes_read,
                    polls = self.stats.polls,
                    read_us = micros(self.stats.read_elapsed),
                    parse_us = micros(self.stats.parse_elapsed),
                    "records loaded"
                );
                Ok(Tick::Loaded { records })
            }
            Err(ScanError::Alloc(source)) => {
                let err = LoadError::Alloc { path, source };
                error!(%err, "load failed");
                Err(err)
            }
            Err(source) => {
                let err = LoadError::Malformed { path, source };
                error!(%err, "load failed");
                Err(err)
            }
        }
    }

    /// True while a read is outstanding.
    pub fn is_loading(&self) -> bool {
        self.handle.is_some()
    }

    /// Logs and returns record `index`.
    ///
    /// # Panics
    /// Panics if `index >= self.table().len()`.
    pub fn show_data(&self, index: usize) -> String {
        let line = self.table.show_record(index);
        info!(index, "{line}");
        line
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Disposes the loaded table. Idempotent.
    pub fn release(&mut self) {
        self.table.dispose();
    }
}

impl Drop for UnmanagedLoader {
    fn drop(&mut self) {
        self.release();
    }
}

fn begin_error(path: &Path, err: io::Error) -> LoadError {
    if err.kind() == io::ErrorKind::OutOfMemory {
        if let Some(source) = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<AllocError>())
        {
            return LoadError::Alloc {
                path: path.to_path_buf(),
                source: *source,
            };
        }
    }
    LoadError::Stat {
        path: path.to_path_buf(),
        source: err,
    }
}

fn micros(elapsed: Option<Duration>) -> u64 {
    elapsed.map_or(0, |d| d.as_micros() as u64)
}
