//! Single-shot asynchronous whole-file reads with poll-based completion.
//!
//! This module provides:
//! - Linux io_uring reads submitted without waiting and reaped by polling
//!   the completion queue.
//! - macOS POSIX AIO reads polled with `aio_error`.
//! - A blocking fallback that reads during submission and reports on the
//!   next poll, for platforms (or sandboxes) without an async facility.
//!
//! # Protocol
//! `begin_read` stats the file, allocates a [`RawBuffer`] of exactly that
//! size, and submits one read covering the whole file. The returned
//! [`ReadHandle`] owns the buffer until disposal, so nothing can read or
//! free it while the kernel may still write to it. Callers poll once per
//! tick until the status leaves `Pending`, then `dispose` the handle to get
//! the buffer back and release it themselves.
//!
//! # Invariants
//! - At most one operation is in flight per handle.
//! - Status only moves `Pending -> Complete | Failed`; terminal states are
//!   sticky and repeated polls return them unchanged.
//! - A handle dropped or disposed with a read still in flight drains the
//!   operation before releasing anything. If draining fails the buffer is
//!   leaked instead of freed under the kernel.

use crate::raw_buffer::RawBuffer;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

mod blocking;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;

/// Default cap on a single submitted read (bytes).
///
/// io_uring lengths are `u32`; the cap is aligned down so resubmissions for
/// the remainder of a large file start on a page boundary.
pub const DEFAULT_MAX_OP_LEN: usize = (u32::MAX as usize) & !(RawBuffer::ALIGN - 1);

/// Which I/O facility performs the read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadBackend {
    /// Platform default, falling back to `Blocking` when the kernel refuses
    /// the async facility.
    #[default]
    Auto,
    /// io_uring (Linux only).
    Uring,
    /// POSIX AIO (macOS only).
    Aio,
    /// Read during submission; completion is observed on the next poll.
    Blocking,
}

impl ReadBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Uring => "uring",
            Self::Aio => "aio",
            Self::Blocking => "blocking",
        }
    }

    /// True if this backend can run on the current platform.
    pub fn is_available(self) -> bool {
        match self {
            Self::Auto | Self::Blocking => true,
            Self::Uring => cfg!(target_os = "linux"),
            Self::Aio => cfg!(target_os = "macos"),
        }
    }

    /// Resolves `Auto` to the platform's preferred backend.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(target_os = "linux") => Self::Uring,
            Self::Auto if cfg!(target_os = "macos") => Self::Aio,
            Self::Auto => Self::Blocking,
            other => other,
        }
    }
}

impl fmt::Display for ReadBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "uring" | "io_uring" => Ok(Self::Uring),
            "aio" => Ok(Self::Aio),
            "blocking" | "sync" => Ok(Self::Blocking),
            other => Err(format!(
                "unknown read backend '{other}' (expected auto, uring, aio, or blocking)"
            )),
        }
    }
}

/// Configuration for [`AsyncFileReader`].
#[derive(Clone, Debug)]
pub struct AsyncReadConfig {
    /// I/O facility used for submissions.
    pub backend: ReadBackend,
    /// Largest single read submitted (bytes). Short or capped reads are
    /// resubmitted for the remainder while the handle stays `Pending`.
    pub max_op_len: usize,
}

impl Default for AsyncReadConfig {
    fn default() -> Self {
        Self {
            backend: ReadBackend::Auto,
            max_op_len: DEFAULT_MAX_OP_LEN,
        }
    }
}

/// Observable state of a read handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    Pending,
    Complete,
    /// The reason is available through [`ReadHandle::failure`].
    Failed,
}

impl ReadStatus {
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

/// Step of the read protocol that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStage {
    Open,
    Submit,
    Complete,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Submit => "submit",
            Self::Complete => "completion",
        })
    }
}

/// Terminal failure of a read, with the underlying OS error.
#[derive(Clone, Debug)]
pub struct ReadFailure {
    stage: ReadStage,
    error: Arc<io::Error>,
}

impl ReadFailure {
    pub(crate) fn new(stage: ReadStage, error: io::Error) -> Self {
        Self {
            stage,
            error: Arc::new(error),
        }
    }

    pub fn stage(&self) -> ReadStage {
        self.stage
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.error.kind()
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.error.raw_os_error()
    }

    pub fn io_error(&self) -> &io::Error {
        &self.error
    }
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "read {} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for ReadFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.error)
    }
}

/// Result of polling an in-flight operation once.
enum Progress {
    Pending,
    /// Total bytes read into the buffer.
    Done(usize),
}

/// Async submission the kernel refused; the file is handed back so the
/// caller can fall back to another backend.
#[cfg_attr(
    not(any(target_os = "linux", target_os = "macos")),
    allow(dead_code)
)]
struct SubmitRejected {
    file: File,
    error: io::Error,
}

enum ReadOp {
    /// Finished during submission; reported on the next poll.
    Ready(Result<usize, ReadFailure>),
    #[cfg(target_os = "linux")]
    Uring(linux::UringRead),
    #[cfg(target_os = "macos")]
    Aio(macos::AioRead),
    /// I/O resources released.
    Closed,
}

/// Issues whole-file reads. Holds configuration only; every handle owns its
/// own I/O resources.
#[derive(Clone, Debug)]
pub struct AsyncFileReader {
    config: AsyncReadConfig,
}

impl AsyncFileReader {
    /// Creates a reader, rejecting configurations this platform cannot run.
    pub fn new(config: AsyncReadConfig) -> io::Result<Self> {
        if config.max_op_len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "max_op_len must be > 0",
            ));
        }
        if !config.backend.is_available() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} backend is not available on this platform", config.backend),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &AsyncReadConfig {
        &self.config
    }

    /// Stats `path`, allocates a buffer of its size, and submits one read
    /// covering the whole file.
    ///
    /// # Errors
    /// Only the metadata lookup and the buffer allocation fail here. Open
    /// and submission failures are reported as `Failed` by the first poll.
    pub fn begin_read(&self, path: impl AsRef<Path>) -> io::Result<ReadHandle> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        let file_len = usize::try_from(metadata.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "file does not fit in memory")
        })?;
        let mut buffer = RawBuffer::alloc(file_len)
            .map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))?;

        let started = Instant::now();
        let (backend, op) = self.submit(path, &mut buffer);
        debug!(path = %path.display(), len = file_len, %backend, "whole-file read submitted");

        Ok(ReadHandle {
            path: path.to_path_buf(),
            backend,
            buffer,
            op,
            status: ReadStatus::Pending,
            failure: None,
            file_len,
            bytes_read: 0,
            polls: 0,
            started,
            elapsed: None,
        })
    }

    fn submit(&self, path: &Path, buffer: &mut RawBuffer) -> (ReadBackend, ReadOp) {
        let backend = self.config.backend.resolve();
        if buffer.is_empty() {
            return (backend, ReadOp::Ready(Ok(0)));
        }

        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                return (
                    backend,
                    ReadOp::Ready(Err(ReadFailure::new(ReadStage::Open, err))),
                )
            }
        };

        let max_op_len = self.config.max_op_len;
        match start_op(backend, file, buffer, max_op_len) {
            Ok(op) => (backend, op),
            Err(SubmitRejected { file, error })
                if self.config.backend == ReadBackend::Auto && is_async_unsupported(&error) =>
            {
                warn!(%backend, %error, "async read facility unavailable; using blocking reads");
                (
                    ReadBackend::Blocking,
                    blocking::read_now(file, buffer, max_op_len),
                )
            }
            Err(SubmitRejected { error, .. }) => (
                backend,
                ReadOp::Ready(Err(ReadFailure::new(ReadStage::Submit, error))),
            ),
        }
    }
}

fn start_op(
    backend: ReadBackend,
    file: File,
    buffer: &mut RawBuffer,
    max_op_len: usize,
) -> Result<ReadOp, SubmitRejected> {
    match backend {
        #[cfg(target_os = "linux")]
        ReadBackend::Uring => linux::UringRead::start(file, buffer, max_op_len).map(ReadOp::Uring),
        #[cfg(target_os = "macos")]
        ReadBackend::Aio => macos::AioRead::start(file, buffer, max_op_len).map(ReadOp::Aio),
        _ => Ok(blocking::read_now(file, buffer, max_op_len)),
    }
}

/// Errors meaning "this kernel/sandbox will not do async reads at all".
fn is_async_unsupported(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        matches!(
            err.raw_os_error(),
            Some(libc::ENOSYS) | Some(libc::EPERM) | Some(libc::EOPNOTSUPP)
        )
    }
    #[cfg(not(unix))]
    {
        err.kind() == io::ErrorKind::Unsupported
    }
}

/// One outstanding whole-file read and the buffer it fills.
pub struct ReadHandle {
    path: PathBuf,
    backend: ReadBackend,
    buffer: RawBuffer,
    op: ReadOp,
    status: ReadStatus,
    failure: Option<ReadFailure>,
    file_len: usize,
    bytes_read: usize,
    polls: u64,
    started: Instant,
    elapsed: Option<Duration>,
}

impl ReadHandle {
    /// Non-blocking completion check. Safe to call every tick; once terminal
    /// it keeps returning the same status.
    pub fn poll(&mut self) -> ReadStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        self.polls = self.polls.saturating_add(1);

        let progress = match &mut self.op {
            ReadOp::Ready(result) => result.clone().map(Progress::Done),
            #[cfg(target_os = "linux")]
            ReadOp::Uring(op) => op.poll(&mut self.buffer),
            #[cfg(target_os = "macos")]
            ReadOp::Aio(op) => op.poll(&mut self.buffer),
            ReadOp::Closed => Ok(Progress::Done(self.bytes_read)),
        };

        match progress {
            Ok(Progress::Pending) => {}
            Ok(Progress::Done(read)) => {
                self.bytes_read = read;
                self.finish(ReadStatus::Complete);
            }
            Err(failure) => {
                self.failure = Some(failure);
                self.finish(ReadStatus::Failed);
            }
        }
        self.status
    }

    fn finish(&mut self, status: ReadStatus) {
        self.status = status;
        self.elapsed = Some(self.started.elapsed());
        debug!(
            path = %self.path.display(),
            ?status,
            bytes_read = self.bytes_read,
            polls = self.polls,
            "whole-file read finished"
        );
    }

    /// Last status observed by [`ReadHandle::poll`].
    pub fn status(&self) -> ReadStatus {
        self.status
    }

    /// Reason for a `Failed` status.
    pub fn failure(&self) -> Option<&ReadFailure> {
        self.failure.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backend that actually carries the read (after any fallback).
    pub fn backend(&self) -> ReadBackend {
        self.backend
    }

    /// File size at submission; the buffer's length.
    pub fn file_len(&self) -> usize {
        self.file_len
    }

    /// Bytes delivered by the completed read. Less than `file_len` if the
    /// file shrank after submission.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Number of polls that found the read outstanding or finished it.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Submission-to-terminal latency, once terminal.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Releases the handle's I/O resources and returns the buffer.
    ///
    /// Call once after a terminal status. The caller owns the returned
    /// buffer and must release it (dropping also releases).
    ///
    /// Disposing while still `Pending` waits for the outstanding read to
    /// quiesce first; the buffer keeps its full length but its contents
    /// are unspecified, since the read may have stopped partway.
    pub fn dispose(mut self) -> RawBuffer {
        self.close();
        std::mem::take(&mut self.buffer)
    }

    fn close(&mut self) {
        let quiesced = match &mut self.op {
            #[cfg(target_os = "linux")]
            ReadOp::Uring(op) => op.drain(),
            #[cfg(target_os = "macos")]
            ReadOp::Aio(op) => op.drain(),
            ReadOp::Ready(_) | ReadOp::Closed => true,
        };
        if !quiesced {
            error!(
                path = %self.path.display(),
                "in-flight read could not be drained; leaking its buffer"
            );
            std::mem::forget(std::mem::take(&mut self.buffer));
        }
        self.op = ReadOp::Closed;
    }
}

impl Drop for ReadHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ReadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("path", &self.path)
            .field("backend", &self.backend)
            .field("status", &self.status)
            .field("file_len", &self.file_len)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}
