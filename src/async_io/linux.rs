use super::{Progress, ReadFailure, ReadStage, SubmitRejected};
use crate::raw_buffer::RawBuffer;
use io_uring::{opcode, types, IoUring};
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

/// One read in flight at a time; the spare entry absorbs nothing but keeps
/// the ring a power of two.
const RING_ENTRIES: u32 = 2;
const READ_USER_DATA: u64 = 0x5245_4144;

/// Whole-file read driven through a private io_uring.
///
/// Requests are capped at `max_op_len`; a short or capped completion is
/// followed by a read for the remainder at the next file offset, so the
/// handle stays pending until the file is exhausted or EOF is observed.
pub(super) struct UringRead {
    ring: IoUring,
    file: File,
    len: usize,
    done: usize,
    max_op_len: usize,
    in_flight: Option<usize>,
}

impl UringRead {
    /// Creates the ring and submits the first read without waiting.
    pub(super) fn start(
        file: File,
        buffer: &mut RawBuffer,
        max_op_len: usize,
    ) -> Result<Self, SubmitRejected> {
        let mut ring = match IoUring::new(RING_ENTRIES) {
            Ok(ring) => ring,
            Err(error) => return Err(SubmitRejected { file, error }),
        };

        let req_len = request_len(buffer.len(), max_op_len);
        if let Err(error) = submit_read(&mut ring, &file, buffer, 0, req_len) {
            return Err(SubmitRejected { file, error });
        }

        Ok(Self {
            ring,
            file,
            len: buffer.len(),
            done: 0,
            max_op_len,
            in_flight: Some(req_len),
        })
    }

    /// Reaps at most one completion without blocking.
    pub(super) fn poll(&mut self, buffer: &mut RawBuffer) -> Result<Progress, ReadFailure> {
        let Some(requested) = self.in_flight else {
            return Ok(Progress::Done(self.done));
        };
        debug_assert_eq!(buffer.len(), self.len);

        let Some(cqe) = self.ring.completion().next() else {
            return Ok(Progress::Pending);
        };
        self.in_flight = None;

        let result = cqe.result();
        if result == -libc::EINTR || result == -libc::EAGAIN {
            self.resubmit(buffer)?;
            return Ok(Progress::Pending);
        }
        if result < 0 {
            return Err(ReadFailure::new(
                ReadStage::Complete,
                io::Error::from_raw_os_error(-result),
            ));
        }

        let read = (result as usize).min(requested);
        self.done += read;
        if read == 0 || self.done >= self.len {
            return Ok(Progress::Done(self.done));
        }

        self.resubmit(buffer)?;
        Ok(Progress::Pending)
    }

    fn resubmit(&mut self, buffer: &mut RawBuffer) -> Result<(), ReadFailure> {
        let req_len = request_len(self.len - self.done, self.max_op_len);
        submit_read(&mut self.ring, &self.file, buffer, self.done, req_len)
            .map_err(|err| ReadFailure::new(ReadStage::Submit, err))?;
        self.in_flight = Some(req_len);
        Ok(())
    }

    /// Blocks until no read is in flight. Returns false if the ring failed
    /// while waiting, in which case the kernel may still own the buffer.
    pub(super) fn drain(&mut self) -> bool {
        while self.in_flight.is_some() {
            if self.ring.completion().next().is_some() {
                self.in_flight = None;
                break;
            }
            match self.ring.submit_and_wait(1) {
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return false,
            }
        }
        true
    }
}

fn request_len(remaining: usize, max_op_len: usize) -> usize {
    remaining.min(max_op_len).min(u32::MAX as usize)
}

fn submit_read(
    ring: &mut IoUring,
    file: &File,
    buffer: &mut RawBuffer,
    offset: usize,
    len: usize,
) -> io::Result<()> {
    debug_assert!(offset + len <= buffer.len());
    // SAFETY: `offset + len <= buffer.len()`, so the target range lies inside
    // the buffer's allocation.
    let ptr = unsafe { buffer.as_mut_ptr().add(offset) };
    let entry = opcode::Read::new(types::Fd(file.as_raw_fd()), ptr, len as u32)
        .offset(offset as u64)
        .build()
        .user_data(READ_USER_DATA);

    // SAFETY: the owning ReadHandle keeps `buffer` and `file` alive and
    // untouched until this entry's completion is reaped or drained.
    unsafe {
        ring.submission()
            .push(&entry)
            .map_err(|_| io::Error::other("io_uring submission queue full"))?;
    }
    ring.submit()?;
    Ok(())
}

#[cfg(test)]
impl Drop for UringRead {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        assert!(
            self.in_flight.is_none(),
            "io_uring read dropped while in flight; drain before releasing"
        );
    }
}
