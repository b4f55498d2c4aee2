use super::{Progress, ReadFailure, ReadStage, SubmitRejected};
use crate::raw_buffer::RawBuffer;
use std::fs::File;
use std::io;
use std::mem;
use std::os::unix::io::AsRawFd;
use std::ptr;

/// Whole-file read driven through POSIX AIO.
///
/// The control block is boxed so its address stays fixed while the kernel
/// references it, even if the handle owning this value moves. Short or
/// capped completions are followed by a read for the remainder.
pub(super) struct AioRead {
    cb: Box<libc::aiocb>,
    file: File,
    len: usize,
    done: usize,
    max_op_len: usize,
    in_flight: Option<usize>,
}

impl AioRead {
    /// Submits the first read with `aio_read` without waiting.
    pub(super) fn start(
        file: File,
        buffer: &mut RawBuffer,
        max_op_len: usize,
    ) -> Result<Self, SubmitRejected> {
        // SAFETY: aiocb is plain data; it is fully overwritten before use.
        let mut cb: Box<libc::aiocb> = Box::new(unsafe { mem::zeroed() });
        let req_len = buffer.len().min(max_op_len);
        if let Err(error) = submit_read(&mut cb, &file, buffer, 0, req_len) {
            return Err(SubmitRejected { file, error });
        }

        Ok(Self {
            cb,
            file,
            len: buffer.len(),
            done: 0,
            max_op_len,
            in_flight: Some(req_len),
        })
    }

    /// Non-blocking completion check with `aio_error`.
    pub(super) fn poll(&mut self, buffer: &mut RawBuffer) -> Result<Progress, ReadFailure> {
        let Some(requested) = self.in_flight else {
            return Ok(Progress::Done(self.done));
        };

        // SAFETY: `cb` was initialised by submit_read and is still owned here.
        let err = unsafe { libc::aio_error(&*self.cb) };
        if err == libc::EINPROGRESS {
            return Ok(Progress::Pending);
        }

        // SAFETY: aio_return is called exactly once per finished request.
        let res = unsafe { libc::aio_return(&mut *self.cb) };
        self.in_flight = None;
        if err != 0 {
            let error = if err > 0 {
                io::Error::from_raw_os_error(err)
            } else {
                io::Error::last_os_error()
            };
            return Err(ReadFailure::new(ReadStage::Complete, error));
        }
        if res < 0 {
            return Err(ReadFailure::new(
                ReadStage::Complete,
                io::Error::last_os_error(),
            ));
        }

        let read = (res as usize).min(requested);
        self.done += read;
        if read == 0 || self.done >= self.len {
            return Ok(Progress::Done(self.done));
        }

        let req_len = (self.len - self.done).min(self.max_op_len);
        submit_read(&mut self.cb, &self.file, buffer, self.done, req_len)
            .map_err(|err| ReadFailure::new(ReadStage::Submit, err))?;
        self.in_flight = Some(req_len);
        Ok(Progress::Pending)
    }

    /// Blocks in `aio_suspend` until the outstanding request finishes.
    pub(super) fn drain(&mut self) -> bool {
        while self.in_flight.is_some() {
            let list = [&*self.cb as *const libc::aiocb];
            // SAFETY: the control block stays valid while the request is in flight.
            let ret = unsafe { libc::aio_suspend(list.as_ptr(), 1, ptr::null()) };
            if ret != 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return false;
            }
            // SAFETY: as above.
            if unsafe { libc::aio_error(&*self.cb) } != libc::EINPROGRESS {
                // SAFETY: reaps the finished request exactly once.
                unsafe { libc::aio_return(&mut *self.cb) };
                self.in_flight = None;
            }
        }
        true
    }
}

fn submit_read(
    cb: &mut libc::aiocb,
    file: &File,
    buffer: &mut RawBuffer,
    offset: usize,
    len: usize,
) -> io::Result<()> {
    debug_assert!(offset + len <= buffer.len());
    // SAFETY: `offset + len <= buffer.len()`, inside the buffer's allocation.
    let ptr = unsafe { buffer.as_mut_ptr().add(offset) };

    // SAFETY: aiocb is fully overwritten before use.
    *cb = unsafe { mem::zeroed() };
    cb.aio_fildes = file.as_raw_fd();
    cb.aio_offset = libc::off_t::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset overflow"))?;
    cb.aio_buf = ptr.cast::<libc::c_void>();
    cb.aio_nbytes = len as libc::size_t;
    cb.aio_sigevent.sigev_notify = libc::SIGEV_NONE;

    // SAFETY: `cb` and the target range stay valid and untouched until the
    // request is reaped or drained by the owning handle.
    let ret = unsafe { libc::aio_read(cb) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
impl Drop for AioRead {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        assert!(
            self.in_flight.is_none(),
            "AIO read dropped while in flight; drain before releasing"
        );
    }
}
