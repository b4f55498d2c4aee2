use super::{ReadFailure, ReadOp, ReadStage};
use crate::raw_buffer::RawBuffer;
use std::fs::File;
use std::io::{self, Read};

/// Reads the whole file during submission. The outcome is parked in
/// `ReadOp::Ready` and surfaces on the handle's next poll.
pub(super) fn read_now(mut file: File, buffer: &mut RawBuffer, max_op_len: usize) -> ReadOp {
    ReadOp::Ready(
        read_whole(&mut file, buffer.as_mut_slice(), max_op_len)
            .map_err(|err| ReadFailure::new(ReadStage::Complete, err)),
    )
}

/// Fills `buf` from the start of `file` in requests of at most `max_op_len`
/// bytes. Stops early at EOF and returns the byte count.
fn read_whole<R: Read>(file: &mut R, buf: &mut [u8], max_op_len: usize) -> io::Result<usize> {
    let mut done = 0;
    while done < buf.len() {
        let end = done + (buf.len() - done).min(max_op_len);
        match file.read(&mut buf[done..end]) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(done)
}
