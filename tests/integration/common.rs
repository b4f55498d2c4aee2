use record_scanner::{
    AsyncFileReader, AsyncReadConfig, LoadError, LoaderConfig, ReadBackend, ReadHandle,
    ReadStatus, Tick, UnmanagedLoader,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

pub const SAMPLE: &[u8] = b"Slime,5,3,2,1\nGoblin,12,0,5,3\n\0";

pub const POLL_LIMIT: usize = 20_000;

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

pub fn read_config(backend: ReadBackend, max_op_len: usize) -> AsyncReadConfig {
    AsyncReadConfig {
        backend,
        max_op_len,
    }
}

pub fn loader(path: &Path, read: AsyncReadConfig) -> UnmanagedLoader {
    UnmanagedLoader::new(LoaderConfig {
        path: path.to_path_buf(),
        read,
    })
    .unwrap()
}

/// Ticks the loader until the load reports a terminal outcome.
pub fn run(loader: &mut UnmanagedLoader) -> Result<Tick, LoadError> {
    for _ in 0..POLL_LIMIT {
        match loader.update()? {
            Tick::Pending => thread::sleep(Duration::from_micros(50)),
            tick => return Ok(tick),
        }
    }
    panic!("load did not finish within {POLL_LIMIT} ticks");
}

pub fn begin(path: &Path, read: AsyncReadConfig) -> ReadHandle {
    AsyncFileReader::new(read).unwrap().begin_read(path).unwrap()
}

pub fn poll_to_terminal(handle: &mut ReadHandle) -> ReadStatus {
    for _ in 0..POLL_LIMIT {
        let status = handle.poll();
        if status != ReadStatus::Pending {
            return status;
        }
        thread::sleep(Duration::from_micros(50));
    }
    panic!("read did not finish within {POLL_LIMIT} polls");
}

/// Deterministic sample of `rows` well-formed lines.
pub fn generated_csv(rows: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..rows {
        let line = format!(
            "Monster{i},{},{},{},{}\n",
            i * 7 % 1000,
            i * 13 % 500,
            (i as i64 * 31 % 200) - 100,
            i % 97
        );
        out.extend_from_slice(line.as_bytes());
    }
    out
}
