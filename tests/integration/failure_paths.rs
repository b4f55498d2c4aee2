use crate::common::*;
use record_scanner::{
    AsyncFileReader, LoadError, ReadBackend, ReadStatus, ScanError, Tick, DEFAULT_MAX_OP_LEN,
};
use std::fs;
use std::io;

#[test]
fn missing_file_fails_before_any_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.csv");

    let reader = AsyncFileReader::new(read_config(ReadBackend::Auto, DEFAULT_MAX_OP_LEN)).unwrap();
    assert_eq!(
        reader.begin_read(&path).unwrap_err().kind(),
        io::ErrorKind::NotFound
    );

    let mut loader = loader(&path, read_config(ReadBackend::Auto, DEFAULT_MAX_OP_LEN));
    let err = loader.read_data().unwrap_err();
    assert!(err.is_io());
    assert!(matches!(err, LoadError::Stat { .. }));
}

#[test]
fn directory_read_fails_and_reports_once() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("sub");
    fs::create_dir(&target).unwrap();
    if fs::metadata(&target).unwrap().len() == 0 {
        return;
    }

    for backend in [ReadBackend::Auto, ReadBackend::Blocking] {
        let mut loader = loader(&target, read_config(backend, DEFAULT_MAX_OP_LEN));
        loader.read_data().unwrap();
        let err = run(&mut loader).unwrap_err();
        match &err {
            LoadError::Read { failure, .. } => {
                #[cfg(target_os = "linux")]
                assert_eq!(failure.raw_os_error(), Some(libc::EISDIR));
                assert!(failure.io_error().raw_os_error().is_some());
            }
            other => panic!("expected read failure, got {other:?}"),
        }
        assert!(!loader.table().is_created());
        assert_eq!(loader.update().unwrap(), Tick::Idle);
    }
}

#[test]
fn malformed_lines_abort_the_parse() {
    let dir = tempfile::tempdir().unwrap();
    let cases: [(&str, &[u8]); 4] = [
        ("short.csv", b"Slime,5,3,2,1\nGoblin,12,0\n"),
        ("long.csv", b"Slime,5,3,2,1,9\n"),
        ("empty_int.csv", b"Slime,,3,2,1\n"),
        ("alpha.csv", b"Slime,5,three,2,1\n"),
    ];
    for (name, bytes) in cases {
        let path = write_file(dir.path(), name, bytes);
        let mut loader = loader(&path, read_config(ReadBackend::Blocking, DEFAULT_MAX_OP_LEN));
        loader.read_data().unwrap();
        match run(&mut loader) {
            Err(LoadError::Malformed { source, .. }) => assert!(
                matches!(
                    source,
                    ScanError::ColumnCount { .. } | ScanError::InvalidInteger { .. }
                ),
                "{name}: {source}"
            ),
            other => panic!("{name}: expected malformed error, got {other:?}"),
        }
        assert!(!loader.table().is_created(), "{name}");
    }
}

#[test]
fn early_disposal_returns_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = generated_csv(20_000);
    let path = write_file(dir.path(), "big.csv", &bytes);

    let handle = begin(&path, read_config(ReadBackend::Auto, 4096));
    let mut buffer = handle.dispose();
    assert_eq!(buffer.len(), bytes.len());
    buffer.release();
    buffer.release();
    assert!(buffer.is_released());

    let mut handle = begin(&path, read_config(ReadBackend::Auto, 4096));
    handle.poll();
    drop(handle);
}

#[test]
fn terminal_status_is_sticky() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sample.csv", SAMPLE);
    let mut handle = begin(&path, read_config(ReadBackend::Auto, DEFAULT_MAX_OP_LEN));
    assert_eq!(poll_to_terminal(&mut handle), ReadStatus::Complete);
    let polls = handle.polls();
    for _ in 0..3 {
        assert_eq!(handle.poll(), ReadStatus::Complete);
    }
    assert_eq!(handle.polls(), polls);
}
