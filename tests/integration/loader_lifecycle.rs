use crate::common::*;
use record_scanner::{LoadError, ReadBackend, Tick, DEFAULT_MAX_OP_LEN};
use std::fs;

#[test]
fn busy_while_outstanding_then_reloadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sample.csv", SAMPLE);
    let mut loader = loader(&path, read_config(ReadBackend::Blocking, DEFAULT_MAX_OP_LEN));

    assert_eq!(loader.update().unwrap(), Tick::Idle);
    loader.read_data().unwrap();
    assert!(matches!(loader.read_data(), Err(LoadError::Busy)));
    assert_eq!(run(&mut loader).unwrap(), Tick::Loaded { records: 2 });

    fs::write(&path, generated_csv(10)).unwrap();
    loader.read_data().unwrap();
    assert!(!loader.table().is_created(), "previous table released on reload");
    assert_eq!(run(&mut loader).unwrap(), Tick::Loaded { records: 10 });
    assert_eq!(loader.table()[9].name, "Monster9");
}

#[test]
fn small_ops_take_multiple_polls() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = generated_csv(200);
    let path = write_file(dir.path(), "sample.csv", &bytes);

    let mut loader = loader(&path, read_config(ReadBackend::Auto, 512));
    loader.read_data().unwrap();
    assert_eq!(run(&mut loader).unwrap(), Tick::Loaded { records: 200 });
    let stats = loader.stats();
    assert_eq!(stats.file_len, bytes.len());
    assert_eq!(stats.bytes_read, bytes.len());
    assert!(stats.polls >= 1);
    assert!(stats.read_elapsed.is_some());
}

#[test]
fn release_is_idempotent_and_drop_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sample.csv", SAMPLE);
    let mut loader = loader(&path, read_config(ReadBackend::Auto, DEFAULT_MAX_OP_LEN));
    loader.read_data().unwrap();
    run(&mut loader).unwrap();

    loader.release();
    loader.release();
    assert!(!loader.table().is_created());
    assert!(loader.table().get(0).is_none());

    // Dropped with a read outstanding.
    loader.read_data().unwrap();
    drop(loader);
}
