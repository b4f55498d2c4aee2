use crate::common::*;
use record_scanner::{
    read_managed, scan, ReadBackend, ReadStatus, Tick, DEFAULT_MAX_OP_LEN,
};

#[test]
fn sample_file_loads_two_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Sample_full.csv", SAMPLE);

    let mut loader = loader(&path, read_config(ReadBackend::Auto, DEFAULT_MAX_OP_LEN));
    loader.read_data().unwrap();
    assert_eq!(run(&mut loader).unwrap(), Tick::Loaded { records: 2 });

    let table = loader.table();
    assert_eq!(table[0].name, "Slime");
    assert_eq!(
        (table[0].hp, table[0].mp, table[0].attack, table[0].defense),
        (5, 3, 2, 1)
    );
    assert_eq!(table[1].name, "Goblin");
    assert_eq!(
        (table[1].hp, table[1].mp, table[1].attack, table[1].defense),
        (12, 0, 5, 3)
    );
    assert_eq!(
        loader.show_data(0),
        "Name : Slime, HP : 5, MP : 3, Attack : 2, Defense : 1"
    );
}

#[test]
fn backends_produce_identical_tables() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = generated_csv(5_000);
    let path = write_file(dir.path(), "big.csv", &bytes);

    let mut lines = Vec::new();
    for (backend, max_op_len) in [
        (ReadBackend::Auto, DEFAULT_MAX_OP_LEN),
        (ReadBackend::Auto, 4096),
        (ReadBackend::Blocking, DEFAULT_MAX_OP_LEN),
        (ReadBackend::Blocking, 777),
    ] {
        let mut loader = loader(&path, read_config(backend, max_op_len));
        loader.read_data().unwrap();
        assert_eq!(run(&mut loader).unwrap(), Tick::Loaded { records: 5_000 });
        assert_eq!(loader.stats().bytes_read, bytes.len());
        lines.push(
            loader
                .table()
                .iter()
                .map(|r| r.to_line())
                .collect::<Vec<_>>(),
        );
    }
    assert!(lines.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn unmanaged_matches_managed_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "data.csv", &generated_csv(300));

    let mut loader = loader(&path, read_config(ReadBackend::Auto, DEFAULT_MAX_OP_LEN));
    loader.read_data().unwrap();
    run(&mut loader).unwrap();

    let managed = read_managed(&path).unwrap();
    assert_eq!(managed.len(), loader.table().len());
    for (m, r) in managed.iter().zip(loader.table()) {
        assert!(m.same_fields(r), "{m:?} vs {r}");
    }
}

#[test]
fn empty_and_terminator_only_files_yield_empty_tables() {
    let dir = tempfile::tempdir().unwrap();
    for (name, bytes) in [("empty.csv", &b""[..]), ("nul.csv", &b"\0"[..])] {
        let path = write_file(dir.path(), name, bytes);
        let mut loader = loader(&path, read_config(ReadBackend::Auto, DEFAULT_MAX_OP_LEN));
        loader.read_data().unwrap();
        assert_eq!(run(&mut loader).unwrap(), Tick::Loaded { records: 0 });
        assert!(loader.table().is_created());
        assert_eq!(loader.table().len(), 0);
    }
}

#[test]
fn read_protocol_without_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "sample.csv", SAMPLE);

    let mut handle = begin(&path, read_config(ReadBackend::Auto, 8));
    assert_eq!(handle.status(), ReadStatus::Pending);
    assert_eq!(poll_to_terminal(&mut handle), ReadStatus::Complete);
    assert_eq!(handle.bytes_read(), SAMPLE.len());
    assert_eq!(handle.path(), path.as_path());

    let mut buffer = handle.dispose();
    let table = scan(&buffer).unwrap();
    buffer.release();
    assert!(buffer.is_released());
    assert_eq!(table.len(), 2);
    assert_eq!(table[1].name, "Goblin");
}
