//! Structural properties of `scan_bytes` over generated record files.

use proptest::prelude::*;
use record_scanner::{count_records, scan_bytes, ScanError};

/// Names: printable ASCII without delimiters.
fn name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _.-]{0,12}"
}

fn row() -> impl Strategy<Value = (String, [i32; 4])> {
    (name(), any::<[i32; 4]>())
}

fn render(rows: &[(String, [i32; 4])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, [hp, mp, attack, defense]) in rows {
        out.extend_from_slice(format!("{name},{hp},{mp},{attack},{defense}\n").as_bytes());
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn table_len_equals_line_feed_count(
        rows in prop::collection::vec(row(), 0..40),
        tail in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let mut src = render(&rows);
        src.push(0);
        src.extend_from_slice(&tail);

        let table = scan_bytes(&src).unwrap();
        prop_assert_eq!(table.len(), rows.len());
        prop_assert_eq!(table.len(), count_records(&src));
    }

    #[test]
    fn records_rejoin_to_source_lines(rows in prop::collection::vec(row(), 0..40)) {
        let src = render(&rows);
        let table = scan_bytes(&src).unwrap();
        let lines: Vec<&[u8]> = src.split(|&b| b == b'\n').collect();
        for (i, record) in table.iter().enumerate() {
            prop_assert_eq!(record.to_line(), lines[i].to_vec());
        }
    }

    #[test]
    fn unterminated_trailing_line_is_dropped(
        rows in prop::collection::vec(row(), 0..10),
        last in row(),
    ) {
        let mut src = render(&rows);
        let tail = render(std::slice::from_ref(&last));
        src.extend_from_slice(&tail[..tail.len() - 1]);

        let table = scan_bytes(&src).unwrap();
        prop_assert_eq!(table.len(), rows.len());
    }

    #[test]
    fn short_lines_are_rejected(
        rows in prop::collection::vec(row(), 0..10),
        bad in row(),
        keep in 1usize..4,
    ) {
        let (name, values) = &bad;
        let mut line = name.clone();
        for value in &values[..keep] {
            line.push_str(&format!(",{value}"));
        }
        line.push('\n');

        let mut src = render(&rows);
        src.extend_from_slice(line.as_bytes());

        match scan_bytes(&src) {
            Err(ScanError::ColumnCount { record, commas, .. }) => {
                prop_assert_eq!(record, rows.len());
                prop_assert_eq!(commas, keep);
            }
            other => prop_assert!(false, "expected ColumnCount, got {:?}", other),
        }
    }

    #[test]
    fn scan_is_total_on_arbitrary_bytes(src in prop::collection::vec(any::<u8>(), 0..512)) {
        // Must return (Ok or Err) without panicking or leaking.
        let _ = scan_bytes(&src);
    }
}
