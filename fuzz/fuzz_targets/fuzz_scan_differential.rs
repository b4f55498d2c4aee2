#![no_main]

use libfuzzer_sys::fuzz_target;
use record_scanner::{count_records, parse_managed, scan_bytes};

fuzz_target!(|data: &[u8]| {
    let scanned = scan_bytes(data);

    if let Ok(table) = &scanned {
        assert_eq!(table.len(), count_records(data));
        for record in table {
            let line = record.to_line();
            let rescanned = scan_bytes(&[line.as_slice(), &b"\n"[..]].concat());
            assert_eq!(rescanned.map(|t| t.len()).ok(), Some(1));
        }
    }

    // The baseline only agrees on UTF-8, line-feed-terminated input without
    // carriage returns or terminator bytes.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.contains(|c: char| c == '\r' || c == '\0') || !(text.is_empty() || text.ends_with('\n')) {
        return;
    }
    match (parse_managed(text), scanned) {
        (Ok(managed), Ok(table)) => {
            assert_eq!(managed.len(), table.len());
            for (m, r) in managed.iter().zip(&table) {
                assert!(m.same_fields(r), "{m:?} vs {r}");
            }
        }
        (Err(_), Err(_)) => {}
        (managed, scanned) => {
            // Extra columns are ignored by the baseline but rejected by the scanner.
            let extra_columns = text.lines().any(|line| line.matches(',').count() > 4);
            assert!(
                extra_columns && managed.is_ok() && scanned.is_err(),
                "disagreement: managed={managed:?} scanned={scanned:?}"
            );
        }
    }
});
