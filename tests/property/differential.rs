//! Unmanaged scanner vs the managed line-split baseline.

use proptest::prelude::*;
use record_scanner::{parse_managed, scan_bytes};

fn line() -> impl Strategy<Value = String> {
    ("[A-Za-z][A-Za-z0-9 ]{0,10}", any::<[i32; 4]>())
        .prop_map(|(name, [hp, mp, at, df])| format!("{name},{hp},{mp},{at},{df}\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn well_formed_files_agree_field_for_field(lines in prop::collection::vec(line(), 0..64)) {
        let text: String = lines.concat();
        let managed = parse_managed(&text).unwrap();
        let table = scan_bytes(text.as_bytes()).unwrap();

        prop_assert_eq!(managed.len(), table.len());
        for (m, r) in managed.iter().zip(&table) {
            prop_assert!(m.same_fields(r), "{:?} vs {}", m, r);
        }
    }

    #[test]
    fn both_reject_non_numeric_fields(
        lines in prop::collection::vec(line(), 0..8),
        junk in "[a-z]{1,4}",
    ) {
        let mut text: String = lines.concat();
        text.push_str(&format!("Bad,{junk},1,1,1\n"));
        prop_assert!(parse_managed(&text).is_err());
        prop_assert!(scan_bytes(text.as_bytes()).is_err());
    }
}
