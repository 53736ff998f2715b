#![no_main]

use libfuzzer_sys::fuzz_target;
use tpcheck_core::{compare_counts, count_diagnostics, extract_expected_counts};

fuzz_target!(|data: &[u8]| {
    // Fixtures and compiler output are both arbitrary text; lossy decoding mirrors the runner
    let text = String::from_utf8_lossy(data);

    let expected = extract_expected_counts(&text);
    let actual = count_diagnostics(&text);

    let lines = text.lines().count() as u32;
    assert!(actual.warnings <= lines && actual.errors <= lines);

    let comparison = compare_counts(expected, actual);
    assert_eq!(comparison.is_checkable(), expected.is_fully_present());
});
