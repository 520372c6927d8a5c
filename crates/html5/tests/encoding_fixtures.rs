//! html5lib-tests encoding-sniffing runner.
//!
//! Reads `.dat` files under `$HTML5LIB_TESTS/encoding` (the `scripted/`
//! subtree is skipped), sniffs each `#data` payload, and compares the
//! canonical label against `#encoding`. Expected labels outside the
//! supported closed set are skipped. Passes vacuously when the fixture root
//! is not configured.

use html5::{canonical_label, sniff};
use html5_test_support::dat::encoding_cases;
use html5_test_support::{fixture_filter, fixture_root, list_files};

#[test]
fn html5lib_encoding() {
    let Some(root) = fixture_root() else {
        return;
    };
    let filter = fixture_filter();
    let mut ran = 0usize;
    let mut failures = Vec::new();

    for file in list_files(&root.join("encoding"), "dat") {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?")
            .to_string();
        let content = std::fs::read_to_string(&file)
            .unwrap_or_else(|err| panic!("failed to read {file:?}: {err}"));
        for (idx, case) in encoding_cases(&content).iter().enumerate() {
            let case_id = format!("{name}:{idx}");
            if let Some(filter) = &filter
                && !case_id.contains(filter.as_str())
            {
                continue;
            }
            // Labels outside the supported closed set cannot sniff correctly.
            let Some(expected) = canonical_label(&case.encoding) else {
                continue;
            };
            ran += 1;
            let sniffed = sniff(&case.data, None);
            if sniffed.encoding != expected {
                failures.push(format!(
                    "{case_id}: expected {expected}, sniffed {}",
                    sniffed.encoding
                ));
            }
        }
    }

    assert!(ran > 0, "fixture root configured but no cases matched");
    assert!(
        failures.is_empty(),
        "{} encoding failures (of {ran}):\n{}",
        failures.len(),
        failures.join("\n")
    );
}
