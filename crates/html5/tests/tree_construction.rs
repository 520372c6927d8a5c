//! html5lib-tests tree-construction runner.
//!
//! Reads every `.dat` under `$HTML5LIB_TESTS/tree-construction`, parses
//! `#data` (as a fragment when `#document-fragment` is present), serializes
//! in the test format, and compares right-stripped lines against
//! `#document`. `#script-on` fixtures are skipped. Passes vacuously when the
//! fixture root is not configured.

use html5::{FragmentContext, Namespace, ParseOpts, parse, serialize_test_format};
use html5_test_support::dat::tree_construction_cases;
use html5_test_support::{diff_lines, fixture_filter, fixture_root, list_files};

fn fragment_context_of(context: &str) -> FragmentContext {
    match context.split_once(' ') {
        Some(("svg", name)) => FragmentContext {
            tag_name: name.to_string(),
            namespace: Some(Namespace::Svg),
        },
        Some(("math", name)) => FragmentContext {
            tag_name: name.to_string(),
            namespace: Some(Namespace::MathMl),
        },
        _ => FragmentContext {
            tag_name: context.to_string(),
            namespace: None,
        },
    }
}

#[test]
fn html5lib_tree_construction() {
    let Some(root) = fixture_root() else {
        return;
    };
    let filter = fixture_filter();
    let mut ran = 0usize;
    let mut failures = Vec::new();

    for file in list_files(&root.join("tree-construction"), "dat") {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?")
            .to_string();
        let content = std::fs::read_to_string(&file)
            .unwrap_or_else(|err| panic!("failed to read {file:?}: {err}"));
        for (idx, case) in tree_construction_cases(&content).iter().enumerate() {
            let case_id = format!("{name}:{idx}");
            if let Some(filter) = &filter
                && !case_id.contains(filter.as_str())
            {
                continue;
            }
            if case.script_mode == Some(true) {
                continue;
            }
            ran += 1;

            let mut opts = ParseOpts {
                fragment_context: case.fragment.as_deref().map(fragment_context_of),
                iframe_srcdoc: case.iframe_srcdoc,
                ..ParseOpts::default()
            };
            opts.tokenizer.xml_coercion = case.xml_coercion;

            let result = parse(&case.data, opts).expect("non-strict parse is total");
            let actual: Vec<String> = serialize_test_format(&result.dom)
                .lines()
                .map(|l| l.trim_end().to_string())
                .collect();
            let expected: Vec<String> = case
                .document
                .iter()
                .map(|l| l.trim_end().to_string())
                .collect();
            if actual != expected {
                failures.push(format!(
                    "{case_id}\n#data\n{}\n{}",
                    case.data,
                    diff_lines(&expected, &actual)
                ));
            }
        }
    }

    assert!(ran > 0, "fixture root configured but no cases matched");
    assert!(
        failures.is_empty(),
        "{} tree-construction failures (of {ran}):\n{}",
        failures.len(),
        failures.join("\n")
    );
}
