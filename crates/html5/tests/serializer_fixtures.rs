//! html5lib-tests serializer runner.
//!
//! Reads serializer `.test` JSON under `$HTML5LIB_TESTS/serializer`,
//! materializes each token-stream input into a tree, writes it back as HTML,
//! and accepts any entry of the fixture's `expected` array. Cases with
//! serializer options are skipped (the writer implements the default
//! serialization only). Passes vacuously when the fixture root is not
//! configured.

use html5::{DomTree, Namespace, write_document};
use html5_test_support::json::parse_serializer_file;
use html5_test_support::{fixture_filter, fixture_root, list_files};
use serde_json::Value;

fn namespace_of(url: Option<&str>) -> Namespace {
    match url {
        Some("http://www.w3.org/2000/svg") => Namespace::Svg,
        Some("http://www.w3.org/1998/Math/MathML") => Namespace::MathMl,
        _ => Namespace::Html,
    }
}

/// Build a tree from the fixture's token-stream shape. Returns `None` for
/// token forms the writer contract does not cover.
fn build_tree(input: &[Value]) -> Option<DomTree> {
    let mut tree = DomTree::new_document();
    let mut stack = vec![tree.root()];
    for token in input {
        let parts = token.as_array()?;
        let kind = parts.first()?.as_str()?;
        let parent = *stack.last().unwrap();
        match kind {
            "StartTag" => {
                let namespace = namespace_of(parts.get(1)?.as_str());
                let name = parts.get(2)?.as_str()?.to_string();
                let mut attrs = Vec::new();
                if let Some(list) = parts.get(3).and_then(Value::as_array) {
                    for attr in list {
                        let name = attr.get("name")?.as_str()?.to_string();
                        let value = attr.get("value")?.as_str()?.to_string();
                        attrs.push((name, value));
                    }
                }
                let element = tree.create_element(name, namespace, attrs);
                tree.append(parent, element);
                stack.push(element);
            }
            "EndTag" => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            "EmptyTag" => {
                let name = parts.get(1)?.as_str()?.to_string();
                let mut attrs = Vec::new();
                if let Some(list) = parts.get(2).and_then(Value::as_array) {
                    for attr in list {
                        let name = attr.get("name")?.as_str()?.to_string();
                        let value = attr.get("value")?.as_str()?.to_string();
                        attrs.push((name, value));
                    }
                }
                let element = tree.create_element(name, Namespace::Html, attrs);
                tree.append(parent, element);
            }
            "Characters" => {
                tree.append_text(parent, parts.get(1)?.as_str()?);
            }
            "Comment" => {
                let comment = tree.create_comment(parts.get(1)?.as_str()?.to_string());
                tree.append(parent, comment);
            }
            "Doctype" => {
                let doctype = tree.create_doctype(
                    parts.get(1)?.as_str()?.to_string(),
                    parts.get(2).and_then(Value::as_str).map(str::to_string),
                    parts.get(3).and_then(Value::as_str).map(str::to_string),
                );
                tree.append(parent, doctype);
            }
            _ => return None,
        }
    }
    Some(tree)
}

#[test]
fn html5lib_serializer() {
    let Some(root) = fixture_root() else {
        return;
    };
    let filter = fixture_filter();
    let mut ran = 0usize;
    let mut failures = Vec::new();

    for file in list_files(&root.join("serializer"), "test") {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?")
            .to_string();
        let content = std::fs::read_to_string(&file)
            .unwrap_or_else(|err| panic!("failed to read {file:?}: {err}"));
        let Ok(parsed) = parse_serializer_file(&content) else {
            continue;
        };
        for (idx, test) in parsed.tests.iter().enumerate() {
            let case_id = format!("{name}:{idx} {}", test.description);
            if let Some(filter) = &filter
                && !case_id.contains(filter.as_str())
            {
                continue;
            }
            let has_options = test
                .options
                .as_object()
                .is_some_and(|options| !options.is_empty());
            if has_options {
                continue;
            }
            let Some(tree) = build_tree(&test.input) else {
                continue;
            };
            ran += 1;
            let actual = write_document(&tree);
            if !test.expected.iter().any(|candidate| *candidate == actual) {
                failures.push(format!(
                    "{case_id}\nexpected one of: {:?}\nactual: {actual:?}",
                    test.expected
                ));
            }
        }
    }

    assert!(ran > 0, "fixture root configured but no cases matched");
    assert!(
        failures.is_empty(),
        "{} serializer failures (of {ran}):\n{}",
        failures.len(),
        failures.join("\n\n")
    );
}
