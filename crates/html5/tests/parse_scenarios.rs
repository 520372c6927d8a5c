//! End-to-end scenarios and quantified invariants, self-contained (no
//! external fixture checkout required).

use html5::{
    DomTree, Event, Namespace, NodeId, NodeKind, ParseOpts, QuirksMode, extract_text, parse,
    parse_bytes, query_all, serialize_test_format, stream_events, write_document,
};

fn parse_ok(input: &str) -> html5::ParseResult {
    parse(input, ParseOpts::default()).expect("non-strict parse is total")
}

// --- the eight concrete scenarios ---

#[test]
fn scenario_minimal_document() {
    let opts = ParseOpts {
        collect_errors: true,
        ..ParseOpts::default()
    };
    let result = parse("<html><head></head><body><p>Hello</p></body></html>", opts).unwrap();
    assert_eq!(
        serialize_test_format(&result.dom),
        "| <html>\n|   <head>\n|   <body>\n|     <p>\n|       \"Hello\""
    );
    assert_eq!(extract_text(&result.dom), "Hello");
    // No doctype: the only expected error is the missing-doctype one.
    assert!(
        result
            .errors
            .iter()
            .all(|e| e.code.starts_with("expected-doctype"))
    );
}

#[test]
fn scenario_foster_parenting() {
    let result = parse_ok("<table>A<tr><td>B");
    let out = serialize_test_format(&result.dom);
    let text_pos = out.find("\"A\"").unwrap();
    let table_pos = out.find("<table>").unwrap();
    assert!(text_pos < table_pos, "text must precede the table:\n{out}");
    assert!(out.contains("<td>\n|             \"B\""));
}

#[test]
fn scenario_adoption_agency() {
    let result = parse_ok("<p>1<b>2<i>3</b>4</i>5");
    assert_eq!(
        serialize_test_format(&result.dom),
        "| <html>\n|   <head>\n|   <body>\n|     <p>\n|       \"1\"\n|       <b>\n|         \"2\"\n|         <i>\n|           \"3\"\n|       <i>\n|         \"4\"\n|       \"5\""
    );
}

#[test]
fn scenario_template_content() {
    let result = parse_ok("<template><div>X</div></template>");
    let template = query_all(&result.dom, "template").unwrap()[0];
    assert!(result.dom.children(template).is_empty());
    let contents = result.dom.template_contents(template).unwrap();
    assert!(matches!(
        result.dom.kind(contents),
        NodeKind::Fragment
    ));
    let div = result.dom.children(contents)[0];
    assert_eq!(result.dom.element_name(div), Some("div"));
}

#[test]
fn scenario_foreign_breakout() {
    let result = parse_ok("<svg><b>hi</b></svg>");
    let svg = query_all(&result.dom, "svg").unwrap()[0];
    let b = query_all(&result.dom, "b").unwrap()[0];
    assert_eq!(result.dom.namespace(svg), Some(Namespace::Svg));
    assert_eq!(result.dom.parent(b), result.dom.parent(svg));
    assert!(result.dom.children(svg).is_empty());
}

#[test]
fn scenario_meta_charset_sniff() {
    let bytes = b"<html><head><meta charset=\"utf-8\"><title>t</title></head></html>";
    assert_eq!(html5::sniff(bytes, None).encoding, "utf-8");
    assert_eq!(html5::sniff(bytes, None).bom_len, 0);
    let result = parse_bytes(bytes, ParseOpts::default()).unwrap();
    assert_eq!(result.encoding, "utf-8");
}

#[test]
fn scenario_numeric_reference_remap() {
    let result = parse_ok("&#x80;");
    assert_eq!(extract_text(&result.dom), "\u{20AC}");
}

#[test]
fn scenario_streaming_coalesce() {
    let events: Vec<Event> = stream_events("ab&amp;cd").collect();
    assert_eq!(events, vec![Event::Text("ab&cd".to_string())]);
}

// --- quantified invariants ---

fn check_invariants(dom: &DomTree) {
    dom.assert_parent_links();
    for node in dom.descendants(dom.root()) {
        if let NodeKind::Element(element) = dom.kind(node) {
            if element.namespace == Namespace::Html {
                assert!(
                    element
                        .name
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                    "non-canonical html element name {:?}",
                    element.name
                );
            }
            let mut seen: Vec<&str> = Vec::new();
            for (name, _) in &element.attrs {
                assert!(!seen.contains(&name.as_str()), "duplicate attribute {name}");
                seen.push(name);
            }
        }
        let children = dom.children(node);
        for pair in children.windows(2) {
            let both_text = matches!(dom.kind(pair[0]), NodeKind::Text(_))
                && matches!(dom.kind(pair[1]), NodeKind::Text(_));
            assert!(!both_text, "adjacent text siblings survived");
        }
    }
}

#[test]
fn invariants_hold_across_pathological_inputs() {
    let inputs = [
        "<p>1<b>2<i>3</b>4</i>5",
        "<table>A<tr><td>B</td></tr>C</table>D",
        "<b><i><u></b></i>x",
        "<TABLE foo=bar foo=baz><svg><desc><div>x",
        "<template><tr><td>x</td></tr></template>",
        "<select><option>a<option>b</select>",
        "<math><annotation-xml encoding='text/html'><p>x",
        "<!doctype html><frameset><frame>",
        "a\0b<p>\0</p>",
    ];
    for input in inputs {
        let result = parse_ok(input);
        check_invariants(&result.dom);
    }
}

// --- round-trip laws ---

#[test]
fn html_writer_round_trip_is_stable() {
    let inputs = [
        "<!DOCTYPE html><p class=\"x\">a<b>c</b></p>",
        "<table><tr><td>1</td><td>2</td></tr></table>",
        "<ul><li>a</li><li>b</li></ul>",
        "<script>if (a < b) {}</script><p>after</p>",
    ];
    for input in inputs {
        let first = parse_ok(input);
        let markup = write_document(&first.dom);
        let second = parse(&markup, ParseOpts::default()).unwrap();
        assert_eq!(
            serialize_test_format(&first.dom),
            serialize_test_format(&second.dom),
            "writer round trip diverged for {input:?}"
        );
    }
}

#[test]
fn stream_text_matches_tree_text() {
    let input = "<div>Hello <b>wo</b>rld</div>";
    let streamed: String = stream_events(input)
        .filter_map(|event| match event {
            Event::Text(text) => Some(text),
            _ => None,
        })
        .collect();
    let result = parse_ok(input);
    let mut tree_text = String::new();
    collect_text(&result.dom, result.dom.root(), &mut tree_text);
    assert_eq!(streamed, tree_text);
}

#[test]
fn stream_tag_events_match_created_elements() {
    let input = "<div><p>a</p><span>b</span></div>";
    let starts = stream_events(input)
        .filter(|event| matches!(event, Event::Start { .. }))
        .count();
    let result = parse_ok(input);
    let elements = result
        .dom
        .descendants(result.dom.root())
        .into_iter()
        .filter(|&n| {
            // html/head/body are synthesized, not token-created.
            result.dom.as_element(n).is_some_and(|e| {
                !matches!(e.name.as_str(), "html" | "head" | "body")
            })
        })
        .count();
    assert_eq!(starts, elements);
}

fn collect_text(dom: &DomTree, node: NodeId, out: &mut String) {
    if let NodeKind::Text(data) = dom.kind(node) {
        out.push_str(data);
    }
    for &child in dom.children(node) {
        collect_text(dom, child, out);
    }
}

// --- ancillary behaviors the façade promises ---

#[test]
fn quirks_modes_from_doctypes() {
    let cases = [
        ("<!DOCTYPE html><p>", QuirksMode::NoQuirks),
        ("<p>", QuirksMode::Quirks),
        (
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01 Frameset//\"><p>",
            QuirksMode::Quirks,
        ),
        (
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\"><p>",
            QuirksMode::LimitedQuirks,
        ),
    ];
    for (input, expected) in cases {
        let result = parse_ok(input);
        assert_eq!(result.dom.quirks_mode, expected, "{input:?}");
    }
}

#[test]
fn iframe_srcdoc_suppresses_missing_doctype_quirks() {
    let opts = ParseOpts {
        iframe_srcdoc: true,
        collect_errors: true,
        ..ParseOpts::default()
    };
    let result = parse("<p>x", opts).unwrap();
    assert_eq!(result.dom.quirks_mode, QuirksMode::NoQuirks);
    assert!(result.errors.is_empty());
}

#[test]
fn windows_1252_fallback_decodes_bytes() {
    let result = parse_bytes(b"caf\xE9", ParseOpts::default()).unwrap();
    assert_eq!(result.encoding, "windows-1252");
    assert_eq!(extract_text(&result.dom), "caf\u{E9}");
}
