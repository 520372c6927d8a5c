//! HTML writer: markup serialization over a finished tree, with the
//! attribute-quoting minimization the serializer fixtures expect. A thin
//! consumer — the conformance oracle is the test-format serializer, not
//! this.

use crate::dom::{DomTree, Namespace, NodeId, NodeKind};
use crate::tags::TagFlags;

/// Serialize the children of `node` as HTML markup.
pub fn write_html(tree: &DomTree, node: NodeId) -> String {
    let mut out = String::new();
    write_children(tree, node, &mut out);
    out
}

/// Serialize the whole document.
pub fn write_document(tree: &DomTree) -> String {
    write_html(tree, tree.root())
}

fn write_children(tree: &DomTree, node: NodeId, out: &mut String) {
    let raw_text_parent = match tree.kind(node) {
        NodeKind::Element(element) if element.namespace == Namespace::Html => matches!(
            element.name.as_str(),
            "style" | "script" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext"
        ),
        _ => false,
    };
    let children: Vec<NodeId> = match tree.kind(node) {
        NodeKind::Element(element) => match element.template_contents {
            Some(contents) => tree.children(contents).to_vec(),
            None => tree.children(node).to_vec(),
        },
        _ => tree.children(node).to_vec(),
    };
    for child in children {
        match tree.kind(child) {
            NodeKind::Document | NodeKind::Fragment => write_children(tree, child, out),
            NodeKind::Doctype { name, .. } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Comment(data) => {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str("-->");
            }
            NodeKind::Text(data) => {
                if raw_text_parent {
                    out.push_str(data);
                } else {
                    escape_text(data, out);
                }
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (name, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push('=');
                    write_attr_value(value, out);
                }
                out.push('>');
                let void = element.namespace == Namespace::Html
                    && TagFlags::of(&element.name).contains(TagFlags::VOID);
                if void {
                    continue;
                }
                write_children(tree, child, out);
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

fn escape_text(data: &str, out: &mut String) {
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Attribute values serialize unquoted when nothing in them needs quoting,
/// double-quoted otherwise.
fn write_attr_value(data: &str, out: &mut String) {
    let unquoted_safe = !data.is_empty()
        && !data.chars().any(|c| {
            matches!(
                c,
                '\t' | '\n' | '\x0C' | '\r' | ' ' | '"' | '\'' | '=' | '<' | '>' | '`'
            )
        });
    if unquoted_safe {
        for c in data.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '\u{A0}' => out.push_str("&nbsp;"),
                c => out.push(c),
            }
        }
        return;
    }
    out.push('"');
    for c in data.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{A0}' => out.push_str("&nbsp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::write_document;
    use crate::dom::{DomTree, Namespace};

    #[test]
    fn writes_markup_with_escaping_and_void_elements() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let p = tree.create_element(
            "p",
            Namespace::Html,
            vec![("title".to_string(), "a\"b".to_string())],
        );
        tree.append(root, p);
        tree.append_text(p, "x < y & z");
        let br = tree.create_element("br", Namespace::Html, Vec::new());
        tree.append(p, br);

        assert_eq!(
            write_document(&tree),
            "<p title=\"a&quot;b\">x &lt; y &amp; z<br></p>"
        );
    }

    #[test]
    fn raw_text_children_are_not_escaped() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let script = tree.create_element("script", Namespace::Html, Vec::new());
        tree.append(root, script);
        tree.append_text(script, "if (a < b) {}");
        assert_eq!(write_document(&tree), "<script>if (a < b) {}</script>");
    }

    #[test]
    fn template_serializes_its_contents() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let template = tree.create_element("template", Namespace::Html, Vec::new());
        tree.append(root, template);
        let contents = tree.attach_template_contents(template);
        tree.append_text(contents, "x");
        assert_eq!(write_document(&tree), "<template>x</template>");
    }
}
