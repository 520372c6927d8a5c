//! Test-format serializer.
//!
//! Produces the canonical indented representation used by `html5lib-tests`
//! tree-construction fixtures. This is the conformance oracle: every line
//! starts with `| `, children indent two spaces per level, attributes sort
//! lexicographically by display name.

use crate::dom::{DomTree, Namespace, NodeId, NodeKind};

pub fn serialize_test_format(tree: &DomTree) -> String {
    let mut lines = Vec::new();
    for &child in tree.children(tree.root()) {
        write_node(tree, child, 0, &mut lines);
    }
    lines.join("\n")
}

fn write_node(tree: &DomTree, node: NodeId, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match tree.kind(node) {
        NodeKind::Document | NodeKind::Fragment => {
            for &child in tree.children(node) {
                write_node(tree, child, depth, lines);
            }
        }
        NodeKind::Doctype {
            name,
            public_id,
            system_id,
        } => {
            if public_id.is_some() || system_id.is_some() {
                lines.push(format!(
                    "| {indent}<!DOCTYPE {name} \"{}\" \"{}\">",
                    public_id.as_deref().unwrap_or(""),
                    system_id.as_deref().unwrap_or("")
                ));
            } else if name.is_empty() {
                lines.push(format!("| {indent}<!DOCTYPE >"));
            } else {
                lines.push(format!("| {indent}<!DOCTYPE {name}>"));
            }
        }
        NodeKind::Comment(data) => {
            lines.push(format!("| {indent}<!-- {data} -->"));
        }
        NodeKind::Text(data) => {
            lines.push(format!("| {indent}\"{data}\""));
        }
        NodeKind::Element(element) => {
            let prefix = match element.namespace {
                Namespace::Html => "",
                Namespace::Svg => "svg ",
                Namespace::MathMl => "math ",
            };
            lines.push(format!("| {indent}<{prefix}{}>", element.name));

            let mut attrs: Vec<(String, &str)> = element
                .attrs
                .iter()
                .map(|(name, value)| (display_attr_name(name), value.as_str()))
                .collect();
            attrs.sort();
            let attr_indent = "  ".repeat(depth + 1);
            for (name, value) in attrs {
                lines.push(format!("| {attr_indent}{name}=\"{value}\""));
            }

            if let Some(contents) = element.template_contents {
                lines.push(format!("| {attr_indent}content"));
                for &child in tree.children(contents) {
                    write_node(tree, child, depth + 2, lines);
                }
            }
            for &child in tree.children(node) {
                write_node(tree, child, depth + 1, lines);
            }
        }
    }
}

/// Attributes adjusted into a foreign namespace render their prefix with a
/// space (`xlink href="..."`).
fn display_attr_name(name: &str) -> String {
    for prefix in ["xlink:", "xml:", "xmlns:"] {
        if let Some(rest) = name.strip_prefix(prefix) {
            return format!("{} {rest}", &prefix[..prefix.len() - 1]);
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::serialize_test_format;
    use crate::dom::{DomTree, Namespace};

    #[test]
    fn renders_the_canonical_indented_shape() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let html = tree.create_element("html", Namespace::Html, Vec::new());
        tree.append(root, html);
        let body = tree.create_element("body", Namespace::Html, Vec::new());
        tree.append(html, body);
        let p = tree.create_element(
            "p",
            Namespace::Html,
            vec![("id".to_string(), "x".to_string())],
        );
        tree.append(body, p);
        tree.append_text(p, "Hi");

        let out = serialize_test_format(&tree);
        assert_eq!(
            out,
            "| <html>\n|   <body>\n|     <p>\n|       id=\"x\"\n|       \"Hi\""
        );
    }

    #[test]
    fn attributes_sort_by_display_name() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let div = tree.create_element(
            "div",
            Namespace::Html,
            vec![
                ("zeta".to_string(), "1".to_string()),
                ("alpha".to_string(), "2".to_string()),
            ],
        );
        tree.append(root, div);
        let out = serialize_test_format(&tree);
        let alpha = out.find("alpha").unwrap();
        let zeta = out.find("zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn foreign_elements_and_attributes_get_prefixes() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let svg = tree.create_element(
            "svg",
            Namespace::Svg,
            vec![("xlink:href".to_string(), "#a".to_string())],
        );
        tree.append(root, svg);
        let out = serialize_test_format(&tree);
        assert!(out.contains("| <svg svg>"));
        assert!(out.contains("|   xlink href=\"#a\""));
    }

    #[test]
    fn template_contents_render_behind_a_content_marker() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let template = tree.create_element("template", Namespace::Html, Vec::new());
        tree.append(root, template);
        let contents = tree.attach_template_contents(template);
        let div = tree.create_element("div", Namespace::Html, Vec::new());
        tree.append(contents, div);

        let out = serialize_test_format(&tree);
        assert_eq!(out, "| <template>\n|   content\n|     <div>");
    }

    #[test]
    fn doctype_forms() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        let doctype = tree.create_doctype("html", None, None);
        tree.append(root, doctype);
        assert_eq!(serialize_test_format(&tree), "| <!DOCTYPE html>");

        let mut tree = DomTree::new_document();
        let root = tree.root();
        let doctype = tree.create_doctype(
            "html",
            Some("-//W3C//DTD HTML 4.01//EN".to_string()),
            Some("http://www.w3.org/TR/html4/strict.dtd".to_string()),
        );
        tree.append(root, doctype);
        assert_eq!(
            serialize_test_format(&tree),
            "| <!DOCTYPE html \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">"
        );
    }
}
