//! Text extraction: the visible character data of a tree, in tree order.

use crate::dom::{DomTree, Namespace, NodeId, NodeKind};
use crate::tags::TagFlags;

/// Extract the text content of the whole tree. `script`, `style`, and
/// template subtrees are skipped; block boundaries become newlines.
pub fn extract_text(tree: &DomTree) -> String {
    let mut out = String::new();
    collect(tree, tree.root(), &mut out);
    // Collapse the boundary newlines the walk accumulates at the edges.
    out.trim_matches('\n').to_string()
}

/// Extract the text content of one subtree.
pub fn extract_text_of(tree: &DomTree, node: NodeId) -> String {
    let mut out = String::new();
    collect(tree, node, &mut out);
    out.trim_matches('\n').to_string()
}

fn collect(tree: &DomTree, node: NodeId, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text(data) => out.push_str(data),
        NodeKind::Element(element) => {
            if element.namespace == Namespace::Html
                && matches!(element.name.as_str(), "script" | "style" | "template")
            {
                return;
            }
            if element.namespace == Namespace::Html && element.name == "br" {
                out.push('\n');
                return;
            }
            let block = element.namespace == Namespace::Html
                && (TagFlags::of(&element.name).contains(TagFlags::BLOCK_WITH_P)
                    || matches!(element.name.as_str(), "li" | "tr" | "table" | "body"));
            if block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            for &child in tree.children(node) {
                collect(tree, child, out);
            }
            if block && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        _ => {
            for &child in tree.children(node) {
                collect(tree, child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::extract_text;
    use crate::{ParseOpts, parse};

    fn text(html: &str) -> String {
        let result = parse(html, ParseOpts::default()).unwrap();
        extract_text(&result.dom)
    }

    #[test]
    fn simple_paragraph() {
        assert_eq!(
            text("<html><head></head><body><p>Hello</p></body></html>"),
            "Hello"
        );
    }

    #[test]
    fn script_style_and_template_content_is_invisible() {
        assert_eq!(
            text("<p>a</p><script>var x;</script><style>p{}</style><template>t</template><p>b</p>"),
            "a\nb"
        );
    }

    #[test]
    fn block_boundaries_become_newlines() {
        assert_eq!(text("<div>a</div><div>b</div>"), "a\nb");
        assert_eq!(text("x<br>y"), "x\ny");
        assert_eq!(text("<span>a</span><span>b</span>"), "ab");
    }
}
