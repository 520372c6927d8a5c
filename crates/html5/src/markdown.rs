//! HTML to Markdown conversion: a thin consumer over the finished tree.
//!
//! Handles the structural vocabulary (headings, paragraphs, emphasis, links,
//! images, code, lists, quotes, rules). Anything else unwraps to its
//! children's conversion.

use crate::dom::{DomTree, Namespace, NodeId, NodeKind};

/// Convert a parsed tree to Markdown.
pub fn to_markdown(tree: &DomTree) -> String {
    let mut ctx = Ctx {
        out: String::new(),
        quote_depth: 0,
        list_stack: Vec::new(),
    };
    ctx.walk_children(tree, tree.root());
    let trimmed = ctx.out.trim_matches('\n');
    let mut out = String::with_capacity(trimmed.len());
    // Collapse 3+ blank lines down to one blank line.
    let mut newlines = 0;
    for c in trimmed.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(c);
    }
    out
}

enum ListKind {
    Unordered,
    Ordered(u32),
}

struct Ctx {
    out: String,
    quote_depth: usize,
    list_stack: Vec<ListKind>,
}

impl Ctx {
    fn walk_children(&mut self, tree: &DomTree, node: NodeId) {
        for &child in tree.children(node) {
            self.walk(tree, child);
        }
    }

    fn walk(&mut self, tree: &DomTree, node: NodeId) {
        match tree.kind(node) {
            NodeKind::Text(data) => self.push_text(data),
            NodeKind::Element(element) => {
                if element.namespace != Namespace::Html {
                    self.walk_children(tree, node);
                    return;
                }
                match element.name.as_str() {
                    "script" | "style" | "template" | "head" => {}
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let level = element.name.as_bytes()[1] - b'0';
                        self.block_break();
                        for _ in 0..level {
                            self.out.push('#');
                        }
                        self.out.push(' ');
                        self.walk_children(tree, node);
                        self.block_break();
                    }
                    "p" | "div" | "section" | "article" => {
                        self.block_break();
                        self.walk_children(tree, node);
                        self.block_break();
                    }
                    "em" | "i" => self.wrap(tree, node, "*"),
                    "strong" | "b" => self.wrap(tree, node, "**"),
                    "code" => self.wrap(tree, node, "`"),
                    "pre" => {
                        self.block_break();
                        self.out.push_str("```\n");
                        self.out.push_str(&crate::text::extract_text_of(tree, node));
                        self.out.push_str("\n```");
                        self.block_break();
                    }
                    "a" => {
                        let href = tree.attr(node, "href").unwrap_or("").to_string();
                        self.out.push('[');
                        self.walk_children(tree, node);
                        self.out.push_str("](");
                        self.out.push_str(&href);
                        self.out.push(')');
                    }
                    "img" => {
                        let alt = tree.attr(node, "alt").unwrap_or("");
                        let src = tree.attr(node, "src").unwrap_or("");
                        self.out.push_str("![");
                        self.out.push_str(alt);
                        self.out.push_str("](");
                        self.out.push_str(src);
                        self.out.push(')');
                    }
                    "ul" | "ol" => {
                        let kind = if element.name == "ul" {
                            ListKind::Unordered
                        } else {
                            ListKind::Ordered(1)
                        };
                        // Nested lists continue the current block; only a
                        // top-level list gets blank-line separation.
                        let nested = !self.list_stack.is_empty();
                        if nested {
                            if !self.out.is_empty() && !self.out.ends_with('\n') {
                                self.out.push('\n');
                            }
                        } else {
                            self.block_break();
                        }
                        self.list_stack.push(kind);
                        self.walk_children(tree, node);
                        self.list_stack.pop();
                        if !nested {
                            self.block_break();
                        }
                    }
                    "li" => {
                        if !self.out.is_empty() && !self.out.ends_with('\n') {
                            self.out.push('\n');
                        }
                        let depth = self.list_stack.len().saturating_sub(1);
                        self.out.push_str(&"  ".repeat(depth));
                        match self.list_stack.last_mut() {
                            Some(ListKind::Ordered(n)) => {
                                self.out.push_str(&format!("{n}. "));
                                *n += 1;
                            }
                            _ => self.out.push_str("- "),
                        }
                        self.walk_children(tree, node);
                    }
                    "blockquote" => {
                        self.block_break();
                        self.quote_depth += 1;
                        self.out.push_str(&"> ".repeat(self.quote_depth));
                        self.walk_children(tree, node);
                        self.quote_depth -= 1;
                        self.block_break();
                    }
                    "br" => self.out.push_str("  \n"),
                    "hr" => {
                        self.block_break();
                        self.out.push_str("---");
                        self.block_break();
                    }
                    _ => self.walk_children(tree, node),
                }
            }
            _ => self.walk_children(tree, node),
        }
    }

    fn wrap(&mut self, tree: &DomTree, node: NodeId, marker: &str) {
        self.out.push_str(marker);
        self.walk_children(tree, node);
        self.out.push_str(marker);
    }

    fn push_text(&mut self, data: &str) {
        // Inline whitespace collapses; Markdown structure supplies breaks.
        let collapsed: String = data.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            // Whitespace-only runs still separate adjacent inline content.
            if !data.is_empty() && !self.out.is_empty() && !self.out.ends_with(char::is_whitespace)
            {
                self.out.push(' ');
            }
            return;
        }
        if data.starts_with(char::is_whitespace)
            && !self.out.is_empty()
            && !self.out.ends_with(char::is_whitespace)
        {
            self.out.push(' ');
        }
        self.out.push_str(&collapsed);
        if data.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn block_break(&mut self) {
        while self.out.ends_with(' ') {
            self.out.pop();
        }
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            while self.out.ends_with('\n') {
                self.out.pop();
            }
            self.out.push_str("\n\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::to_markdown;
    use crate::{ParseOpts, parse};

    fn md(html: &str) -> String {
        let result = parse(html, ParseOpts::default()).unwrap();
        to_markdown(&result.dom)
    }

    #[test]
    fn headings_paragraphs_and_emphasis() {
        assert_eq!(
            md("<h1>Title</h1><p>Some <em>soft</em> and <strong>hard</strong> text.</p>"),
            "# Title\n\nSome *soft* and **hard** text."
        );
    }

    #[test]
    fn links_images_and_code() {
        assert_eq!(
            md(r#"<p><a href="/x">go</a> <img src="i.png" alt="pic"> <code>f()</code></p>"#),
            "[go](/x) ![pic](i.png) `f()`"
        );
    }

    #[test]
    fn lists_nest_with_indentation() {
        assert_eq!(
            md("<ul><li>a</li><li>b<ol><li>c</li></ol></li></ul>"),
            "- a\n- b\n  1. c"
        );
    }

    #[test]
    fn pre_becomes_a_fence_and_hr_a_rule() {
        assert_eq!(md("<pre>let x = 1;</pre><hr>"), "```\nlet x = 1;\n```\n\n---");
    }
}
