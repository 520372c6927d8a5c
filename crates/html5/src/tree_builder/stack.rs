//! Stack of open elements and the scope predicates over it.

use crate::dom::{DomTree, Namespace, NodeId};
use crate::tags::TagFlags;

/// Scope flavors for end-tag handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    /// HTML "in scope" baseline.
    Default,
    /// "in button scope".
    Button,
    /// "in list-item scope".
    ListItem,
    /// "in table scope".
    Table,
    /// "in select scope": inverted — everything but optgroup/option bounds it.
    Select,
}

/// Stack of open elements, bottom = root. Entries are non-owning references
/// into the tree.
#[derive(Debug, Default)]
pub(crate) struct OpenElements {
    items: Vec<NodeId>,
}

impl OpenElements {
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn push(&mut self, node: NodeId) {
        self.items.push(node);
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        self.items.pop()
    }

    pub(crate) fn current(&self) -> Option<NodeId> {
        self.items.last().copied()
    }

    pub(crate) fn first(&self) -> Option<NodeId> {
        self.items.first().copied()
    }

    pub(crate) fn get(&self, index: usize) -> Option<NodeId> {
        self.items.get(index).copied()
    }

    pub(crate) fn items(&self) -> &[NodeId] {
        &self.items
    }

    pub(crate) fn index_of(&self, node: NodeId) -> Option<usize> {
        self.items.iter().rposition(|&n| n == node)
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        self.items.contains(&node)
    }

    pub(crate) fn contains_html_element(&self, tree: &DomTree, name: &str) -> bool {
        self.items.iter().any(|&n| tree.is_html_element(n, name))
    }

    pub(crate) fn remove(&mut self, node: NodeId) {
        if let Some(idx) = self.index_of(node) {
            self.items.remove(idx);
        }
    }

    pub(crate) fn insert_at(&mut self, index: usize, node: NodeId) {
        self.items.insert(index, node);
    }

    pub(crate) fn replace(&mut self, old: NodeId, new: NodeId) {
        if let Some(idx) = self.index_of(old) {
            self.items[idx] = new;
        }
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// Pop elements until an HTML element with `name` has been popped.
    pub(crate) fn pop_until_name(&mut self, tree: &DomTree, name: &str) {
        while let Some(node) = self.items.pop() {
            if tree.is_html_element(node, name) {
                break;
            }
        }
    }

    /// Pop elements until an HTML element named by any of `names` is popped.
    pub(crate) fn pop_until_any(&mut self, tree: &DomTree, names: &[&str]) {
        while let Some(node) = self.items.pop() {
            if names.iter().any(|name| tree.is_html_element(node, name)) {
                break;
            }
        }
    }

    /// Pop elements until `node` itself has been popped.
    pub(crate) fn pop_until_node(&mut self, node: NodeId) {
        while let Some(popped) = self.items.pop() {
            if popped == node {
                break;
            }
        }
    }

    /// Pop elements while the current node is in `names` (HTML namespace).
    pub(crate) fn pop_while_in(&mut self, tree: &DomTree, names: &[&str]) {
        while let Some(node) = self.current() {
            if names.iter().any(|name| tree.is_html_element(node, name)) {
                self.items.pop();
            } else {
                break;
            }
        }
    }

    pub(crate) fn has_in_scope(&self, tree: &DomTree, name: &str, kind: ScopeKind) -> bool {
        self.scope_walk(tree, kind, |node| tree.is_html_element(node, name))
    }

    pub(crate) fn has_any_in_scope(&self, tree: &DomTree, names: &[&str], kind: ScopeKind) -> bool {
        self.scope_walk(tree, kind, |node| {
            names.iter().any(|name| tree.is_html_element(node, name))
        })
    }

    pub(crate) fn has_node_in_scope(&self, tree: &DomTree, target: NodeId) -> bool {
        self.scope_walk(tree, ScopeKind::Default, |node| node == target)
    }

    /// Walk the stack top-down: true at a match, false when a scope boundary
    /// intervenes.
    fn scope_walk(
        &self,
        tree: &DomTree,
        kind: ScopeKind,
        matches: impl Fn(NodeId) -> bool,
    ) -> bool {
        for &node in self.items.iter().rev() {
            if matches(node) {
                return true;
            }
            if is_scope_boundary(tree, node, kind) {
                return false;
            }
        }
        false
    }
}

fn is_scope_boundary(tree: &DomTree, node: NodeId, kind: ScopeKind) -> bool {
    let Some(element) = tree.as_element(node) else {
        return false;
    };
    match kind {
        ScopeKind::Default | ScopeKind::Button | ScopeKind::ListItem => {
            let base = match element.namespace {
                Namespace::Html => TagFlags::of(&element.name).contains(TagFlags::SCOPE_DEFAULT),
                // Integration points bound the default scope from inside
                // foreign subtrees.
                Namespace::MathMl => matches!(
                    element.name.as_str(),
                    "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml"
                ),
                Namespace::Svg => {
                    matches!(element.name.as_str(), "foreignObject" | "desc" | "title")
                }
            };
            base || match kind {
                ScopeKind::Button => {
                    element.namespace == Namespace::Html
                        && TagFlags::of(&element.name).contains(TagFlags::SCOPE_BUTTON)
                }
                ScopeKind::ListItem => {
                    element.namespace == Namespace::Html
                        && TagFlags::of(&element.name).contains(TagFlags::SCOPE_LIST)
                }
                ScopeKind::Default => false,
                _ => unreachable!(),
            }
        }
        ScopeKind::Table => {
            element.namespace == Namespace::Html
                && TagFlags::of(&element.name).contains(TagFlags::SCOPE_TABLE)
        }
        ScopeKind::Select => {
            !(element.namespace == Namespace::Html
                && matches!(element.name.as_str(), "optgroup" | "option"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OpenElements, ScopeKind};
    use crate::dom::{DomTree, Namespace};

    fn push_html(tree: &mut DomTree, stack: &mut OpenElements, name: &str) {
        let node = tree.create_element(name, Namespace::Html, Vec::new());
        stack.push(node);
    }

    #[test]
    fn table_bounds_the_default_scope() {
        let mut tree = DomTree::new_document();
        let mut stack = OpenElements::default();
        push_html(&mut tree, &mut stack, "html");
        push_html(&mut tree, &mut stack, "p");
        assert!(stack.has_in_scope(&tree, "p", ScopeKind::Default));
        push_html(&mut tree, &mut stack, "table");
        assert!(!stack.has_in_scope(&tree, "p", ScopeKind::Default));
    }

    #[test]
    fn button_and_list_scopes_add_terminators() {
        let mut tree = DomTree::new_document();
        let mut stack = OpenElements::default();
        push_html(&mut tree, &mut stack, "html");
        push_html(&mut tree, &mut stack, "p");
        push_html(&mut tree, &mut stack, "button");
        assert!(stack.has_in_scope(&tree, "p", ScopeKind::Default));
        assert!(!stack.has_in_scope(&tree, "p", ScopeKind::Button));

        let mut list_stack = OpenElements::default();
        push_html(&mut tree, &mut list_stack, "html");
        push_html(&mut tree, &mut list_stack, "li");
        push_html(&mut tree, &mut list_stack, "ul");
        assert!(!list_stack.has_in_scope(&tree, "li", ScopeKind::ListItem));
    }

    #[test]
    fn select_scope_is_inverted() {
        let mut tree = DomTree::new_document();
        let mut stack = OpenElements::default();
        push_html(&mut tree, &mut stack, "html");
        push_html(&mut tree, &mut stack, "select");
        push_html(&mut tree, &mut stack, "optgroup");
        push_html(&mut tree, &mut stack, "option");
        assert!(stack.has_in_scope(&tree, "select", ScopeKind::Select));

        let mut blocked = OpenElements::default();
        push_html(&mut tree, &mut blocked, "html");
        push_html(&mut tree, &mut blocked, "select");
        push_html(&mut tree, &mut blocked, "div");
        assert!(!blocked.has_in_scope(&tree, "select", ScopeKind::Select));
    }

    #[test]
    fn svg_integration_points_bound_default_scope() {
        let mut tree = DomTree::new_document();
        let mut stack = OpenElements::default();
        push_html(&mut tree, &mut stack, "html");
        push_html(&mut tree, &mut stack, "p");
        let svg = tree.create_element("svg", Namespace::Svg, Vec::new());
        stack.push(svg);
        let fo = tree.create_element("foreignObject", Namespace::Svg, Vec::new());
        stack.push(fo);
        assert!(!stack.has_in_scope(&tree, "p", ScopeKind::Default));
    }

    #[test]
    fn pop_until_name_pops_through_the_match() {
        let mut tree = DomTree::new_document();
        let mut stack = OpenElements::default();
        push_html(&mut tree, &mut stack, "html");
        push_html(&mut tree, &mut stack, "div");
        push_html(&mut tree, &mut stack, "span");
        stack.pop_until_name(&tree, "div");
        assert_eq!(stack.len(), 1);
        assert!(tree.is_html_element(stack.current().unwrap(), "html"));
    }
}
