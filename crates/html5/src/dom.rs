//! Arena DOM.
//!
//! Nodes live in one `Vec`; identity is the index (`NodeId`). Children are
//! owned by their parent's child vector, parents are back-references.
//! Invariant: every non-root node has exactly one parent and appears exactly
//! once in that parent's children; adjacent text siblings never exist (text
//! insertion coalesces).

/// Index of a node in its `DomTree` arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Element namespace. Non-elements carry no namespace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

/// Document compatibility mode derived from the DOCTYPE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuirksMode {
    #[default]
    NoQuirks,
    LimitedQuirks,
    Quirks,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    /// Canonical lowercase for HTML; foreign names keep their adjusted case.
    pub name: String,
    pub namespace: Namespace,
    /// Insertion-order attribute list; names are unique.
    pub attrs: Vec<(String, String)>,
    /// The content fragment of an HTML `template` element.
    pub template_contents: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Fragment,
    Doctype {
        name: String,
        public_id: Option<String>,
        system_id: Option<String>,
    },
    Comment(String),
    Text(String),
    Element(ElementData),
}

#[derive(Debug)]
pub struct NodeData {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

/// The parse result tree: a document (or fragment) and its node arena.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    pub quirks_mode: QuirksMode,
}

impl DomTree {
    pub fn new_document() -> Self {
        Self::with_root(NodeKind::Document)
    }

    pub fn new_fragment() -> Self {
        Self::with_root(NodeKind::Fragment)
    }

    fn with_root(kind: NodeKind) -> Self {
        let root = NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            quirks_mode: QuirksMode::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn has_child_nodes(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    // --- creation ---

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    pub fn create_element(
        &mut self,
        name: impl Into<String>,
        namespace: Namespace,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        self.push_node(NodeKind::Element(ElementData {
            name: name.into(),
            namespace,
            attrs,
            template_contents: None,
        }))
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(data.into()))
    }

    pub fn create_comment(&mut self, data: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Comment(data.into()))
    }

    pub fn create_doctype(
        &mut self,
        name: impl Into<String>,
        public_id: Option<String>,
        system_id: Option<String>,
    ) -> NodeId {
        self.push_node(NodeKind::Doctype {
            name: name.into(),
            public_id,
            system_id,
        })
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push_node(NodeKind::Fragment)
    }

    /// Attach a fresh content fragment to a template element and return it.
    pub fn attach_template_contents(&mut self, template: NodeId) -> NodeId {
        let fragment = self.create_fragment();
        let NodeKind::Element(data) = &mut self.nodes[template.index()].kind else {
            unreachable!("template contents attach to elements only");
        };
        debug_assert!(data.template_contents.is_none());
        data.template_contents = Some(fragment);
        fragment
    }

    // --- structure mutation ---

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert_ne!(parent, child);
        self.detach(child);
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let idx = self.child_index(parent, reference)
            .expect("insert_before reference must be a child of parent");
        self.nodes[parent.index()].children.insert(idx, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child.index()].parent.take() else {
            return;
        };
        let children = &mut self.nodes[parent.index()].children;
        if let Some(idx) = children.iter().position(|&c| c == child) {
            children.remove(idx);
        }
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// Move every child of `from` to the end of `to`, preserving order.
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.index()].children);
        for child in &children {
            self.nodes[child.index()].parent = Some(to);
        }
        self.nodes[to.index()].children.extend(children);
    }

    /// Append text, coalescing with a trailing text sibling.
    pub fn append_text(&mut self, parent: NodeId, data: &str) {
        let last = self.children(parent).last().copied();
        if let Some(last) = last
            && let NodeKind::Text(existing) = &mut self.nodes[last.index()].kind
        {
            existing.push_str(data);
            return;
        }
        let text = self.create_text(data);
        self.append(parent, text);
    }

    /// Insert text before `reference`, coalescing with the preceding sibling.
    pub fn insert_text_before(&mut self, parent: NodeId, data: &str, reference: NodeId) {
        let idx = self
            .child_index(parent, reference)
            .expect("insert_text_before reference must be a child of parent");
        if idx > 0 {
            let prev = self.children(parent)[idx - 1];
            if let NodeKind::Text(existing) = &mut self.nodes[prev.index()].kind {
                existing.push_str(data);
                return;
            }
        }
        let text = self.create_text(data);
        self.insert_before(parent, text, reference);
    }

    /// Deep-clone a subtree (template contents included); the clone starts
    /// detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let kind = match &self.nodes[id.index()].kind {
            NodeKind::Element(data) => NodeKind::Element(ElementData {
                name: data.name.clone(),
                namespace: data.namespace,
                attrs: data.attrs.clone(),
                template_contents: None,
            }),
            other => other.clone(),
        };
        let template_contents = match &self.nodes[id.index()].kind {
            NodeKind::Element(data) => data.template_contents,
            _ => None,
        };
        let clone = self.push_node(kind);
        if let Some(contents) = template_contents {
            let contents_clone = self.deep_clone(contents);
            let NodeKind::Element(data) = &mut self.nodes[clone.index()].kind else {
                unreachable!();
            };
            data.template_contents = Some(contents_clone);
        }
        let children = self.nodes[id.index()].children.clone();
        for child in children {
            let child_clone = self.deep_clone(child);
            self.append(clone, child_clone);
        }
        clone
    }

    // --- element accessors ---

    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        self.as_element(id).map(|e| e.name.as_str())
    }

    pub fn namespace(&self, id: NodeId) -> Option<Namespace> {
        self.as_element(id).map(|e| e.namespace)
    }

    pub fn is_html_element(&self, id: NodeId, name: &str) -> bool {
        self.as_element(id)
            .is_some_and(|e| e.namespace == Namespace::Html && e.name == name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.as_element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Add attributes the element does not already carry (duplicate `<html>`
    /// and `<body>` start tags merge this way).
    pub fn add_missing_attrs(&mut self, id: NodeId, attrs: Vec<(String, String)>) {
        let NodeKind::Element(data) = &mut self.nodes[id.index()].kind else {
            return;
        };
        for (name, value) in attrs {
            if !data.attrs.iter().any(|(k, _)| *k == name) {
                data.attrs.push((name, value));
            }
        }
    }

    pub fn template_contents(&self, id: NodeId) -> Option<NodeId> {
        self.as_element(id)?.template_contents
    }

    pub fn text_of(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Text(data) => Some(data),
            _ => None,
        }
    }

    /// All nodes of the subtree rooted at `id`, in tree order. Template
    /// contents are not traversed.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    #[cfg(any(test, debug_assertions))]
    pub fn assert_parent_links(&self) {
        for (idx, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                assert_eq!(
                    self.nodes[child.index()].parent,
                    Some(NodeId(idx as u32)),
                    "child {child:?} of node {idx} has a stale parent link"
                );
            }
            if let Some(parent) = node.parent {
                let count = self.nodes[parent.index()]
                    .children
                    .iter()
                    .filter(|&&c| c == NodeId(idx as u32))
                    .count();
                assert_eq!(count, 1, "node {idx} appears {count} times in its parent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_detaches_from_previous_parent() {
        let mut tree = DomTree::new_document();
        let a = tree.create_element("div", Namespace::Html, Vec::new());
        let b = tree.create_element("span", Namespace::Html, Vec::new());
        let root = tree.root();
        tree.append(root, a);
        tree.append(a, b);
        tree.append(root, b);
        assert_eq!(tree.children(a), &[]);
        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.parent(b), Some(root));
        tree.assert_parent_links();
    }

    #[test]
    fn text_insertion_coalesces_with_preceding_sibling() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        tree.append_text(root, "Hello");
        tree.append_text(root, ", world");
        assert_eq!(tree.children(root).len(), 1);
        let text = tree.children(root)[0];
        assert_eq!(tree.text_of(text), Some("Hello, world"));
    }

    #[test]
    fn insert_text_before_coalesces_across_the_reference() {
        let mut tree = DomTree::new_document();
        let root = tree.root();
        tree.append_text(root, "A");
        let table = tree.create_element("table", Namespace::Html, Vec::new());
        tree.append(root, table);
        tree.insert_text_before(root, "B", table);
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.text_of(tree.children(root)[0]), Some("AB"));
    }

    #[test]
    fn deep_clone_copies_template_contents() {
        let mut tree = DomTree::new_document();
        let template = tree.create_element("template", Namespace::Html, Vec::new());
        let contents = tree.attach_template_contents(template);
        let div = tree.create_element("div", Namespace::Html, Vec::new());
        tree.append(contents, div);
        tree.append_text(div, "X");

        let clone = tree.deep_clone(template);
        let clone_contents = tree.template_contents(clone).unwrap();
        assert_ne!(clone_contents, contents);
        let clone_div = tree.children(clone_contents)[0];
        assert_eq!(tree.element_name(clone_div), Some("div"));
        assert_eq!(tree.text_of(tree.children(clone_div)[0]), Some("X"));
    }

    #[test]
    fn reparent_children_preserves_order() {
        let mut tree = DomTree::new_document();
        let a = tree.create_element("a", Namespace::Html, Vec::new());
        let b = tree.create_element("b", Namespace::Html, Vec::new());
        let x = tree.create_element("i", Namespace::Html, Vec::new());
        let y = tree.create_element("u", Namespace::Html, Vec::new());
        let root = tree.root();
        tree.append(root, a);
        tree.append(root, b);
        tree.append(a, x);
        tree.append(a, y);
        tree.reparent_children(a, b);
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[x, y]);
        assert_eq!(tree.parent(x), Some(b));
        tree.assert_parent_links();
    }

    #[test]
    fn add_missing_attrs_keeps_first_occurrence() {
        let mut tree = DomTree::new_document();
        let html = tree.create_element(
            "html",
            Namespace::Html,
            vec![("lang".to_string(), "en".to_string())],
        );
        tree.add_missing_attrs(
            html,
            vec![
                ("lang".to_string(), "fr".to_string()),
                ("dir".to_string(), "ltr".to_string()),
            ],
        );
        assert_eq!(tree.attr(html, "lang"), Some("en"));
        assert_eq!(tree.attr(html, "dir"), Some("ltr"));
    }
}
