//! HTML5 tree builder.
//!
//! Consumes the token stream and builds the document tree: insertion modes,
//! the stack of open elements, the active-formatting list with the adoption
//! agency algorithm, foster parenting, template content, foreign content,
//! and fragment parsing.
//!
//! Handlers are total functions from `(state, token)` to side effects plus an
//! optional reprocess request; the driver loops until a handler reports the
//! token consumed. No handler recurses through the driver.

mod foreign;
mod formatting;
mod modes;
mod quirks;
mod stack;

#[cfg(test)]
mod tests;

use crate::dom::{DomTree, Namespace, NodeId, NodeKind};
use crate::error::ParseError;
use crate::tags::TagFlags;
use crate::tokenizer::{SinkResult, Tag, Token, TokenSink};
pub(crate) use formatting::FormatEntry;
pub(crate) use stack::{OpenElements, ScopeKind};

/// Insertion modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// Handler verdict: token consumed, or hand it to another mode.
pub(crate) enum ModeResult {
    Done,
    Reprocess {
        mode: Mode,
        token: Token,
        /// Bypass foreign-content dispatch for one iteration.
        force_html: bool,
    },
}

impl ModeResult {
    pub(crate) fn reprocess(mode: Mode, token: Token) -> Self {
        ModeResult::Reprocess {
            mode,
            token,
            force_html: false,
        }
    }
}

/// Fragment-parsing context element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentContext {
    pub tag_name: String,
    pub namespace: Option<Namespace>,
}

/// Tree-builder configuration.
#[derive(Clone, Debug, Default)]
pub struct TreeBuilderOpts {
    pub scripting: bool,
    pub iframe_srcdoc: bool,
    pub collect_errors: bool,
    pub fragment_context: Option<FragmentContext>,
}

pub struct TreeBuilder {
    pub(crate) dom: DomTree,
    pub(crate) mode: Mode,
    pub(crate) original_mode: Option<Mode>,
    pub(crate) template_modes: Vec<Mode>,
    pub(crate) open: OpenElements,
    pub(crate) formatting: Vec<FormatEntry>,
    pub(crate) head: Option<NodeId>,
    pub(crate) form: Option<NodeId>,
    pub(crate) frameset_ok: bool,
    pub(crate) ignore_lf: bool,
    pub(crate) insert_from_table: bool,
    pub(crate) pending_table_text: String,
    pub(crate) scripting: bool,
    pub(crate) iframe_srcdoc: bool,
    pub(crate) fragment: bool,
    pub(crate) context_node: Option<NodeId>,
    pub(crate) fragment_root: Option<NodeId>,
    pub(crate) force_plaintext: bool,
    pub(crate) done: bool,
    collect_errors: bool,
    errors: Vec<ParseError>,
}

impl TreeBuilder {
    pub fn new(opts: TreeBuilderOpts) -> Self {
        match opts.fragment_context.clone() {
            Some(context) => Self::new_fragment(opts, context),
            None => Self {
                dom: DomTree::new_document(),
                mode: Mode::Initial,
                original_mode: None,
                template_modes: Vec::new(),
                open: OpenElements::default(),
                formatting: Vec::new(),
                head: None,
                form: None,
                frameset_ok: true,
                ignore_lf: false,
                insert_from_table: false,
                pending_table_text: String::new(),
                scripting: opts.scripting,
                iframe_srcdoc: opts.iframe_srcdoc,
                fragment: false,
                context_node: None,
                fragment_root: None,
                force_plaintext: false,
                done: false,
                collect_errors: opts.collect_errors,
                errors: Vec::new(),
            },
        }
    }

    fn new_fragment(opts: TreeBuilderOpts, context: FragmentContext) -> Self {
        let mut dom = DomTree::new_fragment();
        let namespace = context.namespace.unwrap_or(Namespace::Html);
        // The context element exists for dispatch decisions only; it never
        // joins the tree.
        let context_node = dom.create_element(context.tag_name.clone(), namespace, Vec::new());
        let root = dom.create_element("html", Namespace::Html, Vec::new());
        let mut open = OpenElements::default();
        open.push(root);

        let mut template_modes = Vec::new();
        if namespace == Namespace::Html && context.tag_name == "template" {
            template_modes.push(Mode::InTemplate);
        }

        let mut builder = Self {
            dom,
            mode: Mode::InBody,
            original_mode: None,
            template_modes,
            open,
            formatting: Vec::new(),
            head: None,
            form: None,
            frameset_ok: false,
            ignore_lf: false,
            insert_from_table: false,
            pending_table_text: String::new(),
            scripting: opts.scripting,
            iframe_srcdoc: opts.iframe_srcdoc,
            fragment: true,
            context_node: Some(context_node),
            fragment_root: Some(root),
            force_plaintext: false,
            done: false,
            collect_errors: opts.collect_errors,
            errors: Vec::new(),
        };
        builder.reset_insertion_mode();
        builder
    }

    /// Finalize: flatten the synthetic fragment root, run the
    /// `selectedcontent` population pass, and hand the tree over.
    pub fn finish(mut self) -> (DomTree, Vec<ParseError>) {
        if let Some(root) = self.fragment_root {
            let fragment = self.dom.root();
            self.dom.reparent_children(root, fragment);
        }
        self.populate_selected_content();
        #[cfg(debug_assertions)]
        self.dom.assert_parent_links();
        (self.dom, self.errors)
    }

    pub(crate) fn error(&mut self, code: &'static str) {
        if self.collect_errors {
            self.errors.push(ParseError::new(code));
        }
    }

    // --- dispatch ---

    fn process(&mut self, mut token: Token) {
        let mut force_html = false;
        loop {
            #[cfg(any(test, feature = "debug-trace"))]
            log::trace!(target: "html5.tree_builder", "mode {:?} token {:?}", self.mode, token);
            let result = if force_html || self.should_use_html_dispatch(&token) {
                self.handle(self.mode, token)
            } else {
                self.process_foreign(token)
            };
            match result {
                ModeResult::Done => break,
                ModeResult::Reprocess {
                    mode,
                    token: next,
                    force_html: f,
                } => {
                    self.mode = mode;
                    token = next;
                    force_html = f;
                }
            }
        }
    }

    pub(crate) fn adjusted_current_node(&self) -> Option<NodeId> {
        if self.fragment && self.open.len() == 1 {
            self.context_node
        } else {
            self.open.current()
        }
    }

    fn should_use_html_dispatch(&self, token: &Token) -> bool {
        let Some(node) = self.adjusted_current_node() else {
            return true;
        };
        if self.dom.namespace(node) == Some(Namespace::Html) {
            return true;
        }
        if foreign::is_mathml_text_integration_point(&self.dom, node) {
            match token {
                Token::StartTag(tag) if tag.name != "mglyph" && tag.name != "malignmark" => {
                    return true;
                }
                Token::Character(_) => return true,
                _ => {}
            }
        }
        if self.dom.as_element(node).is_some_and(|e| {
            e.namespace == Namespace::MathMl && e.name == "annotation-xml"
        }) && matches!(token, Token::StartTag(tag) if tag.name == "svg")
        {
            return true;
        }
        if foreign::is_html_integration_point(&self.dom, node)
            && matches!(token, Token::StartTag(_) | Token::Character(_))
        {
            return true;
        }
        matches!(token, Token::Eof)
    }

    // --- insertion machinery ---

    pub(crate) fn current(&self) -> Option<NodeId> {
        self.open.current()
    }

    pub(crate) fn current_is_html(&self, name: &str) -> bool {
        self.current()
            .is_some_and(|node| self.dom.is_html_element(node, name))
    }

    /// The WHATWG "special" category: the flagged HTML set plus the MathML
    /// text containers and the SVG embedding elements.
    pub(crate) fn is_special(&self, node: NodeId) -> bool {
        let Some(element) = self.dom.as_element(node) else {
            return false;
        };
        match element.namespace {
            Namespace::Html => TagFlags::of(&element.name).contains(TagFlags::SPECIAL),
            Namespace::MathMl => matches!(
                element.name.as_str(),
                "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml"
            ),
            Namespace::Svg => {
                matches!(element.name.as_str(), "foreignObject" | "desc" | "title")
            }
        }
    }

    pub(crate) fn current_flags(&self) -> TagFlags {
        match self.current().and_then(|node| self.dom.as_element(node)) {
            Some(element) if element.namespace == Namespace::Html => TagFlags::of(&element.name),
            _ => TagFlags::EMPTY,
        }
    }

    /// The appropriate place for inserting a node, honoring foster parenting
    /// and template-content redirection.
    pub(crate) fn appropriate_place(&self, override_target: Option<NodeId>) -> (NodeId, Option<NodeId>) {
        let target = override_target
            .or_else(|| self.open.current())
            .unwrap_or_else(|| self.dom.root());

        let foster = self.insert_from_table
            && self
                .dom
                .as_element(target)
                .is_some_and(|e| e.namespace == Namespace::Html)
            && TagFlags::of(self.dom.element_name(target).unwrap_or(""))
                .contains(TagFlags::TABLE_FOSTER);

        let (parent, before) = if foster {
            let last_template = self
                .open
                .items()
                .iter()
                .rposition(|&n| self.dom.is_html_element(n, "template"));
            let last_table = self
                .open
                .items()
                .iter()
                .rposition(|&n| self.dom.is_html_element(n, "table"));
            match (last_template, last_table) {
                (Some(t), table) if table.is_none_or(|i| t > i) => {
                    let template = self.open.get(t).unwrap();
                    let contents = self.dom.template_contents(template).unwrap_or(template);
                    (contents, None)
                }
                (_, None) => (self.open.first().expect("open stack is never empty here"), None),
                (_, Some(i)) => {
                    let table = self.open.get(i).unwrap();
                    match self.dom.parent(table) {
                        Some(parent) => (parent, Some(table)),
                        None => (self.open.get(i - 1).unwrap(), None),
                    }
                }
            }
        } else {
            (target, None)
        };

        if before.is_none()
            && self.dom.is_html_element(parent, "template")
            && let Some(contents) = self.dom.template_contents(parent)
        {
            return (contents, None);
        }
        (parent, before)
    }

    fn insert_at_appropriate_place(&mut self, node: NodeId, override_target: Option<NodeId>) {
        let (parent, before) = self.appropriate_place(override_target);
        match before {
            Some(reference) => self.dom.insert_before(parent, node, reference),
            None => self.dom.append(parent, node),
        }
    }

    pub(crate) fn create_element_for(&mut self, tag: &Tag, namespace: Namespace) -> NodeId {
        let attrs = tag
            .attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        let element = self.dom.create_element(tag.name.clone(), namespace, attrs);
        if namespace == Namespace::Html && tag.name == "template" {
            self.dom.attach_template_contents(element);
        }
        element
    }

    pub(crate) fn insert_html_element(&mut self, tag: &Tag) -> NodeId {
        self.insert_foreign_element(tag, Namespace::Html)
    }

    pub(crate) fn insert_foreign_element(&mut self, tag: &Tag, namespace: Namespace) -> NodeId {
        let element = self.create_element_for(tag, namespace);
        self.insert_at_appropriate_place(element, None);
        self.open.push(element);
        element
    }

    /// Insert without pushing: void-ish elements that pop immediately.
    pub(crate) fn insert_and_pop(&mut self, tag: &Tag) -> NodeId {
        let element = self.insert_html_element(tag);
        self.open.pop();
        element
    }

    pub(crate) fn insert_text(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }
        let (parent, before) = self.appropriate_place(None);
        if matches!(self.dom.kind(parent), NodeKind::Document) {
            return;
        }
        match before {
            Some(reference) => self.dom.insert_text_before(parent, data, reference),
            None => self.dom.append_text(parent, data),
        }
    }

    pub(crate) fn insert_comment(&mut self, data: &str) {
        let comment = self.dom.create_comment(data);
        self.insert_at_appropriate_place(comment, None);
    }

    pub(crate) fn insert_comment_in(&mut self, data: &str, parent: NodeId) {
        let comment = self.dom.create_comment(data);
        self.dom.append(parent, comment);
    }

    // --- shared algorithm pieces ---

    pub(crate) fn generate_implied_end_tags(&mut self, except: Option<&str>) {
        while let Some(node) = self.current() {
            let Some(element) = self.dom.as_element(node) else {
                break;
            };
            if element.namespace != Namespace::Html
                || !TagFlags::of(&element.name).contains(TagFlags::IMPLIED_END)
                || except == Some(element.name.as_str())
            {
                break;
            }
            self.open.pop();
        }
    }

    pub(crate) fn generate_implied_end_tags_thoroughly(&mut self) {
        const THOROUGH: &[&str] = &[
            "caption", "colgroup", "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt",
            "rtc", "tbody", "td", "tfoot", "th", "thead", "tr",
        ];
        self.open.pop_while_in(&self.dom, THOROUGH);
    }

    pub(crate) fn close_p_element(&mut self) {
        self.generate_implied_end_tags(Some("p"));
        if !self.current_is_html("p") {
            self.error("unexpected-implied-end-tag");
        }
        self.open.pop_until_name(&self.dom, "p");
    }

    pub(crate) fn close_cell(&mut self) {
        self.generate_implied_end_tags(None);
        if !self.current_is_html("td") && !self.current_is_html("th") {
            self.error("unexpected-cell-end-tag");
        }
        self.open.pop_until_any(&self.dom, &["td", "th"]);
        self.clear_formatting_to_marker();
        self.mode = Mode::InRow;
    }

    pub(crate) fn clear_stack_to_table_context(&mut self) {
        self.clear_stack_to(&["table", "template", "html"]);
    }

    pub(crate) fn clear_stack_to_table_body_context(&mut self) {
        self.clear_stack_to(&["tbody", "tfoot", "thead", "template", "html"]);
    }

    pub(crate) fn clear_stack_to_table_row_context(&mut self) {
        self.clear_stack_to(&["tr", "template", "html"]);
    }

    fn clear_stack_to(&mut self, names: &[&str]) {
        while let Some(node) = self.current() {
            let stop = names
                .iter()
                .any(|name| self.dom.is_html_element(node, *name));
            if stop || self.open.len() == 1 {
                break;
            }
            self.open.pop();
        }
    }

    pub(crate) fn reset_insertion_mode(&mut self) {
        for idx in (0..self.open.len()).rev() {
            let last = idx == 0;
            let mut node = self.open.get(idx).unwrap();
            if last && self.fragment
                && let Some(context) = self.context_node
            {
                node = context;
            }
            let Some(element) = self.dom.as_element(node) else {
                continue;
            };
            if element.namespace != Namespace::Html {
                if last {
                    self.mode = Mode::InBody;
                    return;
                }
                continue;
            }
            match element.name.as_str() {
                "select" => {
                    self.mode = Mode::InSelect;
                    if !last {
                        for anc in (0..idx).rev() {
                            let ancestor = self.open.get(anc).unwrap();
                            if self.dom.is_html_element(ancestor, "template") {
                                break;
                            }
                            if self.dom.is_html_element(ancestor, "table") {
                                self.mode = Mode::InSelectInTable;
                                break;
                            }
                        }
                    }
                    return;
                }
                "td" | "th" if !last => {
                    self.mode = Mode::InCell;
                    return;
                }
                "tr" => {
                    self.mode = Mode::InRow;
                    return;
                }
                "tbody" | "thead" | "tfoot" => {
                    self.mode = Mode::InTableBody;
                    return;
                }
                "caption" => {
                    self.mode = Mode::InCaption;
                    return;
                }
                "colgroup" => {
                    self.mode = Mode::InColumnGroup;
                    return;
                }
                "table" => {
                    self.mode = Mode::InTable;
                    return;
                }
                "template" => {
                    self.mode = *self
                        .template_modes
                        .last()
                        .expect("open template implies a saved template mode");
                    return;
                }
                "head" if !last => {
                    self.mode = Mode::InHead;
                    return;
                }
                "body" => {
                    self.mode = Mode::InBody;
                    return;
                }
                "frameset" => {
                    self.mode = Mode::InFrameset;
                    return;
                }
                "html" => {
                    self.mode = if self.head.is_none() {
                        Mode::BeforeHead
                    } else {
                        Mode::AfterHead
                    };
                    return;
                }
                _ => {}
            }
            if last {
                self.mode = Mode::InBody;
                return;
            }
        }
    }

    /// Generic RCDATA / raw-text element parsing: the tokenizer has already
    /// switched states off the emitted start tag; the builder mirrors it by
    /// entering TEXT mode.
    pub(crate) fn parse_raw_text(&mut self, tag: &Tag) {
        self.insert_html_element(tag);
        self.original_mode = Some(self.mode);
        self.mode = Mode::Text;
    }

    pub(crate) fn stop_parsing(&mut self) {
        for &node in self.open.items() {
            let unexpected = match self.dom.as_element(node) {
                Some(element) if element.namespace == Namespace::Html => {
                    !TagFlags::of(&element.name).contains(TagFlags::EOF_UNCLOSED)
                }
                _ => true,
            };
            if unexpected {
                self.error("expected-closing-tag-but-got-eof");
                break;
            }
        }
        self.done = true;
    }

    /// The `selectedcontent` population pass: clone the selected option's
    /// children into each select's `selectedcontent` element.
    fn populate_selected_content(&mut self) {
        let mut roots = vec![self.dom.root()];
        let mut selects = Vec::new();
        while let Some(root) = roots.pop() {
            for node in self.dom.descendants(root) {
                if let Some(contents) = self.dom.template_contents(node) {
                    roots.push(contents);
                }
                if self.dom.is_html_element(node, "select") {
                    selects.push(node);
                }
            }
        }
        for select in selects {
            let descendants = self.dom.descendants(select);
            let Some(&target) = descendants
                .iter()
                .find(|&&n| self.dom.is_html_element(n, "selectedcontent"))
            else {
                continue;
            };
            let options: Vec<NodeId> = descendants
                .iter()
                .copied()
                .filter(|&n| self.dom.is_html_element(n, "option"))
                .collect();
            let chosen = options
                .iter()
                .copied()
                .find(|&n| self.dom.has_attr(n, "selected"))
                .or_else(|| options.first().copied());
            let Some(option) = chosen else {
                continue;
            };
            for child in self.dom.children(option).to_vec() {
                let clone = self.dom.deep_clone(child);
                self.dom.append(target, clone);
            }
        }
    }
}

impl TokenSink for TreeBuilder {
    fn process_token(&mut self, token: Token) -> SinkResult {
        if self.done {
            return SinkResult::Continue;
        }
        let token = match self.take_ignore_lf(token) {
            Some(token) => token,
            None => return SinkResult::Continue,
        };
        self.process(token);
        if std::mem::take(&mut self.force_plaintext) {
            return SinkResult::Plaintext;
        }
        match self.adjusted_current_node() {
            Some(node) if self.dom.namespace(node) != Some(Namespace::Html) => {
                SinkResult::ContinueForeign
            }
            _ => SinkResult::Continue,
        }
    }

    fn adjusted_current_node_is_foreign(&self) -> bool {
        self.adjusted_current_node()
            .is_some_and(|node| self.dom.namespace(node) != Some(Namespace::Html))
    }
}

impl TreeBuilder {
    /// One-shot newline suppression after `<pre>`, `<listing>`, `<textarea>`.
    fn take_ignore_lf(&mut self, token: Token) -> Option<Token> {
        if !std::mem::take(&mut self.ignore_lf) {
            return Some(token);
        }
        match token {
            Token::Character(data) => {
                let stripped = data.strip_prefix('\n').unwrap_or(&data).to_string();
                if stripped.is_empty() {
                    None
                } else {
                    Some(Token::Character(stripped))
                }
            }
            other => Some(other),
        }
    }
}

/// Split a character run into its leading-whitespace prefix and the rest.
pub(crate) fn split_leading_whitespace(data: &str) -> (&str, &str) {
    let end = data
        .char_indices()
        .find(|&(_, c)| !matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
        .map_or(data.len(), |(i, _)| i);
    data.split_at(end)
}
