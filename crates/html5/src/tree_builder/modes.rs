//! Insertion-mode handlers and foreign-content rules.
//!
//! One handler per mode, each a total function over the token alphabet.
//! "Process using the rules for X" is a direct call to `handle(X, ..)`
//! without a mode switch; an actual mode switch plus re-presentation of the
//! token goes through `ModeResult::Reprocess`.

use super::foreign::{
    adjust_foreign_attributes, adjust_mathml_attributes, adjust_svg_attributes,
    adjust_svg_tag_name, is_html_integration_point, is_mathml_text_integration_point,
};
use super::formatting::AdoptionResult;
use super::{Mode, ModeResult, ScopeKind, TreeBuilder, quirks, split_leading_whitespace};
use crate::dom::{Namespace, QuirksMode};
use crate::tags::TagFlags;
use crate::tokenizer::{Tag, Token};

const BODY_END_GROUP: &[&str] = &[
    "address", "article", "aside", "blockquote", "button", "center", "details", "dialog", "dir",
    "div", "dl", "fieldset", "figcaption", "figure", "footer", "header", "hgroup", "listing",
    "main", "menu", "nav", "ol", "pre", "search", "section", "summary", "ul",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

impl TreeBuilder {
    pub(crate) fn handle(&mut self, mode: Mode, token: Token) -> ModeResult {
        match mode {
            Mode::Initial => self.handle_initial(token),
            Mode::BeforeHtml => self.handle_before_html(token),
            Mode::BeforeHead => self.handle_before_head(token),
            Mode::InHead => self.handle_in_head(token),
            Mode::InHeadNoscript => self.handle_in_head_noscript(token),
            Mode::AfterHead => self.handle_after_head(token),
            Mode::InBody => self.handle_in_body(token),
            Mode::Text => self.handle_text(token),
            Mode::InTable => self.handle_in_table(token),
            Mode::InTableText => self.handle_in_table_text(token),
            Mode::InCaption => self.handle_in_caption(token),
            Mode::InColumnGroup => self.handle_in_column_group(token),
            Mode::InTableBody => self.handle_in_table_body(token),
            Mode::InRow => self.handle_in_row(token),
            Mode::InCell => self.handle_in_cell(token),
            // In-select-in-table folds into the in-select handler, which
            // checks the mode for the extra table clauses.
            Mode::InSelect | Mode::InSelectInTable => self.handle_in_select(token),
            Mode::InTemplate => self.handle_in_template(token),
            Mode::AfterBody => self.handle_after_body(token),
            Mode::InFrameset => self.handle_in_frameset(token),
            Mode::AfterFrameset => self.handle_after_frameset(token),
            Mode::AfterAfterBody => self.handle_after_after_body(token),
            Mode::AfterAfterFrameset => self.handle_after_after_frameset(token),
        }
    }

    // --- INITIAL / BEFORE_HTML / BEFORE_HEAD ---

    fn handle_initial(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let (_, rest) = split_leading_whitespace(&data);
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.initial_anything_else();
                ModeResult::reprocess(Mode::BeforeHtml, Token::Character(rest.to_string()))
            }
            Token::Comment(data) => {
                let root = self.dom.root();
                self.insert_comment_in(&data, root);
                ModeResult::Done
            }
            Token::Doctype(doctype) => {
                let ok_name = doctype.name.as_deref() == Some("html");
                let ok_system = doctype.system_id.is_none()
                    || doctype.system_id.as_deref() == Some("about:legacy-compat");
                if !ok_name || doctype.public_id.is_some() || !ok_system {
                    self.error("unknown-doctype");
                }
                let node = self.dom.create_doctype(
                    doctype.name.clone().unwrap_or_default(),
                    doctype.public_id.clone(),
                    doctype.system_id.clone(),
                );
                let root = self.dom.root();
                self.dom.append(root, node);
                self.dom.quirks_mode = quirks::quirks_mode_for(&doctype, self.iframe_srcdoc);
                self.mode = Mode::BeforeHtml;
                ModeResult::Done
            }
            Token::Eof => {
                self.initial_anything_else();
                ModeResult::reprocess(Mode::BeforeHtml, Token::Eof)
            }
            other => {
                self.initial_anything_else();
                ModeResult::reprocess(Mode::BeforeHtml, other)
            }
        }
    }

    fn initial_anything_else(&mut self) {
        if !self.iframe_srcdoc {
            self.error("expected-doctype-but-got-anything-else");
            self.dom.quirks_mode = QuirksMode::Quirks;
        }
        self.mode = Mode::BeforeHtml;
    }

    fn handle_before_html(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::Comment(data) => {
                let root = self.dom.root();
                self.insert_comment_in(&data, root);
                ModeResult::Done
            }
            Token::Character(data) => {
                let (_, rest) = split_leading_whitespace(&data);
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.before_html_anything_else();
                ModeResult::reprocess(Mode::BeforeHead, Token::Character(rest.to_string()))
            }
            Token::StartTag(tag) if tag.name == "html" => {
                let element = self.create_element_for(&tag, Namespace::Html);
                let root = self.dom.root();
                self.dom.append(root, element);
                self.open.push(element);
                self.mode = Mode::BeforeHead;
                ModeResult::Done
            }
            Token::EndTag(tag)
                if !matches!(tag.name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            other => {
                self.before_html_anything_else();
                ModeResult::reprocess(Mode::BeforeHead, other)
            }
        }
    }

    fn before_html_anything_else(&mut self) {
        let element = self.create_element_for(&Tag::named("html"), Namespace::Html);
        let root = self.dom.root();
        self.dom.append(root, element);
        self.open.push(element);
        self.mode = Mode::BeforeHead;
    }

    fn handle_before_head(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let (_, rest) = split_leading_whitespace(&data);
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.before_head_anything_else();
                ModeResult::reprocess(Mode::InHead, Token::Character(rest.to_string()))
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) if tag.name == "html" => {
                self.handle_in_body(Token::StartTag(tag))
            }
            Token::StartTag(tag) if tag.name == "head" => {
                let head = self.insert_html_element(&tag);
                self.head = Some(head);
                self.mode = Mode::InHead;
                ModeResult::Done
            }
            Token::EndTag(tag)
                if !matches!(tag.name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            other => {
                self.before_head_anything_else();
                ModeResult::reprocess(Mode::InHead, other)
            }
        }
    }

    fn before_head_anything_else(&mut self) {
        let head = self.insert_html_element(&Tag::named("head"));
        self.head = Some(head);
        self.mode = Mode::InHead;
    }

    // --- IN_HEAD family ---

    fn handle_in_head(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let (ws, rest) = split_leading_whitespace(&data);
                self.insert_text(ws);
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.in_head_anything_else();
                ModeResult::reprocess(Mode::AfterHead, Token::Character(rest.to_string()))
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) => match tag.name.as_str() {
                "html" => self.handle_in_body(Token::StartTag(tag)),
                "base" | "basefont" | "bgsound" | "link" | "meta" => {
                    self.insert_and_pop(&tag);
                    ModeResult::Done
                }
                "title" => {
                    self.parse_raw_text(&tag);
                    ModeResult::Done
                }
                "noscript" if self.scripting => {
                    self.parse_raw_text(&tag);
                    ModeResult::Done
                }
                "noscript" => {
                    self.insert_html_element(&tag);
                    self.mode = Mode::InHeadNoscript;
                    ModeResult::Done
                }
                "noframes" | "style" | "script" => {
                    self.parse_raw_text(&tag);
                    ModeResult::Done
                }
                "template" => {
                    self.insert_html_element(&tag);
                    self.push_formatting_marker();
                    self.frameset_ok = false;
                    self.mode = Mode::InTemplate;
                    self.template_modes.push(Mode::InTemplate);
                    ModeResult::Done
                }
                "head" => {
                    self.error("two-heads-are-not-better-than-one");
                    ModeResult::Done
                }
                _ => {
                    self.in_head_anything_else();
                    ModeResult::reprocess(Mode::AfterHead, Token::StartTag(tag))
                }
            },
            Token::EndTag(tag) => match tag.name.as_str() {
                "head" => {
                    self.open.pop();
                    self.mode = Mode::AfterHead;
                    ModeResult::Done
                }
                "template" => {
                    self.close_template();
                    ModeResult::Done
                }
                "body" | "html" | "br" => {
                    self.in_head_anything_else();
                    ModeResult::reprocess(Mode::AfterHead, Token::EndTag(tag))
                }
                _ => {
                    self.error("unexpected-end-tag");
                    ModeResult::Done
                }
            },
            other => {
                self.in_head_anything_else();
                ModeResult::reprocess(Mode::AfterHead, other)
            }
        }
    }

    fn in_head_anything_else(&mut self) {
        self.open.pop();
        self.mode = Mode::AfterHead;
    }

    pub(crate) fn close_template(&mut self) {
        if !self.open.contains_html_element(&self.dom, "template") {
            self.error("unexpected-end-tag");
            return;
        }
        self.generate_implied_end_tags_thoroughly();
        if !self.current_is_html("template") {
            self.error("unexpected-end-tag");
        }
        self.open.pop_until_name(&self.dom, "template");
        self.clear_formatting_to_marker();
        self.template_modes.pop();
        self.reset_insertion_mode();
    }

    fn handle_in_head_noscript(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) if tag.name == "html" => {
                self.handle_in_body(Token::StartTag(tag))
            }
            Token::EndTag(tag) if tag.name == "noscript" => {
                self.open.pop();
                self.mode = Mode::InHead;
                ModeResult::Done
            }
            Token::Character(data) => {
                let (ws, rest) = split_leading_whitespace(&data);
                self.insert_text(ws);
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.in_head_noscript_anything_else();
                ModeResult::reprocess(Mode::InHead, Token::Character(rest.to_string()))
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::StartTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "basefont" | "bgsound" | "link" | "meta" | "noframes" | "style"
                ) =>
            {
                self.handle_in_head(Token::StartTag(tag))
            }
            Token::StartTag(tag) if matches!(tag.name.as_str(), "head" | "noscript") => {
                self.error("unexpected-start-tag");
                ModeResult::Done
            }
            Token::EndTag(tag) if tag.name != "br" => {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            other => {
                self.in_head_noscript_anything_else();
                ModeResult::reprocess(Mode::InHead, other)
            }
        }
    }

    fn in_head_noscript_anything_else(&mut self) {
        self.error("unexpected-token-in-noscript");
        self.open.pop();
        self.mode = Mode::InHead;
    }

    fn handle_after_head(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let (ws, rest) = split_leading_whitespace(&data);
                self.insert_text(ws);
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.after_head_anything_else();
                ModeResult::reprocess(Mode::InBody, Token::Character(rest.to_string()))
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) => match tag.name.as_str() {
                "html" => self.handle_in_body(Token::StartTag(tag)),
                "body" => {
                    self.insert_html_element(&tag);
                    self.frameset_ok = false;
                    self.mode = Mode::InBody;
                    ModeResult::Done
                }
                "frameset" => {
                    self.insert_html_element(&tag);
                    self.mode = Mode::InFrameset;
                    ModeResult::Done
                }
                _ if TagFlags::of(&tag.name).contains(TagFlags::IN_HEAD) => {
                    self.error("unexpected-start-tag-out-of-my-head");
                    let head = self.head.expect("head pointer set before AFTER_HEAD");
                    self.open.push(head);
                    let result = self.handle_in_head(Token::StartTag(tag));
                    self.open.remove(head);
                    result
                }
                "head" => {
                    self.error("unexpected-start-tag");
                    ModeResult::Done
                }
                _ => {
                    self.after_head_anything_else();
                    ModeResult::reprocess(Mode::InBody, Token::StartTag(tag))
                }
            },
            Token::EndTag(tag) => match tag.name.as_str() {
                "template" => self.handle_in_head(Token::EndTag(tag)),
                "body" | "html" | "br" => {
                    self.after_head_anything_else();
                    ModeResult::reprocess(Mode::InBody, Token::EndTag(tag))
                }
                _ => {
                    self.error("unexpected-end-tag");
                    ModeResult::Done
                }
            },
            other => {
                self.after_head_anything_else();
                ModeResult::reprocess(Mode::InBody, other)
            }
        }
    }

    fn after_head_anything_else(&mut self) {
        self.insert_html_element(&Tag::named("body"));
        self.mode = Mode::InBody;
    }

    // --- IN_BODY ---

    fn handle_in_body(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let mut text = String::with_capacity(data.len());
                for c in data.chars() {
                    if c == '\0' {
                        self.error("unexpected-null-character");
                    } else {
                        text.push(c);
                    }
                }
                if text.is_empty() {
                    return ModeResult::Done;
                }
                self.reconstruct_formatting();
                if text
                    .chars()
                    .any(|c| !matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
                {
                    self.frameset_ok = false;
                }
                self.insert_text(&text);
                ModeResult::Done
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) => self.in_body_start_tag(tag),
            Token::EndTag(tag) => self.in_body_end_tag(tag),
            Token::Eof => {
                if !self.template_modes.is_empty() {
                    return self.handle_in_template(Token::Eof);
                }
                self.stop_parsing();
                ModeResult::Done
            }
        }
    }

    fn in_body_start_tag(&mut self, mut tag: Tag) -> ModeResult {
        let flags = TagFlags::of(&tag.name);
        match tag.name.as_str() {
            "html" => {
                self.error("non-html-root");
                if !self.open.contains_html_element(&self.dom, "template")
                    && let Some(root) = self.open.first()
                {
                    let attrs = tag
                        .attrs
                        .iter()
                        .map(|a| (a.name.clone(), a.value.clone()))
                        .collect();
                    self.dom.add_missing_attrs(root, attrs);
                }
                ModeResult::Done
            }
            _ if flags.contains(TagFlags::IN_HEAD) => self.handle_in_head(Token::StartTag(tag)),
            "body" => {
                self.error("unexpected-start-tag");
                let second = self.open.get(1);
                let second_is_body =
                    second.is_some_and(|n| self.dom.is_html_element(n, "body"));
                if self.open.len() == 1
                    || !second_is_body
                    || self.open.contains_html_element(&self.dom, "template")
                {
                    return ModeResult::Done;
                }
                self.frameset_ok = false;
                let attrs = tag
                    .attrs
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect();
                self.dom.add_missing_attrs(second.unwrap(), attrs);
                ModeResult::Done
            }
            "frameset" => {
                self.error("unexpected-start-tag");
                let second_is_body = self
                    .open
                    .get(1)
                    .is_some_and(|n| self.dom.is_html_element(n, "body"));
                if self.open.len() == 1 || !second_is_body || !self.frameset_ok {
                    return ModeResult::Done;
                }
                let body = self.open.get(1).unwrap();
                self.dom.detach(body);
                self.open.truncate(1);
                self.insert_html_element(&tag);
                self.mode = Mode::InFrameset;
                ModeResult::Done
            }
            "address" | "article" | "aside" | "blockquote" | "center" | "details" | "dialog"
            | "dir" | "div" | "dl" | "fieldset" | "figcaption" | "figure" | "footer"
            | "header" | "hgroup" | "main" | "menu" | "nav" | "ol" | "p" | "search"
            | "section" | "summary" | "ul" => {
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                ModeResult::Done
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                if self.current_flags().contains(TagFlags::HEADING) {
                    self.error("unexpected-start-tag");
                    self.open.pop();
                }
                self.insert_html_element(&tag);
                ModeResult::Done
            }
            "pre" | "listing" => {
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                self.ignore_lf = true;
                self.frameset_ok = false;
                ModeResult::Done
            }
            "form" => {
                if self.form.is_some()
                    && !self.open.contains_html_element(&self.dom, "template")
                {
                    self.error("unexpected-start-tag");
                    return ModeResult::Done;
                }
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                let element = self.insert_html_element(&tag);
                if !self.open.contains_html_element(&self.dom, "template") {
                    self.form = Some(element);
                }
                ModeResult::Done
            }
            "li" => {
                self.frameset_ok = false;
                self.list_item_start(&["li"]);
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                ModeResult::Done
            }
            "dd" | "dt" => {
                self.frameset_ok = false;
                self.list_item_start(&["dd", "dt"]);
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                ModeResult::Done
            }
            "plaintext" => {
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                self.force_plaintext = true;
                ModeResult::Done
            }
            "button" => {
                if self.open.has_in_scope(&self.dom, "button", ScopeKind::Default) {
                    self.error("unexpected-start-tag");
                    self.generate_implied_end_tags(None);
                    self.open.pop_until_name(&self.dom, "button");
                }
                self.reconstruct_formatting();
                self.insert_html_element(&tag);
                self.frameset_ok = false;
                ModeResult::Done
            }
            "a" => {
                if let Some((_, node)) = self.formatting_entry_named("a") {
                    self.error("unexpected-start-tag-implies-end-tag");
                    self.adoption_agency("a");
                    self.remove_formatting_entry_for(node);
                    self.open.remove(node);
                }
                self.reconstruct_formatting();
                let element = self.insert_html_element(&tag);
                self.push_formatting(element, &tag);
                ModeResult::Done
            }
            "nobr" => {
                self.reconstruct_formatting();
                if self.open.has_in_scope(&self.dom, "nobr", ScopeKind::Default) {
                    self.error("unexpected-start-tag-implies-end-tag");
                    self.adoption_agency("nobr");
                    self.reconstruct_formatting();
                }
                let element = self.insert_html_element(&tag);
                self.push_formatting(element, &tag);
                ModeResult::Done
            }
            _ if flags.contains(TagFlags::FORMATTING) => {
                self.reconstruct_formatting();
                let element = self.insert_html_element(&tag);
                self.push_formatting(element, &tag);
                ModeResult::Done
            }
            "applet" | "marquee" | "object" => {
                self.reconstruct_formatting();
                self.insert_html_element(&tag);
                self.push_formatting_marker();
                self.frameset_ok = false;
                ModeResult::Done
            }
            "table" => {
                if self.dom.quirks_mode != QuirksMode::Quirks
                    && self.open.has_in_scope(&self.dom, "p", ScopeKind::Button)
                {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                self.frameset_ok = false;
                self.mode = Mode::InTable;
                ModeResult::Done
            }
            "area" | "br" | "embed" | "img" | "keygen" | "wbr" => {
                self.reconstruct_formatting();
                self.insert_and_pop(&tag);
                self.frameset_ok = false;
                ModeResult::Done
            }
            "input" => {
                self.reconstruct_formatting();
                let hidden = tag
                    .attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
                self.insert_and_pop(&tag);
                if !hidden {
                    self.frameset_ok = false;
                }
                ModeResult::Done
            }
            "param" | "source" | "track" => {
                self.insert_and_pop(&tag);
                ModeResult::Done
            }
            "hr" => {
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                self.insert_and_pop(&tag);
                self.frameset_ok = false;
                ModeResult::Done
            }
            "image" => {
                self.error("image-start-tag");
                tag.name = "img".to_string();
                self.in_body_start_tag(tag)
            }
            "textarea" => {
                self.insert_html_element(&tag);
                self.ignore_lf = true;
                self.frameset_ok = false;
                self.original_mode = Some(self.mode);
                self.mode = Mode::Text;
                ModeResult::Done
            }
            "xmp" => {
                if self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.close_p_element();
                }
                self.reconstruct_formatting();
                self.frameset_ok = false;
                self.parse_raw_text(&tag);
                ModeResult::Done
            }
            "iframe" => {
                self.frameset_ok = false;
                self.parse_raw_text(&tag);
                ModeResult::Done
            }
            "noembed" => {
                self.parse_raw_text(&tag);
                ModeResult::Done
            }
            "noscript" if self.scripting => {
                self.parse_raw_text(&tag);
                ModeResult::Done
            }
            "select" => {
                self.reconstruct_formatting();
                self.insert_html_element(&tag);
                self.frameset_ok = false;
                self.mode = match self.mode {
                    Mode::InTable
                    | Mode::InCaption
                    | Mode::InTableBody
                    | Mode::InRow
                    | Mode::InCell => Mode::InSelectInTable,
                    _ => Mode::InSelect,
                };
                ModeResult::Done
            }
            "optgroup" | "option" => {
                if self.current_is_html("option") {
                    self.open.pop();
                }
                self.reconstruct_formatting();
                self.insert_html_element(&tag);
                ModeResult::Done
            }
            "rb" | "rtc" => {
                if self.open.has_in_scope(&self.dom, "ruby", ScopeKind::Default) {
                    self.generate_implied_end_tags(None);
                    if !self.current_is_html("ruby") {
                        self.error("unexpected-start-tag");
                    }
                }
                self.insert_html_element(&tag);
                ModeResult::Done
            }
            "rp" | "rt" => {
                if self.open.has_in_scope(&self.dom, "ruby", ScopeKind::Default) {
                    self.generate_implied_end_tags(Some("rtc"));
                    if !self.current_is_html("rtc") && !self.current_is_html("ruby") {
                        self.error("unexpected-start-tag");
                    }
                }
                self.insert_html_element(&tag);
                ModeResult::Done
            }
            "math" => {
                self.reconstruct_formatting();
                adjust_mathml_attributes(&mut tag);
                adjust_foreign_attributes(&mut tag);
                self.insert_foreign_element(&tag, Namespace::MathMl);
                if tag.self_closing {
                    self.open.pop();
                }
                ModeResult::Done
            }
            "svg" => {
                self.reconstruct_formatting();
                adjust_svg_attributes(&mut tag);
                adjust_foreign_attributes(&mut tag);
                self.insert_foreign_element(&tag, Namespace::Svg);
                if tag.self_closing {
                    self.open.pop();
                }
                ModeResult::Done
            }
            _ if flags.contains(TagFlags::STRUCTURE_IGN) => {
                self.error("unexpected-start-tag-ignored");
                ModeResult::Done
            }
            _ => {
                self.reconstruct_formatting();
                self.insert_html_element(&tag);
                ModeResult::Done
            }
        }
    }

    /// The li/dd/dt start-tag stack walk.
    fn list_item_start(&mut self, names: &[&str]) {
        for idx in (0..self.open.len()).rev() {
            let node = self.open.get(idx).unwrap();
            if let Some(name) = names
                .iter()
                .copied()
                .find(|name| self.dom.is_html_element(node, name))
            {
                self.generate_implied_end_tags(Some(name));
                if !self.current_is_html(name) {
                    self.error("unexpected-implied-end-tag");
                }
                self.open.pop_until_name(&self.dom, name);
                return;
            }
            let exempt = self
                .dom
                .element_name(node)
                .is_some_and(|n| matches!(n, "address" | "div" | "p"));
            if self.is_special(node) && !exempt {
                return;
            }
        }
    }

    fn in_body_end_tag(&mut self, tag: Tag) -> ModeResult {
        let flags = TagFlags::of(&tag.name);
        match tag.name.as_str() {
            "template" => self.handle_in_head(Token::EndTag(tag)),
            "body" => {
                if !self.open.has_in_scope(&self.dom, "body", ScopeKind::Default) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.check_unclosed_at_body_end();
                self.mode = Mode::AfterBody;
                ModeResult::Done
            }
            "html" => {
                if !self.open.has_in_scope(&self.dom, "body", ScopeKind::Default) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.check_unclosed_at_body_end();
                ModeResult::reprocess(Mode::AfterBody, Token::EndTag(tag))
            }
            name if BODY_END_GROUP.contains(&name) => {
                if !self.open.has_in_scope(&self.dom, name, ScopeKind::Default) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.generate_implied_end_tags(None);
                if !self.current_is_html(name) {
                    self.error("end-tag-too-early");
                }
                self.open.pop_until_name(&self.dom, name);
                ModeResult::Done
            }
            "form" => {
                self.in_body_form_end();
                ModeResult::Done
            }
            "p" => {
                if !self.open.has_in_scope(&self.dom, "p", ScopeKind::Button) {
                    self.error("unexpected-end-tag");
                    self.insert_html_element(&Tag::named("p"));
                }
                self.close_p_element();
                ModeResult::Done
            }
            "li" => {
                if !self.open.has_in_scope(&self.dom, "li", ScopeKind::ListItem) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.generate_implied_end_tags(Some("li"));
                if !self.current_is_html("li") {
                    self.error("end-tag-too-early");
                }
                self.open.pop_until_name(&self.dom, "li");
                ModeResult::Done
            }
            "dd" | "dt" => {
                let name = tag.name.as_str();
                if !self.open.has_in_scope(&self.dom, name, ScopeKind::Default) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.generate_implied_end_tags(Some(name));
                if !self.current_is_html(name) {
                    self.error("end-tag-too-early");
                }
                self.open.pop_until_name(&self.dom, name);
                ModeResult::Done
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if !self.open.has_any_in_scope(&self.dom, HEADINGS, ScopeKind::Default) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.generate_implied_end_tags(None);
                if !self.current_is_html(&tag.name) {
                    self.error("end-tag-too-early");
                }
                self.open.pop_until_any(&self.dom, HEADINGS);
                ModeResult::Done
            }
            _ if flags.contains(TagFlags::FORMATTING) => {
                if self.adoption_agency(&tag.name) == AdoptionResult::AnyOtherEndTag {
                    self.any_other_end_tag(&tag.name);
                }
                ModeResult::Done
            }
            "applet" | "marquee" | "object" => {
                let name = tag.name.as_str();
                if !self.open.has_in_scope(&self.dom, name, ScopeKind::Default) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.generate_implied_end_tags(None);
                if !self.current_is_html(name) {
                    self.error("end-tag-too-early");
                }
                self.open.pop_until_name(&self.dom, name);
                self.clear_formatting_to_marker();
                ModeResult::Done
            }
            "br" => {
                self.error("unexpected-end-tag-treated-as-start");
                self.reconstruct_formatting();
                self.insert_and_pop(&Tag::named("br"));
                self.frameset_ok = false;
                ModeResult::Done
            }
            name => {
                self.any_other_end_tag(name);
                ModeResult::Done
            }
        }
    }

    fn in_body_form_end(&mut self) {
        if self.open.contains_html_element(&self.dom, "template") {
            if !self.open.has_in_scope(&self.dom, "form", ScopeKind::Default) {
                self.error("unexpected-end-tag");
                return;
            }
            self.generate_implied_end_tags(None);
            if !self.current_is_html("form") {
                self.error("end-tag-too-early-ignored");
            }
            self.open.pop_until_name(&self.dom, "form");
            return;
        }
        let node = self.form.take();
        let Some(node) = node else {
            self.error("unexpected-end-tag");
            return;
        };
        if !self.open.has_node_in_scope(&self.dom, node) {
            self.error("unexpected-end-tag");
            return;
        }
        self.generate_implied_end_tags(None);
        if self.current() != Some(node) {
            self.error("end-tag-too-early-ignored");
        }
        self.open.remove(node);
    }

    fn check_unclosed_at_body_end(&mut self) {
        for &node in self.open.items() {
            let ok = self
                .dom
                .as_element(node)
                .is_some_and(|e| {
                    e.namespace == Namespace::Html
                        && TagFlags::of(&e.name).contains(TagFlags::EOF_UNCLOSED)
                });
            if !ok {
                self.error("expected-one-end-tag-but-got-another");
                break;
            }
        }
    }

    // --- TEXT ---

    fn handle_text(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                self.insert_text(&data);
                ModeResult::Done
            }
            Token::Eof => {
                self.error("expected-named-closing-tag-but-got-eof");
                self.open.pop();
                let original = self
                    .original_mode
                    .take()
                    .expect("TEXT mode always saves the original mode");
                ModeResult::reprocess(original, Token::Eof)
            }
            Token::EndTag(_) => {
                self.open.pop();
                self.mode = self
                    .original_mode
                    .take()
                    .expect("TEXT mode always saves the original mode");
                ModeResult::Done
            }
            _ => unreachable!("tokenizer only emits characters and an end tag in raw text"),
        }
    }

    // --- tables ---

    fn handle_in_table(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(_)
                if self.current_flags().contains(TagFlags::TABLE_FOSTER) =>
            {
                self.pending_table_text.clear();
                self.original_mode = Some(self.mode);
                self.mode = Mode::InTableText;
                ModeResult::reprocess(Mode::InTableText, token)
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) => match tag.name.as_str() {
                "caption" => {
                    self.clear_stack_to_table_context();
                    self.push_formatting_marker();
                    self.insert_html_element(&tag);
                    self.mode = Mode::InCaption;
                    ModeResult::Done
                }
                "colgroup" => {
                    self.clear_stack_to_table_context();
                    self.insert_html_element(&tag);
                    self.mode = Mode::InColumnGroup;
                    ModeResult::Done
                }
                "col" => {
                    self.clear_stack_to_table_context();
                    self.insert_html_element(&Tag::named("colgroup"));
                    self.mode = Mode::InColumnGroup;
                    ModeResult::reprocess(Mode::InColumnGroup, Token::StartTag(tag))
                }
                "tbody" | "tfoot" | "thead" => {
                    self.clear_stack_to_table_context();
                    self.insert_html_element(&tag);
                    self.mode = Mode::InTableBody;
                    ModeResult::Done
                }
                "td" | "th" | "tr" => {
                    self.clear_stack_to_table_context();
                    self.insert_html_element(&Tag::named("tbody"));
                    self.mode = Mode::InTableBody;
                    ModeResult::reprocess(Mode::InTableBody, Token::StartTag(tag))
                }
                "table" => {
                    self.error("unexpected-start-tag-implies-end-tag");
                    if !self.open.has_in_scope(&self.dom, "table", ScopeKind::Table) {
                        return ModeResult::Done;
                    }
                    self.open.pop_until_name(&self.dom, "table");
                    self.reset_insertion_mode();
                    ModeResult::reprocess(self.mode, Token::StartTag(tag))
                }
                "style" | "script" | "template" => self.handle_in_head(Token::StartTag(tag)),
                "input" => {
                    let hidden = tag
                        .attr("type")
                        .is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
                    if !hidden {
                        return self.in_table_anything_else(Token::StartTag(tag));
                    }
                    self.error("unexpected-hidden-input-in-table");
                    self.insert_and_pop(&tag);
                    ModeResult::Done
                }
                "form" => {
                    self.error("unexpected-form-in-table");
                    if self.open.contains_html_element(&self.dom, "template")
                        || self.form.is_some()
                    {
                        return ModeResult::Done;
                    }
                    let element = self.insert_and_pop(&tag);
                    self.form = Some(element);
                    ModeResult::Done
                }
                _ => self.in_table_anything_else(Token::StartTag(tag)),
            },
            Token::EndTag(tag) => match tag.name.as_str() {
                "table" => {
                    if !self.open.has_in_scope(&self.dom, "table", ScopeKind::Table) {
                        self.error("unexpected-end-tag");
                        return ModeResult::Done;
                    }
                    self.open.pop_until_name(&self.dom, "table");
                    self.reset_insertion_mode();
                    ModeResult::Done
                }
                "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot"
                | "th" | "thead" | "tr" => {
                    self.error("unexpected-end-tag");
                    ModeResult::Done
                }
                "template" => self.handle_in_head(Token::EndTag(tag)),
                _ => self.in_table_anything_else(Token::EndTag(tag)),
            },
            Token::Eof => self.handle_in_body(Token::Eof),
            token => self.in_table_anything_else(token),
        }
    }

    fn in_table_anything_else(&mut self, token: Token) -> ModeResult {
        self.error("unexpected-token-in-table");
        self.insert_from_table = true;
        let result = self.handle_in_body(token);
        self.insert_from_table = false;
        result
    }

    fn handle_in_table_text(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                for c in data.chars() {
                    if c == '\0' {
                        self.error("unexpected-null-character");
                    } else {
                        self.pending_table_text.push(c);
                    }
                }
                ModeResult::Done
            }
            other => {
                self.flush_pending_table_text();
                let original = self
                    .original_mode
                    .take()
                    .expect("IN_TABLE_TEXT always saves the original mode");
                ModeResult::reprocess(original, other)
            }
        }
    }

    fn handle_in_caption(&mut self, token: Token) -> ModeResult {
        match token {
            Token::EndTag(tag) if tag.name == "caption" => {
                self.close_caption();
                ModeResult::Done
            }
            Token::StartTag(tag) if TagFlags::of(&tag.name).contains(TagFlags::TABLE_CHILD) => {
                self.error("unexpected-start-tag-implies-caption-end");
                if self.close_caption() {
                    return ModeResult::reprocess(Mode::InTable, Token::StartTag(tag));
                }
                ModeResult::Done
            }
            Token::EndTag(tag) if tag.name == "table" => {
                self.error("unexpected-end-tag-implies-caption-end");
                if self.close_caption() {
                    return ModeResult::reprocess(Mode::InTable, Token::EndTag(tag));
                }
                ModeResult::Done
            }
            Token::EndTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th"
                        | "thead" | "tr"
                ) =>
            {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            other => self.handle_in_body(other),
        }
    }

    fn close_caption(&mut self) -> bool {
        if !self.open.has_in_scope(&self.dom, "caption", ScopeKind::Table) {
            self.error("unexpected-end-tag");
            return false;
        }
        self.generate_implied_end_tags(None);
        if !self.current_is_html("caption") {
            self.error("end-tag-too-early");
        }
        self.open.pop_until_name(&self.dom, "caption");
        self.clear_formatting_to_marker();
        self.mode = Mode::InTable;
        true
    }

    fn handle_in_column_group(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let (ws, rest) = split_leading_whitespace(&data);
                self.insert_text(ws);
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.in_column_group_anything_else(Token::Character(rest.to_string()))
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) if tag.name == "html" => {
                self.handle_in_body(Token::StartTag(tag))
            }
            Token::StartTag(tag) if tag.name == "col" => {
                self.insert_and_pop(&tag);
                ModeResult::Done
            }
            Token::EndTag(tag) if tag.name == "colgroup" => {
                if !self.current_is_html("colgroup") {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.open.pop();
                self.mode = Mode::InTable;
                ModeResult::Done
            }
            Token::EndTag(tag) if tag.name == "col" => {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            Token::StartTag(tag) if tag.name == "template" => {
                self.handle_in_head(Token::StartTag(tag))
            }
            Token::EndTag(tag) if tag.name == "template" => {
                self.handle_in_head(Token::EndTag(tag))
            }
            Token::Eof => self.handle_in_body(Token::Eof),
            other => self.in_column_group_anything_else(other),
        }
    }

    fn in_column_group_anything_else(&mut self, token: Token) -> ModeResult {
        if !self.current_is_html("colgroup") {
            self.error("unexpected-token-in-column-group");
            return ModeResult::Done;
        }
        self.open.pop();
        ModeResult::reprocess(Mode::InTable, token)
    }

    fn handle_in_table_body(&mut self, token: Token) -> ModeResult {
        match token {
            Token::StartTag(tag) if tag.name == "tr" => {
                self.clear_stack_to_table_body_context();
                self.insert_html_element(&tag);
                self.mode = Mode::InRow;
                ModeResult::Done
            }
            Token::StartTag(tag) if matches!(tag.name.as_str(), "td" | "th") => {
                self.error("unexpected-cell-in-table-body");
                self.clear_stack_to_table_body_context();
                self.insert_html_element(&Tag::named("tr"));
                self.mode = Mode::InRow;
                ModeResult::reprocess(Mode::InRow, Token::StartTag(tag))
            }
            Token::EndTag(tag)
                if matches!(tag.name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.open.has_in_scope(&self.dom, &tag.name, ScopeKind::Table) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.clear_stack_to_table_body_context();
                self.open.pop();
                self.mode = Mode::InTable;
                ModeResult::Done
            }
            Token::StartTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead"
                ) =>
            {
                self.in_table_body_to_table(Token::StartTag(tag))
            }
            Token::EndTag(tag) if tag.name == "table" => {
                self.in_table_body_to_table(Token::EndTag(tag))
            }
            Token::EndTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr"
                ) =>
            {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            other => self.handle_in_table(other),
        }
    }

    fn in_table_body_to_table(&mut self, token: Token) -> ModeResult {
        if !self
            .open
            .has_any_in_scope(&self.dom, &["tbody", "thead", "tfoot"], ScopeKind::Table)
        {
            self.error("unexpected-token");
            return ModeResult::Done;
        }
        self.clear_stack_to_table_body_context();
        self.open.pop();
        self.mode = Mode::InTable;
        ModeResult::reprocess(Mode::InTable, token)
    }

    fn handle_in_row(&mut self, token: Token) -> ModeResult {
        match token {
            Token::StartTag(tag) if matches!(tag.name.as_str(), "td" | "th") => {
                self.clear_stack_to_table_row_context();
                self.insert_html_element(&tag);
                self.mode = Mode::InCell;
                self.push_formatting_marker();
                ModeResult::Done
            }
            Token::EndTag(tag) if tag.name == "tr" => {
                if !self.open.has_in_scope(&self.dom, "tr", ScopeKind::Table) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.clear_stack_to_table_row_context();
                self.open.pop();
                self.mode = Mode::InTableBody;
                ModeResult::Done
            }
            Token::StartTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr"
                ) =>
            {
                self.in_row_close_then(Token::StartTag(tag))
            }
            Token::EndTag(tag) if tag.name == "table" => {
                self.in_row_close_then(Token::EndTag(tag))
            }
            Token::EndTag(tag)
                if matches!(tag.name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.open.has_in_scope(&self.dom, &tag.name, ScopeKind::Table) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.in_row_close_then(Token::EndTag(tag))
            }
            Token::EndTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th"
                ) =>
            {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            other => self.handle_in_table(other),
        }
    }

    fn in_row_close_then(&mut self, token: Token) -> ModeResult {
        if !self.open.has_in_scope(&self.dom, "tr", ScopeKind::Table) {
            self.error("unexpected-token");
            return ModeResult::Done;
        }
        self.clear_stack_to_table_row_context();
        self.open.pop();
        self.mode = Mode::InTableBody;
        ModeResult::reprocess(Mode::InTableBody, token)
    }

    fn handle_in_cell(&mut self, token: Token) -> ModeResult {
        match token {
            Token::EndTag(tag) if matches!(tag.name.as_str(), "td" | "th") => {
                let name = tag.name.as_str();
                if !self.open.has_in_scope(&self.dom, name, ScopeKind::Table) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.generate_implied_end_tags(None);
                if !self.current_is_html(name) {
                    self.error("end-tag-too-early");
                }
                self.open.pop_until_name(&self.dom, name);
                self.clear_formatting_to_marker();
                self.mode = Mode::InRow;
                ModeResult::Done
            }
            Token::StartTag(tag) if TagFlags::of(&tag.name).contains(TagFlags::TABLE_CHILD) => {
                if !self
                    .open
                    .has_any_in_scope(&self.dom, &["td", "th"], ScopeKind::Table)
                {
                    self.error("unexpected-start-tag");
                    return ModeResult::Done;
                }
                self.close_cell();
                ModeResult::reprocess(Mode::InRow, Token::StartTag(tag))
            }
            Token::EndTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html"
                ) =>
            {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            Token::EndTag(tag)
                if matches!(tag.name.as_str(), "table" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                if !self.open.has_in_scope(&self.dom, &tag.name, ScopeKind::Table) {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.close_cell();
                ModeResult::reprocess(Mode::InRow, Token::EndTag(tag))
            }
            other => self.handle_in_body(other),
        }
    }

    // --- select ---

    fn handle_in_select(&mut self, token: Token) -> ModeResult {
        // The extra clauses of IN_SELECT_IN_TABLE come first.
        if self.mode == Mode::InSelectInTable {
            match &token {
                Token::StartTag(tag)
                    if matches!(
                        tag.name.as_str(),
                        "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                    ) =>
                {
                    self.error("unexpected-table-element-start-tag-in-select-in-table");
                    self.open.pop_until_name(&self.dom, "select");
                    self.reset_insertion_mode();
                    return ModeResult::reprocess(self.mode, token);
                }
                Token::EndTag(tag)
                    if matches!(
                        tag.name.as_str(),
                        "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                    ) =>
                {
                    self.error("unexpected-table-element-end-tag-in-select-in-table");
                    if !self.open.has_in_scope(&self.dom, &tag.name, ScopeKind::Table) {
                        return ModeResult::Done;
                    }
                    self.open.pop_until_name(&self.dom, "select");
                    self.reset_insertion_mode();
                    return ModeResult::reprocess(self.mode, token);
                }
                _ => {}
            }
        }

        match token {
            Token::Character(data) => {
                let mut text = String::with_capacity(data.len());
                for c in data.chars() {
                    if c == '\0' {
                        self.error("unexpected-null-character");
                    } else {
                        text.push(c);
                    }
                }
                self.insert_text(&text);
                ModeResult::Done
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) => match tag.name.as_str() {
                "html" => self.handle_in_body(Token::StartTag(tag)),
                "option" => {
                    if self.current_is_html("option") {
                        self.open.pop();
                    }
                    self.insert_html_element(&tag);
                    ModeResult::Done
                }
                "optgroup" => {
                    if self.current_is_html("option") {
                        self.open.pop();
                    }
                    if self.current_is_html("optgroup") {
                        self.open.pop();
                    }
                    self.insert_html_element(&tag);
                    ModeResult::Done
                }
                "hr" => {
                    if self.current_is_html("option") {
                        self.open.pop();
                    }
                    if self.current_is_html("optgroup") {
                        self.open.pop();
                    }
                    self.insert_and_pop(&tag);
                    ModeResult::Done
                }
                // Customizable-select container; populated at finalization.
                "selectedcontent" => {
                    if self.current_is_html("option") {
                        self.open.pop();
                    }
                    self.insert_html_element(&tag);
                    ModeResult::Done
                }
                "select" => {
                    self.error("unexpected-select-in-select");
                    if self.open.has_in_scope(&self.dom, "select", ScopeKind::Select) {
                        self.open.pop_until_name(&self.dom, "select");
                        self.reset_insertion_mode();
                    }
                    ModeResult::Done
                }
                "input" | "keygen" | "textarea" => {
                    self.error("unexpected-input-in-select");
                    if !self.open.has_in_scope(&self.dom, "select", ScopeKind::Select) {
                        return ModeResult::Done;
                    }
                    self.open.pop_until_name(&self.dom, "select");
                    self.reset_insertion_mode();
                    ModeResult::reprocess(self.mode, Token::StartTag(tag))
                }
                "script" | "template" => self.handle_in_head(Token::StartTag(tag)),
                _ => {
                    self.error("unexpected-start-tag-in-select");
                    ModeResult::Done
                }
            },
            Token::EndTag(tag) => match tag.name.as_str() {
                "optgroup" => {
                    if self.current_is_html("option")
                        && self
                            .open
                            .get(self.open.len().saturating_sub(2))
                            .is_some_and(|n| self.dom.is_html_element(n, "optgroup"))
                    {
                        self.open.pop();
                    }
                    if self.current_is_html("optgroup") {
                        self.open.pop();
                    } else {
                        self.error("unexpected-end-tag");
                    }
                    ModeResult::Done
                }
                "option" => {
                    if self.current_is_html("option") {
                        self.open.pop();
                    } else {
                        self.error("unexpected-end-tag");
                    }
                    ModeResult::Done
                }
                "selectedcontent" => {
                    if self.current_is_html("selectedcontent") {
                        self.open.pop();
                    } else {
                        self.error("unexpected-end-tag");
                    }
                    ModeResult::Done
                }
                "select" => {
                    if !self.open.has_in_scope(&self.dom, "select", ScopeKind::Select) {
                        self.error("unexpected-end-tag");
                        return ModeResult::Done;
                    }
                    self.open.pop_until_name(&self.dom, "select");
                    self.reset_insertion_mode();
                    ModeResult::Done
                }
                "template" => self.handle_in_head(Token::EndTag(tag)),
                _ => {
                    self.error("unexpected-end-tag-in-select");
                    ModeResult::Done
                }
            },
            Token::Eof => self.handle_in_body(Token::Eof),
        }
    }

    // --- template ---

    fn handle_in_template(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(_) | Token::Comment(_) | Token::Doctype(_) => {
                self.handle_in_body(token)
            }
            Token::StartTag(tag) if TagFlags::of(&tag.name).contains(TagFlags::IN_HEAD) => {
                self.handle_in_head(Token::StartTag(tag))
            }
            Token::EndTag(tag) if tag.name == "template" => {
                self.handle_in_head(Token::EndTag(tag))
            }
            Token::StartTag(tag)
                if matches!(
                    tag.name.as_str(),
                    "caption" | "colgroup" | "tbody" | "tfoot" | "thead"
                ) =>
            {
                self.template_switch(Mode::InTable, Token::StartTag(tag))
            }
            Token::StartTag(tag) if tag.name == "col" => {
                self.template_switch(Mode::InColumnGroup, Token::StartTag(tag))
            }
            Token::StartTag(tag) if tag.name == "tr" => {
                self.template_switch(Mode::InTableBody, Token::StartTag(tag))
            }
            Token::StartTag(tag) if matches!(tag.name.as_str(), "td" | "th") => {
                self.template_switch(Mode::InRow, Token::StartTag(tag))
            }
            Token::StartTag(tag) => self.template_switch(Mode::InBody, Token::StartTag(tag)),
            Token::EndTag(_) => {
                self.error("unexpected-end-tag");
                ModeResult::Done
            }
            Token::Eof => {
                if !self.open.contains_html_element(&self.dom, "template") {
                    self.stop_parsing();
                    return ModeResult::Done;
                }
                self.error("eof-in-template");
                self.open.pop_until_name(&self.dom, "template");
                self.clear_formatting_to_marker();
                self.template_modes.pop();
                self.reset_insertion_mode();
                ModeResult::reprocess(self.mode, Token::Eof)
            }
        }
    }

    fn template_switch(&mut self, mode: Mode, token: Token) -> ModeResult {
        self.template_modes.pop();
        self.template_modes.push(mode);
        ModeResult::reprocess(mode, token)
    }

    // --- after body / frameset tails ---

    fn handle_after_body(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let (ws, rest) = split_leading_whitespace(&data);
                if !ws.is_empty() {
                    let _ = self.handle_in_body(Token::Character(ws.to_string()));
                }
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.error("unexpected-char-after-body");
                ModeResult::reprocess(Mode::InBody, Token::Character(rest.to_string()))
            }
            Token::Comment(data) => {
                let html = self
                    .open
                    .first()
                    .expect("the html element outlives AFTER_BODY");
                self.insert_comment_in(&data, html);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) if tag.name == "html" => {
                self.handle_in_body(Token::StartTag(tag))
            }
            Token::EndTag(tag) if tag.name == "html" => {
                if self.fragment {
                    self.error("unexpected-end-tag");
                    return ModeResult::Done;
                }
                self.mode = Mode::AfterAfterBody;
                ModeResult::Done
            }
            Token::Eof => {
                self.stop_parsing();
                ModeResult::Done
            }
            other => {
                self.error("unexpected-token-after-body");
                ModeResult::reprocess(Mode::InBody, other)
            }
        }
    }

    fn handle_in_frameset(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let ws: String = data
                    .chars()
                    .filter(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
                    .collect();
                if ws.len() != data.len() {
                    self.error("unexpected-char-in-frameset");
                }
                self.insert_text(&ws);
                ModeResult::Done
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) => match tag.name.as_str() {
                "html" => self.handle_in_body(Token::StartTag(tag)),
                "frameset" => {
                    self.insert_html_element(&tag);
                    ModeResult::Done
                }
                "frame" => {
                    self.insert_and_pop(&tag);
                    ModeResult::Done
                }
                "noframes" => self.handle_in_head(Token::StartTag(tag)),
                _ => {
                    self.error("unexpected-start-tag-in-frameset");
                    ModeResult::Done
                }
            },
            Token::EndTag(tag) if tag.name == "frameset" => {
                if self.open.len() == 1 {
                    self.error("unexpected-frameset-in-frameset-innerhtml");
                    return ModeResult::Done;
                }
                self.open.pop();
                if !self.fragment && !self.current_is_html("frameset") {
                    self.mode = Mode::AfterFrameset;
                }
                ModeResult::Done
            }
            Token::EndTag(_) => {
                self.error("unexpected-end-tag-in-frameset");
                ModeResult::Done
            }
            Token::Eof => {
                if self.open.len() != 1 {
                    self.error("eof-in-frameset");
                }
                self.stop_parsing();
                ModeResult::Done
            }
        }
    }

    fn handle_after_frameset(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let ws: String = data
                    .chars()
                    .filter(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
                    .collect();
                if ws.len() != data.len() {
                    self.error("unexpected-char-after-frameset");
                }
                self.insert_text(&ws);
                ModeResult::Done
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(tag) if tag.name == "html" => {
                self.handle_in_body(Token::StartTag(tag))
            }
            Token::StartTag(tag) if tag.name == "noframes" => {
                self.handle_in_head(Token::StartTag(tag))
            }
            Token::EndTag(tag) if tag.name == "html" => {
                self.mode = Mode::AfterAfterFrameset;
                ModeResult::Done
            }
            Token::Eof => {
                self.stop_parsing();
                ModeResult::Done
            }
            _ => {
                self.error("unexpected-token-after-frameset");
                ModeResult::Done
            }
        }
    }

    fn handle_after_after_body(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Comment(data) => {
                let root = self.dom.root();
                self.insert_comment_in(&data, root);
                ModeResult::Done
            }
            Token::Doctype(_) => self.handle_in_body(token),
            Token::Character(data) => {
                let (ws, rest) = split_leading_whitespace(&data);
                if !ws.is_empty() {
                    let _ = self.handle_in_body(Token::Character(ws.to_string()));
                }
                if rest.is_empty() {
                    return ModeResult::Done;
                }
                self.error("expected-eof-but-got-char");
                ModeResult::reprocess(Mode::InBody, Token::Character(rest.to_string()))
            }
            Token::StartTag(tag) if tag.name == "html" => {
                self.handle_in_body(Token::StartTag(tag))
            }
            Token::Eof => {
                self.stop_parsing();
                ModeResult::Done
            }
            other => {
                self.error("expected-eof-but-got-token");
                ModeResult::reprocess(Mode::InBody, other)
            }
        }
    }

    fn handle_after_after_frameset(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Comment(data) => {
                let root = self.dom.root();
                self.insert_comment_in(&data, root);
                ModeResult::Done
            }
            Token::Doctype(_) => self.handle_in_body(token),
            Token::Character(data) => {
                let (ws, rest) = split_leading_whitespace(&data);
                if !ws.is_empty() {
                    let _ = self.handle_in_body(Token::Character(ws.to_string()));
                }
                if !rest.is_empty() {
                    self.error("expected-eof-but-got-char");
                }
                ModeResult::Done
            }
            Token::StartTag(tag) if tag.name == "html" => {
                self.handle_in_body(Token::StartTag(tag))
            }
            Token::StartTag(tag) if tag.name == "noframes" => {
                self.handle_in_head(Token::StartTag(tag))
            }
            Token::Eof => {
                self.stop_parsing();
                ModeResult::Done
            }
            _ => {
                self.error("expected-eof-but-got-token");
                ModeResult::Done
            }
        }
    }

    // --- foreign content ---

    pub(crate) fn process_foreign(&mut self, token: Token) -> ModeResult {
        match token {
            Token::Character(data) => {
                let mut text = String::with_capacity(data.len());
                for c in data.chars() {
                    if c == '\0' {
                        self.error("invalid-codepoint-in-foreign-content");
                        text.push('\u{FFFD}');
                    } else {
                        text.push(c);
                    }
                }
                if text
                    .chars()
                    .any(|c| !matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
                {
                    self.frameset_ok = false;
                }
                self.insert_text(&text);
                ModeResult::Done
            }
            Token::Comment(data) => {
                self.insert_comment(&data);
                ModeResult::Done
            }
            Token::Doctype(_) => {
                self.error("unexpected-doctype");
                ModeResult::Done
            }
            Token::StartTag(mut tag) => {
                let font_breakout = tag.name == "font"
                    && tag
                        .attrs
                        .iter()
                        .any(|a| matches!(a.name.as_str(), "color" | "face" | "size"));
                if TagFlags::of(&tag.name).contains(TagFlags::FOREIGN_BREAK) || font_breakout {
                    self.error("unexpected-html-element-in-foreign-content");
                    self.pop_to_foreign_boundary();
                    self.reset_insertion_mode();
                    return ModeResult::Reprocess {
                        mode: self.mode,
                        token: Token::StartTag(tag),
                        force_html: true,
                    };
                }

                let namespace = self
                    .adjusted_current_node()
                    .and_then(|n| self.dom.namespace(n))
                    .unwrap_or(Namespace::Html);
                match namespace {
                    Namespace::MathMl => adjust_mathml_attributes(&mut tag),
                    Namespace::Svg => {
                        let adjusted = adjust_svg_tag_name(&tag.name);
                        if adjusted != tag.name {
                            tag.name = adjusted.to_string();
                        }
                        adjust_svg_attributes(&mut tag);
                    }
                    Namespace::Html => {}
                }
                adjust_foreign_attributes(&mut tag);
                self.insert_foreign_element(&tag, namespace);
                if tag.self_closing {
                    self.open.pop();
                }
                ModeResult::Done
            }
            Token::EndTag(tag) => {
                if tag.name == "script"
                    && self.current().is_some_and(|n| {
                        self.dom.namespace(n) == Some(Namespace::Svg)
                            && self.dom.element_name(n) == Some("script")
                    })
                {
                    self.open.pop();
                    return ModeResult::Done;
                }

                let mut idx = self.open.len() - 1;
                let mut node = self.open.get(idx).unwrap();
                if !element_name_matches_ci(self, node, &tag.name) {
                    self.error("unexpected-end-tag");
                }
                loop {
                    if idx == 0 {
                        return ModeResult::Done;
                    }
                    if element_name_matches_ci(self, node, &tag.name) {
                        self.open.pop_until_node(node);
                        return ModeResult::Done;
                    }
                    idx -= 1;
                    node = self.open.get(idx).unwrap();
                    if self.dom.namespace(node) == Some(Namespace::Html) {
                        return ModeResult::Reprocess {
                            mode: self.mode,
                            token: Token::EndTag(tag),
                            force_html: true,
                        };
                    }
                }
            }
            Token::Eof => unreachable!("EOF always dispatches to HTML rules"),
        }
    }

    fn pop_to_foreign_boundary(&mut self) {
        while let Some(node) = self.current() {
            if self.dom.namespace(node) == Some(Namespace::Html)
                || is_mathml_text_integration_point(&self.dom, node)
                || is_html_integration_point(&self.dom, node)
            {
                break;
            }
            self.open.pop();
        }
    }
}

fn element_name_matches_ci(builder: &TreeBuilder, node: crate::dom::NodeId, name: &str) -> bool {
    builder
        .dom
        .element_name(node)
        .is_some_and(|n| n.to_ascii_lowercase() == name)
}

