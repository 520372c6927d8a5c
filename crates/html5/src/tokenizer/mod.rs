//! HTML5 tokenizer.
//!
//! A synchronous state machine over a decoded, newline-normalized buffer. It
//! pushes fully formed tokens into a [`TokenSink`]; the sink's return value
//! is the back-channel that lets the tree builder force PLAINTEXT or signal
//! that the last start tag opened a foreign element (which suppresses the
//! RAWTEXT/RCDATA auto-switch).
//!
//! Invariants:
//! - `\r\n` and `\r` are collapsed to `\n` before the state machine sees the
//!   text; states never observe a carriage return.
//! - Tag and attribute names are canonical lowercase on emission.
//! - Duplicate attribute names are dropped at commit time, first wins.
//! - Character tokens carry runs: each state fast-forwards over characters
//!   that cannot change state with a single scan.

mod states;
mod token;

#[cfg(test)]
mod tests;

pub use states::InitialState;
pub use token::{Attribute, DoctypeToken, Tag, Token};

use crate::entities::consume_char_ref;
use crate::error::ParseError;
use crate::tags::TagFlags;
use states::State;

/// Directive returned by the sink for every processed token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkResult {
    Continue,
    /// The token opened a foreign (SVG/MathML) element; do not auto-switch.
    ContinueForeign,
    /// Force the tokenizer into PLAINTEXT.
    Plaintext,
}

/// Consumer of the token stream.
pub trait TokenSink {
    fn process_token(&mut self, token: Token) -> SinkResult;

    /// Whether the adjusted current node is outside the HTML namespace.
    /// Gates CDATA sections; the default suits sinks without a tree.
    fn adjusted_current_node_is_foreign(&self) -> bool {
        false
    }
}

/// Tokenizer configuration. Test and fragment hooks; defaults suit a
/// document parse.
#[derive(Clone, Debug)]
pub struct TokenizerOpts {
    pub initial_state: InitialState,
    /// Pre-seeded "last start tag" for fragment parsing and fixture replay.
    pub last_start_tag: Option<String>,
    /// Drop a leading U+FEFF from the decoded text.
    pub discard_bom: bool,
    /// Test-only XML coercion of characters and comment data.
    pub xml_coercion: bool,
    pub collect_errors: bool,
    /// Emitting `<script>`, `<style>`, `<title>`, ... switches the state
    /// machine directly. Fixture replay turns this off: the conformance
    /// tokenizer is driven without a tree builder.
    pub tag_state_switching: bool,
    /// Scripting flag: adds `noscript` to the RAWTEXT switch set.
    pub scripting: bool,
}

impl Default for TokenizerOpts {
    fn default() -> Self {
        Self {
            initial_state: InitialState::Data,
            last_start_tag: None,
            discard_bom: true,
            xml_coercion: false,
            collect_errors: false,
            tag_state_switching: true,
            scripting: false,
        }
    }
}

enum Step {
    Continue,
    Done,
}

pub struct Tokenizer {
    input: String,
    pos: usize,
    line: u32,
    col: u32,
    state: State,
    opts: TokenizerOpts,
    last_start_tag: String,
    tag: Tag,
    tag_is_end: bool,
    attr_name: String,
    attr_value: String,
    attr_dropped: bool,
    attr_pending: bool,
    comment: String,
    doctype: DoctypeToken,
    temp_buf: String,
    errors: Vec<ParseError>,
}

impl Tokenizer {
    pub fn new(input: &str, opts: TokenizerOpts) -> Self {
        let mut text = normalize_newlines(input);
        if opts.discard_bom && text.starts_with('\u{FEFF}') {
            text.drain(..'\u{FEFF}'.len_utf8());
        }
        let state = opts.initial_state.to_state();
        let last_start_tag = opts.last_start_tag.clone().unwrap_or_default();
        Self {
            input: text,
            pos: 0,
            line: 1,
            col: 1,
            state,
            opts,
            last_start_tag,
            tag: Tag::default(),
            tag_is_end: false,
            attr_name: String::new(),
            attr_value: String::new(),
            attr_dropped: false,
            attr_pending: false,
            comment: String::new(),
            doctype: DoctypeToken::default(),
            temp_buf: String::new(),
            errors: Vec::new(),
        }
    }

    /// Run the machine to EOF, pushing every token into `sink`.
    pub fn run(&mut self, sink: &mut dyn TokenSink) {
        loop {
            if matches!(self.step(sink), Step::Done) {
                break;
            }
        }
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    // --- input primitives ---

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self, len: usize) {
        let consumed = &self.input[self.pos..self.pos + len];
        let newlines = memchr::memchr_iter(b'\n', consumed.as_bytes()).count();
        if newlines > 0 {
            self.line += newlines as u32;
            let last = memchr::memrchr(b'\n', consumed.as_bytes()).unwrap();
            self.col = consumed[last + 1..].chars().count() as u32 + 1;
        } else {
            self.col += consumed.chars().count() as u32;
        }
        self.pos += len;
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump(expected.len_utf8());
            true
        } else {
            false
        }
    }

    /// Consume the maximal run of characters for which `stop` is false and
    /// return it. Empty when the next character is a stop or input is done.
    fn take_run(&mut self, stop: impl Fn(char) -> bool) -> String {
        let rest = &self.input[self.pos..];
        let end = rest
            .char_indices()
            .find(|&(_, c)| stop(c))
            .map_or(rest.len(), |(i, _)| i);
        let run = rest[..end].to_string();
        if end > 0 {
            self.bump(end);
        }
        run
    }

    fn starts_with_ci(&self, keyword: &str) -> bool {
        let rest = self.input[self.pos..].as_bytes();
        rest.len() >= keyword.len() && rest[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
    }

    fn eat_seq_ci(&mut self, keyword: &str) -> bool {
        if self.starts_with_ci(keyword) {
            self.bump(keyword.len());
            true
        } else {
            false
        }
    }

    fn error(&mut self, code: &'static str) {
        if self.opts.collect_errors {
            self.errors.push(ParseError::at(code, self.line, self.col));
        }
    }

    // --- emission ---

    fn emit_chars(&mut self, sink: &mut dyn TokenSink, data: String) {
        if data.is_empty() {
            return;
        }
        let data = if self.opts.xml_coercion {
            coerce_chars(&data)
        } else {
            data
        };
        self.feedback(sink.process_token(Token::Character(data)));
    }

    fn emit_char(&mut self, sink: &mut dyn TokenSink, ch: char) {
        self.emit_chars(sink, ch.to_string());
    }

    fn emit_comment(&mut self, sink: &mut dyn TokenSink) {
        let mut data = std::mem::take(&mut self.comment);
        if self.opts.xml_coercion {
            data = coerce_comment(&data);
        }
        self.feedback(sink.process_token(Token::Comment(data)));
    }

    fn emit_doctype(&mut self, sink: &mut dyn TokenSink) {
        let doctype = std::mem::take(&mut self.doctype);
        self.feedback(sink.process_token(Token::Doctype(doctype)));
    }

    fn emit_eof(&mut self, sink: &mut dyn TokenSink) -> Step {
        let _ = sink.process_token(Token::Eof);
        Step::Done
    }

    fn emit_tag(&mut self, sink: &mut dyn TokenSink) {
        self.commit_attr();
        let tag = std::mem::take(&mut self.tag);
        let result = if self.tag_is_end {
            if !tag.attrs.is_empty() {
                self.error("end-tag-with-attributes");
            }
            if tag.self_closing {
                self.error("end-tag-with-trailing-solidus");
            }
            sink.process_token(Token::EndTag(tag))
        } else {
            self.last_start_tag = tag.name.clone();
            let name = tag.name.clone();
            let result = sink.process_token(Token::StartTag(tag));
            if result != SinkResult::ContinueForeign && self.opts.tag_state_switching {
                self.auto_switch(&name);
            }
            result
        };
        self.feedback(result);
    }

    /// The RAWTEXT/RCDATA/PLAINTEXT switch the HTML standard hangs off
    /// emitted HTML start tags.
    fn auto_switch(&mut self, name: &str) {
        let flags = TagFlags::of(name);
        if flags.contains(TagFlags::RAWTEXT) {
            self.state = if name == "script" {
                State::ScriptData
            } else {
                State::Rawtext
            };
        } else if flags.contains(TagFlags::RCDATA) {
            self.state = State::Rcdata;
        } else if name == "plaintext" {
            self.state = State::Plaintext;
        } else if name == "noscript" && self.opts.scripting {
            self.state = State::Rawtext;
        }
    }

    fn feedback(&mut self, result: SinkResult) {
        if result == SinkResult::Plaintext {
            self.state = State::Plaintext;
        }
    }

    // --- tag builder ---

    fn new_tag(&mut self, is_end: bool) {
        self.tag = Tag::default();
        self.tag_is_end = is_end;
        self.attr_name.clear();
        self.attr_value.clear();
        self.attr_pending = false;
        self.attr_dropped = false;
    }

    fn start_attr(&mut self) {
        self.commit_attr();
        self.attr_pending = true;
        self.attr_dropped = false;
        self.attr_name.clear();
        self.attr_value.clear();
    }

    /// Duplicate check happens when the name completes; the attribute is
    /// still parsed in full either way so the value states stay uniform.
    fn finish_attr_name(&mut self) {
        if self.tag.attrs.iter().any(|a| a.name == self.attr_name) {
            self.error("duplicate-attribute");
            self.attr_dropped = true;
        }
    }

    fn commit_attr(&mut self) {
        if !self.attr_pending {
            return;
        }
        self.attr_pending = false;
        if self.attr_dropped {
            self.attr_name.clear();
            self.attr_value.clear();
            return;
        }
        self.tag.attrs.push(Attribute {
            name: std::mem::take(&mut self.attr_name),
            value: std::mem::take(&mut self.attr_value),
        });
    }

    fn appropriate_end_tag(&self) -> bool {
        !self.last_start_tag.is_empty() && self.tag.name == self.last_start_tag
    }

    /// Decode a character reference at the cursor (which sits on `&`).
    fn char_ref(&mut self, in_attribute: bool) -> String {
        let result = consume_char_ref(&self.input[self.pos..], in_attribute);
        for &code in &result.errors {
            self.error(code);
        }
        self.bump(result.consumed);
        result.text
    }

    // --- driver ---

    fn step(&mut self, sink: &mut dyn TokenSink) -> Step {
        #[cfg(any(test, feature = "debug-trace"))]
        log::trace!(target: "html5.tokenizer", "state {:?} @{}", self.state, self.pos);
        match self.state {
            State::Data => self.step_data(sink),
            State::Rcdata => self.step_rcdata(sink),
            State::Rawtext => self.step_rawtext(sink),
            State::ScriptData => self.step_script_data(sink),
            State::Plaintext => self.step_plaintext(sink),
            State::TagOpen => self.step_tag_open(sink),
            State::EndTagOpen => self.step_end_tag_open(sink),
            State::TagName => self.step_tag_name(sink),
            State::RcdataLessThanSign => self.step_raw_less_than_sign(sink, State::Rcdata),
            State::RcdataEndTagOpen => self.step_raw_end_tag_open(sink, State::Rcdata),
            State::RcdataEndTagName => self.step_raw_end_tag_name(sink, State::Rcdata),
            State::RawtextLessThanSign => self.step_raw_less_than_sign(sink, State::Rawtext),
            State::RawtextEndTagOpen => self.step_raw_end_tag_open(sink, State::Rawtext),
            State::RawtextEndTagName => self.step_raw_end_tag_name(sink, State::Rawtext),
            State::ScriptDataLessThanSign => self.step_script_data_less_than_sign(sink),
            State::ScriptDataEndTagOpen => self.step_raw_end_tag_open(sink, State::ScriptData),
            State::ScriptDataEndTagName => self.step_raw_end_tag_name(sink, State::ScriptData),
            State::ScriptDataEscapeStart => self.step_script_data_escape_start(sink),
            State::ScriptDataEscapeStartDash => self.step_script_data_escape_start_dash(sink),
            State::ScriptDataEscaped => self.step_script_data_escaped(sink),
            State::ScriptDataEscapedDash => self.step_script_data_escaped_dash(sink),
            State::ScriptDataEscapedDashDash => self.step_script_data_escaped_dash_dash(sink),
            State::ScriptDataEscapedLessThanSign => {
                self.step_script_data_escaped_less_than_sign(sink)
            }
            State::ScriptDataEscapedEndTagOpen => {
                self.step_raw_end_tag_open(sink, State::ScriptDataEscaped)
            }
            State::ScriptDataEscapedEndTagName => {
                self.step_raw_end_tag_name(sink, State::ScriptDataEscaped)
            }
            State::ScriptDataDoubleEscapeStart => self.step_script_data_double_escape_flip(
                sink,
                State::ScriptDataDoubleEscaped,
                State::ScriptDataEscaped,
            ),
            State::ScriptDataDoubleEscaped => self.step_script_data_double_escaped(sink),
            State::ScriptDataDoubleEscapedDash => self.step_script_data_double_escaped_dash(sink),
            State::ScriptDataDoubleEscapedDashDash => {
                self.step_script_data_double_escaped_dash_dash(sink)
            }
            State::ScriptDataDoubleEscapedLessThanSign => {
                self.step_script_data_double_escaped_less_than_sign(sink)
            }
            State::ScriptDataDoubleEscapeEnd => self.step_script_data_double_escape_flip(
                sink,
                State::ScriptDataEscaped,
                State::ScriptDataDoubleEscaped,
            ),
            State::BeforeAttributeName => self.step_before_attribute_name(sink),
            State::AttributeName => self.step_attribute_name(sink),
            State::AfterAttributeName => self.step_after_attribute_name(sink),
            State::BeforeAttributeValue => self.step_before_attribute_value(sink),
            State::AttributeValueDoubleQuoted => self.step_attribute_value_quoted(sink, '"'),
            State::AttributeValueSingleQuoted => self.step_attribute_value_quoted(sink, '\''),
            State::AttributeValueUnquoted => self.step_attribute_value_unquoted(sink),
            State::AfterAttributeValueQuoted => self.step_after_attribute_value_quoted(sink),
            State::SelfClosingStartTag => self.step_self_closing_start_tag(sink),
            State::BogusComment => self.step_bogus_comment(sink),
            State::MarkupDeclarationOpen => self.step_markup_declaration_open(sink),
            State::CommentStart => self.step_comment_start(sink),
            State::CommentStartDash => self.step_comment_start_dash(sink),
            State::Comment => self.step_comment(sink),
            State::CommentLessThanSign => self.step_comment_less_than_sign(sink),
            State::CommentLessThanSignBang => self.step_comment_less_than_sign_bang(sink),
            State::CommentLessThanSignBangDash => self.step_comment_less_than_sign_bang_dash(sink),
            State::CommentLessThanSignBangDashDash => {
                self.step_comment_less_than_sign_bang_dash_dash(sink)
            }
            State::CommentEndDash => self.step_comment_end_dash(sink),
            State::CommentEnd => self.step_comment_end(sink),
            State::CommentEndBang => self.step_comment_end_bang(sink),
            State::Doctype => self.step_doctype(sink),
            State::BeforeDoctypeName => self.step_before_doctype_name(sink),
            State::DoctypeName => self.step_doctype_name(sink),
            State::AfterDoctypeName => self.step_after_doctype_name(sink),
            State::AfterDoctypePublicKeyword => self.step_after_doctype_public_keyword(sink),
            State::BeforeDoctypePublicIdentifier => {
                self.step_before_doctype_identifier(sink, IdKind::Public)
            }
            State::DoctypePublicIdentifierDoubleQuoted => {
                self.step_doctype_identifier_quoted(sink, IdKind::Public, '"')
            }
            State::DoctypePublicIdentifierSingleQuoted => {
                self.step_doctype_identifier_quoted(sink, IdKind::Public, '\'')
            }
            State::AfterDoctypePublicIdentifier => self.step_after_doctype_public_identifier(sink),
            State::BetweenDoctypePublicAndSystemIdentifiers => {
                self.step_between_doctype_public_and_system(sink)
            }
            State::AfterDoctypeSystemKeyword => self.step_after_doctype_system_keyword(sink),
            State::BeforeDoctypeSystemIdentifier => {
                self.step_before_doctype_identifier(sink, IdKind::System)
            }
            State::DoctypeSystemIdentifierDoubleQuoted => {
                self.step_doctype_identifier_quoted(sink, IdKind::System, '"')
            }
            State::DoctypeSystemIdentifierSingleQuoted => {
                self.step_doctype_identifier_quoted(sink, IdKind::System, '\'')
            }
            State::AfterDoctypeSystemIdentifier => self.step_after_doctype_system_identifier(sink),
            State::BogusDoctype => self.step_bogus_doctype(sink),
            State::CdataSection => self.step_cdata_section(sink),
            State::CdataSectionBracket => self.step_cdata_section_bracket(sink),
            State::CdataSectionEnd => self.step_cdata_section_end(sink),
        }
    }

    // --- text states ---

    fn step_data(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => self.emit_eof(sink),
            Some('&') => {
                let text = self.char_ref(false);
                self.emit_chars(sink, text);
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.state = State::TagOpen;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\0');
                Step::Continue
            }
            Some(_) => {
                let run = self.take_run(|c| matches!(c, '&' | '<' | '\0'));
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    fn step_rcdata(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => self.emit_eof(sink),
            Some('&') => {
                let text = self.char_ref(false);
                self.emit_chars(sink, text);
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.state = State::RcdataLessThanSign;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                Step::Continue
            }
            Some(_) => {
                let run = self.take_run(|c| matches!(c, '&' | '<' | '\0'));
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    fn step_rawtext(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => self.emit_eof(sink),
            Some('<') => {
                self.bump(1);
                self.state = State::RawtextLessThanSign;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                Step::Continue
            }
            Some(_) => {
                let run = self.take_run(|c| matches!(c, '<' | '\0'));
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    fn step_script_data(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => self.emit_eof(sink),
            Some('<') => {
                self.bump(1);
                self.state = State::ScriptDataLessThanSign;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                Step::Continue
            }
            Some(_) => {
                let run = self.take_run(|c| matches!(c, '<' | '\0'));
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    fn step_plaintext(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => self.emit_eof(sink),
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                Step::Continue
            }
            Some(_) => {
                let run = self.take_run(|c| c == '\0');
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    // --- tag states ---

    fn step_tag_open(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('!') => {
                self.bump(1);
                self.state = State::MarkupDeclarationOpen;
                Step::Continue
            }
            Some('/') => {
                self.bump(1);
                self.state = State::EndTagOpen;
                Step::Continue
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.new_tag(false);
                self.state = State::TagName;
                Step::Continue
            }
            Some('?') => {
                self.error("unexpected-question-mark-instead-of-tag-name");
                self.comment.clear();
                self.state = State::BogusComment;
                Step::Continue
            }
            None => {
                self.error("eof-before-tag-name");
                self.emit_char(sink, '<');
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("invalid-first-character-of-tag-name");
                self.emit_char(sink, '<');
                self.state = State::Data;
                Step::Continue
            }
        }
    }

    fn step_end_tag_open(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                self.new_tag(true);
                self.state = State::TagName;
                Step::Continue
            }
            Some('>') => {
                self.error("missing-end-tag-name");
                self.bump(1);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-before-tag-name");
                self.emit_chars(sink, "</".to_string());
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("invalid-first-character-of-tag-name");
                self.comment.clear();
                self.state = State::BogusComment;
                Step::Continue
            }
        }
    }

    fn step_tag_name(&mut self, sink: &mut dyn TokenSink) -> Step {
        let run = self.take_run(|c| matches!(c, '\t' | '\n' | '\x0C' | ' ' | '/' | '>' | '\0'));
        if !run.is_empty() {
            push_lowercase(&mut self.tag.name, &run);
        }
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                self.state = State::BeforeAttributeName;
                Step::Continue
            }
            Some('/') => {
                self.bump(1);
                self.state = State::SelfClosingStartTag;
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_tag(sink);
                if self.state == State::TagName {
                    self.state = State::Data;
                }
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.tag.name.push('\u{FFFD}');
                Step::Continue
            }
            None => {
                self.error("eof-in-tag");
                self.emit_eof(sink)
            }
            Some(_) => unreachable!("tag-name stop set covers every branch"),
        }
    }

    // --- rcdata/rawtext/script-data end tags ---

    fn step_raw_less_than_sign(&mut self, sink: &mut dyn TokenSink, base: State) -> Step {
        if self.eat('/') {
            self.temp_buf.clear();
            self.state = match base {
                State::Rcdata => State::RcdataEndTagOpen,
                State::Rawtext => State::RawtextEndTagOpen,
                _ => unreachable!(),
            };
        } else {
            self.emit_char(sink, '<');
            self.state = base;
        }
        Step::Continue
    }

    fn step_raw_end_tag_open(&mut self, sink: &mut dyn TokenSink, base: State) -> Step {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                self.new_tag(true);
                self.state = match base {
                    State::Rcdata => State::RcdataEndTagName,
                    State::Rawtext => State::RawtextEndTagName,
                    State::ScriptData => State::ScriptDataEndTagName,
                    State::ScriptDataEscaped => State::ScriptDataEscapedEndTagName,
                    _ => unreachable!(),
                };
                Step::Continue
            }
            _ => {
                self.emit_chars(sink, "</".to_string());
                self.state = base;
                Step::Continue
            }
        }
    }

    fn step_raw_end_tag_name(&mut self, sink: &mut dyn TokenSink, base: State) -> Step {
        while let Some(c) = self.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            self.bump(1);
            self.tag.name.push(c.to_ascii_lowercase());
            self.temp_buf.push(c);
        }
        let appropriate = self.appropriate_end_tag();
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') if appropriate => {
                self.bump(1);
                self.state = State::BeforeAttributeName;
                Step::Continue
            }
            Some('/') if appropriate => {
                self.bump(1);
                self.state = State::SelfClosingStartTag;
                Step::Continue
            }
            Some('>') if appropriate => {
                self.bump(1);
                self.emit_tag(sink);
                self.state = State::Data;
                Step::Continue
            }
            _ => {
                let mut flushed = String::from("</");
                flushed.push_str(&self.temp_buf);
                self.emit_chars(sink, flushed);
                self.state = base;
                Step::Continue
            }
        }
    }

    // --- script data escapes ---

    fn step_script_data_less_than_sign(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('/') => {
                self.bump(1);
                self.temp_buf.clear();
                self.state = State::ScriptDataEndTagOpen;
            }
            Some('!') => {
                self.bump(1);
                self.emit_chars(sink, "<!".to_string());
                self.state = State::ScriptDataEscapeStart;
            }
            _ => {
                self.emit_char(sink, '<');
                self.state = State::ScriptData;
            }
        }
        Step::Continue
    }

    fn step_script_data_escape_start(&mut self, sink: &mut dyn TokenSink) -> Step {
        if self.eat('-') {
            self.emit_char(sink, '-');
            self.state = State::ScriptDataEscapeStartDash;
        } else {
            self.state = State::ScriptData;
        }
        Step::Continue
    }

    fn step_script_data_escape_start_dash(&mut self, sink: &mut dyn TokenSink) -> Step {
        if self.eat('-') {
            self.emit_char(sink, '-');
            self.state = State::ScriptDataEscapedDashDash;
        } else {
            self.state = State::ScriptData;
        }
        Step::Continue
    }

    fn step_script_data_escaped(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => {
                self.error("eof-in-script-html-comment-like-text");
                self.emit_eof(sink)
            }
            Some('-') => {
                self.bump(1);
                self.emit_char(sink, '-');
                self.state = State::ScriptDataEscapedDash;
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.state = State::ScriptDataEscapedLessThanSign;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                Step::Continue
            }
            Some(_) => {
                let run = self.take_run(|c| matches!(c, '-' | '<' | '\0'));
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    fn step_script_data_escaped_dash(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => {
                self.error("eof-in-script-html-comment-like-text");
                self.emit_eof(sink)
            }
            Some('-') => {
                self.bump(1);
                self.emit_char(sink, '-');
                self.state = State::ScriptDataEscapedDashDash;
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.state = State::ScriptDataEscapedLessThanSign;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                self.state = State::ScriptDataEscaped;
                Step::Continue
            }
            Some(c) => {
                self.bump(c.len_utf8());
                self.emit_char(sink, c);
                self.state = State::ScriptDataEscaped;
                Step::Continue
            }
        }
    }

    fn step_script_data_escaped_dash_dash(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => {
                self.error("eof-in-script-html-comment-like-text");
                self.emit_eof(sink)
            }
            Some('-') => {
                self.bump(1);
                self.emit_char(sink, '-');
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.state = State::ScriptDataEscapedLessThanSign;
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_char(sink, '>');
                self.state = State::ScriptData;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                self.state = State::ScriptDataEscaped;
                Step::Continue
            }
            Some(c) => {
                self.bump(c.len_utf8());
                self.emit_char(sink, c);
                self.state = State::ScriptDataEscaped;
                Step::Continue
            }
        }
    }

    fn step_script_data_escaped_less_than_sign(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('/') => {
                self.bump(1);
                self.temp_buf.clear();
                self.state = State::ScriptDataEscapedEndTagOpen;
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.temp_buf.clear();
                self.emit_char(sink, '<');
                self.state = State::ScriptDataDoubleEscapeStart;
            }
            _ => {
                self.emit_char(sink, '<');
                self.state = State::ScriptDataEscaped;
            }
        }
        Step::Continue
    }

    /// Shared body of double-escape-start and double-escape-end: both collect
    /// a tag-name-ish run and flip between the escaped flavors on "script".
    fn step_script_data_double_escape_flip(
        &mut self,
        sink: &mut dyn TokenSink,
        on_script: State,
        otherwise: State,
    ) -> Step {
        match self.peek() {
            Some(c @ ('\t' | '\n' | '\x0C' | ' ' | '/' | '>')) => {
                self.bump(c.len_utf8());
                self.state = if self.temp_buf == "script" {
                    on_script
                } else {
                    otherwise
                };
                self.emit_char(sink, c);
                Step::Continue
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.bump(1);
                self.temp_buf.push(c.to_ascii_lowercase());
                self.emit_char(sink, c);
                Step::Continue
            }
            _ => {
                self.state = otherwise;
                Step::Continue
            }
        }
    }

    fn step_script_data_double_escaped(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => {
                self.error("eof-in-script-html-comment-like-text");
                self.emit_eof(sink)
            }
            Some('-') => {
                self.bump(1);
                self.emit_char(sink, '-');
                self.state = State::ScriptDataDoubleEscapedDash;
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.emit_char(sink, '<');
                self.state = State::ScriptDataDoubleEscapedLessThanSign;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                Step::Continue
            }
            Some(_) => {
                let run = self.take_run(|c| matches!(c, '-' | '<' | '\0'));
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    fn step_script_data_double_escaped_dash(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => {
                self.error("eof-in-script-html-comment-like-text");
                self.emit_eof(sink)
            }
            Some('-') => {
                self.bump(1);
                self.emit_char(sink, '-');
                self.state = State::ScriptDataDoubleEscapedDashDash;
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.emit_char(sink, '<');
                self.state = State::ScriptDataDoubleEscapedLessThanSign;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                self.state = State::ScriptDataDoubleEscaped;
                Step::Continue
            }
            Some(c) => {
                self.bump(c.len_utf8());
                self.emit_char(sink, c);
                self.state = State::ScriptDataDoubleEscaped;
                Step::Continue
            }
        }
    }

    fn step_script_data_double_escaped_dash_dash(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            None => {
                self.error("eof-in-script-html-comment-like-text");
                self.emit_eof(sink)
            }
            Some('-') => {
                self.bump(1);
                self.emit_char(sink, '-');
                Step::Continue
            }
            Some('<') => {
                self.bump(1);
                self.emit_char(sink, '<');
                self.state = State::ScriptDataDoubleEscapedLessThanSign;
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_char(sink, '>');
                self.state = State::ScriptData;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.emit_char(sink, '\u{FFFD}');
                self.state = State::ScriptDataDoubleEscaped;
                Step::Continue
            }
            Some(c) => {
                self.bump(c.len_utf8());
                self.emit_char(sink, c);
                self.state = State::ScriptDataDoubleEscaped;
                Step::Continue
            }
        }
    }

    fn step_script_data_double_escaped_less_than_sign(
        &mut self,
        sink: &mut dyn TokenSink,
    ) -> Step {
        if self.eat('/') {
            self.temp_buf.clear();
            self.emit_char(sink, '/');
            self.state = State::ScriptDataDoubleEscapeEnd;
        } else {
            self.state = State::ScriptDataDoubleEscaped;
        }
        Step::Continue
    }

    // --- attribute states ---

    fn step_before_attribute_name(&mut self, _sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some('/') | Some('>') | None => {
                self.state = State::AfterAttributeName;
                Step::Continue
            }
            Some('=') => {
                self.error("unexpected-equals-sign-before-attribute-name");
                self.start_attr();
                self.attr_name.push('=');
                self.bump(1);
                self.state = State::AttributeName;
                Step::Continue
            }
            Some(_) => {
                self.start_attr();
                self.state = State::AttributeName;
                Step::Continue
            }
        }
    }

    fn step_attribute_name(&mut self, _sink: &mut dyn TokenSink) -> Step {
        let run = self.take_run(|c| {
            matches!(
                c,
                '\t' | '\n' | '\x0C' | ' ' | '/' | '>' | '=' | '\0' | '"' | '\'' | '<'
            )
        });
        if !run.is_empty() {
            push_lowercase(&mut self.attr_name, &run);
        }
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ' | '/' | '>') | None => {
                self.finish_attr_name();
                self.state = State::AfterAttributeName;
                Step::Continue
            }
            Some('=') => {
                self.finish_attr_name();
                self.bump(1);
                self.state = State::BeforeAttributeValue;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.attr_name.push('\u{FFFD}');
                Step::Continue
            }
            Some(c @ ('"' | '\'' | '<')) => {
                self.error("unexpected-character-in-attribute-name");
                self.bump(1);
                self.attr_name.push(c);
                Step::Continue
            }
            Some(_) => unreachable!("attribute-name stop set covers every branch"),
        }
    }

    fn step_after_attribute_name(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some('/') => {
                self.commit_attr();
                self.bump(1);
                self.state = State::SelfClosingStartTag;
                Step::Continue
            }
            Some('=') => {
                self.bump(1);
                self.state = State::BeforeAttributeValue;
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_tag(sink);
                if self.state == State::AfterAttributeName {
                    self.state = State::Data;
                }
                Step::Continue
            }
            None => {
                self.error("eof-in-tag");
                self.emit_eof(sink)
            }
            Some(_) => {
                self.commit_attr();
                self.start_attr();
                self.state = State::AttributeName;
                Step::Continue
            }
        }
    }

    fn step_before_attribute_value(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some('"') => {
                self.bump(1);
                self.state = State::AttributeValueDoubleQuoted;
                Step::Continue
            }
            Some('\'') => {
                self.bump(1);
                self.state = State::AttributeValueSingleQuoted;
                Step::Continue
            }
            Some('>') => {
                self.error("missing-attribute-value");
                self.commit_attr();
                self.bump(1);
                self.emit_tag(sink);
                if self.state == State::BeforeAttributeValue {
                    self.state = State::Data;
                }
                Step::Continue
            }
            _ => {
                self.state = State::AttributeValueUnquoted;
                Step::Continue
            }
        }
    }

    fn step_attribute_value_quoted(&mut self, sink: &mut dyn TokenSink, quote: char) -> Step {
        let run = self.take_run(|c| c == quote || matches!(c, '&' | '\0'));
        if !run.is_empty() {
            self.attr_value.push_str(&run);
        }
        match self.peek() {
            Some(c) if c == quote => {
                self.bump(1);
                self.state = State::AfterAttributeValueQuoted;
                Step::Continue
            }
            Some('&') => {
                let text = self.char_ref(true);
                self.attr_value.push_str(&text);
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.attr_value.push('\u{FFFD}');
                Step::Continue
            }
            None => {
                self.error("eof-in-tag");
                self.emit_eof(sink)
            }
            Some(_) => unreachable!("quoted-value stop set covers every branch"),
        }
    }

    fn step_attribute_value_unquoted(&mut self, sink: &mut dyn TokenSink) -> Step {
        let run = self.take_run(|c| {
            matches!(
                c,
                '\t' | '\n' | '\x0C' | ' ' | '&' | '>' | '\0' | '"' | '\'' | '<' | '=' | '`'
            )
        });
        if !run.is_empty() {
            self.attr_value.push_str(&run);
        }
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.commit_attr();
                self.bump(1);
                self.state = State::BeforeAttributeName;
                Step::Continue
            }
            Some('&') => {
                let text = self.char_ref(true);
                self.attr_value.push_str(&text);
                Step::Continue
            }
            Some('>') => {
                self.commit_attr();
                self.bump(1);
                self.emit_tag(sink);
                if self.state == State::AttributeValueUnquoted {
                    self.state = State::Data;
                }
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.attr_value.push('\u{FFFD}');
                Step::Continue
            }
            Some(c @ ('"' | '\'' | '<' | '=' | '`')) => {
                self.error("unexpected-character-in-unquoted-attribute-value");
                self.bump(1);
                self.attr_value.push(c);
                Step::Continue
            }
            None => {
                self.error("eof-in-tag");
                self.emit_eof(sink)
            }
            Some(_) => unreachable!("unquoted-value stop set covers every branch"),
        }
    }

    fn step_after_attribute_value_quoted(&mut self, sink: &mut dyn TokenSink) -> Step {
        self.commit_attr();
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                self.state = State::BeforeAttributeName;
                Step::Continue
            }
            Some('/') => {
                self.bump(1);
                self.state = State::SelfClosingStartTag;
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_tag(sink);
                if self.state == State::AfterAttributeValueQuoted {
                    self.state = State::Data;
                }
                Step::Continue
            }
            None => {
                self.error("eof-in-tag");
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("missing-whitespace-between-attributes");
                self.state = State::BeforeAttributeName;
                Step::Continue
            }
        }
    }

    fn step_self_closing_start_tag(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('>') => {
                self.tag.self_closing = true;
                self.bump(1);
                self.emit_tag(sink);
                if self.state == State::SelfClosingStartTag {
                    self.state = State::Data;
                }
                Step::Continue
            }
            None => {
                self.error("eof-in-tag");
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("unexpected-solidus-in-tag");
                self.state = State::BeforeAttributeName;
                Step::Continue
            }
        }
    }

    // --- comments ---

    fn step_bogus_comment(&mut self, sink: &mut dyn TokenSink) -> Step {
        let run = self.take_run(|c| matches!(c, '>' | '\0'));
        self.comment.push_str(&run);
        match self.peek() {
            Some('>') => {
                self.bump(1);
                self.emit_comment(sink);
                self.state = State::Data;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.comment.push('\u{FFFD}');
                Step::Continue
            }
            None => {
                self.emit_comment(sink);
                self.emit_eof(sink)
            }
            Some(_) => unreachable!("bogus-comment stop set covers every branch"),
        }
    }

    fn step_markup_declaration_open(&mut self, sink: &mut dyn TokenSink) -> Step {
        if self.starts_with_ci("--") {
            self.bump(2);
            self.comment.clear();
            self.state = State::CommentStart;
            return Step::Continue;
        }
        if self.eat_seq_ci("DOCTYPE") {
            self.state = State::Doctype;
            return Step::Continue;
        }
        if self.input[self.pos..].starts_with("[CDATA[") {
            self.bump("[CDATA[".len());
            if sink.adjusted_current_node_is_foreign() {
                self.state = State::CdataSection;
            } else {
                self.error("cdata-in-html-content");
                self.comment = "[CDATA[".to_string();
                self.state = State::BogusComment;
            }
            return Step::Continue;
        }
        self.error("incorrectly-opened-comment");
        self.comment.clear();
        self.state = State::BogusComment;
        Step::Continue
    }

    fn step_comment_start(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('-') => {
                self.bump(1);
                self.state = State::CommentStartDash;
            }
            Some('>') => {
                self.error("abrupt-closing-of-empty-comment");
                self.bump(1);
                self.emit_comment(sink);
                self.state = State::Data;
            }
            _ => self.state = State::Comment,
        }
        Step::Continue
    }

    fn step_comment_start_dash(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('-') => {
                self.bump(1);
                self.state = State::CommentEnd;
                Step::Continue
            }
            Some('>') => {
                self.error("abrupt-closing-of-empty-comment");
                self.bump(1);
                self.emit_comment(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-comment");
                self.emit_comment(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.comment.push('-');
                self.state = State::Comment;
                Step::Continue
            }
        }
    }

    fn step_comment(&mut self, sink: &mut dyn TokenSink) -> Step {
        let run = self.take_run(|c| matches!(c, '<' | '-' | '\0'));
        self.comment.push_str(&run);
        match self.peek() {
            Some('<') => {
                self.bump(1);
                self.comment.push('<');
                self.state = State::CommentLessThanSign;
                Step::Continue
            }
            Some('-') => {
                self.bump(1);
                self.state = State::CommentEndDash;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.comment.push('\u{FFFD}');
                Step::Continue
            }
            None => {
                self.error("eof-in-comment");
                self.emit_comment(sink);
                self.emit_eof(sink)
            }
            Some(_) => unreachable!("comment stop set covers every branch"),
        }
    }

    fn step_comment_less_than_sign(&mut self, _sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('!') => {
                self.bump(1);
                self.comment.push('!');
                self.state = State::CommentLessThanSignBang;
            }
            Some('<') => {
                self.bump(1);
                self.comment.push('<');
            }
            _ => self.state = State::Comment,
        }
        Step::Continue
    }

    fn step_comment_less_than_sign_bang(&mut self, _sink: &mut dyn TokenSink) -> Step {
        if self.eat('-') {
            self.state = State::CommentLessThanSignBangDash;
        } else {
            self.state = State::Comment;
        }
        Step::Continue
    }

    fn step_comment_less_than_sign_bang_dash(&mut self, _sink: &mut dyn TokenSink) -> Step {
        if self.eat('-') {
            self.state = State::CommentLessThanSignBangDashDash;
        } else {
            self.state = State::CommentEndDash;
        }
        Step::Continue
    }

    fn step_comment_less_than_sign_bang_dash_dash(&mut self, _sink: &mut dyn TokenSink) -> Step {
        if !matches!(self.peek(), Some('>') | None) {
            self.error("nested-comment");
        }
        self.state = State::CommentEnd;
        Step::Continue
    }

    fn step_comment_end_dash(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('-') => {
                self.bump(1);
                self.state = State::CommentEnd;
                Step::Continue
            }
            None => {
                self.error("eof-in-comment");
                self.emit_comment(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.comment.push('-');
                self.state = State::Comment;
                Step::Continue
            }
        }
    }

    fn step_comment_end(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('>') => {
                self.bump(1);
                self.emit_comment(sink);
                self.state = State::Data;
                Step::Continue
            }
            Some('!') => {
                self.bump(1);
                self.state = State::CommentEndBang;
                Step::Continue
            }
            Some('-') => {
                self.bump(1);
                self.comment.push('-');
                Step::Continue
            }
            None => {
                self.error("eof-in-comment");
                self.emit_comment(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.comment.push_str("--");
                self.state = State::Comment;
                Step::Continue
            }
        }
    }

    fn step_comment_end_bang(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('-') => {
                self.bump(1);
                self.comment.push_str("--!");
                self.state = State::CommentEndDash;
                Step::Continue
            }
            Some('>') => {
                self.error("incorrectly-closed-comment");
                self.bump(1);
                self.emit_comment(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-comment");
                self.emit_comment(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.comment.push_str("--!");
                self.state = State::Comment;
                Step::Continue
            }
        }
    }

    // --- doctype ---

    fn step_doctype(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                self.state = State::BeforeDoctypeName;
                Step::Continue
            }
            Some('>') => {
                self.state = State::BeforeDoctypeName;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype = DoctypeToken {
                    force_quirks: true,
                    ..DoctypeToken::default()
                };
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("missing-whitespace-before-doctype-name");
                self.state = State::BeforeDoctypeName;
                Step::Continue
            }
        }
    }

    fn step_before_doctype_name(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.doctype = DoctypeToken {
                    name: Some("\u{FFFD}".to_string()),
                    ..DoctypeToken::default()
                };
                self.state = State::DoctypeName;
                Step::Continue
            }
            Some('>') => {
                self.error("missing-doctype-name");
                self.bump(1);
                self.doctype = DoctypeToken {
                    force_quirks: true,
                    ..DoctypeToken::default()
                };
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype = DoctypeToken {
                    force_quirks: true,
                    ..DoctypeToken::default()
                };
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(c) => {
                self.bump(c.len_utf8());
                self.doctype = DoctypeToken {
                    name: Some(c.to_ascii_lowercase().to_string()),
                    ..DoctypeToken::default()
                };
                self.state = State::DoctypeName;
                Step::Continue
            }
        }
    }

    fn step_doctype_name(&mut self, sink: &mut dyn TokenSink) -> Step {
        let run = self.take_run(|c| matches!(c, '\t' | '\n' | '\x0C' | ' ' | '>' | '\0'));
        if !run.is_empty() {
            push_lowercase(self.doctype.name.get_or_insert_with(String::new), &run);
        }
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                self.state = State::AfterDoctypeName;
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.doctype
                    .name
                    .get_or_insert_with(String::new)
                    .push('\u{FFFD}');
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => unreachable!("doctype-name stop set covers every branch"),
        }
    }

    fn step_after_doctype_name(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                if self.eat_seq_ci("PUBLIC") {
                    self.state = State::AfterDoctypePublicKeyword;
                } else if self.eat_seq_ci("SYSTEM") {
                    self.state = State::AfterDoctypeSystemKeyword;
                } else {
                    self.error("invalid-character-sequence-after-doctype-name");
                    self.doctype.force_quirks = true;
                    self.state = State::BogusDoctype;
                }
                Step::Continue
            }
        }
    }

    fn step_after_doctype_public_keyword(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                self.state = State::BeforeDoctypePublicIdentifier;
                Step::Continue
            }
            Some(q @ ('"' | '\'')) => {
                self.error("missing-whitespace-after-doctype-public-keyword");
                self.bump(1);
                self.doctype.public_id = Some(String::new());
                self.state = if q == '"' {
                    State::DoctypePublicIdentifierDoubleQuoted
                } else {
                    State::DoctypePublicIdentifierSingleQuoted
                };
                Step::Continue
            }
            Some('>') => {
                self.error("missing-doctype-public-identifier");
                self.doctype.force_quirks = true;
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("missing-quote-before-doctype-public-identifier");
                self.doctype.force_quirks = true;
                self.state = State::BogusDoctype;
                Step::Continue
            }
        }
    }

    fn step_before_doctype_identifier(&mut self, sink: &mut dyn TokenSink, kind: IdKind) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some(q @ ('"' | '\'')) => {
                self.bump(1);
                *self.doctype_id_mut(kind) = Some(String::new());
                self.state = match (kind, q) {
                    (IdKind::Public, '"') => State::DoctypePublicIdentifierDoubleQuoted,
                    (IdKind::Public, _) => State::DoctypePublicIdentifierSingleQuoted,
                    (IdKind::System, '"') => State::DoctypeSystemIdentifierDoubleQuoted,
                    (IdKind::System, _) => State::DoctypeSystemIdentifierSingleQuoted,
                };
                Step::Continue
            }
            Some('>') => {
                self.error(kind.missing_error());
                self.doctype.force_quirks = true;
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error(kind.missing_quote_error());
                self.doctype.force_quirks = true;
                self.state = State::BogusDoctype;
                Step::Continue
            }
        }
    }

    fn step_doctype_identifier_quoted(
        &mut self,
        sink: &mut dyn TokenSink,
        kind: IdKind,
        quote: char,
    ) -> Step {
        let run = self.take_run(|c| c == quote || matches!(c, '\0' | '>'));
        if !run.is_empty() {
            self.doctype_id_mut(kind)
                .get_or_insert_with(String::new)
                .push_str(&run);
        }
        match self.peek() {
            Some(c) if c == quote => {
                self.bump(1);
                self.state = match kind {
                    IdKind::Public => State::AfterDoctypePublicIdentifier,
                    IdKind::System => State::AfterDoctypeSystemIdentifier,
                };
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                self.doctype_id_mut(kind)
                    .get_or_insert_with(String::new)
                    .push('\u{FFFD}');
                Step::Continue
            }
            Some('>') => {
                self.error(kind.abrupt_error());
                self.doctype.force_quirks = true;
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => unreachable!("doctype-identifier stop set covers every branch"),
        }
    }

    fn step_after_doctype_public_identifier(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                self.state = State::BetweenDoctypePublicAndSystemIdentifiers;
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            Some(q @ ('"' | '\'')) => {
                self.error("missing-whitespace-between-doctype-public-and-system-identifiers");
                self.bump(1);
                self.doctype.system_id = Some(String::new());
                self.state = if q == '"' {
                    State::DoctypeSystemIdentifierDoubleQuoted
                } else {
                    State::DoctypeSystemIdentifierSingleQuoted
                };
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("missing-quote-before-doctype-system-identifier");
                self.doctype.force_quirks = true;
                self.state = State::BogusDoctype;
                Step::Continue
            }
        }
    }

    fn step_between_doctype_public_and_system(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            Some(q @ ('"' | '\'')) => {
                self.bump(1);
                self.doctype.system_id = Some(String::new());
                self.state = if q == '"' {
                    State::DoctypeSystemIdentifierDoubleQuoted
                } else {
                    State::DoctypeSystemIdentifierSingleQuoted
                };
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("missing-quote-before-doctype-system-identifier");
                self.doctype.force_quirks = true;
                self.state = State::BogusDoctype;
                Step::Continue
            }
        }
    }

    fn step_after_doctype_system_keyword(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                self.state = State::BeforeDoctypeSystemIdentifier;
                Step::Continue
            }
            Some(q @ ('"' | '\'')) => {
                self.error("missing-whitespace-after-doctype-system-keyword");
                self.bump(1);
                self.doctype.system_id = Some(String::new());
                self.state = if q == '"' {
                    State::DoctypeSystemIdentifierDoubleQuoted
                } else {
                    State::DoctypeSystemIdentifierSingleQuoted
                };
                Step::Continue
            }
            Some('>') => {
                self.error("missing-doctype-system-identifier");
                self.doctype.force_quirks = true;
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("missing-quote-before-doctype-system-identifier");
                self.doctype.force_quirks = true;
                self.state = State::BogusDoctype;
                Step::Continue
            }
        }
    }

    fn step_after_doctype_system_identifier(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('\t' | '\n' | '\x0C' | ' ') => {
                self.bump(1);
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            None => {
                self.error("eof-in-doctype");
                self.doctype.force_quirks = true;
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(_) => {
                self.error("unexpected-character-after-doctype-system-identifier");
                self.state = State::BogusDoctype;
                Step::Continue
            }
        }
    }

    fn step_bogus_doctype(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some('>') => {
                self.bump(1);
                self.emit_doctype(sink);
                self.state = State::Data;
                Step::Continue
            }
            Some('\0') => {
                self.error("unexpected-null-character");
                self.bump(1);
                Step::Continue
            }
            None => {
                self.emit_doctype(sink);
                self.emit_eof(sink)
            }
            Some(c) => {
                self.bump(c.len_utf8());
                Step::Continue
            }
        }
    }

    fn doctype_id_mut(&mut self, kind: IdKind) -> &mut Option<String> {
        match kind {
            IdKind::Public => &mut self.doctype.public_id,
            IdKind::System => &mut self.doctype.system_id,
        }
    }

    // --- cdata ---

    fn step_cdata_section(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some(']') => {
                self.bump(1);
                self.state = State::CdataSectionBracket;
                Step::Continue
            }
            None => {
                self.error("eof-in-cdata");
                self.emit_eof(sink)
            }
            Some(_) => {
                let run = self.take_run(|c| c == ']');
                self.emit_chars(sink, run);
                Step::Continue
            }
        }
    }

    fn step_cdata_section_bracket(&mut self, sink: &mut dyn TokenSink) -> Step {
        if self.eat(']') {
            self.state = State::CdataSectionEnd;
        } else {
            self.emit_char(sink, ']');
            self.state = State::CdataSection;
        }
        Step::Continue
    }

    fn step_cdata_section_end(&mut self, sink: &mut dyn TokenSink) -> Step {
        match self.peek() {
            Some(']') => {
                self.bump(1);
                self.emit_char(sink, ']');
                Step::Continue
            }
            Some('>') => {
                self.bump(1);
                self.state = State::Data;
                Step::Continue
            }
            _ => {
                self.emit_chars(sink, "]]".to_string());
                self.state = State::CdataSection;
                Step::Continue
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IdKind {
    Public,
    System,
}

impl IdKind {
    fn missing_error(self) -> &'static str {
        match self {
            IdKind::Public => "missing-doctype-public-identifier",
            IdKind::System => "missing-doctype-system-identifier",
        }
    }

    fn missing_quote_error(self) -> &'static str {
        match self {
            IdKind::Public => "missing-quote-before-doctype-public-identifier",
            IdKind::System => "missing-quote-before-doctype-system-identifier",
        }
    }

    fn abrupt_error(self) -> &'static str {
        match self {
            IdKind::Public => "abrupt-doctype-public-identifier",
            IdKind::System => "abrupt-doctype-system-identifier",
        }
    }
}

fn normalize_newlines(input: &str) -> String {
    if !input.as_bytes().contains(&b'\r') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

fn push_lowercase(target: &mut String, run: &str) {
    for c in run.chars() {
        target.push(c.to_ascii_lowercase());
    }
}

/// Test-only XML coercion of character data.
fn coerce_chars(data: &str) -> String {
    data.chars()
        .map(|c| match c {
            '\x0C' => ' ',
            '\u{FDD0}'..='\u{FDEF}' => '\u{FFFD}',
            c if (c as u32 & 0xFFFF) >= 0xFFFE => '\u{FFFD}',
            c => c,
        })
        .collect()
}

/// Test-only XML coercion of comment data: `--` becomes `- -`.
fn coerce_comment(data: &str) -> String {
    let mut out = coerce_chars(data);
    while out.contains("--") {
        out = out.replace("--", "- -");
    }
    out
}
