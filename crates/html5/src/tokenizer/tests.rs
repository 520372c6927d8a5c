use super::{InitialState, SinkResult, Token, TokenSink, Tokenizer, TokenizerOpts};

#[derive(Default)]
struct Collect {
    tokens: Vec<Token>,
    foreign: bool,
}

impl TokenSink for Collect {
    fn process_token(&mut self, token: Token) -> SinkResult {
        self.tokens.push(token);
        SinkResult::Continue
    }

    fn adjusted_current_node_is_foreign(&self) -> bool {
        self.foreign
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    tokenize_opts(input, TokenizerOpts::default())
}

fn tokenize_opts(input: &str, opts: TokenizerOpts) -> Vec<Token> {
    let mut sink = Collect::default();
    let mut tokenizer = Tokenizer::new(input, opts);
    tokenizer.run(&mut sink);
    sink.tokens
}

fn text_of(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Character(data) => Some(data.as_str()),
            _ => None,
        })
        .collect()
}

fn start_tags(tokens: &[Token]) -> Vec<&str> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::StartTag(tag) => Some(tag.name.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn plain_tag_and_text() {
    let tokens = tokenize("<p class=\"x\">Hi</p>");
    match &tokens[0] {
        Token::StartTag(tag) => {
            assert_eq!(tag.name, "p");
            assert_eq!(tag.attr("class"), Some("x"));
            assert!(!tag.self_closing);
        }
        other => panic!("expected start tag, got {other:?}"),
    }
    assert_eq!(text_of(&tokens), "Hi");
    assert!(matches!(tokens.last(), Some(Token::Eof)));
}

#[test]
fn tag_and_attribute_names_fold_to_lowercase() {
    let tokens = tokenize("<DIV ID=a DaTa-X=b>");
    let Token::StartTag(tag) = &tokens[0] else {
        panic!();
    };
    assert_eq!(tag.name, "div");
    assert_eq!(tag.attr("id"), Some("a"));
    assert_eq!(tag.attr("data-x"), Some("b"));
}

#[test]
fn duplicate_attributes_keep_the_first() {
    let opts = TokenizerOpts {
        collect_errors: true,
        ..TokenizerOpts::default()
    };
    let mut sink = Collect::default();
    let mut tokenizer = Tokenizer::new("<a href=1 href=2>", opts);
    tokenizer.run(&mut sink);
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!();
    };
    assert_eq!(tag.attrs.len(), 1);
    assert_eq!(tag.attr("href"), Some("1"));
    let errors = tokenizer.take_errors();
    assert!(errors.iter().any(|e| e.code == "duplicate-attribute"));
}

#[test]
fn crlf_collapses_before_the_state_machine() {
    assert_eq!(text_of(&tokenize("a\r\nb\rc")), "a\nb\nc");
}

#[test]
fn entity_in_data_and_attribute() {
    assert_eq!(text_of(&tokenize("ab&amp;cd")), "ab&cd");
    let tokens = tokenize("<a title=\"x&ampy\">");
    let Token::StartTag(tag) = &tokens[0] else {
        panic!();
    };
    // Historical attribute rule: &amp followed by an alphanumeric stays raw.
    assert_eq!(tag.attr("title"), Some("x&ampy"));
}

#[test]
fn numeric_reference_windows_1252_remap() {
    assert_eq!(text_of(&tokenize("&#x80;")), "\u{20AC}");
}

#[test]
fn named_references_cover_the_full_table() {
    assert_eq!(text_of(&tokenize("&bigcup;&sol;&angst;")), "\u{22C3}/\u{C5}");
    assert_eq!(
        text_of(&tokenize("&CounterClockwiseContourIntegral;")),
        "\u{2233}"
    );
}

#[test]
fn script_auto_switch_tokenizes_content_as_raw_text() {
    let tokens = tokenize("<script>a<b&amp;</script>x");
    assert_eq!(start_tags(&tokens), ["script"]);
    assert_eq!(text_of(&tokens), "a<b&amp;x");
}

#[test]
fn fixture_mode_keeps_the_data_state_after_script() {
    let opts = TokenizerOpts {
        tag_state_switching: false,
        ..TokenizerOpts::default()
    };
    let tokens = tokenize_opts("<script>&amp;</script>", opts);
    assert_eq!(text_of(&tokens), "&");
}

#[test]
fn rcdata_decodes_entities_but_not_tags() {
    let tokens = tokenize("<title>a&amp;<b></title>");
    assert_eq!(start_tags(&tokens), ["title"]);
    assert_eq!(text_of(&tokens), "a&<b>");
}

#[test]
fn script_escaped_state_hides_end_tag_in_comment() {
    // The nested-commented-script machinery: "</script>" inside <!-- --> with
    // an open inner <script> does not close the outer element.
    let tokens = tokenize("<script><!--<script></script>--></script>done");
    let ends: Vec<_> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::EndTag(tag) => Some(tag.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ends, ["script"]);
    assert_eq!(text_of(&tokens), "<!--<script></script>-->done");
}

#[test]
fn plaintext_consumes_everything() {
    let tokens = tokenize("<plaintext></plaintext><div>");
    assert_eq!(start_tags(&tokens), ["plaintext"]);
    assert_eq!(text_of(&tokens), "</plaintext><div>");
}

#[test]
fn appropriate_end_tag_required_to_leave_rawtext() {
    let tokens = tokenize("<style></div>x</style>");
    assert_eq!(text_of(&tokens), "</div>x");
}

#[test]
fn comment_flavors() {
    let cases = [
        ("<!--c-->", "c"),
        ("<!---->", ""),
        ("<!--a--b-->", "a--b"),
        ("<!--x--!>", "x"),
    ];
    for (input, expected) in cases {
        let tokens = tokenize(input);
        match &tokens[0] {
            Token::Comment(data) => assert_eq!(data, expected, "input {input:?}"),
            other => panic!("expected comment for {input:?}, got {other:?}"),
        }
    }
}

#[test]
fn bogus_comment_from_unknown_declaration() {
    let tokens = tokenize("<!x y><?php ?>");
    assert!(matches!(&tokens[0], Token::Comment(c) if c == "x y"));
    assert!(matches!(&tokens[1], Token::Comment(c) if c == "?php ?"));
}

#[test]
fn doctype_with_public_and_system_ids() {
    let tokens = tokenize("<!DOCTYPE html PUBLIC \"pub\" 'sys'>");
    match &tokens[0] {
        Token::Doctype(d) => {
            assert_eq!(d.name.as_deref(), Some("html"));
            assert_eq!(d.public_id.as_deref(), Some("pub"));
            assert_eq!(d.system_id.as_deref(), Some("sys"));
            assert!(!d.force_quirks);
        }
        other => panic!("expected doctype, got {other:?}"),
    }
}

#[test]
fn truncated_doctype_forces_quirks() {
    let tokens = tokenize("<!DOCTYPE");
    match &tokens[0] {
        Token::Doctype(d) => {
            assert_eq!(d.name, None);
            assert!(d.force_quirks);
        }
        other => panic!("expected doctype, got {other:?}"),
    }
}

#[test]
fn cdata_is_a_bogus_comment_in_html_content() {
    let tokens = tokenize("<![CDATA[x]]>");
    assert!(matches!(&tokens[0], Token::Comment(c) if c == "[CDATA[x]]"));
}

#[test]
fn cdata_passes_through_in_foreign_content() {
    let mut sink = Collect {
        foreign: true,
        ..Collect::default()
    };
    let mut tokenizer = Tokenizer::new("<![CDATA[a]]b]]>", TokenizerOpts::default());
    tokenizer.run(&mut sink);
    assert_eq!(text_of(&sink.tokens), "a]]b");
}

#[test]
fn initial_state_rawtext_with_last_start_tag() {
    let opts = TokenizerOpts {
        initial_state: InitialState::Rawtext,
        last_start_tag: Some("style".to_string()),
        ..TokenizerOpts::default()
    };
    let tokens = tokenize_opts("x</style>y", opts);
    assert_eq!(text_of(&tokens), "xy");
}

#[test]
fn leading_bom_is_discarded() {
    assert_eq!(text_of(&tokenize("\u{FEFF}a")), "a");
    let opts = TokenizerOpts {
        discard_bom: false,
        ..TokenizerOpts::default()
    };
    assert_eq!(text_of(&tokenize_opts("\u{FEFF}a", opts)), "\u{FEFF}a");
}

#[test]
fn xml_coercion_rewrites_comment_dashes() {
    let opts = TokenizerOpts {
        xml_coercion: true,
        ..TokenizerOpts::default()
    };
    let tokens = tokenize_opts("<!--a--b-->\u{0C}", opts);
    assert!(matches!(&tokens[0], Token::Comment(c) if c == "a- -b"));
    assert_eq!(text_of(&tokens), " ");
}

#[test]
fn error_positions_are_line_and_column() {
    let opts = TokenizerOpts {
        collect_errors: true,
        ..TokenizerOpts::default()
    };
    let mut sink = Collect::default();
    let mut tokenizer = Tokenizer::new("ab\ncd\0", opts);
    tokenizer.run(&mut sink);
    let errors = tokenizer.take_errors();
    assert_eq!(errors[0].code, "unexpected-null-character");
    assert_eq!(errors[0].position, Some((2, 3)));
}

#[test]
fn end_tag_with_attributes_is_an_error_but_keeps_them() {
    let opts = TokenizerOpts {
        collect_errors: true,
        ..TokenizerOpts::default()
    };
    let mut sink = Collect::default();
    let mut tokenizer = Tokenizer::new("</div class=x>", opts);
    tokenizer.run(&mut sink);
    let Token::EndTag(tag) = &sink.tokens[0] else {
        panic!();
    };
    assert_eq!(tag.attr("class"), Some("x"));
    let errors = tokenizer.take_errors();
    assert!(errors.iter().any(|e| e.code == "end-tag-with-attributes"));
}
