//! HTML5 byte-to-tree parsing pipeline.
//!
//! The core is the conformant WHATWG path: encoding sniffing, the tokenizer
//! state machine, and the tree builder, verified against the `html5lib-tests`
//! corpus through the test-format serializer. Thin consumers (selectors,
//! text extraction, Markdown, an HTML writer, a streaming event façade) sit
//! on top of the finished tree.
//!
//! ```
//! let result = html5::parse("<p>Hello</p>", html5::ParseOpts::default()).unwrap();
//! assert_eq!(html5::extract_text(&result.dom), "Hello");
//! ```

mod dom;
mod encoding;
mod entities;
mod error;
mod html_writer;
mod markdown;
mod select;
mod serializer;
mod stream;
mod tags;
mod text;
mod tokenizer;
mod tree_builder;

pub use dom::{DomTree, ElementData, Namespace, NodeData, NodeId, NodeKind, QuirksMode};
pub use encoding::{Sniff, canonical_label, decode, sniff};
pub use error::{ParseError, SelectorError, StrictError};
pub use html_writer::{write_document, write_html};
pub use markdown::to_markdown;
pub use select::{Selector, query_all, query_first};
pub use serializer::serialize_test_format;
pub use stream::{Event, Events, stream_events};
pub use tags::TagFlags;
pub use tokenizer::{
    Attribute, DoctypeToken, InitialState, SinkResult, Tag, Token, TokenSink, Tokenizer,
    TokenizerOpts,
};
pub use text::{extract_text, extract_text_of};
pub use tree_builder::{FragmentContext, TreeBuilder, TreeBuilderOpts};

/// Parse options. `tokenizer` carries the test and fragment hooks; the
/// remaining fields drive the whole pipeline.
#[derive(Clone, Debug, Default)]
pub struct ParseOpts {
    /// Surface the first parse error as a failure once tokenization of the
    /// input completes.
    pub strict: bool,
    /// Populate `ParseResult::errors`.
    pub collect_errors: bool,
    /// Transport encoding override for byte input.
    pub encoding: Option<String>,
    /// Parse as a fragment with the given context element.
    pub fragment_context: Option<FragmentContext>,
    /// Quirks derivation for `<iframe srcdoc>` documents.
    pub iframe_srcdoc: bool,
    /// Scripting flag; only selects the `<noscript>` branches.
    pub scripting: bool,
    pub tokenizer: TokenizerOpts,
}

/// The outcome of a parse.
#[derive(Debug)]
pub struct ParseResult {
    pub dom: DomTree,
    pub errors: Vec<ParseError>,
    /// Canonical label of the encoding the input was decoded with.
    pub encoding: &'static str,
    pub fragment_context: Option<FragmentContext>,
}

/// Parse decoded text into a document (or fragment) tree.
pub fn parse(input: &str, opts: ParseOpts) -> Result<ParseResult, StrictError> {
    parse_decoded(input, "utf-8", opts)
}

/// Sniff, decode, and parse a byte payload.
pub fn parse_bytes(bytes: &[u8], opts: ParseOpts) -> Result<ParseResult, StrictError> {
    let (text, encoding) = decode(bytes, opts.encoding.as_deref());
    parse_decoded(&text, encoding, opts)
}

fn parse_decoded(
    input: &str,
    encoding: &'static str,
    opts: ParseOpts,
) -> Result<ParseResult, StrictError> {
    let collect_errors = opts.collect_errors || opts.strict;

    let mut tokenizer_opts = opts.tokenizer.clone();
    tokenizer_opts.collect_errors = collect_errors;
    tokenizer_opts.scripting = opts.scripting;
    if let Some(context) = &opts.fragment_context
        && context.namespace.unwrap_or(Namespace::Html) == Namespace::Html
    {
        if tokenizer_opts.initial_state == InitialState::Data {
            tokenizer_opts.initial_state = fragment_initial_state(&context.tag_name, opts.scripting);
        }
        if tokenizer_opts.last_start_tag.is_none() {
            tokenizer_opts.last_start_tag = Some(context.tag_name.clone());
        }
    }

    let mut builder = TreeBuilder::new(TreeBuilderOpts {
        scripting: opts.scripting,
        iframe_srcdoc: opts.iframe_srcdoc,
        collect_errors,
        fragment_context: opts.fragment_context.clone(),
    });

    let mut tokenizer = Tokenizer::new(input, tokenizer_opts);
    tokenizer.run(&mut builder);

    let mut errors = tokenizer.take_errors();
    let (dom, builder_errors) = builder.finish();
    errors.extend(builder_errors);

    if opts.strict
        && let Some(first) = errors.first()
    {
        return Err(StrictError(first.clone()));
    }

    Ok(ParseResult {
        dom,
        errors: if opts.collect_errors { errors } else { Vec::new() },
        encoding,
        fragment_context: opts.fragment_context,
    })
}

/// The tokenizer start state a fragment context element implies.
fn fragment_initial_state(context_name: &str, scripting: bool) -> InitialState {
    match context_name {
        "title" | "textarea" => InitialState::Rcdata,
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => InitialState::Rawtext,
        "noscript" if scripting => InitialState::Rawtext,
        "script" => InitialState::ScriptData,
        "plaintext" => InitialState::Plaintext,
        _ => InitialState::Data,
    }
}

#[cfg(test)]
mod tests {
    use super::{FragmentContext, ParseOpts, parse, parse_bytes};

    #[test]
    fn minimal_document_parses_clean() {
        let opts = ParseOpts {
            collect_errors: true,
            ..ParseOpts::default()
        };
        let result = parse("<!DOCTYPE html><html><head></head><body>x</body></html>", opts)
            .unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(result.encoding, "utf-8");
    }

    #[test]
    fn strict_mode_surfaces_the_first_error() {
        // Tokenizer errors precede tree-builder errors in the collected list.
        let opts = ParseOpts {
            strict: true,
            ..ParseOpts::default()
        };
        let err = parse("<!DOCTYPE html><p>\0</p>", opts).unwrap_err();
        assert_eq!(err.0.code, "unexpected-null-character");
        let ok = parse(
            "<!DOCTYPE html><html><head></head><body><p>x</p></body></html>",
            ParseOpts {
                strict: true,
                ..ParseOpts::default()
            },
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn errors_stay_empty_unless_collection_is_requested() {
        let result = parse("<p>\0</p>", ParseOpts::default()).unwrap();
        assert!(result.errors.is_empty());
    }

    #[test]
    fn byte_input_reports_the_sniffed_encoding() {
        let bytes = b"<html><head><meta charset=\"utf-8\"><title>t</title></head></html>";
        let result = parse_bytes(bytes, ParseOpts::default()).unwrap();
        assert_eq!(result.encoding, "utf-8");
        let result = parse_bytes(b"plain", ParseOpts::default()).unwrap();
        assert_eq!(result.encoding, "windows-1252");
    }

    #[test]
    fn fragment_context_is_echoed_back() {
        let opts = ParseOpts {
            fragment_context: Some(FragmentContext {
                tag_name: "td".to_string(),
                namespace: None,
            }),
            ..ParseOpts::default()
        };
        let result = parse("x", opts).unwrap();
        assert_eq!(result.fragment_context.unwrap().tag_name, "td");
    }
}
