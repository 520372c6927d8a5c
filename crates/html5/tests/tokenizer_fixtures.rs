//! html5lib-tests tokenizer runner.
//!
//! Replays every `.test` under `$HTML5LIB_TESTS/tokenizer` for each of its
//! `initialStates`, canonicalizes the emitted tokens into the fixture shape
//! (adjacent `Character` tokens collapsed), and compares against `output`.
//! `xmlViolationTests` run with XML coercion enabled. Passes vacuously when
//! the fixture root is not configured.

use html5::{InitialState, SinkResult, Token, TokenSink, Tokenizer, TokenizerOpts};
use html5_test_support::json::{TokenizerTest, parse_tokenizer_file, unescape_double};
use html5_test_support::{fixture_filter, fixture_root, list_files};
use serde_json::{Value, json};

#[derive(Default)]
struct Collect {
    tokens: Vec<Token>,
}

impl TokenSink for Collect {
    fn process_token(&mut self, token: Token) -> SinkResult {
        self.tokens.push(token);
        SinkResult::Continue
    }
}

fn initial_state(label: &str) -> InitialState {
    match label {
        "PLAINTEXT state" => InitialState::Plaintext,
        "RCDATA state" => InitialState::Rcdata,
        "RAWTEXT state" => InitialState::Rawtext,
        "Script data state" => InitialState::ScriptData,
        "CDATA section state" => InitialState::CdataSection,
        _ => InitialState::Data,
    }
}

/// Canonicalize our token stream into the fixture's array-of-arrays shape.
fn canonical_tokens(tokens: &[Token]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    let mut pending_text = String::new();
    let mut flush = |out: &mut Vec<Value>, pending: &mut String| {
        if !pending.is_empty() {
            out.push(json!(["Character", std::mem::take(pending)]));
        }
    };
    for token in tokens {
        match token {
            Token::Character(data) => pending_text.push_str(data),
            Token::StartTag(tag) => {
                flush(&mut out, &mut pending_text);
                let attrs: serde_json::Map<String, Value> = tag
                    .attrs
                    .iter()
                    .map(|a| (a.name.clone(), Value::String(a.value.clone())))
                    .collect();
                if tag.self_closing {
                    out.push(json!(["StartTag", &tag.name, attrs, true]));
                } else {
                    out.push(json!(["StartTag", &tag.name, attrs]));
                }
            }
            Token::EndTag(tag) => {
                flush(&mut out, &mut pending_text);
                out.push(json!(["EndTag", &tag.name]));
            }
            Token::Comment(data) => {
                flush(&mut out, &mut pending_text);
                out.push(json!(["Comment", data]));
            }
            Token::Doctype(d) => {
                flush(&mut out, &mut pending_text);
                out.push(json!([
                    "DOCTYPE",
                    d.name.clone().map(Value::String).unwrap_or(Value::Null),
                    d.public_id.clone().map(Value::String).unwrap_or(Value::Null),
                    d.system_id.clone().map(Value::String).unwrap_or(Value::Null),
                    !d.force_quirks
                ]));
            }
            Token::Eof => flush(&mut out, &mut pending_text),
        }
    }
    flush(&mut out, &mut pending_text);
    out
}

/// Expected output with `doubleEscaped` expansion and adjacent Character
/// entries collapsed.
fn canonical_expected(test: &TokenizerTest) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for entry in &test.output {
        let mut entry = entry.clone();
        if test.double_escaped {
            unescape_value(&mut entry);
        }
        let is_char = entry
            .get(0)
            .and_then(Value::as_str)
            .is_some_and(|k| k == "Character");
        if is_char
            && let Some(last) = out.last_mut()
            && last.get(0).and_then(Value::as_str) == Some("Character")
        {
            let appended = format!(
                "{}{}",
                last.get(1).and_then(Value::as_str).unwrap_or(""),
                entry.get(1).and_then(Value::as_str).unwrap_or("")
            );
            last[1] = Value::String(appended);
            continue;
        }
        out.push(entry);
    }
    out
}

fn unescape_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = unescape_double(s),
        Value::Array(items) => items.iter_mut().for_each(unescape_value),
        Value::Object(map) => map.values_mut().for_each(unescape_value),
        _ => {}
    }
}

fn run_case(test: &TokenizerTest, xml_coercion: bool, case_id: &str, failures: &mut Vec<String>) {
    let input = if test.double_escaped {
        unescape_double(&test.input)
    } else {
        test.input.clone()
    };
    let states: Vec<&str> = if test.initial_states.is_empty() {
        vec!["Data state"]
    } else {
        test.initial_states.iter().map(String::as_str).collect()
    };
    let expected = canonical_expected(test);

    for state in states {
        let opts = TokenizerOpts {
            initial_state: initial_state(state),
            last_start_tag: test.last_start_tag.clone(),
            discard_bom: false,
            xml_coercion,
            tag_state_switching: false,
            ..TokenizerOpts::default()
        };
        let mut sink = Collect::default();
        let mut tokenizer = Tokenizer::new(&input, opts);
        tokenizer.run(&mut sink);
        let actual = canonical_tokens(&sink.tokens);
        if actual != expected {
            failures.push(format!(
                "{case_id} [{state}]\ninput: {input:?}\nexpected: {expected:?}\nactual:   {actual:?}",
            ));
        }
    }
}

#[test]
fn html5lib_tokenizer() {
    let Some(root) = fixture_root() else {
        return;
    };
    let filter = fixture_filter();
    let mut ran = 0usize;
    let mut failures = Vec::new();

    for file in list_files(&root.join("tokenizer"), "test") {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?")
            .to_string();
        let content = std::fs::read_to_string(&file)
            .unwrap_or_else(|err| panic!("failed to read {file:?}: {err}"));
        let Ok(parsed) = parse_tokenizer_file(&content) else {
            continue;
        };
        for (idx, test) in parsed.tests.iter().enumerate() {
            let case_id = format!("{name}:{idx} {}", test.description);
            if let Some(filter) = &filter
                && !case_id.contains(filter.as_str())
            {
                continue;
            }
            ran += 1;
            run_case(test, false, &case_id, &mut failures);
        }
        for (idx, test) in parsed.xml_violation_tests.iter().enumerate() {
            let case_id = format!("{name}:xml:{idx} {}", test.description);
            if let Some(filter) = &filter
                && !case_id.contains(filter.as_str())
            {
                continue;
            }
            ran += 1;
            run_case(test, true, &case_id, &mut failures);
        }
    }

    assert!(ran > 0, "fixture root configured but no cases matched");
    assert!(
        failures.is_empty(),
        "{} tokenizer failures (of {ran}):\n{}",
        failures.len(),
        failures.join("\n\n")
    );
}
