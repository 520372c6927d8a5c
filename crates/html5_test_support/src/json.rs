//! `.test` JSON fixture models (tokenizer and serializer suites).

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenizerTestFile {
    #[serde(default)]
    pub tests: Vec<TokenizerTest>,
    #[serde(default, rename = "xmlViolationTests")]
    pub xml_violation_tests: Vec<TokenizerTest>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenizerTest {
    pub description: String,
    pub input: String,
    /// Expected tokens in the fixture's array-of-arrays shape.
    pub output: Vec<serde_json::Value>,
    #[serde(default, rename = "initialStates")]
    pub initial_states: Vec<String>,
    #[serde(default, rename = "lastStartTag")]
    pub last_start_tag: Option<String>,
    /// Input and output carry `\uHHHH` escapes literally.
    #[serde(default, rename = "doubleEscaped")]
    pub double_escaped: bool,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SerializerTestFile {
    pub tests: Vec<SerializerTest>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SerializerTest {
    #[serde(default)]
    pub description: String,
    /// Token stream in the fixture's array shape.
    pub input: Vec<serde_json::Value>,
    pub expected: Vec<String>,
    #[serde(default)]
    pub options: serde_json::Value,
}

pub fn parse_tokenizer_file(content: &str) -> Result<TokenizerTestFile, serde_json::Error> {
    serde_json::from_str(content)
}

pub fn parse_serializer_file(content: &str) -> Result<SerializerTestFile, serde_json::Error> {
    serde_json::from_str(content)
}

/// Expand the `doubleEscaped` convention: literal `\uHHHH` sequences become
/// characters, with surrogate pairs combined and lone surrogates replaced.
pub fn unescape_double(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' || chars.peek() != Some(&'u') {
            out.push(c);
            continue;
        }
        chars.next();
        let Some(unit) = take_u16(&mut chars) else {
            out.push_str("\\u");
            continue;
        };
        if (0xD800..0xDC00).contains(&unit) {
            // High surrogate: look for the low half.
            let mut lookahead = chars.clone();
            if lookahead.next() == Some('\\')
                && lookahead.next() == Some('u')
                && let Some(low) = take_u16(&mut lookahead)
                && (0xDC00..0xE000).contains(&low)
            {
                chars = lookahead;
                let combined =
                    0x10000 + ((unit as u32 - 0xD800) << 10) + (low as u32 - 0xDC00);
                out.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
                continue;
            }
            out.push('\u{FFFD}');
        } else if (0xDC00..0xE000).contains(&unit) {
            out.push('\u{FFFD}');
        } else {
            out.push(char::from_u32(unit as u32).unwrap_or('\u{FFFD}'));
        }
    }
    out
}

fn take_u16(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u16> {
    let mut hex = String::new();
    for _ in 0..4 {
        let c = *chars.peek()?;
        if !c.is_ascii_hexdigit() {
            return None;
        }
        hex.push(c);
        chars.next();
    }
    u16::from_str_radix(&hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_tokenizer_file, unescape_double};

    #[test]
    fn tokenizer_file_shape() {
        let content = r#"{"tests": [{
            "description": "simple",
            "input": "<a>",
            "output": [["StartTag", "a", {}]],
            "initialStates": ["Data state"],
            "lastStartTag": "b"
        }]}"#;
        let file = parse_tokenizer_file(content).unwrap();
        assert_eq!(file.tests.len(), 1);
        let test = &file.tests[0];
        assert_eq!(test.input, "<a>");
        assert_eq!(test.initial_states, ["Data state"]);
        assert_eq!(test.last_start_tag.as_deref(), Some("b"));
        assert!(!test.double_escaped);
    }

    #[test]
    fn double_escape_expansion_handles_surrogate_pairs() {
        assert_eq!(unescape_double(r"\u0041"), "A");
        assert_eq!(unescape_double(r"\uD83D\uDE00"), "\u{1F600}");
        assert_eq!(unescape_double(r"\uD800"), "\u{FFFD}");
        assert_eq!(unescape_double(r"a\qb"), "a\\qb");
    }
}
