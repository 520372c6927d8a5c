//! Parse errors for tokenization and tree construction.
//!
//! Parse errors are values, never control flow: the algorithm is total and a
//! malformed document still produces a tree. Errors are collected only when
//! the caller opts in (`collect_errors` / `strict`).

use thiserror::Error;

/// A recorded parse error.
///
/// `code` is a stable kebab-case identifier drawn from the WHATWG error
/// taxonomy (plus a handful of tree-builder codes such as
/// `adoption-agency-1.3`). `position` is a 1-based `(line, column)` into the
/// decoded input when the tokenizer recorded it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub code: &'static str,
    pub message: Option<String>,
    pub position: Option<(u32, u32)>,
}

impl ParseError {
    pub fn new(code: &'static str) -> Self {
        Self {
            code,
            message: None,
            position: None,
        }
    }

    pub fn at(code: &'static str, line: u32, column: u32) -> Self {
        Self {
            code,
            message: None,
            position: Some((line, column)),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some((line, column)) => write!(f, "{} at {line}:{column}", self.code),
            None => f.write_str(self.code),
        }
    }
}

/// Failure surfaced by `parse` when `strict` is set: the first recorded parse
/// error, raised after tokenization of the current input completes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("strict parse failed: {0}")]
pub struct StrictError(pub ParseError);

/// Failure parsing a CSS selector string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("unclosed attribute selector")]
    UnclosedAttribute,
    #[error("dangling combinator")]
    DanglingCombinator,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display_includes_position_when_present() {
        let err = ParseError::at("eof-in-tag", 3, 14);
        assert_eq!(err.to_string(), "eof-in-tag at 3:14");
        let bare = ParseError::new("unexpected-null-character");
        assert_eq!(bare.to_string(), "unexpected-null-character");
    }

    #[test]
    fn strict_error_wraps_first_parse_error() {
        let err = StrictError(ParseError::new("unexpected-doctype"));
        assert!(err.to_string().contains("unexpected-doctype"));
    }
}
