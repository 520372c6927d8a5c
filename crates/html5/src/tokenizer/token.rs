//! Token model.
//!
//! Tokens own their text: names are canonical lowercase for HTML tags, and
//! attribute values arrive entity-decoded. Character tokens carry runs, not
//! single characters, whenever the input allows batching.

/// HTML attribute. Names are unique per tag; first occurrence wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Start or end tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub self_closing: bool,
}

impl Tag {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            self_closing: false,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoctypeToken {
    pub name: Option<String>,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub force_quirks: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype(DoctypeToken),
    StartTag(Tag),
    EndTag(Tag),
    Comment(String),
    Character(String),
    Eof,
}

impl Token {
    pub fn is_whitespace_only(&self) -> bool {
        match self {
            Token::Character(data) => data
                .chars()
                .all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' ')),
            _ => false,
        }
    }
}
