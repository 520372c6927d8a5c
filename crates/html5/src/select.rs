//! CSS selector matching over the finished tree.
//!
//! A deliberately small grammar: type, `#id`, `.class`, `[attr]`,
//! `[attr=value]`, compound selectors, descendant and child combinators, and
//! comma-separated groups. Invalid input fails with `SelectorError`;
//! matching never fails.

use crate::dom::{DomTree, NodeId};
use crate::error::SelectorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    universal: bool,
    name: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.name.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
    }
}

/// One selector in a group: compounds joined right-to-left by combinators.
#[derive(Clone, Debug)]
struct Complex {
    /// Leftmost first; `combinator` binds a compound to the one before it.
    parts: Vec<(Combinator, Compound)>,
}

/// A parsed selector group.
#[derive(Clone, Debug)]
pub struct Selector {
    groups: Vec<Complex>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut groups = Vec::new();
        for part in input.split(',') {
            groups.push(parse_complex(part)?);
        }
        Ok(Self { groups })
    }
}

/// All elements matching `selector`, in tree order.
pub fn query_all(tree: &DomTree, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
    let selector = Selector::parse(selector)?;
    Ok(tree
        .descendants(tree.root())
        .into_iter()
        .filter(|&node| matches_selector(tree, node, &selector))
        .collect())
}

/// First match in tree order.
pub fn query_first(tree: &DomTree, selector: &str) -> Result<Option<NodeId>, SelectorError> {
    let selector = Selector::parse(selector)?;
    Ok(tree
        .descendants(tree.root())
        .into_iter()
        .find(|&node| matches_selector(tree, node, &selector)))
}

fn matches_selector(tree: &DomTree, node: NodeId, selector: &Selector) -> bool {
    selector
        .groups
        .iter()
        .any(|complex| matches_complex(tree, node, complex))
}

fn matches_complex(tree: &DomTree, node: NodeId, complex: &Complex) -> bool {
    let (last, rest) = complex.parts.split_last().expect("parser rejects empty");
    if !matches_compound(tree, node, &last.1) {
        return false;
    }
    matches_rest(tree, node, rest, last.0)
}

fn matches_rest(
    tree: &DomTree,
    node: NodeId,
    rest: &[(Combinator, Compound)],
    combinator: Combinator,
) -> bool {
    let Some((head, tail)) = rest.split_last() else {
        return true;
    };
    match combinator {
        Combinator::Child => tree
            .parent(node)
            .is_some_and(|p| matches_compound(tree, p, &head.1) && matches_rest(tree, p, tail, head.0)),
        Combinator::Descendant => {
            let mut current = tree.parent(node);
            while let Some(ancestor) = current {
                if matches_compound(tree, ancestor, &head.1)
                    && matches_rest(tree, ancestor, tail, head.0)
                {
                    return true;
                }
                current = tree.parent(ancestor);
            }
            false
        }
    }
}

fn matches_compound(tree: &DomTree, node: NodeId, compound: &Compound) -> bool {
    let Some(element) = tree.as_element(node) else {
        return false;
    };
    // Names compare against the stored form: canonical lowercase for HTML,
    // adjusted case for foreign elements.
    if let Some(name) = &compound.name
        && element.name != *name
    {
        return false;
    }
    if let Some(id) = &compound.id
        && tree.attr(node, "id") != Some(id.as_str())
    {
        return false;
    }
    for class in &compound.classes {
        let has = tree
            .attr(node, "class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class));
        if !has {
            return false;
        }
    }
    for (name, expected) in &compound.attrs {
        match (tree.attr(node, name), expected) {
            (None, _) => return false,
            (Some(_), None) => {}
            (Some(actual), Some(expected)) if actual == expected => {}
            _ => return false,
        }
    }
    true
}

fn parse_complex(input: &str) -> Result<Complex, SelectorError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SelectorError::Empty);
    }
    let mut parts: Vec<(Combinator, Compound)> = Vec::new();
    let mut pending = Combinator::Descendant;
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '>' => {
                chars.next();
                if parts.is_empty() {
                    return Err(SelectorError::DanglingCombinator);
                }
                pending = Combinator::Child;
            }
            _ => {
                let compound = parse_compound(input, &mut chars)?;
                if compound.is_empty() {
                    return Err(SelectorError::UnexpectedChar { found: c, offset });
                }
                parts.push((pending, compound));
                pending = Combinator::Descendant;
            }
        }
    }
    if parts.is_empty() {
        return Err(SelectorError::Empty);
    }
    if pending == Combinator::Child {
        return Err(SelectorError::DanglingCombinator);
    }
    Ok(Complex { parts })
}

fn parse_compound(
    input: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    while let Some(&(offset, c)) = chars.peek() {
        match c {
            '*' => {
                chars.next();
                compound.universal = true;
            }
            '#' => {
                chars.next();
                compound.id = Some(take_ident(chars));
            }
            '.' => {
                chars.next();
                compound.classes.push(take_ident(chars));
            }
            '[' => {
                chars.next();
                let (name, value) = parse_attr_test(input, chars)?;
                compound.attrs.push((name, value));
            }
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => {
                if compound.name.is_some()
                    || compound.id.is_some()
                    || !compound.classes.is_empty()
                    || !compound.attrs.is_empty()
                {
                    return Err(SelectorError::UnexpectedChar { found: c, offset });
                }
                compound.name = Some(take_ident(chars).to_ascii_lowercase());
            }
            ' ' | '\t' | '\n' | '>' => break,
            other => {
                return Err(SelectorError::UnexpectedChar {
                    found: other,
                    offset,
                });
            }
        }
    }
    Ok(compound)
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

fn parse_attr_test(
    _input: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> Result<(String, Option<String>), SelectorError> {
    let name = take_ident(chars).to_ascii_lowercase();
    if name.is_empty() {
        return Err(SelectorError::UnclosedAttribute);
    }
    match chars.next() {
        Some((_, ']')) => Ok((name, None)),
        Some((_, '=')) => {
            let quote = match chars.peek() {
                Some(&(_, q @ ('"' | '\''))) => {
                    chars.next();
                    Some(q)
                }
                _ => None,
            };
            let mut value = String::new();
            for (_, c) in chars.by_ref() {
                match quote {
                    Some(q) if c == q => break,
                    None if c == ']' => return Ok((name, Some(value))),
                    _ => value.push(c),
                }
            }
            if quote.is_some() {
                match chars.next() {
                    Some((_, ']')) => Ok((name, Some(value))),
                    _ => Err(SelectorError::UnclosedAttribute),
                }
            } else {
                Err(SelectorError::UnclosedAttribute)
            }
        }
        _ => Err(SelectorError::UnclosedAttribute),
    }
}

#[cfg(test)]
mod tests {
    use super::query_all;
    use crate::error::SelectorError;
    use crate::{ParseOpts, parse};

    fn names(html: &str, selector: &str) -> Vec<String> {
        let result = parse(html, ParseOpts::default()).unwrap();
        query_all(&result.dom, selector)
            .unwrap()
            .into_iter()
            .map(|n| {
                let id = result.dom.attr(n, "id").unwrap_or("");
                format!("{}#{id}", result.dom.element_name(n).unwrap())
            })
            .collect()
    }

    #[test]
    fn type_id_class_and_attribute_selectors() {
        let html = r#"<div id="a" class="x y"><p id="b" class="x"></p></div><p id="c" data-k="v"></p>"#;
        assert_eq!(names(html, "p"), ["p#b", "p#c"]);
        assert_eq!(names(html, ".x.y"), ["div#a"]);
        assert_eq!(names(html, "#b"), ["p#b"]);
        assert_eq!(names(html, "[data-k=v]"), ["p#c"]);
        assert_eq!(names(html, "p.x"), ["p#b"]);
    }

    #[test]
    fn descendant_and_child_combinators() {
        let html = r#"<div id="a"><section id="s"><p id="b"></p></section><p id="c"></p></div>"#;
        assert_eq!(names(html, "div p"), ["p#b", "p#c"]);
        assert_eq!(names(html, "div > p"), ["p#c"]);
        assert_eq!(names(html, "section > p"), ["p#b"]);
        assert_eq!(names(html, "section > *"), ["p#b"]);
    }

    #[test]
    fn groups_match_in_tree_order() {
        let html = r#"<em id="a"></em><strong id="b"></strong>"#;
        assert_eq!(names(html, "strong, em"), ["em#a", "strong#b"]);
    }

    #[test]
    fn invalid_selectors_fail_with_typed_errors() {
        let result = parse("<p></p>", ParseOpts::default()).unwrap();
        assert_eq!(
            query_all(&result.dom, "").unwrap_err(),
            SelectorError::Empty
        );
        assert_eq!(
            query_all(&result.dom, ">p").unwrap_err(),
            SelectorError::DanglingCombinator
        );
        assert_eq!(
            query_all(&result.dom, "[x").unwrap_err(),
            SelectorError::UnclosedAttribute
        );
        assert!(matches!(
            query_all(&result.dom, "p!"),
            Err(SelectorError::UnexpectedChar { .. })
        ));
    }
}
