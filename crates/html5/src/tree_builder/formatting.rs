//! Active formatting list, reconstruction, and the adoption agency algorithm.

use super::TreeBuilder;
use crate::dom::{Namespace, NodeId};
use crate::tokenizer::Tag;

/// Entry in the active-formatting list. Markers fence template boundaries
/// and applet-like elements.
#[derive(Clone, Debug)]
pub(crate) enum FormatEntry {
    Marker,
    Element { node: NodeId, tag: Tag },
}

/// Outcome of the adoption agency: either the end tag was handled, or the
/// caller falls through to the "any other end tag" steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AdoptionResult {
    Handled,
    AnyOtherEndTag,
}

impl TreeBuilder {
    pub(crate) fn push_formatting_marker(&mut self) {
        self.formatting.push(FormatEntry::Marker);
    }

    /// Push a formatting element, enforcing the Noah's Ark clause: at most
    /// three identical entries since the last marker.
    pub(crate) fn push_formatting(&mut self, node: NodeId, tag: &Tag) {
        let mut identical = Vec::new();
        for (idx, entry) in self.formatting.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => break,
                FormatEntry::Element { tag: existing, .. } => {
                    if existing.name == tag.name && same_attributes(existing, tag) {
                        identical.push(idx);
                    }
                }
            }
        }
        if identical.len() >= 3 {
            // `identical` is in reverse order; the last element is earliest.
            self.formatting.remove(*identical.last().unwrap());
        }
        self.formatting.push(FormatEntry::Element {
            node,
            tag: tag.clone(),
        });
    }

    pub(crate) fn clear_formatting_to_marker(&mut self) {
        while let Some(entry) = self.formatting.pop() {
            if matches!(entry, FormatEntry::Marker) {
                break;
            }
        }
    }

    pub(crate) fn formatting_index_of_node(&self, node: NodeId) -> Option<usize> {
        self.formatting.iter().rposition(
            |entry| matches!(entry, FormatEntry::Element { node: n, .. } if *n == node),
        )
    }

    pub(crate) fn remove_formatting_entry_for(&mut self, node: NodeId) {
        if let Some(idx) = self.formatting_index_of_node(node) {
            self.formatting.remove(idx);
        }
    }

    /// Last entry with `name` since the last marker.
    pub(crate) fn formatting_entry_named(&self, name: &str) -> Option<(usize, NodeId)> {
        for (idx, entry) in self.formatting.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => return None,
                FormatEntry::Element { node, tag } if tag.name == name => {
                    return Some((idx, *node));
                }
                FormatEntry::Element { .. } => {}
            }
        }
        None
    }

    /// Reconstruct the active formatting elements up to the last marker.
    pub(crate) fn reconstruct_formatting(&mut self) {
        let Some(last) = self.formatting.last() else {
            return;
        };
        if matches!(last, FormatEntry::Marker) {
            return;
        }
        if let FormatEntry::Element { node, .. } = last
            && self.open.contains(*node)
        {
            return;
        }

        // Rewind to the entry after the last marker / last open entry.
        let mut entry_index = self.formatting.len() - 1;
        while entry_index > 0 {
            match &self.formatting[entry_index - 1] {
                FormatEntry::Marker => break,
                FormatEntry::Element { node, .. } if self.open.contains(*node) => break,
                FormatEntry::Element { .. } => entry_index -= 1,
            }
        }

        for idx in entry_index..self.formatting.len() {
            let FormatEntry::Element { tag, .. } = self.formatting[idx].clone() else {
                unreachable!("markers were fenced off by the rewind");
            };
            let new_node = self.insert_html_element(&tag);
            self.formatting[idx] = FormatEntry::Element {
                node: new_node,
                tag,
            };
        }
    }

    /// The adoption agency algorithm (WHATWG §13.2.6.3.7): up to eight outer
    /// iterations relocating misnested formatting elements around the
    /// furthest block.
    pub(crate) fn adoption_agency(&mut self, subject: &str) -> AdoptionResult {
        // Fast path: current node matches and is not a formatting entry.
        if let Some(current) = self.current()
            && self.dom.is_html_element(current, subject)
            && self.formatting_index_of_node(current).is_none()
        {
            self.open.pop();
            return AdoptionResult::Handled;
        }

        for _ in 0..8 {
            let Some((entry_idx, fmt_element)) = self.formatting_entry_named(subject) else {
                return AdoptionResult::AnyOtherEndTag;
            };
            let Some(fmt_stack_idx) = self.open.index_of(fmt_element) else {
                self.error("adoption-agency-1.2");
                self.formatting.remove(entry_idx);
                return AdoptionResult::Handled;
            };
            if !self.open.has_node_in_scope(&self.dom, fmt_element) {
                self.error("adoption-agency-4.4");
                return AdoptionResult::Handled;
            }
            if self.current() != Some(fmt_element) {
                self.error("adoption-agency-1.3");
            }

            // Furthest block: the first special element past the formatting
            // element in push order.
            let furthest_block = self
                .open
                .items()
                .iter()
                .enumerate()
                .skip(fmt_stack_idx + 1)
                .find(|&(_, &n)| self.is_special(n))
                .map(|(idx, &n)| (idx, n));

            let Some((_, furthest_block)) = furthest_block else {
                self.open.truncate(fmt_stack_idx);
                self.formatting.remove(entry_idx);
                return AdoptionResult::Handled;
            };

            let common_ancestor = self
                .open
                .get(fmt_stack_idx - 1)
                .expect("formatting element always sits above the root");
            let mut bookmark = entry_idx;

            // Inner loop: walk up from the furthest block, cloning nodes that
            // stay and dropping nodes that do not.
            let mut node_idx = self.open.index_of(furthest_block).unwrap();
            let mut last_node = furthest_block;
            let mut counter = 0u32;
            loop {
                counter += 1;
                node_idx -= 1;
                let node = self.open.get(node_idx).unwrap();
                if node == fmt_element {
                    break;
                }
                let mut in_list = self.formatting_index_of_node(node);
                if counter > 3
                    && let Some(list_idx) = in_list
                {
                    self.formatting.remove(list_idx);
                    if list_idx < bookmark {
                        bookmark -= 1;
                    }
                    in_list = None;
                }
                let Some(list_idx) = in_list else {
                    self.open.remove(node);
                    continue;
                };

                let FormatEntry::Element { tag, .. } = self.formatting[list_idx].clone() else {
                    unreachable!("index came from an element entry");
                };
                let clone = self.create_element_for(&tag, Namespace::Html);
                self.formatting[list_idx] = FormatEntry::Element { node: clone, tag };
                self.open.replace(node, clone);

                if last_node == furthest_block {
                    bookmark = list_idx + 1;
                }
                self.dom.append(clone, last_node);
                last_node = clone;
            }

            self.dom.detach(last_node);
            let (parent, before) = self.appropriate_place(Some(common_ancestor));
            match before {
                Some(reference) => self.dom.insert_before(parent, last_node, reference),
                None => self.dom.append(parent, last_node),
            }

            let FormatEntry::Element { tag, .. } = self.formatting[
                self.formatting_index_of_node(fmt_element)
                    .expect("formatting entry survives the inner loop")
            ]
            .clone() else {
                unreachable!();
            };
            let fmt_clone = self.create_element_for(&tag, Namespace::Html);
            self.dom.reparent_children(furthest_block, fmt_clone);
            self.dom.append(furthest_block, fmt_clone);

            let old_entry = self.formatting_index_of_node(fmt_element).unwrap();
            self.formatting.remove(old_entry);
            if old_entry < bookmark {
                bookmark -= 1;
            }
            self.formatting.insert(
                bookmark,
                FormatEntry::Element {
                    node: fmt_clone,
                    tag,
                },
            );

            self.open.remove(fmt_element);
            let fb_idx = self.open.index_of(furthest_block).unwrap();
            self.open.insert_at(fb_idx + 1, fmt_clone);
        }
        AdoptionResult::Handled
    }

    /// `</p>`-style end tags that run the adoption agency first and fall back
    /// to the generic end-tag walk.
    pub(crate) fn any_other_end_tag(&mut self, name: &str) {
        for idx in (0..self.open.len()).rev() {
            let node = self.open.get(idx).unwrap();
            if self.dom.is_html_element(node, name) {
                self.generate_implied_end_tags(Some(name));
                if self.current() != Some(node) {
                    self.error("unexpected-end-tag");
                }
                self.open.pop_until_node(node);
                return;
            }
            if self.is_special(node) {
                self.error("unexpected-end-tag");
                return;
            }
        }
    }

    /// Used by the TEXT-mode entry points for table modes that flush pending
    /// character runs through the in-body path with foster parenting on.
    pub(crate) fn flush_pending_table_text(&mut self) {
        let pending = std::mem::take(&mut self.pending_table_text);
        if pending.is_empty() {
            return;
        }
        let all_whitespace = pending
            .chars()
            .all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '));
        if all_whitespace {
            self.insert_text(&pending);
        } else {
            self.error("foster-parenting-character");
            self.insert_from_table = true;
            self.reconstruct_formatting();
            self.insert_text(&pending);
            self.frameset_ok = false;
            self.insert_from_table = false;
        }
    }
}

fn same_attributes(a: &Tag, b: &Tag) -> bool {
    if a.attrs.len() != b.attrs.len() {
        return false;
    }
    a.attrs
        .iter()
        .all(|attr| b.attr(&attr.name) == Some(attr.value.as_str()))
}
