//! Tag-name classification.
//!
//! One bitmask per known HTML tag name replaces the dozens of per-mode
//! set-membership checks the tree builder would otherwise need. Lookup is a
//! single `match`; unknown names classify as `EMPTY`.

/// Bitmask of tag categories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagFlags(u32);

impl TagFlags {
    pub const EMPTY: Self = Self(0);
    /// Void elements: never get an end tag, never stay on the stack.
    pub const VOID: Self = Self(1 << 0);
    /// Formatting elements tracked by the active-formatting list.
    pub const FORMATTING: Self = Self(1 << 1);
    /// The WHATWG "special" category.
    pub const SPECIAL: Self = Self(1 << 2);
    /// h1 through h6.
    pub const HEADING: Self = Self(1 << 3);
    /// Terminators for the default scope walk.
    pub const SCOPE_DEFAULT: Self = Self(1 << 4);
    /// Additional terminators for button scope.
    pub const SCOPE_BUTTON: Self = Self(1 << 5);
    /// Additional terminators for list-item scope.
    pub const SCOPE_LIST: Self = Self(1 << 6);
    /// Terminators for table scope.
    pub const SCOPE_TABLE: Self = Self(1 << 7);
    /// Closed by "generate implied end tags".
    pub const IMPLIED_END: Self = Self(1 << 8);
    /// Current-node names that trigger foster parenting in table modes.
    pub const TABLE_FOSTER: Self = Self(1 << 9);
    /// Start tags that break out of foreign (SVG/MathML) content.
    pub const FOREIGN_BREAK: Self = Self(1 << 10);
    /// Start tags that flip the tokenizer to RAWTEXT (script data for script).
    pub const RAWTEXT: Self = Self(1 << 11);
    /// Start tags that flip the tokenizer to RCDATA.
    pub const RCDATA: Self = Self(1 << 12);
    /// Tags the in-head handler owns.
    pub const IN_HEAD: Self = Self(1 << 13);
    /// Table-structure children whose start tags break caption/cell context
    /// (caption, col groups, sections, rows, cells).
    pub const TABLE_CHILD: Self = Self(1 << 14);
    /// Allowed to remain open at EOF without a parse error.
    pub const EOF_UNCLOSED: Self = Self(1 << 15);
    /// Start tags that close an open p element in button scope.
    pub const BLOCK_WITH_P: Self = Self(1 << 16);
    /// Structure tags silently ignored when misplaced in body.
    pub const STRUCTURE_IGN: Self = Self(1 << 17);
    /// applet, marquee, object: formatting markers + default scope.
    pub const APPLET_LIKE: Self = Self(1 << 18);
    /// tbody, tfoot, thead.
    pub const TABLE_SECTION: Self = Self(1 << 19);
    /// td, th.
    pub const TABLE_CELL: Self = Self(1 << 20);
    /// rb, rp, rt, rtc.
    pub const RUBY: Self = Self(1 << 21);

    pub fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 != 0
    }

    /// Classify an HTML-namespace tag name. Names are expected in canonical
    /// lowercase; unknown names return `EMPTY`.
    pub fn of(name: &str) -> Self {
        match name {
            "a" | "font" => Self::FORMATTING,
            "address" | "article" | "aside" | "details" | "fieldset" | "figcaption" | "figure"
            | "footer" | "header" | "hgroup" | "main" | "nav" | "search" | "section"
            | "summary" | "dir" | "form" => Self::SPECIAL | Self::BLOCK_WITH_P,
            "dialog" => Self::BLOCK_WITH_P,
            "applet" | "marquee" | "object" => {
                Self::SPECIAL | Self::SCOPE_DEFAULT | Self::APPLET_LIKE
            }
            "area" | "input" | "param" | "source" | "track" | "wbr" => Self::VOID | Self::SPECIAL,
            "b" | "big" | "code" | "em" | "i" | "nobr" | "s" | "small" | "strike" | "strong"
            | "tt" | "u" => Self::FORMATTING | Self::FOREIGN_BREAK,
            "base" => Self::VOID | Self::SPECIAL | Self::IN_HEAD,
            "basefont" | "bgsound" => Self::SPECIAL | Self::IN_HEAD,
            "blockquote" | "center" | "dl" | "menu" => {
                Self::SPECIAL | Self::BLOCK_WITH_P | Self::FOREIGN_BREAK
            }
            "ol" | "ul" => {
                Self::SPECIAL | Self::BLOCK_WITH_P | Self::FOREIGN_BREAK | Self::SCOPE_LIST
            }
            "body" => Self::SPECIAL | Self::EOF_UNCLOSED | Self::FOREIGN_BREAK,
            "br" | "img" | "embed" => Self::VOID | Self::SPECIAL | Self::FOREIGN_BREAK,
            "button" => Self::SPECIAL | Self::SCOPE_BUTTON,
            "caption" => {
                Self::SPECIAL | Self::SCOPE_DEFAULT | Self::TABLE_CHILD | Self::STRUCTURE_IGN
            }
            "col" => Self::VOID | Self::SPECIAL | Self::TABLE_CHILD | Self::STRUCTURE_IGN,
            "colgroup" => Self::SPECIAL | Self::TABLE_CHILD | Self::STRUCTURE_IGN,
            "dd" | "dt" => {
                Self::SPECIAL | Self::IMPLIED_END | Self::EOF_UNCLOSED | Self::FOREIGN_BREAK
            }
            "div" => Self::SPECIAL | Self::BLOCK_WITH_P | Self::FOREIGN_BREAK,
            "frame" => Self::SPECIAL | Self::STRUCTURE_IGN,
            "frameset" => Self::SPECIAL,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                Self::SPECIAL | Self::HEADING | Self::BLOCK_WITH_P | Self::FOREIGN_BREAK
            }
            "head" => Self::SPECIAL | Self::STRUCTURE_IGN | Self::FOREIGN_BREAK,
            "hr" => Self::VOID | Self::SPECIAL | Self::BLOCK_WITH_P | Self::FOREIGN_BREAK,
            "html" => {
                Self::SPECIAL | Self::SCOPE_DEFAULT | Self::SCOPE_TABLE | Self::EOF_UNCLOSED
            }
            "iframe" | "noembed" => Self::SPECIAL | Self::RAWTEXT,
            "keygen" | "noscript" | "plaintext" | "select" => Self::SPECIAL,
            "li" => Self::SPECIAL | Self::IMPLIED_END | Self::EOF_UNCLOSED | Self::FOREIGN_BREAK,
            "link" => Self::VOID | Self::SPECIAL | Self::IN_HEAD,
            "meta" => Self::VOID | Self::SPECIAL | Self::IN_HEAD | Self::FOREIGN_BREAK,
            "listing" | "pre" => Self::SPECIAL | Self::BLOCK_WITH_P | Self::FOREIGN_BREAK,
            "noframes" => Self::SPECIAL | Self::RAWTEXT | Self::IN_HEAD,
            "optgroup" | "option" => Self::IMPLIED_END | Self::EOF_UNCLOSED,
            "p" => {
                Self::SPECIAL
                    | Self::IMPLIED_END
                    | Self::BLOCK_WITH_P
                    | Self::EOF_UNCLOSED
                    | Self::FOREIGN_BREAK
            }
            "rb" | "rp" | "rt" | "rtc" => Self::RUBY | Self::IMPLIED_END | Self::EOF_UNCLOSED,
            "ruby" | "span" | "sub" | "sup" | "var" => Self::FOREIGN_BREAK,
            "script" | "style" => Self::SPECIAL | Self::RAWTEXT | Self::IN_HEAD,
            "table" => {
                Self::SPECIAL
                    | Self::SCOPE_DEFAULT
                    | Self::SCOPE_TABLE
                    | Self::TABLE_FOSTER
                    | Self::FOREIGN_BREAK
            }
            "tbody" | "tfoot" | "thead" => {
                Self::SPECIAL
                    | Self::TABLE_SECTION
                    | Self::TABLE_CHILD
                    | Self::EOF_UNCLOSED
                    | Self::STRUCTURE_IGN
                    | Self::TABLE_FOSTER
            }
            "td" | "th" => {
                Self::SPECIAL
                    | Self::TABLE_CELL
                    | Self::SCOPE_DEFAULT
                    | Self::TABLE_CHILD
                    | Self::EOF_UNCLOSED
                    | Self::STRUCTURE_IGN
            }
            "template" => {
                Self::SPECIAL | Self::SCOPE_DEFAULT | Self::SCOPE_TABLE | Self::IN_HEAD
            }
            "textarea" => Self::SPECIAL | Self::RCDATA,
            "title" => Self::SPECIAL | Self::RCDATA | Self::IN_HEAD,
            "tr" => {
                Self::SPECIAL
                    | Self::TABLE_CHILD
                    | Self::EOF_UNCLOSED
                    | Self::STRUCTURE_IGN
                    | Self::TABLE_FOSTER
            }
            "xmp" => Self::SPECIAL | Self::RAWTEXT | Self::BLOCK_WITH_P,
            _ => Self::EMPTY,
        }
    }
}

impl std::ops::BitOr for TagFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::TagFlags;

    #[test]
    fn void_elements_match_the_spec_set() {
        for name in [
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
            "source", "track", "wbr",
        ] {
            assert!(TagFlags::of(name).contains(TagFlags::VOID), "{name}");
        }
        assert!(!TagFlags::of("div").contains(TagFlags::VOID));
        assert!(!TagFlags::of("basefont").contains(TagFlags::VOID));
    }

    #[test]
    fn formatting_set_matches_active_formatting_membership() {
        for name in [
            "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike", "strong",
            "tt", "u",
        ] {
            assert!(TagFlags::of(name).contains(TagFlags::FORMATTING), "{name}");
        }
        assert!(!TagFlags::of("span").contains(TagFlags::FORMATTING));
    }

    #[test]
    fn scope_terminators_cover_default_and_table_scope() {
        for name in [
            "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
        ] {
            assert!(
                TagFlags::of(name).contains(TagFlags::SCOPE_DEFAULT),
                "{name}"
            );
        }
        for name in ["html", "table", "template"] {
            assert!(TagFlags::of(name).contains(TagFlags::SCOPE_TABLE), "{name}");
        }
        assert!(!TagFlags::of("div").contains(TagFlags::SCOPE_DEFAULT));
    }

    #[test]
    fn rawtext_and_rcdata_switch_sets() {
        for name in ["script", "style", "xmp", "iframe", "noembed", "noframes"] {
            assert!(TagFlags::of(name).contains(TagFlags::RAWTEXT), "{name}");
        }
        for name in ["title", "textarea"] {
            assert!(TagFlags::of(name).contains(TagFlags::RCDATA), "{name}");
        }
        assert!(!TagFlags::of("noscript").contains(TagFlags::RAWTEXT));
    }

    #[test]
    fn unknown_names_classify_as_empty() {
        assert_eq!(TagFlags::of("x-custom"), TagFlags::EMPTY);
        assert_eq!(TagFlags::of(""), TagFlags::EMPTY);
    }
}
