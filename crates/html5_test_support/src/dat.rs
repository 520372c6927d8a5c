//! `.dat` fixture parsing.
//!
//! The html5lib `.dat` format is directive-delimited UTF-8 text: each record
//! starts with a `#data` line (at file start or after a blank line), and each
//! `#name` line opens a section whose content runs to the next directive.

/// One `#name` section with its content lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatSection {
    pub name: String,
    pub lines: Vec<String>,
}

/// One directive-delimited record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatRecord {
    pub sections: Vec<DatSection>,
}

impl DatRecord {
    pub fn section(&self, name: &str) -> Option<&DatSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn section_text(&self, name: &str) -> Option<String> {
        self.section(name).map(|s| s.lines.join("\n"))
    }
}

/// A typed tree-construction record.
#[derive(Clone, Debug)]
pub struct TreeConstructionCase {
    pub data: String,
    pub errors: Vec<String>,
    pub document: Vec<String>,
    /// Fragment context, e.g. `td` or `svg path`.
    pub fragment: Option<String>,
    /// `Some(true)` for `#script-on`, `Some(false)` for `#script-off`.
    pub script_mode: Option<bool>,
    pub xml_coercion: bool,
    pub iframe_srcdoc: bool,
}

/// A typed encoding-sniffing record.
#[derive(Clone, Debug)]
pub struct EncodingCase {
    pub data: Vec<u8>,
    pub encoding: String,
}

pub fn parse_dat(content: &str) -> Vec<DatRecord> {
    let mut records = Vec::new();
    let mut current: Option<DatRecord> = None;
    let mut previous_blank = true;

    for line in content.lines() {
        if line == "#data" && previous_blank {
            if let Some(record) = current.take() {
                records.push(record);
            }
            current = Some(DatRecord::default());
        }
        previous_blank = line.is_empty();

        let Some(record) = current.as_mut() else {
            continue;
        };
        if let Some(name) = line.strip_prefix('#') {
            record.sections.push(DatSection {
                name: name.to_string(),
                lines: Vec::new(),
            });
        } else if let Some(section) = record.sections.last_mut() {
            section.lines.push(line.to_string());
        }
    }
    if let Some(record) = current.take() {
        records.push(record);
    }

    // The blank separator line belongs to the format, not to the last
    // section of a record.
    for record in &mut records {
        if let Some(section) = record.sections.last_mut()
            && section.lines.last().is_some_and(String::is_empty)
        {
            section.lines.pop();
        }
    }
    records
}

pub fn tree_construction_cases(content: &str) -> Vec<TreeConstructionCase> {
    parse_dat(content)
        .into_iter()
        .filter_map(|record| {
            let data = record.section_text("data")?;
            Some(TreeConstructionCase {
                data,
                errors: record
                    .section("errors")
                    .map(|s| s.lines.clone())
                    .unwrap_or_default(),
                document: record
                    .section("document")
                    .map(|s| s.lines.clone())
                    .unwrap_or_default(),
                fragment: record.section_text("document-fragment").map(|s| s.trim().to_string()),
                script_mode: if record.has_section("script-on") {
                    Some(true)
                } else if record.has_section("script-off") {
                    Some(false)
                } else {
                    None
                },
                xml_coercion: record.has_section("xml-coercion"),
                iframe_srcdoc: record.has_section("iframe-srcdoc"),
            })
        })
        .collect()
}

pub fn encoding_cases(content: &str) -> Vec<EncodingCase> {
    parse_dat(content)
        .into_iter()
        .filter_map(|record| {
            let data = record.section_text("data")?;
            let encoding = record.section_text("encoding")?;
            Some(EncodingCase {
                data: unescape(&data).into_bytes(),
                encoding: encoding.trim().to_ascii_lowercase(),
            })
        })
        .collect()
}

/// Expand `\xHH` and `\uHHHH` escapes in `#data` blocks.
pub fn unescape(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    let mut chars = data.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('x') => {
                chars.next();
                let hex: String = take_hex(&mut chars, 2);
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) if hex.len() == 2 => out.push(ch),
                    _ => {
                        out.push_str("\\x");
                        out.push_str(&hex);
                    }
                }
            }
            Some('u') => {
                chars.next();
                let hex: String = take_hex(&mut chars, 4);
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) if hex.len() == 4 => out.push(ch),
                    _ => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}

fn take_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, max: usize) -> String {
    let mut out = String::new();
    while out.len() < max
        && let Some(&c) = chars.peek()
        && c.is_ascii_hexdigit()
    {
        out.push(c);
        chars.next();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{parse_dat, tree_construction_cases, unescape};

    const SAMPLE: &str = "#data\n<p>One\n#errors\n(1,3): bad\n#document\n| <html>\n|   <body>\n\n#data\n<td>x\n#document-fragment\ntr\n#document\n| <td>\n";

    #[test]
    fn records_split_on_data_directives() {
        let records = parse_dat(SAMPLE);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].section_text("data").as_deref(), Some("<p>One"));
        assert_eq!(
            records[0].section("errors").unwrap().lines,
            ["(1,3): bad"]
        );
        assert_eq!(
            records[1].section_text("document-fragment").as_deref(),
            Some("tr")
        );
    }

    #[test]
    fn blank_separator_is_not_part_of_the_record() {
        let records = parse_dat(SAMPLE);
        assert_eq!(
            records[0].section("document").unwrap().lines,
            ["| <html>", "|   <body>"]
        );
    }

    #[test]
    fn data_may_contain_blank_lines() {
        let records = parse_dat("#data\na\n\nb\n#document\n| x\n");
        // The inner blank line stays; only a trailing separator would drop.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].section_text("data").as_deref(), Some("a\n\nb"));
    }

    #[test]
    fn typed_tree_construction_view() {
        let cases = tree_construction_cases(SAMPLE);
        assert_eq!(cases.len(), 2);
        assert!(cases[0].fragment.is_none());
        assert_eq!(cases[1].fragment.as_deref(), Some("tr"));
        assert_eq!(cases[0].script_mode, None);
    }

    #[test]
    fn escape_expansion() {
        assert_eq!(unescape(r"a\x41b"), "aAb");
        assert_eq!(unescape("\\u20AC"), "\u{20AC}");
        assert_eq!(unescape(r"plain"), "plain");
        assert_eq!(unescape(r"\q"), "\\q");
    }
}
