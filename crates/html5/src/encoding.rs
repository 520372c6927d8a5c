//! Encoding sniffing and byte decoding.
//!
//! Sniff order: transport override, byte-order mark, `<meta>` prescan,
//! windows-1252 fallback. The prescan inspects at most 1024 non-comment bytes
//! and never more than 65536 bytes total. Labels resolve against a closed
//! canonical set; everything else is unsupported and falls through.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};
use memchr::memmem;

const PRESCAN_NON_COMMENT_BYTES: usize = 1024;
const PRESCAN_TOTAL_BYTES: usize = 65536;

/// Result of encoding sniffing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sniff {
    /// Canonical label of the chosen encoding.
    pub encoding: &'static str,
    /// Number of BOM bytes to strip before decoding.
    pub bom_len: usize,
}

/// Resolve a label to its canonical name, or `None` when unsupported.
///
/// UTF-7 and ISO-8859-1 normalize to windows-1252; the generic `utf-16`
/// label stays generic so the decoder can let a BOM pick the flavor.
pub fn canonical_label(label: &str) -> Option<&'static str> {
    let trimmed = label.trim_matches(|c: char| c.is_ascii_whitespace());
    // Generic utf-16 aliases stay generic so a BOM can pick the flavor; the
    // LE/BE-specific labels resolve through encoding_rs below.
    for generic in ["utf-16", "utf16", "unicode", "ucs-2", "csunicode", "iso-10646-ucs-2"] {
        if trimmed.eq_ignore_ascii_case(generic) {
            return Some("utf-16");
        }
    }
    if trimmed.eq_ignore_ascii_case("utf-7") {
        return Some("windows-1252");
    }
    let encoding = Encoding::for_label(trimmed.as_bytes())?;
    match encoding.name() {
        "UTF-8" => Some("utf-8"),
        "windows-1252" => Some("windows-1252"),
        "ISO-8859-2" => Some("iso-8859-2"),
        "EUC-JP" => Some("euc-jp"),
        "UTF-16LE" => Some("utf-16le"),
        "UTF-16BE" => Some("utf-16be"),
        _ => None,
    }
}

/// Sniff the encoding of a byte payload.
pub fn sniff(bytes: &[u8], transport: Option<&str>) -> Sniff {
    if let Some(label) = transport
        && let Some(encoding) = canonical_label(label)
    {
        return Sniff {
            encoding,
            bom_len: 0,
        };
    }
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Sniff {
            encoding: "utf-8",
            bom_len: 3,
        };
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Sniff {
            encoding: "utf-16le",
            bom_len: 2,
        };
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Sniff {
            encoding: "utf-16be",
            bom_len: 2,
        };
    }
    if let Some(encoding) = prescan(bytes) {
        return Sniff {
            encoding,
            bom_len: 0,
        };
    }
    Sniff {
        encoding: "windows-1252",
        bom_len: 0,
    }
}

/// Decode a byte payload, returning the text and the canonical label used.
///
/// Decoding never fails: malformed sequences become U+FFFD per the
/// destination codec's replacement policy.
pub fn decode(bytes: &[u8], transport: Option<&str>) -> (String, &'static str) {
    let sniffed = sniff(bytes, transport);
    let payload = &bytes[sniffed.bom_len..];
    let text = match sniffed.encoding {
        "utf-8" => decode_with(UTF_8, payload),
        "windows-1252" => decode_with(WINDOWS_1252, payload),
        "iso-8859-2" => decode_with(encoding_rs::ISO_8859_2, payload),
        "euc-jp" => decode_with(encoding_rs::EUC_JP, payload),
        "utf-16le" => decode_with(UTF_16LE, payload),
        "utf-16be" => decode_with(UTF_16BE, payload),
        "utf-16" => {
            // Generic utf-16: a BOM picks the flavor, default LE.
            if payload.starts_with(&[0xFE, 0xFF]) {
                decode_with(UTF_16BE, &payload[2..])
            } else if payload.starts_with(&[0xFF, 0xFE]) {
                decode_with(UTF_16LE, &payload[2..])
            } else {
                decode_with(UTF_16LE, payload)
            }
        }
        other => unreachable!("sniff returned unknown canonical label {other}"),
    };
    (text, sniffed.encoding)
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Prescan the head of the payload for a `<meta>`-declared encoding.
fn prescan(bytes: &[u8]) -> Option<&'static str> {
    let limit = bytes.len().min(PRESCAN_TOTAL_BYTES);
    let mut pos = 0;
    let mut budget = PRESCAN_NON_COMMENT_BYTES;

    while pos < limit && budget > 0 {
        if bytes[pos..limit].starts_with(b"<!--") {
            // Comments do not count against the non-comment budget.
            let close = memmem::find(&bytes[pos + 2..limit], b"-->")?;
            pos = pos + 2 + close + 3;
            continue;
        }
        if starts_with_meta(&bytes[pos..limit]) {
            let mut cursor = pos + 5;
            if let Some(encoding) = prescan_meta(bytes, &mut cursor, limit) {
                return Some(encoding);
            }
            let consumed = cursor - pos;
            budget = budget.saturating_sub(consumed);
            pos = cursor;
            continue;
        }
        if bytes[pos] == b'<' && is_tag_like(&bytes[pos..limit]) {
            let start = pos;
            skip_tag(bytes, &mut pos, limit);
            budget = budget.saturating_sub(pos - start);
            continue;
        }
        if bytes[pos] == b'<'
            && matches!(bytes.get(pos + 1), Some(b'!') | Some(b'?'))
        {
            let start = pos;
            while pos < limit && bytes[pos] != b'>' {
                pos += 1;
            }
            pos = (pos + 1).min(limit);
            budget = budget.saturating_sub(pos - start);
            continue;
        }
        pos += 1;
        budget -= 1;
    }
    None
}

fn starts_with_meta(bytes: &[u8]) -> bool {
    bytes.len() >= 6
        && bytes[..5].eq_ignore_ascii_case(b"<meta")
        && matches!(bytes[5], b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'/')
}

fn is_tag_like(bytes: &[u8]) -> bool {
    match bytes.get(1) {
        Some(b'/') => bytes.get(2).is_some_and(u8::is_ascii_alphabetic),
        Some(b) => b.is_ascii_alphabetic(),
        None => false,
    }
}

/// Skip a non-meta tag, attribute-aware so a `>` inside a quoted value does
/// not end the tag early.
fn skip_tag(bytes: &[u8], pos: &mut usize, limit: usize) {
    *pos += 1;
    if bytes.get(*pos) == Some(&b'/') {
        *pos += 1;
    }
    while *pos < limit && !matches!(bytes[*pos], b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'>') {
        *pos += 1;
    }
    while get_attribute(bytes, pos, limit).is_some() {}
    if *pos < limit && bytes[*pos] == b'>' {
        *pos += 1;
    }
}

fn prescan_meta(bytes: &[u8], cursor: &mut usize, limit: usize) -> Option<&'static str> {
    let mut seen: Vec<Vec<u8>> = Vec::new();
    let mut got_pragma = false;
    let mut charset: Option<Vec<u8>> = None;
    let mut pragma_charset: Option<Vec<u8>> = None;

    while let Some((name, value)) = get_attribute(bytes, cursor, limit) {
        if seen.iter().any(|n| n == &name) {
            continue;
        }
        seen.push(name.clone());
        match name.as_slice() {
            b"http-equiv" => {
                if value.eq_ignore_ascii_case(b"content-type") {
                    got_pragma = true;
                }
            }
            b"content" => {
                if pragma_charset.is_none() {
                    pragma_charset = charset_from_content(&value);
                }
            }
            b"charset" => {
                if charset.is_none() {
                    charset = Some(value);
                }
            }
            _ => {}
        }
    }
    if *cursor < limit && bytes[*cursor] == b'>' {
        *cursor += 1;
    }

    let label = match charset {
        Some(label) => label,
        None if got_pragma => pragma_charset?,
        None => return None,
    };
    let label = String::from_utf8_lossy(&label).into_owned();
    let encoding = canonical_label(&label)?;
    // A meta-declared utf-16 flavor cannot be right: the prescan itself read
    // the document as ASCII-compatible bytes.
    match encoding {
        "utf-16" | "utf-16le" | "utf-16be" => Some("utf-8"),
        other => Some(other),
    }
}

/// The spec's "get an attribute" for the prescan: returns a lowercased
/// name/value pair, advancing past it; `None` at `>` or end of input.
fn get_attribute(bytes: &[u8], pos: &mut usize, limit: usize) -> Option<(Vec<u8>, Vec<u8>)> {
    while *pos < limit && matches!(bytes[*pos], b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'/') {
        *pos += 1;
    }
    if *pos >= limit || bytes[*pos] == b'>' {
        return None;
    }

    let mut name = Vec::new();
    let mut value = Vec::new();
    loop {
        if *pos >= limit {
            return Some((name, value));
        }
        match bytes[*pos] {
            b'=' if !name.is_empty() => {
                *pos += 1;
                break;
            }
            b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' => {
                while *pos < limit
                    && matches!(bytes[*pos], b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
                {
                    *pos += 1;
                }
                if *pos >= limit || bytes[*pos] != b'=' {
                    return Some((name, value));
                }
                *pos += 1;
                break;
            }
            b'/' | b'>' => return Some((name, value)),
            b => {
                name.push(b.to_ascii_lowercase());
                *pos += 1;
            }
        }
    }

    while *pos < limit && matches!(bytes[*pos], b'\t' | b'\n' | b'\x0C' | b'\r' | b' ') {
        *pos += 1;
    }
    if *pos >= limit {
        return Some((name, value));
    }
    match bytes[*pos] {
        quote @ (b'"' | b'\'') => {
            *pos += 1;
            while *pos < limit && bytes[*pos] != quote {
                value.push(bytes[*pos].to_ascii_lowercase());
                *pos += 1;
            }
            if *pos < limit {
                *pos += 1;
            }
        }
        b'>' => {}
        _ => {
            while *pos < limit
                && !matches!(bytes[*pos], b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'>')
            {
                value.push(bytes[*pos].to_ascii_lowercase());
                *pos += 1;
            }
        }
    }
    Some((name, value))
}

/// Extract a `charset=...` declaration from a `content` attribute value.
fn charset_from_content(value: &[u8]) -> Option<Vec<u8>> {
    let idx = find_ignore_ascii_case(value, b"charset")?;
    let mut pos = idx + b"charset".len();
    while pos < value.len() && value[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if value.get(pos) != Some(&b'=') {
        return None;
    }
    pos += 1;
    while pos < value.len() && value[pos].is_ascii_whitespace() {
        pos += 1;
    }
    match value.get(pos) {
        Some(&quote @ (b'"' | b'\'')) => {
            let rest = &value[pos + 1..];
            let end = rest.iter().position(|&b| b == quote)?;
            Some(rest[..end].to_vec())
        }
        Some(_) => {
            let rest = &value[pos..];
            let end = rest
                .iter()
                .position(|b| b.is_ascii_whitespace() || *b == b';')
                .unwrap_or(rest.len());
            Some(rest[..end].to_vec())
        }
        None => None,
    }
}

fn find_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::{canonical_label, decode, sniff};

    #[test]
    fn transport_label_wins_over_everything() {
        let s = sniff(b"\xEF\xBB\xBF<meta charset=euc-jp>", Some("windows-1252"));
        assert_eq!(s.encoding, "windows-1252");
        assert_eq!(s.bom_len, 0);
    }

    #[test]
    fn unsupported_transport_label_falls_through_to_bom() {
        let s = sniff(b"\xEF\xBB\xBFx", Some("shift_jis"));
        assert_eq!(s.encoding, "utf-8");
        assert_eq!(s.bom_len, 3);
    }

    #[test]
    fn bom_detection_covers_all_three_forms() {
        assert_eq!(sniff(b"\xEF\xBB\xBFa", None).encoding, "utf-8");
        assert_eq!(sniff(b"\xFF\xFEa\x00", None).encoding, "utf-16le");
        assert_eq!(sniff(b"\xFE\xFF\x00a", None).encoding, "utf-16be");
    }

    #[test]
    fn meta_charset_prescan_finds_the_declaration() {
        let s = sniff(b"<html><head><meta charset=\"utf-8\"><title>t</title>", None);
        assert_eq!(s.encoding, "utf-8");
        assert_eq!(s.bom_len, 0);
    }

    #[test]
    fn meta_content_type_pragma_form() {
        let bytes =
            b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-2\">";
        assert_eq!(sniff(bytes, None).encoding, "iso-8859-2");
    }

    #[test]
    fn content_without_pragma_is_ignored() {
        let bytes = b"<meta content=\"text/html; charset=utf-8\">";
        assert_eq!(sniff(bytes, None).encoding, "windows-1252");
    }

    #[test]
    fn meta_inside_comment_is_skipped() {
        let bytes = b"<!-- <meta charset=utf-8> --><p>x";
        assert_eq!(sniff(bytes, None).encoding, "windows-1252");
    }

    #[test]
    fn quoted_gt_inside_attribute_does_not_end_the_tag() {
        let bytes = b"<a href=\"a>b\"><meta charset=utf-8>";
        assert_eq!(sniff(bytes, None).encoding, "utf-8");
    }

    #[test]
    fn meta_declared_utf16_is_replaced_by_utf8() {
        let bytes = b"<meta charset=utf-16le>";
        assert_eq!(sniff(bytes, None).encoding, "utf-8");
    }

    #[test]
    fn default_is_windows_1252() {
        let (text, label) = decode(b"caf\xE9", None);
        assert_eq!(label, "windows-1252");
        assert_eq!(text, "caf\u{E9}");
    }

    #[test]
    fn label_normalization_closed_set() {
        assert_eq!(canonical_label("UTF-8"), Some("utf-8"));
        assert_eq!(canonical_label(" utf-8 "), Some("utf-8"));
        assert_eq!(canonical_label("iso-8859-1"), Some("windows-1252"));
        assert_eq!(canonical_label("utf-7"), Some("windows-1252"));
        assert_eq!(canonical_label("utf-16"), Some("utf-16"));
        assert_eq!(canonical_label("utf16"), Some("utf-16"));
        assert_eq!(canonical_label("latin2"), Some("iso-8859-2"));
        assert_eq!(canonical_label("bogus-enc"), None);
    }

    #[test]
    fn generic_utf16_decodes_via_bom_else_le() {
        let (text, label) = decode(b"\xFE\xFF\x00h\x00i", Some("utf-16"));
        assert_eq!(label, "utf-16");
        assert_eq!(text, "hi");
        let (text, _) = decode(b"h\x00i\x00", Some("utf-16"));
        assert_eq!(text, "hi");
    }
}
