//! Quirks-mode derivation from the DOCTYPE.

use crate::dom::QuirksMode;
use crate::tokenizer::DoctypeToken;

/// Public-id prefixes that force full quirks.
#[rustfmt::skip]
const QUIRKY_PUBLIC_PREFIXES: &[&str] = &[
    "+//silmaril//dtd html pro v0r11 19970101//",
    "-//as//dtd html 3.0 aswedit + extensions//",
    "-//advasoft ltd//dtd html 3.0 aswedit + extensions//",
    "-//ietf//dtd html 2.0 level 1//",
    "-//ietf//dtd html 2.0 level 2//",
    "-//ietf//dtd html 2.0 strict level 1//",
    "-//ietf//dtd html 2.0 strict level 2//",
    "-//ietf//dtd html 2.0 strict//",
    "-//ietf//dtd html 2.0//",
    "-//ietf//dtd html 2.1e//",
    "-//ietf//dtd html 3.0//",
    "-//ietf//dtd html 3.2 final//",
    "-//ietf//dtd html 3.2//",
    "-//ietf//dtd html 3//",
    "-//ietf//dtd html level 0//",
    "-//ietf//dtd html level 1//",
    "-//ietf//dtd html level 2//",
    "-//ietf//dtd html level 3//",
    "-//ietf//dtd html strict level 0//",
    "-//ietf//dtd html strict level 1//",
    "-//ietf//dtd html strict level 2//",
    "-//ietf//dtd html strict level 3//",
    "-//ietf//dtd html strict//",
    "-//ietf//dtd html//",
    "-//metrius//dtd metrius presentational//",
    "-//microsoft//dtd internet explorer 2.0 html strict//",
    "-//microsoft//dtd internet explorer 2.0 html//",
    "-//microsoft//dtd internet explorer 2.0 tables//",
    "-//microsoft//dtd internet explorer 3.0 html strict//",
    "-//microsoft//dtd internet explorer 3.0 html//",
    "-//microsoft//dtd internet explorer 3.0 tables//",
    "-//netscape comm. corp.//dtd html//",
    "-//netscape comm. corp.//dtd strict html//",
    "-//o'reilly and associates//dtd html 2.0//",
    "-//o'reilly and associates//dtd html extended 1.0//",
    "-//o'reilly and associates//dtd html extended relaxed 1.0//",
    "-//sq//dtd html 2.0 hotmetal + extensions//",
    "-//softquad software//dtd hotmetal pro 6.0::19990601::extensions to html 4.0//",
    "-//softquad//dtd hotmetal pro 4.0::19971010::extensions to html 4.0//",
    "-//spyglass//dtd html 2.0 extended//",
    "-//sun microsystems corp.//dtd hotjava html//",
    "-//sun microsystems corp.//dtd hotjava strict html//",
    "-//w3c//dtd html 3 1995-03-24//",
    "-//w3c//dtd html 3.2 draft//",
    "-//w3c//dtd html 3.2 final//",
    "-//w3c//dtd html 3.2//",
    "-//w3c//dtd html 3.2s draft//",
    "-//w3c//dtd html 4.0 frameset//",
    "-//w3c//dtd html 4.0 transitional//",
    "-//w3c//dtd html experimental 19960712//",
    "-//w3c//dtd html experimental 970421//",
    "-//w3c//dtd w3 html//",
    "-//w3o//dtd w3 html 3.0//",
    "-//webtechs//dtd mozilla html 2.0//",
    "-//webtechs//dtd mozilla html//",
];

const QUIRKY_PUBLIC_MATCHES: &[&str] = &[
    "-//w3o//dtd w3 html strict 3.0//en//",
    "-/w3c/dtd html 4.0 transitional/en",
    "html",
];

const QUIRKY_SYSTEM_MATCH: &str = "http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd";

const LIMITED_QUIRKS_PUBLIC_PREFIXES: &[&str] = &[
    "-//w3c//dtd xhtml 1.0 frameset//",
    "-//w3c//dtd xhtml 1.0 transitional//",
];

/// Prefixes that are full quirks without a system id, limited quirks with one.
const HTML401_PUBLIC_PREFIXES: &[&str] = &[
    "-//w3c//dtd html 4.01 frameset//",
    "-//w3c//dtd html 4.01 transitional//",
];

/// Classify a DOCTYPE token. `iframe_srcdoc` documents are always no-quirks.
pub(crate) fn quirks_mode_for(doctype: &DoctypeToken, iframe_srcdoc: bool) -> QuirksMode {
    if iframe_srcdoc {
        return QuirksMode::NoQuirks;
    }
    if doctype.force_quirks || doctype.name.as_deref() != Some("html") {
        return QuirksMode::Quirks;
    }
    let public = doctype.public_id.as_deref().map(str::to_ascii_lowercase);
    let system = doctype.system_id.as_deref().map(str::to_ascii_lowercase);

    if let Some(public) = &public {
        if QUIRKY_PUBLIC_MATCHES.contains(&public.as_str())
            || QUIRKY_PUBLIC_PREFIXES.iter().any(|p| public.starts_with(p))
        {
            return QuirksMode::Quirks;
        }
        if HTML401_PUBLIC_PREFIXES.iter().any(|p| public.starts_with(p)) {
            return if system.is_some() {
                QuirksMode::LimitedQuirks
            } else {
                QuirksMode::Quirks
            };
        }
        if LIMITED_QUIRKS_PUBLIC_PREFIXES
            .iter()
            .any(|p| public.starts_with(p))
        {
            return QuirksMode::LimitedQuirks;
        }
    }
    if system.as_deref() == Some(QUIRKY_SYSTEM_MATCH) {
        return QuirksMode::Quirks;
    }
    QuirksMode::NoQuirks
}

#[cfg(test)]
mod tests {
    use super::quirks_mode_for;
    use crate::dom::QuirksMode;
    use crate::tokenizer::DoctypeToken;

    fn doctype(name: &str, public: Option<&str>, system: Option<&str>) -> DoctypeToken {
        DoctypeToken {
            name: Some(name.to_string()),
            public_id: public.map(str::to_string),
            system_id: system.map(str::to_string),
            force_quirks: false,
        }
    }

    #[test]
    fn html5_doctype_is_no_quirks() {
        assert_eq!(
            quirks_mode_for(&doctype("html", None, None), false),
            QuirksMode::NoQuirks
        );
    }

    #[test]
    fn frameset_401_without_system_id_is_quirks_with_is_limited() {
        let public = Some("-//W3C//DTD HTML 4.01 Frameset//EN");
        assert_eq!(
            quirks_mode_for(&doctype("html", public, None), false),
            QuirksMode::Quirks
        );
        assert_eq!(
            quirks_mode_for(&doctype("html", public, Some("sys")), false),
            QuirksMode::LimitedQuirks
        );
    }

    #[test]
    fn legacy_public_ids_are_quirks() {
        assert_eq!(
            quirks_mode_for(&doctype("html", Some("HTML"), None), false),
            QuirksMode::Quirks
        );
        assert_eq!(
            quirks_mode_for(
                &doctype("html", Some("-//IETF//DTD HTML 2.0//EN"), None),
                false
            ),
            QuirksMode::Quirks
        );
    }

    #[test]
    fn xhtml_transitional_is_limited_quirks() {
        assert_eq!(
            quirks_mode_for(
                &doctype("html", Some("-//W3C//DTD XHTML 1.0 Transitional//EN"), None),
                false
            ),
            QuirksMode::LimitedQuirks
        );
    }

    #[test]
    fn srcdoc_suppresses_quirks_entirely() {
        let mut d = doctype("not-html", None, None);
        d.force_quirks = true;
        assert_eq!(quirks_mode_for(&d, true), QuirksMode::NoQuirks);
    }

    #[test]
    fn non_html_name_or_force_quirks_flag() {
        assert_eq!(
            quirks_mode_for(&doctype("xhtml", None, None), false),
            QuirksMode::Quirks
        );
        let mut d = doctype("html", None, None);
        d.force_quirks = true;
        assert_eq!(quirks_mode_for(&d, false), QuirksMode::Quirks);
    }
}
