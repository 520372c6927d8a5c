//! Foreign (SVG/MathML) content support: tag/attribute adjustment tables and
//! integration points.

use crate::dom::{DomTree, Namespace, NodeId};
use crate::tokenizer::Tag;

/// SVG tag names that re-acquire their camelCase form.
pub(crate) fn adjust_svg_tag_name(name: &str) -> &str {
    match name {
        "altglyph" => "altGlyph",
        "altglyphdef" => "altGlyphDef",
        "altglyphitem" => "altGlyphItem",
        "animatecolor" => "animateColor",
        "animatemotion" => "animateMotion",
        "animatetransform" => "animateTransform",
        "clippath" => "clipPath",
        "feblend" => "feBlend",
        "fecolormatrix" => "feColorMatrix",
        "fecomponenttransfer" => "feComponentTransfer",
        "fecomposite" => "feComposite",
        "feconvolvematrix" => "feConvolveMatrix",
        "fediffuselighting" => "feDiffuseLighting",
        "fedisplacementmap" => "feDisplacementMap",
        "fedistantlight" => "feDistantLight",
        "fedropshadow" => "feDropShadow",
        "feflood" => "feFlood",
        "fefunca" => "feFuncA",
        "fefuncb" => "feFuncB",
        "fefuncg" => "feFuncG",
        "fefuncr" => "feFuncR",
        "fegaussianblur" => "feGaussianBlur",
        "feimage" => "feImage",
        "femerge" => "feMerge",
        "femergenode" => "feMergeNode",
        "femorphology" => "feMorphology",
        "feoffset" => "feOffset",
        "fepointlight" => "fePointLight",
        "fespecularlighting" => "feSpecularLighting",
        "fespotlight" => "feSpotLight",
        "fetile" => "feTile",
        "feturbulence" => "feTurbulence",
        "foreignobject" => "foreignObject",
        "glyphref" => "glyphRef",
        "lineargradient" => "linearGradient",
        "radialgradient" => "radialGradient",
        "textpath" => "textPath",
        other => other,
    }
}

/// SVG attribute names that re-acquire their camelCase form.
fn adjust_svg_attr_name(name: &str) -> &str {
    match name {
        "attributename" => "attributeName",
        "attributetype" => "attributeType",
        "basefrequency" => "baseFrequency",
        "baseprofile" => "baseProfile",
        "calcmode" => "calcMode",
        "clippathunits" => "clipPathUnits",
        "diffuseconstant" => "diffuseConstant",
        "edgemode" => "edgeMode",
        "filterunits" => "filterUnits",
        "glyphref" => "glyphRef",
        "gradienttransform" => "gradientTransform",
        "gradientunits" => "gradientUnits",
        "kernelmatrix" => "kernelMatrix",
        "kernelunitlength" => "kernelUnitLength",
        "keypoints" => "keyPoints",
        "keysplines" => "keySplines",
        "keytimes" => "keyTimes",
        "lengthadjust" => "lengthAdjust",
        "limitingconeangle" => "limitingConeAngle",
        "markerheight" => "markerHeight",
        "markerunits" => "markerUnits",
        "markerwidth" => "markerWidth",
        "maskcontentunits" => "maskContentUnits",
        "maskunits" => "maskUnits",
        "numoctaves" => "numOctaves",
        "pathlength" => "pathLength",
        "patterncontentunits" => "patternContentUnits",
        "patterntransform" => "patternTransform",
        "patternunits" => "patternUnits",
        "pointsatx" => "pointsAtX",
        "pointsaty" => "pointsAtY",
        "pointsatz" => "pointsAtZ",
        "preservealpha" => "preserveAlpha",
        "preserveaspectratio" => "preserveAspectRatio",
        "primitiveunits" => "primitiveUnits",
        "refx" => "refX",
        "refy" => "refY",
        "repeatcount" => "repeatCount",
        "repeatdur" => "repeatDur",
        "requiredextensions" => "requiredExtensions",
        "requiredfeatures" => "requiredFeatures",
        "specularconstant" => "specularConstant",
        "specularexponent" => "specularExponent",
        "spreadmethod" => "spreadMethod",
        "startoffset" => "startOffset",
        "stddeviation" => "stdDeviation",
        "stitchtiles" => "stitchTiles",
        "surfacescale" => "surfaceScale",
        "systemlanguage" => "systemLanguage",
        "tablevalues" => "tableValues",
        "targetx" => "targetX",
        "targety" => "targetY",
        "textlength" => "textLength",
        "viewbox" => "viewBox",
        "viewtarget" => "viewTarget",
        "xchannelselector" => "xChannelSelector",
        "ychannelselector" => "yChannelSelector",
        "zoomandpan" => "zoomAndPan",
        other => other,
    }
}

pub(crate) fn adjust_svg_attributes(tag: &mut Tag) {
    for attr in &mut tag.attrs {
        let adjusted = adjust_svg_attr_name(&attr.name);
        if adjusted != attr.name {
            attr.name = adjusted.to_string();
        }
    }
}

pub(crate) fn adjust_mathml_attributes(tag: &mut Tag) {
    for attr in &mut tag.attrs {
        if attr.name == "definitionurl" {
            attr.name = "definitionURL".to_string();
        }
    }
}

/// Namespaced attributes keep their prefixed form (`xlink:href`); the test
/// serializer renders the prefix with a space.
pub(crate) fn adjust_foreign_attributes(tag: &mut Tag) {
    for attr in &mut tag.attrs {
        let adjusted = match attr.name.as_str() {
            "xlink:actuate" | "xlink:arcrole" | "xlink:href" | "xlink:role" | "xlink:show"
            | "xlink:title" | "xlink:type" | "xml:lang" | "xml:space" | "xmlns"
            | "xmlns:xlink" => attr.name.clone(),
            _ => continue,
        };
        attr.name = adjusted;
    }
}

/// MathML text integration points: HTML (and some foreign) content is legal
/// directly inside these.
pub(crate) fn is_mathml_text_integration_point(tree: &DomTree, node: NodeId) -> bool {
    tree.as_element(node).is_some_and(|e| {
        e.namespace == Namespace::MathMl
            && matches!(e.name.as_str(), "mi" | "mo" | "mn" | "ms" | "mtext")
    })
}

/// HTML integration points: `annotation-xml` with an HTML encoding, and the
/// SVG embedding elements.
pub(crate) fn is_html_integration_point(tree: &DomTree, node: NodeId) -> bool {
    let Some(element) = tree.as_element(node) else {
        return false;
    };
    match element.namespace {
        Namespace::MathMl => {
            element.name == "annotation-xml"
                && tree.attr(node, "encoding").is_some_and(|encoding| {
                    encoding.eq_ignore_ascii_case("text/html")
                        || encoding.eq_ignore_ascii_case("application/xhtml+xml")
                })
        }
        Namespace::Svg => matches!(element.name.as_str(), "foreignObject" | "desc" | "title"),
        Namespace::Html => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Attribute;

    #[test]
    fn svg_tag_and_attribute_case_restoration() {
        assert_eq!(adjust_svg_tag_name("foreignobject"), "foreignObject");
        assert_eq!(adjust_svg_tag_name("fegaussianblur"), "feGaussianBlur");
        assert_eq!(adjust_svg_tag_name("circle"), "circle");

        let mut tag = Tag::named("svg");
        tag.attrs.push(Attribute {
            name: "viewbox".to_string(),
            value: "0 0 1 1".to_string(),
        });
        adjust_svg_attributes(&mut tag);
        assert_eq!(tag.attrs[0].name, "viewBox");
    }

    #[test]
    fn mathml_definitionurl_adjustment() {
        let mut tag = Tag::named("math");
        tag.attrs.push(Attribute {
            name: "definitionurl".to_string(),
            value: "x".to_string(),
        });
        adjust_mathml_attributes(&mut tag);
        assert_eq!(tag.attrs[0].name, "definitionURL");
    }

    #[test]
    fn annotation_xml_encoding_gates_the_integration_point() {
        let mut tree = DomTree::new_document();
        let yes = tree.create_element(
            "annotation-xml",
            Namespace::MathMl,
            vec![("encoding".to_string(), "Text/HTML".to_string())],
        );
        let no = tree.create_element(
            "annotation-xml",
            Namespace::MathMl,
            vec![("encoding".to_string(), "image/png".to_string())],
        );
        assert!(is_html_integration_point(&tree, yes));
        assert!(!is_html_integration_point(&tree, no));
    }
}
