use crate::{FragmentContext, ParseOpts, parse, serialize_test_format};

fn tree_of(input: &str) -> String {
    let result = parse(input, ParseOpts::default()).expect("non-strict parse is total");
    serialize_test_format(&result.dom)
}

fn fragment_of(input: &str, context: &str) -> String {
    let opts = ParseOpts {
        fragment_context: Some(FragmentContext {
            tag_name: context.to_string(),
            namespace: None,
        }),
        ..ParseOpts::default()
    };
    let result = parse(input, opts).expect("non-strict parse is total");
    serialize_test_format(&result.dom)
}

#[test]
fn minimal_document() {
    assert_eq!(
        tree_of("<html><head></head><body><p>Hello</p></body></html>"),
        "| <html>\n|   <head>\n|   <body>\n|     <p>\n|       \"Hello\""
    );
}

#[test]
fn missing_structure_is_synthesized() {
    assert_eq!(
        tree_of("Hello"),
        "| <html>\n|   <head>\n|   <body>\n|     \"Hello\""
    );
}

#[test]
fn doctype_and_quirks_mode() {
    let result = parse("<!DOCTYPE html><p>x", ParseOpts::default()).unwrap();
    assert_eq!(result.dom.quirks_mode, crate::QuirksMode::NoQuirks);
    let result = parse("<p>x", ParseOpts::default()).unwrap();
    assert_eq!(result.dom.quirks_mode, crate::QuirksMode::Quirks);
    assert!(tree_of("<!DOCTYPE html>x").starts_with("| <!DOCTYPE html>\n"));
}

#[test]
fn foster_parenting_moves_text_before_the_table() {
    assert_eq!(
        tree_of("<table>A<tr><td>B"),
        "| <html>\n|   <head>\n|   <body>\n|     \"A\"\n|     <table>\n|       <tbody>\n|         <tr>\n|           <td>\n|             \"B\""
    );
}

#[test]
fn table_whitespace_stays_inside_the_table() {
    assert_eq!(
        tree_of("<table> <tr></tr></table>"),
        "| <html>\n|   <head>\n|   <body>\n|     <table>\n|       \" \"\n|       <tbody>\n|         <tr>"
    );
}

#[test]
fn adoption_agency_splits_misnested_formatting() {
    assert_eq!(
        tree_of("<p>1<b>2<i>3</b>4</i>5"),
        "| <html>\n|   <head>\n|   <body>\n|     <p>\n|       \"1\"\n|       <b>\n|         \"2\"\n|         <i>\n|           \"3\"\n|       <i>\n|         \"4\"\n|       \"5\""
    );
}

#[test]
fn adoption_agency_with_furthest_block() {
    // The classic <b><p> case: the block is reparented, b is cloned into it.
    assert_eq!(
        tree_of("<b>1<p>2</b>3</p>"),
        "| <html>\n|   <head>\n|   <body>\n|     <b>\n|       \"1\"\n|     <p>\n|       <b>\n|         \"2\"\n|       \"3\""
    );
}

#[test]
fn template_content_is_a_separate_fragment() {
    assert_eq!(
        tree_of("<template><div>X</div></template>"),
        "| <html>\n|   <head>\n|     <template>\n|       content\n|         <div>\n|           \"X\"\n|   <body>"
    );
    let result = parse("<template><div>X</div></template>", ParseOpts::default()).unwrap();
    let dom = &result.dom;
    let template = crate::query_first(dom, "template").unwrap().unwrap();
    assert!(dom.children(template).is_empty());
    let contents = dom.template_contents(template).unwrap();
    assert_eq!(dom.children(contents).len(), 1);
}

#[test]
fn foreign_breakout_pops_back_to_html() {
    assert_eq!(
        tree_of("<svg><b>hi</b></svg>"),
        "| <html>\n|   <head>\n|   <body>\n|     <svg svg>\n|     <b>\n|       \"hi\""
    );
}

#[test]
fn svg_names_and_attributes_are_case_adjusted() {
    assert_eq!(
        tree_of("<svg><foreignobject></foreignobject></svg>"),
        "| <html>\n|   <head>\n|   <body>\n|     <svg svg>\n|       <svg foreignObject>"
    );
    let out = tree_of("<svg viewbox=\"0 0 1 1\" xlink:href=\"#a\"></svg>");
    assert!(out.contains("viewBox=\"0 0 1 1\""));
    assert!(out.contains("xlink href=\"#a\""));
}

#[test]
fn html_inside_svg_foreign_object_is_legal() {
    assert_eq!(
        tree_of("<svg><foreignObject><p>x</p></foreignObject></svg>"),
        "| <html>\n|   <head>\n|   <body>\n|     <svg svg>\n|       <svg foreignObject>\n|         <p>\n|           \"x\""
    );
}

#[test]
fn mathml_text_integration_point() {
    assert_eq!(
        tree_of("<math><mi><b>x</b></mi></math>"),
        "| <html>\n|   <head>\n|   <body>\n|     <math math>\n|       <math mi>\n|         <b>\n|           \"x\""
    );
}

#[test]
fn numeric_reference_remap_reaches_the_tree() {
    assert_eq!(
        tree_of("&#x80;"),
        "| <html>\n|   <head>\n|   <body>\n|     \"\u{20AC}\""
    );
}

#[test]
fn plaintext_swallows_the_rest() {
    assert_eq!(
        tree_of("<plaintext></plaintext>x"),
        "| <html>\n|   <head>\n|   <body>\n|     <plaintext>\n|       \"</plaintext>x\""
    );
}

#[test]
fn pre_drops_its_leading_newline() {
    assert_eq!(
        tree_of("<pre>\nA</pre>"),
        "| <html>\n|   <head>\n|   <body>\n|     <pre>\n|       \"A\""
    );
    // Only one newline is dropped; the second survives into the text node.
    assert_eq!(
        tree_of("<pre>\n\nA</pre>"),
        "| <html>\n|   <head>\n|   <body>\n|     <pre>\n|       \"\nA\""
    );
}

#[test]
fn fragment_parsing_seeds_from_the_context() {
    assert_eq!(fragment_of("<td>X</td>", "tr"), "| <td>\n|   \"X\"");
    assert_eq!(
        fragment_of("<tr><td>X</td></tr>", "tbody"),
        "| <tr>\n|   <td>\n|     \"X\""
    );
    assert_eq!(fragment_of("<li>a<li>b", "ul"), "| <li>\n|   \"a\"\n| <li>\n|   \"b\"");
}

#[test]
fn fragment_rawtext_contexts_set_the_tokenizer_state() {
    assert_eq!(fragment_of("x<b>y</b>", "title"), "| \"x<b>y</b>\"");
    assert_eq!(fragment_of("a&amp;b", "textarea"), "| \"a&b\"");
    assert_eq!(fragment_of("a&amp;b", "style"), "| \"a&amp;b\"");
}

#[test]
fn frameset_document() {
    assert_eq!(
        tree_of("<frameset><frame></frameset>"),
        "| <html>\n|   <head>\n|   <frameset>\n|     <frame>"
    );
}

#[test]
fn frameset_only_wins_while_frameset_ok() {
    // An explicit <body> flips frameset-ok off, so the frameset is ignored.
    assert_eq!(
        tree_of("<body><frameset>"),
        "| <html>\n|   <head>\n|   <body>"
    );
    assert_eq!(
        tree_of("<body>x<frameset>"),
        "| <html>\n|   <head>\n|   <body>\n|     \"x\""
    );
}

#[test]
fn selected_content_is_populated_at_finalization() {
    let input = "<select><selectedcontent></selectedcontent><option selected>B</option><option>A</option></select>";
    assert_eq!(
        tree_of(input),
        "| <html>\n|   <head>\n|   <body>\n|     <select>\n|       <selectedcontent>\n|         \"B\"\n|       <option>\n|         selected=\"\"\n|         \"B\"\n|       <option>\n|         \"A\""
    );
}

#[test]
fn selected_content_defaults_to_the_first_option() {
    let input =
        "<select><selectedcontent></selectedcontent><option>A</option><option>B</option></select>";
    let out = tree_of(input);
    assert!(out.contains("<selectedcontent>\n|         \"A\""), "{out}");
}

#[test]
fn misnested_tags_recover() {
    assert_eq!(
        tree_of("<b><i></b></i>"),
        "| <html>\n|   <head>\n|   <body>\n|     <b>\n|       <i>"
    );
}

#[test]
fn duplicate_body_start_tag_merges_attributes() {
    assert_eq!(
        tree_of("<body class=a><body class=b id=c>x"),
        "| <html>\n|   <head>\n|   <body>\n|     class=\"a\"\n|     id=\"c\"\n|     \"x\""
    );
}

#[test]
fn comments_land_where_the_modes_say() {
    // Before <head> exists a comment belongs to the html element; after the
    // document ends it belongs to the document.
    assert_eq!(
        tree_of("<!--a--><html><!--b--></html><!--c-->"),
        "| <!-- a -->\n| <html>\n|   <!-- b -->\n|   <head>\n|   <body>\n| <!-- c -->"
    );
    assert_eq!(
        tree_of("<p>x</p><!--tail-->"),
        "| <html>\n|   <head>\n|   <body>\n|     <p>\n|       \"x\"\n|     <!-- tail -->"
    );
}

#[test]
fn nested_tables_close_implicitly() {
    assert_eq!(
        tree_of("<table><table>"),
        "| <html>\n|   <head>\n|   <body>\n|     <table>\n|     <table>"
    );
}

#[test]
fn input_hidden_in_table_is_not_fostered() {
    let out = tree_of("<table><input type=hidden></table>");
    assert_eq!(
        out,
        "| <html>\n|   <head>\n|   <body>\n|     <table>\n|       <input>\n|         type=\"hidden\""
    );
}

#[test]
fn isindex_like_unknown_tags_nest_normally() {
    assert_eq!(
        tree_of("<x-widget><span>y</span></x-widget>"),
        "| <html>\n|   <head>\n|   <body>\n|     <x-widget>\n|       <span>\n|         \"y\""
    );
}

#[test]
fn parent_child_links_hold_after_adoption() {
    let result = parse(
        "<div><b>1<p>2</b>3</p></div><table>x<tr><td>y</td></tr></table>",
        ParseOpts::default(),
    )
    .unwrap();
    result.dom.assert_parent_links();
}
