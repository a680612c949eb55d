use super::*;
use crate::document::Document;
use crate::error::StoreError;

fn run(xml: &str, directives: Directives) -> Result<String, StoreError> {
    let mut doc = Document::parse(xml)?;
    apply(&mut doc, &directives)?;
    doc.to_xml(false)
}

#[test]
fn test_add_and_set() {
    let out = run(
        "<github/>",
        Directives::new().xpath("/github").add("test").set("hello, world"),
    )
    .unwrap();
    assert_eq!(out, "<github><test>hello, world</test></github>");
}

#[test]
fn test_cursor_starts_at_root() {
    let out = run("<github/>", Directives::new().add("a").attr("id", "1")).unwrap();
    assert_eq!(out, r#"<github><a id="1"/></github>"#);
}

#[test]
fn test_addif_reuses_existing_child() {
    let directives = Directives::new().addif("repo").set("x");
    let once = run("<github/>", directives.clone()).unwrap();
    let twice = run(&once, directives).unwrap();
    assert_eq!(twice, "<github><repo>x</repo></github>");
}

#[test]
fn test_add_applies_to_every_cursor_node() {
    let out = run(
        "<github><r/><r/></github>",
        Directives::new().xpath("/github/r").add("name").set("n"),
    )
    .unwrap();
    assert_eq!(
        out,
        "<github><r><name>n</name></r><r><name>n</name></r></github>"
    );
}

#[test]
fn test_relative_xpath_from_cursor() {
    let out = run(
        "<github><a><b/></a><b/></github>",
        Directives::new().xpath("/github/a").xpath("b").set("inner"),
    )
    .unwrap();
    assert_eq!(out, "<github><a><b>inner</b></a><b/></github>");
}

#[test]
fn test_up_and_remove() {
    let out = run(
        "<github><old/><keep/></github>",
        Directives::new()
            .xpath("/github/old")
            .remove()
            .add("new")
            .up()
            .attr("v", "2"),
    )
    .unwrap();
    assert_eq!(out, r#"<github v="2"><keep/><new/></github>"#);
}

#[test]
fn test_up_from_root_fails() {
    let err = run("<github/>", Directives::new().up()).unwrap_err();
    assert!(matches!(err, StoreError::DirectiveError(_)));
}

#[test]
fn test_remove_root_fails() {
    let err = run("<github/>", Directives::new().remove()).unwrap_err();
    assert!(matches!(err, StoreError::DirectiveError(_)));
}

#[test]
fn test_strict() {
    let xml = "<github><r/><r/></github>";
    assert!(run(xml, Directives::new().xpath("//r").strict(2)).is_ok());

    let err = run(xml, Directives::new().xpath("//r").strict(1)).unwrap_err();
    assert!(err.to_string().contains("#2"));
}

#[test]
fn test_push_pop() {
    let out = run(
        "<github/>",
        Directives::new()
            .push_cursor()
            .add("a")
            .add("b")
            .pop_cursor()
            .add("c"),
    )
    .unwrap();
    assert_eq!(out, "<github><a><b/></a><c/></github>");

    let err = run("<github/>", Directives::new().pop_cursor()).unwrap_err();
    assert!(matches!(err, StoreError::DirectiveError(_)));
}

#[test]
fn test_xpath_must_select_elements() {
    let err = run(
        "<github id=\"1\"/>",
        Directives::new().xpath("/github/@id"),
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::DirectiveError(_)));
}

#[test]
fn test_invalid_names_rejected() {
    for directives in [
        Directives::new().add("bad name"),
        Directives::new().addif(""),
        Directives::new().attr("1st", "x"),
    ] {
        let err = run("<github/>", directives).unwrap_err();
        assert!(matches!(err, StoreError::DirectiveError(_)));
    }
}

#[test]
fn test_malformed_xpath_is_directive_error() {
    let err = run("<github/>", Directives::new().xpath("/github[")).unwrap_err();
    assert!(matches!(err, StoreError::DirectiveError(_)));
}

#[test]
fn test_parse_text_syntax() {
    let parsed: Directives = r#"xpath "/github"; Add 'test'; ATTR "id", '1'; SET "a \"b\"\n"; UP; STRICT 1"#
        .parse()
        .unwrap();

    assert_eq!(
        parsed,
        Directives::new()
            .xpath("/github")
            .add("test")
            .attr("id", "1")
            .set("a \"b\"\n")
            .up()
            .strict(1)
    );
}

#[test]
fn test_parse_empty_is_empty_list() {
    let parsed: Directives = "  \n ".parse().unwrap();
    assert!(parsed.is_empty());
}

#[test]
fn test_parse_rejects_malformed_text() {
    for text in [
        "FROB 'x';",
        "ADD;",
        "ADD 'a', 'b';",
        "UP 'x';",
        "ADD 'unterminated",
        "ADD 'a' ADD 'b'",
        "SET 'bad \\q escape'",
        "STRICT 'many'",
        "ADD test",
    ] {
        let err = text.parse::<Directives>().unwrap_err();
        assert!(
            matches!(err, StoreError::DirectiveError(_)),
            "expected directive error for {:?}",
            text
        );
    }
}

#[test]
fn test_display_parses_back() {
    let directives = Directives::new()
        .xpath("//repo[@id='1']")
        .addif("name")
        .set("quote \" slash \\ tab \t")
        .attr("k", "v")
        .strict(1)
        .push_cursor()
        .pop_cursor()
        .remove();

    let text = directives.to_string();
    assert!(text.starts_with("XPATH \"//repo[@id='1']\"; ADDIF \"name\";"));
    assert_eq!(text.parse::<Directives>().unwrap(), directives);
}
