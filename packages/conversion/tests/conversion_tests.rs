//! Integration tests for conversion crate

use quire_conversion::features::{Bold, List, ListSeparator, Paragraph};
use quire_conversion::{ConversionError, ConversionResult, Editor, Plugin, DOWNCAST, EDITING_DOWNCAST, UPCAST};
use quire_editor::EditorConfig;
use quire_model::{Position, Range, SchemaItemDefinition, Selection};

fn editor(markup: &str) -> Editor {
    let mut editor = Editor::with_plugins(EditorConfig::default(), &[&Paragraph, &Bold, &List, &ListSeparator]).unwrap();
    editor.create_root("main").unwrap();
    editor.set_data("main", markup).unwrap();
    editor
}

fn pos(path: &[usize]) -> Position {
    Position::new("main", path.to_vec())
}

struct Alignment;

impl Plugin for Alignment {
    fn name(&self) -> &'static str {
        "Alignment"
    }

    fn init(&self, editor: &mut Editor) -> ConversionResult<()> {
        editor
            .document
            .schema_mut()
            .extend("paragraph", SchemaItemDefinition::new().allow_attribute("alignment"));
        editor
            .conversion
            .for_upcast(UPCAST)?
            .attribute_to_attribute("data-align", "alignment");
        editor
            .conversion
            .for_downcast(DOWNCAST)?
            .attribute_to_attribute("alignment", "data-align");
        Ok(())
    }
}

#[test]
fn test_separated_lists_round_trip() {
    let editor = editor("<ol><p>A</p></ol><ol><p>B</p></ol>");

    assert_eq!(
        editor.document.get_content("main").unwrap(),
        "<numberedList><paragraph>A</paragraph></numberedList><listSeparator></listSeparator><numberedList><paragraph>B</paragraph></numberedList>"
    );
    assert_eq!(editor.get_data("main").unwrap(), "<ol><p>A</p></ol><ol><p>B</p></ol>");
}

#[test]
fn test_separator_is_hidden_in_editing_view() {
    let editor = editor("<ul><p>A</p></ul><ul><p>B</p></ul>");

    assert_eq!(
        editor.editing_data("main").unwrap(),
        r#"<ul><p>A</p></ul><div class="ck-list-separator ck-hidden"></div><ul><p>B</p></ul>"#
    );
}

#[test]
fn test_mixed_lists_are_not_separated() {
    let editor = editor("<ol><p>A</p></ol><ul><p>B</p></ul>");

    assert_eq!(
        editor.editing_data("main").unwrap(),
        "<ol><p>A</p></ol><ul><p>B</p></ul>"
    );
}

#[test]
fn test_unknown_elements_and_loose_text() {
    let editor = editor("loose<section><p>foo</p></section>");

    assert_eq!(editor.document.get_content("main").unwrap(), "<paragraph>foo</paragraph>");
    assert_eq!(editor.get_data("main").unwrap(), "<p>foo</p>");
}

#[test]
fn test_bold_text() {
    let editor = editor("<p>a<strong>b</strong>c</p><p><b>d</b></p>");

    assert_eq!(
        editor.document.get_content("main").unwrap(),
        r#"<paragraph>a<$text bold="true">b</$text>c</paragraph><paragraph><$text bold="true">d</$text></paragraph>"#
    );
    assert_eq!(
        editor.get_data("main").unwrap(),
        "<p>a<strong>b</strong>c</p><p><strong>d</strong></p>"
    );
}

#[test]
fn test_whitespace_between_inline_elements_is_content() {
    let editor = editor("<p><strong>a</strong> <strong>b</strong></p>\n<p>c</p>");

    assert_eq!(
        editor.document.get_content("main").unwrap(),
        r#"<paragraph><$text bold="true">a</$text> <$text bold="true">b</$text></paragraph><paragraph>c</paragraph>"#
    );
    assert_eq!(
        editor.get_data("main").unwrap(),
        "<p><strong>a</strong> <strong>b</strong></p><p>c</p>"
    );
}

#[test]
fn test_editing_view_upcasts_to_the_same_model() {
    let source = editor("<ol><p>a<strong>b</strong></p><p>c</p></ol><p>d</p><ul><p>e</p></ul>");
    let editing = source.editing_data("main").unwrap();

    let copy = editor(&editing);
    assert_eq!(
        copy.document.get_content("main").unwrap(),
        source.document.get_content("main").unwrap()
    );
}

#[test]
fn test_element_attributes() {
    let mut editor = editor("");
    editor.add_plugin(&Alignment).unwrap();
    editor.set_data("main", r#"<p data-align="right">x</p>"#).unwrap();

    assert_eq!(
        editor.document.get_content("main").unwrap(),
        r#"<paragraph alignment="right">x</paragraph>"#
    );
    assert_eq!(editor.get_data("main").unwrap(), r#"<p data-align="right">x</p>"#);
}

#[test]
fn test_sync_rebuilds_only_changed_parents() {
    let mut editor = editor("<p>foo</p><p>bar</p>");
    let root = editor.document.tree().root("main").unwrap();
    let first = root.element_at_offset(0).unwrap().id();
    let first_view = editor.editing.mapper.to_view_element(first).unwrap();

    editor
        .change(|writer| writer.insert_text("!", &pos(&[1, 3]), None))
        .unwrap();

    assert_eq!(editor.editing_data("main").unwrap(), "<p>foo</p><p>bar!</p>");
    assert_eq!(editor.editing.mapper.to_view_element(first), Some(first_view));

    assert!(editor.undo().unwrap());
    assert_eq!(editor.editing_data("main").unwrap(), "<p>foo</p><p>bar</p>");
    assert!(editor.redo().unwrap());
    assert_eq!(editor.editing_data("main").unwrap(), "<p>foo</p><p>bar!</p>");
}

#[test]
fn test_typing_at_block_start_updates_view() {
    let mut editor = editor("<p>foo</p><p>bar</p>");

    editor
        .change(|writer| writer.insert_text("X", &pos(&[1, 0]), None))
        .unwrap();
    assert_eq!(editor.editing_data("main").unwrap(), "<p>foo</p><p>Xbar</p>");

    editor
        .change(|writer| writer.insert_text("Y", &pos(&[0, 0]), None))
        .unwrap();
    assert_eq!(editor.editing_data("main").unwrap(), "<p>Yfoo</p><p>Xbar</p>");

    assert!(editor.undo().unwrap());
    assert_eq!(editor.editing_data("main").unwrap(), "<p>foo</p><p>Xbar</p>");
}

#[test]
fn test_undoing_merged_deletion_updates_view() {
    let mut editor = Editor::with_plugins(
        EditorConfig {
            merge_blocks_on_delete: true,
            ..EditorConfig::default()
        },
        &[&Paragraph],
    )
    .unwrap();
    editor.create_root("main").unwrap();
    editor.set_data("main", "<p>foo</p><p>bar</p>").unwrap();
    let range = Range::new(pos(&[0, 1]), pos(&[1, 2])).unwrap();
    editor
        .document
        .set_selection(Selection::from_range(range, false))
        .unwrap();

    editor.delete_selection().unwrap();
    assert_eq!(editor.editing_data("main").unwrap(), "<p>fr</p>");

    assert!(editor.undo().unwrap());
    assert_eq!(editor.document.get_content("main").unwrap(), "<paragraph>foo</paragraph><paragraph>bar</paragraph>");
    assert_eq!(editor.editing_data("main").unwrap(), "<p>foo</p><p>bar</p>");
}

#[test]
fn test_delete_selection_updates_view() {
    let mut editor = editor("<p>foo</p><p>bar</p>");
    let range = Range::new(pos(&[0, 1]), pos(&[1, 2])).unwrap();
    editor
        .document
        .set_selection(Selection::from_range(range, false))
        .unwrap();

    editor.delete_selection().unwrap();
    assert_eq!(editor.editing_data("main").unwrap(), "<p>f</p><p>r</p>");

    assert!(editor.undo().unwrap());
    assert_eq!(editor.editing_data("main").unwrap(), "<p>foo</p><p>bar</p>");
}

#[test]
fn test_markers_render_as_ui_elements() {
    let mut editor = editor("<p>foobar</p>");
    editor
        .conversion
        .for_downcast(EDITING_DOWNCAST)
        .unwrap()
        .marker_to_element("comment", "span");

    editor
        .change(|writer| writer.add_marker("comment:1", Range::flat("main", &[0], 1, 3)?))
        .unwrap();
    assert_eq!(
        editor.editing_data("main").unwrap(),
        r#"<p>f<span data-marker="comment:1"></span>oo<span data-marker="comment:1"></span>bar</p>"#
    );
    assert_eq!(editor.get_data("main").unwrap(), "<p>foobar</p>");

    editor.change(|writer| writer.remove_marker("comment:1")).unwrap();
    assert_eq!(editor.editing_data("main").unwrap(), "<p>foobar</p>");
}

#[test]
fn test_unknown_pipeline() {
    let mut editor = editor("");
    assert!(matches!(
        editor.conversion.for_downcast("print"),
        Err(ConversionError::UnknownPipeline(_))
    ));
}

#[test]
fn test_plugins_load_once() {
    let mut editor = editor("");
    editor.add_plugin(&Paragraph).unwrap();
    assert!(editor.has_plugin("Paragraph"));
    assert!(!editor.has_plugin("Alignment"));
}
