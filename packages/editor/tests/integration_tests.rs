//! Integration tests for editor crate

use quire_common::Priority;
use quire_editor::{
    transform, BatchType, Composer, Delta, DeltaKind, DeleteOptions, Document, EditSession, ModifySelectionOptions,
    Operation, SelectionUnit,
};
use quire_model::{Direction, Position, Range, Schema, SchemaItemDefinition, Text};

fn schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .register("paragraph", SchemaItemDefinition::new().inherit_all_from("$block"))
        .unwrap();
    schema
        .register("blockQuote", SchemaItemDefinition::new().allow_where("$block").allow_content_of("$root"))
        .unwrap();
    schema
        .register("image", SchemaItemDefinition::new().allow_where("$block").object())
        .unwrap();
    schema
}

fn document(markup: &str) -> Document {
    let mut doc = Document::new(schema());
    doc.create_root("main", "$root").unwrap();
    doc.set_data("main", markup).unwrap();
    doc
}

fn pos(path: &[usize]) -> Position {
    Position::new("main", path.to_vec())
}

fn apply(doc: &mut Document, operations: Vec<Operation>) {
    let mut batch = doc.batch(BatchType::Transparent);
    for operation in operations {
        let kind = DeltaKind::for_operation(&operation);
        doc.apply_delta(&mut batch, Delta::with_operations(kind, vec![operation]))
            .unwrap();
    }
    doc.commit(batch);
}

#[test]
fn test_delete_across_blocks_without_merge() {
    let mut doc = document("<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>");
    Composer::new()
        .delete_selection(&mut doc, DeleteOptions::default())
        .unwrap();
    assert_eq!(
        doc.get_data("main").unwrap(),
        "<paragraph>f[]</paragraph><paragraph>r</paragraph>"
    );
}

#[test]
fn test_delete_across_blocks_with_merge() {
    let mut doc = document("<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>");
    Composer::new()
        .delete_selection(&mut doc, DeleteOptions { merge: true })
        .unwrap();
    assert_eq!(doc.get_data("main").unwrap(), "<paragraph>f[]r</paragraph>");

    assert!(doc.undo().unwrap());
    assert_eq!(
        doc.get_content("main").unwrap(),
        "<paragraph>foo</paragraph><paragraph>bar</paragraph>"
    );
}

#[test]
fn test_delete_merges_nested_branches() {
    let mut doc = document(
        "<blockQuote><paragraph>x[x</paragraph></blockQuote><blockQuote><paragraph>y]y</paragraph></blockQuote>",
    );
    Composer::new()
        .delete_selection(&mut doc, DeleteOptions { merge: true })
        .unwrap();
    assert_eq!(
        doc.get_data("main").unwrap(),
        "<blockQuote><paragraph>x[]y</paragraph></blockQuote>"
    );
}

#[test]
fn test_delete_collapsed_selection_does_nothing() {
    let mut doc = document("<paragraph>fo[]o</paragraph>");
    Composer::new()
        .delete_selection(&mut doc, DeleteOptions::default())
        .unwrap();
    assert_eq!(doc.get_data("main").unwrap(), "<paragraph>fo[]o</paragraph>");
    assert!(!doc.can_undo());
}

#[test]
fn test_prevented_deletion_leaves_document_alone() {
    let mut doc = document("<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>");
    let mut composer = Composer::new();
    composer.on_delete_contents(Priority::High, |info, _doc, _event| {
        info.prevent_default();
        Ok(())
    });

    composer
        .delete_selection(&mut doc, DeleteOptions { merge: true })
        .unwrap();
    assert_eq!(
        doc.get_data("main").unwrap(),
        "<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>"
    );
}

#[test]
fn test_listener_can_change_delete_options() {
    let mut doc = document("<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>");
    let mut composer = Composer::new();
    composer.on_delete_contents(Priority::High, |_info, _doc, event| {
        event.options.merge = true;
        Ok(())
    });

    composer
        .delete_selection(&mut doc, DeleteOptions::default())
        .unwrap();
    assert_eq!(doc.get_data("main").unwrap(), "<paragraph>f[]r</paragraph>");
}

#[test]
fn test_modify_selection_backward() {
    let mut doc = document("<paragraph>foo[]bar</paragraph>");
    Composer::new()
        .modify_document_selection(&mut doc, ModifySelectionOptions::new(Direction::Backward))
        .unwrap();
    assert_eq!(doc.get_data("main").unwrap(), "<paragraph>fo[o]bar</paragraph>");
    assert!(doc.selection().is_backward());
}

#[test]
fn test_modify_selection_forward_into_next_block() {
    let mut doc = document("<paragraph>foo[]</paragraph><paragraph>bar</paragraph>");
    Composer::new()
        .modify_document_selection(&mut doc, ModifySelectionOptions::new(Direction::Forward))
        .unwrap();
    assert_eq!(
        doc.get_data("main").unwrap(),
        "<paragraph>foo[</paragraph><paragraph>]bar</paragraph>"
    );
}

#[test]
fn test_modify_selection_skips_over_object() {
    let mut doc = document("<paragraph>foo[]</paragraph><image></image><paragraph>bar</paragraph>");
    Composer::new()
        .modify_document_selection(&mut doc, ModifySelectionOptions::new(Direction::Forward))
        .unwrap();
    assert_eq!(doc.selection().focus(), Some(&pos(&[2])));
}

#[test]
fn test_modify_selection_by_word() {
    let mut doc = document("<paragraph>[]foo bar</paragraph>");
    let options = ModifySelectionOptions {
        direction: Direction::Forward,
        unit: SelectionUnit::Word,
    };
    let composer = Composer::new();
    composer.modify_document_selection(&mut doc, options).unwrap();
    composer.modify_document_selection(&mut doc, options).unwrap();
    assert_eq!(doc.get_data("main").unwrap(), "<paragraph>[foo bar]</paragraph>");
}

#[test]
fn test_concurrent_operations_converge() {
    let initial = "<paragraph>foobar</paragraph><paragraph>baz</paragraph>";
    let a = Operation::Insert {
        position: pos(&[0, 3]),
        nodes: vec![Text::new("XY").into()],
    };
    let b = Operation::Remove {
        position: pos(&[0, 1]),
        nodes: vec![Text::new("ooba").into()],
    };

    let mut left = document(initial);
    apply(&mut left, vec![a.clone()]);
    apply(&mut left, transform(&b, &a, false));

    let mut right = document(initial);
    apply(&mut right, vec![b.clone()]);
    apply(&mut right, transform(&a, &b, true));

    assert_eq!(left.get_content("main").unwrap(), right.get_content("main").unwrap());
    assert_eq!(left.get_content("main").unwrap(), "<paragraph>fXYr</paragraph><paragraph>baz</paragraph>");
}

#[test]
fn test_concurrent_split_and_insert_converge() {
    let initial = "<paragraph>foobar</paragraph>";
    let split = Operation::Split {
        position: pos(&[0, 3]),
        name: "paragraph".to_string(),
        attributes: Default::default(),
    };
    let insert = Operation::Insert {
        position: pos(&[0, 5]),
        nodes: vec![Text::new("!").into()],
    };

    let mut left = document(initial);
    apply(&mut left, vec![split.clone()]);
    apply(&mut left, transform(&insert, &split, false));

    let mut right = document(initial);
    apply(&mut right, vec![insert.clone()]);
    apply(&mut right, transform(&split, &insert, true));

    assert_eq!(
        left.get_content("main").unwrap(),
        "<paragraph>foo</paragraph><paragraph>ba!r</paragraph>"
    );
    assert_eq!(left.get_content("main").unwrap(), right.get_content("main").unwrap());
}

#[test]
fn test_undo_after_remote_change() {
    let mut doc = document("<paragraph>foo</paragraph>");
    doc.change(|writer| writer.insert_text("x", &pos(&[0, 0]), None))
        .unwrap();

    apply(
        &mut doc,
        vec![Operation::Insert {
            position: pos(&[0, 4]),
            nodes: vec![Text::new("!").into()],
        }],
    );
    assert_eq!(doc.get_content("main").unwrap(), "<paragraph>xfoo!</paragraph>");

    assert!(doc.undo().unwrap());
    assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foo!</paragraph>");
    assert!(doc.redo().unwrap());
    assert_eq!(doc.get_content("main").unwrap(), "<paragraph>xfoo!</paragraph>");
}

#[test]
fn test_undo_restores_marker() {
    let mut doc = document("<paragraph>foobar</paragraph>");
    doc.change(|writer| writer.add_marker("comment:1", Range::flat("main", &[0], 1, 4)?))
        .unwrap();
    doc.change(|writer| writer.remove(&Range::flat("main", &[0], 0, 6)?))
        .unwrap();

    assert!(doc.undo().unwrap());
    assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foobar</paragraph>");
    assert!(doc.markers().has("comment:1"));
}

#[test]
fn test_sessions_converge_through_server_order() {
    let initial = "<paragraph>foo</paragraph>";
    let mut alice = EditSession::new("alice", document(initial));
    let mut bob = EditSession::new("bob", document(initial));

    alice
        .apply_local(|writer| writer.insert_text("A", &pos(&[0, 0]), None))
        .unwrap();
    bob.apply_local(|writer| writer.insert_text("B", &pos(&[0, 3]), None))
        .unwrap();

    // Server orders alice first.
    let alice_ops = alice.pending[0].operations.clone();
    bob.receive_remote(&alice_ops).unwrap();
    let bob_ops = bob.pending[0].operations.clone();
    let alice_id = alice.pending[0].id.clone();
    alice.confirm(&alice_id);
    alice.receive_remote(&bob_ops).unwrap();

    assert_eq!(alice.document.get_content("main").unwrap(), "<paragraph>AfooB</paragraph>");
    assert_eq!(
        alice.document.get_content("main").unwrap(),
        bob.document.get_content("main").unwrap()
    );
}
