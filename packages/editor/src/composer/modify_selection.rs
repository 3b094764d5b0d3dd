//! Default `modifySelection` behavior: move the focus by one unit, stepping
//! into and out of elements the way a caret would.

use quire_common::EventInfo;
use quire_model::{Direction, Position, Schema, StepKind, Tree, TreeWalker, WalkerItem, WalkerOptions, WalkerValue};
use unicode_segmentation::UnicodeSegmentation;

use super::ModifySelectionEvent;
use crate::config::SelectionUnit;
use crate::document::Document;
use crate::errors::EditorResult;

enum Step {
    Extend(Position),
    Continue,
    Stop,
}

pub(super) fn modify_selection(_info: &mut EventInfo, doc: &mut Document, event: &mut ModifySelectionEvent) -> EditorResult<()> {
    let Some(focus) = event.selection.focus().cloned() else {
        return Ok(());
    };
    let forward = event.options.direction == Direction::Forward;

    let options = WalkerOptions {
        direction: event.options.direction,
        start_position: Some(focus),
        ..WalkerOptions::default()
    };
    let walker = TreeWalker::new(doc.tree(), options)?;

    for value in walker {
        match try_extending(doc.tree(), doc.schema(), &value, forward, event.options.unit)? {
            Step::Extend(position) => {
                event.selection.set_focus(position)?;
                return Ok(());
            }
            Step::Stop => return Ok(()),
            Step::Continue => {}
        }
    }
    Ok(())
}

fn try_extending(tree: &Tree, schema: &Schema, value: &WalkerValue, forward: bool, unit: SelectionUnit) -> EditorResult<Step> {
    let element = match &value.item {
        WalkerItem::Text(text) => {
            let length = step_length(&text.data, forward, unit);
            let delta = if forward { length as isize } else { -(length as isize) };
            return Ok(value
                .previous_position
                .shifted_by(delta)
                .map_or(Step::Continue, Step::Extend));
        }
        WalkerItem::Element(element) => element,
    };

    let entering = match value.kind {
        StepKind::ElementStart => forward,
        StepKind::ElementEnd => !forward,
        StepKind::Text => return Ok(Step::Continue),
    };

    if entering {
        if schema.is_object(&element.name) {
            let offset = value.previous_position.offset();
            let outside = if forward {
                value.previous_position.with_offset(offset + 1)
            } else {
                value.previous_position.with_offset(offset - 1)
            };
            return Ok(Step::Extend(outside));
        }
        if schema.check_child(&element.name, "$text") {
            return Ok(Step::Extend(value.next_position.clone()));
        }
        return Ok(Step::Continue);
    }

    if schema.is_limit(&element.name) {
        return Ok(Step::Stop);
    }
    let parent = tree.parent_of(&value.next_position)?;
    if schema.check_child(parent.name(), "$text") {
        return Ok(Step::Extend(value.next_position.clone()));
    }
    Ok(Step::Continue)
}

/// Characters covered by one unit at the start (forward) or end (backward)
/// of `text`.
fn step_length(text: &str, forward: bool, unit: SelectionUnit) -> usize {
    match unit {
        SelectionUnit::CodePoint => text.chars().count().min(1),
        SelectionUnit::Character => {
            let mut graphemes = text.graphemes(true);
            let grapheme = if forward { graphemes.next() } else { graphemes.next_back() };
            grapheme.map_or(0, |grapheme| grapheme.chars().count())
        }
        SelectionUnit::Word => {
            if forward {
                word_length(text.split_word_bounds())
            } else {
                word_length(text.split_word_bounds().rev())
            }
        }
    }
}

/// Whitespace is crossed together with the word after it.
fn word_length<'s>(segments: impl Iterator<Item = &'s str>) -> usize {
    let mut length = 0;
    for segment in segments {
        length += segment.chars().count();
        if !segment.trim().is_empty() {
            break;
        }
    }
    length
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_length_by_unit() {
        let text = "e\u{301}x";
        assert_eq!(step_length(text, true, SelectionUnit::Character), 2);
        assert_eq!(step_length(text, true, SelectionUnit::CodePoint), 1);
        assert_eq!(step_length("ab", false, SelectionUnit::Character), 1);
    }

    #[test]
    fn test_word_steps_skip_whitespace() {
        assert_eq!(step_length("foo bar", true, SelectionUnit::Word), 3);
        assert_eq!(step_length(" bar baz", true, SelectionUnit::Word), 4);
        assert_eq!(step_length("foo bar ", false, SelectionUnit::Word), 4);
    }
}
