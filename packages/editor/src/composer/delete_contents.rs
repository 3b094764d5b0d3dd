//! Default `deleteContents` behavior.

use quire_common::EventInfo;
use quire_model::{Position, Range};
use tracing::debug;

use super::DeleteContentsEvent;
use crate::document::Document;
use crate::errors::EditorResult;
use crate::writer::Writer;

pub(super) fn delete_contents(_info: &mut EventInfo, doc: &mut Document, event: &mut DeleteContentsEvent) -> EditorResult<()> {
    let Some(range) = event.selection.first_range().cloned() else {
        return Ok(());
    };
    if range.is_collapsed() {
        return Ok(());
    }

    let start = range.start.clone();
    let merge = event.options.merge;
    let end = doc.track_range(Range::collapsed(range.end.clone()));

    let result = doc.change_in(&mut event.batch, |writer| {
        writer.remove(&range)?;
        if merge {
            let end = writer
                .document()
                .live_range(end)
                .map(|range| range.start.clone())
                .unwrap_or_else(|| start.clone());
            merge_branches(writer, &start, end)?;
        }
        Ok(())
    });
    doc.untrack_range(end);
    result?;

    event.selection.collapse(start);
    Ok(())
}

/// Merge the ancestors of `start` and `end` pairwise, outermost first,
/// until both positions share a parent. The start side survives.
fn merge_branches(writer: &mut Writer<'_>, start: &Position, mut end: Position) -> EditorResult<()> {
    while start.root == end.root && !start.has_same_parent_as(&end) {
        let level = start.common_path_len(&end);
        if start.path.len() <= level + 1 || end.path.len() <= level + 1 {
            break;
        }
        let (first, second) = (start.path[level], end.path[level]);
        if second != first + 1 {
            break;
        }

        let tree = writer.document().tree();
        let schema = writer.document().schema();
        let first_element = tree.element_at_path(&start.root, &start.path[..=level])?;
        let second_element = tree.element_at_path(&end.root, &end.path[..=level])?;
        let blocked = [first_element.name(), second_element.name()]
            .iter()
            .any(|name| schema.is_limit(name) || schema.is_object(name));
        if blocked {
            debug!(%start, %end, "not merging across a limit");
            break;
        }
        let offset = first_element.max_offset();

        writer.merge(&Position::new(end.root.clone(), end.path[..=level].to_vec()))?;

        let mut path = start.path[..=level].to_vec();
        path.push(offset + end.path[level + 1]);
        path.extend_from_slice(&end.path[level + 2..]);
        end = Position::new(end.root.clone(), path);
    }
    Ok(())
}
