//! Operational transformation.
//!
//! [`transform`] rewrites an operation so it applies on top of another one
//! made concurrently against the same document. The result is a list:
//! an operation may split in two (a removal cut by an insertion) or vanish
//! (an insertion into removed content).
//!
//! Pairs without a sensible rewrite are dropped and logged.

use std::cmp::Ordering;

use quire_model::{nodes_size, split_nodes, Attributes, Node, Position, Range};
use tracing::{debug, warn};

use crate::operation::Operation;

/// Rewrite `a` to apply after `b`. `a_wins` breaks ties when both touch
/// the same spot or value.
pub fn transform(a: &Operation, b: &Operation, a_wins: bool) -> Vec<Operation> {
    let result = match a {
        Operation::Insert { position, nodes } => transform_insert(position, nodes, b, a_wins),

        Operation::Remove { position, nodes } => transform_remove(position, nodes, b),

        Operation::Move { source, how_many, target } => transform_move(source, *how_many, target, b, a_wins),

        Operation::Rename { position, old_name, new_name } => transform_rename(position, old_name, new_name, b, a_wins),

        Operation::AttributeChange { range, key, old_value, new_value } => {
            transform_attribute(range, key, old_value, new_value, b, a_wins)
        }

        Operation::Split { position, name, attributes } => transform_split(position, name, attributes, b),

        Operation::Merge { position, offset, name, attributes } => transform_merge(position, *offset, name, attributes, b),

        Operation::MarkerChange { name, old_range, new_range } => {
            transform_marker(name, old_range, new_range, b, a_wins)
        }
    };

    if result.is_empty() {
        debug!(kind = a.kind(), against = b.kind(), "operation dropped by transformation");
    }
    result
}

/// Transform `operation` through a sequence of operations applied after
/// the context it was created in.
pub fn transform_through(operation: &Operation, through: &[Operation], wins: bool) -> Vec<Operation> {
    let mut current = vec![operation.clone()];
    for other in through {
        current = current
            .iter()
            .flat_map(|op| transform(op, other, wins))
            .collect();
        if current.is_empty() {
            break;
        }
    }
    current
}

/// Transform two concurrent sequences against each other.
///
/// Returns `(a', b')` such that applying `a` then `b'` and applying `b`
/// then `a'` lead to the same document.
pub fn transform_sets(a_ops: &[Operation], b_ops: &[Operation], a_wins: bool) -> (Vec<Operation>, Vec<Operation>) {
    let mut a_current = a_ops.to_vec();
    let mut b_result = Vec::new();

    for b in b_ops {
        let mut b_parts = vec![b.clone()];
        let mut a_next = Vec::with_capacity(a_current.len());

        for a in &a_current {
            let mut a_parts = vec![a.clone()];
            let mut next_b_parts = Vec::new();
            for b_part in &b_parts {
                next_b_parts.extend(transform_through(b_part, &a_parts, !a_wins));
                a_parts = a_parts
                    .iter()
                    .flat_map(|op| transform(op, b_part, a_wins))
                    .collect();
            }
            b_parts = next_b_parts;
            a_next.extend(a_parts);
        }

        a_current = a_next;
        b_result.extend(b_parts);
    }

    (a_current, b_result)
}

fn transform_insert(position: &Position, nodes: &[Node], b: &Operation, a_wins: bool) -> Vec<Operation> {
    let moved = match b {
        Operation::Insert { position: other, .. } if other == position && a_wins => Some(position.clone()),
        // Removal cut by this insertion keeps the inserted nodes, so they
        // land where the removed range was.
        Operation::Remove { position: at, nodes: removed } if at.has_same_parent_as(position) => {
            let offset = position.offset();
            if offset > at.offset() && offset < at.offset() + nodes_size(removed) {
                Some(at.clone())
            } else {
                b.transform_position(position)
            }
        }
        _ => b.transform_position(position),
    };
    moved
        .map(|position| Operation::Insert {
            position,
            nodes: nodes.to_vec(),
        })
        .into_iter()
        .collect()
}

fn transform_remove(position: &Position, nodes: &[Node], b: &Operation) -> Vec<Operation> {
    let size = nodes_size(nodes);
    let Some(range) = flat_range(position, size) else {
        return Vec::new();
    };

    flat_pieces(&range, b)
        .into_iter()
        .map(|piece| {
            let len = piece.range.flat_len().unwrap_or(0);
            Operation::Remove {
                position: piece.range.start,
                nodes: slice_nodes(nodes, piece.skip, len),
            }
        })
        .collect()
}

fn transform_move(source: &Position, how_many: usize, target: &Position, b: &Operation, a_wins: bool) -> Vec<Operation> {
    let Some(range) = flat_range(source, how_many) else {
        return Vec::new();
    };

    let mut pieces = flat_pieces(&range, b);
    if pieces.len() != 1 || pieces[0].range.flat_len() != Some(how_many) {
        warn!(%source, how_many, against = b.kind(), "cannot transform a move whose range was split");
        return Vec::new();
    }
    let source = pieces.remove(0).range.start;

    let target = match b {
        Operation::Insert { position, .. } if position == target && a_wins => Some(target.clone()),
        _ => b.transform_position(target),
    };
    match target {
        Some(target) => vec![Operation::Move { source, how_many, target }],
        None => Vec::new(),
    }
}

fn transform_rename(position: &Position, old_name: &str, new_name: &str, b: &Operation, a_wins: bool) -> Vec<Operation> {
    if let Operation::Rename { position: other, new_name: other_new, .. } = b {
        if other == position {
            if !a_wins || other_new == new_name {
                return Vec::new();
            }
            return vec![Operation::Rename {
                position: position.clone(),
                old_name: other_new.clone(),
                new_name: new_name.to_string(),
            }];
        }
    }

    b.transform_element(position)
        .map(|position| Operation::Rename {
            position,
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        })
        .into_iter()
        .collect()
}

fn transform_attribute(
    range: &Range,
    key: &str,
    old_value: &Option<String>,
    new_value: &Option<String>,
    b: &Operation,
    a_wins: bool,
) -> Vec<Operation> {
    let change = |range: Range, old_value: Option<String>| Operation::AttributeChange {
        range,
        key: key.to_string(),
        old_value,
        new_value: new_value.clone(),
    };

    let mut out = Vec::new();
    for piece in flat_pieces(range, b) {
        let conflict = match b {
            Operation::AttributeChange { range: other, key: other_key, new_value: other_new, .. }
                if other_key == key && other.start.has_same_parent_as(&piece.range.start) =>
            {
                Some((other, other_new))
            }
            _ => None,
        };

        let Some((other, other_new)) = conflict else {
            out.push(change(piece.range, old_value.clone()));
            continue;
        };

        let root = piece.range.root().to_string();
        let parent = piece.range.start.parent_path().to_vec();
        let (start, end) = (piece.range.start.offset(), piece.range.end.offset());
        let shared_start = start.max(other.start.offset());
        let shared_end = end.min(other.end.offset());
        if shared_start >= shared_end {
            out.push(change(piece.range, old_value.clone()));
            continue;
        }

        if start < shared_start {
            out.extend(Range::flat(&root, &parent, start, shared_start).ok().map(|r| change(r, old_value.clone())));
        }
        if a_wins && other_new != new_value {
            out.extend(Range::flat(&root, &parent, shared_start, shared_end).ok().map(|r| change(r, other_new.clone())));
        }
        if shared_end < end {
            out.extend(Range::flat(&root, &parent, shared_end, end).ok().map(|r| change(r, old_value.clone())));
        }
    }
    out
}

fn transform_split(position: &Position, name: &str, attributes: &Attributes, b: &Operation) -> Vec<Operation> {
    if let Operation::Split { position: other, .. } = b {
        if other == position {
            return Vec::new();
        }
    }

    let Some(at) = b.transform_position(position) else {
        return Vec::new();
    };
    if at.path.len() < 2 {
        return Vec::new();
    }

    let mut name = name.to_string();
    if let Operation::Rename { position: renamed, old_name, new_name } = b {
        if renamed.root == position.root && renamed.path == position.parent_path() && *old_name == name {
            name = new_name.clone();
        }
    }

    vec![Operation::Split {
        position: at,
        name,
        attributes: attributes.clone(),
    }]
}

fn transform_merge(position: &Position, offset: usize, name: &str, attributes: &Attributes, b: &Operation) -> Vec<Operation> {
    if let Operation::Merge { position: other, .. } = b {
        if other == position {
            return Vec::new();
        }
    }
    if position.offset() == 0 {
        return Vec::new();
    }

    let Some(second) = b.transform_element(position) else {
        return Vec::new();
    };
    if second.offset() == 0 {
        return Vec::new();
    }

    let mut first_end = position.path.clone();
    if let Some(last) = first_end.last_mut() {
        *last -= 1;
    }
    first_end.push(offset);
    let Some(first_end) = b.transform_position(&Position::new(position.root.clone(), first_end)) else {
        return Vec::new();
    };

    let mut expected_first = second.path.clone();
    if let Some(last) = expected_first.last_mut() {
        *last -= 1;
    }
    if first_end.root != second.root || first_end.parent_path() != expected_first.as_slice() {
        warn!(%position, against = b.kind(), "merged elements are no longer siblings");
        return Vec::new();
    }

    let mut name = name.to_string();
    if let Operation::Rename { position: renamed, old_name, new_name } = b {
        if renamed == position && *old_name == name {
            name = new_name.clone();
        }
    }

    vec![Operation::Merge {
        position: second,
        offset: first_end.offset(),
        name,
        attributes: attributes.clone(),
    }]
}

fn transform_marker(
    name: &str,
    old_range: &Option<Range>,
    new_range: &Option<Range>,
    b: &Operation,
    a_wins: bool,
) -> Vec<Operation> {
    if let Operation::MarkerChange { name: other, new_range: other_new, .. } = b {
        if other == name {
            if !a_wins {
                return Vec::new();
            }
            return vec![Operation::MarkerChange {
                name: name.to_string(),
                old_range: other_new.clone(),
                new_range: new_range.clone(),
            }];
        }
    }

    vec![Operation::MarkerChange {
        name: name.to_string(),
        old_range: old_range.as_ref().map(|range| b.transform_range(range)),
        new_range: new_range.as_ref().map(|range| b.transform_range(range)),
    }]
}

/// Part of a flat range that survived another operation.
struct Piece {
    range: Range,
    /// Offset of this part inside the original range.
    skip: usize,
}

fn piece(root: &str, parent: &[usize], start: usize, end: usize, skip: usize) -> Option<Piece> {
    if end <= start {
        return None;
    }
    Range::flat(root, parent, start, end)
        .ok()
        .map(|range| Piece { range, skip })
}

fn flat_range(start: &Position, size: usize) -> Option<Range> {
    Range::new(start.clone(), start.with_offset(start.offset() + size)).ok()
}

fn slice_nodes(nodes: &[Node], skip: usize, len: usize) -> Vec<Node> {
    let (_, tail) = split_nodes(nodes, skip);
    let (head, _) = split_nodes(&tail, len);
    head
}

/// Map a flat range through `b`. Pieces come out last-first so they can be
/// removed in order without shifting each other.
fn flat_pieces(range: &Range, b: &Operation) -> Vec<Piece> {
    let root = range.root();
    let parent = range.start.parent_path();
    let (start, end) = (range.start.offset(), range.end.offset());
    let len = end.saturating_sub(start);
    let same_parent = |at: &Position| at.root == root && at.parent_path() == parent;

    let mut pieces: Vec<Piece> = match b {
        Operation::Insert { position: at, nodes } if same_parent(at) => {
            let inserted = nodes_size(nodes);
            let offset = at.offset();
            if offset <= start {
                piece(root, parent, start + inserted, end + inserted, 0).into_iter().collect()
            } else if offset >= end {
                piece(root, parent, start, end, 0).into_iter().collect()
            } else {
                [
                    piece(root, parent, start, offset, 0),
                    piece(root, parent, offset + inserted, end + inserted, offset - start),
                ]
                .into_iter()
                .flatten()
                .collect()
            }
        }

        Operation::Remove { position: at, nodes } if same_parent(at) => {
            let removed = nodes_size(nodes);
            let (cut_start, cut_end) = (at.offset(), at.offset() + removed);
            let mut out = Vec::new();
            if start < cut_start {
                out.extend(piece(root, parent, start, end.min(cut_start), 0));
            }
            if end > cut_end {
                let kept = start.max(cut_end);
                out.extend(piece(root, parent, kept - removed, end - removed, kept - start));
            }
            out
        }

        Operation::Split { position: at, .. } if same_parent(at) && start < at.offset() && at.offset() < end => {
            let cut = at.offset();
            let mut next = parent.to_vec();
            if let Some(last) = next.last_mut() {
                *last += 1;
            }
            [
                piece(root, parent, start, cut, 0),
                piece(root, &next, 0, end - cut, cut - start),
            ]
            .into_iter()
            .flatten()
            .collect()
        }

        _ => {
            let moved_start = b.transform_position(&range.start);
            let moved_end = b.transform_position(&range.end);
            match (moved_start, moved_end) {
                (Some(moved_start), Some(moved_end))
                    if moved_start.has_same_parent_as(&moved_end)
                        && moved_end.offset().checked_sub(moved_start.offset()) == Some(len) =>
                {
                    Range::new(moved_start, moved_end)
                        .ok()
                        .map(|range| Piece { range, skip: 0 })
                        .into_iter()
                        .collect()
                }
                _ => Vec::new(),
            }
        }
    };

    pieces.sort_by(|x, y| y.range.start.compare(&x.range.start).unwrap_or(Ordering::Equal));
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_model::Text;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    fn text(data: &str) -> Vec<Node> {
        vec![Node::Text(Text::new(data))]
    }

    #[test]
    fn test_insert_tie_breaking() {
        let a = Operation::Insert { position: pos(&[0, 2]), nodes: text("a") };
        let b = Operation::Insert { position: pos(&[0, 2]), nodes: text("bb") };

        assert_eq!(transform(&a, &b, true), vec![a.clone()]);
        assert_eq!(
            transform(&a, &b, false),
            vec![Operation::Insert { position: pos(&[0, 4]), nodes: text("a") }]
        );
    }

    #[test]
    fn test_insert_into_removed_content_is_dropped() {
        let a = Operation::Insert { position: pos(&[1, 0]), nodes: text("x") };
        let b = Operation::Remove {
            position: pos(&[1]),
            nodes: vec![Node::Element(quire_model::Element::new("paragraph"))],
        };
        assert!(transform(&a, &b, true).is_empty());
    }

    #[test]
    fn test_remove_cut_by_insertion() {
        let a = Operation::Remove { position: pos(&[0, 1]), nodes: text("abcd") };
        let b = Operation::Insert { position: pos(&[0, 3]), nodes: text("XY") };

        let result = transform(&a, &b, true);
        assert_eq!(
            result,
            vec![
                Operation::Remove { position: pos(&[0, 5]), nodes: text("cd") },
                Operation::Remove { position: pos(&[0, 1]), nodes: text("ab") },
            ]
        );
    }

    #[test]
    fn test_remove_overlapping_remove() {
        // a removes 1..5, b removes 3..7
        let a = Operation::Remove { position: pos(&[0, 1]), nodes: text("abcd") };
        let b = Operation::Remove { position: pos(&[0, 3]), nodes: text("cdef") };
        assert_eq!(
            transform(&a, &b, true),
            vec![Operation::Remove { position: pos(&[0, 1]), nodes: text("ab") }]
        );

        // a removes 3..7, b removes 1..5
        assert_eq!(
            transform(&b, &a, true),
            vec![Operation::Remove { position: pos(&[0, 1]), nodes: text("ef") }]
        );

        assert!(transform(&a, &a, true).is_empty());
    }

    #[test]
    fn test_rename_survives_typing_at_element_start() {
        let a = Operation::Rename {
            position: pos(&[0]),
            old_name: "paragraph".to_string(),
            new_name: "heading1".to_string(),
        };
        let b = Operation::Insert { position: pos(&[0, 0]), nodes: text("X") };
        assert_eq!(transform(&a, &b, true), vec![a.clone()]);
    }

    #[test]
    fn test_merge_survives_typing_at_element_start() {
        let a = Operation::Merge {
            position: pos(&[1]),
            offset: 3,
            name: "paragraph".to_string(),
            attributes: Attributes::new(),
        };

        let inside_second = Operation::Insert { position: pos(&[1, 0]), nodes: text("X") };
        assert_eq!(transform(&a, &inside_second, true), vec![a.clone()]);

        let inside_first = Operation::Insert { position: pos(&[0, 0]), nodes: text("XY") };
        assert_eq!(
            transform(&a, &inside_first, true),
            vec![Operation::Merge {
                position: pos(&[1]),
                offset: 5,
                name: "paragraph".to_string(),
                attributes: Attributes::new(),
            }]
        );
    }

    #[test]
    fn test_attribute_conflict() {
        let range = |s, e| Range::flat("main", &[0], s, e).unwrap();
        let a = Operation::AttributeChange {
            range: range(0, 4),
            key: "bold".into(),
            old_value: None,
            new_value: Some("a".into()),
        };
        let b = Operation::AttributeChange {
            range: range(2, 6),
            key: "bold".into(),
            old_value: None,
            new_value: Some("b".into()),
        };

        let winning = transform(&a, &b, true);
        assert_eq!(winning.len(), 2);
        assert!(matches!(
            &winning[1],
            Operation::AttributeChange { range: r, old_value: Some(old), .. } if *r == range(2, 4) && old == "b"
        ));

        let losing = transform(&a, &b, false);
        assert_eq!(losing.len(), 1);
        assert!(matches!(&losing[0], Operation::AttributeChange { range: r, .. } if *r == range(0, 2)));
    }

    #[test]
    fn test_rename_conflict() {
        let a = Operation::Rename { position: pos(&[0]), old_name: "p".into(), new_name: "h1".into() };
        let b = Operation::Rename { position: pos(&[0]), old_name: "p".into(), new_name: "h2".into() };

        assert_eq!(
            transform(&a, &b, true),
            vec![Operation::Rename { position: pos(&[0]), old_name: "h2".into(), new_name: "h1".into() }]
        );
        assert!(transform(&a, &b, false).is_empty());
    }

    #[test]
    fn test_split_follows_insertion_before_it() {
        let a = Operation::Split { position: pos(&[0, 3]), name: "p".into(), attributes: Attributes::new() };
        let b = Operation::Insert { position: pos(&[0, 0]), nodes: text("xx") };
        assert_eq!(
            transform(&a, &b, true),
            vec![Operation::Split { position: pos(&[0, 5]), name: "p".into(), attributes: Attributes::new() }]
        );
    }

    #[test]
    fn test_merge_after_insertion_into_first_element() {
        let a = Operation::Merge { position: pos(&[1]), offset: 3, name: "p".into(), attributes: Attributes::new() };
        let b = Operation::Insert { position: pos(&[0, 3]), nodes: text("xx") };
        assert_eq!(
            transform(&a, &b, true),
            vec![Operation::Merge { position: pos(&[1]), offset: 5, name: "p".into(), attributes: Attributes::new() }]
        );
    }
}
