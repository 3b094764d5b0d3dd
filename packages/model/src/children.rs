//! Offset arithmetic over child lists.
//!
//! Children are addressed by offset, not index: a text node spans one
//! offset per character, everything else spans one. The helpers here split
//! text nodes on demand so that any offset can become a node boundary, and
//! merge adjacent compatible text nodes back together.

use crate::error::{ModelError, ModelResult};

pub trait ChildNode: Sized {
    fn offset_size(&self) -> usize;

    /// Cut a text node at a character offset and return the tail.
    /// Non-text nodes return `None`.
    fn split_text(&mut self, at: usize) -> Option<Self>;

    /// Absorb `next` if both are text with equal attributes.
    fn try_merge(&mut self, next: Self) -> Result<(), Self>;

    fn is_text(&self) -> bool;
}

pub fn max_offset<N: ChildNode>(children: &[N]) -> usize {
    children.iter().map(ChildNode::offset_size).sum()
}

/// Offset at which the child with `index` starts.
pub fn start_offset<N: ChildNode>(children: &[N], index: usize) -> usize {
    children[..index.min(children.len())]
        .iter()
        .map(ChildNode::offset_size)
        .sum()
}

/// The child covering `offset` and the offset inside it.
pub fn locate<N: ChildNode>(children: &[N], offset: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for (index, child) in children.iter().enumerate() {
        let size = child.offset_size();
        if offset < start + size {
            return Some((index, offset - start));
        }
        start += size;
    }
    None
}

/// Make `offset` a node boundary and return the index of the child that
/// now starts there.
pub fn split_at<N: ChildNode>(children: &mut Vec<N>, offset: usize) -> ModelResult<usize> {
    let max = max_offset(children);
    if offset > max {
        return Err(ModelError::OffsetOutOfBounds { offset, max });
    }

    match locate(children, offset) {
        None => Ok(children.len()),
        Some((index, 0)) => Ok(index),
        Some((index, inner)) => match children[index].split_text(inner) {
            Some(tail) => {
                children.insert(index + 1, tail);
                Ok(index + 1)
            }
            None => Err(ModelError::OffsetOutOfBounds { offset, max }),
        },
    }
}

pub fn insert_at<N: ChildNode>(children: &mut Vec<N>, offset: usize, nodes: Vec<N>) -> ModelResult<()> {
    let index = split_at(children, offset)?;
    children.splice(index..index, nodes);
    normalize(children);
    Ok(())
}

pub fn remove_range<N: ChildNode>(children: &mut Vec<N>, offset: usize, size: usize) -> ModelResult<Vec<N>> {
    let max = max_offset(children);
    if offset + size > max {
        return Err(ModelError::OffsetOutOfBounds {
            offset: offset + size,
            max,
        });
    }

    let start = split_at(children, offset)?;
    let end = split_at(children, offset + size)?;

    let removed: Vec<N> = children.drain(start..end).collect();
    normalize(children);
    Ok(removed)
}

/// Copy the nodes covering `offset..offset + size`, trimming text at the edges.
pub fn slice<N: ChildNode + Clone>(children: &[N], offset: usize, size: usize) -> ModelResult<Vec<N>> {
    let max = max_offset(children);
    let end = offset + size;
    if end > max {
        return Err(ModelError::OffsetOutOfBounds { offset: end, max });
    }

    let mut out = Vec::new();
    let mut start = 0;
    for child in children {
        if start >= end {
            break;
        }
        let child_end = start + child.offset_size();
        if child_end > offset {
            let mut piece = child.clone();
            if child_end > end {
                piece.split_text(end - start);
            }
            if start < offset {
                if let Some(tail) = piece.split_text(offset - start) {
                    piece = tail;
                }
            }
            out.push(piece);
        }
        start = child_end;
    }
    Ok(out)
}

/// Drop empty text and merge neighbours that can be merged.
pub fn normalize<N: ChildNode>(children: &mut Vec<N>) {
    let drained: Vec<N> = std::mem::take(children);
    for child in drained {
        if child.is_text() && child.offset_size() == 0 {
            continue;
        }
        match children.last_mut() {
            Some(last) => {
                if let Err(child) = last.try_merge(child) {
                    children.push(child);
                }
            }
            None => children.push(child),
        }
    }
}
