//! High-level edits. Each method builds one delta, applies it through the
//! document and appends it to the writer's batch.

use quire_model::{nodes_size, Attributes, Element, ModelError, Node, Position, Range, Selection, Text};

use crate::batch::Batch;
use crate::delta::{Delta, DeltaKind};
use crate::document::Document;
use crate::errors::{EditorError, EditorResult};
use crate::operation::Operation;

pub struct Writer<'a> {
    doc: &'a mut Document,
    batch: &'a mut Batch,
}

impl<'a> Writer<'a> {
    pub fn new(doc: &'a mut Document, batch: &'a mut Batch) -> Self {
        Self { doc, batch }
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    pub fn batch(&self) -> &Batch {
        self.batch
    }

    fn apply(&mut self, kind: DeltaKind, operations: Vec<Operation>) -> EditorResult<()> {
        self.doc
            .apply_delta(self.batch, Delta::with_operations(kind, operations))
    }

    fn check_child(&self, position: &Position, child: &str) -> EditorResult<()> {
        let parent = self.doc.tree().parent_of(position)?;
        if self.doc.schema().check_child(parent.name(), child) {
            Ok(())
        } else {
            Err(EditorError::SchemaViolation {
                parent: parent.name().to_string(),
                child: child.to_string(),
            })
        }
    }

    fn element_after(&self, position: &Position) -> EditorResult<&Element> {
        match self.doc.tree().node_after(position)? {
            Some(Node::Element(element)) => Ok(element),
            _ => Err(ModelError::invalid_position(position, "expected an element after the position").into()),
        }
    }

    pub fn insert(&mut self, nodes: Vec<Node>, position: &Position) -> EditorResult<()> {
        for node in &nodes {
            self.check_child(position, node.schema_name())?;
        }
        if nodes_size(&nodes) == 0 {
            return Ok(());
        }
        self.apply(
            DeltaKind::Insert,
            vec![Operation::Insert {
                position: position.clone(),
                nodes,
            }],
        )
    }

    pub fn insert_text(&mut self, text: &str, position: &Position, attributes: Option<Attributes>) -> EditorResult<()> {
        let text = Text::new(text).with_attributes(attributes.unwrap_or_default());
        self.insert(vec![Node::Text(text)], position)
    }

    pub fn insert_element(&mut self, element: Element, position: &Position) -> EditorResult<()> {
        self.insert(vec![Node::Element(element)], position)
    }

    /// Remove everything in `range`. Elements only partly inside it stay,
    /// losing the selected part of their content.
    pub fn remove(&mut self, range: &Range) -> EditorResult<()> {
        let tree = self.doc.tree();
        let mut operations = Vec::new();
        for flat in tree.flat_ranges(range)?.iter().rev() {
            let nodes = tree.slice(flat)?;
            if nodes.is_empty() {
                continue;
            }
            operations.push(Operation::Remove {
                position: flat.start.clone(),
                nodes,
            });
        }
        if operations.is_empty() {
            return Ok(());
        }
        self.apply(DeltaKind::Remove, operations)
    }

    /// Move a flat range to `target`, given in coordinates from before the move.
    pub fn move_range(&mut self, range: &Range, target: &Position) -> EditorResult<()> {
        let Some(how_many) = range.flat_len() else {
            return Err(ModelError::invalid_range("only flat ranges can be moved").into());
        };
        for node in self.doc.tree().slice(range)? {
            self.check_child(target, node.schema_name())?;
        }
        if how_many == 0 {
            return Ok(());
        }
        self.apply(
            DeltaKind::Move,
            vec![Operation::Move {
                source: range.start.clone(),
                how_many,
                target: target.clone(),
            }],
        )
    }

    pub fn set_attribute(&mut self, range: &Range, key: &str, value: &str) -> EditorResult<()> {
        self.change_attribute(range, key, Some(value))
    }

    pub fn remove_attribute(&mut self, range: &Range, key: &str) -> EditorResult<()> {
        self.change_attribute(range, key, None)
    }

    /// Set an attribute on the element right after `position`.
    pub fn set_element_attribute(&mut self, position: &Position, key: &str, value: Option<&str>) -> EditorResult<()> {
        self.element_after(position)?;
        let range = Range::new(position.clone(), position.with_offset(position.offset() + 1))?;
        self.change_attribute(&range, key, value)
    }

    /// One operation per run of nodes that share the old value.
    fn change_attribute(&mut self, range: &Range, key: &str, value: Option<&str>) -> EditorResult<()> {
        let tree = self.doc.tree();
        let mut operations = Vec::new();

        for flat in tree.flat_ranges(range)? {
            let mut offset = flat.start.offset();
            let mut run: Option<(usize, Option<String>)> = None;

            for node in tree.slice(&flat)? {
                let current = node.attribute(key).map(str::to_string);
                let size = node.size();
                match &run {
                    Some((_, old)) if *old == current => {}
                    _ => {
                        if let Some((start, old)) = run.take() {
                            push_change(&mut operations, &flat.start, start, offset, key, old, value)?;
                        }
                        run = Some((offset, current));
                    }
                }
                offset += size;
            }
            if let Some((start, old)) = run {
                push_change(&mut operations, &flat.start, start, offset, key, old, value)?;
            }
        }

        if operations.is_empty() {
            return Ok(());
        }
        self.apply(DeltaKind::Attribute, operations)
    }

    pub fn rename(&mut self, position: &Position, new_name: &str) -> EditorResult<()> {
        let old_name = self.element_after(position)?.name().to_string();
        if old_name == new_name {
            return Ok(());
        }
        self.check_child(position, new_name)?;
        self.apply(
            DeltaKind::Rename,
            vec![Operation::Rename {
                position: position.clone(),
                old_name,
                new_name: new_name.to_string(),
            }],
        )
    }

    /// Split the parent of `position` in two. The new element copies the
    /// name and attributes of the original.
    pub fn split(&mut self, position: &Position) -> EditorResult<()> {
        let parent = self.doc.tree().parent_of(position)?;
        let operation = Operation::Split {
            position: position.clone(),
            name: parent.name().to_string(),
            attributes: parent.attributes().clone(),
        };
        self.apply(DeltaKind::Split, vec![operation])
    }

    /// Merge the element after `position` into the element before it.
    pub fn merge(&mut self, position: &Position) -> EditorResult<()> {
        let parent = self.doc.tree().parent_of(position)?;
        let offset = position.offset();
        let before = if offset == 0 { None } else { parent.element_at_offset(offset - 1) };
        let (Some(before), Some(after)) = (before, parent.element_at_offset(offset)) else {
            return Err(ModelError::invalid_position(position, "merge needs an element on both sides").into());
        };

        let operation = Operation::Merge {
            position: position.clone(),
            offset: before.max_offset(),
            name: after.name().to_string(),
            attributes: after.attributes().clone(),
        };
        self.apply(DeltaKind::Merge, vec![operation])
    }

    /// Wrap a flat range in `element`, which must be empty.
    pub fn wrap(&mut self, range: &Range, element: Element) -> EditorResult<()> {
        let Some(how_many) = range.flat_len() else {
            return Err(ModelError::invalid_range("only flat ranges can be wrapped").into());
        };
        if !element.is_empty() {
            return Err(ModelError::invalid_range("the wrapping element must be empty").into());
        }
        self.check_child(&range.start, element.name())?;
        for node in self.doc.tree().slice(range)? {
            if !self.doc.schema().check_child(element.name(), node.schema_name()) {
                return Err(EditorError::SchemaViolation {
                    parent: element.name().to_string(),
                    child: node.schema_name().to_string(),
                });
            }
        }

        let mut inside = range.end.path.clone();
        inside.push(0);
        let operations = vec![
            Operation::Insert {
                position: range.end.clone(),
                nodes: vec![Node::Element(element)],
            },
            Operation::Move {
                source: range.start.clone(),
                how_many,
                target: Position::new(range.end.root.clone(), inside),
            },
        ];
        self.apply(DeltaKind::Wrap, operations)
    }

    /// Replace the element after `position` with its children.
    pub fn unwrap(&mut self, position: &Position) -> EditorResult<()> {
        let element = self.element_after(position)?;
        let how_many = element.max_offset();
        let shell = element.shell();
        for child in element.children() {
            self.check_child(position, child.schema_name())?;
        }

        let mut operations = Vec::new();
        if how_many > 0 {
            let mut inside = position.path.clone();
            inside.push(0);
            operations.push(Operation::Move {
                source: Position::new(position.root.clone(), inside),
                how_many,
                target: position.with_offset(position.offset() + 1),
            });
        }
        operations.push(Operation::Remove {
            position: position.clone(),
            nodes: vec![Node::Element(shell)],
        });
        self.apply(DeltaKind::Unwrap, operations)
    }

    pub fn add_marker(&mut self, name: &str, range: Range) -> EditorResult<()> {
        if self.doc.markers().has(name) {
            return Err(EditorError::MarkerExists(name.to_string()));
        }
        self.marker_change(name, None, Some(range))
    }

    pub fn update_marker(&mut self, name: &str, range: Range) -> EditorResult<()> {
        let old = self
            .doc
            .markers()
            .get(name)
            .cloned()
            .ok_or_else(|| EditorError::MarkerNotFound(name.to_string()))?;
        self.marker_change(name, Some(old), Some(range))
    }

    pub fn remove_marker(&mut self, name: &str) -> EditorResult<()> {
        let old = self
            .doc
            .markers()
            .get(name)
            .cloned()
            .ok_or_else(|| EditorError::MarkerNotFound(name.to_string()))?;
        self.marker_change(name, Some(old), None)
    }

    fn marker_change(&mut self, name: &str, old_range: Option<Range>, new_range: Option<Range>) -> EditorResult<()> {
        self.apply(
            DeltaKind::Marker,
            vec![Operation::MarkerChange {
                name: name.to_string(),
                old_range,
                new_range,
            }],
        )
    }

    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        self.doc.set_selection(selection)
    }
}

fn push_change(
    operations: &mut Vec<Operation>,
    anchor: &Position,
    start: usize,
    end: usize,
    key: &str,
    old_value: Option<String>,
    new_value: Option<&str>,
) -> EditorResult<()> {
    if old_value.as_deref() == new_value || start == end {
        return Ok(());
    }
    operations.push(Operation::AttributeChange {
        range: Range::flat(anchor.root.clone(), anchor.parent_path(), start, end)?,
        key: key.to_string(),
        old_value,
        new_value: new_value.map(str::to_string),
    });
    Ok(())
}
