use serde::{Deserialize, Serialize};

/// One node of parsed tag markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MarkupNode {
    Element(MarkupElement),
    Text { value: String },
    /// `[` in markup that carries a selection.
    SelectionStart,
    /// `]` in markup that carries a selection.
    SelectionEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupElement {
    pub name: String,
    /// Attributes in source order.
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub children: Vec<MarkupNode>,
    /// Written as `<name/>`.
    #[serde(default)]
    pub self_closing: bool,
}

impl MarkupElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl MarkupNode {
    pub fn text(value: impl Into<String>) -> Self {
        MarkupNode::Text {
            value: value.into(),
        }
    }
}

impl From<MarkupElement> for MarkupNode {
    fn from(element: MarkupElement) -> Self {
        MarkupNode::Element(element)
    }
}
