use crate::ast::{MarkupElement, MarkupNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Escape `[` and `]` in text so they survive a parse with markers on.
    pub selection_markers: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            selection_markers: true,
        }
    }
}

pub fn serialize(nodes: &[MarkupNode]) -> String {
    serialize_with(nodes, SerializeOptions::default())
}

pub fn serialize_with(nodes: &[MarkupNode], options: SerializeOptions) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, options);
    }
    out
}

fn write_node(out: &mut String, node: &MarkupNode, options: SerializeOptions) {
    match node {
        MarkupNode::Element(element) => write_element(out, element, options),
        MarkupNode::Text { value } => out.push_str(&escape_text(value, options.selection_markers)),
        MarkupNode::SelectionStart => out.push('['),
        MarkupNode::SelectionEnd => out.push(']'),
    }
}

fn write_element(out: &mut String, element: &MarkupElement, options: SerializeOptions) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }

    if element.self_closing && element.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(out, child, options);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

pub fn escape_text(text: &str, brackets: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '[' if brackets => out.push_str("&#91;"),
            ']' if brackets => out.push_str("&#93;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_serialize_elements_and_text() {
        let nodes = vec![MarkupNode::Element(
            MarkupElement::new("p")
                .with_attr("class", "a \"b\"")
                .with_child(MarkupNode::text("x < y")),
        )];
        assert_eq!(
            serialize(&nodes),
            r#"<p class="a &quot;b&quot;">x &lt; y</p>"#
        );
    }

    #[test]
    fn test_brackets_escaped_only_with_markers() {
        let nodes = vec![MarkupNode::text("[1]")];
        assert_eq!(serialize(&nodes), "&#91;1&#93;");
        assert_eq!(
            serialize_with(&nodes, SerializeOptions { selection_markers: false }),
            "[1]"
        );
    }

    #[test]
    fn test_parse_serialize_is_stable() {
        let source = r#"<p>f[oo</p><p>b]ar<br/></p><ul><li class="x">a &amp; b</li></ul>"#;
        let nodes = parse(source).unwrap();
        assert_eq!(serialize(&nodes), source);
    }
}
