//! Node types: NodeId, Node, Element, Attribute.

use slotmap::new_key_type;

use crate::reactive::{untracked, Cell};
use crate::value::Value;

new_key_type! {
    /// Unique identifier for a markup node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// Discriminant of [`Node`], for typed searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element,
    Text,
    Comment,
}

/// An attribute value: raw text straight from the parser, or a cell after
/// binding.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Literal(String),
    Bound(Cell<Value>),
}

impl AttrValue {
    /// Current value without subscribing. A disposed cell reads as null.
    pub fn current(&self) -> Value {
        match self {
            AttrValue::Literal(raw) => Value::Text(raw.clone()),
            AttrValue::Bound(cell) => untracked(|| cell.try_get()).unwrap_or_default(),
        }
    }

    pub fn cell(&self) -> Option<Cell<Value>> {
        match self {
            AttrValue::Bound(cell) => Some(*cell),
            AttrValue::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            AttrValue::Literal(raw) => Some(raw),
            AttrValue::Bound(_) => None,
        }
    }
}

/// A named attribute. Names may repeat within one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

impl Attribute {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Literal(value.into()),
        }
    }

    pub fn bound(name: impl Into<String>, cell: Cell<Value>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Bound(cell),
        }
    }
}

/// Element data. Children live in the owning [`Tree`](super::Tree).
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// Void elements never have children or a closing tag.
    pub void: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            void: false,
        }
    }

    /// Add a literal attribute (builder).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::literal(name, value));
        self
    }

    /// Mark as void (builder).
    pub fn void(mut self, void: bool) -> Self {
        self.void = void;
        self
    }

    /// First attribute value with the given name.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }

    /// Every attribute value with the given name, in order.
    pub fn attrs<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AttrValue> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.name == name)
            .map(|a| &a.value)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }
}

/// Text content: a literal run or a cell projected as text.
#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Literal(String),
    Bound(Cell<Value>),
}

impl TextContent {
    /// Current text without subscribing.
    pub fn current(&self) -> String {
        match self {
            TextContent::Literal(text) => text.clone(),
            TextContent::Bound(cell) => untracked(|| cell.try_get())
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn cell(&self) -> Option<Cell<Value>> {
        match self {
            TextContent::Bound(cell) => Some(*cell),
            TextContent::Literal(_) => None,
        }
    }
}

/// A markup node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(TextContent),
    Comment(String),
}

impl Node {
    pub fn element(name: impl Into<String>) -> Self {
        Node::Element(Element::new(name))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextContent::Literal(text.into()))
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Node::Comment(text.into())
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Element(_) => NodeType::Element,
            Node::Text(_) => NodeType::Text,
            Node::Comment(_) => NodeType::Comment,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Element name, if this is an element.
    pub fn name(&self) -> Option<&str> {
        self.as_element().map(|el| el.name.as_str())
    }

    pub fn as_comment(&self) -> Option<&str> {
        match self {
            Node::Comment(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_lookup_first_and_all() {
        let el = Element::new("div")
            .with_attr("class", "a")
            .with_attr("id", "x")
            .with_attr("class", "b");
        assert_eq!(el.attr("class").and_then(AttrValue::as_literal), Some("a"));
        let all: Vec<_> = el.attrs("class").filter_map(AttrValue::as_literal).collect();
        assert_eq!(all, vec!["a", "b"]);
        assert!(el.attr("missing").is_none());
        assert!(el.has_attr("id"));
    }

    #[test]
    fn node_type_and_accessors() {
        let node = Node::element("span");
        assert_eq!(node.node_type(), NodeType::Element);
        assert_eq!(node.name(), Some("span"));
        assert_eq!(Node::text("hi").node_type(), NodeType::Text);
        assert_eq!(Node::comment(" c ").as_comment(), Some(" c "));
        assert!(Node::comment("c").name().is_none());
    }

    #[test]
    fn bound_values_read_current() {
        let cell = Cell::new(Value::from(3));
        let attr = Attribute::bound("width", cell);
        assert_eq!(attr.value.current(), Value::from(3));
        assert_eq!(attr.value.cell(), Some(cell));

        let text = TextContent::Bound(Cell::new(Value::from("hi")));
        assert_eq!(text.current(), "hi");

        cell.dispose();
        assert!(attr.value.current().is_null());
    }
}
