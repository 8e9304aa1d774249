//! In-memory sink.

use std::cell::{Cell as StdCell, RefCell};
use std::fmt::Write as _;

use crate::template::Sink;
use crate::value::Value;

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Handle to a node created by a [`MemorySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryId(usize);

#[derive(Debug, Clone)]
enum MemoryNode {
    Element {
        name: String,
        attributes: Vec<(String, Value)>,
        children: Vec<MemoryId>,
    },
    Text(String),
}

/// A [`Sink`] that records nodes in a vector.
///
/// Setting an attribute that already exists replaces it in place, so
/// attribute order reflects first assignment.
///
/// # Examples
///
/// ```ignore
/// use std::rc::Rc;
/// use xtree::testing::MemorySink;
///
/// let sink = Rc::new(MemorySink::new());
/// let node = compiled.materialize_into(&sink).unwrap();
/// assert_eq!(sink.render(node), "<div class=\"x\">hi</div>");
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    nodes: RefCell<Vec<MemoryNode>>,
    attribute_writes: StdCell<usize>,
    text_writes: StdCell<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, node: MemoryNode) -> MemoryId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        MemoryId(nodes.len() - 1)
    }

    /// Number of nodes created so far.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element name, or `None` for text nodes.
    pub fn name(&self, id: MemoryId) -> Option<String> {
        match self.nodes.borrow().get(id.0)? {
            MemoryNode::Element { name, .. } => Some(name.clone()),
            MemoryNode::Text(_) => None,
        }
    }

    /// Current value of attribute `name`.
    pub fn attribute(&self, id: MemoryId, name: &str) -> Option<Value> {
        match self.nodes.borrow().get(id.0)? {
            MemoryNode::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            MemoryNode::Text(_) => None,
        }
    }

    /// Attribute names in order.
    pub fn attribute_names(&self, id: MemoryId) -> Vec<String> {
        match self.nodes.borrow().get(id.0) {
            Some(MemoryNode::Element { attributes, .. }) => {
                attributes.iter().map(|(n, _)| n.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Content of a text node.
    pub fn text(&self, id: MemoryId) -> Option<String> {
        match self.nodes.borrow().get(id.0)? {
            MemoryNode::Text(text) => Some(text.clone()),
            MemoryNode::Element { .. } => None,
        }
    }

    pub fn children(&self, id: MemoryId) -> Vec<MemoryId> {
        match self.nodes.borrow().get(id.0) {
            Some(MemoryNode::Element { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// Total `set_attribute` calls.
    pub fn attribute_writes(&self) -> usize {
        self.attribute_writes.get()
    }

    /// Total `set_text` calls.
    pub fn text_writes(&self) -> usize {
        self.text_writes.get()
    }

    /// Render the subtree at `id` as compact markup.
    pub fn render(&self, id: MemoryId) -> String {
        let mut out = String::new();
        self.render_into(&mut out, id);
        out
    }

    fn render_into(&self, out: &mut String, id: MemoryId) {
        let node = self.nodes.borrow().get(id.0).cloned();
        match node {
            None => {}
            Some(MemoryNode::Text(text)) => out.push_str(&text),
            Some(MemoryNode::Element {
                name,
                attributes,
                children,
            }) => {
                let _ = write!(out, "<{name}");
                for (attr, value) in &attributes {
                    let _ = write!(out, " {attr}=\"{value}\"");
                }
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in children {
                    self.render_into(out, child);
                }
                let _ = write!(out, "</{name}>");
            }
        }
    }
}

impl Sink for MemorySink {
    type Node = MemoryId;

    fn create_element(&self, name: &str) -> MemoryId {
        self.push(MemoryNode::Element {
            name: name.to_owned(),
            attributes: Vec::new(),
            children: Vec::new(),
        })
    }

    fn create_text(&self, content: &str) -> MemoryId {
        self.push(MemoryNode::Text(content.to_owned()))
    }

    fn append_child(&self, parent: &MemoryId, child: &MemoryId) {
        if let Some(MemoryNode::Element { children, .. }) = self.nodes.borrow_mut().get_mut(parent.0) {
            children.push(*child);
        }
    }

    fn set_attribute(&self, node: &MemoryId, name: &str, value: &Value) {
        self.attribute_writes.set(self.attribute_writes.get() + 1);
        if let Some(MemoryNode::Element { attributes, .. }) = self.nodes.borrow_mut().get_mut(node.0) {
            match attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, slot)) => *slot = value.clone(),
                None => attributes.push((name.to_owned(), value.clone())),
            }
        }
    }

    fn set_text(&self, node: &MemoryId, content: &str) {
        self.text_writes.set(self.text_writes.get() + 1);
        if let Some(MemoryNode::Text(text)) = self.nodes.borrow_mut().get_mut(node.0) {
            content.clone_into(text);
        }
    }
}
