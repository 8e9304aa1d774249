//! Projection of a bound tree onto an external node model.

use std::rc::Rc;

use crate::markup::{AttrValue, Node, NodeId, TextContent, Tree};
use crate::reactive::{untracked, Disposables};
use crate::value::Value;

/// The external node model a bound tree is projected onto.
///
/// Methods take `&self`; implementations use interior mutability. Sinks are
/// shared behind an `Rc` because live subscriptions keep calling into them.
pub trait Sink {
    type Node: Clone + 'static;

    fn create_element(&self, name: &str) -> Self::Node;

    fn create_text(&self, content: &str) -> Self::Node;

    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &Value);

    /// Replace the content of a text node created by
    /// [`create_text`](Self::create_text). Only called for bound text.
    fn set_text(&self, node: &Self::Node, content: &str);
}

/// Build the external tree for `id`, depth-first.
///
/// Bound attributes and bound text stay subscribed to their cells; the
/// subscriptions are registered with `disposables`. Comments produce nothing.
pub fn materialize<S: Sink + 'static>(
    tree: &Tree,
    id: NodeId,
    sink: &Rc<S>,
    disposables: &Disposables,
) -> Option<S::Node> {
    match tree.get(id)? {
        Node::Comment(_) => None,
        Node::Text(TextContent::Literal(text)) => {
            tracing::trace!(len = text.len(), "materializing text");
            Some(sink.create_text(text))
        }
        Node::Text(TextContent::Bound(cell)) => {
            let current = untracked(|| cell.try_get()).unwrap_or_default();
            tracing::trace!(cell = ?cell.id(), "materializing bound text");
            let external = sink.create_text(&current.to_string());
            let (target, sink) = (external.clone(), Rc::clone(sink));
            let sub = cell.subscribe_lazy(move |value| sink.set_text(&target, &value.to_string()));
            disposables.add_subscription(sub);
            Some(external)
        }
        Node::Element(el) => {
            tracing::trace!(name = %el.name, attributes = el.attributes.len(), "materializing element");
            let external = sink.create_element(&el.name);
            for attr in &el.attributes {
                match &attr.value {
                    AttrValue::Bound(cell) => {
                        let (target, sink, name) =
                            (external.clone(), Rc::clone(sink), attr.name.clone());
                        let sub = cell.subscribe(move |value| sink.set_attribute(&target, &name, value));
                        disposables.add_subscription(sub);
                    }
                    AttrValue::Literal(raw) => {
                        sink.set_attribute(&external, &attr.name, &Value::parse_literal(raw));
                    }
                }
            }
            for &child in tree.children(id) {
                if let Some(node) = materialize(tree, child, sink, disposables) {
                    sink.append_child(&external, &node);
                }
            }
            Some(external)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{parse, Attribute};
    use crate::reactive::Cell;
    use crate::testing::MemorySink;
    use pretty_assertions::assert_eq;

    #[test]
    fn literal_tree_is_projected() {
        let tree = parse(r#"<ul id="list"><li>a</li><!-- skip --><li>b</li></ul>"#).unwrap();
        let sink = Rc::new(MemorySink::new());
        let ul = tree.children(tree.root())[0];
        let node = materialize(&tree, ul, &sink, &Disposables::new()).unwrap();
        assert_eq!(sink.render(node), r#"<ul id="list"><li>a</li><li>b</li></ul>"#);
        assert_eq!(sink.children(node).len(), 2);
    }

    #[test]
    fn bound_attribute_and_text_stay_live() {
        let mut tree = Tree::new();
        let cls = Cell::new(Value::from("a"));
        let label = Cell::new(Value::from("hi"));
        let mut el = Node::element("p");
        if let Some(el) = el.as_element_mut() {
            el.attributes.push(Attribute::bound("class", cls));
        }
        let p = tree.insert_child(tree.root(), el);
        tree.insert_child(p, Node::Text(TextContent::Bound(label)));

        let sink = Rc::new(MemorySink::new());
        let bag = Disposables::new();
        let node = materialize(&tree, p, &sink, &bag).unwrap();
        assert_eq!(sink.render(node), r#"<p class="a">hi</p>"#);

        cls.set(Value::from("b")).unwrap();
        label.set(Value::from("yo")).unwrap();
        assert_eq!(sink.render(node), r#"<p class="b">yo</p>"#);

        bag.dispose();
        cls.set(Value::from("c")).unwrap();
        assert_eq!(sink.render(node), r#"<p class="b">yo</p>"#);
        assert_eq!(cls.subscriber_count(), 0);
        assert_eq!(label.subscriber_count(), 0);
    }

    #[test]
    fn null_attribute_is_not_set_until_it_has_a_value() {
        let mut tree = Tree::new();
        let title = Cell::new(Value::Null);
        let mut el = Node::element("a");
        if let Some(el) = el.as_element_mut() {
            el.attributes.push(Attribute::bound("title", title));
        }
        let a = tree.insert_child(tree.root(), el);
        let sink = Rc::new(MemorySink::new());
        let node = materialize(&tree, a, &sink, &Disposables::new()).unwrap();
        assert_eq!(sink.attribute(node, "title"), None);
        title.set(Value::from("t")).unwrap();
        assert_eq!(sink.attribute(node, "title"), Some(Value::from("t")));
    }

    #[test]
    fn comment_root_produces_nothing() {
        let tree = parse("<!-- only -->").unwrap();
        let comment = tree.children(tree.root())[0];
        let sink = Rc::new(MemorySink::new());
        assert!(materialize(&tree, comment, &sink, &Disposables::new()).is_none());
        assert_eq!(sink.len(), 0);
    }
}
