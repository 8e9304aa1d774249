//! Markup serialization.

use std::fmt::Write as _;

use super::node::{Node, NodeId, TextContent};
use super::tree::Tree;

impl Tree {
    /// Serialize the subtree at `id` as compact markup.
    ///
    /// The synthetic root renders only its children. Bound values are read
    /// without subscribing.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        if id == self.root() {
            for &child in self.children(id) {
                self.write_node(&mut out, child);
            }
        } else {
            self.write_node(&mut out, id);
        }
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        match node {
            Node::Text(TextContent::Literal(text)) => out.push_str(text),
            Node::Text(bound) => out.push_str(&bound.current()),
            Node::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            Node::Element(el) => {
                let _ = write!(out, "<{}", el.name);
                for attr in &el.attributes {
                    let value = attr.value.current().to_string();
                    if value.contains('"') {
                        let _ = write!(out, " {}='{}'", attr.name, value);
                    } else {
                        let _ = write!(out, " {}=\"{}\"", attr.name, value);
                    }
                }
                let children = self.children(id);
                if el.void {
                    out.push('>');
                } else if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in children {
                        self.write_node(out, child);
                    }
                    let _ = write!(out, "</{}>", el.name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::markup::node::{Attribute, Node, TextContent};
    use crate::markup::parser::parse;
    use crate::markup::tree::Tree;
    use crate::reactive::Cell;
    use crate::value::Value;

    #[test]
    fn round_trips_compact_markup() {
        let tree = parse(r#"<div class="a"><br><span>hi</span><p/><!-- c --></div>"#).unwrap();
        insta::assert_snapshot!(
            tree.to_markup(tree.root()),
            @r#"<div class="a"><br><span>hi</span><p/><!-- c --></div>"#
        );
    }

    #[test]
    fn quotes_switch_for_values_with_double_quotes() {
        let tree = parse(r#"<x title='say "hi"'></x>"#).unwrap();
        insta::assert_snapshot!(tree.to_markup(tree.root()), @r#"<x title='say "hi"'/>"#);
    }

    #[test]
    fn bound_values_render_current() {
        let mut tree = Tree::new();
        let width = Cell::new(Value::Percent(50.0));
        let label = Cell::new(Value::from("go"));
        let root = tree.root();
        let mut el = Node::element("bar");
        if let Some(el) = el.as_element_mut() {
            el.attributes.push(Attribute::bound("width", width));
        }
        let bar = tree.insert_child(root, el);
        tree.insert_child(bar, Node::Text(TextContent::Bound(label)));
        insta::assert_snapshot!(tree.to_markup(bar), @r#"<bar width="50%">go</bar>"#);

        width.set(Value::from(10)).unwrap();
        insta::assert_snapshot!(tree.to_markup(bar), @r#"<bar width="10">go</bar>"#);
    }
}
