//! Tree queries: by name, type, attribute, and dotted path.

use super::node::{AttrValue, Node, NodeId, NodeType};
use super::tree::Tree;

impl Tree {
    /// First element named `name` in depth-first order, `start` included.
    pub fn find(&self, start: NodeId, name: &str) -> Option<NodeId> {
        self.walk(start)
            .into_iter()
            .find(|&id| self.name_of(id) == Some(name))
    }

    /// Every element named `name`, depth-first, `start` included.
    pub fn find_all(&self, start: NodeId, name: &str) -> Vec<NodeId> {
        self.walk(start)
            .into_iter()
            .filter(|&id| self.name_of(id) == Some(name))
            .collect()
    }

    /// Every node of the given type that matches `predicate`.
    pub fn find_type(
        &self,
        start: NodeId,
        node_type: NodeType,
        predicate: impl Fn(&Node) -> bool,
    ) -> Vec<NodeId> {
        self.seek(start)
            .into_iter()
            .filter(|&id| {
                self.get(id)
                    .is_some_and(|node| node.node_type() == node_type && predicate(node))
            })
            .collect()
    }

    /// Elements carrying attribute `name`; with `value`, only those whose
    /// attribute currently renders as `value`.
    pub fn find_by_attr(&self, start: NodeId, name: &str, value: Option<&str>) -> Vec<NodeId> {
        let accepts = |attr: &AttrValue| match value {
            None => true,
            Some(expected) => match attr {
                AttrValue::Literal(raw) => raw == expected,
                AttrValue::Bound(_) => attr.current().to_string() == expected,
            },
        };
        self.walk(start)
            .into_iter()
            .filter(|&id| {
                self.get(id)
                    .and_then(Node::as_element)
                    .is_some_and(|el| el.attrs(name).any(|attr| accepts(attr)))
            })
            .collect()
    }

    /// Follow a dotted path of child element names from `start`.
    ///
    /// Each step picks the first direct child element with that name, or the
    /// n-th with `Name[n]`. Returns `None` as soon as a step has no match or
    /// is malformed.
    ///
    /// ```ignore
    /// tree.query(tree.root(), "Panel.VGroup.Text[1]")
    /// ```
    pub fn query(&self, start: NodeId, path: &str) -> Option<NodeId> {
        let mut current = start;
        for step in path.split('.').filter(|s| !s.is_empty()) {
            let (name, index) = parse_step(step)?;
            current = self
                .children(current)
                .iter()
                .copied()
                .filter(|&id| self.name_of(id) == Some(name))
                .nth(index)?;
        }
        Some(current)
    }

    fn name_of(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::name)
    }
}

fn parse_step(step: &str) -> Option<(&str, usize)> {
    match step.split_once('[') {
        None => Some((step, 0)),
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.trim().parse().ok()?;
            Some((name, index))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::markup::node::{Element, Node, NodeType};
    use crate::markup::tree::Tree;

    /// Build a test tree for queries:
    /// ```text
    ///            root
    ///              |
    ///      Panel (#main)
    ///        /        \
    ///   VGroup        VGroup
    ///   /    \          |
    /// Text   Text      Text
    /// (a)   (b, .hot)  (c)
    /// ```
    fn build_query_tree() -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        let panel = tree.insert_child(root, Node::Element(Element::new("Panel").with_attr("id", "main")));
        let g1 = tree.insert_child(panel, Node::element("VGroup"));
        let g2 = tree.insert_child(panel, Node::element("VGroup"));
        tree.insert_child(g1, Node::Element(Element::new("Text").with_attr("label", "a")));
        tree.insert_child(
            g1,
            Node::Element(Element::new("Text").with_attr("label", "b").with_attr("class", "hot")),
        );
        tree.insert_child(g2, Node::Element(Element::new("Text").with_attr("label", "c")));
        tree.insert_child(g2, Node::comment(" note "));
        tree
    }

    fn label(tree: &Tree, id: crate::markup::NodeId) -> Option<String> {
        tree.get(id)?
            .as_element()?
            .attr("label")?
            .as_literal()
            .map(str::to_owned)
    }

    #[test]
    fn find_first_by_name() {
        let tree = build_query_tree();
        let text = tree.find(tree.root(), "Text").unwrap();
        assert_eq!(label(&tree, text).as_deref(), Some("a"));
        assert!(tree.find(tree.root(), "Slider").is_none());
    }

    #[test]
    fn find_all_by_name() {
        let tree = build_query_tree();
        assert_eq!(tree.find_all(tree.root(), "Text").len(), 3);
        assert_eq!(tree.find_all(tree.root(), "VGroup").len(), 2);
    }

    #[test]
    fn find_type_with_predicate() {
        let tree = build_query_tree();
        let comments = tree.find_type(tree.root(), NodeType::Comment, |_| true);
        assert_eq!(comments.len(), 1);
        let hot = tree.find_type(tree.root(), NodeType::Element, |node| {
            node.as_element().is_some_and(|el| el.has_attr("class"))
        });
        assert_eq!(hot.len(), 1);
    }

    #[test]
    fn find_by_attr_name_and_value() {
        let tree = build_query_tree();
        assert_eq!(tree.find_by_attr(tree.root(), "label", None).len(), 3);
        let c = tree.find_by_attr(tree.root(), "label", Some("c"));
        assert_eq!(c.len(), 1);
        assert_eq!(label(&tree, c[0]).as_deref(), Some("c"));
        assert!(tree.find_by_attr(tree.root(), "label", Some("z")).is_empty());
    }

    #[test]
    fn query_dotted_path() {
        let tree = build_query_tree();
        let root = tree.root();
        let b = tree.query(root, "Panel.VGroup.Text[1]").unwrap();
        assert_eq!(label(&tree, b).as_deref(), Some("b"));
        let c = tree.query(root, "Panel.VGroup[1].Text").unwrap();
        assert_eq!(label(&tree, c).as_deref(), Some("c"));
        assert_eq!(tree.query(root, ""), Some(root));
    }

    #[test]
    fn query_misses() {
        let tree = build_query_tree();
        let root = tree.root();
        assert!(tree.query(root, "Panel.Missing").is_none());
        assert!(tree.query(root, "Panel.VGroup[5]").is_none());
        assert!(tree.query(root, "Panel.VGroup[x]").is_none());
        assert!(tree.query(root, "Panel.VGroup[1").is_none());
    }
}
