//! Tree operations: insert, remove, splice, walk.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{Node, NodeId};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// Name of the synthetic element wrapping top-level nodes.
pub const ROOT_NAME: &str = "root";

/// A parsed markup tree, backed by a slotmap arena.
///
/// Every tree has a synthetic `root` element. Parent links are navigational
/// only; nodes are owned by the arena and freed by [`Tree::remove`].
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    root: NodeId,
}

impl Tree {
    /// Create a tree holding only the synthetic root element.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::element(ROOT_NAME));
        let mut children = SecondaryMap::new();
        children.insert(root, Vec::new());
        Self {
            nodes,
            children,
            parent: SecondaryMap::new(),
            root,
        }
    }

    /// The synthetic root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn insert_detached(&mut self, node: Node) -> NodeId {
        let id = self.nodes.insert(node);
        self.children.insert(id, Vec::new());
        id
    }

    /// Insert a node as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `parent` does not exist in the tree.
    pub fn insert_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        debug_assert!(self.nodes.contains_key(parent), "parent node does not exist");
        let id = self.insert_detached(node);
        self.parent.insert(id, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(id);
        }
        id
    }

    /// Insert `node` as the next sibling of `anchor`.
    ///
    /// Returns `None` when `anchor` is missing or is the root.
    pub fn insert_after(&mut self, anchor: NodeId, node: Node) -> Option<NodeId> {
        let parent = self.parent(anchor)?;
        let id = self.insert_detached(node);
        self.attach_after(parent, anchor, &[id]);
        Some(id)
    }

    fn attach_after(&mut self, parent: NodeId, anchor: NodeId, ids: &[NodeId]) {
        for &id in ids {
            self.parent.insert(id, parent);
        }
        if let Some(siblings) = self.children.get_mut(parent) {
            let at = siblings
                .iter()
                .position(|&c| c == anchor)
                .map_or(siblings.len(), |i| i + 1);
            siblings.splice(at..at, ids.iter().copied());
        }
    }

    /// Detach `id` from its parent, keeping its subtree in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }
    }

    /// Move `nodes` (with their subtrees) to directly after `anchor`, in order.
    ///
    /// Returns `false` without moving anything when `anchor` has no parent.
    pub fn after(&mut self, anchor: NodeId, nodes: &[NodeId]) -> bool {
        let Some(parent) = self.parent(anchor) else {
            return false;
        };
        let moving: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|&id| id != anchor && self.nodes.contains_key(id))
            .collect();
        for &id in &moving {
            self.detach(id);
        }
        self.attach_after(parent, anchor, &moving);
        true
    }

    /// Remove a node and all its descendants.
    ///
    /// Returns the removed node, or `None` if it didn't exist. The root can
    /// only be emptied, not removed.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        if id == self.root || !self.nodes.contains_key(id) {
            return None;
        }
        self.detach(id);
        self.free_subtree(id)
    }

    fn free_subtree(&mut self, id: NodeId) -> Option<Node> {
        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed = None;
        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            let node = self.nodes.remove(current);
            if current == id {
                removed = node;
            }
        }
        removed
    }

    /// Remove every child of `id`, recursively.
    pub fn empty(&mut self, id: NodeId) {
        let kids = self.children(id).to_vec();
        for child in kids {
            self.remove(child);
        }
    }

    /// Copy every top-level node of `other` (with subtrees) into this tree,
    /// directly after `anchor`. Returns the new top-level ids.
    pub fn graft(&mut self, anchor: NodeId, other: &Tree) -> Vec<NodeId> {
        let Some(parent) = self.parent(anchor) else {
            return Vec::new();
        };
        let copied: Vec<NodeId> = other
            .children(other.root)
            .iter()
            .filter_map(|&child| self.copy_subtree(other, child))
            .collect();
        self.attach_after(parent, anchor, &copied);
        copied
    }

    fn copy_subtree(&mut self, other: &Tree, id: NodeId) -> Option<NodeId> {
        let node = other.get(id)?.clone();
        let new_id = self.insert_detached(node);
        for &child in other.children(id) {
            if let Some(copy) = self.copy_subtree(other, child) {
                self.parent.insert(copy, new_id);
                if let Some(siblings) = self.children.get_mut(new_id) {
                    siblings.push(copy);
                }
            }
        }
        Some(new_id)
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no
    /// children or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Immutable access to a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable access to a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has no children.
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal of every node from `start`, inclusive.
    pub fn seek(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Like [`seek`](Self::seek), but yields elements only.
    pub fn walk(&self, start: NodeId) -> Vec<NodeId> {
        self.seek(start)
            .into_iter()
            .filter(|&id| matches!(self.nodes.get(id), Some(Node::Element(_))))
            .collect()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small test tree:
    /// ```text
    ///       root
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   "d"
    /// ```
    fn build_tree() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.insert_child(root, Node::element("a"));
        let b = tree.insert_child(root, Node::element("b"));
        let c = tree.insert_child(a, Node::element("c"));
        let d = tree.insert_child(a, Node::text("d"));
        (tree, a, b, c, d)
    }

    #[test]
    fn new_tree_has_root() {
        let tree = Tree::new();
        assert_eq!(tree.get(tree.root()).and_then(Node::name), Some(ROOT_NAME));
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn parent_and_children() {
        let (tree, a, b, c, d) = build_tree();
        assert_eq!(tree.children(tree.root()), &[a, b]);
        assert_eq!(tree.children(a), &[c, d]);
        assert_eq!(tree.parent(c), Some(a));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn remove_subtree() {
        let (mut tree, a, b, c, d) = build_tree();
        let removed = tree.remove(a);
        assert_eq!(removed.as_ref().and_then(Node::name), Some("a"));
        assert!(!tree.contains(c));
        assert!(!tree.contains(d));
        assert_eq!(tree.children(tree.root()), &[b]);
        assert_eq!(tree.len(), 2);
        assert!(tree.remove(a).is_none());
    }

    #[test]
    fn root_cannot_be_removed() {
        let (mut tree, ..) = build_tree();
        let root = tree.root();
        assert!(tree.remove(root).is_none());
        tree.empty(root);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn after_moves_nodes_in_order() {
        let (mut tree, a, b, c, d) = build_tree();
        assert!(tree.after(a, &[d, c]));
        assert_eq!(tree.children(tree.root()), &[a, d, c, b]);
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.parent(c), Some(tree.root()));
        assert!(!tree.after(tree.root(), &[a]));
    }

    #[test]
    fn insert_after_anchor() {
        let (mut tree, a, _b, c, d) = build_tree();
        let e = tree.insert_after(c, Node::text("e")).unwrap();
        assert_eq!(tree.children(a), &[c, e, d]);
    }

    #[test]
    fn graft_copies_top_level_nodes() {
        let (mut host, a, _b, c, d) = build_tree();
        let mut guest = Tree::new();
        let x = guest.insert_child(guest.root(), Node::element("x"));
        guest.insert_child(x, Node::text("inner"));
        guest.insert_child(guest.root(), Node::text("tail"));

        let added = host.graft(c, &guest);
        assert_eq!(added.len(), 2);
        assert_eq!(host.children(a), &[c, added[0], added[1], d]);
        assert_eq!(host.get(added[0]).and_then(Node::name), Some("x"));
        assert_eq!(host.children(added[0]).len(), 1);
        assert_eq!(host.parent(added[1]), Some(a));
    }

    #[test]
    fn seek_and_walk() {
        let (tree, a, b, c, d) = build_tree();
        let root = tree.root();
        assert_eq!(tree.seek(root), vec![root, a, c, d, b]);
        assert_eq!(tree.walk(root), vec![root, a, c, b]);
        assert_eq!(tree.seek(a), vec![a, c, d]);
    }
}
