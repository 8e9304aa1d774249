//! Binding: rewrites a parsed, marker-annotated tree into its live form.
//!
//! Pass A turns every attribute into a cell-backed attribute. Pass B replaces
//! content marker comments with the nodes their values produce. Everything
//! created on behalf of the compilation is registered with its
//! [`Disposables`].

use crate::config::CompileConfig;
use crate::markup::{AttrValue, Attribute, Node, NodeId, NodeType, TextContent, Tree};
use crate::reactive::{derived, untracked, Cell, Disposables};
use crate::value::Value;

use super::classify::{MarkerTable, Role};
use super::compile::Slot;
use super::marker::{self, Piece};

/// Bind `tree` against `table`, registering cleanups with `disposables`.
pub(crate) fn bind(
    tree: &mut Tree,
    table: &mut MarkerTable<Slot>,
    disposables: &Disposables,
    config: &CompileConfig,
) {
    let mut binder = Binder {
        table,
        disposables,
        config,
    };
    binder.bind_attributes(tree);
    binder.bind_content(tree);
    binder.release_unresolved();
}

struct Binder<'a> {
    table: &'a mut MarkerTable<Slot>,
    disposables: &'a Disposables,
    config: &'a CompileConfig,
}

enum Part {
    Text(String),
    Cell(Cell<Value>),
}

impl Binder<'_> {
    // -----------------------------------------------------------------------
    // Pass A: attributes
    // -----------------------------------------------------------------------

    fn bind_attributes(&mut self, tree: &mut Tree) {
        for id in tree.walk(tree.root()) {
            let Some(el) = tree.get_mut(id).and_then(Node::as_element_mut) else {
                continue;
            };
            let raw = std::mem::take(&mut el.attributes);
            let mut bound = Vec::with_capacity(raw.len());
            for attr in raw {
                self.bind_attribute(attr, &mut bound);
            }
            el.attributes = bound;
        }
    }

    fn bind_attribute(&mut self, attr: Attribute, out: &mut Vec<Attribute>) {
        let Attribute { name, value } = attr;
        let raw = match value {
            AttrValue::Literal(raw) => raw,
            AttrValue::Bound(_) => {
                out.push(Attribute { name, value });
                return;
            }
        };

        if raw.is_empty() {
            let spread = marker::parse_marker(&name)
                .filter(|&id| self.table.accepts(id, Role::AttributeName, None));
            if let Some(id) = spread {
                self.spread(id, out);
                return;
            }
        }

        let exact = marker::parse_marker(&raw)
            .filter(|&id| self.table.accepts(id, Role::AttributeValue, Some(&name)));
        if let Some(id) = exact {
            if let Some(cell) = self.reference(id, &name) {
                out.push(Attribute::bound(name, cell));
            }
            return;
        }

        let pieces = marker::pieces(&raw);
        let composite = pieces.iter().any(|piece| match piece {
            Piece::Marker(id, _) => self.table.accepts(*id, Role::AttributeValue, Some(&name)),
            Piece::Text(_) => false,
        });
        let cell = if composite {
            self.composite(&name, &pieces)
        } else {
            self.owned_cell(Value::parse_literal(&raw))
        };
        out.push(Attribute::bound(name, cell));
    }

    fn owned_cell(&self, value: Value) -> Cell<Value> {
        let cell = Cell::new(value);
        self.disposables.add_cell(cell);
        cell
    }

    /// `name="::id"`: bind straight to the caller's cell.
    fn reference(&mut self, id: usize, name: &str) -> Option<Cell<Value>> {
        match self.table.take(id) {
            Some(Slot::Cell(cell)) => Some(cell),
            Some(Slot::Value(value)) => Some(self.owned_cell(value)),
            Some(Slot::Compiled(compiled)) => {
                tracing::warn!(marker = id, attribute = name, "compiled template used as an attribute value; ignored");
                self.disposables.chain(compiled.disposables());
                None
            }
            None => {
                tracing::warn!(marker = id, attribute = name, "attribute marker has no value; attribute dropped");
                None
            }
        }
    }

    /// `name="text ::id more"`: a derived cell re-interpolating the parts.
    ///
    /// Marker-like text this table did not emit for `name` stays literal.
    fn composite(&mut self, name: &str, pieces: &[Piece<'_>]) -> Cell<Value> {
        let mut parts: Vec<Part> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let part = match *piece {
                Piece::Marker(id, _) if self.table.accepts(id, Role::AttributeValue, Some(name)) => {
                    match self.table.take(id) {
                        Some(Slot::Cell(cell)) => Part::Cell(cell),
                        Some(Slot::Value(value)) => Part::Text(value.to_string()),
                        Some(Slot::Compiled(compiled)) => {
                            tracing::warn!(marker = id, attribute = name, "compiled template inside an attribute value; ignored");
                            self.disposables.chain(compiled.disposables());
                            Part::Text(String::new())
                        }
                        None => {
                            tracing::warn!(marker = id, attribute = name, "attribute marker has no value; rendered empty");
                            Part::Text(String::new())
                        }
                    }
                }
                _ => Part::Text(piece.source().to_owned()),
            };
            parts.push(part);
        }

        let render = move || {
            let text: String = parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => text.clone(),
                    Part::Cell(cell) => cell.try_get().unwrap_or_default().to_string(),
                })
                .collect();
            Value::parse_literal(&text)
        };

        let cell = derived(render);
        self.disposables.add_cell(cell);
        cell
    }

    /// `::id=""`: expand an object into one attribute per field, in place.
    fn spread(&mut self, id: usize, out: &mut Vec<Attribute>) {
        let object = match self.table.take(id) {
            Some(Slot::Cell(cell)) => untracked(|| cell.try_get()),
            Some(Slot::Value(value)) => Some(value),
            Some(Slot::Compiled(compiled)) => {
                tracing::warn!(marker = id, "compiled template used as a spread attribute; ignored");
                self.disposables.chain(compiled.disposables());
                return;
            }
            None => None,
        };
        let Some(fields) = object.as_ref().and_then(Value::fields) else {
            tracing::warn!(marker = id, "spread target is missing or not an object; attribute dropped");
            return;
        };
        for (key, value) in fields {
            let cell = self.owned_cell(value.clone());
            out.push(Attribute::bound(key.clone(), cell));
        }
    }

    // -----------------------------------------------------------------------
    // Pass B: content
    // -----------------------------------------------------------------------

    fn bind_content(&mut self, tree: &mut Tree) {
        let comments = tree.find_type(tree.root(), NodeType::Comment, |_| true);
        for anchor in comments {
            let id = tree
                .get(anchor)
                .and_then(Node::as_comment)
                .and_then(marker::parse_marker)
                .filter(|&id| self.table.accepts(id, Role::Content, None));
            // Not one of ours: a user comment that stays in the tree.
            let Some(id) = id else {
                continue;
            };
            let inserted = self.splice(tree, anchor, id);
            if inserted == 0 && self.config.warn_on_empty_splice {
                tracing::warn!(marker = id, "content marker produced no nodes");
            }
            tree.remove(anchor);
        }
    }

    /// Insert the nodes for marker `id` after `anchor`. Returns how many.
    fn splice(&mut self, tree: &mut Tree, anchor: NodeId, id: usize) -> usize {
        match self.table.take(id) {
            Some(Slot::Compiled(compiled)) => {
                self.disposables.chain(compiled.disposables());
                tree.graft(anchor, compiled.tree()).len()
            }
            Some(Slot::Cell(cell)) => {
                let text = Node::Text(TextContent::Bound(cell));
                usize::from(tree.insert_after(anchor, text).is_some())
            }
            Some(Slot::Value(Value::Null)) | None => 0,
            Some(Slot::Value(value)) => {
                let text = Node::text(value.to_string());
                usize::from(tree.insert_after(anchor, text).is_some())
            }
        }
    }

    /// Values whose marker never made it into the tree.
    fn release_unresolved(&mut self) {
        for (id, slot) in self.table.drain_remaining() {
            tracing::warn!(marker = id, "marker not found in parsed markup; value unused");
            if let Slot::Compiled(compiled) = slot {
                self.disposables.chain(compiled.disposables());
            }
        }
    }
}
