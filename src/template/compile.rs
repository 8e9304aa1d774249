//! Compilation entry points: segments + values in, live tree out.

use std::rc::Rc;

use crate::config::CompileConfig;
use crate::markup::{parse_with, Node, NodeId, NodeType, ParseError, Tree};
use crate::reactive::{Cell, Disposables};
use crate::value::Value;

use super::bind::bind;
use super::classify::{classify, Classified, MarkerTable};
use super::materialize::{materialize, Sink};

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// A placeholder value.
///
/// Tagged explicitly: a [`Slot::Cell`] is bound live, a [`Slot::Value`] is
/// copied into a cell owned by the compilation, and a [`Slot::Compiled`] is
/// spliced in as a subtree.
#[derive(Debug)]
pub enum Slot {
    Cell(Cell<Value>),
    Value(Value),
    Compiled(Compiled),
}

impl From<Cell<Value>> for Slot {
    fn from(cell: Cell<Value>) -> Self {
        Slot::Cell(cell)
    }
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        Slot::Value(value)
    }
}

impl From<Compiled> for Slot {
    fn from(compiled: Compiled) -> Self {
        Slot::Compiled(compiled)
    }
}

impl From<&str> for Slot {
    fn from(text: &str) -> Self {
        Slot::Value(Value::from(text))
    }
}

impl From<String> for Slot {
    fn from(text: String) -> Self {
        Slot::Value(Value::from(text))
    }
}

impl From<f64> for Slot {
    fn from(n: f64) -> Self {
        Slot::Value(Value::from(n))
    }
}

impl From<i32> for Slot {
    fn from(n: i32) -> Self {
        Slot::Value(Value::from(n))
    }
}

impl From<bool> for Slot {
    fn from(b: bool) -> Self {
        Slot::Value(Value::from(b))
    }
}

// ---------------------------------------------------------------------------
// Compiled
// ---------------------------------------------------------------------------

/// A bound tree plus everything that must be released with it.
///
/// Nothing is released on drop; call [`Compiled::dispose`].
#[derive(Debug)]
pub struct Compiled {
    tree: Tree,
    disposables: Disposables,
    elect_single_root: bool,
}

impl Compiled {
    /// The node materialization starts from.
    ///
    /// With root election on, a tree with exactly one non-comment top-level
    /// node is rooted at that node; otherwise at the synthetic `root` element.
    pub fn root(&self) -> NodeId {
        let root = self.tree.root();
        if !self.elect_single_root {
            return root;
        }
        let mut top = self.tree.children(root).iter().copied().filter(|&id| {
            self.tree
                .get(id)
                .is_some_and(|node| node.node_type() != NodeType::Comment)
        });
        match (top.next(), top.next()) {
            (Some(only), None) => only,
            _ => root,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The root node's data.
    pub fn root_node(&self) -> Option<&Node> {
        self.tree.get(self.root())
    }

    pub fn disposables(&self) -> &Disposables {
        &self.disposables
    }

    /// Release every cell, subscription and nested compilation created for
    /// this result. Idempotent. Cells passed in by the caller stay alive.
    pub fn dispose(&self) {
        self.disposables.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposables.is_disposed()
    }

    /// Serialize the current state of the bound tree.
    pub fn to_markup(&self) -> String {
        self.tree.to_markup(self.root())
    }

    /// Project the tree into `sink`, keeping attributes and bound text live
    /// until [`dispose`](Self::dispose).
    pub fn materialize_into<S: Sink + 'static>(&self, sink: &Rc<S>) -> Option<S::Node> {
        materialize(&self.tree, self.root(), sink, &self.disposables)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Compile with the default configuration.
///
/// `segments` are the literal parts of the template; placeholder `i` sits
/// between `segments[i]` and `segments[i + 1]`.
///
/// ```ignore
/// let name = Cell::new(Value::from("x"));
/// let compiled = compile(&["<b class=\"", "\">hi</b>"], vec![name.into()])?;
/// ```
pub fn compile(segments: &[&str], values: Vec<Slot>) -> Result<Compiled, ParseError> {
    compile_with(&CompileConfig::default(), segments, values)
}

/// Classify, parse and bind.
///
/// On a parse error, nested compiled values are disposed before the error is
/// returned.
pub fn compile_with(
    config: &CompileConfig,
    segments: &[&str],
    values: Vec<Slot>,
) -> Result<Compiled, ParseError> {
    let Classified { markup, mut table } = classify(segments, values);
    let mut tree = match parse_with(&markup, config) {
        Ok(tree) => tree,
        Err(err) => {
            discard(&mut table);
            return Err(err);
        }
    };

    let disposables = Disposables::new();
    bind(&mut tree, &mut table, &disposables, config);

    Ok(Compiled {
        tree,
        disposables,
        elect_single_root: config.elect_single_root,
    })
}

fn discard(table: &mut MarkerTable<Slot>) {
    for (_, slot) in table.drain_remaining() {
        if let Slot::Compiled(compiled) = slot {
            compiled.dispose();
        }
    }
}

// ---------------------------------------------------------------------------
// Template builder
// ---------------------------------------------------------------------------

/// Incremental template builder.
///
/// ```ignore
/// let compiled = Template::new()
///     .text("<p>")
///     .value(Cell::new(Value::from("hi")))
///     .text("</p>")
///     .compile()?;
/// ```
#[derive(Debug)]
pub struct Template {
    segments: Vec<String>,
    values: Vec<Slot>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    pub fn new() -> Self {
        Self {
            segments: vec![String::new()],
            values: Vec::new(),
        }
    }

    /// Append literal text (builder).
    pub fn text(mut self, text: &str) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.push_str(text);
        }
        self
    }

    /// Append a placeholder (builder).
    pub fn value(mut self, value: impl Into<Slot>) -> Self {
        self.values.push(value.into());
        self.segments.push(String::new());
        self
    }

    pub fn compile(self) -> Result<Compiled, ParseError> {
        self.compile_with(&CompileConfig::default())
    }

    pub fn compile_with(self, config: &CompileConfig) -> Result<Compiled, ParseError> {
        let segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        compile_with(config, &segments, self.values)
    }
}
