//! Markup tree: slotmap arena, parser, queries, serialization.

pub mod node;
pub mod parser;
pub mod query;
pub mod serialize;
pub mod tree;

pub use node::{AttrValue, Attribute, Element, Node, NodeId, NodeType, TextContent};
pub use parser::{parse, parse_with, ParseError};
pub use tree::{Tree, ROOT_NAME};
