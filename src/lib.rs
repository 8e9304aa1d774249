//! # xtree
//!
//! Reactive template compilation: tagged markup in, live element tree out.
//!
//! A template is a list of literal segments with placeholders between them.
//! Compilation classifies each placeholder, parses the marker-annotated
//! markup into an arena tree, binds every attribute and content site to
//! reactive cells, and hands back a [`Compiled`] that can be projected onto
//! any external node model through a [`Sink`].
//!
//! ## Core Systems
//!
//! - **[`value`]**: dynamic values carried by cells and attributes
//! - **[`reactive`]**: cells, effects, batching, disposal (auto-tracking)
//! - **[`markup`]**: slotmap-backed tree, markup parser, queries, serializer
//! - **[`template`]**: placeholder classification, binding, compilation, sinks
//! - **[`config`]**: compile-time options
//! - **[`testing`]**: an in-memory [`Sink`] for tests

// Foundation
pub mod config;
pub mod value;

// Reactivity
pub mod reactive;

// Markup and templates
pub mod markup;
pub mod template;

// Test support
pub mod testing;

pub use config::CompileConfig;
pub use markup::{ParseError, Tree};
pub use reactive::{batch, flush, Cell, Disposables, Effect};
pub use template::{compile, compile_with, Compiled, Sink, Slot, Template};
pub use value::Value;
