//! Template compilation: classify placeholders, parse, bind, materialize.
//!
//! - [`classify`]: marks each placeholder by syntactic role.
//! - [`compile`] / [`compile_with`]: classify, parse and bind in one call.
//! - [`Template`]: builder over segments and values.
//! - [`Sink`] / [`materialize`]: project a bound tree onto an external model.

pub mod bind;
pub mod classify;
pub mod compile;
pub mod marker;
pub mod materialize;

pub use classify::{classify, Classified, MarkerTable, Role, ScanState};
pub use compile::{compile, compile_with, Compiled, Slot, Template};
pub use materialize::{materialize, Sink};
