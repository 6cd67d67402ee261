//! gopiler-util — shared foundation types for the gopiler pipeline.
//!
//! Every other gopiler crate depends on this one and this one depends on
//! nothing in the workspace. It provides:
//!
//! - [`Location`] — 1-based line/column source positions (spec.md §3).
//! - [`diag`] — the categorized diagnostics sink, component C1.
//! - [`tree`] — the generic n-ary [`tree::Node`]/[`tree::Tree`] shared by
//!   the CST and AST, component C2.
//! - [`index_vec`] — a typed-index arena, used for the symbol-table tree
//!   and the code generator's placeholder list.

mod error;
mod location;

pub mod diag;
pub mod index_vec;
pub mod tree;

pub use diag::{Counters, Diagnostics, Level};
pub use error::{Result, UtilError};
pub use index_vec::{Idx, IndexVec};
pub use location::Location;
pub use tree::{Labeled, Node, Tree};
