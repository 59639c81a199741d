//! Graph engine for module build ordering.
//!
//! This module provides:
//! - Per-directory dependency graphs over deferred dependency lists
//! - Topological closure with cycle detection
//! - Multi-directory closure keyed by module identity
//! - Memoized, implementation-filtered orderings
//! - Degenerate graphs and the virtual/implementation merge

pub mod closure;
mod dual;
mod ordering;
mod types;

pub use dual::DualGraph;
pub use ordering::filter_implementations;
pub use types::{DepGraph, GraphId};
