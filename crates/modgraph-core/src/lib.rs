//! Core engine for module-level build ordering.
//!
//! This crate provides:
//! - Per-directory dependency graphs over deferred dependency lists
//! - Topological closure with cycle detection
//! - Multi-directory closure keyed by module identity
//! - Memoized, implementation-filtered compile orders
//! - Virtual library / implementation graph merging

pub mod deferred;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod module;

pub use deferred::{Deferred, Memo};
pub use error::{Error, InternalError, Result};
pub use graph::{DepGraph, DualGraph, GraphId, filter_implementations};
pub use manifest::Manifest;
pub use module::{Module, ModuleId, ModuleKind, ModuleName, ObjName, PerUnit, UnitKind, Visibility};
