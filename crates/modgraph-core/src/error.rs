//! Error types for modgraph-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::module::{Module, ModuleName, UnitKind};

/// Result type for modgraph-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in modgraph-core.
///
/// Errors are `Clone` because a failed deferred value is shared by every
/// caller awaiting it.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Circular module dependency. Fatal to the requesting build step.
    #[error("dependency cycle detected{}", cycle_report(.chain, .dir))]
    Cycle {
        chain: Vec<ModuleName>,
        dir: Option<PathBuf>,
    },

    /// A table handed to the engine was assembled incorrectly.
    #[error("internal error: {0}")]
    Internal(#[from] InternalError),

    /// Invalid project description.
    #[error("manifest error: {0}")]
    Manifest(String),
}

impl Error {
    /// Whether this error signals a defect in how the caller built its tables,
    /// as opposed to a problem in user-authored sources.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Caller defects. Never user-actionable.
#[derive(Debug, Clone, Error)]
pub enum InternalError {
    #[error("module {module} is not in the dependency graph of {} (known modules: {})", .dir.display(), join_names(.known))]
    MissingModule {
        dir: PathBuf,
        known: Vec<ModuleName>,
        module: ModuleName,
    },

    #[error("no dependency list for module {module}{}", .dir.as_ref().map(|d| format!(" in {}", d.display())).unwrap_or_default())]
    MissingDependencies {
        dir: Option<PathBuf>,
        module: ModuleName,
    },

    #[error("module {module} of {} is outside the dependency graph of {}", .owner.display(), .dir.display())]
    ForeignModule {
        dir: PathBuf,
        module: ModuleName,
        owner: PathBuf,
    },

    #[error("module {name} appears twice in the dependency graph of {}", .dir.display())]
    DuplicateModule { dir: PathBuf, name: ModuleName },

    #[error("deprecated alias {alias} has no counterpart module")]
    MissingCounterpart { alias: ModuleName },

    #[error("{unit} merge reached module {name} with no entry on either side")]
    UnreachableMerge { unit: UnitKind, name: ModuleName },

    #[error("{unit} merge cannot combine virtual module {} ({:?}) with implementation module {} ({:?})", .vlib.name(), .vlib.kind(), .implementation.name(), .implementation.kind())]
    UnmatchedMerge {
        unit: UnitKind,
        vlib: Box<Module>,
        implementation: Box<Module>,
    },
}

/// Renders a cycle chain as `-> name` lines, then the directory if known.
fn cycle_report(chain: &[ModuleName], dir: &Option<PathBuf>) -> String {
    let mut report = String::new();
    for name in chain {
        report.push_str("\n-> ");
        report.push_str(name.as_str());
    }
    if let Some(dir) = dir {
        report.push_str(&format!("\nin directory {}", dir.display()));
    }
    report
}

fn join_names(names: &[ModuleName]) -> String {
    names
        .iter()
        .map(ModuleName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
