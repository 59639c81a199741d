//! Interface/implementation graph pairs.
//!
//! A module's interface and implementation parts may depend on different
//! modules, so each directory gets one graph per unit kind. This file also
//! holds the degenerate constructors and the merge that combines a virtual
//! library with the implementation chosen for it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::types::{DepGraph, Entry};
use crate::deferred::Deferred;
use crate::error::{InternalError, Result};
use crate::module::{Module, ModuleKind, ModuleName, PerUnit, UnitKind, Visibility};

/// One dependency graph per unit kind, for the same directory.
pub type DualGraph = PerUnit<DepGraph>;

impl DepGraph {
    /// Single-module graph with no dependencies, for synthetic modules.
    pub fn dummy(module: Module) -> Self {
        let dir: Arc<Path> = Arc::from(module.dir());
        let name = module.name().clone();
        let entry = Entry {
            module,
            deps: Deferred::ready(Vec::new()),
        };
        Self::from_entries(dir, BTreeMap::from([(name, entry)]))
    }

    /// Graph over deprecated aliases, each depending on its real counterpart.
    ///
    /// The counterpart is the module of `modules` with the alias's name. Real
    /// modules get no entry of their own.
    pub fn wrapped_compat(
        dir: impl Into<PathBuf>,
        modules: &[Module],
        aliases: &[Module],
    ) -> Result<Self> {
        let by_name: FxHashMap<&ModuleName, &Module> =
            modules.iter().map(|m| (m.name(), m)).collect();

        let mut per_module = BTreeMap::new();
        for alias in aliases {
            let target = by_name.get(alias.name()).ok_or_else(|| {
                InternalError::MissingCounterpart {
                    alias: alias.name().clone(),
                }
            })?;
            let entry = Entry {
                module: alias.clone(),
                deps: Deferred::ready(vec![(*target).clone()]),
            };
            per_module.insert(alias.name().clone(), entry);
        }

        let dir: PathBuf = dir.into();
        Ok(Self::from_entries(Arc::from(dir), per_module))
    }
}

/// How a module present in both the virtual library and the implementation
/// is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pairing {
    /// Virtual declaration filled by its slot implementation.
    Slot,
    /// At least one side is private; the implementation wins.
    Private,
    /// Nothing upstream should produce this shape.
    Unmatched,
}

impl Pairing {
    fn of(vlib: &Module, implementation: &Module) -> Self {
        match (
            vlib.kind(),
            implementation.kind(),
            vlib.visibility(),
            implementation.visibility(),
        ) {
            (ModuleKind::Virtual, ModuleKind::VirtualSlotImplementation, _, _)
                if vlib.obj_name() == implementation.obj_name() =>
            {
                Self::Slot
            }
            (_, _, Visibility::Private, _) | (_, _, _, Visibility::Private) => Self::Private,
            (_, _, Visibility::Public, Visibility::Public) => Self::Unmatched,
        }
    }
}

impl PerUnit<DepGraph> {
    /// Dual graph holding only `module`, with no dependencies.
    pub fn dummy(module: Module) -> Self {
        PerUnit::both(DepGraph::dummy(module))
    }

    /// Dual graph over deprecated aliases; see [`DepGraph::wrapped_compat`].
    pub fn wrapped_compat(
        dir: impl Into<PathBuf>,
        modules: &[Module],
        aliases: &[Module],
    ) -> Result<Self> {
        DepGraph::wrapped_compat(dir, modules, aliases).map(PerUnit::both)
    }

    /// Graphs used to compile `implementation` against the virtual library
    /// `vlib`. The result is scoped to the implementation's directory.
    ///
    /// Per module name:
    /// - only in `vlib`: dropped;
    /// - only in `implementation`: kept;
    /// - virtual slot filled by the implementation: the implementation's
    ///   dependencies for the implementation unit, no entry for the interface
    ///   unit, whose interface is fixed by the virtual declaration;
    /// - either side private: the implementation's entry;
    /// - anything else is an internal error.
    pub fn merge_for_impl(vlib: &DualGraph, implementation: &DualGraph) -> Result<DualGraph> {
        PerUnit::try_from_fn(|unit| merge_unit(unit, vlib.get(unit), implementation.get(unit)))
    }
}

fn merge_unit(unit: UnitKind, vlib: &DepGraph, implementation: &DepGraph) -> Result<DepGraph> {
    let vlib_entries = vlib.entries();
    let impl_entries = implementation.entries();
    let names: BTreeSet<&ModuleName> = vlib_entries.keys().chain(impl_entries.keys()).collect();

    let mut per_module = BTreeMap::new();
    for name in names {
        let kept = match (vlib_entries.get(name), impl_entries.get(name)) {
            (None, None) => {
                return Err(InternalError::UnreachableMerge {
                    unit,
                    name: name.clone(),
                }
                .into());
            }
            (Some(_), None) => None,
            (None, Some(entry)) => Some(entry),
            (Some(v), Some(i)) => match Pairing::of(&v.module, &i.module) {
                Pairing::Slot => {
                    tracing::debug!(module = %name, %unit, "virtual slot filled by implementation");
                    match unit {
                        UnitKind::Interface => None,
                        UnitKind::Implementation => Some(i),
                    }
                }
                Pairing::Private => Some(i),
                Pairing::Unmatched => {
                    return Err(InternalError::UnmatchedMerge {
                        unit,
                        vlib: Box::new(v.module.clone()),
                        implementation: Box::new(i.module.clone()),
                    }
                    .into());
                }
            },
        };
        if let Some(entry) = kept {
            per_module.insert(name.clone(), entry.clone());
        }
    }

    Ok(DepGraph::from_entries(
        Arc::from(implementation.dir()),
        per_module,
    ))
}
