//! Multi-directory closure and the memoized compile-order entry points.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use super::closure;
use super::types::{DepGraph, GraphId, closure_failed};
use crate::deferred::{Deferred, Memo};
use crate::error::InternalError;
use crate::module::{Module, ModuleId, UnitKind};

/// Memo key: which graphs were closed over which requested modules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClosureKey {
    graphs: Vec<GraphId>,
    modules: Vec<ModuleId>,
}

impl ClosureKey {
    fn new(graphs: impl IntoIterator<Item = GraphId>, modules: &[Module]) -> Self {
        Self {
            graphs: graphs.into_iter().collect(),
            modules: modules.iter().map(Module::id).collect(),
        }
    }
}

// Entries are never evicted: every ordering requested here, and the graphs'
// deferred values it captured, stay alive for the rest of the process.
static TOP_CLOSED_IMPLEMENTATIONS: LazyLock<Memo<ClosureKey, Vec<Module>>> =
    LazyLock::new(|| Memo::new("top sorted implementations"));

static TOP_CLOSED_MULTI_IMPLEMENTATIONS: LazyLock<Memo<ClosureKey, Vec<Module>>> =
    LazyLock::new(|| Memo::new("top sorted multi implementations"));

/// Drop modules without an implementation unit.
///
/// Interface-only modules produce no object code, so they never take part in
/// compile or link ordering.
pub fn filter_implementations(mut modules: Vec<Module>) -> Vec<Module> {
    modules.retain(|m| m.has(UnitKind::Implementation));
    modules
}

impl DepGraph {
    /// Order modules spanning several directories.
    ///
    /// Dependency lists are merged by module identity rather than name, so
    /// directories may reuse short names. Fragments for one identity are
    /// concatenated in input order; only membership matters to the closure.
    /// Cycle reports carry no directory since a cycle may cross several.
    pub fn top_closed_multi(graphs: &[DepGraph], modules: Vec<Module>) -> Deferred<Vec<Module>> {
        let rows: Vec<_> = graphs
            .iter()
            .flat_map(|graph| graph.entries().values())
            .map(|entry| {
                let id = entry.module.id();
                entry.deps.clone().map(move |deps| (id, deps))
            })
            .collect();

        Deferred::join_all(rows).try_map(move |rows| {
            let mut table: FxHashMap<ModuleId, Vec<Module>> = FxHashMap::default();
            for (id, deps) in rows {
                table.entry(id).or_default().extend(deps);
            }
            tracing::debug!(identities = table.len(), "assembled multi-directory table");

            let order = closure::top_closure(&modules, Module::id, |m| {
                table.get(&m.id()).cloned().ok_or_else(|| {
                    InternalError::MissingDependencies {
                        dir: None,
                        module: m.name().clone(),
                    }
                    .into()
                })
            })
            .map_err(|e| closure_failed(e, None))?;
            Ok(order)
        })
    }

    /// Compile order of the implementation units among `modules`.
    ///
    /// Interface-only modules are dropped from the request and from the
    /// result. Computed at most once per graph and request.
    pub fn top_closed_implementations(&self, modules: Vec<Module>) -> Deferred<Vec<Module>> {
        let modules = filter_implementations(modules);
        let key = ClosureKey::new([self.id()], &modules);
        TOP_CLOSED_IMPLEMENTATIONS.exec(key, || {
            self.top_closed(modules).map(filter_implementations)
        })
    }

    /// Like [`DepGraph::top_closed_implementations`], across several directories.
    pub fn top_closed_multi_implementations(
        graphs: &[DepGraph],
        modules: Vec<Module>,
    ) -> Deferred<Vec<Module>> {
        let modules = filter_implementations(modules);
        let key = ClosureKey::new(graphs.iter().map(DepGraph::id), &modules);
        TOP_CLOSED_MULTI_IMPLEMENTATIONS.exec(key, || {
            Self::top_closed_multi(graphs, modules).map(filter_implementations)
        })
    }
}
