//! Types for the graph engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use super::closure::{self, ClosureError};
use crate::deferred::Deferred;
use crate::error::{Error, InternalError, Result};
use crate::module::{Module, ModuleName};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identifier of a constructed graph.
///
/// Graphs never change after construction, so the id stands for the content
/// and is what memoized orderings are keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphId(u64);

impl GraphId {
    fn fresh() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A module together with its pending dependency list.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) module: Module,
    pub(crate) deps: Deferred<Vec<Module>>,
}

/// Dependency graph of the modules of one directory.
///
/// Holds exactly one entry per module in scope, keyed by module name.
#[derive(Debug, Clone)]
pub struct DepGraph {
    id: GraphId,
    dir: Arc<Path>,
    per_module: BTreeMap<ModuleName, Entry>,
}

impl DepGraph {
    /// Build a graph from each module's deferred dependency list.
    ///
    /// Fails if two modules share a name.
    pub fn new<I>(dir: impl Into<PathBuf>, per_module: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Module, Deferred<Vec<Module>>)>,
    {
        let dir: PathBuf = dir.into();
        let mut table = BTreeMap::new();
        for (module, deps) in per_module {
            let name = module.name().clone();
            if table.contains_key(&name) {
                return Err(InternalError::DuplicateModule { dir, name }.into());
            }
            table.insert(name, Entry { module, deps });
        }
        Ok(Self::from_entries(Arc::from(dir), table))
    }

    pub(crate) fn from_entries(dir: Arc<Path>, per_module: BTreeMap<ModuleName, Entry>) -> Self {
        Self {
            id: GraphId::fresh(),
            dir,
            per_module,
        }
    }

    pub(crate) fn entries(&self) -> &BTreeMap<ModuleName, Entry> {
        &self.per_module
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Modules in scope, ordered by name.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.per_module.values().map(|entry| &entry.module)
    }

    pub fn contains(&self, name: &ModuleName) -> bool {
        self.per_module.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.per_module.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_module.is_empty()
    }

    /// Deferred dependency list of `module`.
    ///
    /// A miss means the caller assembled the graph without this module.
    pub fn deps_of(&self, module: &Module) -> Result<&Deferred<Vec<Module>>> {
        self.per_module
            .get(module.name())
            .map(|entry| &entry.deps)
            .ok_or_else(|| {
                InternalError::MissingModule {
                    dir: self.dir.to_path_buf(),
                    known: self.per_module.keys().cloned().collect(),
                    module: module.name().clone(),
                }
                .into()
            })
    }

    /// Order `modules` and everything they depend on in this directory.
    ///
    /// Forces every dependency list of the graph, then closes over `modules`.
    /// Dependencies come before their dependents.
    pub fn top_closed(&self, modules: Vec<Module>) -> Deferred<Vec<Module>> {
        let dir = Arc::clone(&self.dir);
        let rows = self.per_module.iter().map(|(name, entry)| {
            let name = name.clone();
            entry.deps.clone().map(move |deps| (name, deps))
        });

        Deferred::join_all(rows).try_map(move |rows| {
            let table: FxHashMap<ModuleName, Vec<Module>> = rows.into_iter().collect();
            // Nodes are keyed by name, so anything from another directory
            // would be mistaken for the local module of the same name.
            if let Some(foreign) = modules.iter().find(|m| m.dir() != &*dir) {
                return Err(closure_failed(
                    ClosureError::Edges(foreign_module(&dir, foreign)),
                    Some(&*dir),
                ));
            }
            let order = closure::top_closure(
                &modules,
                |m| m.name().clone(),
                |m| {
                    let deps = table.get(m.name()).ok_or_else(|| {
                        Error::from(InternalError::MissingDependencies {
                            dir: Some(dir.to_path_buf()),
                            module: m.name().clone(),
                        })
                    })?;
                    match deps.iter().find(|d| d.dir() != &*dir) {
                        Some(foreign) => Err(foreign_module(&dir, foreign)),
                        None => Ok(deps.clone()),
                    }
                },
            )
            .map_err(|e| closure_failed(e, Some(&*dir)))?;

            tracing::debug!(
                dir = %dir.display(),
                requested = modules.len(),
                ordered = order.len(),
                "closed module dependencies"
            );
            Ok(order)
        })
    }
}

fn foreign_module(dir: &Path, module: &Module) -> Error {
    InternalError::ForeignModule {
        dir: dir.to_path_buf(),
        module: module.name().clone(),
        owner: module.dir().to_path_buf(),
    }
    .into()
}

/// Turn a closure failure into the crate error, logging it.
pub(crate) fn closure_failed(err: ClosureError<Module>, dir: Option<&Path>) -> Error {
    let err = match err {
        ClosureError::Cycle(chain) => Error::Cycle {
            chain: chain.into_iter().map(|m| m.name().clone()).collect(),
            dir: dir.map(Path::to_path_buf),
        },
        ClosureError::Edges(err) => err,
    };
    tracing::error!("{}", err);
    err
}
