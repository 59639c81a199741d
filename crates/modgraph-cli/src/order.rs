//! Order commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use modgraph_core::manifest::LoadedDirectory;
use modgraph_core::{
    Deferred, DepGraph, DualGraph, Manifest, Module, ModuleKind, ModuleName, UnitKind,
};

fn load(manifest: &Path) -> Result<Vec<LoadedDirectory>> {
    let loaded = Manifest::from_path(manifest)?
        .load()
        .with_context(|| format!("failed to load {}", manifest.display()))?;
    tracing::debug!(directories = loaded.len(), "manifest loaded");
    Ok(loaded)
}

fn find<'a>(loaded: &'a [LoadedDirectory], dir: &Path) -> Result<&'a LoadedDirectory> {
    match loaded.iter().find(|d| d.dir == dir) {
        Some(found) => Ok(found),
        None => bail!("directory {} is not in the manifest", dir.display()),
    }
}

/// `selected` plus every directory their dependencies reach, in discovery order.
async fn reachable<'a>(
    loaded: &'a [LoadedDirectory],
    mut selected: Vec<&'a LoadedDirectory>,
    unit: UnitKind,
) -> Result<Vec<&'a LoadedDirectory>> {
    let mut next = 0;
    while next < selected.len() {
        let current: &'a LoadedDirectory = selected[next];
        next += 1;
        let graph = current.graphs.get(unit);
        for module in graph.modules() {
            for dep in graph.deps_of(module)?.get().await? {
                if selected.iter().all(|d| d.dir != dep.dir()) {
                    tracing::debug!(from = %current.dir.display(), to = %dep.dir().display(), "following dependency into directory");
                    selected.push(find(loaded, dep.dir())?);
                }
            }
        }
    }
    Ok(selected)
}

/// Compile order of the selected directories.
///
/// Directories reached through dependencies are ordered along with them. A
/// single directory uses the per-directory closure; several are ordered
/// together, keyed by module identity.
pub async fn directories(
    manifest: &Path,
    dirs: &[PathBuf],
    unit: UnitKind,
    names: &[String],
) -> Result<Vec<String>> {
    let loaded = load(manifest)?;
    let selected: Vec<&LoadedDirectory> = if dirs.is_empty() {
        loaded.iter().collect()
    } else {
        dirs.iter()
            .map(|dir| find(&loaded, dir))
            .collect::<Result<_>>()?
    };

    let candidates: Vec<Module> = selected
        .iter()
        .flat_map(|d| d.modules.iter().cloned())
        .collect();
    let requested = if names.is_empty() {
        candidates
    } else {
        let mut requested = Vec::new();
        for name in names {
            let matching: Vec<Module> = candidates
                .iter()
                .filter(|m| m.name().as_str() == name)
                .cloned()
                .collect();
            if matching.is_empty() {
                bail!("module {} is not in the selected directories", name);
            }
            requested.extend(matching);
        }
        requested
    };

    let selected = reachable(&loaded, selected, unit).await?;
    if let [single] = selected.as_slice() {
        let order = single
            .graphs
            .get(unit)
            .top_closed_implementations(requested)
            .await?;
        Ok(order.iter().map(|m| m.name().to_string()).collect())
    } else {
        let graphs: Vec<DepGraph> = selected.iter().map(|d| d.graphs.get(unit).clone()).collect();
        let order = DepGraph::top_closed_multi_implementations(&graphs, requested).await?;
        Ok(order.iter().map(qualified).collect())
    }
}

/// Compile order of `implementation` once merged with its virtual library.
pub async fn virtual_implementation(
    manifest: &Path,
    vlib: &Path,
    implementation: &Path,
    unit: UnitKind,
) -> Result<Vec<String>> {
    let loaded = load(manifest)?;
    let vlib = find(&loaded, vlib)?;
    let implementation = find(&loaded, implementation)?;

    let merged = DualGraph::merge_for_impl(&vlib.graphs, &implementation.graphs)?;
    let graph = match unit {
        UnitKind::Implementation => merged.implementation,
        UnitKind::Interface => detach_slots(&merged.interface, &implementation.modules)?,
    };
    let order = graph
        .top_closed_implementations(graph.modules().cloned().collect())
        .await?;
    Ok(order.iter().map(|m| m.name().to_string()).collect())
}

/// Copy of the merged interface graph without edges to the slots it dropped.
///
/// A slot's interface comes from the virtual library, so it is a prerequisite
/// that is already built rather than part of this order.
fn detach_slots(graph: &DepGraph, modules: &[Module]) -> Result<DepGraph> {
    let slots: Vec<ModuleName> = modules
        .iter()
        .filter(|m| m.kind() == ModuleKind::VirtualSlotImplementation && !graph.contains(m.name()))
        .map(|m| m.name().clone())
        .collect();

    let rows = graph
        .modules()
        .map(|module| -> Result<(Module, Deferred<Vec<Module>>)> {
            let slots = slots.clone();
            let deps = graph.deps_of(module)?.clone().map(move |deps| {
                deps.into_iter()
                    .filter(|d| !(is_slot_kind(d.kind()) && slots.contains(d.name())))
                    .collect()
            });
            Ok((module.clone(), deps))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DepGraph::new(graph.dir(), rows)?)
}

fn is_slot_kind(kind: ModuleKind) -> bool {
    matches!(kind, ModuleKind::Virtual | ModuleKind::VirtualSlotImplementation)
}

fn qualified(module: &Module) -> String {
    format!("{}/{}", module.dir().display(), module.name())
}
