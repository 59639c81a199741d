//! JSON project descriptions.
//!
//! A manifest lists directories, their modules, and each module's interface
//! and implementation dependencies. Loading it yields one [`DualGraph`] per
//! directory.
//!
//! ```json
//! { "directories": [ { "dir": "lib/a",
//!     "modules": [ { "name": "A", "obj_name": "a__A", "kind": "implementation",
//!                    "deps": { "intf": ["B"], "impl": ["B", "other/dir:C"] } } ] } ] }
//! ```
//!
//! A dependency is a module name of the same directory, or `dir:Name` for a
//! module of another directory. The name is what follows the last `:`, so
//! directories may contain `:` but module names may not.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::deferred::Deferred;
use crate::error::{Error, Result};
use crate::graph::{DepGraph, DualGraph};
use crate::module::{Module, ModuleKind, ModuleName, PerUnit, UnitKind, Visibility};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub directories: Vec<DirectoryManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryManifest {
    pub dir: PathBuf,
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub name: String,
    /// Defaults to `name`.
    #[serde(default)]
    pub obj_name: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: ModuleKind,
    #[serde(default)]
    pub visibility: Visibility,
    /// Whether the module has an interface unit. Defaults from `kind`.
    #[serde(default)]
    pub intf: Option<bool>,
    /// Whether the module has an implementation unit. Defaults from `kind`.
    #[serde(default, rename = "impl")]
    pub implementation: Option<bool>,
    #[serde(default)]
    pub deps: PerUnit<Vec<String>>,
}

fn default_kind() -> ModuleKind {
    ModuleKind::Implementation
}

/// A directory of the manifest, resolved.
#[derive(Debug, Clone)]
pub struct LoadedDirectory {
    pub dir: PathBuf,
    /// Modules in manifest order.
    pub modules: Vec<Module>,
    pub graphs: DualGraph,
}

impl ModuleManifest {
    fn to_module(&self, dir: &Path) -> Module {
        let obj_name = self.obj_name.as_deref().unwrap_or(&self.name);
        let module = Module::new(dir, &self.name, obj_name, self.kind).with_visibility(self.visibility);
        let units = PerUnit::new(
            self.intf.unwrap_or(module.has(UnitKind::Interface)),
            self.implementation
                .unwrap_or(module.has(UnitKind::Implementation)),
        );
        module.with_units(units)
    }
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Manifest(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Manifest(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Resolve every directory into modules and dual graphs.
    pub fn load(&self) -> Result<Vec<LoadedDirectory>> {
        // (dir, name) -> module, across the whole project
        let mut table: FxHashMap<(PathBuf, ModuleName), Module> = FxHashMap::default();
        let mut resolved = Vec::with_capacity(self.directories.len());

        for directory in &self.directories {
            let mut modules = Vec::with_capacity(directory.modules.len());
            for spec in &directory.modules {
                if spec.name.contains(':') {
                    return Err(Error::Manifest(format!(
                        "module name {} in {} contains ':'",
                        spec.name,
                        directory.dir.display()
                    )));
                }
                let module = spec.to_module(&directory.dir);
                let key = (directory.dir.clone(), module.name().clone());
                if table.insert(key, module.clone()).is_some() {
                    return Err(Error::Manifest(format!(
                        "module {} declared twice in {}",
                        spec.name,
                        directory.dir.display()
                    )));
                }
                modules.push(module);
            }
            resolved.push(modules);
        }

        self.directories
            .iter()
            .zip(resolved)
            .map(|(directory, modules)| -> Result<LoadedDirectory> {
                let graphs = PerUnit::try_from_fn(|unit| {
                    let rows = directory
                        .modules
                        .iter()
                        .zip(&modules)
                        .map(|(spec, module)| -> Result<(Module, Deferred<Vec<Module>>)> {
                            let deps = spec
                                .deps
                                .get(unit)
                                .iter()
                                .map(|dep| lookup(&table, &directory.dir, dep))
                                .collect::<Result<Vec<_>>>()?;
                            Ok((module.clone(), Deferred::ready(deps)))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    DepGraph::new(directory.dir.clone(), rows)
                })?;
                tracing::debug!(dir = %directory.dir.display(), modules = modules.len(), "loaded directory");
                Ok(LoadedDirectory {
                    dir: directory.dir.clone(),
                    modules,
                    graphs,
                })
            })
            .collect()
    }
}

fn lookup(
    table: &FxHashMap<(PathBuf, ModuleName), Module>,
    dir: &Path,
    dep: &str,
) -> Result<Module> {
    let (dir, name) = match dep.rsplit_once(':') {
        Some((other, name)) => (PathBuf::from(other), name),
        None => (dir.to_path_buf(), dep),
    };
    table
        .get(&(dir.clone(), ModuleName::new(name)))
        .cloned()
        .ok_or_else(|| {
            Error::Manifest(format!("unknown module {} in {}", name, dir.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
    {
      "directories": [
        {
          "dir": "lib/core",
          "modules": [
            { "name": "Types", "kind": "interface_only" },
            { "name": "Util", "obj_name": "core__Util",
              "deps": { "intf": ["Types"], "impl": ["Types"] } }
          ]
        },
        {
          "dir": "bin",
          "modules": [
            { "name": "Util", "visibility": "private" },
            { "name": "Main", "deps": { "impl": ["Util", "lib/core:Util"] } }
          ]
        }
      ]
    }
    "#;

    #[test]
    fn test_defaults() {
        let manifest = Manifest::from_json(PROJECT).unwrap();
        let loaded = manifest.load().unwrap();
        assert_eq!(loaded.len(), 2);

        let types = &loaded[0].modules[0];
        assert_eq!(types.kind(), ModuleKind::InterfaceOnly);
        assert!(!types.has(UnitKind::Implementation));

        let util = &loaded[0].modules[1];
        assert_eq!(util.obj_name().as_str(), "core__Util");
        assert_eq!(util.kind(), ModuleKind::Implementation);

        let bin_util = &loaded[1].modules[0];
        assert!(bin_util.is_private());
        assert_eq!(bin_util.obj_name().as_str(), "Util");
    }

    #[tokio::test]
    async fn test_cross_directory_order() {
        let loaded = Manifest::from_json(PROJECT).unwrap().load().unwrap();
        let graphs: Vec<DepGraph> = loaded
            .iter()
            .map(|d| d.graphs.get(UnitKind::Implementation).clone())
            .collect();
        let main = loaded[1].modules[1].clone();

        let order = DepGraph::top_closed_multi_implementations(&graphs, vec![main])
            .get()
            .await
            .unwrap();
        let order: Vec<String> = order
            .iter()
            .map(|m| format!("{}:{}", m.dir().display(), m.name()))
            .collect();
        assert_eq!(order.len(), 3);
        assert_eq!(order[2], "bin:Main");
        assert!(order.contains(&"lib/core:Util".to_string()));
        assert!(order.contains(&"bin:Util".to_string()));
    }

    #[test]
    fn test_unknown_dependency() {
        let text = r#"{ "directories": [ { "dir": "src",
            "modules": [ { "name": "A", "deps": { "impl": ["Nope"] } } ] } ] }"#;
        let err = Manifest::from_json(text).unwrap().load().unwrap_err();
        assert!(matches!(err, Error::Manifest(ref msg) if msg.contains("Nope")));
    }

    #[test]
    fn test_duplicate_module() {
        let text = r#"{ "directories": [ { "dir": "src",
            "modules": [ { "name": "A" }, { "name": "A" } ] } ] }"#;
        let err = Manifest::from_json(text).unwrap().load().unwrap_err();
        assert!(matches!(err, Error::Manifest(_)));
    }

    #[tokio::test]
    async fn test_dependency_on_directory_with_colon() {
        let text = r#"{ "directories": [
            { "dir": "c:/lib", "modules": [ { "name": "Base" } ] },
            { "dir": "app", "modules": [ { "name": "Main", "deps": { "impl": ["c:/lib:Base"] } } ] } ] }"#;
        let loaded = Manifest::from_json(text).unwrap().load().unwrap();
        let main = &loaded[1].modules[0];
        let deps = loaded[1]
            .graphs
            .get(UnitKind::Implementation)
            .deps_of(main)
            .unwrap()
            .get()
            .await
            .unwrap();
        assert_eq!(deps, vec![loaded[0].modules[0].clone()]);
    }

    #[test]
    fn test_module_name_with_colon_rejected() {
        let text = r#"{ "directories": [ { "dir": "src",
            "modules": [ { "name": "A:B" } ] } ] }"#;
        let err = Manifest::from_json(text).unwrap().load().unwrap_err();
        assert!(matches!(err, Error::Manifest(ref msg) if msg.contains("A:B")));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Manifest::from_json("{ not json"),
            Err(Error::Manifest(_))
        ));
    }
}
