//! Module facts consumed by the graph engine.
//!
//! Modules are produced by the project-wide module table; this crate only reads
//! their identity, kind, visibility, and which unit kinds they carry.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Short module name. Unique within a directory only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(Arc<str>);

impl ModuleName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object name of a module: the stable token used for its compiled artifacts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjName(Arc<str>);

impl ObjName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a module across directories: owning directory plus object name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId {
    pub dir: Arc<Path>,
    pub obj_name: ObjName,
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dir.display(), self.obj_name)
    }
}

/// Kind tag of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Interface with no implementation unit.
    InterfaceOnly,
    /// Ordinary module.
    Implementation,
    /// Interface declared by a virtual library, body supplied later.
    Virtual,
    /// Concrete module filling a virtual slot.
    VirtualSlotImplementation,
    /// Deprecated alias kept for compatibility with an older layout.
    WrappedCompat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// The two compilation units a module may be split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    #[serde(rename = "intf")]
    Interface,
    #[serde(rename = "impl")]
    Implementation,
}

impl UnitKind {
    pub const ALL: [UnitKind; 2] = [UnitKind::Interface, UnitKind::Implementation];
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface => f.write_str("interface"),
            Self::Implementation => f.write_str("implementation"),
        }
    }
}

/// One value per unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PerUnit<T> {
    #[serde(default, rename = "intf")]
    pub interface: T,
    #[serde(default, rename = "impl")]
    pub implementation: T,
}

impl<T> PerUnit<T> {
    pub fn new(interface: T, implementation: T) -> Self {
        Self {
            interface,
            implementation,
        }
    }

    /// Same value for both unit kinds.
    pub fn both(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            interface: value.clone(),
            implementation: value,
        }
    }

    pub fn from_fn(mut f: impl FnMut(UnitKind) -> T) -> Self {
        Self {
            interface: f(UnitKind::Interface),
            implementation: f(UnitKind::Implementation),
        }
    }

    pub fn get(&self, unit: UnitKind) -> &T {
        match unit {
            UnitKind::Interface => &self.interface,
            UnitKind::Implementation => &self.implementation,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerUnit<U> {
        PerUnit {
            interface: f(self.interface),
            implementation: f(self.implementation),
        }
    }

    /// Fallible [`PerUnit::from_fn`]; the interface side is computed first.
    pub fn try_from_fn(mut f: impl FnMut(UnitKind) -> Result<T>) -> Result<Self> {
        Ok(Self {
            interface: f(UnitKind::Interface)?,
            implementation: f(UnitKind::Implementation)?,
        })
    }
}

/// A compilation unit as described by the module table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
    name: ModuleName,
    obj_name: ObjName,
    dir: Arc<Path>,
    kind: ModuleKind,
    visibility: Visibility,
    units: PerUnit<bool>,
}

impl Module {
    /// Create a public module. Which units it carries follows from `kind`.
    pub fn new(
        dir: impl Into<PathBuf>,
        name: impl AsRef<str>,
        obj_name: impl AsRef<str>,
        kind: ModuleKind,
    ) -> Self {
        let units = match kind {
            ModuleKind::InterfaceOnly | ModuleKind::Virtual => PerUnit::new(true, false),
            _ => PerUnit::both(true),
        };
        let dir: PathBuf = dir.into();
        Self {
            name: ModuleName::new(name),
            obj_name: ObjName::new(obj_name),
            dir: Arc::from(dir),
            kind,
            visibility: Visibility::Public,
            units,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_units(mut self, units: PerUnit<bool>) -> Self {
        self.units = units;
        self
    }

    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    pub fn obj_name(&self) -> &ObjName {
        &self.obj_name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Whether the module has a unit of the given kind.
    pub fn has(&self, unit: UnitKind) -> bool {
        *self.units.get(unit)
    }

    /// Identity key, stable across directories.
    pub fn id(&self) -> ModuleId {
        ModuleId {
            dir: Arc::clone(&self.dir),
            obj_name: self.obj_name.clone(),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_units_follow_kind() {
        let m = Module::new("src", "A", "lib__A", ModuleKind::Implementation);
        assert!(m.has(UnitKind::Interface));
        assert!(m.has(UnitKind::Implementation));

        let intf = Module::new("src", "I", "lib__I", ModuleKind::InterfaceOnly);
        assert!(!intf.has(UnitKind::Implementation));

        let virt = Module::new("src", "V", "lib__V", ModuleKind::Virtual);
        assert!(virt.has(UnitKind::Interface));
        assert!(!virt.has(UnitKind::Implementation));
    }

    #[test]
    fn test_identity_includes_directory() {
        let a = Module::new("src/a", "Util", "util", ModuleKind::Implementation);
        let b = Module::new("src/b", "Util", "util", ModuleKind::Implementation);
        assert_eq!(a.name(), b.name());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_per_unit_accessors() {
        let pair = PerUnit::from_fn(|unit| unit == UnitKind::Implementation);
        assert!(!*pair.get(UnitKind::Interface));
        assert!(*pair.get(UnitKind::Implementation));

        let doubled = PerUnit::both(2).map(|n| n * 2);
        assert_eq!(doubled, PerUnit::new(4, 4));
    }

    #[test]
    fn test_visibility_builder() {
        let m = Module::new("src", "P", "lib__P", ModuleKind::Implementation)
            .with_visibility(Visibility::Private);
        assert!(m.is_private());
    }
}
