//! Loaded-module handles.
//!
//! A [`ModuleHandle`] is the identity of one module resident in the host
//! process. Handles are cheap to clone and never invalidated: modules are not
//! unloaded, so a handle replaced in the registry keeps working for whoever
//! still holds it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use modlink_core::{ConstDef, ConstValue, DebugSymbols, ModuleMetadata, TypeDef};

use crate::EvalError;
use crate::eval::{Evaluator, ModuleResolver};

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    fn next() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct LoadedModule {
    id: ModuleId,
    metadata: Arc<ModuleMetadata>,
    symbols: Option<DebugSymbols>,
    location: Option<PathBuf>,
    /// Produced from an in-memory image rather than shipped with the host.
    dynamic: bool,
}

/// Handle to a module loaded in the host process.
#[derive(Clone)]
pub struct ModuleHandle(Arc<LoadedModule>);

impl ModuleHandle {
    /// A module shipped with the host, optionally backed by an image file.
    pub fn native(metadata: ModuleMetadata, location: Option<PathBuf>) -> Self {
        Self(Arc::new(LoadedModule {
            id: ModuleId::next(),
            metadata: Arc::new(metadata),
            symbols: None,
            location,
            dynamic: false,
        }))
    }

    /// A module materialized from an emitted image.
    pub fn dynamic(metadata: ModuleMetadata, symbols: Option<DebugSymbols>) -> Self {
        Self(Arc::new(LoadedModule {
            id: ModuleId::next(),
            metadata: Arc::new(metadata),
            symbols,
            location: None,
            dynamic: true,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.metadata.name
    }

    pub fn id(&self) -> ModuleId {
        self.0.id
    }

    pub fn metadata(&self) -> &Arc<ModuleMetadata> {
        &self.0.metadata
    }

    /// Backing file, if the module has one.
    pub fn location(&self) -> Option<&Path> {
        self.0.location.as_deref()
    }

    pub fn is_dynamic(&self) -> bool {
        self.0.dynamic
    }

    pub fn debug_symbols(&self) -> Option<&DebugSymbols> {
        self.0.symbols.as_ref()
    }

    /// Whether both handles refer to the same loaded module.
    pub fn same_module(&self, other: &ModuleHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // =========================================
    // Reflection
    // =========================================

    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.0.metadata.find_type(name)
    }

    pub fn find_constant(&self, name: &str) -> Option<&ConstDef> {
        self.0.metadata.find_constant(name)
    }

    /// Type names in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.0.metadata.types.iter().map(|t| t.name.as_str())
    }

    /// Constant names in declaration order.
    pub fn constant_names(&self) -> impl Iterator<Item = &str> {
        self.0.metadata.constants.iter().map(|c| c.name.as_str())
    }

    /// Evaluate a constant, resolving references into other modules through
    /// `resolver`.
    ///
    /// Folded constants return their stored value. Unfolded ones (debug
    /// builds) are evaluated on every call.
    pub fn evaluate(&self, name: &str, resolver: &dyn ModuleResolver) -> Result<ConstValue, EvalError> {
        Evaluator::new(resolver).constant(self, name)
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("id", &self.0.id)
            .field("name", &self.name())
            .field("dynamic", &self.0.dynamic)
            .field("location", &self.0.location)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::ModuleBuilder;

    #[test]
    fn ids_are_unique() {
        let a = ModuleHandle::native(ModuleMetadata::new("A"), None);
        let b = ModuleHandle::native(ModuleMetadata::new("A"), None);
        assert_ne!(a.id(), b.id());
        assert!(!a.same_module(&b));
        assert!(a.same_module(&a.clone()));
    }

    #[test]
    fn reflection() {
        let meta = ModuleBuilder::new("Core")
            .simple_type("A")
            .simple_type("B")
            .constant("MAX", ConstValue::Int(10))
            .build();
        let handle = ModuleHandle::native(meta, Some(PathBuf::from("core.mlnk")));

        assert_eq!(handle.name(), "Core");
        assert_eq!(handle.type_names().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(handle.constant_names().collect::<Vec<_>>(), ["MAX"]);
        assert!(handle.find_type("B").is_some());
        assert!(handle.find_constant("MIN").is_none());
        assert_eq!(handle.location(), Some(Path::new("core.mlnk")));
        assert!(!handle.is_dynamic());
    }

    #[test]
    fn dynamic_modules_have_no_location() {
        let handle = ModuleHandle::dynamic(ModuleMetadata::new("Mod1"), Some(DebugSymbols::new("Mod1")));
        assert!(handle.is_dynamic());
        assert!(handle.location().is_none());
        assert_eq!(handle.debug_symbols().map(|s| s.module.as_str()), Some("Mod1"));
    }
}
