//! ModuleRegistry - the name to module mapping.
//!
//! This module provides [`ModuleRegistry`], the single source of truth for
//! "what can currently be referenced and resolved by name". Every name maps to
//! at most one entry holding:
//!
//! - a loaded [`ModuleHandle`], used for run-time resolution, and
//! - optionally a [`ReferenceDescriptor`], used as compile-time input. Modules
//!   without a backing location are resolvable but cannot be referenced.
//!
//! # Collision Policy
//!
//! - [`register`](ModuleRegistry::register) overwrites: the latest compile of a
//!   name wins and the previous handle is returned to the caller.
//! - [`initialize`](ModuleRegistry::initialize) and
//!   [`observe`](ModuleRegistry::observe) keep the first module seen under a
//!   name.
//!
//! Entries are never removed.
//!
//! # Thread Safety
//!
//! The map sits behind a `parking_lot::RwLock`. Every mutation takes the write
//! lock, so snapshots and lookups always see a consistent map.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{
    ModuleCatalog, ModuleHandle, ModuleObserver, ModuleResolver, ReferenceDescriptor,
    ReferenceError, ReferenceSet, RegistryError,
};

/// How the registry learns about modules linked after initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObservationPolicy {
    /// Enumerate once at initialization and ignore later loads.
    #[default]
    Snapshot,
    /// Also subscribe to load notifications for the life of the process.
    Continuous,
}

/// Outcome of [`ModuleRegistry::register`].
#[derive(Debug, Clone)]
pub enum Registration {
    Inserted,
    /// The name was taken; the previous handle stays loaded but is no longer
    /// reachable through the registry.
    Replaced(ModuleHandle),
}

impl Registration {
    pub fn is_replacement(&self) -> bool {
        matches!(self, Registration::Replaced(_))
    }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    descriptor: Option<ReferenceDescriptor>,
    handle: ModuleHandle,
}

/// Registry of loaded modules by name.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: RwLock<FxHashMap<String, RegistryEntry>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Population
    // ==========================================================================

    /// Take a snapshot of every module already loaded in `catalog`.
    ///
    /// Modules with a backing file get a descriptor read from that file; if the
    /// file is gone the module is kept as a handle only. A backing file that
    /// exists but cannot be read or decoded fails the whole initialization.
    /// Returns the number of entries added.
    pub fn initialize(&self, catalog: &dyn ModuleCatalog) -> Result<usize, RegistryError> {
        let modules = catalog.loaded_modules();
        let mut added = 0;
        for module in modules {
            if self.admit(&module)? {
                added += 1;
            }
        }
        info!("registry: initialized with {added} module(s), {} total", self.len());
        Ok(added)
    }

    /// Subscribe to `catalog` so every later load reaches [`observe`](Self::observe).
    pub fn attach(self: &Arc<Self>, catalog: &dyn ModuleCatalog) {
        debug!("registry: observing module loads");
        catalog.subscribe(self.clone());
    }

    /// Consider a newly linked module.
    ///
    /// Dynamic modules and modules without a backing location are ignored, so
    /// compiles made through other paths never leak into the registry. Failures
    /// to read the backing file are logged and the module is skipped.
    pub fn observe(&self, module: &ModuleHandle) {
        if module.is_dynamic() || module.location().is_none() {
            trace!("registry: ignoring load of '{}'", module.name());
            return;
        }
        if let Err(err) = self.admit(module) {
            warn!("registry: not registering observed module '{}': {err}", module.name());
        }
    }

    /// First-seen admission shared by initialization and observation.
    fn admit(&self, module: &ModuleHandle) -> Result<bool, RegistryError> {
        let name = module.name();
        if self.contains(name) {
            trace!("registry: '{name}' already registered, keeping first");
            return Ok(false);
        }

        let descriptor = match module.location() {
            Some(path) => match ReferenceDescriptor::from_file(path) {
                Ok(descriptor) => Some(descriptor),
                Err(ReferenceError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    debug!("registry: backing file of '{name}' is gone, resolvable only");
                    None
                }
                Err(source) => {
                    return Err(RegistryError::Reference {
                        module: name.to_string(),
                        source,
                    });
                }
            },
            None => None,
        };

        if let Some(descriptor) = &descriptor
            && descriptor.name() != name
        {
            return Err(RegistryError::NameMismatch {
                module: name.to_string(),
                found: descriptor.name().to_string(),
            });
        }

        let mut entries = self.entries.write();
        // Another thread may have won the race since the check above.
        if entries.contains_key(name) {
            return Ok(false);
        }
        debug!(
            "registry: admitted '{name}' ({})",
            if descriptor.is_some() { "referenceable" } else { "resolvable only" }
        );
        entries.insert(
            name.to_string(),
            RegistryEntry {
                descriptor,
                handle: module.clone(),
            },
        );
        Ok(true)
    }

    /// Insert or overwrite the entry for `name`.
    pub fn register(&self, name: &str, descriptor: ReferenceDescriptor, handle: ModuleHandle) -> Registration {
        let entry = RegistryEntry {
            descriptor: Some(descriptor),
            handle,
        };
        match self.entries.write().insert(name.to_string(), entry) {
            Some(previous) => {
                info!("registry: replaced '{name}' (previous {})", previous.handle.id());
                Registration::Replaced(previous.handle)
            }
            None => {
                info!("registry: registered '{name}'");
                Registration::Inserted
            }
        }
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Loaded module registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        self.entries.read().get(name).map(|e| e.handle.clone())
    }

    /// Reference descriptor registered under `name`.
    pub fn descriptor(&self, name: &str) -> Option<ReferenceDescriptor> {
        self.entries.read().get(name).and_then(|e| e.descriptor.clone())
    }

    /// Snapshot of every referenceable module.
    pub fn reference_set(&self) -> ReferenceSet {
        let entries = self.entries.read();
        ReferenceSet::new(entries.values().filter_map(|e| e.descriptor.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ModuleObserver for ModuleRegistry {
    fn module_loaded(&self, module: &ModuleHandle) {
        self.observe(module);
    }
}

impl ModuleResolver for ModuleRegistry {
    fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        ModuleRegistry::resolve(self, name)
    }
}
