//! The host module catalog.
//!
//! The registry never reaches into the process on its own. Everything it knows
//! about loaded modules comes through a [`ModuleCatalog`]: one-shot
//! enumeration, explicit load notifications, and materializing emitted images.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};

use log::{debug, trace};
use modlink_core::{DebugSymbols, ModuleMetadata, image};
use parking_lot::{Mutex, RwLock};

use crate::{LoadError, ModuleHandle};

/// Receives a callback for every module linked into the host.
pub trait ModuleObserver: Send + Sync {
    fn module_loaded(&self, module: &ModuleHandle);
}

/// Host-process module capabilities the registry is built on.
pub trait ModuleCatalog: Send + Sync {
    /// Every module currently loaded, in load order.
    fn loaded_modules(&self) -> Vec<ModuleHandle>;

    /// Notify `observer` of every module loaded from now on.
    fn subscribe(&self, observer: Arc<dyn ModuleObserver>);

    /// Materialize an emitted image (and its debug symbols) as a loaded module.
    fn load_image(&self, image: &[u8], symbols: Option<&[u8]>) -> Result<ModuleHandle, LoadError>;
}

/// Catalog of modules living in this process.
///
/// Observers are held weakly, so subscribing does not keep them alive.
#[derive(Default)]
pub struct InProcessCatalog {
    modules: RwLock<Vec<ModuleHandle>>,
    observers: Mutex<Vec<Weak<dyn ModuleObserver>>>,
}

impl InProcessCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide catalog.
    pub fn global() -> Arc<InProcessCatalog> {
        static GLOBAL: OnceLock<Arc<InProcessCatalog>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(InProcessCatalog::new())).clone()
    }

    /// Add a host-provided module, optionally backed by an image file.
    pub fn add_native(&self, metadata: ModuleMetadata, location: Option<PathBuf>) -> ModuleHandle {
        let handle = ModuleHandle::native(metadata, location);
        debug!("catalog: native module '{}' {}", handle.name(), handle.id());
        self.link(handle.clone());
        handle
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    fn link(&self, handle: ModuleHandle) {
        self.modules.write().push(handle.clone());

        // Collect live observers first so callbacks run without our locks held.
        let observers: Vec<_> = {
            let mut observers = self.observers.lock();
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        trace!("catalog: notifying {} observer(s) of '{}'", observers.len(), handle.name());
        for observer in observers {
            observer.module_loaded(&handle);
        }
    }
}

impl ModuleCatalog for InProcessCatalog {
    fn loaded_modules(&self) -> Vec<ModuleHandle> {
        self.modules.read().clone()
    }

    fn subscribe(&self, observer: Arc<dyn ModuleObserver>) {
        self.observers.lock().push(Arc::downgrade(&observer));
    }

    fn load_image(&self, image: &[u8], symbols: Option<&[u8]>) -> Result<ModuleHandle, LoadError> {
        let metadata = image::decode(image).map_err(LoadError::Image)?;
        let symbols = symbols
            .map(DebugSymbols::decode)
            .transpose()
            .map_err(LoadError::Symbols)?;

        if let Some(symbols) = &symbols
            && symbols.module != metadata.name
        {
            return Err(LoadError::SymbolMismatch {
                image: metadata.name,
                symbols: symbols.module.clone(),
            });
        }

        let handle = ModuleHandle::dynamic(metadata, symbols);
        debug!(
            "catalog: loaded dynamic module '{}' {} ({} bytes)",
            handle.name(),
            handle.id(),
            image.len()
        );
        self.link(handle.clone());
        Ok(handle)
    }
}
