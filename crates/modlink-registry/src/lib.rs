//! Module registry for modlink.
//!
//! This crate owns the mapping from module name to loaded module and
//! compile-time reference, and the abstractions it is built on:
//!
//! - [`ModuleHandle`]: a module loaded in the host process
//! - [`ReferenceDescriptor`] / [`ReferenceSet`]: compile-time inputs
//! - [`ModuleCatalog`] / [`ModuleObserver`]: what the host must provide
//! - [`ModuleRegistry`]: the registry itself
//! - [`ModuleResolver`]: run-time lookup used by constant evaluation
//!
//! # Example
//!
//! ```
//! use modlink_core::ModuleBuilder;
//! use modlink_registry::{InProcessCatalog, ModuleRegistry};
//!
//! let catalog = InProcessCatalog::new();
//! catalog.add_native(ModuleBuilder::new("Core").simple_type("A").build(), None);
//!
//! let registry = ModuleRegistry::new();
//! registry.initialize(&catalog).unwrap();
//!
//! let core = registry.resolve("Core").unwrap();
//! assert!(core.find_type("A").is_some());
//! ```

mod catalog;
mod error;
mod eval;
mod handle;
mod reference;
mod registry;

pub use catalog::{InProcessCatalog, ModuleCatalog, ModuleObserver};
pub use error::{EvalError, LoadError, ReferenceError, RegistryError};
pub use eval::ModuleResolver;
pub use handle::{ModuleHandle, ModuleId};
pub use reference::{ReferenceDescriptor, ReferenceOrigin, ReferenceSet};
pub use registry::{ModuleRegistry, ObservationPolicy, Registration};
