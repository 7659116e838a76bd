//! modlink - compile source text into modules and link them into the running
//! process.
//!
//! The crate ties three pieces together:
//!
//! - the **registry** ([`ModuleRegistry`]), which maps module names to loaded
//!   handles and compile-time reference descriptors,
//! - the **source compiler** ([`SourceCompiler`]), which compiles a request
//!   against the registry's references and links the result, and
//! - the **orchestrator** ([`Orchestrator`]), the process-wide entry point
//!   owning one registry.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use modlink::{InProcessCatalog, ModuleBuilder, Orchestrator, OrchestratorConfig, SourceUnit};
//!
//! // A module the host shipped with (no backing file, so resolvable only).
//! let catalog = Arc::new(InProcessCatalog::new());
//! catalog.add_native(ModuleBuilder::new("Host").build(), None);
//!
//! let orchestrator = Orchestrator::new(catalog, OrchestratorConfig::default());
//! let result = orchestrator
//!     .compile("Game", [SourceUnit::new("const LIVES = 3;")], false)
//!     .unwrap();
//!
//! assert!(result.success);
//! assert!(orchestrator.resolve("Host").is_some());
//! assert!(orchestrator.resolve("Game").is_some());
//! ```

mod compile;
mod config;
mod error;
mod orchestrator;
mod source;

pub use compile::{CompilationRequest, CompilationResult, SourceCompiler, is_valid_module_name};
pub use config::{BuildPolicy, FORCE_DEBUG_VAR, OBSERVE_VAR, OrchestratorConfig};
pub use error::{CompileError, ConfigError};
pub use orchestrator::Orchestrator;
pub use source::SourceUnit;

pub use modlink_core::{
    ConstValue, DebugSymbols, Diagnostic, DiagnosticCode, ImageError, ModuleBuilder, ModuleMetadata,
    OptimizationLevel, Severity, SourceLocation, Span,
};
pub use modlink_registry::{
    EvalError, InProcessCatalog, LoadError, ModuleCatalog, ModuleHandle, ModuleId, ModuleObserver,
    ModuleRegistry, ModuleResolver, ObservationPolicy, ReferenceDescriptor, ReferenceError,
    ReferenceOrigin, ReferenceSet, Registration, RegistryError,
};

/// Lower-level crates, for hosts that drive the pieces themselves.
pub mod backend {
    pub use modlink_compiler as compiler;
    pub use modlink_core as core;
    pub use modlink_parser as parser;
}
