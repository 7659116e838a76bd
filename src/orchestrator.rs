//! Orchestrator - the process-wide compile entry point.
//!
//! An [`Orchestrator`] owns one [`ModuleRegistry`] and the catalog it is
//! populated from. The registry is initialized from the catalog on the first
//! compile; if that fails, the next compile tries again.
//!
//! Compiles are serialized by a gate, so the registry update made by one
//! compile is visible to the next before its result is returned.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use modlink::{InProcessCatalog, Orchestrator, OrchestratorConfig, SourceUnit};
//!
//! let orchestrator = Orchestrator::new(Arc::new(InProcessCatalog::new()), OrchestratorConfig::default());
//!
//! let first = orchestrator.compile("Base", [SourceUnit::new("type Shape {}")], false).unwrap();
//! assert!(first.success);
//!
//! let second = orchestrator
//!     .compile("Derived", [SourceUnit::new("type Circle extends Base.Shape {}")], false)
//!     .unwrap();
//! assert!(second.success);
//! assert!(orchestrator.resolve("Derived").is_some());
//! ```

use std::sync::{Arc, OnceLock};

use log::debug;
use modlink_registry::{
    InProcessCatalog, ModuleCatalog, ModuleHandle, ModuleRegistry, ModuleResolver, ObservationPolicy,
};
use parking_lot::Mutex;

use crate::compile::{CompilationRequest, CompilationResult, SourceCompiler};
use crate::config::OrchestratorConfig;
use crate::error::CompileError;
use crate::source::SourceUnit;

static GLOBAL: OnceLock<Orchestrator> = OnceLock::new();

#[derive(Debug, Default)]
struct Lifecycle {
    initialized: bool,
    attached: bool,
}

/// Owns the registry and serializes compiles against it.
pub struct Orchestrator {
    config: OrchestratorConfig,
    catalog: Arc<dyn ModuleCatalog>,
    registry: Arc<ModuleRegistry>,
    gate: Mutex<Lifecycle>,
}

impl Orchestrator {
    pub fn new(catalog: Arc<dyn ModuleCatalog>, config: OrchestratorConfig) -> Self {
        Self {
            config,
            catalog,
            registry: Arc::new(ModuleRegistry::new()),
            gate: Mutex::new(Lifecycle::default()),
        }
    }

    /// The process-wide orchestrator, created on first use.
    ///
    /// Unless [`install_global`](Self::install_global) ran first, it is built
    /// over [`InProcessCatalog::global`] with
    /// [`OrchestratorConfig::from_env`]. If the environment holds an invalid
    /// value, it is logged and the configuration falls back to
    /// [`BuildPolicy::detect`](crate::BuildPolicy::detect) with default
    /// observation.
    pub fn global() -> &'static Orchestrator {
        GLOBAL.get_or_init(|| {
            let config = OrchestratorConfig::from_lookup_or_detect(|var| std::env::var(var).ok());
            Orchestrator::new(InProcessCatalog::global(), config)
        })
    }

    /// Make `orchestrator` the process-wide instance.
    ///
    /// Fails, handing the orchestrator back, if one is already in place.
    pub fn install_global(orchestrator: Orchestrator) -> Result<&'static Orchestrator, Orchestrator> {
        GLOBAL.set(orchestrator)?;
        Ok(Self::global())
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.gate.lock().initialized
    }

    /// Initialize the registry now instead of on the first compile.
    pub fn initialize(&self) -> Result<(), CompileError> {
        let mut lifecycle = self.gate.lock();
        self.ensure_initialized(&mut lifecycle)
    }

    /// Compile `sources` into module `name`.
    ///
    /// See [`SourceCompiler::compile`] for the error cases; registry
    /// initialization failures are reported as [`CompileError::Registry`].
    pub fn compile(
        &self,
        name: &str,
        sources: impl IntoIterator<Item = SourceUnit>,
        debug: bool,
    ) -> Result<CompilationResult, CompileError> {
        let request = CompilationRequest::new(name, sources).with_debug_symbols(debug);
        self.compile_request(&request)
    }

    pub fn compile_request(&self, request: &CompilationRequest) -> Result<CompilationResult, CompileError> {
        let mut lifecycle = self.gate.lock();
        self.ensure_initialized(&mut lifecycle)?;

        SourceCompiler::new(&self.registry, &*self.catalog)
            .with_build_policy(self.config.build)
            .compile(request)
    }

    /// Look up a module by name. Never compiles.
    pub fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        self.registry.resolve(name)
    }

    fn ensure_initialized(&self, lifecycle: &mut Lifecycle) -> Result<(), CompileError> {
        if lifecycle.initialized {
            return Ok(());
        }

        if self.config.observation == ObservationPolicy::Continuous && !lifecycle.attached {
            // Subscribe before enumerating so no load falls between the two.
            self.registry.attach(&*self.catalog);
            lifecycle.attached = true;
        }

        self.registry.initialize(&*self.catalog)?;
        lifecycle.initialized = true;
        debug!(
            "orchestrator ready: {} module(s), {:?} observation",
            self.registry.len(),
            self.config.observation
        );
        Ok(())
    }
}

/// Resolves through the owned registry, so debug-built constants can be
/// evaluated against everything this orchestrator has linked.
impl ModuleResolver for Orchestrator {
    fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        self.registry.resolve(name)
    }
}
