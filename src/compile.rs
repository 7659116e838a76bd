//! SourceCompiler - compile, load and register.
//!
//! This module turns a [`CompilationRequest`] into a [`CompilationResult`]:
//!
//! 1. Snapshot the registry's references
//! 2. Compile every source unit against them
//! 3. On failure, return the diagnostics; nothing is loaded or registered
//! 4. On success, load the image into the catalog, build an in-memory
//!    reference descriptor and register both under the module name
//!
//! Source problems only ever show up as diagnostics. Failing to load an image
//! that compiled cleanly is a host defect and is returned as
//! [`CompileError::Load`].

use log::{debug, info};
use modlink_compiler::{CompileOptions, Compiler};
use modlink_core::{Diagnostic, Severity};
use modlink_registry::{ModuleCatalog, ModuleHandle, ModuleRegistry, ReferenceDescriptor, Registration};

use crate::config::BuildPolicy;
use crate::error::CompileError;
use crate::source::SourceUnit;

/// One compile call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationRequest {
    pub name: String,
    /// Compiled in this order; there is no implicit concatenation.
    pub sources: Vec<SourceUnit>,
    /// Build in debug mode and attach debug symbols.
    pub debug_symbols: bool,
}

impl CompilationRequest {
    pub fn new(name: impl Into<String>, sources: impl IntoIterator<Item = impl Into<SourceUnit>>) -> Self {
        Self {
            name: name.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            debug_symbols: false,
        }
    }

    pub fn with_debug_symbols(mut self, debug: bool) -> Self {
        self.debug_symbols = debug;
        self
    }
}

/// Outcome of a compile.
#[derive(Debug, Clone)]
pub struct CompilationResult {
    pub success: bool,
    /// The loaded module, present exactly when `success` is set.
    pub module: Option<ModuleHandle>,
    /// Every diagnostic, in reporting order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilationResult {
    fn succeeded(module: ModuleHandle, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            success: true,
            module: Some(module),
            diagnostics,
        }
    }

    fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            success: false,
            module: None,
            diagnostics,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }
}

/// Compiles requests against a registry and links the results into a catalog.
pub struct SourceCompiler<'a> {
    registry: &'a ModuleRegistry,
    catalog: &'a dyn ModuleCatalog,
    build: BuildPolicy,
}

impl<'a> SourceCompiler<'a> {
    pub fn new(registry: &'a ModuleRegistry, catalog: &'a dyn ModuleCatalog) -> Self {
        Self {
            registry,
            catalog,
            build: BuildPolicy::default(),
        }
    }

    pub fn with_build_policy(mut self, build: BuildPolicy) -> Self {
        self.build = build;
        self
    }

    /// Compile `request`, and on success load and register the module.
    ///
    /// # Errors
    ///
    /// - [`CompileError::InvalidModuleName`] if the name is malformed
    /// - [`CompileError::Load`] / [`CompileError::Descriptor`] if the emitted
    ///   image cannot be materialized
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, request: &CompilationRequest) -> Result<CompilationResult, CompileError> {
        let name = request.name.as_str();
        if !is_valid_module_name(name) {
            return Err(CompileError::InvalidModuleName(name.to_string()));
        }

        let debug = self.build.effective_debug(request.debug_symbols);
        if debug && !request.debug_symbols {
            debug!("'{name}': debug mode forced by build policy");
        }

        let refs = self.registry.reference_set();
        let sources: Vec<_> = request.sources.iter().map(SourceUnit::as_source_text).collect();
        let emission = Compiler::new(CompileOptions::for_mode(debug)).compile(name, &sources, &refs);

        let Some(output) = emission.output else {
            info!(
                "compile '{name}' failed: {} error(s)",
                emission.diagnostics.iter().filter(|d| d.is_error()).count()
            );
            return Ok(CompilationResult::failed(emission.diagnostics));
        };

        let handle = {
            #[cfg(feature = "profiling")]
            profiling::scope!("load");
            self.catalog
                .load_image(&output.image, output.symbols.as_deref())
                .map_err(|source| CompileError::Load {
                    module: name.to_string(),
                    source,
                })?
        };
        let descriptor = ReferenceDescriptor::from_image(&output.image).map_err(|source| CompileError::Descriptor {
            module: name.to_string(),
            source,
        })?;

        match self.registry.register(name, descriptor, handle.clone()) {
            Registration::Inserted => info!("compiled '{name}' {}", handle.id()),
            Registration::Replaced(previous) => {
                info!("compiled '{name}' {}, replacing {}", handle.id(), previous.id())
            }
        }

        Ok(CompilationResult::succeeded(handle, emission.diagnostics))
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_module_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
