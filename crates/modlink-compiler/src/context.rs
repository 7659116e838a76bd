//! Compilation context shared by every pass.
//!
//! Holds the module being compiled, the reference snapshot it compiles against,
//! the diagnostics collected so far, and which referenced modules were actually
//! used.

use std::collections::BTreeSet;

use modlink_core::{Diagnostic, DiagnosticCode, ModuleMetadata, Span};
use modlink_parser::Ident;
use modlink_registry::ReferenceSet;

pub struct CompilationContext<'r> {
    module: &'r str,
    refs: &'r ReferenceSet,
    diagnostics: Vec<Diagnostic>,
    /// Sorted so the image's reference list is deterministic.
    used_modules: BTreeSet<String>,
}

impl<'r> CompilationContext<'r> {
    pub fn new(module: &'r str, refs: &'r ReferenceSet) -> Self {
        Self {
            module,
            refs,
            diagnostics: Vec::new(),
            used_modules: BTreeSet::new(),
        }
    }

    /// Name of the module being compiled.
    pub fn module_name(&self) -> &'r str {
        self.module
    }

    pub fn references(&self) -> &'r ReferenceSet {
        self.refs
    }

    /// Record a diagnostic at its code's default severity.
    pub fn report(&mut self, code: DiagnosticCode, unit: usize, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(code, message).at(unit, span));
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Names of the referenced modules some path resolved into.
    pub fn used_modules(&self) -> Vec<String> {
        self.used_modules.iter().cloned().collect()
    }

    /// Metadata of the referenced module named by `qualifier`.
    ///
    /// Reports an unresolved-module diagnostic at the qualifier when the
    /// module is absent from the reference snapshot; every reference site
    /// reports its own.
    pub fn external_module(&mut self, unit: usize, qualifier: Ident<'_>) -> Option<&'r ModuleMetadata> {
        let refs = self.refs;
        match refs.get(qualifier.name) {
            Some(descriptor) => {
                self.used_modules.insert(qualifier.name.to_string());
                Some(descriptor.metadata())
            }
            None => {
                self.report(
                    DiagnosticCode::UnresolvedModule,
                    unit,
                    qualifier.span,
                    format!("module `{}` is not available as a reference", qualifier.name),
                );
                None
            }
        }
    }

    /// Whether the qualifier names the module being compiled.
    pub fn is_self(&self, qualifier: Ident<'_>) -> bool {
        qualifier.name == self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::{ModuleBuilder, image};
    use modlink_registry::ReferenceDescriptor;

    fn refs() -> ReferenceSet {
        let core = ModuleBuilder::new("Core").simple_type("A").build();
        ReferenceSet::new([ReferenceDescriptor::from_image(&image::encode(&core)).unwrap()])
    }

    fn ident(name: &str) -> Ident<'_> {
        Ident {
            name,
            span: Span::new(1, 1, name.len() as u32),
        }
    }

    #[test]
    fn known_module_is_marked_used() {
        let refs = refs();
        let mut ctx = CompilationContext::new("Mod1", &refs);
        assert!(ctx.external_module(0, ident("Core")).is_some());
        assert!(ctx.external_module(0, ident("Core")).is_some());
        assert_eq!(ctx.used_modules(), ["Core"]);
        assert!(ctx.take_diagnostics().is_empty());
    }

    #[test]
    fn unknown_module_reports_once_per_site() {
        let refs = refs();
        let mut ctx = CompilationContext::new("Mod1", &refs);
        assert!(ctx.external_module(0, ident("Unknown")).is_none());
        assert!(ctx.external_module(1, ident("Unknown")).is_none());

        let diags = ctx.take_diagnostics();
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.code == DiagnosticCode::UnresolvedModule));
        assert!(diags[0].message.contains("Unknown"));
        assert!(ctx.used_modules().is_empty());
    }
}
