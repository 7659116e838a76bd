//! modlink Compiler
//!
//! Compiles the source units of one module against a [`ReferenceSet`] into a
//! module image.
//!
//! ## Architecture
//!
//! - **Parse**: every non-blank unit is parsed independently; syntax errors do
//!   not stop the remaining units
//! - **Pass 1 (Registration)**: collect declarations across all units
//! - **Pass 2 (Types)**: resolve bases and fields, check inheritance
//! - **Pass 3 (Constants)**: resolve, order and evaluate constants
//! - **Emit**: encode the image (and debug symbols) if no error was reported
//!
//! ## Diagnostic Order
//!
//! Parse diagnostics come first, in unit order and then source order. Semantic
//! diagnostics follow, sorted by unit and position, which is declaration
//! order. Identical input always produces identical output.
//!
//! # Example
//!
//! ```
//! use modlink_compiler::{CompileOptions, Compiler, SourceText};
//! use modlink_registry::ReferenceSet;
//!
//! let compiler = Compiler::new(CompileOptions::release());
//! let emission = compiler.compile(
//!     "Shapes",
//!     &[SourceText::new("type Shape { sides: int; } const SQUARE = 2 * 2;")],
//!     &ReferenceSet::default(),
//! );
//!
//! assert!(emission.is_success());
//! assert!(emission.output.unwrap().symbols.is_none());
//! ```

mod context;
pub mod emit;
mod graph;
pub mod passes;
mod resolver;

pub use emit::EmittedModule;

use bumpalo::Bump;
use log::{debug, trace};
use modlink_core::{Diagnostic, DiagnosticCode, OptimizationLevel};
use modlink_parser::Parser;
use modlink_registry::ReferenceSet;

use crate::context::CompilationContext;
use crate::emit::Emitter;
use crate::passes::{ConstantPass, ParsedUnit, RegistrationPass, TypePass};

/// One source unit as the compiler sees it.
#[derive(Debug, Clone, Copy)]
pub struct SourceText<'a> {
    pub text: &'a str,
    /// Origin tag (e.g. a file path) recorded in debug symbols.
    pub origin: Option<&'a str>,
}

impl<'a> SourceText<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, origin: None }
    }

    pub fn with_origin(text: &'a str, origin: &'a str) -> Self {
        Self {
            text,
            origin: Some(origin),
        }
    }

    /// Empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// How a module is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub optimization: OptimizationLevel,
    /// Produce a debug-symbol buffer next to the image.
    pub emit_symbols: bool,
}

impl CompileOptions {
    /// Unfolded constants and debug symbols.
    pub fn debug() -> Self {
        Self {
            optimization: OptimizationLevel::Debug,
            emit_symbols: true,
        }
    }

    /// Folded constants, no symbols.
    pub fn release() -> Self {
        Self {
            optimization: OptimizationLevel::Release,
            emit_symbols: false,
        }
    }

    /// Options for a build-mode flag.
    pub fn for_mode(debug: bool) -> Self {
        if debug { Self::debug() } else { Self::release() }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::release()
    }
}

/// Result of compiling one module.
#[derive(Debug, Clone)]
pub struct Emission {
    /// Every diagnostic, in reporting order.
    pub diagnostics: Vec<Diagnostic>,
    /// Present exactly when no error diagnostic was reported.
    pub output: Option<EmittedModule>,
}

impl Emission {
    /// Check if emission succeeded.
    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// The compiler entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Compile the units of module `name` against `refs`.
    ///
    /// Never fails: every problem in the sources is a diagnostic.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, name: &str, sources: &[SourceText<'_>], refs: &ReferenceSet) -> Emission {
        debug!(
            "compiling '{name}': {} unit(s), {:?}, {} reference(s)",
            sources.len(),
            self.options.optimization,
            refs.len()
        );

        let arena = Bump::new();
        let (units, mut diagnostics) = parse_units(&arena, sources);

        let mut ctx = CompilationContext::new(name, refs);
        let decls = RegistrationPass::new(&mut ctx).run(&units);
        let types = TypePass::new(&mut ctx, &decls).run();
        let constants = ConstantPass::new(&mut ctx, &decls).run();

        let mut semantic = ctx.take_diagnostics();
        semantic.sort_by_key(|d| {
            let location = d.location.map(|l| (l.unit, l.span.line, l.span.col));
            (location.is_none(), location)
        });
        diagnostics.extend(semantic);

        if diagnostics.iter().any(Diagnostic::is_error) {
            debug!("'{name}' failed with {} diagnostic(s)", diagnostics.len());
            return Emission {
                diagnostics,
                output: None,
            };
        }

        let emitter = Emitter::new(name, self.options.optimization, &decls);
        let metadata = emitter.metadata(&types, &constants, ctx.used_modules());
        let symbols = self.options.emit_symbols.then(|| {
            let origins = sources
                .iter()
                .enumerate()
                .map(|(i, s)| s.origin.map_or_else(|| format!("<unit {i}>"), str::to_string))
                .collect();
            emitter.symbols(origins)
        });
        let output = emitter.emit(&metadata, symbols.as_ref());
        trace!(
            "'{name}' emitted {} image byte(s), references {:?}",
            output.image.len(),
            metadata.references
        );

        Emission {
            diagnostics,
            output: Some(output),
        }
    }
}

/// Parse every non-blank unit. Blank units yield an info diagnostic instead.
fn parse_units<'ast>(arena: &'ast Bump, sources: &[SourceText<'_>]) -> (Vec<ParsedUnit<'ast>>, Vec<Diagnostic>) {
    let mut units = Vec::with_capacity(sources.len());
    let mut diagnostics = Vec::new();

    for (index, source) in sources.iter().enumerate() {
        if source.is_blank() {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::BlankSourceSkipped,
                format!("source unit {index} is blank and was skipped"),
            ));
            continue;
        }
        let (script, errors) = Parser::parse_lenient(source.text, arena);
        diagnostics.extend(errors.iter().map(|e| Diagnostic::from_parse_error(index, e)));
        units.push(ParsedUnit { index, script });
    }

    (units, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::{ConstInit, ConstValue, DebugSymbols, ModuleBuilder, Severity, image};
    use modlink_registry::ReferenceDescriptor;

    fn refs() -> ReferenceSet {
        let core = ModuleBuilder::new("Core").simple_type("A").simple_type("B").build();
        ReferenceSet::new([ReferenceDescriptor::from_image(&image::encode(&core)).unwrap()])
    }

    fn compile(options: CompileOptions, sources: &[&str]) -> Emission {
        let sources: Vec<_> = sources.iter().map(|s| SourceText::new(s)).collect();
        Compiler::new(options).compile("Mod", &sources, &refs())
    }

    #[test]
    fn release_folds_constants() {
        let emission = compile(CompileOptions::release(), &["type C extends Core.A {} const X = 6 * 7;"]);
        assert!(emission.is_success(), "{:?}", emission.diagnostics);
        let output = emission.output.unwrap();
        let meta = image::decode(&output.image).unwrap();

        assert_eq!(meta.references, ["Core"]);
        assert_eq!(meta.find_constant("X").unwrap().init, ConstInit::Value(ConstValue::Int(42)));
        assert!(output.symbols.is_none());
    }

    #[test]
    fn debug_keeps_expressions_and_symbols() {
        let sources = [SourceText::with_origin("type T { a: int; }\nconst X = 6 * 7;", "t.mod")];
        let emission = Compiler::new(CompileOptions::debug()).compile("Mod", &sources, &refs());
        let output = emission.output.unwrap();

        let meta = image::decode(&output.image).unwrap();
        assert!(matches!(meta.find_constant("X").unwrap().init, ConstInit::Expr(_)));

        let symbols = DebugSymbols::decode(&output.symbols.unwrap()).unwrap();
        assert_eq!(symbols.units, ["t.mod"]);
        let field = symbols.lookup("T.a").unwrap();
        assert_eq!((field.span.line, field.span.col), (1, 10));
        assert_eq!(symbols.lookup("X").unwrap().span.line, 2);
    }

    #[test]
    fn blank_units_are_skipped_with_info() {
        let emission = compile(CompileOptions::debug(), &["", "  \n\t "]);
        assert!(emission.is_success());
        assert_eq!(emission.diagnostics.len(), 2);
        assert!(emission.diagnostics.iter().all(|d| d.severity == Severity::Info));

        let output = emission.output.unwrap();
        assert!(image::decode(&output.image).unwrap().is_empty());
        assert!(!output.symbols.unwrap().is_empty());
    }

    #[test]
    fn no_units_at_all() {
        let emission = compile(CompileOptions::release(), &[]);
        assert!(emission.is_success());
        assert!(emission.diagnostics.is_empty());
    }

    #[test]
    fn unresolved_module_fails_with_one_error() {
        let emission = compile(CompileOptions::release(), &["type D extends Unknown.X {}"]);
        assert!(!emission.is_success());
        let errors: Vec<_> = emission.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, DiagnosticCode::UnresolvedModule);
        assert!(errors[0].message.contains("Unknown"));
    }

    #[test]
    fn parse_errors_do_not_stop_other_units() {
        let emission = compile(
            CompileOptions::release(),
            &["type A extends Missing {}", "type {", "const X = ;"],
        );
        let codes: Vec<_> = emission.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            [DiagnosticCode::Syntax, DiagnosticCode::Syntax, DiagnosticCode::UnknownType]
        );
        let units: Vec<_> = emission
            .diagnostics
            .iter()
            .map(|d| d.location.unwrap().unit)
            .collect();
        assert_eq!(units, [1, 2, 0]);
    }

    #[test]
    fn semantic_diagnostics_in_declaration_order() {
        // Constant errors are found in a later pass than type errors.
        let emission = compile(
            CompileOptions::release(),
            &["const Z = 1 / 0;\ntype A extends int {}", "type B { x: Nope; }"],
        );
        let codes: Vec<_> = emission.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            [DiagnosticCode::DivisionByZero, DiagnosticCode::InvalidBase, DiagnosticCode::UnknownType]
        );
    }

    #[test]
    fn warnings_do_not_fail_the_build() {
        let emission = compile(
            CompileOptions::release(),
            &["type Base { hp: int; } type Leaf extends Base { hp: int; }"],
        );
        assert!(emission.is_success());
        assert_eq!(emission.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn deeply_nested_source_is_a_syntax_error() {
        let deep = format!("const X = {}1{};", "(".repeat(5000), ")".repeat(5000));
        let emission = compile(CompileOptions::release(), &[&deep, "const Y = 2;"]);
        assert!(!emission.is_success());
        let errors: Vec<_> = emission.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, DiagnosticCode::Syntax);
        assert_eq!(errors[0].location.unwrap().unit, 0);
    }

    #[test]
    fn long_constant_chains_declared_in_reverse() {
        let count = 20_000;
        let mut reversed: Vec<String> = (1..count).rev().map(|i| format!("const A{i} = A{} + 1;", i - 1)).collect();
        reversed.push("const A0 = 1;".to_string());
        let source = reversed.join("\n");

        let release = compile(CompileOptions::release(), &[&source]);
        assert!(release.is_success(), "{:?}", release.diagnostics);
        let meta = image::decode(&release.output.unwrap().image).unwrap();
        assert_eq!(meta.constants.len(), count);
        let last = meta.find_constant(&format!("A{}", count - 1)).unwrap();
        assert_eq!(last.init, ConstInit::Value(ConstValue::Int(count as i64)));

        let debug = compile(CompileOptions::debug(), &[&source]);
        assert!(debug.is_success(), "{:?}", debug.diagnostics);
        let meta = image::decode(&debug.output.unwrap().image).unwrap();
        assert!(matches!(meta.constants[0].init, ConstInit::Expr(_)));
    }
}
