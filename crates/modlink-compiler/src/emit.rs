//! Emission - turn checked declarations into a module image.
//!
//! Only runs when no error diagnostic was produced, so every declaration it
//! sees has resolved.

use modlink_core::{
    ConstDef, ConstInit, DebugSymbols, FieldDef, ModuleMetadata, OptimizationLevel, SymbolEntry,
    SymbolKind, TypeDef, image,
};

use crate::passes::{Declarations, LoweredConst, ResolvedType};

/// Buffers produced by a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedModule {
    /// Encoded module image.
    pub image: Vec<u8>,
    /// Encoded debug symbols, present for debug builds.
    pub symbols: Option<Vec<u8>>,
}

pub struct Emitter<'a, 'ast> {
    module: &'a str,
    optimization: OptimizationLevel,
    decls: &'a Declarations<'ast>,
}

impl<'a, 'ast> Emitter<'a, 'ast> {
    pub fn new(module: &'a str, optimization: OptimizationLevel, decls: &'a Declarations<'ast>) -> Self {
        Self {
            module,
            optimization,
            decls,
        }
    }

    /// Build the module metadata the image encodes.
    pub fn metadata(
        &self,
        types: &[ResolvedType<'ast>],
        constants: &[LoweredConst],
        references: Vec<String>,
    ) -> ModuleMetadata {
        let mut metadata = ModuleMetadata::new(self.module);
        metadata.optimization = self.optimization;
        metadata.references = references;

        for (entry, resolved) in self.decls.types.iter().zip(types) {
            let mut def = TypeDef::new(self.module, entry.decl.name.name).with_flags(entry.decl.flags);
            def.base = resolved.base.clone();
            def.fields = resolved
                .fields
                .iter()
                .map(|f| FieldDef {
                    name: f.decl.name.name.to_string(),
                    ty: f.ty.clone(),
                })
                .collect();
            metadata.types.push(def);
        }

        for (entry, lowered) in self.decls.constants.iter().zip(constants) {
            let Some(value) = &lowered.value else {
                continue;
            };
            let init = match (self.optimization, &lowered.expr) {
                (OptimizationLevel::Debug, Some(expr)) => ConstInit::Expr(expr.clone()),
                _ => ConstInit::Value(value.clone()),
            };
            metadata.constants.push(ConstDef {
                name: entry.decl.name.name.to_string(),
                kind: value.kind(),
                init,
            });
        }

        metadata
    }

    /// Debug symbols: every unit origin plus the position of every member.
    pub fn symbols(&self, origins: Vec<String>) -> DebugSymbols {
        let mut symbols = DebugSymbols::new(self.module);
        symbols.units = origins;

        for entry in &self.decls.types {
            let name = entry.decl.name;
            symbols.entries.push(SymbolEntry {
                kind: SymbolKind::Type,
                qualified_name: name.name.to_string(),
                unit: entry.unit as u32,
                span: name.span,
            });
            for field in entry.decl.fields {
                symbols.entries.push(SymbolEntry {
                    kind: SymbolKind::Field,
                    qualified_name: format!("{}.{}", name.name, field.name.name),
                    unit: entry.unit as u32,
                    span: field.name.span,
                });
            }
        }

        for entry in &self.decls.constants {
            symbols.entries.push(SymbolEntry {
                kind: SymbolKind::Constant,
                qualified_name: entry.decl.name.name.to_string(),
                unit: entry.unit as u32,
                span: entry.decl.name.span,
            });
        }

        symbols
    }

    pub fn emit(&self, metadata: &ModuleMetadata, symbols: Option<&DebugSymbols>) -> EmittedModule {
        EmittedModule {
            image: image::encode(metadata),
            symbols: symbols.map(DebugSymbols::encode),
        }
    }
}
