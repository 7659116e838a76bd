//! Path resolution against local declarations and the reference snapshot.
//!
//! ## Resolution Order
//!
//! ```text
//! Name        builtin type -> local declaration
//! Self.Name   local declaration
//! Other.Name  referenced module `Other` (unresolved-module diagnostic if absent)
//! ```
//!
//! Every failure is reported exactly once, at the path that caused it.

use modlink_core::{BuiltinType, ConstDef, DiagnosticCode, ModuleMetadata, TypeDef, TypeRef};
use modlink_parser::Path;

use crate::context::CompilationContext;
use crate::passes::Declarations;

/// Where a constant path points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstTarget<'r> {
    /// Index into [`Declarations::constants`].
    Local(usize),
    External {
        module: &'r str,
        def: &'r ConstDef,
    },
}

pub struct NameResolver<'c, 'r, 'ast> {
    ctx: &'c mut CompilationContext<'r>,
    decls: &'c Declarations<'ast>,
}

impl<'c, 'r, 'ast> NameResolver<'c, 'r, 'ast> {
    pub fn new(ctx: &'c mut CompilationContext<'r>, decls: &'c Declarations<'ast>) -> Self {
        Self { ctx, decls }
    }

    pub fn ctx(&mut self) -> &mut CompilationContext<'r> {
        self.ctx
    }

    /// Resolve a path used in type position.
    pub fn resolve_type(&mut self, unit: usize, path: &Path<'_>) -> Option<TypeRef> {
        let name = path.name;
        match path.qualifier {
            None => {
                if let Some(builtin) = BuiltinType::from_name(name.name) {
                    return Some(TypeRef::Builtin(builtin));
                }
                if self.decls.type_id(name.name).is_some() {
                    return Some(TypeRef::Local(name.name.to_string()));
                }
                self.unknown_type(unit, path, format!("unknown type `{}`", name.name));
                None
            }
            Some(qualifier) if self.ctx.is_self(qualifier) => {
                if self.decls.type_id(name.name).is_some() {
                    return Some(TypeRef::Local(name.name.to_string()));
                }
                self.unknown_type(
                    unit,
                    path,
                    format!("module `{}` has no type `{}`", qualifier.name, name.name),
                );
                None
            }
            Some(qualifier) => {
                let module = self.ctx.external_module(unit, qualifier)?;
                if module.find_type(name.name).is_some() {
                    return Some(TypeRef::external(qualifier.name, name.name));
                }
                self.unknown_type(
                    unit,
                    path,
                    format!("module `{}` has no type `{}`", qualifier.name, name.name),
                );
                None
            }
        }
    }

    /// Resolve a path used in expression position.
    pub fn resolve_const(&mut self, unit: usize, path: &Path<'_>) -> Option<ConstTarget<'r>> {
        let name = path.name;
        match path.qualifier {
            Some(qualifier) if !self.ctx.is_self(qualifier) => {
                let module = self.ctx.external_module(unit, qualifier)?;
                if let Some(def) = module.find_constant(name.name) {
                    return Some(ConstTarget::External {
                        module: module.name.as_str(),
                        def,
                    });
                }
                self.unknown_constant(
                    unit,
                    path,
                    format!("module `{}` has no constant `{}`", qualifier.name, name.name),
                );
                None
            }
            qualifier => {
                if let Some(id) = self.decls.const_id(name.name) {
                    return Some(ConstTarget::Local(id));
                }
                let message = match qualifier {
                    Some(q) => format!("module `{}` has no constant `{}`", q.name, name.name),
                    None => format!("unknown constant `{}`", name.name),
                };
                self.unknown_constant(unit, path, message);
                None
            }
        }
    }

    fn unknown_type(&mut self, unit: usize, path: &Path<'_>, message: String) {
        self.ctx.report(DiagnosticCode::UnknownType, unit, path.span(), message);
    }

    fn unknown_constant(&mut self, unit: usize, path: &Path<'_>, message: String) {
        self.ctx.report(DiagnosticCode::UnknownConstant, unit, path.span(), message);
    }
}

/// Look up an external type and the module it lives in.
pub fn external_type<'r>(
    ctx: &CompilationContext<'r>,
    module: &str,
    name: &str,
) -> Option<(&'r ModuleMetadata, &'r TypeDef)> {
    let metadata = ctx.references().get(module)?.metadata();
    let def = metadata.find_type(name)?;
    Some((metadata, def))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::RegistrationPass;
    use crate::passes::test_support::{parse_units, refs};
    use modlink_parser::Ident;
    use modlink_core::Span;

    fn path<'a>(qualifier: Option<&'a str>, name: &'a str) -> Path<'a> {
        let ident = |n: &'a str| Ident {
            name: n,
            span: Span::new(1, 1, n.len() as u32),
        };
        Path {
            qualifier: qualifier.map(ident),
            name: ident(name),
        }
    }

    #[test]
    fn type_resolution_order() {
        let arena = bumpalo::Bump::new();
        let units = parse_units(&arena, &["type Local {}"]);
        let refs = refs();
        let mut ctx = CompilationContext::new("Mod", &refs);
        let decls = RegistrationPass::new(&mut ctx).run(&units);
        let mut resolver = NameResolver::new(&mut ctx, &decls);

        assert_eq!(
            resolver.resolve_type(0, &path(None, "int")),
            Some(TypeRef::Builtin(BuiltinType::Int))
        );
        assert_eq!(
            resolver.resolve_type(0, &path(None, "Local")),
            Some(TypeRef::Local("Local".into()))
        );
        assert_eq!(
            resolver.resolve_type(0, &path(Some("Mod"), "Local")),
            Some(TypeRef::Local("Local".into()))
        );
        assert_eq!(
            resolver.resolve_type(0, &path(Some("Core"), "A")),
            Some(TypeRef::external("Core", "A"))
        );
        assert!(ctx.take_diagnostics().is_empty());
        assert_eq!(ctx.used_modules(), ["Core"]);
    }

    #[test]
    fn type_resolution_failures() {
        let arena = bumpalo::Bump::new();
        let units = parse_units(&arena, &[""]);
        let refs = refs();
        let mut ctx = CompilationContext::new("Mod", &refs);
        let decls = RegistrationPass::new(&mut ctx).run(&units);
        let mut resolver = NameResolver::new(&mut ctx, &decls);

        assert!(resolver.resolve_type(0, &path(None, "Missing")).is_none());
        assert!(resolver.resolve_type(0, &path(Some("Core"), "Missing")).is_none());
        assert!(resolver.resolve_type(0, &path(Some("Unknown"), "X")).is_none());

        let codes: Vec<_> = ctx.take_diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            [
                DiagnosticCode::UnknownType,
                DiagnosticCode::UnknownType,
                DiagnosticCode::UnresolvedModule
            ]
        );
    }

    #[test]
    fn constant_resolution() {
        let arena = bumpalo::Bump::new();
        let units = parse_units(&arena, &["const X = 1;"]);
        let refs = refs();
        let mut ctx = CompilationContext::new("Mod", &refs);
        let decls = RegistrationPass::new(&mut ctx).run(&units);
        let mut resolver = NameResolver::new(&mut ctx, &decls);

        assert_eq!(resolver.resolve_const(0, &path(None, "X")), Some(ConstTarget::Local(0)));
        assert_eq!(resolver.resolve_const(0, &path(Some("Mod"), "X")), Some(ConstTarget::Local(0)));
        assert!(matches!(
            resolver.resolve_const(0, &path(Some("Core"), "MAX")),
            Some(ConstTarget::External { module: "Core", .. })
        ));
        assert!(resolver.resolve_const(0, &path(None, "Y")).is_none());
        assert!(resolver.resolve_const(0, &path(Some("Core"), "Y")).is_none());

        let codes: Vec<_> = ctx.take_diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(codes, [DiagnosticCode::UnknownConstant, DiagnosticCode::UnknownConstant]);
    }
}
