//! Type Pass (Pass 2) - resolve and check type declarations.
//!
//! ## Responsibilities
//!
//! - Resolve base types and field types
//! - Reject builtin and sealed bases
//! - Reject duplicate fields within a type
//! - Detect inheritance cycles among local types (one error per cycle)
//! - Warn when a field re-declares an inherited field

use modlink_core::{DiagnosticCode, TypeFlags, TypeRef};
use modlink_parser::FieldDecl;
use rustc_hash::FxHashSet;

use crate::context::CompilationContext;
use crate::graph::find_cycles;
use crate::passes::Declarations;
use crate::resolver::{NameResolver, external_type};

/// A field whose type resolved.
#[derive(Debug, Clone)]
pub struct ResolvedField<'ast> {
    pub decl: &'ast FieldDecl<'ast>,
    pub ty: TypeRef,
}

/// Resolution result for one entry of [`Declarations::types`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedType<'ast> {
    /// `None` when there is no base or it failed to resolve.
    pub base: Option<TypeRef>,
    /// Unique fields with resolved types, in declaration order.
    pub fields: Vec<ResolvedField<'ast>>,
    pub in_cycle: bool,
}

pub struct TypePass<'a, 'r, 'ast> {
    ctx: &'a mut CompilationContext<'r>,
    decls: &'a Declarations<'ast>,
}

impl<'a, 'r, 'ast> TypePass<'a, 'r, 'ast> {
    pub fn new(ctx: &'a mut CompilationContext<'r>, decls: &'a Declarations<'ast>) -> Self {
        Self { ctx, decls }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> Vec<ResolvedType<'ast>> {
        let mut resolved = self.resolve_all();
        self.check_cycles(&mut resolved);
        self.check_shadowing(&resolved);
        resolved
    }

    fn resolve_all(&mut self) -> Vec<ResolvedType<'ast>> {
        let decls = self.decls;
        let mut resolver = NameResolver::new(self.ctx, decls);
        let mut out = Vec::with_capacity(decls.types.len());

        for entry in &decls.types {
            let decl = entry.decl;
            let mut resolved = ResolvedType::default();

            if let Some(path) = &decl.base
                && let Some(base) = resolver.resolve_type(entry.unit, path)
            {
                let rejection = match &base {
                    TypeRef::Builtin(b) => Some((
                        DiagnosticCode::InvalidBase,
                        format!("type `{}` cannot extend builtin type `{}`", decl.name.name, b.name()),
                    )),
                    TypeRef::Local(name) => decls
                        .type_id(name)
                        .filter(|id| decls.types[*id].decl.flags.contains(TypeFlags::SEALED))
                        .map(|_| sealed_base(decl.name.name, path)),
                    TypeRef::External { module, name } => external_type(resolver.ctx(), module, name)
                        .filter(|(_, def)| def.is_sealed())
                        .map(|_| sealed_base(decl.name.name, path)),
                };
                match rejection {
                    Some((code, message)) => resolver.ctx().report(code, entry.unit, path.span(), message),
                    None => resolved.base = Some(base),
                }
            }

            let mut seen = FxHashSet::default();
            for field in decl.fields {
                if !seen.insert(field.name.name) {
                    resolver.ctx().report(
                        DiagnosticCode::DuplicateField,
                        entry.unit,
                        field.name.span,
                        format!("duplicate field `{}` in type `{}`", field.name.name, decl.name.name),
                    );
                    continue;
                }
                if let Some(ty) = resolver.resolve_type(entry.unit, &field.ty) {
                    resolved.fields.push(ResolvedField { decl: field, ty });
                }
            }

            out.push(resolved);
        }
        out
    }

    fn check_cycles(&mut self, resolved: &mut [ResolvedType<'ast>]) {
        let decls = self.decls;
        let base_id = |r: &ResolvedType<'_>| match &r.base {
            Some(TypeRef::Local(name)) => decls.type_id(name),
            _ => None,
        };
        let edges: Vec<_> = resolved
            .iter()
            .enumerate()
            .filter_map(|(id, r)| base_id(r).map(|base| (id, base)))
            .collect();

        for cycle in find_cycles(resolved.len(), edges) {
            let start = cycle[0];
            // Every member has exactly one base, so following bases walks the cycle.
            let mut chain = vec![decls.types[start].decl.name.name];
            let mut current = base_id(&resolved[start]);
            while let Some(id) = current {
                chain.push(decls.types[id].decl.name.name);
                if id == start {
                    break;
                }
                current = base_id(&resolved[id]);
            }

            let entry = decls.types[start];
            self.ctx.report(
                DiagnosticCode::InheritanceCycle,
                entry.unit,
                entry.decl.name.span,
                format!("inheritance cycle: {}", chain.join(" -> ")),
            );
            for id in cycle {
                resolved[id].in_cycle = true;
            }
        }
    }

    fn check_shadowing(&mut self, resolved: &[ResolvedType<'ast>]) {
        for (id, ty) in resolved.iter().enumerate() {
            if ty.in_cycle {
                continue;
            }
            let Some(base) = &ty.base else {
                continue;
            };
            let inherited = self.inherited_fields(resolved, base);
            let entry = self.decls.types[id];
            for field in &ty.fields {
                if let Some(owner) = inherited.iter().find(|(name, _)| name == field.decl.name.name) {
                    self.ctx.report(
                        DiagnosticCode::ShadowedField,
                        entry.unit,
                        field.decl.name.span,
                        format!(
                            "field `{}` of `{}` shadows the field inherited from `{}`",
                            field.decl.name.name, entry.decl.name.name, owner.1
                        ),
                    );
                }
            }
        }
    }

    /// Every field reachable through `base`, paired with the type declaring it.
    fn inherited_fields(&self, resolved: &[ResolvedType<'ast>], base: &TypeRef) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = Some(base.clone());

        while let Some(ty) = current.take() {
            if !visited.insert(ty.to_string()) {
                break;
            }
            match &ty {
                TypeRef::Builtin(_) => {}
                TypeRef::Local(name) => {
                    let Some(id) = self.decls.type_id(name) else {
                        break;
                    };
                    if resolved[id].in_cycle {
                        break;
                    }
                    for field in &resolved[id].fields {
                        fields.push((field.decl.name.name.to_string(), ty.to_string()));
                    }
                    current = resolved[id].base.clone();
                }
                TypeRef::External { module, name } => {
                    let Some((metadata, def)) = external_type(&*self.ctx, module, name) else {
                        break;
                    };
                    for field in &def.fields {
                        fields.push((field.name.clone(), ty.to_string()));
                    }
                    // Bases stored in another module are relative to that module.
                    current = def.base.as_ref().map(|b| match b {
                        TypeRef::Local(base) => TypeRef::external(metadata.name.clone(), base.clone()),
                        other => other.clone(),
                    });
                }
            }
        }
        fields
    }
}

fn sealed_base(name: &str, path: &modlink_parser::Path<'_>) -> (DiagnosticCode, String) {
    (
        DiagnosticCode::SealedBase,
        format!("type `{name}` cannot extend sealed type `{path}`"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::RegistrationPass;
    use crate::passes::test_support::{parse_units, refs};
    use modlink_core::Diagnostic;

    fn check(sources: &[&str]) -> (Vec<Diagnostic>, Vec<(usize, Option<String>)>) {
        let arena = bumpalo::Bump::new();
        let units = parse_units(&arena, sources);
        let refs = refs();
        let mut ctx = CompilationContext::new("Mod", &refs);
        let decls = RegistrationPass::new(&mut ctx).run(&units);
        let resolved = TypePass::new(&mut ctx, &decls).run();
        let summary = resolved
            .iter()
            .map(|r| (r.fields.len(), r.base.as_ref().map(ToString::to_string)))
            .collect();
        (ctx.take_diagnostics(), summary)
    }

    fn codes(diags: &[Diagnostic]) -> Vec<DiagnosticCode> {
        diags.iter().map(|d| d.code).collect()
    }

    #[test]
    fn resolves_bases_and_fields() {
        let (diags, summary) = check(&["type C extends Core.A { hp: int; other: D; } type D {}"]);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(summary[0], (2, Some("Core.A".to_string())));
        assert_eq!(summary[1], (0, None));
    }

    #[test]
    fn builtin_and_sealed_bases() {
        let (diags, _) = check(&[
            "type A extends int {}",
            "sealed type S {} type B extends S {}",
            "type C extends Core.B {}",
        ]);
        assert_eq!(
            codes(&diags),
            [DiagnosticCode::InvalidBase, DiagnosticCode::SealedBase, DiagnosticCode::SealedBase]
        );
        assert_eq!(diags[2].location.map(|l| l.unit), Some(2));
    }

    #[test]
    fn duplicate_fields() {
        let (diags, summary) = check(&["type A { x: int; x: float; }"]);
        assert_eq!(codes(&diags), [DiagnosticCode::DuplicateField]);
        assert_eq!(summary[0].0, 1);
    }

    #[test]
    fn one_error_per_cycle() {
        let (diags, _) = check(&["type A extends B {} type B extends A {} type S extends S {} type Ok {}"]);
        assert_eq!(
            codes(&diags),
            [DiagnosticCode::InheritanceCycle, DiagnosticCode::InheritanceCycle]
        );
        assert!(diags[0].message.contains("A -> B -> A"), "{}", diags[0].message);
        assert!(diags[1].message.contains("S -> S"));
    }

    #[test]
    fn shadowed_fields_warn() {
        let (diags, _) = check(&[
            "type Base { hp: int; } type Mid extends Base {} type Leaf extends Mid { hp: int; }",
            "type Ext extends Core.Entity { id: string; }",
        ]);
        assert_eq!(codes(&diags), [DiagnosticCode::ShadowedField, DiagnosticCode::ShadowedField]);
        assert!(diags.iter().all(|d| !d.is_error()));
        assert!(diags[1].message.contains("Core.Entity"));
    }

    #[test]
    fn unresolved_base_module_reported_once() {
        let (diags, summary) = check(&["type D extends Unknown.X {}"]);
        assert_eq!(codes(&diags), [DiagnosticCode::UnresolvedModule]);
        assert!(diags[0].message.contains("Unknown"));
        assert_eq!(summary[0].1, None);
    }
}
