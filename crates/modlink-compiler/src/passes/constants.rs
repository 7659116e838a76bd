//! Constant Pass (Pass 3) - resolve, order and evaluate constants.
//!
//! Every constant is evaluated at compile time, whatever the build mode: that
//! is where type errors and divisions by zero are found. Release builds store
//! the value; debug builds store the resolved expression and leave evaluation
//! to run time.
//!
//! ## Responsibilities
//!
//! - Resolve constant references, local and external
//! - Detect dependency cycles (one error per cycle)
//! - Evaluate, reporting type mismatches, division by zero and overflow at the
//!   operator that caused them
//! - A constant that depends on a broken constant fails silently; only the
//!   root cause is reported

use modlink_core::{
    ArithmeticError, BinaryOp, ConstDef, ConstExpr, ConstInit, ConstValue, DiagnosticCode, Span,
};
use modlink_parser::Expr;
use modlink_registry::ReferenceSet;

use crate::context::CompilationContext;
use crate::graph::{dependency_order, find_cycles};
use crate::passes::Declarations;
use crate::resolver::{ConstTarget, NameResolver};

/// Recursion budget for other modules' unfolded constants. Reference hops and
/// expression levels both count against it.
const MAX_EXTERNAL_DEPTH: usize = 1024;

/// Result for one entry of [`Declarations::constants`].
#[derive(Debug, Clone, Default)]
pub struct LoweredConst {
    /// The resolved initializer, if every reference in it resolved.
    pub expr: Option<ConstExpr>,
    /// The compile-time value, if evaluation succeeded.
    pub value: Option<ConstValue>,
}

/// Resolved initializer, with the spans evaluation errors point at.
#[derive(Debug, Clone)]
enum Node<'r> {
    Literal(ConstValue),
    Local(usize),
    External {
        module: &'r str,
        def: &'r ConstDef,
        span: Span,
    },
    Neg(Box<Node<'r>>, Span),
    Binary {
        op: BinaryOp,
        lhs: Box<Node<'r>>,
        rhs: Box<Node<'r>>,
        span: Span,
    },
}

pub struct ConstantPass<'a, 'r, 'ast> {
    ctx: &'a mut CompilationContext<'r>,
    decls: &'a Declarations<'ast>,
}

impl<'a, 'r, 'ast> ConstantPass<'a, 'r, 'ast> {
    pub fn new(ctx: &'a mut CompilationContext<'r>, decls: &'a Declarations<'ast>) -> Self {
        Self { ctx, decls }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> Vec<LoweredConst> {
        let nodes = self.lower_all();
        let edges = dependency_edges(&nodes);
        let cyclic = self.check_cycles(nodes.len(), &edges);

        // Dependencies are evaluated before their dependents, so a local
        // reference only ever reads a finished value.
        let decls = self.decls;
        let mut evaluator = Evaluator {
            ctx: &mut *self.ctx,
            values: vec![None; nodes.len()],
        };
        for id in dependency_order(nodes.len(), edges) {
            if let (Some(node), false) = (&nodes[id], cyclic[id]) {
                evaluator.values[id] = evaluator.eval(decls.constants[id].unit, node);
            }
        }
        let values = evaluator.values;

        nodes
            .iter()
            .zip(values)
            .map(|(node, value)| LoweredConst {
                expr: node.as_ref().map(|n| self.to_const_expr(n)),
                value,
            })
            .collect()
    }

    // =========================================
    // Lowering
    // =========================================

    fn lower_all(&mut self) -> Vec<Option<Node<'r>>> {
        let decls = self.decls;
        let mut resolver = NameResolver::new(&mut *self.ctx, decls);
        decls
            .constants
            .iter()
            .map(|entry| lower(&mut resolver, entry.unit, entry.decl.value))
            .collect()
    }

    fn to_const_expr(&self, node: &Node<'r>) -> ConstExpr {
        match node {
            Node::Literal(value) => ConstExpr::Literal(value.clone()),
            Node::Local(id) => ConstExpr::Ref {
                module: None,
                name: self.decls.constants[*id].decl.name.name.to_string(),
            },
            Node::External { module, def, .. } => ConstExpr::Ref {
                module: Some(module.to_string()),
                name: def.name.clone(),
            },
            Node::Neg(inner, _) => ConstExpr::Neg(Box::new(self.to_const_expr(inner))),
            Node::Binary { op, lhs, rhs, .. } => ConstExpr::Binary {
                op: *op,
                lhs: Box::new(self.to_const_expr(lhs)),
                rhs: Box::new(self.to_const_expr(rhs)),
            },
        }
    }

    // =========================================
    // Cycles
    // =========================================

    fn check_cycles(&mut self, count: usize, edges: &[(usize, usize)]) -> Vec<bool> {
        let mut cyclic = vec![false; count];
        for cycle in find_cycles(count, edges.iter().copied()) {
            let names: Vec<_> = cycle
                .iter()
                .map(|id| format!("`{}`", self.decls.constants[*id].decl.name.name))
                .collect();
            let message = match names.as_slice() {
                [single] => format!("constant {single} depends on itself"),
                _ => format!("constants {} form a dependency cycle", names.join(", ")),
            };
            let entry = self.decls.constants[cycle[0]];
            self.ctx
                .report(DiagnosticCode::ConstantCycle, entry.unit, entry.decl.name.span, message);
            for id in cycle {
                cyclic[id] = true;
            }
        }
        cyclic
    }
}

/// Resolve an initializer. Both sides of an operator are always visited so
/// every bad reference is reported.
fn lower<'r>(resolver: &mut NameResolver<'_, 'r, '_>, unit: usize, expr: &Expr<'_>) -> Option<Node<'r>> {
    match expr {
        Expr::Int(v, _) => Some(Node::Literal(ConstValue::Int(*v))),
        Expr::Float(v, _) => Some(Node::Literal(ConstValue::float(*v))),
        Expr::Str(s, _) => Some(Node::Literal(ConstValue::Str((*s).to_string()))),
        Expr::Bool(b, _) => Some(Node::Literal(ConstValue::Bool(*b))),
        Expr::Path(path) => match resolver.resolve_const(unit, path)? {
            ConstTarget::Local(id) => Some(Node::Local(id)),
            ConstTarget::External { module, def } => Some(Node::External {
                module,
                def,
                span: path.span(),
            }),
        },
        Expr::Neg(inner, span) => {
            let inner = lower(resolver, unit, inner)?;
            Some(Node::Neg(Box::new(inner), *span))
        }
        Expr::Binary { op, lhs, rhs, span } => {
            let lhs = lower(resolver, unit, lhs);
            let rhs = lower(resolver, unit, rhs);
            Some(Node::Binary {
                op: *op,
                lhs: Box::new(lhs?),
                rhs: Box::new(rhs?),
                span: *span,
            })
        }
    }
}

/// `(dependent, dependency)` pairs between local constants.
fn dependency_edges(nodes: &[Option<Node<'_>>]) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for (id, node) in nodes.iter().enumerate() {
        if let Some(node) = node {
            let mut deps = Vec::new();
            local_deps(node, &mut deps);
            edges.extend(deps.into_iter().map(|dep| (id, dep)));
        }
    }
    edges
}

fn local_deps(node: &Node<'_>, out: &mut Vec<usize>) {
    match node {
        Node::Local(id) => out.push(*id),
        Node::Neg(inner, _) => local_deps(inner, out),
        Node::Binary { lhs, rhs, .. } => {
            local_deps(lhs, out);
            local_deps(rhs, out);
        }
        Node::Literal(_) | Node::External { .. } => {}
    }
}

// =========================================
// Evaluation
// =========================================

struct Evaluator<'e, 'r> {
    ctx: &'e mut CompilationContext<'r>,
    /// `None` until evaluated, and for broken or cyclic constants.
    values: Vec<Option<ConstValue>>,
}

impl<'e, 'r> Evaluator<'e, 'r> {
    fn eval(&mut self, unit: usize, node: &Node<'r>) -> Option<ConstValue> {
        match node {
            Node::Literal(value) => Some(value.clone()),
            Node::Local(id) => self.values[*id].clone(),
            Node::External { module, def, span } => {
                let value = external_value(self.ctx.references(), module, def, 0);
                if value.is_none() {
                    self.ctx.report(
                        DiagnosticCode::UnknownConstant,
                        unit,
                        *span,
                        format!("constant `{module}.{}` cannot be evaluated at compile time", def.name),
                    );
                }
                value
            }
            Node::Neg(inner, span) => {
                let value = self.eval(unit, inner)?;
                self.arithmetic(unit, *span, value.neg())
            }
            Node::Binary { op, lhs, rhs, span } => {
                let lhs = self.eval(unit, lhs);
                let rhs = self.eval(unit, rhs);
                let (lhs, rhs) = (lhs?, rhs?);
                self.arithmetic(unit, *span, lhs.binary(*op, &rhs))
            }
        }
    }

    fn arithmetic(
        &mut self,
        unit: usize,
        span: Span,
        result: Result<ConstValue, ArithmeticError>,
    ) -> Option<ConstValue> {
        let error = match result {
            Ok(value) => return Some(value),
            Err(error) => error,
        };
        let code = match error {
            ArithmeticError::DivisionByZero => DiagnosticCode::DivisionByZero,
            ArithmeticError::Overflow { .. } => DiagnosticCode::ArithmeticOverflow,
            ArithmeticError::TypeMismatch { .. } | ArithmeticError::InvalidNegation(_) => {
                DiagnosticCode::TypeMismatch
            }
        };
        self.ctx.report(code, unit, span, error.to_string());
        None
    }
}

/// Compile-time value of a constant of another module.
///
/// Folded constants are read directly. Unfolded ones (from debug images) are
/// evaluated against the same reference snapshot the compile runs with.
fn external_value(refs: &ReferenceSet, module: &str, def: &ConstDef, depth: usize) -> Option<ConstValue> {
    match &def.init {
        ConstInit::Value(value) => Some(value.clone()),
        ConstInit::Expr(expr) => external_expr(refs, module, expr, depth),
    }
}

fn external_expr(refs: &ReferenceSet, module: &str, expr: &ConstExpr, depth: usize) -> Option<ConstValue> {
    if depth > MAX_EXTERNAL_DEPTH {
        return None;
    }
    match expr {
        ConstExpr::Literal(value) => Some(value.clone()),
        ConstExpr::Ref { module: target, name } => {
            let target = target.as_deref().unwrap_or(module);
            let def = refs.get(target)?.metadata().find_constant(name)?;
            external_value(refs, target, def, depth + 1)
        }
        ConstExpr::Neg(inner) => external_expr(refs, module, inner, depth + 1)?.neg().ok(),
        ConstExpr::Binary { op, lhs, rhs } => {
            let lhs = external_expr(refs, module, lhs, depth + 1)?;
            let rhs = external_expr(refs, module, rhs, depth + 1)?;
            lhs.binary(*op, &rhs).ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::RegistrationPass;
    use crate::passes::test_support::{parse_units, refs};
    use modlink_core::Diagnostic;
    use std::fmt::Write;

    fn lower_consts(sources: &[&str]) -> (Vec<Diagnostic>, Vec<LoweredConst>) {
        let arena = bumpalo::Bump::new();
        let units = parse_units(&arena, sources);
        let refs = refs();
        let mut ctx = CompilationContext::new("Mod", &refs);
        let decls = RegistrationPass::new(&mut ctx).run(&units);
        let lowered = ConstantPass::new(&mut ctx, &decls).run();
        (ctx.take_diagnostics(), lowered)
    }

    fn codes(diags: &[Diagnostic]) -> Vec<DiagnosticCode> {
        diags.iter().map(|d| d.code).collect()
    }

    #[test]
    fn evaluates_with_forward_and_external_references() {
        let (diags, consts) = lower_consts(&["const A = B * 2 + Core.MAX; const B = 4;", "const S = \"v\" + Mod.T; const T = \"1\";"]);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(consts[0].value, Some(ConstValue::Int(18)));
        assert_eq!(consts[2].value, Some(ConstValue::Str("v1".into())));
        assert_eq!(
            consts[0].expr.as_ref().map(ToString::to_string).as_deref(),
            Some("((B * 2) + Core.MAX)")
        );
    }

    #[test]
    fn unfolded_external_constants_are_evaluated() {
        let (diags, consts) = lower_consts(&["const X = Core.DERIVED + 1;"]);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(consts[0].value, Some(ConstValue::Int(21)));
    }

    #[test]
    fn arithmetic_errors() {
        let (diags, consts) = lower_consts(&[
            "const A = -\"x\";",
            "const B = \"a\" * 2;",
            "const C = 1 / (2 - 2);",
            "const D = 9223372036854775807 + 1;",
        ]);
        assert_eq!(
            codes(&diags),
            [
                DiagnosticCode::TypeMismatch,
                DiagnosticCode::TypeMismatch,
                DiagnosticCode::DivisionByZero,
                DiagnosticCode::ArithmeticOverflow
            ]
        );
        assert!(consts.iter().all(|c| c.value.is_none()));
        assert_eq!(diags[2].location.map(|l| l.span.col), Some(11));
    }

    #[test]
    fn dependents_of_broken_constants_stay_quiet() {
        let (diags, consts) = lower_consts(&["const A = 1 / 0; const B = A + 1; const C = B * 2;"]);
        assert_eq!(codes(&diags), [DiagnosticCode::DivisionByZero]);
        assert!(consts[2].value.is_none());
    }

    #[test]
    fn cycles_are_reported_once() {
        let (diags, _) = lower_consts(&["const A = B; const B = A + 1; const C = C; const D = A;"]);
        assert_eq!(codes(&diags), [DiagnosticCode::ConstantCycle, DiagnosticCode::ConstantCycle]);
        assert!(diags[0].message.contains("`A`, `B`"));
        assert!(diags[1].message.contains("`C` depends on itself"));
    }

    #[test]
    fn long_chains_declared_in_reverse() {
        let count = 20_000;
        let mut source = String::new();
        for i in (1..count).rev() {
            let _ = writeln!(source, "const A{i} = A{} + 1;", i - 1);
        }
        source.push_str("const A0 = 1;");

        let (diags, consts) = lower_consts(&[&source]);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(consts[0].value, Some(ConstValue::Int(count as i64)));
        assert_eq!(consts[count - 1].value, Some(ConstValue::Int(1)));
    }

    #[test]
    fn every_bad_reference_is_reported() {
        let (diags, consts) = lower_consts(&["const A = Missing + Unknown.X + Core.NOPE;"]);
        assert_eq!(
            codes(&diags),
            [
                DiagnosticCode::UnknownConstant,
                DiagnosticCode::UnresolvedModule,
                DiagnosticCode::UnknownConstant
            ]
        );
        assert!(consts[0].expr.is_none());
    }
}
