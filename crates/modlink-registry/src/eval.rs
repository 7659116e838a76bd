//! Run-time evaluation of module constants.
//!
//! Debug images keep constant initializers unfolded. Reading such a constant
//! walks its expression and follows references into other modules through a
//! [`ModuleResolver`], which is how the host finds modules that are not yet
//! linked into the caller.
//!
//! References between constants are followed with an explicit work stack, so
//! a chain of any length evaluates without deep recursion. Only a single
//! initializer is walked recursively, and those are bounded by
//! [`MAX_EXPR_DEPTH`].

use modlink_core::{ConstExpr, ConstInit, ConstValue, MAX_EXPR_DEPTH};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{EvalError, ModuleHandle};

/// Finds a loaded module by name. Pure lookup: never loads or compiles.
pub trait ModuleResolver {
    fn resolve(&self, name: &str) -> Option<ModuleHandle>;
}

impl ModuleResolver for Vec<ModuleHandle> {
    fn resolve(&self, name: &str) -> Option<ModuleHandle> {
        self.iter().find(|m| m.name() == name).cloned()
    }
}

/// A constant by module and constant name.
type Key = (String, String);

enum Task {
    /// Schedule the constant's dependencies.
    Visit(ModuleHandle, String),
    /// Every dependency has a value; compute this one.
    Finish(ModuleHandle, String),
}

pub(crate) struct Evaluator<'r> {
    resolver: &'r dyn ModuleResolver,
    values: FxHashMap<Key, ConstValue>,
}

impl<'r> Evaluator<'r> {
    pub(crate) fn new(resolver: &'r dyn ModuleResolver) -> Self {
        Self {
            resolver,
            values: FxHashMap::default(),
        }
    }

    pub(crate) fn constant(&mut self, module: &ModuleHandle, name: &str) -> Result<ConstValue, EvalError> {
        let root = key(module, name);
        let mut stack = vec![Task::Visit(module.clone(), name.to_string())];
        // Visited but not finished. Images from the compiler are acyclic, but
        // handles can be built by hand.
        let mut active = FxHashSet::default();

        while let Some(task) = stack.pop() {
            match task {
                Task::Visit(module, name) => {
                    let key = key(&module, &name);
                    if self.values.contains_key(&key) {
                        continue;
                    }
                    let expr = match init(&module, &name)? {
                        ConstInit::Value(value) => {
                            self.values.insert(key, value.clone());
                            continue;
                        }
                        ConstInit::Expr(expr) => expr,
                    };
                    if !active.insert(key) {
                        return Err(EvalError::Cycle {
                            module: module.name().to_string(),
                            name,
                        });
                    }

                    let mut refs = Vec::new();
                    if !collect_refs(expr, 1, &mut refs) {
                        return Err(EvalError::TooDeep {
                            module: module.name().to_string(),
                            name,
                        });
                    }
                    let mut deps = Vec::with_capacity(refs.len());
                    for (target, dep) in refs {
                        deps.push(Task::Visit(self.module(&module, target)?, dep.to_string()));
                    }
                    stack.push(Task::Finish(module.clone(), name));
                    // Reversed so the leftmost reference is visited first.
                    stack.extend(deps.into_iter().rev());
                }
                Task::Finish(module, name) => {
                    let value = match init(&module, &name)? {
                        ConstInit::Value(value) => value.clone(),
                        ConstInit::Expr(expr) => self.expr(&module, expr)?,
                    };
                    let key = key(&module, &name);
                    active.remove(&key);
                    self.values.insert(key, value);
                }
            }
        }

        self.values
            .get(&root)
            .cloned()
            .ok_or_else(|| unknown(module.name(), name))
    }

    /// The module a reference made from inside `module` points at.
    fn module(&self, module: &ModuleHandle, target: Option<&str>) -> Result<ModuleHandle, EvalError> {
        match target {
            None => Ok(module.clone()),
            Some(target) if target == module.name() => Ok(module.clone()),
            Some(target) => self
                .resolver
                .resolve(target)
                .ok_or_else(|| EvalError::UnresolvedModule(target.to_string())),
        }
    }

    /// Evaluate one initializer whose references all have values.
    fn expr(&self, module: &ModuleHandle, expr: &ConstExpr) -> Result<ConstValue, EvalError> {
        match expr {
            ConstExpr::Literal(value) => Ok(value.clone()),
            ConstExpr::Ref { module: target, name } => {
                let target = target.as_deref().unwrap_or(module.name());
                self.values
                    .get(&(target.to_string(), name.clone()))
                    .cloned()
                    .ok_or_else(|| unknown(target, name))
            }
            ConstExpr::Neg(inner) => Ok(self.expr(module, inner)?.neg()?),
            ConstExpr::Binary { op, lhs, rhs } => {
                let lhs = self.expr(module, lhs)?;
                let rhs = self.expr(module, rhs)?;
                Ok(lhs.binary(*op, &rhs)?)
            }
        }
    }
}

fn key(module: &ModuleHandle, name: &str) -> Key {
    (module.name().to_string(), name.to_string())
}

fn init<'m>(module: &'m ModuleHandle, name: &str) -> Result<&'m ConstInit, EvalError> {
    module
        .find_constant(name)
        .map(|def| &def.init)
        .ok_or_else(|| unknown(module.name(), name))
}

fn unknown(module: &str, name: &str) -> EvalError {
    EvalError::UnknownConstant {
        module: module.to_string(),
        name: name.to_string(),
    }
}

/// Push every reference in `expr`, left to right. Returns `false` if the
/// tree is deeper than [`MAX_EXPR_DEPTH`].
fn collect_refs<'e>(expr: &'e ConstExpr, depth: usize, out: &mut Vec<(Option<&'e str>, &'e str)>) -> bool {
    if depth > MAX_EXPR_DEPTH {
        return false;
    }
    match expr {
        ConstExpr::Literal(_) => true,
        ConstExpr::Ref { module, name } => {
            out.push((module.as_deref(), name.as_str()));
            true
        }
        ConstExpr::Neg(inner) => collect_refs(inner, depth + 1, out),
        ConstExpr::Binary { lhs, rhs, .. } => {
            collect_refs(lhs, depth + 1, out) && collect_refs(rhs, depth + 1, out)
        }
    }
}
