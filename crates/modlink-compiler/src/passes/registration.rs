//! Registration Pass (Pass 1) - collect every declaration of the module.
//!
//! Walks all parsed units in submission order and records each type and
//! constant under its name, so later passes can resolve forward references and
//! references across units. Nothing is resolved here.
//!
//! ## Responsibilities
//!
//! - Reject duplicate type and constant names (first declaration wins)
//! - Reject types named after builtins
//! - Reject `sealed` combined with `abstract`

use modlink_core::{BuiltinType, DiagnosticCode, TypeFlags};
use modlink_parser::{ConstDecl, Item, TypeDecl};
use rustc_hash::FxHashMap;

use crate::context::CompilationContext;
use crate::passes::ParsedUnit;

/// A type declaration and the unit it came from.
#[derive(Debug, Clone, Copy)]
pub struct TypeEntry<'ast> {
    pub unit: usize,
    pub decl: &'ast TypeDecl<'ast>,
}

/// A constant declaration and the unit it came from.
#[derive(Debug, Clone, Copy)]
pub struct ConstEntry<'ast> {
    pub unit: usize,
    pub decl: &'ast ConstDecl<'ast>,
}

/// Every declaration that survived registration, in declaration order.
#[derive(Debug, Default)]
pub struct Declarations<'ast> {
    pub types: Vec<TypeEntry<'ast>>,
    pub constants: Vec<ConstEntry<'ast>>,
    type_index: FxHashMap<&'ast str, usize>,
    const_index: FxHashMap<&'ast str, usize>,
}

impl<'ast> Declarations<'ast> {
    /// Index of the local type named `name`.
    pub fn type_id(&self, name: &str) -> Option<usize> {
        self.type_index.get(name).copied()
    }

    /// Index of the local constant named `name`.
    pub fn const_id(&self, name: &str) -> Option<usize> {
        self.const_index.get(name).copied()
    }
}

/// Pass 1: register all declarations.
pub struct RegistrationPass<'a, 'r> {
    ctx: &'a mut CompilationContext<'r>,
}

impl<'a, 'r> RegistrationPass<'a, 'r> {
    pub fn new(ctx: &'a mut CompilationContext<'r>) -> Self {
        Self { ctx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run<'ast>(mut self, units: &[ParsedUnit<'ast>]) -> Declarations<'ast> {
        let mut decls = Declarations::default();
        for unit in units {
            for item in unit.script.items() {
                match item {
                    Item::Type(decl) => self.register_type(&mut decls, unit.index, decl),
                    Item::Const(decl) => self.register_const(&mut decls, unit.index, decl),
                }
            }
        }
        decls
    }

    fn register_type<'ast>(&mut self, decls: &mut Declarations<'ast>, unit: usize, decl: &'ast TypeDecl<'ast>) {
        let name = decl.name;
        if decl.flags.contains(TypeFlags::SEALED | TypeFlags::ABSTRACT) {
            self.ctx.report(
                DiagnosticCode::ConflictingModifiers,
                unit,
                decl.span,
                format!("type `{}` cannot be both sealed and abstract", name.name),
            );
        }

        if BuiltinType::from_name(name.name).is_some() {
            self.ctx.report(
                DiagnosticCode::DuplicateDefinition,
                unit,
                name.span,
                format!("type `{}` conflicts with a builtin type", name.name),
            );
            return;
        }
        if decls.type_index.contains_key(name.name) {
            self.ctx.report(
                DiagnosticCode::DuplicateDefinition,
                unit,
                name.span,
                format!("type `{}` is defined more than once", name.name),
            );
            return;
        }

        decls.type_index.insert(name.name, decls.types.len());
        decls.types.push(TypeEntry { unit, decl });
    }

    fn register_const<'ast>(&mut self, decls: &mut Declarations<'ast>, unit: usize, decl: &'ast ConstDecl<'ast>) {
        let name = decl.name;
        if decls.const_index.contains_key(name.name) {
            self.ctx.report(
                DiagnosticCode::DuplicateDefinition,
                unit,
                name.span,
                format!("constant `{}` is defined more than once", name.name),
            );
            return;
        }

        decls.const_index.insert(name.name, decls.constants.len());
        decls.constants.push(ConstEntry { unit, decl });
    }
}
