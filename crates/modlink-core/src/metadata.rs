//! Module metadata: the public surface a module exposes to other modules.
//!
//! A [`ModuleMetadata`] is what a module image decodes to and what a
//! compilation resolves symbols against. Host (native) modules describe
//! themselves with a [`ModuleBuilder`].

use std::fmt;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{BinaryOp, ConstValue, TypeHash, ValueKind};

bitflags! {
    /// Declaration modifiers of a type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// The type cannot be extended.
        const SEALED = 1 << 0;
        /// The type only exists to be extended.
        const ABSTRACT = 1 << 1;
    }
}

/// Types every module can name without a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BuiltinType {
    Int = 0,
    Float = 1,
    Bool = 2,
    String = 3,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(BuiltinType::Int),
            "float" => Some(BuiltinType::Float),
            "bool" => Some(BuiltinType::Bool),
            "string" => Some(BuiltinType::String),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        self.value_kind().name()
    }

    pub fn value_kind(self) -> ValueKind {
        match self {
            BuiltinType::Int => ValueKind::Int,
            BuiltinType::Float => ValueKind::Float,
            BuiltinType::Bool => ValueKind::Bool,
            BuiltinType::String => ValueKind::Str,
        }
    }
}

/// A resolved reference to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A builtin type.
    Builtin(BuiltinType),
    /// A type declared in the same module.
    Local(String),
    /// A type declared in another module.
    External { module: String, name: String },
}

impl TypeRef {
    pub fn external(module: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::External {
            module: module.into(),
            name: name.into(),
        }
    }

    /// The module this reference points into, if it leaves the declaring module.
    pub fn external_module(&self) -> Option<&str> {
        match self {
            TypeRef::External { module, .. } => Some(module),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Builtin(b) => f.write_str(b.name()),
            TypeRef::Local(name) => f.write_str(name),
            TypeRef::External { module, name } => write!(f, "{module}.{name}"),
        }
    }
}

/// A field of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
}

/// A type exposed by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub hash: TypeHash,
    pub flags: TypeFlags,
    pub base: Option<TypeRef>,
    pub fields: Vec<FieldDef>,
}

impl TypeDef {
    /// Create an empty, unmodified type owned by `module`.
    pub fn new(module: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::of_type(module, &name),
            name,
            flags: TypeFlags::empty(),
            base: None,
            fields: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeFlags::SEALED)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeFlags::ABSTRACT)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Deepest constant expression accepted anywhere: by the parser, by image
/// decoding and by evaluation, all of which walk expression trees.
pub const MAX_EXPR_DEPTH: usize = 256;

/// An unfolded constant expression, kept in debug images.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstExpr {
    Literal(ConstValue),
    /// A reference to another constant; `module` is `None` for the declaring module.
    Ref {
        module: Option<String>,
        name: String,
    },
    Neg(Box<ConstExpr>),
    Binary {
        op: BinaryOp,
        lhs: Box<ConstExpr>,
        rhs: Box<ConstExpr>,
    },
}

impl fmt::Display for ConstExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstExpr::Literal(v) => write!(f, "{v}"),
            ConstExpr::Ref { module: Some(m), name } => write!(f, "{m}.{name}"),
            ConstExpr::Ref { module: None, name } => f.write_str(name),
            ConstExpr::Neg(inner) => write!(f, "-({inner})"),
            ConstExpr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

/// How a constant's value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstInit {
    /// Folded at compile time.
    Value(ConstValue),
    /// Evaluated on access.
    Expr(ConstExpr),
}

/// A constant exposed by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstDef {
    pub name: String,
    pub kind: ValueKind,
    pub init: ConstInit,
}

impl ConstDef {
    pub fn value(name: impl Into<String>, value: ConstValue) -> Self {
        Self {
            name: name.into(),
            kind: value.kind(),
            init: ConstInit::Value(value),
        }
    }

    /// The folded value, if this constant was stored folded.
    pub fn folded(&self) -> Option<&ConstValue> {
        match &self.init {
            ConstInit::Value(v) => Some(v),
            ConstInit::Expr(_) => None,
        }
    }
}

/// Optimization level a module image was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OptimizationLevel {
    #[default]
    Debug = 0,
    Release = 1,
}

/// Everything a module exposes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleMetadata {
    pub name: String,
    pub optimization: OptimizationLevel,
    /// Names of the modules this module was compiled against and actually uses.
    pub references: Vec<String>,
    pub types: Vec<TypeDef>,
    pub constants: Vec<ConstDef>,
}

impl ModuleMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn find_constant(&self, name: &str) -> Option<&ConstDef> {
        self.constants.iter().find(|c| c.name == name)
    }

    pub fn type_by_hash(&self, hash: TypeHash) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.hash == hash)
    }

    /// Whether the module defines no members at all.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.constants.is_empty()
    }
}

/// Builder for metadata of host-provided modules.
///
/// # Example
///
/// ```
/// use modlink_core::{ConstValue, ModuleBuilder, TypeFlags};
///
/// let core = ModuleBuilder::new("Core")
///     .simple_type("A")
///     .type_with_flags("B", TypeFlags::SEALED)
///     .constant("VERSION", ConstValue::Int(3))
///     .build();
///
/// assert!(core.find_type("A").is_some());
/// assert!(core.find_type("B").unwrap().is_sealed());
/// ```
#[derive(Debug)]
pub struct ModuleBuilder {
    metadata: ModuleMetadata,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: ModuleMetadata {
                optimization: OptimizationLevel::Release,
                ..ModuleMetadata::new(name)
            },
        }
    }

    /// Add a type with no base, flags, or fields.
    pub fn simple_type(self, name: &str) -> Self {
        let def = TypeDef::new(&self.metadata.name, name);
        self.type_def(def)
    }

    pub fn type_with_flags(self, name: &str, flags: TypeFlags) -> Self {
        let def = TypeDef::new(&self.metadata.name, name).with_flags(flags);
        self.type_def(def)
    }

    /// Add a fully described type. Use [`TypeDef::new`] with this module's name.
    pub fn type_def(mut self, def: TypeDef) -> Self {
        self.metadata.types.push(def);
        self
    }

    pub fn constant(mut self, name: &str, value: ConstValue) -> Self {
        self.metadata.constants.push(ConstDef::value(name, value));
        self
    }

    pub fn build(self) -> ModuleMetadata {
        self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_round_trip() {
        for name in ["int", "float", "bool", "string"] {
            assert_eq!(BuiltinType::from_name(name).map(BuiltinType::name), Some(name));
        }
        assert_eq!(BuiltinType::from_name("Int"), None);
    }

    #[test]
    fn type_ref_display() {
        assert_eq!(TypeRef::Builtin(BuiltinType::Float).to_string(), "float");
        assert_eq!(TypeRef::Local("C".into()).to_string(), "C");
        assert_eq!(TypeRef::external("Core", "A").to_string(), "Core.A");
        assert_eq!(TypeRef::external("Core", "A").external_module(), Some("Core"));
    }

    #[test]
    fn builder_assigns_module_scoped_hashes() {
        let meta = ModuleBuilder::new("Core").simple_type("A").build();
        let a = meta.find_type("A").unwrap();
        assert_eq!(a.hash, TypeHash::of_type("Core", "A"));
        assert!(meta.type_by_hash(a.hash).is_some());
        assert_eq!(meta.optimization, OptimizationLevel::Release);
    }

    #[test]
    fn const_expr_display() {
        let expr = ConstExpr::Binary {
            op: BinaryOp::Mul,
            lhs: Box::new(ConstExpr::Ref {
                module: Some("Core".into()),
                name: "MAX".into(),
            }),
            rhs: Box::new(ConstExpr::Literal(ConstValue::Int(2))),
        };
        assert_eq!(expr.to_string(), "(Core.MAX * 2)");
    }

    #[test]
    fn empty_metadata() {
        let meta = ModuleMetadata::new("Empty");
        assert!(meta.is_empty());
        assert_eq!(meta.optimization, OptimizationLevel::Debug);
    }
}
