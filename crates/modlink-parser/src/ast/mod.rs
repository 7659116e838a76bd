//! Abstract syntax tree for the module declaration language.
//!
//! All nodes live in a `bumpalo` arena and borrow from it for `'ast`.
//!
//! # Example
//!
//! ```
//! use modlink_parser::{Item, Parser};
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let script = Parser::parse("type C extends Core.A { hp: int; }", &arena).unwrap();
//!
//! let Item::Type(decl) = &script.items()[0] else { panic!() };
//! assert_eq!(decl.name.name, "C");
//! assert_eq!(decl.base.unwrap().to_string(), "Core.A");
//! ```

mod parser;

pub use parser::Parser;

use std::fmt;

use modlink_core::{BinaryOp, Span, TypeFlags};

/// A parsed source unit.
#[derive(Debug)]
pub struct Script<'ast> {
    items: &'ast [Item<'ast>],
    span: Span,
}

impl<'ast> Script<'ast> {
    pub(crate) fn new(items: &'ast [Item<'ast>], span: Span) -> Self {
        Self { items, span }
    }

    /// Top-level items in declaration order.
    pub fn items(&self) -> &'ast [Item<'ast>] {
        self.items
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, Copy)]
pub enum Item<'ast> {
    Type(TypeDecl<'ast>),
    Const(ConstDecl<'ast>),
}

impl<'ast> Item<'ast> {
    pub fn name(&self) -> Ident<'ast> {
        match self {
            Item::Type(t) => t.name,
            Item::Const(c) => c.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Item::Type(t) => t.span,
            Item::Const(c) => c.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

/// `Name` or `Module.Name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Path<'ast> {
    pub qualifier: Option<Ident<'ast>>,
    pub name: Ident<'ast>,
}

impl Path<'_> {
    pub fn span(&self) -> Span {
        match self.qualifier {
            Some(q) => q.span.merge(self.name.span),
            None => self.name.span,
        }
    }
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(q) = self.qualifier {
            write!(f, "{}.", q.name)?;
        }
        f.write_str(self.name.name)
    }
}

/// `sealed abstract type Name extends Base { fields }`
#[derive(Debug, Clone, Copy)]
pub struct TypeDecl<'ast> {
    pub flags: TypeFlags,
    pub name: Ident<'ast>,
    pub base: Option<Path<'ast>>,
    pub fields: &'ast [FieldDecl<'ast>],
    pub span: Span,
}

/// `name: Type;`
#[derive(Debug, Clone, Copy)]
pub struct FieldDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: Path<'ast>,
    pub span: Span,
}

/// `const NAME = expr;`
#[derive(Debug, Clone, Copy)]
pub struct ConstDecl<'ast> {
    pub name: Ident<'ast>,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Expr<'ast> {
    Int(i64, Span),
    Float(f64, Span),
    Str(&'ast str, Span),
    Bool(bool, Span),
    Path(Path<'ast>),
    Neg(&'ast Expr<'ast>, Span),
    Binary {
        op: BinaryOp,
        lhs: &'ast Expr<'ast>,
        rhs: &'ast Expr<'ast>,
        span: Span,
    },
}

impl Expr<'_> {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, span)
            | Expr::Float(_, span)
            | Expr::Str(_, span)
            | Expr::Bool(_, span)
            | Expr::Neg(_, span)
            | Expr::Binary { span, .. } => *span,
            Expr::Path(path) => path.span(),
        }
    }
}
