//! Core types shared by every modlink crate.
//!
//! - [`Span`] and [`Diagnostic`]: source positions and structured compiler messages
//! - [`ModuleMetadata`]: the members a module exposes to others
//! - [`ConstValue`]: constant values and their arithmetic
//! - [`image`] and [`DebugSymbols`]: the binary formats a compile emits
//! - error types for every layer that can fail

mod codec;
mod diagnostic;
mod error;
pub mod image;
mod metadata;
mod span;
mod symbols;
mod type_hash;
mod value;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, SourceLocation};
pub use error::{ArithmeticError, ImageError, LexError, ParseError, ParseErrorKind};
pub use metadata::{
    BuiltinType, ConstDef, ConstExpr, ConstInit, FieldDef, MAX_EXPR_DEPTH, ModuleBuilder,
    ModuleMetadata, OptimizationLevel, TypeDef, TypeFlags, TypeRef,
};
pub use span::Span;
pub use symbols::{DebugSymbols, SymbolEntry, SymbolKind};
pub use type_hash::{TypeHash, hash_constants};
pub use value::{BinaryOp, ConstValue, ValueKind};
