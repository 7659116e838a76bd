//! Parser for the modlink declaration language.
//!
//! This crate provides:
//! - Lexical analysis (tokenization)
//! - Abstract Syntax Tree (AST) definitions
//! - A recovering parser that reports every syntax error of a unit
//!
//! # Example
//!
//! ```
//! use modlink_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     abstract type Entity { id: int; }
//!     const MAX_HP = 100 * 2;
//! "#;
//!
//! match Parser::parse(source, &arena) {
//!     Ok(script) => assert_eq!(script.items().len(), 2),
//!     Err(errors) => panic!("parse errors: {errors:?}"),
//! }
//! ```

// Lexer module
pub mod lexer;

// AST module
pub mod ast;

// Re-export commonly used types at crate root
pub use ast::{ConstDecl, Expr, FieldDecl, Ident, Item, Parser, Path, Script, TypeDecl};
pub use lexer::{Lexer, Token, TokenKind};
