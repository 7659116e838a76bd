//! Compiler passes.
//!
//! - [`registration`]: Pass 1 - collect declarations across all units
//! - [`types`]: Pass 2 - resolve and check type declarations
//! - [`constants`]: Pass 3 - resolve, order and evaluate constants

pub mod constants;
pub mod registration;
pub mod types;

pub use constants::{ConstantPass, LoweredConst};
pub use registration::{ConstEntry, Declarations, RegistrationPass, TypeEntry};
pub use types::{ResolvedField, ResolvedType, TypePass};

use modlink_parser::Script;

/// A parsed source unit and its index in the caller's submission order.
#[derive(Debug)]
pub struct ParsedUnit<'ast> {
    pub index: usize,
    pub script: Script<'ast>,
}
