//! Error types for the registry layer.
//!
//! All of these are environment-level failures. Problems in user source never
//! reach this crate as errors.

use std::path::PathBuf;

use modlink_core::{ArithmeticError, ImageError};
use thiserror::Error;

/// A reference descriptor could not be built from a module's backing file.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read module image '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed module image '{}'", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
}

/// An emitted buffer could not be materialized as a loaded module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("invalid module image: {0}")]
    Image(#[source] ImageError),

    #[error("invalid debug symbols: {0}")]
    Symbols(#[source] ImageError),

    #[error("debug symbols belong to module '{symbols}', not '{image}'")]
    SymbolMismatch { image: String, symbols: String },
}

/// The registry could not take its initial snapshot.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot reference module '{module}'")]
    Reference {
        module: String,
        #[source]
        source: ReferenceError,
    },

    #[error("backing file of module '{module}' describes module '{found}'")]
    NameMismatch { module: String, found: String },
}

/// Run-time evaluation of a module constant failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("module '{module}' has no constant '{name}'")]
    UnknownConstant { module: String, name: String },

    /// The resolver has no module under this name.
    #[error("module '{0}' could not be resolved")]
    UnresolvedModule(String),

    #[error("constant '{module}.{name}' depends on itself")]
    Cycle { module: String, name: String },

    /// The initializer nests deeper than [`MAX_EXPR_DEPTH`](modlink_core::MAX_EXPR_DEPTH).
    #[error("constant '{module}.{name}' is nested too deeply to evaluate")]
    TooDeep { module: String, name: String },

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_display() {
        let err = LoadError::SymbolMismatch {
            image: "Mod1".into(),
            symbols: "Mod2".into(),
        };
        assert_eq!(err.to_string(), "debug symbols belong to module 'Mod2', not 'Mod1'");
    }

    #[test]
    fn eval_error_from_arithmetic() {
        let err: EvalError = ArithmeticError::DivisionByZero.into();
        assert_eq!(err.to_string(), "division by zero");
    }
}
