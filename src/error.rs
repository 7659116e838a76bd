//! Errors raised by the orchestration layer.
//!
//! Problems in the submitted sources are never errors here: they travel as
//! [`Diagnostic`](modlink_core::Diagnostic)s inside a
//! [`CompilationResult`](crate::CompilationResult). These types cover caller
//! mistakes and host/environment defects only.

use modlink_core::ImageError;
use modlink_registry::{LoadError, RegistryError};
use thiserror::Error;

/// Errors from [`SourceCompiler::compile`](crate::SourceCompiler::compile) and
/// [`Orchestrator::compile`](crate::Orchestrator::compile).
#[derive(Debug, Error)]
pub enum CompileError {
    /// The module name does not match `[A-Za-z_][A-Za-z0-9_]*`.
    #[error("invalid module name `{0}`")]
    InvalidModuleName(String),

    /// An emitted image could not be materialized as a module.
    #[error("failed to load compiled module '{module}'")]
    Load {
        module: String,
        #[source]
        source: LoadError,
    },

    /// A loaded image could not be turned into a reference descriptor.
    #[error("failed to describe compiled module '{module}'")]
    Descriptor {
        module: String,
        #[source]
        source: ImageError,
    },

    /// Registry initialization failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CompileError {
    /// Whether the error points at the host environment rather than the caller.
    pub fn is_environment_failure(&self) -> bool {
        !matches!(self, CompileError::InvalidModuleName(_))
    }
}

/// Errors reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {var}, expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn load_failure_keeps_its_source() {
        let err = CompileError::Load {
            module: "Mod".into(),
            source: LoadError::Image(ImageError::BadMagic { expected: *b"MLNK" }),
        };
        assert_eq!(err.to_string(), "failed to load compiled module 'Mod'");
        assert!(err.source().is_some());
        assert!(err.is_environment_failure());
    }

    #[test]
    fn invalid_name_is_a_caller_error() {
        let err = CompileError::InvalidModuleName("1st".into());
        assert_eq!(err.to_string(), "invalid module name `1st`");
        assert!(!err.is_environment_failure());
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            var: "MODLINK_OBSERVE",
            value: "sometimes".into(),
            expected: "`snapshot` or `continuous`",
        };
        assert_eq!(
            err.to_string(),
            "invalid value `sometimes` for MODLINK_OBSERVE, expected `snapshot` or `continuous`"
        );
    }
}
