//! Structured compiler messages.
//!
//! Diagnostics are the only channel for source-content problems: syntax
//! errors, unresolved references and semantic errors are all returned as data.
//! Callers decide which severities block their workflow.

use std::fmt;

use crate::{ParseError, Span};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// Malformed source.
    Syntax,
    /// A qualified name points into a module absent from the reference set.
    UnresolvedModule,
    UnknownType,
    UnknownConstant,
    DuplicateDefinition,
    DuplicateField,
    ShadowedField,
    InvalidBase,
    SealedBase,
    InheritanceCycle,
    ConflictingModifiers,
    TypeMismatch,
    DivisionByZero,
    ConstantCycle,
    /// Integer arithmetic in a constant overflowed 64 bits.
    ArithmeticOverflow,
    BlankSourceSkipped,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::Syntax => "MLK0001",
            DiagnosticCode::UnresolvedModule => "MLK0100",
            DiagnosticCode::UnknownType => "MLK0101",
            DiagnosticCode::UnknownConstant => "MLK0102",
            DiagnosticCode::DuplicateDefinition => "MLK0200",
            DiagnosticCode::DuplicateField => "MLK0201",
            DiagnosticCode::ShadowedField => "MLK0202",
            DiagnosticCode::InvalidBase => "MLK0203",
            DiagnosticCode::SealedBase => "MLK0204",
            DiagnosticCode::InheritanceCycle => "MLK0205",
            DiagnosticCode::ConflictingModifiers => "MLK0206",
            DiagnosticCode::TypeMismatch => "MLK0300",
            DiagnosticCode::DivisionByZero => "MLK0301",
            DiagnosticCode::ConstantCycle => "MLK0302",
            DiagnosticCode::ArithmeticOverflow => "MLK0303",
            DiagnosticCode::BlankSourceSkipped => "MLK0900",
        }
    }

    /// The severity a diagnostic with this code is reported at.
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::ShadowedField => Severity::Warning,
            DiagnosticCode::BlankSourceSkipped => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the submitted sources a diagnostic points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Index of the source unit in the caller's submission order.
    pub unit: usize,
    pub span: Span,
}

/// A structured compiler message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Create a diagnostic at the code's default severity, without a location.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity: code.severity(),
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Attach a source location.
    pub fn at(mut self, unit: usize, span: Span) -> Self {
        self.location = Some(SourceLocation { unit, span });
        self
    }

    /// Convert a parse error from source unit `unit`.
    pub fn from_parse_error(unit: usize, error: &ParseError) -> Self {
        Self::new(DiagnosticCode::Syntax, error.message.clone()).at(unit, error.span)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "unit {} {}: ", loc.unit, loc.span)?;
        }
        write!(f, "{} {}: {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseErrorKind;

    #[test]
    fn default_severities() {
        assert_eq!(DiagnosticCode::UnresolvedModule.severity(), Severity::Error);
        assert_eq!(DiagnosticCode::ShadowedField.severity(), Severity::Warning);
        assert_eq!(DiagnosticCode::BlankSourceSkipped.severity(), Severity::Info);
    }

    #[test]
    fn display_with_location() {
        let diag = Diagnostic::new(DiagnosticCode::UnresolvedModule, "module `Unknown` is not referenced")
            .at(0, Span::new(1, 16, 7));
        assert_eq!(
            diag.to_string(),
            "unit 0 1:16: error MLK0100: module `Unknown` is not referenced"
        );
    }

    #[test]
    fn display_without_location() {
        let diag = Diagnostic::new(DiagnosticCode::BlankSourceSkipped, "source unit 2 is blank");
        assert_eq!(diag.to_string(), "info MLK0900: source unit 2 is blank");
        assert!(!diag.is_error());
    }

    #[test]
    fn parse_errors_become_syntax_diagnostics() {
        let err = ParseError::new(ParseErrorKind::ExpectedToken, Span::new(3, 1, 1), "expected ';'");
        let diag = Diagnostic::from_parse_error(4, &err);
        assert_eq!(diag.code, DiagnosticCode::Syntax);
        assert_eq!(diag.location, Some(SourceLocation { unit: 4, span: Span::new(3, 1, 1) }));
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
