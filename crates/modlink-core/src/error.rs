//! Error types shared across the modlink crates.
//!
//! ## Error Hierarchy
//!
//! ```text
//! LexError         - tokenization failures (reported as diagnostics)
//! ParseError       - syntax failures (reported as diagnostics)
//! ArithmeticError  - constant evaluation failures
//! ImageError       - malformed module image or debug-symbol buffers
//! ```
//!
//! Lex and parse errors never escape a compile as `Err`; the compiler turns
//! them into [`Diagnostic`](crate::Diagnostic)s. Image errors are
//! environment-level and propagate to the host.

use thiserror::Error;

use crate::{Span, ValueKind};

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during lexical analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    /// An unexpected character was encountered.
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    /// A string literal was not terminated before the end of the line.
    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    /// A block comment was not terminated.
    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    /// A numeric literal could not be parsed.
    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },
}

impl LexError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. } => *span,
            LexError::UnterminatedString { span } => *span,
            LexError::UnterminatedComment { span } => *span,
            LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A token could not be lexed.
    InvalidToken,
    /// A specific token was expected but not found.
    ExpectedToken,
    /// A top-level declaration was expected.
    ExpectedDeclaration,
    /// An identifier was expected.
    ExpectedIdentifier,
    /// An expression was expected.
    ExpectedExpression,
    /// Unexpected end of file.
    UnexpectedEof,
    /// A literal value could not be parsed.
    InvalidLiteral,
    /// An expression nests deeper than the parser accepts.
    NestingTooDeep,
}

impl ParseErrorKind {
    /// Returns a human-readable name for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::InvalidToken => "invalid token",
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::ExpectedDeclaration => "expected declaration",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::InvalidLiteral => "invalid literal",
            ParseErrorKind::NestingTooDeep => "expression nested too deeply",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parse error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    /// The category of this error.
    pub kind: ParseErrorKind,
    /// The source location where the error occurred.
    pub span: Span,
    /// A detailed error message.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an "expected token" error.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    /// Create an "expected identifier" error.
    pub fn expected_identifier(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedIdentifier,
            span,
            format!("expected identifier, found {found}"),
        )
    }

    /// Create an "expected expression" error.
    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("expected expression, found {found}"),
        )
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        let kind = match error {
            LexError::InvalidNumber { .. } => ParseErrorKind::InvalidLiteral,
            _ => ParseErrorKind::InvalidToken,
        };
        ParseError::new(kind, error.span(), error.to_string())
    }
}

// ============================================================================
// Constant Evaluation Errors
// ============================================================================

/// Errors produced while folding or evaluating constant expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// Division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed.
    #[error("integer overflow in '{op}'")]
    Overflow { op: &'static str },

    /// Operand kinds do not support the operator.
    #[error("operator '{op}' cannot be applied to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: ValueKind,
        rhs: ValueKind,
    },

    /// Unary negation of a non-numeric value.
    #[error("cannot negate a value of type {0}")]
    InvalidNegation(ValueKind),
}

// ============================================================================
// Image Errors
// ============================================================================

/// Errors raised while decoding a module image or a debug-symbol buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// The buffer does not start with the expected magic bytes.
    #[error("bad magic: expected {expected:?}")]
    BadMagic { expected: [u8; 4] },

    /// The buffer was written by an unknown format version.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    /// The buffer ended in the middle of a record.
    #[error("truncated image at byte {offset}")]
    Truncated { offset: usize },

    /// A string record was not valid UTF-8.
    #[error("invalid utf-8 string at byte {offset}")]
    InvalidUtf8 { offset: usize },

    /// A tag byte did not name a known record kind.
    #[error("invalid {what} tag {tag} at byte {offset}")]
    InvalidTag {
        what: &'static str,
        tag: u8,
        offset: usize,
    },

    /// The trailing checksum does not match the content.
    #[error("checksum mismatch (stored {stored:#018x}, computed {computed:#018x})")]
    ChecksumMismatch { stored: u64, computed: u64 },

    /// A constant expression nests deeper than decoding allows.
    #[error("constant expression deeper than {limit} levels at byte {offset}")]
    ExpressionTooDeep { limit: usize, offset: usize },

    /// Bytes remained after the last record.
    #[error("{0} trailing bytes after image")]
    TrailingBytes(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let err = LexError::UnexpectedChar {
            ch: '@',
            span: Span::new(1, 5, 1),
        };
        assert_eq!(format!("{err}"), "unexpected character '@' at 1:5");
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::expected_token(Span::new(1, 10, 1), "';'", "'}'");
        assert_eq!(format!("{err}"), "expected token at 1:10: expected ';', found '}'");
    }

    #[test]
    fn lex_error_converts_to_parse_error() {
        let err: ParseError = LexError::InvalidNumber {
            span: Span::new(2, 3, 4),
            detail: "out of range".into(),
        }
        .into();
        assert_eq!(err.kind, ParseErrorKind::InvalidLiteral);
        assert_eq!(err.span, Span::new(2, 3, 4));
    }

    #[test]
    fn arithmetic_error_display() {
        let err = ArithmeticError::TypeMismatch {
            op: "*",
            lhs: ValueKind::Str,
            rhs: ValueKind::Int,
        };
        assert_eq!(err.to_string(), "operator '*' cannot be applied to string and int");
    }
}
