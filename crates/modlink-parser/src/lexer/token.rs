//! Token types for the module declaration language.

use modlink_core::Span;
use std::fmt;

/// A token from the source code.
///
/// The lexeme is copied into the parse arena, so the source string can be
/// dropped once parsing is done.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'ast> {
    pub kind: TokenKind,
    pub lexeme: &'ast str,
    pub span: Span,
}

impl<'ast> Token<'ast> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'ast str, span: Span) -> Self {
        Self { kind, lexeme, span }
    }

    /// How the token reads in an error message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Identifier => format!("identifier `{}`", self.lexeme),
            _ => format!("'{}'", self.lexeme),
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// `42`
    IntLiteral,
    /// `3.14`, `1e3`
    FloatLiteral,
    /// `"hello"`
    StringLiteral,

    Identifier,

    // =========================================
    // Keywords
    // =========================================
    Type,
    Extends,
    Const,
    Sealed,
    Abstract,
    True,
    False,

    // =========================================
    // Punctuation and operators
    // =========================================
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    Colon,
    Semicolon,
    Dot,
    Equal,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // =========================================
    // Special
    // =========================================
    Eof,
    /// A lexing error; the error itself is held by the lexer.
    Error,
}

impl TokenKind {
    /// Whether this token can begin a top-level item.
    pub fn starts_item(self) -> bool {
        matches!(
            self,
            TokenKind::Type | TokenKind::Const | TokenKind::Sealed | TokenKind::Abstract
        )
    }
}

/// Map a word to its keyword token kind.
pub fn lookup_keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "type" => TokenKind::Type,
        "extends" => TokenKind::Extends,
        "const" => TokenKind::Const,
        "sealed" => TokenKind::Sealed,
        "abstract" => TokenKind::Abstract,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(lookup_keyword("type"), Some(TokenKind::Type));
        assert_eq!(lookup_keyword("extends"), Some(TokenKind::Extends));
        assert_eq!(lookup_keyword("Type"), None);
        assert_eq!(lookup_keyword("int"), None);
    }

    #[test]
    fn item_starters() {
        assert!(TokenKind::Sealed.starts_item());
        assert!(!TokenKind::Identifier.starts_item());
    }

    #[test]
    fn describe_tokens() {
        let eof = Token::new(TokenKind::Eof, "", Span::point(1, 1));
        assert_eq!(eof.describe(), "end of file");
        let ident = Token::new(TokenKind::Identifier, "Core", Span::new(1, 1, 4));
        assert_eq!(ident.describe(), "identifier `Core`");
    }
}
