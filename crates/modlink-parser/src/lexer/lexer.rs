//! Main lexer implementation.
//!
//! The [`Lexer`] converts source text into a stream of [`Token`]s, dispatching
//! on the first character. Lexemes are copied into the arena.

use bumpalo::Bump;

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};
use modlink_core::{LexError, Span};

/// Lexer for module source text.
///
/// The `'src` lifetime is the source string being lexed (temporary).
/// The `'ast` lifetime is the arena where token lexemes are allocated.
pub struct Lexer<'src, 'ast> {
    cursor: Cursor<'src>,
    arena: &'ast Bump,
    /// Accumulated errors.
    errors: Vec<LexError>,
}

impl<'src, 'ast> Lexer<'src, 'ast> {
    pub fn new(source: &'src str, arena: &'ast Bump) -> Self {
        Self {
            cursor: Cursor::new(source),
            arena,
            errors: Vec::new(),
        }
    }

    /// Take accumulated errors, leaving an empty vec.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume and return the next token. Returns `Eof` forever once exhausted.
    pub fn next_token(&mut self) -> Token<'ast> {
        loop {
            self.skip_whitespace();
            if self.cursor.is_eof() {
                return self.make_eof();
            }

            let start_line = self.cursor.line();
            let start_col = self.cursor.column();
            let start_offset = self.cursor.offset();

            let token = match self.cursor.peek() {
                Some('/') if self.cursor.check_str("//") => {
                    self.skip_line_comment();
                    continue;
                }
                Some('/') if self.cursor.check_str("/*") => {
                    match self.skip_block_comment(start_line, start_col, start_offset) {
                        Some(error) => error,
                        None => continue,
                    }
                }
                Some('"') => self.scan_string(start_line, start_col, start_offset),
                Some(c) if c.is_ascii_digit() => self.scan_number(start_line, start_col, start_offset),
                Some(c) if is_ident_start(c) => self.scan_identifier(start_line, start_col, start_offset),
                _ => self.scan_punctuation(start_line, start_col, start_offset),
            };
            return token;
        }
    }

    // =========================================
    // Internal: helpers
    // =========================================

    fn skip_whitespace(&mut self) {
        if self.cursor.check_str("\u{FEFF}") {
            self.cursor.advance();
        }
        self.cursor.eat_while(|c| c.is_whitespace());
    }

    fn make_eof(&self) -> Token<'ast> {
        let span = Span::point(self.cursor.line(), self.cursor.column());
        Token::new(TokenKind::Eof, "", span)
    }

    fn make_token(&self, kind: TokenKind, start_line: u32, start_col: u32, start_offset: u32) -> Token<'ast> {
        let len = self.cursor.offset() - start_offset;
        let lexeme = self.arena.alloc_str(self.cursor.slice_from(start_offset));
        Token::new(kind, lexeme, Span::new(start_line, start_col, len))
    }

    fn make_error(&mut self, error: LexError) -> Token<'ast> {
        let span = error.span();
        self.errors.push(error);
        Token::new(TokenKind::Error, "", span)
    }

    // =========================================
    // Scanning: comments
    // =========================================

    fn skip_line_comment(&mut self) {
        self.cursor.eat_while(|c| c != '\n');
    }

    /// Returns an error token if the comment never closes.
    fn skip_block_comment(&mut self, start_line: u32, start_col: u32, start_offset: u32) -> Option<Token<'ast>> {
        self.cursor.advance();
        self.cursor.advance();
        loop {
            if self.cursor.is_eof() {
                let len = self.cursor.offset() - start_offset;
                let error = LexError::UnterminatedComment {
                    span: Span::new(start_line, start_col, len),
                };
                return Some(self.make_error(error));
            }
            if self.cursor.check_str("*/") {
                self.cursor.advance();
                self.cursor.advance();
                return None;
            }
            self.cursor.advance();
        }
    }

    // =========================================
    // Scanning: literals and words
    // =========================================

    /// Strings are single-line; escapes are validated by the parser.
    fn scan_string(&mut self, start_line: u32, start_col: u32, start_offset: u32) -> Token<'ast> {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None | Some('\n') | Some('\r') => {
                    let len = self.cursor.offset() - start_offset;
                    let error = LexError::UnterminatedString {
                        span: Span::new(start_line, start_col, len),
                    };
                    return self.make_error(error);
                }
                Some('\\') => {
                    self.cursor.advance();
                    if self.cursor.check(|c| c != '\n') {
                        self.cursor.advance();
                    }
                }
                Some('"') => {
                    self.cursor.advance();
                    return self.make_token(TokenKind::StringLiteral, start_line, start_col, start_offset);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    fn scan_number(&mut self, start_line: u32, start_col: u32, start_offset: u32) -> Token<'ast> {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut kind = TokenKind::IntLiteral;

        // `1.5` is a float; `1.x` is an int followed by a dot.
        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            kind = TokenKind::FloatLiteral;
        }

        if self.cursor.check(|c| c == 'e' || c == 'E') {
            let signed = matches!(self.cursor.peek_nth(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.cursor.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.cursor.advance();
                if signed {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
                kind = TokenKind::FloatLiteral;
            }
        }

        if self.cursor.check(is_ident_start) {
            let suffix = self.cursor.eat_while(is_ident_continue);
            let len = self.cursor.offset() - start_offset;
            return self.make_error(LexError::InvalidNumber {
                span: Span::new(start_line, start_col, len),
                detail: format!("unexpected suffix `{suffix}`"),
            });
        }

        let text = self.cursor.slice_from(start_offset);
        if kind == TokenKind::IntLiteral && text.parse::<i64>().is_err() {
            let len = self.cursor.offset() - start_offset;
            return self.make_error(LexError::InvalidNumber {
                span: Span::new(start_line, start_col, len),
                detail: "integer does not fit in 64 bits".to_string(),
            });
        }

        self.make_token(kind, start_line, start_col, start_offset)
    }

    fn scan_identifier(&mut self, start_line: u32, start_col: u32, start_offset: u32) -> Token<'ast> {
        let word = self.cursor.eat_while(is_ident_continue);
        let kind = lookup_keyword(word).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, start_line, start_col, start_offset)
    }

    fn scan_punctuation(&mut self, start_line: u32, start_col: u32, start_offset: u32) -> Token<'ast> {
        let Some(ch) = self.cursor.advance() else {
            return self.make_eof();
        };
        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '=' => TokenKind::Equal,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            other => {
                let span = Span::new(start_line, start_col, other.len_utf8() as u32);
                return self.make_error(LexError::UnexpectedChar { ch: other, span });
            }
        };
        self.make_token(kind, start_line, start_col, start_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let arena = Bump::new();
        let mut lexer = Lexer::new(source, &arena);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn lex_type_declaration() {
        assert_eq!(
            kinds("type C extends Core.A {}"),
            vec![
                TokenKind::Type,
                TokenKind::Identifier,
                TokenKind::Extends,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
            ]
        );
    }

    #[test]
    fn lex_numbers() {
        assert_eq!(
            kinds("42 3.5 1e3 2.5E-2 7.x"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::IntLiteral,
                TokenKind::Dot,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("// line\nconst /* block\n comment */ X"),
            vec![TokenKind::Const, TokenKind::Identifier]
        );
    }

    #[test]
    fn token_positions() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("type\n  Foo", &arena);
        lexer.next_token();
        let foo = lexer.next_token();
        assert_eq!(foo.lexeme, "Foo");
        assert_eq!(foo.span, Span::new(2, 3, 3));
    }

    #[test]
    fn unexpected_character_is_recorded() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("@", &arena);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert!(lexer.has_errors());
        let errors = lexer.take_errors();
        assert!(matches!(errors[0], LexError::UnexpectedChar { ch: '@', .. }));
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn unterminated_string_and_comment() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("\"open\n/* never closed", &arena);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        let errors = lexer.take_errors();
        assert!(matches!(errors[0], LexError::UnterminatedString { .. }));
        assert!(matches!(errors[1], LexError::UnterminatedComment { .. }));
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let arena = Bump::new();
        let mut lexer = Lexer::new("99999999999999999999", &arena);
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert!(matches!(lexer.take_errors()[0], LexError::InvalidNumber { .. }));
    }
}
