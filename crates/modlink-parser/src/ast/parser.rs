//! Recursive-descent parser.
//!
//! Parsing never stops at the first error: a failed item is skipped up to the
//! next item boundary and parsing continues, so one call reports every syntax
//! error of a unit.
//!
//! Expressions nest at most [`MAX_EXPR_DEPTH`] levels, counting both open
//! brackets and the height of the operator tree. Deeper input is an error.

use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;

use super::{ConstDecl, Expr, FieldDecl, Ident, Item, Path, Script, TypeDecl};
use crate::lexer::{Lexer, Token, TokenKind};
use modlink_core::{BinaryOp, MAX_EXPR_DEPTH, ParseError, ParseErrorKind, Span, TypeFlags};

type PResult<T> = Result<T, ParseError>;

pub struct Parser<'src, 'ast> {
    lexer: Lexer<'src, 'ast>,
    arena: &'ast Bump,
    current: Token<'ast>,
    errors: Vec<ParseError>,
    /// Open parentheses and unary minuses on the recursion stack.
    nesting: usize,
}

impl<'src, 'ast> Parser<'src, 'ast> {
    /// Parse a unit, failing if any error was found.
    pub fn parse(source: &'src str, arena: &'ast Bump) -> Result<Script<'ast>, Vec<ParseError>> {
        let (script, errors) = Self::parse_lenient(source, arena);
        if errors.is_empty() {
            Ok(script)
        } else {
            Err(errors)
        }
    }

    /// Parse a unit, returning whatever items parsed cleanly plus all errors in
    /// source order.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn parse_lenient(source: &'src str, arena: &'ast Bump) -> (Script<'ast>, Vec<ParseError>) {
        let mut parser = Parser {
            lexer: Lexer::new(source, arena),
            arena,
            current: Token::new(TokenKind::Eof, "", Span::point(1, 1)),
            errors: Vec::new(),
            nesting: 0,
        };
        parser.bump();
        let script = parser.parse_script();
        (script, parser.errors)
    }

    // =========================================
    // Token plumbing
    // =========================================

    /// Move to the next token, draining lexer errors in place of error tokens.
    fn bump(&mut self) -> Token<'ast> {
        let previous = self.current;
        loop {
            let token = self.lexer.next_token();
            if token.kind == TokenKind::Error {
                self.errors
                    .extend(self.lexer.take_errors().into_iter().map(ParseError::from));
                continue;
            }
            self.current = token;
            return previous;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'ast>> {
        if self.check(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> PResult<Token<'ast>> {
        self.eat(kind).ok_or_else(|| self.unexpected(expected))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.check(TokenKind::Eof) {
            ParseError::new(
                ParseErrorKind::UnexpectedEof,
                self.current.span,
                format!("expected {expected}, found end of file"),
            )
        } else {
            ParseError::expected_token(self.current.span, expected, &self.current.describe())
        }
    }

    fn ident(&mut self) -> PResult<Ident<'ast>> {
        match self.eat(TokenKind::Identifier) {
            Some(token) => Ok(Ident {
                name: token.lexeme,
                span: token.span,
            }),
            None => Err(ParseError::expected_identifier(
                self.current.span,
                &self.current.describe(),
            )),
        }
    }

    // =========================================
    // Items
    // =========================================

    fn parse_script(&mut self) -> Script<'ast> {
        let start = self.current.span;
        let mut items = BumpVec::new_in(self.arena);

        while !self.check(TokenKind::Eof) {
            match self.parse_item() {
                Ok(item) => items.push(item),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }

        Script::new(items.into_bump_slice(), start.merge(self.current.span))
    }

    /// Skip to the next token that can start an item outside any braces.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.current.kind {
                TokenKind::Eof => return,
                kind if kind.starts_item() && depth == 0 => return,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
    }

    fn parse_item(&mut self) -> PResult<Item<'ast>> {
        match self.current.kind {
            TokenKind::Const => self.parse_const().map(Item::Const),
            TokenKind::Type | TokenKind::Sealed | TokenKind::Abstract => {
                self.parse_type().map(Item::Type)
            }
            _ => {
                let error = ParseError::new(
                    ParseErrorKind::ExpectedDeclaration,
                    self.current.span,
                    format!(
                        "expected `type` or `const` declaration, found {}",
                        self.current.describe()
                    ),
                );
                // Always make progress past the offending token.
                self.bump();
                Err(error)
            }
        }
    }

    fn parse_type(&mut self) -> PResult<TypeDecl<'ast>> {
        let start = self.current.span;
        let mut flags = TypeFlags::empty();

        loop {
            let flag = match self.current.kind {
                TokenKind::Sealed => TypeFlags::SEALED,
                TokenKind::Abstract => TypeFlags::ABSTRACT,
                _ => break,
            };
            let token = self.bump();
            if flags.contains(flag) {
                self.errors.push(ParseError::new(
                    ParseErrorKind::ExpectedToken,
                    token.span,
                    format!("duplicate modifier `{}`", token.lexeme),
                ));
            }
            flags |= flag;
        }

        self.expect(TokenKind::Type, "`type`")?;
        let name = self.ident()?;
        let base = if self.eat(TokenKind::Extends).is_some() {
            Some(self.parse_path()?)
        } else {
            None
        };

        self.expect(TokenKind::LeftBrace, "'{'")?;
        let mut fields = BumpVec::new_in(self.arena);
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            match self.parse_field() {
                Ok(field) => fields.push(field),
                Err(error) => {
                    self.errors.push(error);
                    self.recover_in_body();
                }
            }
        }
        let end = self.expect(TokenKind::RightBrace, "'}'")?;

        Ok(TypeDecl {
            flags,
            name,
            base,
            fields: fields.into_bump_slice(),
            span: start.merge(end.span),
        })
    }

    /// Skip past the broken field: through the next `;`, or up to `}`.
    fn recover_in_body(&mut self) {
        loop {
            match self.current.kind {
                TokenKind::Eof | TokenKind::RightBrace => return,
                TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_field(&mut self) -> PResult<FieldDecl<'ast>> {
        let name = self.ident()?;
        self.expect(TokenKind::Colon, "':'")?;
        let ty = self.parse_path()?;
        let end = self.expect(TokenKind::Semicolon, "';'")?;
        Ok(FieldDecl {
            name,
            ty,
            span: name.span.merge(end.span),
        })
    }

    fn parse_const(&mut self) -> PResult<ConstDecl<'ast>> {
        let start = self.bump().span;
        let name = self.ident()?;
        self.expect(TokenKind::Equal, "'='")?;
        let (value, _) = self.parse_expr()?;
        let end = self.expect(TokenKind::Semicolon, "';'")?;
        Ok(ConstDecl {
            name,
            value: self.arena.alloc(value),
            span: start.merge(end.span),
        })
    }

    fn parse_path(&mut self) -> PResult<Path<'ast>> {
        let first = self.ident()?;
        if self.eat(TokenKind::Dot).is_some() {
            let name = self.ident()?;
            Ok(Path {
                qualifier: Some(first),
                name,
            })
        } else {
            Ok(Path {
                qualifier: None,
                name: first,
            })
        }
    }

    // =========================================
    // Expressions
    // =========================================

    /// Parse an expression together with the height of its tree.
    fn parse_expr(&mut self) -> PResult<(Expr<'ast>, usize)> {
        let (mut lhs, mut height) = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok((lhs, height)),
            };
            self.bump();
            let (rhs, rhs_height) = self.parse_term()?;
            (lhs, height) = self.binary(op, (lhs, height), (rhs, rhs_height))?;
        }
    }

    fn parse_term(&mut self) -> PResult<(Expr<'ast>, usize)> {
        let (mut lhs, mut height) = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok((lhs, height)),
            };
            self.bump();
            let (rhs, rhs_height) = self.parse_unary()?;
            (lhs, height) = self.binary(op, (lhs, height), (rhs, rhs_height))?;
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        (lhs, lhs_height): (Expr<'ast>, usize),
        (rhs, rhs_height): (Expr<'ast>, usize),
    ) -> PResult<(Expr<'ast>, usize)> {
        let span = lhs.span().merge(rhs.span());
        let height = grow(lhs_height.max(rhs_height), span)?;
        let expr = Expr::Binary {
            op,
            lhs: self.arena.alloc(lhs),
            rhs: self.arena.alloc(rhs),
            span,
        };
        Ok((expr, height))
    }

    fn parse_unary(&mut self) -> PResult<(Expr<'ast>, usize)> {
        let Some(minus) = self.eat(TokenKind::Minus) else {
            return self.parse_primary();
        };
        self.enter(minus.span)?;
        let operand = self.parse_unary();
        self.nesting -= 1;

        let (operand, height) = operand?;
        let span = minus.span.merge(operand.span());
        let height = grow(height, span)?;
        Ok((Expr::Neg(self.arena.alloc(operand), span), height))
    }

    /// Count one level of parser recursion, failing past [`MAX_EXPR_DEPTH`].
    /// Every successful call is paired with a decrement once the nested
    /// parse returns.
    fn enter(&mut self, at: Span) -> PResult<()> {
        if self.nesting >= MAX_EXPR_DEPTH {
            return Err(too_deep(at));
        }
        self.nesting += 1;
        Ok(())
    }

    fn parse_primary(&mut self) -> PResult<(Expr<'ast>, usize)> {
        let token = self.current;
        let leaf = match token.kind {
            TokenKind::IntLiteral => {
                self.bump();
                token
                    .lexeme
                    .parse()
                    .map(|v| Expr::Int(v, token.span))
                    .map_err(|_| invalid_literal(token))
            }
            TokenKind::FloatLiteral => {
                self.bump();
                token
                    .lexeme
                    .parse()
                    .map(|v| Expr::Float(v, token.span))
                    .map_err(|_| invalid_literal(token))
            }
            TokenKind::StringLiteral => {
                self.bump();
                let text = unescape(token)?;
                Ok(Expr::Str(self.arena.alloc_str(&text), token.span))
            }
            TokenKind::True | TokenKind::False => {
                self.bump();
                Ok(Expr::Bool(token.kind == TokenKind::True, token.span))
            }
            TokenKind::Identifier => self.parse_path().map(Expr::Path),
            TokenKind::LeftParen => {
                self.bump();
                self.enter(token.span)?;
                let inner = self.parse_expr();
                self.nesting -= 1;

                let inner = inner?;
                self.expect(TokenKind::RightParen, "')'")?;
                return Ok(inner);
            }
            _ => Err(ParseError::expected_expression(token.span, &token.describe())),
        };
        leaf.map(|expr| (expr, 1))
    }
}

/// Height of a node whose tallest child is `child` levels high.
fn grow(child: usize, span: Span) -> PResult<usize> {
    if child >= MAX_EXPR_DEPTH {
        return Err(too_deep(span));
    }
    Ok(child + 1)
}

fn too_deep(span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::NestingTooDeep,
        span,
        format!("expression nests deeper than {MAX_EXPR_DEPTH} levels"),
    )
}

fn invalid_literal(token: Token<'_>) -> ParseError {
    ParseError::new(
        ParseErrorKind::InvalidLiteral,
        token.span,
        format!("invalid literal `{}`", token.lexeme),
    )
}

/// Strip the quotes of a string literal and resolve its escapes.
fn unescape(token: Token<'_>) -> PResult<String> {
    let body = &token.lexeme[1..token.lexeme.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            other => {
                let shown = other.map(String::from).unwrap_or_default();
                return Err(ParseError::new(
                    ParseErrorKind::InvalidLiteral,
                    token.span,
                    format!("invalid escape sequence `\\{shown}`"),
                ));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(source: &str) -> Vec<ParseError> {
        let arena = Bump::new();
        Parser::parse_lenient(source, &arena).1
    }

    #[test]
    fn empty_source_parses_to_no_items() {
        let arena = Bump::new();
        let script = Parser::parse("  // nothing here\n", &arena).unwrap();
        assert!(script.is_empty());
    }

    #[test]
    fn precedence_and_parentheses() {
        let arena = Bump::new();
        let script = Parser::parse("const X = 1 + 2 * (3 - -4);", &arena).unwrap();
        let Item::Const(decl) = &script.items()[0] else {
            panic!("expected const");
        };
        let Expr::Binary { op, rhs, .. } = decl.value else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn string_escapes() {
        let arena = Bump::new();
        let script = Parser::parse(r#"const S = "a\"b\n";"#, &arena).unwrap();
        let Item::Const(decl) = &script.items()[0] else {
            panic!("expected const");
        };
        assert!(matches!(decl.value, Expr::Str("a\"b\n", _)));
    }

    #[test]
    fn invalid_escape_is_reported() {
        let errs = errors(r#"const S = "\q";"#);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ParseErrorKind::InvalidLiteral);
    }

    #[test]
    fn missing_semicolon() {
        let errs = errors("const A = 1");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn recovers_and_reports_every_item() {
        let arena = Bump::new();
        let (script, errs) = Parser::parse_lenient(
            "type A extends {}\nconst B = ;\ntype C {}",
            &arena,
        );
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].span.line, 1);
        assert_eq!(errs[1].span.line, 2);
        assert_eq!(script.items().len(), 1);
        assert_eq!(script.items()[0].name().name, "C");
    }

    #[test]
    fn recovers_inside_type_body() {
        let arena = Bump::new();
        let (script, errs) = Parser::parse_lenient("type A { hp int; mp: int; }", &arena);
        assert_eq!(errs.len(), 1);
        let Item::Type(decl) = &script.items()[0] else {
            panic!("expected type");
        };
        assert_eq!(decl.fields.len(), 1);
        assert_eq!(decl.fields[0].name.name, "mp");
    }

    #[test]
    fn lexer_errors_are_interleaved() {
        let arena = Bump::new();
        let (script, errs) = Parser::parse_lenient("type A { @ }\nconst B = 1 # ;", &arena);
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].kind, ParseErrorKind::InvalidToken);
        assert_eq!(errs[0].span.line, 1);
        assert_eq!(errs[1].span.line, 2);
        assert_eq!(script.items().len(), 2);
    }

    #[test]
    fn stray_tokens_at_top_level() {
        let errs = errors("} type A {}");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ParseErrorKind::ExpectedDeclaration);
    }

    #[test]
    fn duplicate_modifier() {
        let arena = Bump::new();
        let (script, errs) = Parser::parse_lenient("sealed sealed type A {}", &arena);
        assert_eq!(errs.len(), 1);
        assert_eq!(script.items().len(), 1);
    }

    #[test]
    fn deep_parentheses_are_an_error() {
        let source = format!("const X = {}1{};\ntype After {{}}", "(".repeat(5000), ")".repeat(5000));
        let arena = Bump::new();
        let (script, errs) = Parser::parse_lenient(&source, &arena);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ParseErrorKind::NestingTooDeep);
        assert_eq!(script.items().len(), 1);
        assert_eq!(script.items()[0].name().name, "After");
    }

    #[test]
    fn deep_negation_is_an_error() {
        let source = format!("const X = {}1;", "-".repeat(5000));
        let errs = errors(&source);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn long_operator_chains_are_bounded() {
        let chain = |terms: usize| format!("const X = 1{};", " + 1".repeat(terms - 1));

        // `n` terms form a left-deep tree `n` levels high.
        assert!(errors(&chain(MAX_EXPR_DEPTH)).is_empty());
        let errs = errors(&chain(20_000));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn nesting_within_the_limit_parses() {
        let depth = MAX_EXPR_DEPTH - 1;
        let source = format!("const X = {}1{};", "(".repeat(depth), ")".repeat(depth));
        assert!(errors(&source).is_empty());
    }
}
