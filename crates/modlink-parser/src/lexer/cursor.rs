/// A cursor over source text that tracks position.
///
/// Provides low-level character access with peek/advance semantics.
/// Tracks byte offset, line number, and column number as it advances.
pub struct Cursor<'src> {
    source: &'src str,
    /// Remaining source text (slice starting at current position).
    rest: &'src str,
    offset: u32,
    /// 1-indexed.
    line: u32,
    /// 1-indexed, byte-based.
    column: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.rest.is_empty()
    }

    /// Peek at the current character without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Peek at the nth character ahead (0 = current).
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    #[inline]
    pub fn check(&self, f: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(f)
    }

    #[inline]
    pub fn check_str(&self, s: &str) -> bool {
        self.rest.starts_with(s)
    }

    /// Consume the current character and advance, updating line/column.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        let len = ch.len_utf8();
        self.rest = &self.rest[len..];
        self.offset += len as u32;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += len as u32;
        }
        Some(ch)
    }

    /// Consume characters while the predicate holds.
    pub fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'src str {
        let start = self.offset;
        while self.check(&f) {
            self.advance();
        }
        self.slice_from(start)
    }

    /// Source text from `start` to the current offset.
    #[inline]
    pub fn slice_from(&self, start: u32) -> &'src str {
        &self.source[start as usize..self.offset as usize]
    }
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_basics() {
        let mut cursor = Cursor::new("ab");
        assert_eq!(cursor.peek(), Some('a'));
        assert_eq!(cursor.advance(), Some('a'));
        assert_eq!(cursor.advance(), Some('b'));
        assert!(cursor.is_eof());
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn cursor_tracks_lines() {
        let mut cursor = Cursor::new("a\nbc");
        cursor.advance();
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (2, 1));
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (2, 2));
    }

    #[test]
    fn cursor_eat_while() {
        let mut cursor = Cursor::new("abc123 rest");
        assert_eq!(cursor.eat_while(is_ident_continue), "abc123");
        assert_eq!(cursor.advance(), Some(' '));
        assert!(cursor.check_str("rest"));
    }

    #[test]
    fn cursor_utf8_columns_are_bytes() {
        let mut cursor = Cursor::new("éx");
        cursor.advance();
        assert_eq!(cursor.column(), 3);
        assert_eq!(cursor.offset(), 2);
        assert_eq!(cursor.peek_nth(0), Some('x'));
    }

    #[test]
    fn ident_classes() {
        assert!(is_ident_start('_'));
        assert!(!is_ident_start('1'));
        assert!(is_ident_continue('1'));
    }
}
