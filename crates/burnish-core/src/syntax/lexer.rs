//! Lexer for the dialect.
//!
//! Produces the token stream the parser consumes. Follows the host
//! language's automatic semicolon insertion rule: a newline terminates the
//! statement when the last token on the line is an identifier, a literal,
//! one of `break continue fallthrough return ++ --`, or a closing
//! delimiter. Comments never become tokens; they survive rewriting because
//! all edits are byte-range operations on the original text.

use super::token::{keyword_kind, Pos, TokKind, Token};

pub struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    base: u32,
    off: usize,
    /// Kind of the last emitted non-comment token, for semicolon insertion.
    last: Option<TokKind>,
    pending_err: Option<(Pos, String)>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, base: u32) -> Lexer<'a> {
        Lexer {
            text,
            bytes: text.as_bytes(),
            base,
            off: 0,
            last: None,
            pending_err: None,
        }
    }

    pub fn take_error(&mut self) -> Option<(Pos, String)> {
        self.pending_err.take()
    }

    fn pos(&self, off: usize) -> Pos {
        Pos(self.base + off as u32)
    }

    fn error(&mut self, off: usize, msg: impl Into<String>) {
        if self.pending_err.is_none() {
            self.pending_err = Some((self.pos(off), msg.into()));
        }
    }

    fn peek(&self) -> u8 {
        *self.bytes.get(self.off).unwrap_or(&0)
    }

    fn peek_at(&self, n: usize) -> u8 {
        *self.bytes.get(self.off + n).unwrap_or(&0)
    }

    /// Returns true when the semicolon rule applies to the last token.
    fn wants_semi(&self) -> bool {
        matches!(
            self.last,
            Some(
                TokKind::Ident
                    | TokKind::Int
                    | TokKind::Float
                    | TokKind::Rune
                    | TokKind::Str
                    | TokKind::Break
                    | TokKind::Continue
                    | TokKind::Fallthrough
                    | TokKind::Return
                    | TokKind::Inc
                    | TokKind::Dec
                    | TokKind::RParen
                    | TokKind::RBrack
                    | TokKind::RBrace
            )
        )
    }

    /// Skip whitespace and comments. Returns an implicit-semicolon token if
    /// a newline triggered insertion.
    fn skip_space(&mut self) -> Option<Token> {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' => self.off += 1,
                b'\n' => {
                    if self.wants_semi() {
                        let pos = self.pos(self.off);
                        self.off += 1;
                        self.last = Some(TokKind::Semi);
                        return Some(Token {
                            kind: TokKind::Semi,
                            pos,
                            end: pos,
                            text: String::new(),
                            implicit: true,
                        });
                    }
                    self.off += 1;
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while self.off < self.bytes.len() && self.bytes[self.off] != b'\n' {
                        self.off += 1;
                    }
                }
                b'/' if self.peek_at(1) == b'*' => {
                    let start = self.off;
                    self.off += 2;
                    let mut closed = false;
                    let mut saw_newline = false;
                    while self.off < self.bytes.len() {
                        if self.bytes[self.off] == b'\n' {
                            saw_newline = true;
                        }
                        if self.bytes[self.off] == b'*' && self.peek_at(1) == b'/' {
                            self.off += 2;
                            closed = true;
                            break;
                        }
                        self.off += 1;
                    }
                    if !closed {
                        self.error(start, "unterminated block comment");
                    }
                    // A comment spanning lines acts like a newline.
                    if saw_newline && self.wants_semi() {
                        let pos = self.pos(self.off);
                        self.last = Some(TokKind::Semi);
                        return Some(Token {
                            kind: TokKind::Semi,
                            pos,
                            end: pos,
                            text: String::new(),
                            implicit: true,
                        });
                    }
                }
                _ => return None,
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(semi) = self.skip_space() {
            return semi;
        }

        let start = self.off;
        if self.off >= self.bytes.len() {
            // End of file also triggers the semicolon rule.
            if self.wants_semi() {
                self.last = Some(TokKind::Semi);
                return self.fixed(start, start, TokKind::Semi);
            }
            return self.fixed(start, start, TokKind::Eof);
        }

        let c = self.bytes[self.off];
        match c {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_ident(),
            b'0'..=b'9' => self.scan_number(),
            b'.' if self.peek_at(1).is_ascii_digit() => self.scan_number(),
            b'"' => self.scan_string(),
            b'`' => self.scan_raw_string(),
            b'\'' => self.scan_rune(),
            _ => self.scan_operator(),
        }
    }

    fn fixed(&mut self, start: usize, end: usize, kind: TokKind) -> Token {
        self.last = Some(kind);
        Token {
            kind,
            pos: self.pos(start),
            end: self.pos(end),
            text: String::new(),
            implicit: false,
        }
    }

    fn lit(&mut self, start: usize, kind: TokKind) -> Token {
        self.last = Some(kind);
        Token {
            kind,
            pos: self.pos(start),
            end: self.pos(self.off),
            text: self.text[start..self.off].to_string(),
            implicit: false,
        }
    }

    fn scan_ident(&mut self) -> Token {
        let start = self.off;
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.off += 1;
        }
        let word = &self.text[start..self.off];
        match keyword_kind(word) {
            Some(kind) => {
                self.last = Some(kind);
                Token {
                    kind,
                    pos: self.pos(start),
                    end: self.pos(self.off),
                    text: word.to_string(),
                    implicit: false,
                }
            }
            None => self.lit(start, TokKind::Ident),
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.off;
        let mut is_float = false;
        if self.peek() == b'0' && matches!(self.peek_at(1), b'x' | b'X') {
            self.off += 2;
            while self.peek().is_ascii_hexdigit() || self.peek() == b'_' {
                self.off += 1;
            }
            return self.lit(start, TokKind::Int);
        }
        while self.peek().is_ascii_digit() || self.peek() == b'_' {
            self.off += 1;
        }
        if self.peek() == b'.' && self.peek_at(1) != b'.' {
            is_float = true;
            self.off += 1;
            while self.peek().is_ascii_digit() || self.peek() == b'_' {
                self.off += 1;
            }
        }
        if matches!(self.peek(), b'e' | b'E') {
            is_float = true;
            self.off += 1;
            if matches!(self.peek(), b'+' | b'-') {
                self.off += 1;
            }
            while self.peek().is_ascii_digit() {
                self.off += 1;
            }
        }
        self.lit(start, if is_float { TokKind::Float } else { TokKind::Int })
    }

    fn scan_string(&mut self) -> Token {
        let start = self.off;
        self.off += 1;
        loop {
            match self.peek() {
                0 | b'\n' => {
                    self.error(start, "unterminated string literal");
                    break;
                }
                b'\\' => self.off += 2,
                b'"' => {
                    self.off += 1;
                    break;
                }
                _ => self.off += 1,
            }
        }
        self.lit(start, TokKind::Str)
    }

    fn scan_raw_string(&mut self) -> Token {
        let start = self.off;
        self.off += 1;
        loop {
            match self.peek() {
                0 => {
                    self.error(start, "unterminated raw string literal");
                    break;
                }
                b'`' => {
                    self.off += 1;
                    break;
                }
                _ => self.off += 1,
            }
        }
        self.lit(start, TokKind::Str)
    }

    fn scan_rune(&mut self) -> Token {
        let start = self.off;
        self.off += 1;
        loop {
            match self.peek() {
                0 | b'\n' => {
                    self.error(start, "unterminated rune literal");
                    break;
                }
                b'\\' => self.off += 2,
                b'\'' => {
                    self.off += 1;
                    break;
                }
                _ => self.off += 1,
            }
        }
        self.lit(start, TokKind::Rune)
    }

    fn scan_operator(&mut self) -> Token {
        use TokKind::*;
        let start = self.off;
        let c = self.bytes[self.off];
        let c1 = self.peek_at(1);
        let c2 = self.peek_at(2);
        let (kind, len) = match (c, c1, c2) {
            (b'<', b'<', b'=') => (ShlAssign, 3),
            (b'>', b'>', b'=') => (ShrAssign, 3),
            (b'&', b'^', b'=') => (AndNotAssign, 3),
            (b'.', b'.', b'.') => (Ellipsis, 3),
            (b'+', b'+', _) => (Inc, 2),
            (b'-', b'-', _) => (Dec, 2),
            (b'+', b'=', _) => (AddAssign, 2),
            (b'-', b'=', _) => (SubAssign, 2),
            (b'*', b'=', _) => (MulAssign, 2),
            (b'/', b'=', _) => (QuoAssign, 2),
            (b'%', b'=', _) => (RemAssign, 2),
            (b'&', b'=', _) => (AndAssign, 2),
            (b'|', b'=', _) => (OrAssign, 2),
            (b'^', b'=', _) => (XorAssign, 2),
            (b'&', b'&', _) => (LAnd, 2),
            (b'|', b'|', _) => (LOr, 2),
            (b'&', b'^', _) => (AndNot, 2),
            (b'<', b'-', _) => (Arrow, 2),
            (b'<', b'<', _) => (Shl, 2),
            (b'>', b'>', _) => (Shr, 2),
            (b'=', b'=', _) => (Eql, 2),
            (b'!', b'=', _) => (Neq, 2),
            (b'<', b'=', _) => (Leq, 2),
            (b'>', b'=', _) => (Geq, 2),
            (b':', b'=', _) => (Define, 2),
            (b'+', _, _) => (Add, 1),
            (b'-', _, _) => (Sub, 1),
            (b'*', _, _) => (Mul, 1),
            (b'/', _, _) => (Quo, 1),
            (b'%', _, _) => (Rem, 1),
            (b'&', _, _) => (And, 1),
            (b'|', _, _) => (Or, 1),
            (b'^', _, _) => (Xor, 1),
            (b'=', _, _) => (Assign, 1),
            (b'<', _, _) => (Lss, 1),
            (b'>', _, _) => (Gtr, 1),
            (b'!', _, _) => (Not, 1),
            (b'(', _, _) => (LParen, 1),
            (b'[', _, _) => (LBrack, 1),
            (b'{', _, _) => (LBrace, 1),
            (b')', _, _) => (RParen, 1),
            (b']', _, _) => (RBrack, 1),
            (b'}', _, _) => (RBrace, 1),
            (b',', _, _) => (Comma, 1),
            (b'.', _, _) => (Period, 1),
            (b';', _, _) => (Semi, 1),
            (b':', _, _) => (Colon, 1),
            _ => {
                self.error(start, format!("unexpected character {:?}", c as char));
                self.off += 1;
                return self.next_token();
            }
        };
        self.off += len;
        self.fixed(start, start + len, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokKind> {
        let mut lx = Lexer::new(src, 1);
        let mut out = Vec::new();
        loop {
            let tok = lx.next_token();
            if tok.kind == TokKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn semicolon_insertion() {
        use TokKind::*;
        assert_eq!(
            kinds("x = 1\ny++\n"),
            vec![Ident, Assign, Int, Semi, Ident, Inc, Semi]
        );
        // No insertion after an operator.
        assert_eq!(kinds("x +\n1\n"), vec![Ident, Add, Int, Semi]);
        // Insertion after a closing brace.
        assert_eq!(kinds("}\n"), vec![RBrace, Semi]);
    }

    #[test]
    fn comments_are_skipped() {
        use TokKind::*;
        assert_eq!(kinds("x // trailing\n= 1\n"), vec![Ident, Semi, Assign, Int, Semi]);
        assert_eq!(kinds("/* a */ x /* b */ = 1\n"), vec![Ident, Assign, Int, Semi]);
    }

    #[test]
    fn compound_operators() {
        use TokKind::*;
        assert_eq!(kinds("a &^= b<<2"), vec![Ident, AndNotAssign, Ident, Shl, Int, Semi]);
        assert_eq!(kinds("c := <-ch"), vec![Ident, Define, Arrow, Ident, Semi]);
        assert_eq!(kinds("f(a...)"), vec![Ident, LParen, Ident, Ellipsis, RParen, Semi]);
    }

    #[test]
    fn literals() {
        use TokKind::*;
        assert_eq!(
            kinds(r#"0x1f 1.5 'a' "s" `raw`"#),
            vec![Int, Float, Rune, Str, Str, Semi]
        );
    }

    #[test]
    fn rune_with_escape() {
        assert_eq!(kinds(r"'\n'"), vec![TokKind::Rune, TokKind::Semi]);
    }
}
