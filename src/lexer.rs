use crate::error::Span;
use crate::token::{lookup_ident, Token, TokenKind};
use tracing::trace;

/// On-demand scanner: each call to [`Lexer::next_token`] produces one token,
/// looking at most one character ahead.
#[derive(Debug, Clone)]
pub struct Lexer {
    source: String,
    start: usize,
    current: usize,
    eof_emitted: bool,
}

impl Lexer {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            start: 0,
            current: 0,
            eof_emitted: false,
        }
    }

    /// Scans the next token. Never fails: unrecognised input comes back as
    /// `Illegal`, and once the input is exhausted every call returns `Eof`.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return Token::new(TokenKind::Eof, "", Span::single(self.current));
        }

        let c = self.advance();
        let token = match c {
            b'=' => {
                let kind = if self.match_char(b'=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                };
                self.make_token(kind)
            }
            b'!' => {
                let kind = if self.match_char(b'=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            b';' => self.make_token(TokenKind::Semicolon),
            b':' => self.make_token(TokenKind::Colon),
            b'(' => self.make_token(TokenKind::LParen),
            b')' => self.make_token(TokenKind::RParen),
            b',' => self.make_token(TokenKind::Comma),
            b'+' => self.make_token(TokenKind::Plus),
            b'{' => self.make_token(TokenKind::LBrace),
            b'}' => self.make_token(TokenKind::RBrace),
            b'[' => self.make_token(TokenKind::LBracket),
            b']' => self.make_token(TokenKind::RBracket),
            b'-' => self.make_token(TokenKind::Minus),
            b'/' => self.make_token(TokenKind::Slash),
            b'*' => self.make_token(TokenKind::Asterisk),
            b'<' => self.make_token(TokenKind::Lt),
            b'>' => self.make_token(TokenKind::Gt),
            b'"' => self.string(),
            c if is_letter(c) => self.identifier(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii() => self.make_token(TokenKind::Illegal),
            _ => {
                // Keep the whole UTF-8 sequence together so spans stay on char boundaries.
                while !self.source.is_char_boundary(self.current) {
                    self.current += 1;
                }
                self.make_token(TokenKind::Illegal)
            }
        };

        trace!(kind = %token.kind, literal = %token.literal, start = token.span.start, "scanned token");
        token
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        c
    }

    fn peek(&self) -> u8 {
        self.source.as_bytes().get(self.current).copied().unwrap_or(0)
    }

    fn match_char(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && matches!(self.peek(), b' ' | b'\t' | b'\n' | b'\r') {
            self.current += 1;
        }
    }

    fn string(&mut self) -> Token {
        let mut content = Vec::new();

        loop {
            if self.is_at_end() {
                // Unterminated: hand the raw text to the parser as an illegal token.
                return self.make_token(TokenKind::Illegal);
            }

            match self.advance() {
                b'"' => break,
                b'\\' if !self.is_at_end() => {
                    let escaped = match self.peek() {
                        b'"' => Some(b'"'),
                        b'\\' => Some(b'\\'),
                        b'n' => Some(b'\n'),
                        b't' => Some(b'\t'),
                        b'r' => Some(b'\r'),
                        _ => None,
                    };
                    match escaped {
                        Some(byte) => {
                            self.current += 1;
                            content.push(byte);
                        }
                        None => content.push(b'\\'),
                    }
                }
                byte => content.push(byte),
            }
        }

        let literal = String::from_utf8_lossy(&content).into_owned();
        Token::new(
            TokenKind::String,
            literal,
            Span::new(self.start, self.current),
        )
    }

    fn identifier(&mut self) -> Token {
        while !self.is_at_end() && is_letter(self.peek()) {
            self.current += 1;
        }

        let kind = lookup_ident(&self.source[self.start..self.current]);
        self.make_token(kind)
    }

    fn number(&mut self) -> Token {
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.current += 1;
        }

        self.make_token(TokenKind::Int)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            &self.source[self.start..self.current],
            Span::new(self.start, self.current),
        )
    }
}

/// Yields every token up to and including the first `Eof`.
impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.eof_emitted {
            return None;
        }
        let token = self.next_token();
        if token.is(TokenKind::Eof) {
            self.eof_emitted = true;
        }
        Some(token)
    }
}

fn is_letter(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}
