//! Module `scanner` turns Lamscript source text into a flat stream of [`Token`]s.
//!
//! The scanner is a single forward pass over the source bytes. Whitespace and
//! `//` comments are skipped, keywords are recognised through a compile‑time
//! perfect‑hash map, and exactly one `EOF` token terminates the stream.
//!
//! It is exposed as a `FusedIterator` yielding `Result<Token, LamError>`, so
//! a lexing error on one character does not stop the scan: callers collect
//! the errors and keep going, and [`scan`] does exactly that.

use crate::error::{LamError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

/// Scans the whole source, returning every token (EOF included) together with
/// every lexing error encountered along the way.
pub fn scan(source: &str) -> (Vec<Token>, Vec<LamError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LamError> = Vec::new();

    for item in Scanner::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    info!(
        "Scanned {} token(s) with {} error(s)",
        tokens.len(),
        errors.len()
    );

    (tokens, errors)
}

/// A single pass lexer over a borrowed source string.
pub struct Scanner<'a> {
    src: &'a str,
    start: usize, // first byte of the current lexeme
    curr: usize,  // one past the last byte examined
    line: usize,
    done: bool, // EOF already emitted
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            done: false,
        }
    }

    #[inline(always)]
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes()[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte, or `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.bytes().get(self.curr).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.bytes().get(self.curr + 1).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.curr += 1;
            return true;
        }

        false
    }

    /// Picks `double` when the next byte is `=`, `single` otherwise.
    fn one_or_two(&mut self, single: TokenType, double: TokenType) -> TokenType {
        if self.match_byte(b'=') {
            double
        } else {
            single
        }
    }

    /// Scans one lexeme starting at `self.start`. `Ok(None)` means the lexeme
    /// was insignificant (whitespace, newline or comment).
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let token_type = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.one_or_two(TokenType::BANG, TokenType::BANG_EQUAL),
            b'=' => self.one_or_two(TokenType::EQUAL, TokenType::EQUAL_EQUAL),
            b'<' => self.one_or_two(TokenType::LESS, TokenType::LESS_EQUAL),
            b'>' => self.one_or_two(TokenType::GREATER, TokenType::GREATER_EQUAL),

            b'/' if self.match_byte(b'/') => {
                // Jump straight to the newline; it is consumed on the next call
                // so the line counter stays in one place.
                match memchr(b'\n', &self.bytes()[self.curr..]) {
                    Some(pos) => self.curr += pos,
                    None => self.curr = self.src.len(),
                }

                return Ok(None);
            }

            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Swallow the rest of a multi-byte character so the next
                // lexeme starts on a char boundary.
                while !self.src.is_char_boundary(self.curr) {
                    self.curr += 1;
                }

                let ch: &str = &self.src[self.start..self.curr];

                return Err(LamError::lex(
                    self.line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        };

        Ok(Some(token_type))
    }

    /// String literal; `self.start` points at the opening quote.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LamError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        let contents: &str = &self.src[self.start + 1..self.curr - 1];

        Ok(TokenType::STRING(contents.to_owned()))
    }

    /// Numeric literal (`123`, `3.14`). A trailing `.` is not part of it.
    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Only ASCII digits and at most one interior '.' were consumed.
        let n: f64 = self.src[self.start..self.curr].parse().unwrap_or(0.0);

        TokenType::NUMBER(n)
    }

    fn identifier(&mut self) -> TokenType {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(tt)) => {
                    debug!("Scanned token ({:?}) on line {}", tt, self.line);

                    let lexeme: &str = &self.src[self.start..self.curr];

                    return Some(Ok(Token::new(tt, lexeme, self.line)));
                }

                Ok(None) => {}
            }
        }

        self.done = true;

        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
