//! Tokenizer for semantic program text.

use super::error::SynthesisError;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Semicolon,
    Question,
    Colon,
    Equals,
    DoubleEquals,
    BangEquals,
    LessThan,
    LessEquals,
    GreaterThan,
    GreaterEquals,
    ShiftLeft,
    ShiftRight,
    Plus,
    Dash,
    Star,
    Slash,
    Percent,
    Ampersand,
    DoubleAmpersand,
    Pipe,
    DoublePipe,
    Caret,
    Tilde,
    Bang,
    EOF,
}

#[derive(Clone, Copy)]
enum Radix {
    Binary,
    Octal,
    Decimal,
    Hex,
}

impl Radix {
    fn accepts(self, ch: char) -> bool {
        match self {
            Radix::Binary => matches!(ch, '0' | '1'),
            Radix::Octal => matches!(ch, '0'..='7'),
            Radix::Decimal => ch.is_ascii_digit(),
            Radix::Hex => ch.is_ascii_hexdigit(),
        }
    }
}

pub struct Lexer<'src> {
    src: &'src str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, SynthesisError> {
        self.skip_ignorable();
        let (line, column) = self.position();
        let Some(ch) = self.peek_char() else {
            return Ok(self.make_token(TokenKind::EOF, "", line, column));
        };
        let next = self.peek_next_char();

        let pair = |kind| Some((kind, 2));
        let two = match (ch, next) {
            ('=', Some('=')) => pair(TokenKind::DoubleEquals),
            ('!', Some('=')) => pair(TokenKind::BangEquals),
            ('<', Some('=')) => pair(TokenKind::LessEquals),
            ('>', Some('=')) => pair(TokenKind::GreaterEquals),
            ('<', Some('<')) => pair(TokenKind::ShiftLeft),
            ('>', Some('>')) => pair(TokenKind::ShiftRight),
            ('&', Some('&')) => pair(TokenKind::DoubleAmpersand),
            ('|', Some('|')) => pair(TokenKind::DoublePipe),
            _ => None,
        };
        if let Some((kind, width)) = two {
            return Ok(self.consume_fixed(kind, width));
        }

        let single = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Equals,
            '<' => TokenKind::LessThan,
            '>' => TokenKind::GreaterThan,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Dash,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '&' => TokenKind::Ampersand,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '!' => TokenKind::Bang,
            '"' | '\'' => return self.consume_string(ch),
            ch if ch.is_ascii_digit() => return self.consume_number(),
            ch if is_ident_start(ch) => return Ok(self.consume_identifier()),
            other => {
                return Err(self.error(line, column, format!("unexpected character '{other}'")));
            }
        };
        Ok(self.consume_fixed(single, 1))
    }

    fn consume_identifier(&mut self) -> Token {
        let start = self.offset;
        let (line, column) = self.position();
        self.advance_char();
        while self.peek_char().is_some_and(is_ident_part) {
            self.advance_char();
        }
        self.make_token_from_span(TokenKind::Identifier, start, self.offset, line, column)
    }

    fn consume_number(&mut self) -> Result<Token, SynthesisError> {
        let start = self.offset;
        let (line, column) = self.position();
        let mut radix = Radix::Decimal;
        let mut digits_consumed = 0usize;
        let mut require_digit = false;

        if self.peek_char() == Some('0') {
            self.advance_char();
            digits_consumed += 1;
            let prefixed = match self.peek_char() {
                Some('x' | 'X') => Some(Radix::Hex),
                Some('b' | 'B') => Some(Radix::Binary),
                Some('o' | 'O') => Some(Radix::Octal),
                _ => None,
            };
            if let Some(prefixed) = prefixed {
                radix = prefixed;
                self.advance_char();
                digits_consumed = 0;
                require_digit = true;
            }
        } else {
            self.advance_char();
            digits_consumed += 1;
        }

        while let Some(ch) = self.peek_char() {
            if ch == '_' {
                self.advance_char();
                continue;
            }
            if radix.accepts(ch) {
                self.advance_char();
                digits_consumed += 1;
            } else {
                break;
            }
        }

        if require_digit && digits_consumed == 0 {
            return Err(self.error(line, column, "numeric literal requires digits after prefix"));
        }
        if self.peek_char().is_some_and(is_ident_part) {
            return Err(self.error(line, column, "identifier immediately follows numeric literal"));
        }

        Ok(self.make_token_from_span(TokenKind::Number, start, self.offset, line, column))
    }

    fn consume_string(&mut self, quote: char) -> Result<Token, SynthesisError> {
        let (line, column) = self.position();
        self.advance_char();
        let mut value = String::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                '\\' => {
                    self.advance_char();
                    let escaped = self
                        .peek_char()
                        .ok_or_else(|| self.error(line, column, "unterminated escape sequence"))?;
                    self.advance_char();
                    let actual = match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '0' => '\0',
                        'u' => self.consume_unicode_escape(line, column)?,
                        other => other,
                    };
                    value.push(actual);
                }
                '\n' => break,
                ch if ch == quote => {
                    self.advance_char();
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme: value,
                        line,
                        column,
                    });
                }
                other => {
                    value.push(other);
                    self.advance_char();
                }
            }
        }
        Err(self.error(line, column, "unterminated string literal"))
    }

    /// Reads the `{XXXX}` part of a `\u{XXXX}` escape.
    fn consume_unicode_escape(&mut self, line: usize, column: usize) -> Result<char, SynthesisError> {
        if self.peek_char() != Some('{') {
            return Err(self.error(line, column, "unicode escape must use '\\u{...}'"));
        }
        self.advance_char();
        let start = self.offset;
        while self.peek_char().is_some_and(|ch| ch.is_ascii_hexdigit()) {
            self.advance_char();
        }
        let digits = &self.src[start..self.offset];
        if self.peek_char() != Some('}') || digits.is_empty() {
            return Err(self.error(line, column, "malformed unicode escape"));
        }
        self.advance_char();
        u32::from_str_radix(digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(line, column, format!("invalid code point '{digits}'")))
    }

    fn consume_fixed(&mut self, kind: TokenKind, width: usize) -> Token {
        let start = self.offset;
        let (line, column) = self.position();
        for _ in 0..width {
            self.advance_char();
        }
        self.make_token_from_span(kind, start, self.offset, line, column)
    }

    fn skip_ignorable(&mut self) {
        loop {
            while self.peek_char().is_some_and(char::is_whitespace) {
                self.advance_char();
            }
            if self.peek_char() == Some('/') && self.peek_next_char() == Some('/') {
                while let Some(ch) = self.peek_char() {
                    self.advance_char();
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.src[self.offset..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    fn position(&self) -> (usize, usize) {
        (self.line, self.column + 1)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> SynthesisError {
        SynthesisError::Lex {
            line,
            column,
            message: message.into(),
        }
    }

    fn make_token(&self, kind: TokenKind, lexeme: &str, line: usize, column: usize) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            line,
            column,
        }
    }

    fn make_token_from_span(
        &self,
        kind: TokenKind,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Token {
        self.make_token(kind, &self.src[start..end], line, column)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_part(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
