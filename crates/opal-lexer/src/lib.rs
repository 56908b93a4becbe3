//! Opal lexer: turns source text into a flat token vector.
//!
//! The lexer is deliberately dumb about shell text: `deployment.yaml`
//! comes out as three tokens (`deployment` `.` `yaml`) and `-f` as two.
//! Each token records whether whitespace preceded it, and the parser's
//! shell sub-parser reassembles adjacent runs into single arguments.
//!
//! Strings are a single `String` token spanning both quotes; the
//! parser's interpolation scanner decides what `@name` means inside the
//! content, so the lexer needs no string states.

mod cursor;

use cursor::Cursor;
use opal_common::{keyword_from_str, LexError, LexErrorKind, Span, Token, TokenKind};

/// The Opal lexer. Converts source text into a stream of tokens.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source.
    ///
    /// The returned vector always ends with an `Eof` token. Errors are
    /// collected, never fatal: unknown characters are skipped and
    /// unterminated strings run to end of input.
    pub fn tokenize(source: &'src str) -> (Vec<Token>, Vec<LexError>) {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, lexer.errors)
    }

    fn next_token(&mut self) -> Token {
        let mut space_before = false;
        loop {
            // Spaces and tabs are not tokens, but the following token
            // remembers them for shell-argument grouping.
            let before = self.cursor.pos();
            self.cursor.eat_while(|c| c == ' ' || c == '\t' || c == '\r');
            if self.cursor.pos() > before {
                space_before = true;
            }

            let start = self.cursor.pos();
            let line = self.cursor.line();
            let col = self.cursor.col();

            let Some(c) = self.cursor.peek() else {
                return self.finish(TokenKind::Eof, start, line, col, space_before);
            };

            let kind = match c {
                '\n' => {
                    self.cursor.advance();
                    TokenKind::Newline
                }

                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                ';' => self.single(TokenKind::Semicolon),
                ':' => self.single(TokenKind::Colon),
                '?' => self.single(TokenKind::Question),
                '@' => self.single(TokenKind::At),

                '=' => self.one_or_two(TokenKind::Eq, '=', TokenKind::EqEq),
                '!' => self.one_or_two(TokenKind::Bang, '=', TokenKind::NotEq),
                '&' => {
                    self.cursor.advance();
                    if self.cursor.peek() == Some('&') {
                        self.cursor.advance();
                        TokenKind::AmpAmp
                    } else {
                        self.errors.push(LexError::new(
                            LexErrorKind::UnexpectedCharacter('&'),
                            Span::new(start, self.cursor.pos()),
                        ));
                        continue;
                    }
                }
                '|' => self.one_or_two(TokenKind::Pipe, '|', TokenKind::PipePipe),
                '<' => self.one_or_two(TokenKind::Lt, '=', TokenKind::LtEq),
                '>' => {
                    self.cursor.advance();
                    match self.cursor.peek() {
                        Some('=') => {
                            self.cursor.advance();
                            TokenKind::GtEq
                        }
                        Some('>') => {
                            self.cursor.advance();
                            TokenKind::Append
                        }
                        _ => TokenKind::Gt,
                    }
                }
                '+' => {
                    self.cursor.advance();
                    match self.cursor.peek() {
                        Some('=') => {
                            self.cursor.advance();
                            TokenKind::PlusEq
                        }
                        Some('+') => {
                            self.cursor.advance();
                            TokenKind::PlusPlus
                        }
                        _ => TokenKind::Plus,
                    }
                }
                '-' => {
                    self.cursor.advance();
                    match self.cursor.peek() {
                        Some('=') => {
                            self.cursor.advance();
                            TokenKind::MinusEq
                        }
                        Some('-') => {
                            self.cursor.advance();
                            TokenKind::MinusMinus
                        }
                        Some('>') => {
                            self.cursor.advance();
                            TokenKind::Arrow
                        }
                        _ => TokenKind::Minus,
                    }
                }
                '*' => self.one_or_two(TokenKind::Star, '=', TokenKind::StarEq),
                '/' => self.one_or_two(TokenKind::Slash, '=', TokenKind::SlashEq),
                '%' => self.one_or_two(TokenKind::Percent, '=', TokenKind::PercentEq),
                '.' => {
                    self.cursor.advance();
                    if self.cursor.peek() == Some('.') && self.cursor.peek_next() == Some('.') {
                        self.cursor.advance();
                        self.cursor.advance();
                        TokenKind::Ellipsis
                    } else {
                        TokenKind::Dot
                    }
                }

                '#' => {
                    self.cursor.eat_while(|c| c != '\n');
                    TokenKind::Comment
                }

                '"' | '\'' | '`' => self.lex_string(c, start),

                '0'..='9' => self.lex_number(),

                c if is_ident_start(c) => self.lex_ident(start),

                other => {
                    self.cursor.advance();
                    self.errors.push(LexError::new(
                        LexErrorKind::UnexpectedCharacter(other),
                        Span::new(start, self.cursor.pos()),
                    ));
                    continue;
                }
            };

            return self.finish(kind, start, line, col, space_before);
        }
    }

    fn finish(&self, kind: TokenKind, start: u32, line: u32, col: u32, space: bool) -> Token {
        let token = Token::new(kind, start, self.cursor.pos(), line, col);
        if space {
            token.with_space_before()
        } else {
            token
        }
    }

    /// Consume one character and return `kind`.
    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }

    /// Consume one character; if `second` follows, consume it too and
    /// return `two`, otherwise return `one`.
    fn one_or_two(&mut self, one: TokenKind, second: char, two: TokenKind) -> TokenKind {
        self.cursor.advance();
        if self.cursor.peek() == Some(second) {
            self.cursor.advance();
            two
        } else {
            one
        }
    }

    /// Lex a quoted string into a single `String` token including both
    /// quotes. Double quotes and backticks honor `\` escapes; single
    /// quotes are fully literal. Unterminated strings run to end of input
    /// and record a lex error.
    fn lex_string(&mut self, quote: char, start: u32) -> TokenKind {
        self.cursor.advance(); // opening quote
        loop {
            match self.cursor.peek() {
                None => {
                    self.errors.push(LexError::new(
                        LexErrorKind::UnterminatedString,
                        Span::new(start, self.cursor.pos()),
                    ));
                    break;
                }
                Some(c) if c == quote => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') if quote != '\'' => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
        TokenKind::String
    }

    /// Lex a number: integer, float (`1.5`), or duration (`5m`, `500ms`).
    fn lex_number(&mut self) -> TokenKind {
        self.cursor.advance(); // first digit
        self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');

        let mut is_float = false;
        // A float needs `.` followed by a digit, so `1...3` stays a range.
        if self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.cursor.advance(); // .
            self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
        }

        if self.eat_duration_unit() {
            return TokenKind::Duration;
        }

        if is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        }
    }

    /// Try to consume a duration unit (`ns us ms s m h d`) directly after
    /// the digits. The unit must not be followed by another identifier
    /// character, so `5max` stays `5` + `max`.
    fn eat_duration_unit(&mut self) -> bool {
        let rest = self.cursor.rest();
        let unit_len = if rest.starts_with("ns") || rest.starts_with("us") || rest.starts_with("ms")
        {
            2
        } else if rest.starts_with(['s', 'm', 'h', 'd']) {
            1
        } else {
            return false;
        };

        if rest[unit_len..].chars().next().is_some_and(is_ident_continue) {
            return false;
        }

        for _ in 0..unit_len {
            self.cursor.advance();
        }
        true
    }

    /// Lex an identifier or keyword.
    fn lex_ident(&mut self, start: u32) -> TokenKind {
        self.cursor.advance();
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice(start, self.cursor.pos());
        keyword_from_str(text).unwrap_or(TokenKind::Ident)
    }
}

/// Whether a character can start an identifier.
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Whether a character can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
