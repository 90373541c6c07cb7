use crate::error::{Error, Result, SourceSpan};

use super::token::{SpannedToken, Token};

/// Tokenizer for the expression language.
///
/// Walks the source as chars, tracking a line/column offset relative to the
/// YAML scalar the expression came from so every token carries a span in the
/// original document.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    base: SourceSpan,
}

fn keyword(name: &str) -> Option<Token> {
    match name {
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "not" => Some(Token::Not),
        "in" => Some(Token::In),
        "is" => Some(Token::Is),
        "if" => Some(Token::If),
        "else" => Some(Token::Else),
        "for" => Some(Token::For),
        "lambda" => Some(Token::Lambda),
        "cond" => Some(Token::Cond),
        "true" => Some(Token::True),
        "false" => Some(Token::False),
        "null" => Some(Token::Null),
        _ => None,
    }
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, base: SourceSpan) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 0,
            col: 0,
            base,
        }
    }

    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn here(&self) -> SourceSpan {
        self.base.offset(self.line, self.col)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<String> {
        let open = self.here();
        self.advance();
        let mut s = String::new();
        loop {
            match self.current() {
                None => return Err(Error::lex("unterminated string literal", open)),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(s);
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some('r') => s.push('\r'),
                        Some(c) => s.push(c),
                        None => {
                            return Err(Error::lex("unterminated string escape", open));
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let span = self.here();
        while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_float = false;
        if self.current() == Some('.') && matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            let mut probe = self.input[self.pos..].chars();
            probe.next();
            let next = probe.next();
            let after = probe.next();
            let exponent_follows = match next {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => matches!(after, Some(c) if c.is_ascii_digit()),
                _ => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance();
                if matches!(self.current(), Some('+') | Some('-')) {
                    self.advance();
                }
                while matches!(self.current(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let text = &self.input[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| Error::lex(format!("invalid float literal `{}`", text), span))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| Error::lex(format!("integer literal `{}` out of range", text), span))
        }
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.current(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let name = &self.input[start..self.pos];
        keyword(name).unwrap_or_else(|| Token::Ident(name.to_string()))
    }

    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace();
            let span = self.here();
            let c = match self.current() {
                None => return Ok(out),
                Some(c) => c,
            };
            let token = match c {
                '(' => {
                    self.advance();
                    Token::LParen
                }
                ')' => {
                    self.advance();
                    Token::RParen
                }
                '[' => {
                    self.advance();
                    Token::LBracket
                }
                ']' => {
                    self.advance();
                    Token::RBracket
                }
                '{' => {
                    self.advance();
                    Token::LBrace
                }
                '}' => {
                    self.advance();
                    Token::RBrace
                }
                ',' => {
                    self.advance();
                    Token::Comma
                }
                '.' => {
                    self.advance();
                    Token::Dot
                }
                ':' => {
                    self.advance();
                    Token::Colon
                }
                ';' => {
                    self.advance();
                    Token::Semi
                }
                '+' => {
                    self.advance();
                    Token::Plus
                }
                '-' => {
                    self.advance();
                    Token::Minus
                }
                '*' => {
                    self.advance();
                    Token::Star
                }
                '/' => {
                    self.advance();
                    Token::Slash
                }
                '%' => {
                    self.advance();
                    Token::Percent
                }
                '=' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        Token::Eq
                    } else {
                        return Err(Error::lex("`=` is not an operator; use `==`", span));
                    }
                }
                '!' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        Token::Ne
                    } else {
                        return Err(Error::lex("unexpected `!`; use `not`", span));
                    }
                }
                '<' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        Token::Le
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        Token::Ge
                    } else {
                        Token::Gt
                    }
                }
                '\'' | '"' => Token::Str(self.read_string(c)?),
                c if c.is_ascii_digit() => self.read_number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.read_ident(),
                c => {
                    return Err(Error::lex(format!("unexpected character `{}`", c), span));
                }
            };
            out.push(SpannedToken { token, span });
        }
    }
}
