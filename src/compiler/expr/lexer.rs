//! Tokenizer for the expression language.

/// A single expression token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

/// Cursor-based scanner over an expression string.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Consumes the whole input into a token list.
    pub fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.skip_whitespace() {
            tokens.push(self.next_token(ch)?);
        }
        Ok(tokens)
    }

    fn skip_whitespace(&mut self) -> Option<char> {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance(ch.len_utf8());
            } else {
                return Some(ch);
            }
        }
        None
    }

    fn next_token(&mut self, ch: char) -> Result<Token, String> {
        // Two-character operators first.
        for (text, token) in [
            ("==", Token::EqEq),
            ("!=", Token::NotEq),
            ("<=", Token::Le),
            (">=", Token::Ge),
            ("&&", Token::AndAnd),
            ("||", Token::OrOr),
        ] {
            if self.remaining().starts_with(text) {
                self.advance(2);
                return Ok(token);
            }
        }

        let single = match ch {
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '!' => Some(Token::Bang),
            '<' => Some(Token::Lt),
            '>' => Some(Token::Gt),
            _ => None,
        };
        if let Some(token) = single {
            self.advance(1);
            return Ok(token);
        }

        if ch == '"' || ch == '\'' {
            return self.lex_string(ch);
        }
        if ch.is_ascii_digit() {
            return self.lex_number();
        }
        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            return Ok(self.lex_ident());
        }

        Err(format!("unexpected `{ch}` in expression"))
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, String> {
        self.advance(1);
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            self.advance(ch.len_utf8());
            match ch {
                c if c == quote => return Ok(Token::Str(text)),
                '\\' => {
                    let escaped = self
                        .peek()
                        .ok_or_else(|| "unterminated string in expression".to_string())?;
                    self.advance(escaped.len_utf8());
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        other => text.push(other),
                    }
                }
                other => text.push(other),
            }
        }
        Err("unterminated string in expression".to_string())
    }

    fn lex_number(&mut self) -> Result<Token, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.')
            && self.remaining()[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
        }
        let text = &self.input[start..self.pos];
        text.parse()
            .map(Token::Number)
            .map_err(|_| format!("invalid number `{text}`"))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                self.advance(ch.len_utf8());
            } else {
                break;
            }
        }
        match &self.input[start..self.pos] {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            ident => Token::Ident(ident.to_string()),
        }
    }
}
