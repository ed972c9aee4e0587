//! Pratt parser for the expression language.
//!
//! A prefix expression is parsed first (literal, identifier, unary operator,
//! parenthesized group, array or object literal), then the loop folds in
//! infix operators whose precedence meets the current minimum. Member and
//! index access bind tighter than any operator and are handled as postfix.

use super::lexer::{Lexer, Token};
use super::{BinaryOp, Expr, UnaryOp};

/// Parses a single expression; trailing tokens are an error.
pub fn parse(source: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expr(0)?;
    parser.expect_eof()?;
    Ok(expr)
}

/// Parses a whitespace-separated run of expressions, as found in filter
/// arguments: `truncate 13 "..."` carries two.
pub fn parse_sequence(source: &str) -> Result<Vec<Expr>, String> {
    let mut parser = Parser::new(source)?;
    let mut exprs = Vec::new();
    while !parser.at_eof() {
        exprs.push(parser.parse_expr(0)?);
    }
    Ok(exprs)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, String> {
        Ok(Self {
            tokens: Lexer::new(source).tokenize()?,
            pos: 0,
        })
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of expression".to_string())?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), String> {
        let token = self.next()?;
        if token == *expected {
            Ok(())
        } else {
            Err(format!("expected {what}, found {token:?}"))
        }
    }

    fn expect_eof(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(format!("unexpected {token:?} after expression")),
        }
    }

    /// Core Pratt loop.
    fn parse_expr(&mut self, min_prec: u8) -> Result<Expr, String> {
        let mut left = self.parse_prefix()?;
        while let Some(op) = self.peek().and_then(binary_op) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.parse_expr(prec + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, String> {
        let token = self.next()?;
        let expr = match token {
            Token::Number(n) => Expr::Number(n),
            Token::Str(s) => Expr::Str(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::Ident(name) => Expr::Ident(name),
            Token::Minus => {
                let operand = self.parse_prefix()?;
                Expr::Unary(UnaryOp::Neg, Box::new(operand))
            }
            Token::Bang => {
                let operand = self.parse_prefix()?;
                Expr::Unary(UnaryOp::Not, Box::new(operand))
            }
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(&Token::RParen, "`)`")?;
                inner
            }
            Token::LBracket => self.parse_array()?,
            Token::LBrace => self.parse_object()?,
            other => return Err(format!("unexpected {other:?} in expression")),
        };
        self.parse_postfix(expr)
    }

    /// Folds member and index access onto a parsed atom.
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, String> {
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    match self.next()? {
                        Token::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                        other => return Err(format!("expected member name, found {other:?}")),
                    }
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr(0)?;
                    self.expect(&Token::RBracket, "`]`")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Expr, String> {
        let mut items = Vec::new();
        if self.peek() == Some(&Token::RBracket) {
            self.pos += 1;
            return Ok(Expr::Array(items));
        }
        loop {
            items.push(self.parse_expr(0)?);
            match self.next()? {
                Token::Comma => continue,
                Token::RBracket => return Ok(Expr::Array(items)),
                other => return Err(format!("expected `,` or `]`, found {other:?}")),
            }
        }
    }

    fn parse_object(&mut self) -> Result<Expr, String> {
        let mut entries = Vec::new();
        if self.peek() == Some(&Token::RBrace) {
            self.pos += 1;
            return Ok(Expr::Object(entries));
        }
        loop {
            let key = match self.next()? {
                Token::Ident(name) => name,
                Token::Str(text) => text,
                other => return Err(format!("expected object key, found {other:?}")),
            };
            self.expect(&Token::Colon, "`:`")?;
            entries.push((key, self.parse_expr(0)?));
            match self.next()? {
                Token::Comma => continue,
                Token::RBrace => return Ok(Expr::Object(entries)),
                other => return Err(format!("expected `,` or `}}`, found {other:?}")),
            }
        }
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Rem,
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        Token::AndAnd => BinaryOp::And,
        Token::OrOr => BinaryOp::Or,
        _ => return None,
    })
}
