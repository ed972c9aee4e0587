//! The embedded expression language.
//!
//! Instruction bodies interpolate a small, closed expression grammar rather
//! than host code: literals, identifiers, member/index access, arithmetic,
//! comparisons, logical operators, and array/object literals. Identifiers
//! resolve against the caller's scope directly, so `<%= user.name %>` reads
//! the `user` member of whatever data the render call supplied.
//!
//! Parse failures never abort compilation; the compiler stores them and the
//! renderer raises them when the instruction executes.

mod eval;
mod lexer;
mod parser;

pub use eval::{eval, Scope};
pub use parser::{parse, parse_sequence};

/// A parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Numeric literal.
    Number(f64),
    /// Single- or double-quoted string literal.
    Str(String),
    /// Bare identifier, resolved against the scope.
    Ident(String),
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `{key: value}`
    Object(Vec<(String, Expr)>),
    /// `base.name`
    Member(Box<Expr>, String),
    /// `base[index]`
    Index(Box<Expr>, Box<Expr>),
    /// Prefix operator application.
    Unary(UnaryOp, Box<Expr>),
    /// Infix operator application.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-expr`
    Neg,
    /// `!expr`
    Not,
}

/// Infix operators, all left-associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Binding power; higher binds tighter.
    pub(crate) fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Ne => 3,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 4,
            Self::Add | Self::Sub => 5,
            Self::Mul | Self::Div | Self::Rem => 6,
        }
    }
}
