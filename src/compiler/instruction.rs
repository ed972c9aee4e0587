//! Classifies instruction bodies into typed fragments.
//!
//! The kind of an instruction is decided solely by its leading sigil:
//!
//! | sigil       | kind                                   |
//! |-------------|----------------------------------------|
//! | `=`         | escaped interpolation                  |
//! | `=:`        | escaped interpolation through filters  |
//! | `-`         | raw interpolation                      |
//! | `-:`        | raw interpolation through filters      |
//! | `#`         | comment                                |
//! | `:`         | no-op                                  |
//! | `include `  | nested template                        |
//! | anything else | control-flow statement               |
//!
//! The `:` marker is historical; `=` and `-` accept a ` | ` pipeline too.
//!
//! Expression and statement parse failures are deferred: the slot carries
//! the message and the renderer raises it when the instruction executes.
//! Only the tokenizer can fail compilation.

use super::expr::{parse, parse_sequence, Expr};

/// A parsed expression, or the failure to raise at render time.
pub type ExprSlot = Result<Expr, String>;

/// One step of a filter pipeline: `name arg1 arg2`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Expr>,
}

/// An ordered filter pipeline, applied left to right.
pub type FilterChain = Vec<FilterCall>;

/// The closed set of instruction kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    /// `<%= expr %>` - append the escaped result.
    Escape(ExprSlot),
    /// `<%=: expr | name args %>` - filter, then escape.
    EscapeFiltered(ExprSlot, FilterChain),
    /// `<%- expr %>` - append the result verbatim.
    Raw(ExprSlot),
    /// `<%-: expr | name args %>` - filter, append verbatim.
    RawFiltered(ExprSlot, FilterChain),
    /// `<%# anything %>` - no output.
    Comment,
    /// `<% include target(args) %>` - nested template.
    Include {
        target: String,
        args: Option<ExprSlot>,
    },
    /// Everything else: a control-flow statement.
    CodeStatement(Statement),
}

/// The control-flow statements the renderer supports.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `if expr` - opens a conditional.
    If(ExprSlot),
    /// `else if expr`
    ElseIf(ExprSlot),
    /// `else`
    Else,
    /// `for name in expr` - opens a loop.
    For { var: String, items: ExprSlot },
    /// `let name = expr` - binds a local.
    Let { name: String, expr: ExprSlot },
    /// `end` - closes the innermost `if` or `for`.
    End,
    /// Empty instruction body; compiles to nothing.
    Empty,
    /// A malformed `include` directive; raises at render time.
    BadInclude(String),
    /// Unrecognized statement text; raises at render time.
    Invalid(String),
}

/// Classifies a trimmed instruction body.
pub fn classify(body: &str) -> InstructionKind {
    let text = body.trim();

    if let Some(rest) = text.strip_prefix("=:") {
        let (expr, chain) = parse_pipeline(rest);
        return InstructionKind::EscapeFiltered(expr, chain);
    }
    if let Some(rest) = text.strip_prefix('=') {
        // A pipeline is legal without the `:` marker too.
        let (expr, chain) = parse_pipeline(rest);
        return if chain.is_empty() {
            InstructionKind::Escape(expr)
        } else {
            InstructionKind::EscapeFiltered(expr, chain)
        };
    }
    if let Some(rest) = text.strip_prefix("-:") {
        let (expr, chain) = parse_pipeline(rest);
        return InstructionKind::RawFiltered(expr, chain);
    }
    if let Some(rest) = text.strip_prefix('-') {
        let (expr, chain) = parse_pipeline(rest);
        return if chain.is_empty() {
            InstructionKind::Raw(expr)
        } else {
            InstructionKind::RawFiltered(expr, chain)
        };
    }
    if text.starts_with('#') {
        return InstructionKind::Comment;
    }
    if text.starts_with(':') {
        // A bare `:` compiles to nothing.
        return InstructionKind::CodeStatement(Statement::Empty);
    }
    if text == "include" || text.starts_with("include ") {
        return parse_include(text);
    }

    InstructionKind::CodeStatement(parse_statement(text))
}

/// Splits `expr | name args | name args` on the literal ` | ` sequence and
/// parses each segment. The leftmost segment is the base expression. Any
/// segment failure poisons the base slot; the chain is dropped.
fn parse_pipeline(text: &str) -> (ExprSlot, FilterChain) {
    let mut segments = text.trim().split(" | ");
    let base = match segments.next() {
        Some(segment) => parse(segment.trim()),
        None => Err("empty filter pipeline".to_string()),
    };
    if base.is_err() {
        return (base, Vec::new());
    }

    let mut chain = Vec::new();
    for segment in segments {
        match parse_filter_call(segment.trim()) {
            Ok(call) => chain.push(call),
            Err(message) => return (Err(message), Vec::new()),
        }
    }
    (base, chain)
}

/// Parses one `name arg1 arg2` filter segment.
fn parse_filter_call(segment: &str) -> Result<FilterCall, String> {
    let mut parts = segment.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    if !is_ident(name) {
        return Err(format!("invalid filter name `{name}`"));
    }
    let args = match parts.next() {
        Some(rest) => parse_sequence(rest)?,
        None => Vec::new(),
    };
    Ok(FilterCall {
        name: name.to_string(),
        args,
    })
}

/// Parses `include target` with optional parenthesized arguments. Anything
/// that does not fit the shape becomes a deferred failure carrying the
/// offending text.
fn parse_include(text: &str) -> InstructionKind {
    let bad = || InstructionKind::CodeStatement(Statement::BadInclude(text.to_string()));

    let rest = text["include".len()..].trim();
    if rest.is_empty() {
        return bad();
    }

    let target_end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    let target = &rest[..target_end];
    let after = rest[target_end..].trim();

    if after.is_empty() {
        return InstructionKind::Include {
            target: target.to_string(),
            args: None,
        };
    }

    // The remainder must be exactly `( ... )`.
    let Some(inner) = after.strip_prefix('(').and_then(|s| s.strip_suffix(')')) else {
        return bad();
    };
    if inner.trim().is_empty() {
        return bad();
    }
    InstructionKind::Include {
        target: target.to_string(),
        args: Some(parse(inner.trim())),
    }
}

fn parse_statement(text: &str) -> Statement {
    if text.is_empty() {
        return Statement::Empty;
    }

    let (keyword, rest) = match text.find(char::is_whitespace) {
        Some(at) => (&text[..at], text[at..].trim()),
        None => (text, ""),
    };

    match keyword {
        "if" if !rest.is_empty() => Statement::If(parse(rest)),
        "else" if rest.is_empty() => Statement::Else,
        "else" => match rest.strip_prefix("if") {
            Some(cond) if cond.starts_with(char::is_whitespace) => {
                Statement::ElseIf(parse(cond.trim()))
            }
            _ => Statement::Invalid(text.to_string()),
        },
        "end" if rest.is_empty() => Statement::End,
        "for" => parse_for(text, rest),
        "let" => parse_let(text, rest),
        _ => Statement::Invalid(text.to_string()),
    }
}

fn parse_for(text: &str, rest: &str) -> Statement {
    let Some((var, items)) = rest.split_once(" in ") else {
        return Statement::Invalid(text.to_string());
    };
    let var = var.trim();
    if !is_ident(var) {
        return Statement::Invalid(text.to_string());
    }
    Statement::For {
        var: var.to_string(),
        items: parse(items.trim()),
    }
}

fn parse_let(text: &str, rest: &str) -> Statement {
    let Some((name, expr)) = rest.split_once('=') else {
        return Statement::Invalid(text.to_string());
    };
    let name = name.trim();
    if !is_ident(name) {
        return Statement::Invalid(text.to_string());
    }
    Statement::Let {
        name: name.to_string(),
        expr: parse(expr.trim()),
    }
}

fn is_ident(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
