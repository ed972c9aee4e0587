//! The executable side of a compiled template.
//!
//! A [`Template`] is a tree of [`Op`]s produced by the assembler. Rendering
//! walks the tree against a [`Scope`], appending to one shared output
//! buffer. Every op that can fail carries the (file, line) of the
//! instruction it was compiled from; failures are built from that metadata
//! directly, so no position bookkeeping happens during execution.
//!
//! In debug mode the render entry point intercepts a positioned failure and
//! returns a source-context report as the render result instead of the
//! error. Outside debug mode failures propagate unmodified.

use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::compiler::expr::{eval, Expr, Scope};
use crate::compiler::instruction::{ExprSlot, FilterChain};
use crate::debug;
use crate::error::{Error, Result};
use crate::escape::escape_html;
use crate::filters;
use crate::value::{to_text, truthy};

/// Source position of a compiled fragment.
#[derive(Debug, Clone)]
pub struct Pos {
    /// The file the fragment was compiled from, shared across the program.
    pub file: Option<Rc<PathBuf>>,
    /// 1-based source line.
    pub line: u32,
}

impl Pos {
    fn file_owned(&self) -> Option<PathBuf> {
        self.file.as_ref().map(|f| (**f).clone())
    }
}

/// What a raising fragment raises.
#[derive(Debug, Clone)]
pub enum RaiseKind {
    /// A malformed include directive, carrying its text.
    IncludeSyntax(String),
    /// A deferred compile failure or unsupported statement.
    Eval(String),
}

/// One executable fragment.
#[derive(Debug, Clone)]
pub enum Op {
    /// Append literal text exactly as it appeared in the source.
    Literal(String),
    /// Evaluate, run the filter chain, optionally escape, append.
    Output {
        expr: ExprSlot,
        chain: FilterChain,
        escape: bool,
        pos: Pos,
    },
    /// Run a nested template with `self` bound to the evaluated arguments.
    Include {
        template: Rc<Template>,
        args: Option<ExprSlot>,
        pos: Pos,
    },
    /// Conditional arms tried in order, with an optional else body.
    If {
        arms: Vec<(ExprSlot, Vec<Op>)>,
        alt: Option<Vec<Op>>,
        pos: Pos,
    },
    /// Iterate an array, binding `var` per element.
    For {
        var: String,
        items: ExprSlot,
        body: Vec<Op>,
        pos: Pos,
    },
    /// Bind a local in the current frame.
    Let {
        name: String,
        expr: ExprSlot,
        pos: Pos,
    },
    /// Raise a deferred failure.
    Raise { kind: RaiseKind, pos: Pos },
}

/// A compiled, executable template. Cheap to clone behind `Rc`; reusable
/// for any number of renders.
#[derive(Debug)]
pub struct Template {
    pub(crate) program: Vec<Op>,
    pub(crate) debug: bool,
}

impl Template {
    /// Renders against the given scope. The scope's members are addressable
    /// by bare identifiers inside the template.
    ///
    /// In debug mode a render-time failure with a known source position is
    /// converted into a diagnostic report and returned as the output.
    pub fn render(&self, scope: &Value) -> Result<String> {
        let mut out = String::new();
        let mut scope = Scope::new(scope);
        match run(&self.program, &mut scope, &mut out) {
            Ok(()) => Ok(out),
            Err(err) if self.debug => match debug::source_context(&err) {
                Some(report) => {
                    trace!("render failure converted to diagnostic output");
                    Ok(report)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}

fn run(ops: &[Op], scope: &mut Scope<'_>, out: &mut String) -> Result<()> {
    for op in ops {
        match op {
            Op::Literal(text) => out.push_str(text),
            Op::Output {
                expr,
                chain,
                escape,
                pos,
            } => {
                let mut value = eval_slot(expr, scope, pos)?;
                for call in chain {
                    let args = call
                        .args
                        .iter()
                        .map(|arg| eval_expr(arg, scope, pos))
                        .collect::<Result<Vec<_>>>()?;
                    value = filters::apply(&call.name, value, &args)
                        .map_err(|message| eval_at(message, pos))?;
                }
                let text = to_text(&value);
                if *escape {
                    out.push_str(&escape_html(&text));
                } else {
                    out.push_str(&text);
                }
            }
            Op::Include {
                template,
                args,
                pos,
            } => {
                let bound = match args {
                    Some(slot) => eval_slot(slot, scope, pos)?,
                    None => Value::Object(serde_json::Map::new()),
                };
                scope.push();
                scope.bind("self", bound);
                let result = run(&template.program, scope, out);
                scope.pop();
                result?;
            }
            Op::If { arms, alt, pos } => {
                let mut taken = false;
                for (cond, body) in arms {
                    if truthy(&eval_slot(cond, scope, pos)?) {
                        run(body, scope, out)?;
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    if let Some(body) = alt {
                        run(body, scope, out)?;
                    }
                }
            }
            Op::For {
                var,
                items,
                body,
                pos,
            } => {
                let items = eval_slot(items, scope, pos)?;
                let items = match items {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => {
                        return Err(eval_at(
                            format!("cannot iterate `{}`", to_text(&other)),
                            pos,
                        ))
                    }
                };
                for item in items {
                    scope.push();
                    scope.bind(var.clone(), item);
                    let result = run(body, scope, out);
                    scope.pop();
                    result?;
                }
            }
            Op::Let { name, expr, pos } => {
                let value = eval_slot(expr, scope, pos)?;
                scope.bind(name.clone(), value);
            }
            Op::Raise { kind, pos } => {
                return Err(match kind {
                    RaiseKind::IncludeSyntax(directive) => Error::IncludeSyntax {
                        directive: directive.clone(),
                        file: pos.file_owned(),
                        line: pos.line,
                    },
                    RaiseKind::Eval(message) => eval_at(message.clone(), pos),
                })
            }
        }
    }
    Ok(())
}

fn eval_slot(slot: &ExprSlot, scope: &Scope<'_>, pos: &Pos) -> Result<Value> {
    match slot {
        Ok(expr) => eval_expr(expr, scope, pos),
        Err(message) => Err(eval_at(message.clone(), pos)),
    }
}

fn eval_expr(expr: &Expr, scope: &Scope<'_>, pos: &Pos) -> Result<Value> {
    eval(expr, scope).map_err(|message| eval_at(message, pos))
}

fn eval_at(message: String, pos: &Pos) -> Error {
    Error::Eval {
        message,
        file: pos.file_owned(),
        line: Some(pos.line),
    }
}
