//! Tree-walking evaluator for the expression language.

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::value::{compare, from_f64, loose_eq, to_number, to_text, truthy};

use super::{BinaryOp, Expr, UnaryOp};

/// The data an expression evaluates against: a root value whose members are
/// addressable by bare identifiers, plus a stack of local binding frames for
/// loop variables, `let` bindings, and the include `self` binding.
pub struct Scope<'a> {
    root: &'a Value,
    locals: Vec<FxHashMap<String, Value>>,
}

impl<'a> Scope<'a> {
    /// Creates a scope over the caller-supplied data with one empty local
    /// frame for top-level `let` bindings.
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            locals: vec![FxHashMap::default()],
        }
    }

    /// Opens a local frame. Every `push` is paired with a `pop`.
    pub fn push(&mut self) {
        self.locals.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        self.locals.pop();
    }

    /// Binds a name in the innermost frame.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.locals.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Resolves a bare identifier: innermost local frame first, then the
    /// root value's members.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        for frame in self.locals.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value);
            }
        }
        self.root.get(name)
    }
}

/// Evaluates an expression against a scope.
pub fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, String> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => {
            from_f64(*n).ok_or_else(|| "non-finite number literal".to_string())
        }
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Ident(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| format!("`{name}` is not defined")),
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), eval(value, scope)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Member(base, name) => member(&eval(base, scope)?, name),
        Expr::Index(base, index) => {
            let base = eval(base, scope)?;
            let index = eval(index, scope)?;
            indexed(&base, &index)
        }
        Expr::Unary(op, operand) => unary(*op, &eval(operand, scope)?),
        Expr::Binary(op, left, right) => binary(*op, left, right, scope),
    }
}

fn member(base: &Value, name: &str) -> Result<Value, String> {
    match base {
        Value::Null => Err(format!("cannot read `{name}` of null")),
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Array(items) if name == "length" => Ok(Value::from(items.len())),
        Value::String(s) if name == "length" => Ok(Value::from(s.chars().count())),
        _ => Ok(Value::Null),
    }
}

fn indexed(base: &Value, index: &Value) -> Result<Value, String> {
    match base {
        Value::Null => Err("cannot index null".to_string()),
        Value::Array(items) => {
            let i = to_number(index).ok_or("array index is not a number")?;
            Ok(as_index(i)
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null))
        }
        Value::Object(map) => Ok(map
            .get(&to_text(index))
            .cloned()
            .unwrap_or(Value::Null)),
        Value::String(s) => {
            let i = to_number(index).ok_or("string index is not a number")?;
            Ok(as_index(i)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null))
        }
        _ => Ok(Value::Null),
    }
}

/// Positional indexes must be non-negative whole numbers; anything else
/// addresses no element.
fn as_index(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, String> {
    match op {
        UnaryOp::Neg => {
            let n = to_number(operand)
                .ok_or_else(|| format!("cannot negate `{}`", to_text(operand)))?;
            from_f64(-n).ok_or_else(|| "negation produced a non-finite number".to_string())
        }
        UnaryOp::Not => Ok(Value::Bool(!truthy(operand))),
    }
}

fn binary(op: BinaryOp, left: &Expr, right: &Expr, scope: &Scope<'_>) -> Result<Value, String> {
    // Logical operators short-circuit and yield an operand, not a boolean.
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let lhs = eval(left, scope)?;
        let take_right = match op {
            BinaryOp::And => truthy(&lhs),
            _ => !truthy(&lhs),
        };
        return if take_right { eval(right, scope) } else { Ok(lhs) };
    }

    let lhs = eval(left, scope)?;
    let rhs = eval(right, scope)?;
    match op {
        BinaryOp::Add => add(&lhs, &rhs),
        BinaryOp::Sub => numeric(op, &lhs, &rhs, |a, b| a - b),
        BinaryOp::Mul => numeric(op, &lhs, &rhs, |a, b| a * b),
        BinaryOp::Div => numeric(op, &lhs, &rhs, |a, b| a / b),
        BinaryOp::Rem => numeric(op, &lhs, &rhs, |a, b| a % b),
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&lhs, &rhs).ok_or_else(|| {
                format!(
                    "cannot compare `{}` with `{}`",
                    to_text(&lhs),
                    to_text(&rhs)
                )
            })?;
            let holds = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(holds))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// `+` concatenates when either side is a string, otherwise adds numbers.
fn add(lhs: &Value, rhs: &Value) -> Result<Value, String> {
    if lhs.is_string() || rhs.is_string() {
        return Ok(Value::String(format!("{}{}", to_text(lhs), to_text(rhs))));
    }
    numeric(BinaryOp::Add, lhs, rhs, |a, b| a + b)
}

fn numeric(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
    apply: fn(f64, f64) -> f64,
) -> Result<Value, String> {
    let a = to_number(lhs).ok_or_else(|| format!("`{}` is not a number", to_text(lhs)))?;
    let b = to_number(rhs).ok_or_else(|| format!("`{}` is not a number", to_text(rhs)))?;
    from_f64(apply(a, b)).ok_or_else(|| format!("{op:?} produced a non-finite number"))
}
