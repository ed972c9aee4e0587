//! The built-in filter table.
//!
//! Filters are pure transforms applied in pipelines: `<%=: expr | name arg %>`.
//! The set is closed; dispatch is a single match so a new filter is added in
//! exactly one place. Failures are plain messages; the renderer attaches the
//! failing instruction's source position.

use serde_json::Value;

use crate::value::{compare, from_f64, to_number, to_text};

/// Applies the named filter to `input` with the given (already evaluated)
/// arguments. Unknown names and type mismatches fail with a message.
pub fn apply(name: &str, input: Value, args: &[Value]) -> Result<Value, String> {
    match name {
        "first" => Ok(first(&input)),
        "last" => Ok(last(&input)),
        "downcase" => Ok(Value::String(to_text(&input).to_lowercase())),
        "upcase" => Ok(Value::String(to_text(&input).to_uppercase())),
        "capitalize" => Ok(Value::String(capitalize(&to_text(&input)))),
        "sort" => sort(input),
        "sort_by" => sort_by(input, arg(name, args, 0)?),
        "size" | "length" => Ok(size(&input)),
        "plus" => arithmetic(name, &input, arg(name, args, 0)?, |a, b| a + b),
        "minus" => arithmetic(name, &input, arg(name, args, 0)?, |a, b| a - b),
        "times" => arithmetic(name, &input, arg(name, args, 0)?, |a, b| a * b),
        "divided_by" => arithmetic(name, &input, arg(name, args, 0)?, |a, b| a / b),
        "join" => join(&input, args.first()),
        "truncate" => truncate(&input, arg(name, args, 0)?, args.get(1)),
        "replace" => replace(&input, arg(name, args, 0)?, args.get(1)),
        "truncate_words" => truncate_words(&input, arg(name, args, 0)?),
        "prepend" => Ok(prepend(input, arg(name, args, 0)?)),
        "append" => Ok(append(input, arg(name, args, 0)?)),
        "map" => map(input, arg(name, args, 0)?),
        "reverse" => Ok(reverse(input)),
        "get" => Ok(get(&input, arg(name, args, 0)?)),
        "json" => serde_json::to_string(&input)
            .map(Value::String)
            .map_err(|e| format!("json filter failed: {e}")),
        _ => Err(format!("unknown filter `{name}`")),
    }
}

/// Fetches a required argument or fails naming the filter.
fn arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a Value, String> {
    args.get(index)
        .ok_or_else(|| format!("filter `{name}` expects an argument"))
}

/// Coerces a length/count argument, rejecting negative and fractional values.
fn count_arg(name: &str, value: &Value) -> Result<usize, String> {
    let n = to_number(value)
        .ok_or_else(|| format!("filter `{name}` expects a numeric count"))?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(format!(
            "filter `{name}` expects a non-negative whole count, got `{}`",
            to_text(value)
        ));
    }
    Ok(n as usize)
}

fn first(input: &Value) -> Value {
    match input {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .next()
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn last(input: &Value) -> Value {
    match input {
        Value::Array(items) => items.last().cloned().unwrap_or(Value::Null),
        Value::String(s) => s
            .chars()
            .next_back()
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Default sort is by text form, matching script-language array sort.
fn sort(input: Value) -> Result<Value, String> {
    let Value::Array(mut items) = input else {
        return Err("filter `sort` expects an array".to_string());
    };
    items.sort_by_key(|v| to_text(v));
    Ok(Value::Array(items))
}

fn sort_by(input: Value, key: &Value) -> Result<Value, String> {
    let Value::Array(mut items) = input else {
        return Err("filter `sort_by` expects an array".to_string());
    };
    let key = to_text(key);
    items.sort_by(|a, b| {
        let a = member(a, &key);
        let b = member(b, &key);
        compare(&a, &b).unwrap_or_else(|| to_text(&a).cmp(&to_text(&b)))
    });
    Ok(Value::Array(items))
}

fn size(input: &Value) -> Value {
    match input {
        Value::Array(items) => Value::from(items.len()),
        Value::String(s) => Value::from(s.chars().count()),
        Value::Object(map) => Value::from(map.len()),
        _ => Value::Null,
    }
}

fn arithmetic(
    name: &str,
    input: &Value,
    operand: &Value,
    op: fn(f64, f64) -> f64,
) -> Result<Value, String> {
    let a = to_number(input)
        .ok_or_else(|| format!("filter `{name}`: `{}` is not a number", to_text(input)))?;
    let b = to_number(operand)
        .ok_or_else(|| format!("filter `{name}`: `{}` is not a number", to_text(operand)))?;
    from_f64(op(a, b)).ok_or_else(|| format!("filter `{name}` produced a non-finite number"))
}

fn join(input: &Value, separator: Option<&Value>) -> Result<Value, String> {
    let Value::Array(items) = input else {
        return Err("filter `join` expects an array".to_string());
    };
    let separator = separator.map(to_text).unwrap_or_else(|| ", ".to_string());
    let joined = items.iter().map(to_text).collect::<Vec<_>>().join(&separator);
    Ok(Value::String(joined))
}

fn truncate(input: &Value, len: &Value, append: Option<&Value>) -> Result<Value, String> {
    let len = count_arg("truncate", len)?;
    let text = to_text(input);
    if text.chars().count() <= len {
        return Ok(Value::String(text));
    }
    let mut out: String = text.chars().take(len).collect();
    if let Some(suffix) = append {
        out.push_str(&to_text(suffix));
    }
    Ok(Value::String(out))
}

/// Replaces the first literal occurrence of `pattern`.
fn replace(input: &Value, pattern: &Value, substitution: Option<&Value>) -> Result<Value, String> {
    let pattern = to_text(pattern);
    let substitution = substitution.map(to_text).unwrap_or_default();
    Ok(Value::String(
        to_text(input).replacen(&pattern, &substitution, 1),
    ))
}

fn truncate_words(input: &Value, count: &Value) -> Result<Value, String> {
    let count = count_arg("truncate_words", count)?;
    let text = to_text(input);
    let words: Vec<&str> = text.split_whitespace().take(count).collect();
    Ok(Value::String(words.join(" ")))
}

fn prepend(input: Value, value: &Value) -> Value {
    match input {
        Value::Array(items) => {
            let mut out = vec![value.clone()];
            out.extend(items);
            Value::Array(out)
        }
        other => Value::String(format!("{}{}", to_text(value), to_text(&other))),
    }
}

fn append(input: Value, value: &Value) -> Value {
    match input {
        Value::Array(mut items) => {
            items.push(value.clone());
            Value::Array(items)
        }
        other => Value::String(format!("{}{}", to_text(&other), to_text(value))),
    }
}

fn map(input: Value, key: &Value) -> Result<Value, String> {
    let Value::Array(items) = input else {
        return Err("filter `map` expects an array".to_string());
    };
    let key = to_text(key);
    Ok(Value::Array(
        items.iter().map(|item| member(item, &key)).collect(),
    ))
}

fn reverse(input: Value) -> Value {
    match input {
        Value::Array(mut items) => {
            items.reverse();
            Value::Array(items)
        }
        other => Value::String(to_text(&other).chars().rev().collect()),
    }
}

fn get(input: &Value, key: &Value) -> Value {
    member(input, &to_text(key))
}

/// Member lookup usable on objects and (by numeric key) arrays.
fn member(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
        Value::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
