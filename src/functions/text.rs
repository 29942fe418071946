use crate::ast::{Context, FunctionRegistry, Value};
use crate::error::EvalError;
use calcfield_macros::formula_fn;
use regex::Regex;

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function("CONCAT", concat);
    registry.register_function("UPPER", upper);
    registry.register_function("LOWER", lower);
    registry.register_function("TRIM", trim);
    registry.register_function("LEN", len);
    registry.register_function("LEFT", left);
    registry.register_function("RIGHT", right);
    registry.register_function("MID", mid);
    registry.register_function("REPLACE", replace);
}

/// Character count argument: truncated, negative counts become zero.
fn char_count(n: f64) -> usize {
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        n.trunc() as usize
    }
}

pub fn concat(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    Ok(Value::Text(
        Value::flatten(args).iter().map(Value::to_text).collect(),
    ))
}

#[formula_fn]
fn upper(text: String) -> Result<Value, EvalError> {
    Ok(Value::Text(text.to_uppercase()))
}

#[formula_fn]
fn lower(text: String) -> Result<Value, EvalError> {
    Ok(Value::Text(text.to_lowercase()))
}

#[formula_fn]
fn trim(text: String) -> Result<Value, EvalError> {
    Ok(Value::Text(text.trim().to_string()))
}

#[formula_fn]
fn len(text: String) -> Result<Value, EvalError> {
    Ok(Value::Number(text.chars().count() as f64))
}

/// `LEFT(text, count)`; count defaults to one character.
#[formula_fn]
fn left(text: String, count: Option<f64>) -> Result<Value, EvalError> {
    let count = char_count(count.unwrap_or(1.0));
    Ok(Value::Text(text.chars().take(count).collect()))
}

/// `RIGHT(text, count)`; count defaults to one character.
#[formula_fn]
fn right(text: String, count: Option<f64>) -> Result<Value, EvalError> {
    let count = char_count(count.unwrap_or(1.0));
    let total = text.chars().count();
    Ok(Value::Text(
        text.chars().skip(total.saturating_sub(count)).collect(),
    ))
}

/// `MID(text, start, length)` with a 1-based start. Without a length the
/// rest of the text is returned.
#[formula_fn]
fn mid(text: String, start: f64, length: Option<f64>) -> Result<Value, EvalError> {
    let skip = char_count(start).saturating_sub(1);
    let chars = text.chars().skip(skip);
    let result = match length {
        Some(length) => chars.take(char_count(length)).collect(),
        None => chars.collect(),
    };
    Ok(Value::Text(result))
}

/// `REPLACE(text, pattern, replacement)` replaces every match of `pattern`.
/// A pattern that is not a valid regular expression is matched literally.
#[formula_fn]
fn replace(text: String, pattern: String, replacement: String) -> Result<Value, EvalError> {
    if pattern.is_empty() {
        return Ok(Value::Text(text));
    }
    let regex = Regex::new(&pattern)
        .or_else(|_| Regex::new(&regex::escape(&pattern)))
        .map_err(|e| EvalError::Function {
            name: "REPLACE".to_string(),
            message: e.to_string(),
        })?;
    Ok(Value::Text(
        regex.replace_all(&text, replacement.as_str()).into_owned(),
    ))
}
