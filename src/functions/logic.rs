use crate::ast::{Context, FunctionRegistry, Value};
use crate::error::EvalError;
use calcfield_macros::formula_fn;

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function("IF", if_);
    registry.register_function("AND", and);
    registry.register_function("OR", or);
    registry.register_function("NOT", not);
    registry.register_function("ISEMPTY", is_empty);
    registry.register_function("ISNUMBER", is_number);
    registry.register_function("COALESCE", coalesce);
}

/// Eager form of `IF` for callers invoking the registry directly. Formula
/// evaluation short-circuits `IF` before arguments are evaluated.
#[formula_fn]
fn if_(condition: bool, then: Value, otherwise: Value) -> Result<Value, EvalError> {
    Ok(if condition { then } else { otherwise })
}

pub fn and(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    Ok(Value::Boolean(args.iter().all(Value::is_truthy)))
}

pub fn or(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    Ok(Value::Boolean(args.iter().any(Value::is_truthy)))
}

#[formula_fn]
fn not(value: bool) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!value))
}

#[formula_fn]
fn is_empty(value: Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(value.is_empty()))
}

#[formula_fn]
fn is_number(value: Value) -> Result<Value, EvalError> {
    Ok(Value::Boolean(
        value.as_number().is_some_and(|n| !n.is_nan()),
    ))
}

/// First argument that is neither null nor the empty string.
pub fn coalesce(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    Ok(args
        .iter()
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or(Value::Null))
}
