use crate::ast::{Context, FunctionRegistry, Value};
use crate::error::EvalError;
use calcfield_macros::formula_fn;

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function("SUM", sum);
    registry.register_function("AVG", avg);
    registry.register_function("COUNT", count);
    registry.register_function("MIN", min);
    registry.register_function("MAX", max);
    registry.register_function("ROUND", round);
    registry.register_function("ABS", abs);
}

/// Numbers among the flattened arguments; everything else is ignored.
fn numbers(args: &[Value]) -> Vec<f64> {
    Value::flatten(args)
        .iter()
        .filter_map(Value::as_number)
        .collect()
}

pub fn sum(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    Ok(Value::Number(numbers(args).iter().sum()))
}

pub fn avg(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    let values = numbers(args);
    if values.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(
        values.iter().sum::<f64>() / values.len() as f64,
    ))
}

/// Counts arguments that are neither null nor the empty string.
pub fn count(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    let present = Value::flatten(args)
        .iter()
        .filter(|value| !value.is_empty())
        .count();
    Ok(Value::Number(present as f64))
}

pub fn min(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::min)
        .map_or(Value::Null, Value::Number))
}

pub fn max(args: &[Value], _context: &Context) -> Result<Value, EvalError> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::max)
        .map_or(Value::Null, Value::Number))
}

/// Half-up rounding to `decimals` places (ties go towards +∞).
#[formula_fn]
fn round(value: f64, decimals: f64) -> Result<Value, EvalError> {
    let factor = 10f64.powi(decimals.trunc() as i32);
    Ok(Value::Number((value * factor + 0.5).floor() / factor))
}

#[formula_fn]
fn abs(value: f64) -> Result<Value, EvalError> {
    Ok(Value::Number(value.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(
        function: fn(&[Value], &Context) -> Result<Value, EvalError>,
        args: Vec<Value>,
    ) -> Value {
        function(&args, &Context::new()).unwrap()
    }

    #[test]
    fn test_sum_ignores_non_numbers_and_flattens() {
        let args = vec![
            Value::from(100.0),
            Value::from("20"),
            Value::Null,
            Value::Array(vec![Value::from(1.0), Value::from(2.0)]),
        ];
        assert_eq!(call(sum, args), Value::from(103.0));
        assert_eq!(call(sum, vec![]), Value::from(0.0));
    }

    #[test]
    fn test_avg() {
        assert_eq!(
            call(avg, vec![Value::from(2.0), Value::from(4.0), Value::from("x")]),
            Value::from(3.0)
        );
        assert_eq!(call(avg, vec![Value::from("x")]), Value::from(0.0));
    }

    #[test]
    fn test_count_skips_null_and_empty_text() {
        let args = vec![
            Value::from(0.0),
            Value::from(false),
            Value::from(""),
            Value::Null,
            Value::from("a"),
        ];
        assert_eq!(call(count, args), Value::from(3.0));
    }

    #[test]
    fn test_min_max() {
        let args = vec![Value::from(3.0), Value::from(-1.0), Value::from(7.0)];
        assert_eq!(call(min, args.clone()), Value::from(-1.0));
        assert_eq!(call(max, args), Value::from(7.0));
        assert_eq!(call(min, vec![]), Value::Null);
        assert_eq!(call(max, vec![Value::from("9")]), Value::Null);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(
            call(round, vec![Value::from(2.125), Value::from(2.0)]),
            Value::from(2.13)
        );
        assert_eq!(call(round, vec![Value::from(2.5)]), Value::from(3.0));
        assert_eq!(call(round, vec![Value::from(-2.5)]), Value::from(-2.0));
        assert_eq!(call(round, vec![Value::from(7.4)]), Value::from(7.0));
    }

    #[test]
    fn test_abs_tolerates_missing_argument() {
        assert_eq!(call(abs, vec![Value::from("-4")]), Value::from(4.0));
        assert_eq!(call(abs, vec![]), Value::from(0.0));
    }
}
