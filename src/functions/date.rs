use crate::ast::{FunctionRegistry, Value};
use crate::error::EvalError;
use calcfield_macros::formula_fn;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

pub fn register(registry: &mut FunctionRegistry) {
    registry.register_function("NOW", now);
    registry.register_function("TODAY", today);
    registry.register_function("YEAR", year);
    registry.register_function("MONTH", month);
    registry.register_function("DAY", day);
    registry.register_function("DATEADD", date_add);
    registry.register_function("DATEDIFF", date_diff);
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Reads a date argument. Text may be RFC 3339, a naive timestamp (taken as
/// UTC) or a plain `YYYY-MM-DD` date; numbers are milliseconds since the
/// Unix epoch. Anything else is not a date.
fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(millis) if millis.is_finite() => {
            DateTime::from_timestamp_millis(*millis as i64)
        }
        Value::Text(text) => {
            let text = text.trim();
            if let Ok(date) = DateTime::parse_from_rfc3339(text) {
                return Some(date.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

fn iso_timestamp(date: DateTime<Utc>) -> Value {
    Value::Text(date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Current instant as an ISO-8601 UTC timestamp with millisecond precision.
#[formula_fn]
fn now() -> Result<Value, EvalError> {
    Ok(iso_timestamp(Utc::now()))
}

/// Current UTC date as `YYYY-MM-DD`.
#[formula_fn]
fn today() -> Result<Value, EvalError> {
    Ok(Value::Text(Utc::now().date_naive().to_string()))
}

#[formula_fn]
fn year(date: Value) -> Result<Value, EvalError> {
    Ok(parse_date(&date).map_or(Value::Null, |d| Value::Number(d.year() as f64)))
}

#[formula_fn]
fn month(date: Value) -> Result<Value, EvalError> {
    Ok(parse_date(&date).map_or(Value::Null, |d| Value::Number(d.month() as f64)))
}

#[formula_fn]
fn day(date: Value) -> Result<Value, EvalError> {
    Ok(parse_date(&date).map_or(Value::Null, |d| Value::Number(d.day() as f64)))
}

fn shift_months(date: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// `DATEADD(date, amount, unit)` for the units `days`, `months` and `years`.
/// Month arithmetic clamps to the last day of the target month. An unknown
/// unit leaves the date unchanged.
#[formula_fn]
fn date_add(date: Value, amount: f64, unit: String) -> Result<Value, EvalError> {
    let Some(date) = parse_date(&date) else {
        return Ok(Value::Null);
    };
    if !amount.is_finite() {
        return Ok(Value::Null);
    }

    let shifted = match unit.trim().to_lowercase().as_str() {
        "days" | "day" => {
            Duration::try_milliseconds((amount * 86_400_000.0) as i64)
                .and_then(|delta| date.checked_add_signed(delta))
        }
        "months" | "month" => shift_months(date, amount.trunc() as i64),
        "years" | "year" => (amount.trunc() as i64)
            .checked_mul(12)
            .and_then(|months| shift_months(date, months)),
        _ => Some(date),
    };
    Ok(shifted.map_or(Value::Null, iso_timestamp))
}

/// `DATEDIFF(date1, date2, unit)`: `date2 - date1` in whole `days`, `hours`
/// or `minutes` (floored). Any other unit yields raw milliseconds.
#[formula_fn]
fn date_diff(first: Value, second: Value, unit: String) -> Result<Value, EvalError> {
    let (Some(first), Some(second)) = (parse_date(&first), parse_date(&second)) else {
        return Ok(Value::Null);
    };
    let millis = (second - first).num_milliseconds() as f64;

    let per_unit = match unit.trim().to_lowercase().as_str() {
        "days" | "day" => 86_400_000.0,
        "hours" | "hour" => 3_600_000.0,
        "minutes" | "minute" => 60_000.0,
        _ => return Ok(Value::Number(millis)),
    };
    Ok(Value::Number((millis / per_unit).floor()))
}
