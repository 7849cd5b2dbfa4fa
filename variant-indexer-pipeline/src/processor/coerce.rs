//! Typed coercion of raw annotation text.

use serde_json::{Number, Value};

use crate::errors::TransformError;
use crate::schema::FieldDatatype;

/// Coerce a raw value to a field's datatype.
///
/// Numeric values containing `,` become arrays whose `.` and NaN elements are
/// dropped. A scalar `.` or NaN yields `None` so the field is left out of the
/// document. Text values are kept whole.
pub fn coerce(field: &str, raw: &str, datatype: FieldDatatype) -> Result<Option<Value>, TransformError> {
    if is_missing(raw) {
        return Ok(None);
    }

    match datatype {
        FieldDatatype::Integer if raw.contains(',') => {
            let mut values = Vec::new();
            for element in raw.split(',').filter(|e| !is_missing(e)) {
                values.push(Value::from(parse_integer(field, element)?));
            }
            Ok(non_empty(values))
        }
        FieldDatatype::Integer => Ok(Some(Value::from(parse_integer(field, raw)?))),
        FieldDatatype::Float if raw.contains(',') => {
            let mut values = Vec::new();
            for element in raw.split(',').filter(|e| !is_missing(e)) {
                if let Some(number) = parse_float(field, element)? {
                    values.push(Value::Number(number));
                }
            }
            Ok(non_empty(values))
        }
        FieldDatatype::Float => Ok(parse_float(field, raw)?.map(Value::Number)),
        FieldDatatype::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(Value::Bool(true))),
            "false" | "0" | "no" => Ok(Some(Value::Bool(false))),
            _ => Err(TransformError::invalid_boolean(field, raw)),
        },
        FieldDatatype::Keyword | FieldDatatype::Text | FieldDatatype::Nested => {
            Ok(Some(Value::String(raw.to_string())))
        }
    }
}

fn is_missing(raw: &str) -> bool {
    raw.is_empty() || raw == "." || raw.eq_ignore_ascii_case("nan")
}

fn non_empty(values: Vec<Value>) -> Option<Value> {
    (!values.is_empty()).then_some(Value::Array(values))
}

fn parse_integer(field: &str, raw: &str) -> Result<i64, TransformError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| TransformError::invalid_integer(field, raw))
}

/// Parse a float; NaN and infinities have no JSON form and yield `None`.
fn parse_float(field: &str, raw: &str) -> Result<Option<Number>, TransformError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| TransformError::invalid_float(field, raw))?;
    Ok(Number::from_f64(value))
}
