//! Post-validation coercion of payload values to their canonical JSON shape.

use crate::registry::FieldType;
use serde_json::{Number, Value};

/// `true/1/yes/on` and `false/0/no/off/""`, case-insensitive.
pub fn parse_truthy(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Coerce a value that already passed the type rule. Null stays null; anything the
/// declared type cannot represent is returned unchanged.
pub fn cast_value(field_type: FieldType, value: Value) -> Value {
    if value.is_null() {
        return value;
    }
    match field_type {
        FieldType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => value,
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Value::from(f as i64),
                _ => value,
            },
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).unwrap_or(value),
            Value::Bool(b) => Value::from(i64::from(*b)),
            _ => value,
        },
        FieldType::Float => match &value {
            Value::Number(n) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(value),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(value),
            _ => value,
        },
        FieldType::Boolean => match &value {
            Value::Bool(_) => value,
            Value::Number(n) => match n.as_i64() {
                Some(0) => Value::Bool(false),
                Some(1) => Value::Bool(true),
                _ => value,
            },
            Value::String(s) => parse_truthy(s).map(Value::Bool).unwrap_or(value),
            _ => value,
        },
        FieldType::String | FieldType::Text => match value {
            Value::String(_) => value,
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            other => other,
        },
        FieldType::Date | FieldType::Json => value,
        FieldType::Array(scalar) => match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| cast_value(FieldType::from(scalar), item))
                    .collect(),
            ),
            other => other,
        },
    }
}
