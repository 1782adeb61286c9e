//! Convert serde_json::Value to types that sqlx can bind.

use crate::registry::{FieldType, ScalarType};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query. Each variant reports its own wire type,
/// so placeholders only need a cast where the column type differs.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
    TextArray(Vec<String>),
    I64Array(Vec<i64>),
    F64Array(Vec<f64>),
    BoolArray(Vec<bool>),
}

impl PgBindValue {
    /// Shape-driven conversion for values with no declared type.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PgBindValue::I64(i),
                None => PgBindValue::F64(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    /// Conversion for an already cast value of a declared field type.
    pub fn for_type(field_type: FieldType, v: &Value) -> Self {
        if v.is_null() {
            return PgBindValue::Null;
        }
        match field_type {
            FieldType::Integer => v.as_i64().map(PgBindValue::I64).unwrap_or_else(|| Self::from_json(v)),
            FieldType::Float => v.as_f64().map(PgBindValue::F64).unwrap_or_else(|| Self::from_json(v)),
            FieldType::Boolean => v.as_bool().map(PgBindValue::Bool).unwrap_or_else(|| Self::from_json(v)),
            FieldType::String | FieldType::Text | FieldType::Date => PgBindValue::String(text_of(v)),
            FieldType::Json => PgBindValue::Json(v.clone()),
            FieldType::Array(scalar) => {
                let items = v.as_array().map(Vec::as_slice).unwrap_or_default();
                match scalar {
                    ScalarType::Integer => PgBindValue::I64Array(items.iter().filter_map(Value::as_i64).collect()),
                    ScalarType::Float => PgBindValue::F64Array(items.iter().filter_map(Value::as_f64).collect()),
                    ScalarType::Boolean => PgBindValue::BoolArray(items.iter().filter_map(Value::as_bool).collect()),
                    ScalarType::String | ScalarType::Text | ScalarType::Date => {
                        PgBindValue::TextArray(items.iter().map(text_of).collect())
                    }
                }
            }
        }
    }
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
            PgBindValue::TextArray(v) => <Vec<String> as Encode<Postgres>>::encode_by_ref(v, buf)?,
            PgBindValue::I64Array(v) => <Vec<i64> as Encode<Postgres>>::encode_by_ref(v, buf)?,
            PgBindValue::F64Array(v) => <Vec<f64> as Encode<Postgres>>::encode_by_ref(v, buf)?,
            PgBindValue::BoolArray(v) => <Vec<bool> as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
            PgBindValue::TextArray(_) => <Vec<String> as Type<Postgres>>::type_info(),
            PgBindValue::I64Array(_) => <Vec<i64> as Type<Postgres>>::type_info(),
            PgBindValue::F64Array(_) => <Vec<f64> as Type<Postgres>>::type_info(),
            PgBindValue::BoolArray(_) => <Vec<bool> as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declared_type_drives_conversion() {
        assert_eq!(PgBindValue::for_type(FieldType::Integer, &json!(42)), PgBindValue::I64(42));
        assert_eq!(PgBindValue::for_type(FieldType::Float, &json!(2)), PgBindValue::F64(2.0));
        assert_eq!(
            PgBindValue::for_type(FieldType::Date, &json!("2024-01-02")),
            PgBindValue::String("2024-01-02".into())
        );
        assert_eq!(
            PgBindValue::for_type(FieldType::Json, &json!([1, 2])),
            PgBindValue::Json(json!([1, 2]))
        );
        assert_eq!(
            PgBindValue::for_type(FieldType::Array(ScalarType::Integer), &json!([1, 2])),
            PgBindValue::I64Array(vec![1, 2])
        );
        assert_eq!(PgBindValue::for_type(FieldType::Integer, &Value::Null), PgBindValue::Null);
    }

    #[test]
    fn untyped_values_follow_json_shape() {
        assert_eq!(PgBindValue::from_json(&json!(1.5)), PgBindValue::F64(1.5));
        assert_eq!(PgBindValue::from_json(&json!({"a": 1})), PgBindValue::Json(json!({"a": 1})));
    }
}
