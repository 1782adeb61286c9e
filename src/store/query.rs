//! Store-level query description built by the engine. Field names are already checked
//! against the schema, so stores only interpret conditions.

use crate::registry::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

impl SortDirection {
    /// `ASC` / `DESC` in any case; anything else falls back to ascending.
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Case-insensitive substring.
    Contains(String),
    Equals(Value),
    /// Inclusive on both ends; a missing bound is open.
    Between { from: Option<Value>, to: Option<Value> },
    /// Array column holds this element.
    HasElement(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub field_type: FieldType,
    pub condition: Condition,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreQuery {
    /// Set membership on the identifier.
    pub ids: Option<Vec<Value>>,
    pub predicates: Vec<Predicate>,
    /// `None` orders by identifier ascending.
    pub order: Option<Order>,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StorePage {
    pub total: u64,
    pub rows: Vec<Value>,
}

/// Equality with numbers compared by value (`1` == `1.0`).
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Total order used for sorting and ranges: null < bool < number < string < other.
pub fn json_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_by_value() {
        assert!(json_eq(&json!(1), &json!(1.0)));
        assert!(!json_eq(&json!(1), &json!("1")));
        assert_eq!(json_cmp(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(json_cmp(&json!(null), &json!(0)), Ordering::Less);
        assert_eq!(json_cmp(&json!("b"), &json!("a")), Ordering::Greater);
    }

    #[test]
    fn direction_parsing_is_lenient() {
        assert_eq!(SortDirection::parse_lenient("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("sideways"), SortDirection::Asc);
    }
}
