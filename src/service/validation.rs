//! Schema-driven payload validation. Rules are built per field from its descriptor and
//! evaluated all-or-nothing: any failing field rejects the whole request.

use crate::error::{AppError, ValidationErrors};
use crate::registry::{FieldDescriptor, FieldType, ResourceDescriptor, ScalarType};
use crate::service::cast::{cast_value, parse_truthy};
use crate::store::BackingStore;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Type check derived from a declared field type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeRule {
    Integer,
    Numeric,
    Boolean,
    Date,
    Json,
    Text,
    ArrayOf(ScalarType),
}

impl TypeRule {
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Integer => TypeRule::Integer,
            FieldType::Float => TypeRule::Numeric,
            FieldType::Boolean => TypeRule::Boolean,
            FieldType::Date => TypeRule::Date,
            FieldType::Json => TypeRule::Json,
            FieldType::String | FieldType::Text => TypeRule::Text,
            FieldType::Array(scalar) => TypeRule::ArrayOf(scalar),
        }
    }

    /// `Err` carries the message reported for `name`. Null always passes here;
    /// presence is a separate rule.
    pub fn check(self, name: &str, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        let ok = match self {
            TypeRule::Integer => is_integer(value),
            TypeRule::Numeric => is_numeric(value),
            TypeRule::Boolean => is_boolean(value),
            TypeRule::Date => value.as_str().is_some_and(is_date),
            TypeRule::Json => value.is_object() || value.is_array(),
            TypeRule::Text => !(value.is_object() || value.is_array()),
            TypeRule::ArrayOf(scalar) => {
                let Some(items) = value.as_array() else {
                    return Err(format!("The {} field must be an array.", name));
                };
                let element = TypeRule::for_type(FieldType::from(scalar));
                for (i, item) in items.iter().enumerate() {
                    if item.is_null() {
                        return Err(format!("The {}.{} field must not be null.", name, i));
                    }
                    element.check(&format!("{}.{}", name, i), item)?;
                }
                true
            }
        };
        if ok {
            Ok(())
        } else {
            Err(self.message(name))
        }
    }

    fn message(self, name: &str) -> String {
        match self {
            TypeRule::Integer => format!("The {} field must be an integer.", name),
            TypeRule::Numeric => format!("The {} field must be a number.", name),
            TypeRule::Boolean => format!("The {} field must be true or false.", name),
            TypeRule::Date => format!("The {} field must be a valid date.", name),
            TypeRule::Json => format!("The {} field must be an object or array.", name),
            TypeRule::Text => format!("The {} field must be a string.", name),
            TypeRule::ArrayOf(_) => format!("The {} field must be an array.", name),
        }
    }
}

fn is_integer(v: &Value) -> bool {
    match v {
        Value::Number(n) => n.is_i64() || n.as_f64().is_some_and(|f| f.fract() == 0.0 && f.abs() < 9.0e15),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_numeric(v: &Value) -> bool {
    match v {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn is_boolean(v: &Value) -> bool {
    match v {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0 | 1)),
        Value::String(s) => !s.trim().is_empty() && parse_truthy(s).is_some(),
        _ => false,
    }
}

fn is_date(s: &str) -> bool {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    /// Present, not null, not an empty string.
    Required,
    /// Absent or null ends the field's checks successfully.
    Nullable,
    Type(TypeRule),
    /// No other live entity holds the same (cast) value.
    Unique,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldRules {
    pub field: String,
    pub field_type: FieldType,
    pub rules: Vec<Rule>,
}

/// Which write the payload belongs to.
#[derive(Clone, Copy, Debug)]
pub enum WriteMode<'a> {
    Create,
    /// Update of the already resolved targets.
    Update { ids: &'a [Value] },
}

/// Rule lists for the fields that must be checked. On create a field is checked when it is
/// required or present (a required field with a default may be absent); on update only
/// present fields are checked.
pub fn build_rules(resource: &ResourceDescriptor, data: &Map<String, Value>, mode: WriteMode<'_>) -> Vec<FieldRules> {
    resource
        .data_fields()
        .filter_map(|field| {
            let present = data.contains_key(&field.name);
            let check = match mode {
                WriteMode::Create => present || (field.is_required && field.usable_default().is_none()),
                WriteMode::Update { .. } => present,
            };
            check.then(|| rules_for(field))
        })
        .collect()
}

fn rules_for(field: &FieldDescriptor) -> FieldRules {
    let mut rules = vec![if field.is_required { Rule::Required } else { Rule::Nullable }];
    rules.push(Rule::Type(TypeRule::for_type(field.field_type)));
    if field.is_unique {
        rules.push(Rule::Unique);
    }
    FieldRules {
        field: field.name.clone(),
        field_type: field.field_type,
        rules,
    }
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Validate `data` for a create or update. Collects every failing field, then rejects the
/// request as a whole with `AppError::Validation`.
pub async fn validate(
    store: &dyn BackingStore,
    resource: &ResourceDescriptor,
    data: &Map<String, Value>,
    mode: WriteMode<'_>,
) -> Result<(), AppError> {
    let mut errors = ValidationErrors::new();

    if let WriteMode::Create = mode {
        for key in data.keys() {
            if key == resource.primary_key() {
                errors.add(key, format!("The {} field is generated by the store.", key));
            } else if resource.field(key).is_none() {
                errors.add(key, format!("The {} field is not a declared field.", key));
            }
        }
    }

    for field_rules in build_rules(resource, data, mode) {
        let name = field_rules.field.as_str();
        let value = data.get(name);
        for rule in &field_rules.rules {
            match rule {
                Rule::Required => {
                    if is_blank(value) {
                        errors.add(name, format!("The {} field is required.", name));
                        break;
                    }
                }
                Rule::Nullable => {
                    if value.map_or(true, Value::is_null) {
                        break;
                    }
                }
                Rule::Type(type_rule) => {
                    if let Err(message) = type_rule.check(name, value.unwrap_or(&Value::Null)) {
                        errors.add(name, message);
                        break;
                    }
                }
                Rule::Unique => {
                    let Some(value) = value else { break };
                    let exclude: &[Value] = match mode {
                        WriteMode::Create => &[],
                        WriteMode::Update { ids } => {
                            if ids.len() > 1 {
                                errors.add(name, format!("The {} field must be unique and cannot be set on several entities at once.", name));
                                break;
                            }
                            ids
                        }
                    };
                    let cast = cast_value(field_rules.field_type, value.clone());
                    if store.exists(resource, name, &cast, exclude).await? {
                        errors.add(name, format!("The {} has already been taken.", name));
                    }
                }
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(alias = %resource.alias, fields = ?errors.fields().collect::<Vec<_>>(), "validation failed");
    }
    errors.into_result()
}
