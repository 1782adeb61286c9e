//! Field schema: the declarative unit describing one model attribute.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Element type of an array field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
    Text,
    Date,
}

impl ScalarType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
            ScalarType::Text => "text",
            ScalarType::Date => "date",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "string" => ScalarType::String,
            "integer" => ScalarType::Integer,
            "float" => ScalarType::Float,
            "boolean" => ScalarType::Boolean,
            "text" => ScalarType::Text,
            "date" => ScalarType::Date,
            _ => return None,
        })
    }
}

/// Declared type of a field. Closed set: config spellings outside it are rejected at load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Text,
    Date,
    Json,
    Array(ScalarType),
}

impl FieldType {
    pub fn is_textual(self) -> bool {
        matches!(self, FieldType::String | FieldType::Text)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

impl From<ScalarType> for FieldType {
    fn from(s: ScalarType) -> Self {
        match s {
            ScalarType::String => FieldType::String,
            ScalarType::Integer => FieldType::Integer,
            ScalarType::Float => FieldType::Float,
            ScalarType::Boolean => FieldType::Boolean,
            ScalarType::Text => FieldType::Text,
            ScalarType::Date => FieldType::Date,
        }
    }
}

impl FromStr for FieldType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if let Some(elem) = lower.strip_suffix("[]") {
            return ScalarType::parse(elem)
                .map(FieldType::Array)
                .ok_or_else(|| ConfigError::UnknownFieldType(s.to_string()));
        }
        if lower == "json" {
            return Ok(FieldType::Json);
        }
        ScalarType::parse(&lower)
            .map(FieldType::from)
            .ok_or_else(|| ConfigError::UnknownFieldType(s.to_string()))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Integer => f.write_str("integer"),
            FieldType::Float => f.write_str("float"),
            FieldType::Boolean => f.write_str("boolean"),
            FieldType::Text => f.write_str("text"),
            FieldType::Date => f.write_str("date"),
            FieldType::Json => f.write_str("json"),
            FieldType::Array(elem) => write!(f, "{}[]", elem.as_str()),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Relation label carried by a foreign-key descriptor. Never traversed by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
    MorphTo,
    MorphOne,
    MorphMany,
}

/// Weak reference to another alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(alias = "model_alias")]
    pub target_alias: String,
    #[serde(alias = "relation_type", default = "default_relation_kind")]
    pub relation_kind: RelationKind,
}

fn default_relation_kind() -> RelationKind {
    RelationKind::BelongsTo
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub default_value: Option<Value>,
    pub is_required: bool,
    pub is_editable: bool,
    pub is_sortable: bool,
    pub is_filtered: bool,
    pub is_unique: bool,
    pub is_selected_dict: bool,
    pub selected_dict_id: Option<String>,
    pub is_foreign_key: bool,
    pub foreign_key: Option<ForeignKey>,
}

impl FieldDescriptor {
    /// Field with the built-in defaults: editable, sortable, filterable, optional.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDescriptor {
            name: name.into(),
            field_type,
            default_value: None,
            is_required: false,
            is_editable: true,
            is_sortable: true,
            is_filtered: true,
            is_unique: false,
            is_selected_dict: false,
            selected_dict_id: None,
            is_foreign_key: false,
            foreign_key: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.is_editable = false;
        self
    }

    pub fn sortable(mut self, on: bool) -> Self {
        self.is_sortable = on;
        self
    }

    pub fn filtered(mut self, on: bool) -> Self {
        self.is_filtered = on;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn references(mut self, target_alias: impl Into<String>, relation_kind: RelationKind) -> Self {
        self.is_foreign_key = true;
        self.foreign_key = Some(ForeignKey {
            target_alias: target_alias.into(),
            relation_kind,
        });
        self
    }

    /// Default usable to satisfy a missing required field (null does not count).
    pub fn usable_default(&self) -> Option<&Value> {
        self.default_value.as_ref().filter(|v| !v.is_null())
    }
}

/// Targeted patch merged into an existing field by `Registry::update_field_config`.
/// `default_value: Some(Value::Null)` clears the default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldPatch {
    #[serde(default, rename = "type")]
    pub field_type: Option<FieldType>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub is_editable: Option<bool>,
    #[serde(default)]
    pub is_sortable: Option<bool>,
    #[serde(default)]
    pub is_filtered: Option<bool>,
    #[serde(default)]
    pub is_unique: Option<bool>,
    #[serde(default)]
    pub is_selected_dict: Option<bool>,
    #[serde(default)]
    pub selected_dict_id: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<ForeignKey>,
}

/// Keeps an explicit JSON `null` as `Some(Value::Null)` instead of collapsing it to `None`.
fn deserialize_present<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl FieldPatch {
    pub fn apply(&self, field: &mut FieldDescriptor) {
        if let Some(t) = self.field_type {
            field.field_type = t;
        }
        if let Some(v) = &self.default_value {
            field.default_value = if v.is_null() { None } else { Some(v.clone()) };
        }
        if let Some(b) = self.is_required {
            field.is_required = b;
        }
        if let Some(b) = self.is_editable {
            field.is_editable = b;
        }
        if let Some(b) = self.is_sortable {
            field.is_sortable = b;
        }
        if let Some(b) = self.is_filtered {
            field.is_filtered = b;
        }
        if let Some(b) = self.is_unique {
            field.is_unique = b;
        }
        if let Some(b) = self.is_selected_dict {
            field.is_selected_dict = b;
        }
        if let Some(id) = &self.selected_dict_id {
            field.selected_dict_id = Some(id.clone());
        }
        if let Some(fk) = &self.foreign_key {
            field.is_foreign_key = true;
            field.foreign_key = Some(fk.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_spellings() {
        assert_eq!("string".parse::<FieldType>().unwrap(), FieldType::String);
        assert_eq!("Integer".parse::<FieldType>().unwrap(), FieldType::Integer);
        assert_eq!("json".parse::<FieldType>().unwrap(), FieldType::Json);
        assert_eq!(
            "float[]".parse::<FieldType>().unwrap(),
            FieldType::Array(ScalarType::Float)
        );
        assert!("json[]".parse::<FieldType>().is_err());
        assert!("decimal".parse::<FieldType>().is_err());
    }

    #[test]
    fn display_matches_config_spelling() {
        for s in ["string", "integer", "float", "boolean", "text", "date", "json", "boolean[]", "date[]"] {
            assert_eq!(s.parse::<FieldType>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn foreign_key_accepts_original_keys() {
        let fk: ForeignKey =
            serde_json::from_value(serde_json::json!({"model_alias": "clients", "relation_type": "hasMany"})).unwrap();
        assert_eq!(fk.target_alias, "clients");
        assert_eq!(fk.relation_kind, RelationKind::HasMany);
    }

    #[test]
    fn patch_null_default_clears_it() {
        let mut field = FieldDescriptor::new("tags", FieldType::Array(ScalarType::String))
            .with_default(serde_json::json!([]));
        let patch: FieldPatch = serde_json::from_value(serde_json::json!({"default_value": null, "is_sortable": false})).unwrap();
        patch.apply(&mut field);
        assert_eq!(field.default_value, None);
        assert!(!field.is_sortable);
        assert!(field.is_filtered);
    }
}
