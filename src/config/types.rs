//! Raw config types matching the JSON configuration document.

use crate::registry::{EntityHandle, FieldType, ForeignKey, RelationshipDescriptor};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_per_page")]
    pub default_per_page: u64,
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u64,
}

fn default_per_page() -> u64 {
    10
}

fn default_max_per_page() -> u64 {
    100
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

/// Flags and type given to fields that do not declare their own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDefaultsConfig {
    #[serde(default = "default_true")]
    pub is_editable: bool,
    #[serde(default = "default_true")]
    pub is_sortable: bool,
    #[serde(default = "default_true")]
    pub is_filtered: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: FieldType,
}

fn default_true() -> bool {
    true
}

fn default_field_type() -> FieldType {
    FieldType::String
}

impl Default for FieldDefaultsConfig {
    fn default() -> Self {
        FieldDefaultsConfig {
            is_editable: true,
            is_sortable: true,
            is_filtered: true,
            is_required: false,
            field_type: default_field_type(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceDefaultsConfig {
    #[serde(default = "default_true")]
    pub is_editable: bool,
    #[serde(default)]
    pub is_deletable: bool,
}

impl Default for ResourceDefaultsConfig {
    fn default() -> Self {
        ResourceDefaultsConfig {
            is_editable: true,
            is_deletable: false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub field: FieldDefaultsConfig,
    #[serde(default)]
    pub resource: ResourceDefaultsConfig,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldValidationsConfig {
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub is_unique: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type", default)]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub is_required: Option<bool>,
    /// Nested form `{"validations": {"is_required": true}}`; the flat flag wins when both are set.
    #[serde(default)]
    pub validations: Option<FieldValidationsConfig>,
    #[serde(default)]
    pub is_editable: Option<bool>,
    #[serde(default)]
    pub is_sortable: Option<bool>,
    #[serde(default)]
    pub is_filtered: Option<bool>,
    #[serde(default)]
    pub is_unique: Option<bool>,
    #[serde(default)]
    pub is_selected_dict: bool,
    #[serde(default)]
    pub selected_dict_id: Option<String>,
    #[serde(default, alias = "is_FK")]
    pub is_foreign_key: Option<bool>,
    #[serde(default, alias = "FK")]
    pub foreign_key: Option<ForeignKey>,
}

impl FieldConfig {
    pub fn required(&self) -> Option<bool> {
        self.is_required
            .or_else(|| self.validations.as_ref().and_then(|v| v.is_required))
    }

    pub fn unique(&self) -> Option<bool> {
        self.is_unique
            .or_else(|| self.validations.as_ref().and_then(|v| v.is_unique))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub entity: EntityHandle,
    #[serde(default)]
    pub is_editable: Option<bool>,
    #[serde(default)]
    pub is_deletable: Option<bool>,
    pub fields: IndexMap<String, FieldConfig>,
    #[serde(default)]
    pub relationships: IndexMap<String, RelationshipDescriptor>,
}

/// The whole configuration document, loaded once at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractConfig {
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default)]
    pub route_middleware: Vec<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
}

fn default_route_prefix() -> String {
    "api".into()
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

impl Default for ContractConfig {
    fn default() -> Self {
        ContractConfig {
            route_prefix: default_route_prefix(),
            route_middleware: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
            pagination: PaginationConfig::default(),
            defaults: DefaultsConfig::default(),
            models: IndexMap::new(),
        }
    }
}
