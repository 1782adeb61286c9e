//! Load config from a JSON document and resolve it into settings + registry.

use crate::config::resolved::{ApiSettings, PaginationSettings, ResolvedContract};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use crate::registry::{FieldDescriptor, Registry, ResourceDefaults, ResourceDescriptor};
use std::path::Path;
use std::sync::Arc;

pub const ENV_ROUTE_PREFIX: &str = "MODEL_CONTRACT_ROUTE_PREFIX";
pub const ENV_DEFAULT_PER_PAGE: &str = "MODEL_CONTRACT_DEFAULT_PER_PAGE";
pub const ENV_MAX_PER_PAGE: &str = "MODEL_CONTRACT_MAX_PER_PAGE";

pub fn load_from_str(json: &str) -> Result<ContractConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and parse the config file, then apply environment overrides.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<ContractConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let mut config = load_from_str(&raw)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

pub fn apply_env_overrides(config: &mut ContractConfig) -> Result<(), ConfigError> {
    if let Ok(prefix) = std::env::var(ENV_ROUTE_PREFIX) {
        config.route_prefix = prefix;
    }
    if let Ok(v) = std::env::var(ENV_DEFAULT_PER_PAGE) {
        config.pagination.default_per_page = parse_env_number(ENV_DEFAULT_PER_PAGE, &v)?;
    }
    if let Ok(v) = std::env::var(ENV_MAX_PER_PAGE) {
        config.pagination.max_per_page = parse_env_number(ENV_MAX_PER_PAGE, &v)?;
    }
    Ok(())
}

fn parse_env_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Load(format!("{} must be a positive integer, got '{}'", key, value)))
}

/// Validate the document and build the registry (call once at startup).
pub fn resolve(config: &ContractConfig) -> Result<ResolvedContract, ConfigError> {
    validate(config)?;

    let resource_defaults = ResourceDefaults {
        is_editable: config.defaults.resource.is_editable,
        is_deletable: config.defaults.resource.is_deletable,
    };
    let registry = Registry::with_defaults(resource_defaults);

    for (alias, model) in &config.models {
        let fields = model
            .fields
            .iter()
            .map(|(name, field)| build_field(name, field, &config.defaults.field))
            .collect();
        let descriptor = ResourceDescriptor::new(alias.clone(), model.entity.clone(), fields)
            .with_relationships(model.relationships.clone())
            .editable(model.is_editable.unwrap_or(resource_defaults.is_editable))
            .deletable(model.is_deletable.unwrap_or(resource_defaults.is_deletable));
        registry.register_descriptor(descriptor);
    }

    for (alias, field, target) in registry.dangling_foreign_keys() {
        tracing::warn!(%alias, %field, %target, "foreign key targets an unregistered alias");
    }

    let settings = ApiSettings {
        route_prefix: config.route_prefix.trim_matches('/').to_string(),
        route_middleware: config.route_middleware.clone(),
        max_body_bytes: config.max_body_bytes,
        pagination: PaginationSettings {
            default_per_page: config.pagination.default_per_page,
            max_per_page: config.pagination.max_per_page,
        },
    };

    Ok(ResolvedContract {
        settings,
        registry: Arc::new(registry),
    })
}

fn build_field(name: &str, field: &FieldConfig, defaults: &FieldDefaultsConfig) -> FieldDescriptor {
    let is_foreign_key = field.is_foreign_key.unwrap_or(field.foreign_key.is_some());
    FieldDescriptor {
        name: name.to_string(),
        field_type: field.field_type.unwrap_or(defaults.field_type),
        default_value: field.default_value.clone().filter(|v| !v.is_null()),
        is_required: field.required().unwrap_or(defaults.is_required),
        is_editable: field.is_editable.unwrap_or(defaults.is_editable),
        is_sortable: field.is_sortable.unwrap_or(defaults.is_sortable),
        is_filtered: field.is_filtered.unwrap_or(defaults.is_filtered),
        is_unique: field.unique().unwrap_or(false),
        is_selected_dict: field.is_selected_dict,
        selected_dict_id: field.selected_dict_id.clone(),
        is_foreign_key,
        foreign_key: if is_foreign_key { field.foreign_key.clone() } else { None },
    }
}
