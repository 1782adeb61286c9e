//! Config validation: identifiers, foreign-key descriptors, defaults and pagination bounds.

use crate::config::ContractConfig;
use crate::error::ConfigError;
use crate::service::TypeRule;
use regex::Regex;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"));
static ALIAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static pattern"));

/// Storage identifiers (schema, table, column) are quoted into SQL, so only plain names are accepted.
pub fn check_identifier(name: &str) -> Result<(), ConfigError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(name.to_string()))
    }
}

pub fn validate(config: &ContractConfig) -> Result<(), ConfigError> {
    let pagination = &config.pagination;
    if pagination.max_per_page == 0 {
        return Err(ConfigError::Validation("pagination.max_per_page must be at least 1".into()));
    }
    if pagination.default_per_page == 0 || pagination.default_per_page > pagination.max_per_page {
        return Err(ConfigError::Validation(format!(
            "pagination.default_per_page must be within 1..={}",
            pagination.max_per_page
        )));
    }
    let prefix = config.route_prefix.trim_matches('/');
    if !prefix.is_empty() && !prefix.split('/').all(|seg| ALIAS.is_match(seg)) {
        return Err(ConfigError::Validation(format!("invalid route_prefix '{}'", config.route_prefix)));
    }

    for (alias, model) in &config.models {
        if !ALIAS.is_match(alias) {
            return Err(ConfigError::Validation(format!("invalid model alias '{}'", alias)));
        }
        let entity = &model.entity;
        if let Some(schema) = &entity.schema {
            check_identifier(schema)?;
        }
        check_identifier(&entity.table)?;
        check_identifier(&entity.primary_key)?;
        if let Some(col) = &entity.soft_delete_column {
            check_identifier(col)?;
        }
        if let Some(cast) = &entity.key_cast {
            check_identifier(cast)?;
        }
        if model.fields.is_empty() {
            return Err(ConfigError::Validation(format!("model '{}' declares no fields", alias)));
        }

        for (name, field) in &model.fields {
            check_identifier(name)?;
            if field.is_foreign_key == Some(true) && field.foreign_key.is_none() {
                return Err(ConfigError::MissingForeignKey {
                    alias: alias.clone(),
                    field: name.clone(),
                });
            }
            if let Some(default) = field.default_value.as_ref().filter(|v| !v.is_null()) {
                let field_type = field.field_type.unwrap_or(config.defaults.field.field_type);
                if let Err(message) = TypeRule::for_type(field_type).check(name, default) {
                    return Err(ConfigError::Validation(format!(
                        "model '{}': default_value: {}",
                        alias, message
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;

    #[test]
    fn rejects_unsafe_identifiers() {
        assert!(check_identifier("client_id").is_ok());
        assert!(check_identifier("_x9").is_ok());
        assert!(check_identifier("9lives").is_err());
        assert!(check_identifier("name\"; DROP TABLE x; --").is_err());
        assert!(check_identifier("").is_err());
    }

    #[test]
    fn rejects_foreign_key_flag_without_descriptor() {
        let config = load_from_str(
            r#"{"models": {"contracts": {"entity": {"table": "contracts"},
                "fields": {"client_id": {"type": "integer", "is_FK": true}}}}}"#,
        )
        .unwrap();
        assert!(matches!(validate(&config), Err(ConfigError::MissingForeignKey { .. })));
    }

    #[test]
    fn rejects_default_of_wrong_type() {
        let config = load_from_str(
            r#"{"models": {"contracts": {"entity": {"table": "contracts"},
                "fields": {"has_promo": {"type": "boolean", "default_value": "maybe"}}}}}"#,
        )
        .unwrap();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_default_page_above_ceiling() {
        let config = load_from_str(r#"{"pagination": {"default_per_page": 50, "max_per_page": 20}}"#).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_bad_table_name() {
        let config = load_from_str(
            r#"{"models": {"contracts": {"entity": {"table": "con tracts"},
                "fields": {"number": {}}}}}"#,
        )
        .unwrap();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidIdentifier(_))));
    }
}
