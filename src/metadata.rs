//! Client-facing projection of registry state. Pure: every call reads the current snapshot.

use crate::error::AppError;
use crate::registry::{FieldDescriptor, FieldType, Registry, RelationKind, ResourceDescriptor};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceMetadata {
    pub model_alias: String,
    pub entity: EntityMetadata,
    pub is_editable: bool,
    pub is_deletable: bool,
    pub fields: Vec<FieldMetadata>,
    pub relationships: IndexMap<String, RelationshipMetadata>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityMetadata {
    pub schema: Option<String>,
    pub table: String,
    pub primary_key: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldValidations {
    pub is_required: bool,
    pub is_unique: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub default_value: Option<Value>,
    pub validations: FieldValidations,
    pub is_editable: bool,
    pub is_sortable: bool,
    pub is_filtered: bool,
    pub is_selected_dict: bool,
    pub selected_dict_id: Option<String>,
    pub is_foreign_key: bool,
    pub foreign_key: Option<ForeignKeyMetadata>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForeignKeyMetadata {
    pub target_alias: String,
    pub relation_kind: RelationKind,
    /// False when the target alias is not registered (dangling reference).
    pub target_registered: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RelationshipMetadata {
    pub relation_kind: RelationKind,
    pub target_alias: String,
    pub foreign_key: Option<String>,
    pub local_key: Option<String>,
}

pub struct MetadataService {
    registry: Arc<Registry>,
}

impl MetadataService {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn describe(&self, alias: &str) -> Result<ResourceMetadata, AppError> {
        let resource = self.registry.resolve(alias)?;
        Ok(self.render(&resource))
    }

    pub fn describe_field(&self, alias: &str, field: &str) -> Result<FieldMetadata, AppError> {
        let resource = self.registry.resolve(alias)?;
        let descriptor = resource
            .field(field)
            .ok_or_else(|| AppError::NotFound(format!("Field '{}' not found in model '{}'", field, alias)))?;
        Ok(self.render_field(descriptor))
    }

    fn render(&self, resource: &ResourceDescriptor) -> ResourceMetadata {
        ResourceMetadata {
            model_alias: resource.alias.clone(),
            entity: EntityMetadata {
                schema: resource.entity.schema.clone(),
                table: resource.entity.table.clone(),
                primary_key: resource.entity.primary_key.clone(),
            },
            is_editable: resource.is_editable,
            is_deletable: resource.is_deletable,
            fields: resource.fields.values().map(|f| self.render_field(f)).collect(),
            relationships: resource
                .relationships
                .iter()
                .map(|(name, rel)| {
                    (
                        name.clone(),
                        RelationshipMetadata {
                            relation_kind: rel.relation_kind,
                            target_alias: rel.target_alias.clone(),
                            foreign_key: rel.foreign_key.clone(),
                            local_key: rel.local_key.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    fn render_field(&self, field: &FieldDescriptor) -> FieldMetadata {
        FieldMetadata {
            name: field.name.clone(),
            field_type: field.field_type,
            default_value: field.default_value.clone(),
            validations: FieldValidations {
                is_required: field.is_required,
                is_unique: field.is_unique,
            },
            is_editable: field.is_editable,
            is_sortable: field.is_sortable,
            is_filtered: field.is_filtered,
            is_selected_dict: field.is_selected_dict,
            selected_dict_id: field.selected_dict_id.clone(),
            is_foreign_key: field.is_foreign_key,
            foreign_key: field.foreign_key.as_ref().map(|fk| ForeignKeyMetadata {
                target_alias: fk.target_alias.clone(),
                relation_kind: fk.relation_kind,
                target_registered: self.registry.contains(&fk.target_alias),
            }),
        }
    }
}
