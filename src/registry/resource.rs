//! Resource descriptor: alias, backing entity handle, ordered fields and relationships.

use crate::registry::{FieldDescriptor, FieldType, RelationKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Opaque handle to the storage-mapped table a resource wraps. Only the store interprets it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHandle {
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// SQL type the identifier is cast to when bound (e.g. "uuid").
    #[serde(default)]
    pub key_cast: Option<String>,
    /// When set the store soft-deletes by stamping this column.
    #[serde(default)]
    pub soft_delete_column: Option<String>,
    /// Store maintains created_at / updated_at.
    #[serde(default)]
    pub timestamps: bool,
}

fn default_primary_key() -> String {
    "id".into()
}

impl EntityHandle {
    pub fn table(table: impl Into<String>) -> Self {
        EntityHandle {
            schema: None,
            table: table.into(),
            primary_key: default_primary_key(),
            key_cast: None,
            soft_delete_column: None,
            timestamps: false,
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete_column = Some(column.into());
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn supports_soft_delete(&self) -> bool {
        self.soft_delete_column.is_some()
    }
}

/// Named relationship of a resource (as emitted by schema introspection).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    #[serde(alias = "type")]
    pub relation_kind: RelationKind,
    #[serde(alias = "related_model")]
    pub target_alias: String,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub local_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResourceDescriptor {
    pub alias: String,
    pub entity: EntityHandle,
    pub fields: IndexMap<String, FieldDescriptor>,
    pub relationships: IndexMap<String, RelationshipDescriptor>,
    pub is_editable: bool,
    pub is_deletable: bool,
}

impl ResourceDescriptor {
    /// Fields keep the order given; a repeated name replaces the earlier entry in place.
    pub fn new(alias: impl Into<String>, entity: EntityHandle, fields: Vec<FieldDescriptor>) -> Self {
        ResourceDescriptor {
            alias: alias.into(),
            entity,
            fields: fields.into_iter().map(|f| (f.name.clone(), f)).collect(),
            relationships: IndexMap::new(),
            is_editable: true,
            is_deletable: false,
        }
    }

    pub fn with_relationships(mut self, relationships: IndexMap<String, RelationshipDescriptor>) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn editable(mut self, on: bool) -> Self {
        self.is_editable = on;
        self
    }

    pub fn deletable(mut self, on: bool) -> Self {
        self.is_deletable = on;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn primary_key(&self) -> &str {
        &self.entity.primary_key
    }

    /// Identifier type: the declared type of the key field, integer when undeclared.
    pub fn id_type(&self) -> FieldType {
        self.fields
            .get(&self.entity.primary_key)
            .map(|f| f.field_type)
            .unwrap_or(FieldType::Integer)
    }

    /// Declared fields except the identifier, in order.
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        let pk = self.entity.primary_key.as_str();
        self.fields.values().filter(move |f| f.name != pk)
    }
}
