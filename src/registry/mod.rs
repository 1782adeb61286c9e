//! Resource registry: alias -> {backing entity, field schema, relationships}.
//! Built once at startup and passed by `Arc` to the engine and metadata service.
//! Reads hand out `Arc` snapshots; field patches swap in a new descriptor.

mod field;
mod resource;

pub use field::*;
pub use resource::*;

use crate::error::AppError;
use crate::service::TypeRule;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Capability flags applied by `Registry::register`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceDefaults {
    pub is_editable: bool,
    pub is_deletable: bool,
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        ResourceDefaults {
            is_editable: true,
            is_deletable: false,
        }
    }
}

#[derive(Default)]
pub struct Registry {
    defaults: ResourceDefaults,
    resources: RwLock<IndexMap<String, Arc<ResourceDescriptor>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: ResourceDefaults) -> Self {
        Registry {
            defaults,
            resources: RwLock::new(IndexMap::new()),
        }
    }

    /// Insert or replace `alias` using the configured capability defaults. Last write wins.
    pub fn register(
        &self,
        alias: impl Into<String>,
        entity: EntityHandle,
        fields: Vec<FieldDescriptor>,
        relationships: IndexMap<String, RelationshipDescriptor>,
    ) {
        let descriptor = ResourceDescriptor::new(alias, entity, fields)
            .with_relationships(relationships)
            .editable(self.defaults.is_editable)
            .deletable(self.defaults.is_deletable);
        self.register_descriptor(descriptor);
    }

    /// Insert or replace a fully built descriptor. Last write wins.
    pub fn register_descriptor(&self, descriptor: ResourceDescriptor) {
        tracing::info!(
            alias = %descriptor.alias,
            table = %descriptor.entity.table,
            fields = descriptor.fields.len(),
            "register resource"
        );
        let mut guard = self.resources.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(descriptor.alias.clone(), Arc::new(descriptor));
    }

    pub fn get(&self, alias: &str) -> Option<Arc<ResourceDescriptor>> {
        let guard = self.resources.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(alias).cloned()
    }

    pub fn resolve(&self, alias: &str) -> Result<Arc<ResourceDescriptor>, AppError> {
        self.get(alias).ok_or_else(|| AppError::model_not_found(alias))
    }

    pub fn contains(&self, alias: &str) -> bool {
        let guard = self.resources.read().unwrap_or_else(PoisonError::into_inner);
        guard.contains_key(alias)
    }

    /// Registered aliases in registration order.
    pub fn aliases(&self) -> Vec<String> {
        let guard = self.resources.read().unwrap_or_else(PoisonError::into_inner);
        guard.keys().cloned().collect()
    }

    pub fn field(&self, alias: &str, name: &str) -> Option<FieldDescriptor> {
        self.get(alias).and_then(|r| r.field(name).cloned())
    }

    /// Fields of `alias` matching `predicate`, in declared order. Empty when the alias is unknown.
    pub fn fields_where<P>(&self, alias: &str, predicate: P) -> Vec<FieldDescriptor>
    where
        P: Fn(&FieldDescriptor) -> bool,
    {
        self.get(alias)
            .map(|r| r.fields.values().filter(|f| predicate(f)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn sortable_fields(&self, alias: &str) -> Vec<FieldDescriptor> {
        self.fields_where(alias, |f| f.is_sortable)
    }

    pub fn filterable_fields(&self, alias: &str) -> Vec<FieldDescriptor> {
        self.fields_where(alias, |f| f.is_filtered)
    }

    pub fn editable_fields(&self, alias: &str) -> Vec<FieldDescriptor> {
        self.fields_where(alias, |f| f.is_editable)
    }

    pub fn required_fields(&self, alias: &str) -> Vec<FieldDescriptor> {
        self.fields_where(alias, |f| f.is_required)
    }

    /// Merge `patch` into one field. `NotFound` when the alias or field is unknown;
    /// `Unprocessable` when the patched default no longer fits the field type, in which
    /// case nothing is applied.
    pub fn update_field_config(&self, alias: &str, field_name: &str, patch: &FieldPatch) -> Result<(), AppError> {
        let mut guard = self.resources.write().unwrap_or_else(PoisonError::into_inner);
        let Some(current) = guard.get(alias) else {
            return Err(AppError::model_not_found(alias));
        };
        let mut next = ResourceDescriptor::clone(current);
        let Some(field) = next.fields.get_mut(field_name) else {
            return Err(AppError::NotFound(format!(
                "Field '{}' not found in model '{}'",
                field_name, alias
            )));
        };
        patch.apply(field);
        if let Some(default) = field.usable_default() {
            TypeRule::for_type(field.field_type)
                .check(field_name, default)
                .map_err(|message| AppError::Unprocessable(format!("default_value: {}", message)))?;
        }
        guard.insert(alias.to_string(), Arc::new(next));
        tracing::info!(alias, field = field_name, "field config updated");
        Ok(())
    }

    /// Foreign-key targets that are not registered, as (alias, field, target).
    pub fn dangling_foreign_keys(&self) -> Vec<(String, String, String)> {
        let guard = self.resources.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = Vec::new();
        for resource in guard.values() {
            for field in resource.fields.values() {
                if let Some(fk) = &field.foreign_key {
                    if !guard.contains_key(&fk.target_alias) {
                        out.push((resource.alias.clone(), field.name.clone(), fk.target_alias.clone()));
                    }
                }
            }
        }
        out
    }
}
