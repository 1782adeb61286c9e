//! Generic list/create/update/delete over any registered resource.

use crate::config::PaginationSettings;
use crate::error::AppError;
use crate::registry::{FieldType, Registry, ResourceDescriptor};
use crate::service::cast::{cast_value, parse_truthy};
use crate::service::query::{FilterValue, ListParams};
use crate::service::validation::{validate, WriteMode};
use crate::store::{BackingStore, Condition, Order, Predicate, StoreQuery};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Largest offset a store accepts (PostgreSQL `OFFSET` is a signed 64-bit integer).
const MAX_OFFSET: u64 = i64::MAX as u64;

/// One page of serialized entities with its pagination block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PagedResult {
    pub page: u64,
    pub per_page: u64,
    pub total_records: u64,
    pub total_pages: u64,
    pub data: Vec<Value>,
}

pub struct CrudService {
    registry: Arc<Registry>,
    store: Arc<dyn BackingStore>,
    pagination: PaginationSettings,
}

impl CrudService {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn BackingStore>, pagination: PaginationSettings) -> Self {
        Self {
            registry,
            store,
            pagination,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    pub fn pagination(&self) -> PaginationSettings {
        self.pagination
    }

    /// Filtered, sorted, paginated read. Unknown or disallowed filter and sort fields are
    /// skipped, never rejected.
    pub async fn list(&self, alias: &str, ids: Option<&[Value]>, params: &ListParams) -> Result<PagedResult, AppError> {
        let resource = self.registry.resolve(alias)?;

        let ids = match ids {
            Some(ids) => Some(cast_ids(&resource, ids)?),
            None => None,
        };
        let predicates = build_predicates(&resource, params);
        let order = build_order(&resource, params);

        let max = self.pagination.max_per_page.max(1);
        let per_page = params
            .pagination
            .per_page
            .unwrap_or(self.pagination.default_per_page)
            .clamp(1, max);
        let page = params.pagination.page.unwrap_or(1).max(1);

        let query = StoreQuery {
            ids,
            predicates,
            order,
            limit: per_page,
            offset: page_offset(page, per_page),
        };
        let result = self.store.query(&resource, &query).await?;
        tracing::debug!(%alias, page, per_page, total = result.total, "list");

        Ok(PagedResult {
            page,
            per_page,
            total_records: result.total,
            total_pages: result.total.div_ceil(per_page).max(1),
            data: result.rows,
        })
    }

    /// Validate, fill defaults, cast, and persist one entity. Returns it with its identifier.
    pub async fn create(&self, alias: &str, data: Map<String, Value>) -> Result<Value, AppError> {
        let resource = self.registry.resolve(alias)?;
        validate(self.store.as_ref(), &resource, &data, WriteMode::Create).await?;

        let mut values = Map::new();
        for field in resource.data_fields() {
            let value = match data.get(&field.name) {
                Some(v) => v.clone(),
                None => match field.usable_default() {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };
            values.insert(field.name.clone(), cast_value(field.field_type, value));
        }

        let created = self.store.insert(&resource, &values).await?;
        let id = created.get(resource.primary_key()).cloned().unwrap_or_default();
        tracing::info!(%alias, %id, "created");
        Ok(created)
    }

    /// Apply the same patch to every entity in `ids`. All-or-nothing: capability, field and
    /// validation checks run before the store is touched, and the store applies the patch
    /// to the resolved set at once.
    pub async fn update(&self, alias: &str, ids: &[Value], data: Map<String, Value>) -> Result<(), AppError> {
        let resource = self.registry.resolve(alias)?;
        if !resource.is_editable {
            return Err(AppError::Forbidden(format!("Model '{}' is not editable", alias)));
        }

        let disallowed: Vec<&str> = data
            .keys()
            .filter(|k| resource.field(k).map_or(true, |f| !f.is_editable || f.name == resource.primary_key()))
            .map(String::as_str)
            .collect();
        if !disallowed.is_empty() {
            return Err(AppError::Forbidden(format!(
                "Fields are not editable: {}",
                disallowed.join(", ")
            )));
        }
        if data.is_empty() {
            return Err(AppError::Unprocessable("Parameter data must not be empty".into()));
        }

        let targets = self.resolve_targets(&resource, ids).await?;
        validate(self.store.as_ref(), &resource, &data, WriteMode::Update { ids: &targets }).await?;

        let patch: Map<String, Value> = data
            .into_iter()
            .map(|(k, v)| {
                let field_type = resource.field(&k).map(|f| f.field_type).unwrap_or(FieldType::Text);
                let v = cast_value(field_type, v);
                (k, v)
            })
            .collect();
        let changed = self.store.update_by_ids(&resource, &targets, &patch).await?;
        tracing::info!(%alias, targets = targets.len(), changed, "updated");
        Ok(())
    }

    /// Remove every entity in `ids`; the store soft-deletes when the entity supports it.
    pub async fn delete(&self, alias: &str, ids: &[Value]) -> Result<(), AppError> {
        let resource = self.registry.resolve(alias)?;
        if !resource.is_deletable {
            return Err(AppError::Forbidden(format!("Model '{}' is not deletable", alias)));
        }
        let targets = self.resolve_targets(&resource, ids).await?;
        let removed = self.store.delete_by_ids(&resource, &targets).await?;
        tracing::info!(%alias, targets = targets.len(), removed, soft = resource.entity.supports_soft_delete(), "deleted");
        Ok(())
    }

    /// Identifiers of the live entities in `ids`; `NotFound` when none resolve.
    async fn resolve_targets(&self, resource: &ResourceDescriptor, ids: &[Value]) -> Result<Vec<Value>, AppError> {
        let ids = cast_ids(resource, ids)?;
        let found = if ids.is_empty() {
            Vec::new()
        } else {
            self.store.find_by_ids(resource, &ids).await?
        };
        let pk = resource.primary_key();
        let targets: Vec<Value> = found.iter().filter_map(|row| row.get(pk).cloned()).collect();
        if targets.is_empty() {
            return Err(AppError::NotFound(format!(
                "No '{}' entities found for the given ids",
                resource.alias
            )));
        }
        Ok(targets)
    }
}

/// Rows skipped before `page`, clamped to what a store can address.
fn page_offset(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(per_page).min(MAX_OFFSET)
}

/// Cast request identifiers to the identifier type; an uncastable one rejects the request.
fn cast_ids(resource: &ResourceDescriptor, ids: &[Value]) -> Result<Vec<Value>, AppError> {
    let id_type = resource.id_type();
    ids.iter()
        .map(|id| {
            let cast = cast_value(id_type, id.clone());
            let ok = match id_type {
                FieldType::Integer => cast.is_i64(),
                FieldType::Float => cast.is_number(),
                _ => cast.is_string(),
            };
            if ok {
                Ok(cast)
            } else {
                Err(AppError::Unprocessable(format!("Invalid id: {}", id)))
            }
        })
        .collect()
}

fn build_predicates(resource: &ResourceDescriptor, params: &ListParams) -> Vec<Predicate> {
    let mut out = Vec::new();
    for (name, value) in &params.filter {
        let Some(field) = resource.field(name).filter(|f| f.is_filtered) else {
            tracing::debug!(alias = %resource.alias, field = %name, "filter skipped: unknown or not filterable");
            continue;
        };
        match filter_condition(field.field_type, value) {
            Some(condition) => out.push(Predicate {
                field: field.name.clone(),
                field_type: field.field_type,
                condition,
            }),
            None => {
                tracing::debug!(alias = %resource.alias, field = %name, "filter skipped: value does not fit the field type");
            }
        }
    }
    out
}

/// Scalar filter value cast to `field_type`, or `None` when it does not fit.
fn scalar_operand(field_type: FieldType, value: &Value) -> Option<Value> {
    match field_type {
        FieldType::Integer => Some(cast_value(field_type, value.clone())).filter(Value::is_i64),
        FieldType::Float => Some(cast_value(field_type, value.clone())).filter(Value::is_number),
        FieldType::Boolean => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Number(n) => n.as_i64().map(|i| Value::Bool(i != 0)),
            Value::String(s) => parse_truthy(s).map(Value::Bool),
            Value::Null => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::String | FieldType::Text | FieldType::Date => match value {
            Value::Array(_) | Value::Object(_) | Value::Null => None,
            other => Some(cast_value(FieldType::String, other.clone())),
        },
        FieldType::Json => Some(value.clone()),
        FieldType::Array(scalar) => scalar_operand(FieldType::from(scalar), value),
    }
}

fn filter_condition(field_type: FieldType, value: &FilterValue) -> Option<Condition> {
    match value {
        FilterValue::Range { from, to } => {
            if !matches!(field_type, FieldType::Integer | FieldType::Float | FieldType::Date) {
                return None;
            }
            let from = match from {
                Some(v) => Some(scalar_operand(field_type, v)?),
                None => None,
            };
            let to = match to {
                Some(v) => Some(scalar_operand(field_type, v)?),
                None => None,
            };
            Some(Condition::Between { from, to })
        }
        FilterValue::Exact(v) => match field_type {
            FieldType::String | FieldType::Text => match scalar_operand(field_type, v)? {
                Value::String(s) => Some(Condition::Contains(s)),
                _ => None,
            },
            FieldType::Array(scalar) => match v {
                Value::Array(items) => {
                    let elem = FieldType::from(scalar);
                    let cast: Option<Vec<Value>> = items.iter().map(|i| scalar_operand(elem, i)).collect();
                    Some(Condition::Equals(Value::Array(cast?)))
                }
                other => Some(Condition::HasElement(scalar_operand(field_type, other)?)),
            },
            _ => Some(Condition::Equals(scalar_operand(field_type, v)?)),
        },
    }
}

fn build_order(resource: &ResourceDescriptor, params: &ListParams) -> Option<Order> {
    let name = params.sort.field.as_deref()?;
    // an undeclared identifier is always sortable; a declared one follows its flag
    let sortable = resource
        .field(name)
        .map_or(name == resource.primary_key(), |f| f.is_sortable);
    if !sortable {
        tracing::debug!(alias = %resource.alias, field = %name, "sort skipped: unknown or not sortable");
        return None;
    }
    Some(Order {
        field: name.to_string(),
        direction: params.sort.direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EntityHandle, FieldDescriptor, ScalarType};
    use crate::store::SortDirection;
    use serde_json::json;

    fn items() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "items",
            EntityHandle::table("items"),
            vec![
                FieldDescriptor::new("name", FieldType::String),
                FieldDescriptor::new("qty", FieldType::Integer),
                FieldDescriptor::new("active", FieldType::Boolean),
                FieldDescriptor::new("secret", FieldType::String).filtered(false).sortable(false),
                FieldDescriptor::new("tags", FieldType::Array(ScalarType::String)),
            ],
        )
    }

    fn params(filter: Value) -> ListParams {
        serde_json::from_value(json!({ "filter": filter })).unwrap()
    }

    #[test]
    fn predicates_follow_field_types() {
        let r = items();
        let p = params(json!({
            "name": "ap",
            "qty": {"from": "2", "to": 5},
            "active": "yes",
            "secret": "x",
            "ghost": 1,
            "tags": "red"
        }));
        let preds = build_predicates(&r, &p);
        let conditions: Vec<_> = preds.iter().map(|p| (p.field.as_str(), p.condition.clone())).collect();
        assert_eq!(
            conditions,
            vec![
                ("name", Condition::Contains("ap".into())),
                ("qty", Condition::Between { from: Some(json!(2)), to: Some(json!(5)) }),
                ("active", Condition::Equals(json!(true))),
                ("tags", Condition::HasElement(json!("red"))),
            ]
        );
    }

    #[test]
    fn unparsable_filter_values_are_skipped() {
        let r = items();
        let preds = build_predicates(&r, &params(json!({"qty": "many", "active": "perhaps"})));
        assert!(preds.is_empty());
    }

    #[test]
    fn sort_on_unsortable_field_is_ignored() {
        let r = items();
        let mut p = ListParams::default();
        p.sort.field = Some("secret".into());
        assert_eq!(build_order(&r, &p), None);
        p.sort.field = Some("qty".into());
        p.sort.direction = SortDirection::Desc;
        assert_eq!(
            build_order(&r, &p),
            Some(Order {
                field: "qty".into(),
                direction: SortDirection::Desc
            })
        );
    }

    #[test]
    fn offsets_stay_addressable() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 25), 50);
        assert_eq!(page_offset(u64::MAX / 2, 100), i64::MAX as u64);
    }

    #[test]
    fn declared_identifier_follows_its_sortable_flag() {
        let mut p = ListParams::default();
        p.sort.field = Some("id".into());
        p.sort.direction = SortDirection::Desc;
        // undeclared identifier
        assert!(build_order(&items(), &p).is_some());

        let locked = ResourceDescriptor::new(
            "locked",
            EntityHandle::table("locked"),
            vec![
                FieldDescriptor::new("id", FieldType::Integer).sortable(false),
                FieldDescriptor::new("name", FieldType::String),
            ],
        );
        assert_eq!(build_order(&locked, &p), None);
    }

    #[test]
    fn ids_are_cast_to_the_identifier_type() {
        let r = items();
        assert_eq!(cast_ids(&r, &[json!("5"), json!(7)]).unwrap(), vec![json!(5), json!(7)]);
        assert!(matches!(cast_ids(&r, &[json!("abc")]), Err(AppError::Unprocessable(_))));
    }
}
