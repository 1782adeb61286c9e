//! In-process store: one ordered row map per table, integer identifiers auto-assigned.
//! Used by the test suite and by embedders that do not need PostgreSQL.

use crate::error::AppError;
use crate::registry::{EntityHandle, FieldType, ResourceDescriptor};
use crate::store::{json_cmp, json_eq, BackingStore, Condition, Predicate, SortDirection, StorePage, StoreQuery};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: IndexMap<String, Map<String, Value>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
}

fn table_key(entity: &EntityHandle) -> String {
    match &entity.schema {
        Some(schema) => format!("{}.{}", schema, entity.table),
        None => entity.table.clone(),
    }
}

/// Row-map key for an identifier value.
fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_live(entity: &EntityHandle, row: &Map<String, Value>) -> bool {
    match &entity.soft_delete_column {
        Some(col) => row.get(col).map_or(true, Value::is_null),
        None => true,
    }
}

fn now_stamp() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

fn matches(row: &Map<String, Value>, predicate: &Predicate) -> bool {
    let cell = row.get(&predicate.field).unwrap_or(&Value::Null);
    match &predicate.condition {
        Condition::Contains(needle) => match cell {
            Value::String(s) => s.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        },
        Condition::Equals(v) => json_eq(cell, v),
        Condition::Between { from, to } => {
            if cell.is_null() {
                return false;
            }
            let above = from.as_ref().map_or(true, |f| json_cmp(cell, f).is_ge());
            let below = to.as_ref().map_or(true, |t| json_cmp(cell, t).is_le());
            above && below
        }
        Condition::HasElement(v) => cell
            .as_array()
            .is_some_and(|items| items.iter().any(|item| json_eq(item, v))),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored row of the entity, soft-deleted ones included, in insertion order.
    pub fn snapshot(&self, entity: &EntityHandle) -> Vec<Value> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(&table_key(entity))
            .map(|t| t.rows.values().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn live_rows(table: &Table, entity: &EntityHandle) -> Vec<Map<String, Value>> {
        table
            .rows
            .values()
            .filter(|row| is_live(entity, row))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn query(&self, resource: &ResourceDescriptor, query: &StoreQuery) -> Result<StorePage, AppError> {
        let entity = &resource.entity;
        let pk = entity.primary_key.as_str();
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = tables.get(&table_key(entity)) else {
            return Ok(StorePage::default());
        };

        let mut rows: Vec<Map<String, Value>> = Self::live_rows(table, entity)
            .into_iter()
            .filter(|row| match &query.ids {
                Some(ids) => row.get(pk).is_some_and(|id| ids.iter().any(|want| json_eq(id, want))),
                None => true,
            })
            .filter(|row| query.predicates.iter().all(|p| matches(row, p)))
            .collect();

        let (sort_field, direction) = match &query.order {
            Some(order) => (order.field.as_str(), order.direction),
            None => (pk, SortDirection::Asc),
        };
        rows.sort_by(|a, b| {
            let ord = json_cmp(
                a.get(sort_field).unwrap_or(&Value::Null),
                b.get(sort_field).unwrap_or(&Value::Null),
            );
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let total = rows.len() as u64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let rows = rows.into_iter().skip(offset).take(limit).map(Value::Object).collect();
        Ok(StorePage { total, rows })
    }

    async fn find_by_ids(&self, resource: &ResourceDescriptor, ids: &[Value]) -> Result<Vec<Value>, AppError> {
        let entity = &resource.entity;
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = tables.get(&table_key(entity)) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for id in ids {
            if let Some(row) = table.rows.get(&id_key(id)).filter(|row| is_live(entity, row)) {
                if !out.iter().any(|r: &Value| r.get(&entity.primary_key) == row.get(&entity.primary_key)) {
                    out.push(Value::Object(row.clone()));
                }
            }
        }
        Ok(out)
    }

    async fn insert(&self, resource: &ResourceDescriptor, values: &Map<String, Value>) -> Result<Value, AppError> {
        let entity = &resource.entity;
        let pk = entity.primary_key.clone();
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let table = tables.entry(table_key(entity)).or_default();

        let id = match values.get(&pk).filter(|v| !v.is_null()) {
            Some(given) => given.clone(),
            None => match resource.id_type() {
                FieldType::Integer => {
                    table.next_id += 1;
                    Value::from(table.next_id)
                }
                _ => Value::String(uuid::Uuid::new_v4().to_string()),
            },
        };
        let key = id_key(&id);
        if table.rows.contains_key(&key) {
            return Err(AppError::Unprocessable(format!("duplicate identifier {}", key)));
        }

        let mut row = Map::new();
        row.insert(pk.clone(), id);
        for (k, v) in values {
            if *k != pk {
                row.insert(k.clone(), v.clone());
            }
        }
        if entity.timestamps {
            let now = now_stamp();
            row.insert("created_at".into(), now.clone());
            row.insert("updated_at".into(), now);
        }
        if let Some(col) = &entity.soft_delete_column {
            row.insert(col.clone(), Value::Null);
        }
        tracing::debug!(table = %entity.table, id = %key, "memory insert");
        table.rows.insert(key, row.clone());
        Ok(Value::Object(row))
    }

    async fn update_by_ids(
        &self,
        resource: &ResourceDescriptor,
        ids: &[Value],
        patch: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        let entity = &resource.entity;
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = tables.get_mut(&table_key(entity)) else {
            return Ok(0);
        };
        let mut changed = 0u64;
        for id in ids {
            let Some(row) = table.rows.get_mut(&id_key(id)) else { continue };
            if !is_live(entity, row) {
                continue;
            }
            for (k, v) in patch {
                if *k != entity.primary_key {
                    row.insert(k.clone(), v.clone());
                }
            }
            if entity.timestamps {
                row.insert("updated_at".into(), now_stamp());
            }
            changed += 1;
        }
        tracing::debug!(table = %entity.table, changed, "memory update");
        Ok(changed)
    }

    async fn delete_by_ids(&self, resource: &ResourceDescriptor, ids: &[Value]) -> Result<u64, AppError> {
        let entity = &resource.entity;
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = tables.get_mut(&table_key(entity)) else {
            return Ok(0);
        };
        let mut removed = 0u64;
        for id in ids {
            let key = id_key(id);
            match &entity.soft_delete_column {
                Some(col) => {
                    if let Some(row) = table.rows.get_mut(&key).filter(|row| is_live(entity, row)) {
                        row.insert(col.clone(), now_stamp());
                        removed += 1;
                    }
                }
                None => {
                    if table.rows.shift_remove(&key).is_some() {
                        removed += 1;
                    }
                }
            }
        }
        tracing::debug!(table = %entity.table, removed, soft = entity.supports_soft_delete(), "memory delete");
        Ok(removed)
    }

    async fn exists(
        &self,
        resource: &ResourceDescriptor,
        field: &str,
        value: &Value,
        exclude_ids: &[Value],
    ) -> Result<bool, AppError> {
        let entity = &resource.entity;
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = tables.get(&table_key(entity)) else {
            return Ok(false);
        };
        let excluded: Vec<String> = exclude_ids.iter().map(id_key).collect();
        Ok(table.rows.iter().any(|(key, row)| {
            is_live(entity, row)
                && !excluded.contains(key)
                && row.get(field).is_some_and(|cell| json_eq(cell, value))
        }))
    }
}
