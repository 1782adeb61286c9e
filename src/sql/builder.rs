//! Builds parameterized SELECT, COUNT, INSERT, UPDATE and DELETE for a resource.

use crate::registry::{FieldType, ResourceDescriptor, ScalarType};
use crate::sql::PgBindValue;
use crate::store::{Condition, Predicate, StoreQuery};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(resource: &ResourceDescriptor) -> String {
    match &resource.entity.schema {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(&resource.entity.table)),
        None => quoted(&resource.entity.table),
    }
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// `$n::cast` placeholder for a value of the declared type.
    fn typed(&mut self, field_type: FieldType, v: &Value) -> String {
        let n = self.push_param(PgBindValue::for_type(field_type, v));
        format!("${}::{}", n, param_cast(field_type))
    }

    fn key(&mut self, resource: &ResourceDescriptor, id: &Value) -> String {
        let id_type = resource.id_type();
        let n = self.push_param(PgBindValue::for_type(id_type, id));
        match &resource.entity.key_cast {
            Some(cast) => format!("${}::{}", n, cast),
            None => format!("${}::{}", n, param_cast(id_type)),
        }
    }
}

fn scalar_cast(scalar: ScalarType) -> &'static str {
    match scalar {
        ScalarType::String | ScalarType::Text => "text",
        ScalarType::Integer => "bigint",
        ScalarType::Float => "double precision",
        ScalarType::Boolean => "boolean",
        ScalarType::Date => "timestamptz",
    }
}

/// SQL type a bound value of this field type is cast to.
fn param_cast(field_type: FieldType) -> String {
    match field_type {
        FieldType::String | FieldType::Text => "text".into(),
        FieldType::Integer => "bigint".into(),
        FieldType::Float => "double precision".into(),
        FieldType::Boolean => "boolean".into(),
        FieldType::Date => "timestamptz".into(),
        FieldType::Json => "jsonb".into(),
        FieldType::Array(scalar) => format!("{}[]", scalar_cast(scalar)),
    }
}

/// Column expression on the left of a comparison.
fn compare_column(name: &str, field_type: FieldType) -> String {
    match field_type {
        FieldType::Json | FieldType::Array(_) => format!("{}::{}", quoted(name), param_cast(field_type)),
        _ => quoted(name),
    }
}

/// SELECT expression so every column decodes to a JSON-friendly Rust type.
fn select_column(name: &str, field_type: FieldType) -> String {
    let q = quoted(name);
    match field_type {
        FieldType::Float => format!("{}::double precision AS {}", q, q),
        FieldType::Array(ScalarType::Integer) => format!("{}::bigint[] AS {}", q, q),
        FieldType::Array(ScalarType::Float) => format!("{}::double precision[] AS {}", q, q),
        FieldType::Array(ScalarType::Date) => format!("{}::text[] AS {}", q, q),
        _ => q,
    }
}

/// Identifier, declared fields, then timestamps.
fn select_column_list(resource: &ResourceDescriptor) -> String {
    let mut cols = vec![quoted(resource.primary_key())];
    cols.extend(resource.data_fields().map(|f| select_column(&f.name, f.field_type)));
    if resource.entity.timestamps {
        cols.push(quoted("created_at"));
        cols.push(quoted("updated_at"));
    }
    cols.join(", ")
}

/// Escape LIKE metacharacters; the pattern is used with `ESCAPE '\'`.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn predicate_sql(q: &mut QueryBuf, p: &Predicate) -> String {
    let col = compare_column(&p.field, p.field_type);
    match &p.condition {
        Condition::Contains(needle) => {
            let n = q.push_param(PgBindValue::String(format!("%{}%", escape_like(needle))));
            format!("{}::text ILIKE ${} ESCAPE '\\'", quoted(&p.field), n)
        }
        Condition::Equals(v) => format!("{} = {}", col, q.typed(p.field_type, v)),
        Condition::Between { from, to } => {
            let mut parts = Vec::new();
            if let Some(from) = from {
                parts.push(format!("{} >= {}", col, q.typed(p.field_type, from)));
            }
            if let Some(to) = to {
                parts.push(format!("{} <= {}", col, q.typed(p.field_type, to)));
            }
            if parts.is_empty() {
                "TRUE".into()
            } else {
                parts.join(" AND ")
            }
        }
        Condition::HasElement(v) => {
            let element = match p.field_type {
                FieldType::Array(scalar) => FieldType::from(scalar),
                other => other,
            };
            format!("{} = ANY({})", q.typed(element, v), quoted(&p.field))
        }
    }
}

fn id_list(q: &mut QueryBuf, resource: &ResourceDescriptor, ids: &[Value]) -> String {
    if ids.is_empty() {
        return "1 = 0".into();
    }
    let placeholders: Vec<String> = ids.iter().map(|id| q.key(resource, id)).collect();
    format!("{} IN ({})", quoted(resource.primary_key()), placeholders.join(", "))
}

fn live_only(resource: &ResourceDescriptor, where_parts: &mut Vec<String>) {
    if let Some(col) = &resource.entity.soft_delete_column {
        where_parts.push(format!("{} IS NULL", quoted(col)));
    }
}

fn where_clause(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn query_filters(q: &mut QueryBuf, resource: &ResourceDescriptor, query: &StoreQuery) -> String {
    let mut parts = Vec::new();
    live_only(resource, &mut parts);
    if let Some(ids) = &query.ids {
        parts.push(id_list(q, resource, ids));
    }
    for p in &query.predicates {
        parts.push(predicate_sql(q, p));
    }
    where_clause(&parts)
}

/// SELECT one page: filters, ORDER BY (identifier as tiebreak), LIMIT/OFFSET.
pub fn select_page(resource: &ResourceDescriptor, query: &StoreQuery) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = query_filters(&mut q, resource, query);
    let pk = quoted(resource.primary_key());
    let order = match &query.order {
        Some(o) if o.field != resource.primary_key() => {
            format!("{} {}, {} ASC", quoted(&o.field), o.direction.as_sql(), pk)
        }
        Some(o) => format!("{} {}", pk, o.direction.as_sql()),
        None => format!("{} ASC", pk),
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(resource),
        qualified_table(resource),
        where_sql,
        order,
        query.limit,
        query.offset
    );
    q
}

/// COUNT(*) under the same filters as `select_page`, without ordering or paging.
pub fn count(resource: &ResourceDescriptor, query: &StoreQuery) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = query_filters(&mut q, resource, query);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(resource), where_sql);
    q
}

/// Live rows whose identifier is in `ids`, ordered by identifier.
pub fn select_by_ids(resource: &ResourceDescriptor, ids: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut parts = Vec::new();
    live_only(resource, &mut parts);
    parts.push(id_list(&mut q, resource, ids));
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        select_column_list(resource),
        qualified_table(resource),
        where_clause(&parts),
        quoted(resource.primary_key())
    );
    q
}

/// INSERT the given declared fields; the identifier is left to the column default unless present.
pub fn insert(resource: &ResourceDescriptor, values: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    if let Some(id) = values.get(resource.primary_key()).filter(|v| !v.is_null()) {
        cols.push(quoted(resource.primary_key()));
        placeholders.push(q.key(resource, id));
    }
    for field in resource.data_fields() {
        let Some(v) = values.get(&field.name) else { continue };
        cols.push(quoted(&field.name));
        placeholders.push(q.typed(field.field_type, v));
    }
    if resource.entity.timestamps {
        for col in ["created_at", "updated_at"] {
            cols.push(quoted(col));
            placeholders.push("NOW()".into());
        }
    }
    let table = qualified_table(resource);
    let returning = select_column_list(resource);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE every live row in `ids` with the same patch. Only declared non-identifier fields are set.
pub fn update_by_ids(resource: &ResourceDescriptor, ids: &[Value], patch: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut sets = Vec::new();
    for field in resource.data_fields() {
        let Some(v) = patch.get(&field.name) else { continue };
        let rhs = q.typed(field.field_type, v);
        sets.push(format!("{} = {}", quoted(&field.name), rhs));
    }
    if resource.entity.timestamps {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let mut parts = Vec::new();
    live_only(resource, &mut parts);
    parts.push(id_list(&mut q, resource, ids));
    q.sql = format!(
        "UPDATE {} SET {}{}",
        qualified_table(resource),
        sets.join(", "),
        where_clause(&parts)
    );
    q
}

/// Soft delete (stamp the column) when the entity declares one, DELETE otherwise.
pub fn delete_by_ids(resource: &ResourceDescriptor, ids: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut parts = Vec::new();
    live_only(resource, &mut parts);
    parts.push(id_list(&mut q, resource, ids));
    let table = qualified_table(resource);
    q.sql = match &resource.entity.soft_delete_column {
        Some(col) => format!("UPDATE {} SET {} = NOW(){}", table, quoted(col), where_clause(&parts)),
        None => format!("DELETE FROM {}{}", table, where_clause(&parts)),
    };
    q
}

/// EXISTS check for the uniqueness rule.
pub fn exists(resource: &ResourceDescriptor, field: &str, value: &Value, exclude_ids: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let field_type = resource.field(field).map(|f| f.field_type).unwrap_or(FieldType::String);
    let mut parts = vec![format!(
        "{} = {}",
        compare_column(field, field_type),
        q.typed(field_type, value)
    )];
    live_only(resource, &mut parts);
    if !exclude_ids.is_empty() {
        let placeholders: Vec<String> = exclude_ids.iter().map(|id| q.key(resource, id)).collect();
        parts.push(format!(
            "{} NOT IN ({})",
            quoted(resource.primary_key()),
            placeholders.join(", ")
        ));
    }
    q.sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {}{})",
        qualified_table(resource),
        where_clause(&parts)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EntityHandle, FieldDescriptor};
    use crate::store::{Order, SortDirection};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn products() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "products",
            EntityHandle::table("products").in_schema("shop").soft_delete("deleted_at"),
            vec![
                FieldDescriptor::new("id", FieldType::Integer),
                FieldDescriptor::new("name", FieldType::String),
                FieldDescriptor::new("price", FieldType::Float),
                FieldDescriptor::new("tags", FieldType::Array(ScalarType::String)),
            ],
        )
    }

    #[test]
    fn page_query_filters_orders_and_limits() {
        let r = products();
        let query = StoreQuery {
            ids: Some(vec![json!(5), json!(7)]),
            predicates: vec![
                Predicate {
                    field: "name".into(),
                    field_type: FieldType::String,
                    condition: Condition::Contains("50%_off".into()),
                },
                Predicate {
                    field: "price".into(),
                    field_type: FieldType::Float,
                    condition: Condition::Between { from: Some(json!(1.0)), to: None },
                },
                Predicate {
                    field: "tags".into(),
                    field_type: FieldType::Array(ScalarType::String),
                    condition: Condition::HasElement(json!("new")),
                },
            ],
            order: Some(Order {
                field: "price".into(),
                direction: SortDirection::Desc,
            }),
            limit: 10,
            offset: 20,
        };
        let q = select_page(&r, &query);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"price\"::double precision AS \"price\", \"tags\" FROM \"shop\".\"products\" \
             WHERE \"deleted_at\" IS NULL AND \"id\" IN ($1::bigint, $2::bigint) \
             AND \"name\"::text ILIKE $3 ESCAPE '\\' AND \"price\" >= $4::double precision \
             AND $5::text = ANY(\"tags\") \
             ORDER BY \"price\" DESC, \"id\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(q.params[2], PgBindValue::String("%50\\%\\_off%".into()));
        assert_eq!(q.params[3], PgBindValue::F64(1.0));
    }

    #[test]
    fn count_shares_the_filters() {
        let r = products();
        let q = count(&r, &StoreQuery::default());
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"shop\".\"products\" WHERE \"deleted_at\" IS NULL"
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_skips_absent_fields_and_stamps_timestamps() {
        let r = ResourceDescriptor::new(
            "notes",
            EntityHandle::table("notes").with_timestamps(),
            vec![
                FieldDescriptor::new("title", FieldType::String),
                FieldDescriptor::new("body", FieldType::Text),
            ],
        );
        let mut values = Map::new();
        values.insert("title".into(), json!("hi"));
        let q = insert(&r, &values);
        assert_eq!(
            q.sql,
            "INSERT INTO \"notes\" (\"title\", \"created_at\", \"updated_at\") VALUES ($1::text, NOW(), NOW()) \
             RETURNING \"id\", \"title\", \"body\", \"created_at\", \"updated_at\""
        );
    }

    #[test]
    fn batch_update_is_one_statement() {
        let r = products();
        let mut patch = Map::new();
        patch.insert("price".into(), json!(2.5));
        let q = update_by_ids(&r, &[json!(1), json!(2)], &patch);
        assert_eq!(
            q.sql,
            "UPDATE \"shop\".\"products\" SET \"price\" = $1::double precision \
             WHERE \"deleted_at\" IS NULL AND \"id\" IN ($2::bigint, $3::bigint)"
        );
    }

    #[test]
    fn delete_prefers_soft_delete() {
        let soft = delete_by_ids(&products(), &[json!(3)]);
        assert_eq!(
            soft.sql,
            "UPDATE \"shop\".\"products\" SET \"deleted_at\" = NOW() WHERE \"deleted_at\" IS NULL AND \"id\" IN ($1::bigint)"
        );
        let hard_resource = ResourceDescriptor::new("t", EntityHandle::table("t"), vec![]);
        let hard = delete_by_ids(&hard_resource, &[json!(3)]);
        assert_eq!(hard.sql, "DELETE FROM \"t\" WHERE \"id\" IN ($1::bigint)");
    }

    #[test]
    fn key_cast_overrides_identifier_type() {
        let mut entity = EntityHandle::table("users");
        entity.key_cast = Some("uuid".into());
        let r = ResourceDescriptor::new("users", entity, vec![FieldDescriptor::new("id", FieldType::String)]);
        let q = select_by_ids(&r, &[json!("6f1c8c9e-0000-0000-0000-000000000000")]);
        assert_eq!(q.sql, "SELECT \"id\" FROM \"users\" WHERE \"id\" IN ($1::uuid) ORDER BY \"id\"");
    }

    #[test]
    fn exists_excludes_targets() {
        let q = exists(&products(), "name", &json!("Pen"), &[json!(4)]);
        assert_eq!(
            q.sql,
            "SELECT EXISTS(SELECT 1 FROM \"shop\".\"products\" WHERE \"name\" = $1::text \
             AND \"deleted_at\" IS NULL AND \"id\" NOT IN ($2::bigint))"
        );
    }

    #[test]
    fn empty_id_set_matches_nothing() {
        let q = select_by_ids(&products(), &[]);
        assert!(q.sql.contains("1 = 0"));
    }
}
