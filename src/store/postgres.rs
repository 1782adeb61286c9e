//! PostgreSQL-backed store. SQL comes from the `sql` builder; rows come back as JSON objects.

use crate::error::AppError;
use crate::registry::ResourceDescriptor;
use crate::sql::{self, QueryBuf};
use crate::store::{BackingStore, StorePage, StoreQuery};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let done = query.execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn scalar<T>(&self, q: &QueryBuf) -> Result<T, AppError>
    where
        T: Send + Unpin,
        (T,): for<'r> sqlx::FromRow<'r, PgRow>,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, T>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_one(&self.pool).await?)
    }
}

#[async_trait]
impl BackingStore for PgStore {
    async fn query(&self, resource: &ResourceDescriptor, query: &StoreQuery) -> Result<StorePage, AppError> {
        let total: i64 = self.scalar(&sql::count(resource, query)).await?;
        let rows = self.fetch_all(&sql::select_page(resource, query)).await?;
        Ok(StorePage {
            total: u64::try_from(total).unwrap_or(0),
            rows,
        })
    }

    async fn find_by_ids(&self, resource: &ResourceDescriptor, ids: &[Value]) -> Result<Vec<Value>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_all(&sql::select_by_ids(resource, ids)).await
    }

    async fn insert(&self, resource: &ResourceDescriptor, values: &Map<String, Value>) -> Result<Value, AppError> {
        let q = sql::insert(resource, values);
        self.fetch_all(&q)
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update_by_ids(
        &self,
        resource: &ResourceDescriptor,
        ids: &[Value],
        patch: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.execute(&sql::update_by_ids(resource, ids, patch)).await
    }

    async fn delete_by_ids(&self, resource: &ResourceDescriptor, ids: &[Value]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.execute(&sql::delete_by_ids(resource, ids)).await
    }

    async fn exists(
        &self,
        resource: &ResourceDescriptor,
        field: &str,
        value: &Value,
        exclude_ids: &[Value],
    ) -> Result<bool, AppError> {
        self.scalar(&sql::exists(resource, field, value, exclude_ids)).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        return number(f64::from(n));
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        return number(n);
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<String>>, _>(name) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<i64>>, _>(name) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<i32>>, _>(name) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<f64>>, _>(name) {
        return Value::Array(v.into_iter().map(number).collect());
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<bool>>, _>(name) {
        return Value::from(v);
    }
    Value::Null
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::Unprocessable("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
