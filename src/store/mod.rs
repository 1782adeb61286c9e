//! Backing-store abstraction: the storage collaborator the engine executes against.
//! `MemoryStore` keeps rows in process; `PgStore` maps resources to PostgreSQL tables.

mod memory;
mod postgres;
mod query;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};
pub use query::*;

use crate::error::AppError;
use crate::registry::ResourceDescriptor;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Rows travel as JSON objects keyed by field name. Identifiers passed in are already
/// cast to the resource's identifier type.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Filtered, ordered page of rows plus the total count before limit/offset.
    async fn query(&self, resource: &ResourceDescriptor, query: &StoreQuery) -> Result<StorePage, AppError>;

    /// Live rows whose identifier is in `ids`.
    async fn find_by_ids(&self, resource: &ResourceDescriptor, ids: &[Value]) -> Result<Vec<Value>, AppError>;

    /// Insert one row and return it with its identifier populated.
    async fn insert(&self, resource: &ResourceDescriptor, values: &Map<String, Value>) -> Result<Value, AppError>;

    /// Apply the same patch to every row in `ids` as one atomic operation. Returns rows changed.
    async fn update_by_ids(
        &self,
        resource: &ResourceDescriptor,
        ids: &[Value],
        patch: &Map<String, Value>,
    ) -> Result<u64, AppError>;

    /// Remove every row in `ids` as one atomic operation: soft delete when the entity
    /// declares a soft-delete column, hard delete otherwise. Returns rows removed.
    async fn delete_by_ids(&self, resource: &ResourceDescriptor, ids: &[Value]) -> Result<u64, AppError>;

    /// Whether a live row other than `exclude_ids` holds `value` in `field`.
    async fn exists(
        &self,
        resource: &ResourceDescriptor,
        field: &str,
        value: &Value,
        exclude_ids: &[Value],
    ) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
