//! Model contract SDK: configuration-driven REST layer exposing CRUD over registered resources.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{load_from_path, load_from_str, resolve, ApiSettings, ContractConfig, ResolvedContract};
pub use error::{AppError, ConfigError, ValidationErrors};
pub use metadata::{FieldMetadata, MetadataService, ResourceMetadata};
pub use registry::{EntityHandle, FieldDescriptor, FieldPatch, FieldType, Registry, ResourceDescriptor};
pub use response::{success_one, success_page};
pub use routes::{app_router, common_routes, common_routes_with_ready, resource_routes};
pub use service::{CrudService, ListParams, PagedResult};
pub use state::AppState;
pub use store::{ensure_database_exists, BackingStore, MemoryStore, PgStore};
