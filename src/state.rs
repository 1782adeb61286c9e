//! Shared application state for all routes.

use crate::config::{ApiSettings, ResolvedContract};
use crate::metadata::MetadataService;
use crate::registry::Registry;
use crate::service::CrudService;
use crate::store::BackingStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub crud: Arc<CrudService>,
    pub metadata: Arc<MetadataService>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    /// Wire the engine and metadata service to one registry and one store.
    pub fn new(contract: ResolvedContract, store: Arc<dyn BackingStore>) -> Self {
        let ResolvedContract { settings, registry } = contract;
        AppState {
            crud: Arc::new(CrudService::new(registry.clone(), store, settings.pagination)),
            metadata: Arc::new(MetadataService::new(registry.clone())),
            registry,
            settings: Arc::new(settings),
        }
    }
}
