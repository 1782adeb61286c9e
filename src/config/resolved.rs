//! Resolved runtime configuration: validated settings plus the populated registry.

use crate::registry::Registry;
use std::sync::Arc;

/// Page-size bounds for the listing endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationSettings {
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        PaginationSettings {
            default_per_page: 10,
            max_per_page: 100,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiSettings {
    pub route_prefix: String,
    pub route_middleware: Vec<String>,
    pub max_body_bytes: usize,
    pub pagination: PaginationSettings,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            route_prefix: "api".into(),
            route_middleware: Vec::new(),
            max_body_bytes: 2 * 1024 * 1024,
            pagination: PaginationSettings::default(),
        }
    }
}

pub struct ResolvedContract {
    pub settings: ApiSettings,
    pub registry: Arc<Registry>,
}
