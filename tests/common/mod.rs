#![allow(dead_code)]

use model_contract::config::{load_from_str, resolve};
use model_contract::service::ListParams;
use model_contract::{AppState, MemoryStore};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const CONTRACT: &str = r#"{
    "route_prefix": "api",
    "route_middleware": ["body-limit"],
    "max_body_bytes": 4096,
    "pagination": {"default_per_page": 10, "max_per_page": 100},
    "models": {
        "clients": {
            "entity": {"table": "clients"},
            "is_deletable": true,
            "fields": {
                "id": {"type": "integer", "is_editable": false},
                "name": {"validations": {"is_required": true}},
                "email": {"is_unique": true}
            }
        },
        "products": {
            "entity": {"table": "products", "soft_delete_column": "deleted_at"},
            "is_deletable": true,
            "fields": {
                "id": {"type": "integer", "is_editable": false},
                "name": {"validations": {"is_required": true}},
                "sku": {"is_unique": true, "is_editable": false},
                "price": {"type": "float"},
                "stock": {"type": "integer", "default_value": 0},
                "active": {"type": "boolean", "default_value": true},
                "secret": {"is_filtered": false, "is_sortable": false},
                "tags": {"type": "string[]"},
                "released_at": {"type": "date"},
                "client_id": {"type": "integer", "FK": {"model_alias": "clients", "relation_type": "belongsTo"}}
            }
        },
        "audit_logs": {
            "entity": {"table": "audit_logs"},
            "is_editable": false,
            "fields": {
                "id": {"type": "integer", "is_sortable": false},
                "message": {}
            }
        },
        "orders": {
            "entity": {"table": "orders"},
            "fields": {
                "id": {"type": "integer"},
                "vendor_id": {"type": "integer", "FK": {"model_alias": "vendors", "relation_type": "belongsTo"}}
            }
        }
    }
}"#;

pub struct Fixture {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn fixture() -> Fixture {
    let contract = resolve(&load_from_str(CONTRACT).unwrap()).unwrap();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(contract, store.clone());
    Fixture { state, store }
}

pub fn obj(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        other => panic!("expected object, got {}", other),
    }
}

pub fn params(v: Value) -> ListParams {
    serde_json::from_value(v).unwrap()
}

/// Inserts the standard five products through the engine; ids 1..=5.
pub async fn seed_products(f: &Fixture) {
    let rows = [
        json!({"name": "Red Apple", "sku": "A-1", "price": 1.5, "stock": 10, "tags": ["fruit", "red"], "secret": "x"}),
        json!({"name": "Green Apple", "sku": "A-2", "price": 0.9, "stock": 0, "active": false, "tags": ["fruit"], "secret": "x"}),
        json!({"name": "Bread", "sku": "B-1", "price": 2.25, "stock": 4, "tags": [], "secret": "y"}),
        json!({"name": "Butter", "sku": "B-2", "price": "3.10", "stock": "7", "tags": ["dairy"]}),
        json!({"name": "Cheese", "sku": "C-1", "price": 7, "stock": 2, "tags": ["dairy"], "released_at": "2024-03-01"}),
    ];
    for row in rows {
        f.state.crud.create("products", obj(row)).await.unwrap();
    }
}

pub fn field_values(rows: &[Value], field: &str) -> Vec<Value> {
    rows.iter().map(|r| r[field].clone()).collect()
}
