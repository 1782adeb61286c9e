mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::{fixture, seed_products, Fixture};
use model_contract::app_router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(f: &Fixture) -> Router {
    app_router(f.state.clone())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn list_envelope_uses_camel_case_pagination() {
    let f = fixture();
    seed_products(&f).await;
    let (status, body) = send(
        app(&f),
        Method::GET,
        "/api/products?filter%5Bname%5D=apple&sort%5Bfield%5D=price&sort%5Border%5D=DESC&pagination%5BperPage%5D=1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["pagination"],
        json!({"page": 1, "perPage": 1, "totalRecords": 2, "totalPages": 2})
    );
    assert_eq!(body["data"][0]["name"], json!("Red Apple"));
}

#[tokio::test]
async fn list_accepts_comma_separated_ids_and_ranges() {
    let f = fixture();
    seed_products(&f).await;
    let (status, body) = send(
        app(&f),
        Method::GET,
        "/api/products?id=1,3,5&filter%5Bprice%5D%5Bfrom%5D=2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["data"].as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(3), json!(5)]);
}

#[tokio::test]
async fn create_returns_201_with_data_envelope() {
    let f = fixture();
    let (status, body) = send(
        app(&f),
        Method::POST,
        "/api/clients",
        Some(json!({"data": {"name": "Acme", "email": "ops@acme.test"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["id"], json!(1));
    assert_eq!(body["data"]["name"], json!("Acme"));
}

#[tokio::test]
async fn create_validation_failure_is_400_with_field_errors() {
    let f = fixture();
    let (status, body) = send(app(&f), Method::POST, "/api/clients", Some(json!({"data": {"email": "x"}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": "Validation failed", "errors": {"name": ["The name field is required."]}})
    );
}

#[tokio::test]
async fn create_without_data_key_is_400() {
    let f = fixture();
    let (status, body) = send(app(&f), Method::POST, "/api/clients", Some(json!({"name": "Acme"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Parameter data is required"}));
}

#[tokio::test]
async fn update_returns_204() {
    let f = fixture();
    seed_products(&f).await;
    let (status, _) = send(
        app(&f),
        Method::PATCH,
        "/api/products",
        Some(json!({"ids": [1, 2], "data": {"stock": 99}})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(app(&f), Method::GET, "/api/products?id=1,2", None).await;
    let stock: Vec<_> = body["data"].as_array().unwrap().iter().map(|r| r["stock"].clone()).collect();
    assert_eq!(stock, vec![json!(99), json!(99)]);
}

#[tokio::test]
async fn update_of_non_editable_field_is_403() {
    let f = fixture();
    seed_products(&f).await;
    let (status, body) = send(
        app(&f),
        Method::PATCH,
        "/api/products",
        Some(json!({"ids": [1], "data": {"sku": "X"}})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("Fields are not editable: sku"));
}

#[tokio::test]
async fn update_without_matches_is_404() {
    let f = fixture();
    let (status, _) = send(
        app(&f),
        Method::PATCH,
        "/api/products",
        Some(json!({"ids": [], "data": {"stock": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_requires_id_parameter() {
    let f = fixture();
    let (status, body) = send(app(&f), Method::DELETE, "/api/products", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Parameter id is required"}));
}

#[tokio::test]
async fn delete_returns_204_and_hides_rows() {
    let f = fixture();
    seed_products(&f).await;
    let (status, _) = send(app(&f), Method::DELETE, "/api/products?id=2,4", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(app(&f), Method::GET, "/api/products", None).await;
    assert_eq!(body["pagination"]["totalRecords"], json!(3));
}

#[tokio::test]
async fn delete_on_non_deletable_resource_is_403() {
    let f = fixture();
    let (status, _) = send(app(&f), Method::DELETE, "/api/audit_logs?id=1", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_alias_is_404() {
    let f = fixture();
    let (status, body) = send(app(&f), Method::GET, "/api/ghosts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Model with alias 'ghosts' not found"}));
    let (status, _) = send(app(&f), Method::GET, "/api/ghosts/meta", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn meta_routes_describe_and_patch_fields() {
    let f = fixture();
    let (status, body) = send(app(&f), Method::GET, "/api/products/meta", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_alias"], json!("products"));

    let (status, body) = send(app(&f), Method::GET, "/api/products/meta/price", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], json!("float"));
    assert_eq!(body["is_sortable"], json!(true));

    let (status, _) = send(
        app(&f),
        Method::PATCH,
        "/api/products/meta/price",
        Some(json!({"is_sortable": false})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(app(&f), Method::GET, "/api/products/meta/price", None).await;
    assert_eq!(body["is_sortable"], json!(false));

    let (status, _) = send(
        app(&f),
        Method::PATCH,
        "/api/products/meta/nope",
        Some(json!({"is_sortable": false})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(&f),
        Method::PATCH,
        "/api/products/meta/price",
        Some(json!({"colour": "red"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn body_limit_middleware_rejects_large_payloads() {
    let f = fixture();
    let big = "x".repeat(8192);
    let (status, _) = send(app(&f), Method::POST, "/api/clients", Some(json!({"data": {"name": big}}))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn health_and_ready() {
    let f = fixture();
    let (status, body) = send(app(&f), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    let (status, body) = send(app(&f), Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resources"], json!(4));
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let f = fixture();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/clients")
        .header("content-type", "application/json")
        .body(Body::from("{\"data\": {"))
        .unwrap();
    let response = app(&f).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));

    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/api/products")
        .header("content-type", "text/plain")
        .body(Body::from("ids=1"))
        .unwrap();
    let response = app(&f).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn field_patch_with_mismatched_default_is_rejected() {
    let f = fixture();
    let (status, body) = send(
        app(&f),
        Method::PATCH,
        "/api/products/meta/stock",
        Some(json!({"default_value": "lots"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("default_value: The stock field must be an integer."));

    let (_, body) = send(app(&f), Method::GET, "/api/products/meta/stock", None).await;
    assert_eq!(body["default_value"], json!(0));
}
