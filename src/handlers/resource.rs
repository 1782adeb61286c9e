//! Resource handlers: metadata, list, create, batch update, batch delete, field-config patch.

use crate::error::AppError;
use crate::registry::FieldPatch;
use crate::response::{success_one, success_page};
use crate::service::{parse_ids, ListQuery};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};

/// Extractor failures answer with the same `{error}` envelope as engine errors.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v).map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(e.body_text())
        } else {
            AppError::Unprocessable(format!("Invalid JSON body: {}", e.body_text()))
        }
    })
}

fn query_pairs(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> Result<ListQuery, AppError> {
    let Query(pairs) =
        query.map_err(|e| AppError::Unprocessable(format!("Invalid query string: {}", e.body_text())))?;
    Ok(ListQuery::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))))
}

fn body_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::Unprocessable("body must be a JSON object".into())),
    }
}

/// `data` member of the body; must be an object.
fn take_data(body: &mut Map<String, Value>) -> Result<Map<String, Value>, AppError> {
    match body.remove("data") {
        Some(Value::Object(m)) => Ok(m),
        Some(_) => Err(AppError::Unprocessable("Parameter data must be an object".into())),
        None => Err(AppError::Unprocessable("Parameter data is required".into())),
    }
}

/// Identifier list from a JSON array, a single value, or a comma-separated string.
fn ids_from_json(v: Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
        Value::String(s) => parse_ids(&s),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

pub async fn meta(
    State(state): State<AppState>,
    Path(alias): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.metadata.describe(&alias)?))
}

pub async fn field_meta(
    State(state): State<AppState>,
    Path((alias, field)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.metadata.describe_field(&alias, &field)?))
}

pub async fn patch_field(
    State(state): State<AppState>,
    Path((alias, field)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let patch: FieldPatch = serde_json::from_value(json_body(body)?)
        .map_err(|e| AppError::Unprocessable(format!("invalid field patch: {}", e)))?;
    state.registry.update_field_config(&alias, &field, &patch)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn index(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ListQuery { ids, params } = query_pairs(query)?;
    let result = state.crud.list(&alias, ids.as_deref(), &params).await?;
    Ok(success_page(result))
}

pub async fn store(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut body = body_object(json_body(body)?)?;
    let data = take_data(&mut body)?;
    let created = state.crud.create(&alias, data).await?;
    Ok(success_one(created))
}

pub async fn update(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut body = body_object(json_body(body)?)?;
    let ids = body
        .remove("ids")
        .map(ids_from_json)
        .ok_or_else(|| AppError::Unprocessable("Parameter ids is required".into()))?;
    let data = take_data(&mut body)?;
    state.crud.update(&alias, &ids, data).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn destroy(
    State(state): State<AppState>,
    Path(alias): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let ListQuery { ids, .. } = query_pairs(query)?;
    let ids = ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| AppError::Unprocessable("Parameter id is required".into()))?;
    state.crud.delete(&alias, &ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
