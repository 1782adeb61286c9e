//! Standard response envelope helpers.

use crate::service::PagedResult;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

/// Single-entity envelope: `{data: {...}}`.
#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

/// Listing envelope: `{pagination: {...}, data: [...]}`.
#[derive(Serialize)]
pub struct SuccessPage {
    pub pagination: PaginationMeta,
    pub data: Vec<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total_records: u64,
    pub total_pages: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_page(result: PagedResult) -> (StatusCode, Json<SuccessPage>) {
    let pagination = PaginationMeta {
        page: result.page,
        per_page: result.per_page,
        total_records: result.total_records,
        total_pages: result.total_pages,
    };
    (
        StatusCode::OK,
        Json(SuccessPage {
            pagination,
            data: result.data,
        }),
    )
}
