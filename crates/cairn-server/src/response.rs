//! The uniform response envelope.
//!
//! Every endpoint answers `{"success": true, "data": ..., "pagination"?}`
//! or `{"success": false, "message": ...}` (see [`crate::error`]). Nothing
//! else ever goes over the wire.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cairn_core::page::Page;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

/// 200 with a data payload.
pub fn ok<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(Envelope { success: true, data, pagination: None }),
    )
        .into_response()
}

/// 201 for successful creation.
pub fn created<T: Serialize>(data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(Envelope { success: true, data, pagination: None }),
    )
        .into_response()
}

/// 200 with a data array and pagination block.
pub fn paged<T: Serialize>(page: Page<T>) -> Response {
    let meta = PageMeta {
        page: page.page,
        limit: page.limit,
        total: page.total,
        pages: page.pages(),
    };
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            data: page.items,
            pagination: Some(meta),
        }),
    )
        .into_response()
}
