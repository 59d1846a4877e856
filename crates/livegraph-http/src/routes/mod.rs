//! Route handlers for the HTTP API.

pub mod clips;
pub mod song;
pub mod tracks;

use axum::{http::StatusCode, Json};

use crate::models::ErrorResponse;

/// Every route failure maps to one 500 envelope; the resolver's error text
/// carries whatever the host reported.
pub(crate) fn upstream_error(err: anyhow::Error) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal(&format!("{:#}", err))),
    )
}
