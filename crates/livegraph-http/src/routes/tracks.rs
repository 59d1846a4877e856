//! Track endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use livegraph_graph::Track;

use crate::models::{ErrorResponse, TrackNameUpdate};
use crate::routes::upstream_error;
use crate::AppState;

/// PUT /tracks/:id/name - Rename a track, return the refreshed track
pub async fn set_name(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<TrackNameUpdate>,
) -> Result<Json<Track>, (StatusCode, Json<ErrorResponse>)> {
    state
        .graph
        .track_set_name(id, &body.name)
        .await
        .map(Json)
        .map_err(upstream_error)
}
