//! Song endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use livegraph_graph::Song;

use crate::models::ErrorResponse;
use crate::routes::upstream_error;
use crate::AppState;

type RouteResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// GET /song - The whole song, recursively resolved
pub async fn get_song(State(state): State<Arc<AppState>>) -> RouteResult<Song> {
    state.graph.song().await.map(Json).map_err(upstream_error)
}

/// POST /song/:id/start - Start playback, return the refreshed song
pub async fn start_playing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> RouteResult<Song> {
    state
        .graph
        .song_start_playing(id)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// POST /song/:id/stop - Stop playback, return the refreshed song
pub async fn stop_playing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> RouteResult<Song> {
    state
        .graph
        .song_stop_playing(id)
        .await
        .map(Json)
        .map_err(upstream_error)
}
