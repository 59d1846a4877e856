//! HTTP surface for the LiveGraph query/mutation API.
//!
//! A thin REST layer over [`GraphClient`]: every route body is one
//! resolver call, every failure comes back as a JSON error envelope.
//!
//! # Usage
//!
//! ```ignore
//! use livegraph_graph::GraphClient;
//! use livegraph_http::start_server;
//!
//! tokio::spawn(async move {
//!     start_server(graph, 1606).await
//! });
//! ```

mod models;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use livegraph_graph::GraphClient;

pub use models::{ErrorResponse, NoteIds, NotesWindow, TrackNameUpdate};

/// Shared application state for HTTP handlers.
pub struct AppState {
    /// Graph surface over the host bridge connection.
    pub graph: GraphClient,
}

/// Build the API router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Song
        .route("/song", get(routes::song::get_song))
        .route("/song/:id/start", post(routes::song::start_playing))
        .route("/song/:id/stop", post(routes::song::stop_playing))
        // Tracks
        .route("/tracks/:id/name", put(routes::tracks::set_name))
        // Clips
        .route("/clips/:id", patch(routes::clips::update_properties))
        .route("/clips/:id/notes", get(routes::clips::get_notes))
        .route("/clips/:id/notes", post(routes::clips::add_notes))
        .route("/clips/:id/notes", patch(routes::clips::modify_notes))
        .route("/clips/:id/notes", delete(routes::clips::remove_notes))
        .route("/clips/:id/notes/selected", get(routes::clips::selected_notes))
        .route(
            "/clips/:id/notes/select-all",
            post(routes::clips::select_all_notes),
        )
        // Shared state
        .with_state(state)
        // CORS middleware
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Start the HTTP server on the specified port and serve until the
/// process ends.
pub async fn start_server(graph: GraphClient, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(AppState { graph });
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("HTTP API server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await.context("serving HTTP API")
}
