//! Clip endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use livegraph_core::NotesDictionary;
use livegraph_graph::{Clip, ClipProperties};

use crate::models::{ErrorResponse, NoteIds, NotesWindow};
use crate::routes::upstream_error;
use crate::AppState;

type RouteResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// PATCH /clips/:id - Set clip properties, return the refreshed clip
pub async fn update_properties(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<ClipProperties>,
) -> RouteResult<Clip> {
    state
        .graph
        .clip_set_properties(id, &body)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// GET /clips/:id/notes - Notes within a pitch/time window
pub async fn get_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(window): Query<NotesWindow>,
) -> RouteResult<NotesDictionary> {
    state
        .graph
        .clip_get_notes_extended(
            id,
            window.from_pitch,
            window.pitch_span,
            window.from_time,
            window.time_span,
        )
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// POST /clips/:id/notes - Add new notes, return the refreshed clip
pub async fn add_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<NotesDictionary>,
) -> RouteResult<Clip> {
    state
        .graph
        .clip_add_new_notes(id, &body)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// PATCH /clips/:id/notes - Modify existing notes by note id
pub async fn modify_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<NotesDictionary>,
) -> RouteResult<Clip> {
    state
        .graph
        .clip_apply_note_modifications(id, &body)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// DELETE /clips/:id/notes - Remove notes by note id
pub async fn remove_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<NoteIds>,
) -> RouteResult<Clip> {
    state
        .graph
        .clip_remove_notes_by_id(id, &body.ids)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// GET /clips/:id/notes/selected - The host's current note selection
pub async fn selected_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> RouteResult<NotesDictionary> {
    state
        .graph
        .clip_get_selected_notes_extended(id)
        .await
        .map(Json)
        .map_err(upstream_error)
}

/// POST /clips/:id/notes/select-all - Select every note in the clip
pub async fn select_all_notes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> RouteResult<Clip> {
    state
        .graph
        .clip_select_all_notes(id)
        .await
        .map(Json)
        .map_err(upstream_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use livegraph_bridge::{Bridge, MemoryModel};
    use livegraph_core::LiveClient;
    use livegraph_graph::GraphClient;

    fn state() -> Arc<AppState> {
        let (client, mut rx) = LiveClient::new();
        let bridge = Bridge::new(MemoryModel::demo_song());
        let router = client.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Some(result) = bridge.handle_message(frame.kind.as_str(), &frame.payload) {
                    router.handle_result(&result);
                }
            }
        });
        Arc::new(AppState {
            graph: GraphClient::new(client),
        })
    }

    #[tokio::test]
    async fn test_get_song_handler() {
        let Json(song) = crate::routes::song::get_song(State(state())).await.unwrap();
        assert_eq!(song.id, 2);
        assert_eq!(song.tracks.len(), 2);
    }

    #[tokio::test]
    async fn test_update_properties_handler() {
        let Json(clip) = update_properties(
            State(state()),
            Path(17),
            Json(ClipProperties {
                name: Some("Hook".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(clip.name.as_deref(), Some("Hook"));
    }

    #[tokio::test]
    async fn test_get_notes_handler_sorted_window() {
        let Json(dict) = get_notes(
            State(state()),
            Path(17),
            Query(NotesWindow {
                from_pitch: 0,
                pitch_span: 128,
                from_time: 0.0,
                time_span: 4.0,
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            dict.notes
                .iter()
                .map(|note| note.start_time.unwrap())
                .collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0]
        );
    }

    #[tokio::test]
    async fn test_failing_route_maps_to_error_envelope() {
        let result = selected_notes(State(state()), Path(9999)).await;
        let (status, Json(body)) = result.err().unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "internal_error");
        assert!(body.message.contains("invalid object reference"));
    }
}
