//! Request and response models for the HTTP API.
//!
//! Graph nodes serialize as-is; only the error envelope and the small
//! request bodies live here.

use serde::{Deserialize, Serialize};

/// JSON error envelope returned by every failing route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }

    pub fn internal(message: &str) -> Self {
        Self::new("internal_error", message)
    }
}

/// Body of `PUT /tracks/:id/name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackNameUpdate {
    pub name: String,
}

/// Query window of `GET /clips/:id/notes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesWindow {
    pub from_pitch: i64,
    pub pitch_span: i64,
    pub from_time: f64,
    pub time_span: f64,
}

/// Body of `DELETE /clips/:id/notes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteIds {
    pub ids: Vec<i64>,
}
