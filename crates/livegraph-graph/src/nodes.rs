//! Graph node types.
//!
//! Field sets mirror the host's object model one level at a time. Numeric
//! host booleans (`is_playing`, `has_clip`, ...) stay numeric; a field is
//! optional exactly where the underlying snapshot may omit it or resolve a
//! child reference to null.

use serde::{Deserialize, Serialize};

use livegraph_core::Note;

/// The root of the graph: the host's currently open set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: i64,
    pub path: String,
    pub is_playing: i64,
    pub view: SongView,
    pub tracks: Vec<Track>,
}

/// The song's view state: what the user has focused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongView {
    pub id: i64,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_track: Option<Track>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_clip: Option<Clip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub path: String,
    pub has_midi_input: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub clip_slots: Vec<ClipSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSlot {
    pub id: i64,
    pub path: String,
    pub has_clip: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<Clip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: i64,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_arrangement_clip: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_midi_clip: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_denominator: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_numerator: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    /// Populated only for MIDI clips; always in canonical note order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,
}

/// Input for the composite clip-properties mutation. Absent fields are
/// left untouched on the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_denominator: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_numerator: Option<i64>,
}
