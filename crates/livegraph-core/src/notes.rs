//! Note records and the canonical note ordering.
//!
//! The host's note-query methods hand their result back as a JSON string.
//! [`NotesDictionary::from_host_json`] is the one boundary where that text
//! enters the graph; it parses and applies the canonical ordering in the
//! same step, so callers never see host order.

use serde::{Deserialize, Serialize};

/// A single MIDI note as the host reports it.
///
/// Only `pitch` is always present. Boolean-ish host values (`mute`) stay
/// numeric, matching the host's encoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_id: Option<i64>,
    pub pitch: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_deviation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_velocity: Option<f64>,
}

/// An ordered sequence of notes, as exchanged with the host's note
/// operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotesDictionary {
    pub notes: Vec<Note>,
}

impl NotesDictionary {
    /// Parse the JSON text a host note query returns and apply the
    /// canonical ordering.
    pub fn from_host_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut dict: NotesDictionary = serde_json::from_str(json)?;
        sort_notes(&mut dict.notes);
        Ok(dict)
    }
}

/// Order notes by start time ascending, ties broken by pitch ascending.
/// A missing start time orders as 0.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        let at = a.start_time.unwrap_or(0.0);
        let bt = b.start_time.unwrap_or(0.0);
        at.total_cmp(&bt).then_with(|| a.pitch.cmp(&b.pitch))
    });
}
