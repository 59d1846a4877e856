//! In-memory host object model.
//!
//! Stands in for the real host when none is attached: the `sim` subcommand
//! serves it over the bridge protocol, and the test suites across the
//! workspace run against it. It stores properties and child relations in
//! the host's own encodings (value sequences, tagged pairs, marker
//! alternations) so the accessor exercises the same flattening paths as
//! against a live host.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use livegraph_core::{Note, NotesDictionary, ObjectRef};

use crate::model::{ModelError, ObjectHandle, ObjectModel, Result};

#[derive(Debug, Default)]
struct StoredObject {
    path: String,
    kind: String,
    properties: HashMap<String, Vec<Value>>,
    child_single: HashMap<String, i64>,
    child_multiple: HashMap<String, Vec<i64>>,
    notes: Vec<Note>,
    notes_selected: bool,
}

#[derive(Debug, Default)]
struct Store {
    objects: HashMap<i64, StoredObject>,
    by_path: HashMap<String, i64>,
    next_note_id: i64,
}

/// Thread-safe in-memory object tree.
///
/// Cloning is cheap; all clones share the same store.
#[derive(Clone)]
pub struct MemoryModel {
    store: Arc<Mutex<Store>>,
}

impl MemoryModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                next_note_id: 100,
                ..Default::default()
            })),
        }
    }

    /// A small populated set: one song, a MIDI track with a note-bearing
    /// clip and an empty slot, an audio track, and a view pointing at both.
    pub fn demo_song() -> Self {
        let model = Self::new();

        model.add_object(2, "live_set", "Song");
        model.set_property(2, "is_playing", vec![Value::from(0)]);
        model.link_single(2, "view", 14);
        model.link_multiple(2, "tracks", vec![3, 4]);

        model.add_object(14, "live_set view", "Song.View");
        model.link_single(14, "selected_track", 3);
        model.link_single(14, "detail_clip", 17);

        model.add_object(3, "live_set tracks 0", "Track");
        model.set_property(3, "has_midi_input", vec![Value::from(1)]);
        model.set_property(3, "name", vec![Value::from("Bass")]);
        model.link_multiple(3, "clip_slots", vec![5, 6]);

        model.add_object(4, "live_set tracks 1", "Track");
        model.set_property(4, "has_midi_input", vec![Value::from(0)]);
        model.set_property(4, "name", vec![Value::from("Audio")]);
        model.link_multiple(4, "clip_slots", vec![7]);

        model.add_object(5, "live_set tracks 0 clip_slots 0", "ClipSlot");
        model.set_property(5, "has_clip", vec![Value::from(1)]);
        model.link_single(5, "clip", 17);

        model.add_object(6, "live_set tracks 0 clip_slots 1", "ClipSlot");
        model.set_property(6, "has_clip", vec![Value::from(0)]);
        model.link_single(6, "clip", 0);

        model.add_object(7, "live_set tracks 1 clip_slots 0", "ClipSlot");
        model.set_property(7, "has_clip", vec![Value::from(0)]);
        model.link_single(7, "clip", 0);

        model.add_object(17, "live_set tracks 0 clip_slots 0 clip", "Clip");
        model.set_property(17, "end_time", vec![Value::from(4.0)]);
        model.set_property(17, "is_arrangement_clip", vec![Value::from(0)]);
        model.set_property(17, "is_midi_clip", vec![Value::from(1)]);
        model.set_property(17, "length", vec![Value::from(4.0)]);
        model.set_property(17, "name", vec![Value::from("Bassline")]);
        model.set_property(17, "signature_denominator", vec![Value::from(4)]);
        model.set_property(17, "signature_numerator", vec![Value::from(4)]);
        model.set_property(17, "start_time", vec![Value::from(0.0)]);
        model.set_property(
            17,
            "available_warp_modes",
            vec![Value::from(0), Value::from(1), Value::from(2)],
        );
        // Stored out of time order on purpose; the host gives no ordering
        // guarantee and consumers sort at their own boundary.
        model.set_notes(
            17,
            vec![
                demo_note(3, 2.0, 36),
                demo_note(1, 0.0, 36),
                demo_note(2, 1.0, 38),
            ],
        );

        model
    }

    // ========================================================================
    // Tree construction
    // ========================================================================

    /// Insert an object addressable by id and path.
    pub fn add_object(&self, id: i64, path: &str, kind: &str) {
        let mut store = self.lock();
        store.by_path.insert(path.to_string(), id);
        store.objects.insert(
            id,
            StoredObject {
                path: path.to_string(),
                kind: kind.to_string(),
                ..Default::default()
            },
        );
    }

    /// Set a property to a value sequence (arity 1 for plain properties).
    pub fn set_property(&self, id: i64, key: &str, values: Vec<Value>) {
        if let Some(object) = self.lock().objects.get_mut(&id) {
            object.properties.insert(key.to_string(), values);
        }
    }

    /// Link a single-child relation; 0 marks the relation empty.
    pub fn link_single(&self, id: i64, key: &str, child: i64) {
        if let Some(object) = self.lock().objects.get_mut(&id) {
            object.child_single.insert(key.to_string(), child);
        }
    }

    /// Link a multi-child relation.
    pub fn link_multiple(&self, id: i64, key: &str, children: Vec<i64>) {
        if let Some(object) = self.lock().objects.get_mut(&id) {
            object.child_multiple.insert(key.to_string(), children);
        }
    }

    /// Replace an object's notes.
    pub fn set_notes(&self, id: i64, notes: Vec<Note>) {
        if let Some(object) = self.lock().objects.get_mut(&id) {
            object.notes = notes;
            object.notes_selected = false;
        }
    }

    /// Current notes of an object, in storage order.
    pub fn notes(&self, id: i64) -> Vec<Note> {
        self.lock()
            .objects
            .get(&id)
            .map(|object| object.notes.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().expect("memory store lock poisoned")
    }

    fn with_object<R>(&self, id: i64, f: impl FnOnce(&mut Store, &mut StoredObject) -> R) -> Result<R> {
        let mut store = self.lock();
        // Work around the borrow of both the store and one of its objects.
        let mut object = store
            .objects
            .remove(&id)
            .ok_or_else(|| ModelError::InvalidReference(format!("id {}", id)))?;
        let result = f(&mut store, &mut object);
        store.objects.insert(id, object);
        Ok(result)
    }
}

impl std::fmt::Debug for MemoryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryModel")
            .field("objects", &self.lock().objects.len())
            .finish_non_exhaustive()
    }
}

impl ObjectModel for MemoryModel {
    type Handle = MemoryHandle;

    fn resolve(&self, target: &ObjectRef) -> Result<Self::Handle> {
        let id = match target {
            ObjectRef::Id(id) => *id,
            ObjectRef::Path(path) => self.lock().by_path.get(path).copied().unwrap_or(0),
        };
        if id == 0 || !self.lock().objects.contains_key(&id) {
            return Err(ModelError::InvalidReference(target.to_string()));
        }
        Ok(MemoryHandle {
            model: self.clone(),
            id,
        })
    }
}

/// Handle to one object in a [`MemoryModel`].
#[derive(Clone)]
pub struct MemoryHandle {
    model: MemoryModel,
    id: i64,
}

impl ObjectHandle for MemoryHandle {
    fn id(&self) -> i64 {
        self.id
    }

    fn path(&self) -> String {
        self.model
            .lock()
            .objects
            .get(&self.id)
            .map(|object| object.path.clone())
            .unwrap_or_default()
    }

    fn kind(&self) -> String {
        self.model
            .lock()
            .objects
            .get(&self.id)
            .map(|object| object.kind.clone())
            .unwrap_or_default()
    }

    fn read(&self, key: &str) -> Result<Vec<Value>> {
        self.model.with_object(self.id, |_, object| {
            if let Some(child) = object.child_single.get(key) {
                return vec![Value::from(ID_MARKER), Value::from(*child)];
            }
            if let Some(children) = object.child_multiple.get(key) {
                let mut flattened = Vec::with_capacity(children.len() * 2);
                for child in children {
                    flattened.push(Value::from(ID_MARKER));
                    flattened.push(Value::from(*child));
                }
                return flattened;
            }
            object.properties.get(key).cloned().unwrap_or_default()
        })
    }

    fn write(&self, key: &str, value: &Value) -> Result<Value> {
        self.model.with_object(self.id, |_, object| {
            object
                .properties
                .insert(key.to_string(), vec![value.clone()]);
            value.clone()
        })
    }

    fn invoke(&self, args: &[Value]) -> Result<Value> {
        let method = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::Invocation {
                method: "<missing>".to_string(),
                message: "call without a method name".to_string(),
            })?
            .to_string();
        let rest = &args[1..];

        match method.as_str() {
            "start_playing" => self.model.with_object(self.id, |_, object| {
                object
                    .properties
                    .insert("is_playing".to_string(), vec![Value::from(1)]);
                Value::Null
            }),
            "stop_playing" => self.model.with_object(self.id, |_, object| {
                object
                    .properties
                    .insert("is_playing".to_string(), vec![Value::from(0)]);
                Value::Null
            }),
            "select_all_notes" => self.model.with_object(self.id, |_, object| {
                object.notes_selected = true;
                Value::Null
            }),
            "get_notes_extended" => {
                let (from_pitch, pitch_span, from_time, time_span) = match (
                    rest.first().and_then(Value::as_f64),
                    rest.get(1).and_then(Value::as_f64),
                    rest.get(2).and_then(Value::as_f64),
                    rest.get(3).and_then(Value::as_f64),
                ) {
                    (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
                    _ => {
                        return Err(invocation(&method, "expected pitch and time ranges"));
                    }
                };
                let dict = self.model.with_object(self.id, |_, object| NotesDictionary {
                    notes: object
                        .notes
                        .iter()
                        .filter(|note| {
                            let pitch = note.pitch as f64;
                            let start = note.start_time.unwrap_or(0.0);
                            pitch >= from_pitch
                                && pitch < from_pitch + pitch_span
                                && start >= from_time
                                && start < from_time + time_span
                        })
                        .cloned()
                        .collect(),
                })?;
                dict_json(&method, &dict)
            }
            "get_selected_notes_extended" => {
                let dict = self.model.with_object(self.id, |_, object| NotesDictionary {
                    notes: if object.notes_selected {
                        object.notes.clone()
                    } else {
                        Vec::new()
                    },
                })?;
                dict_json(&method, &dict)
            }
            "add_new_notes" => {
                let mut dict = notes_argument(&method, rest)?;
                self.model.with_object(self.id, |store, object| {
                    for note in &mut dict.notes {
                        if note.note_id.is_none() {
                            note.note_id = Some(store.next_note_id);
                            store.next_note_id += 1;
                        }
                    }
                    object.notes.extend(dict.notes.iter().cloned());
                })?;
                dict_json(&method, &dict)
            }
            "apply_note_modifications" => {
                let dict = notes_argument(&method, rest)?;
                self.model.with_object(self.id, |_, object| {
                    for incoming in &dict.notes {
                        let Some(id) = incoming.note_id else { continue };
                        if let Some(stored) = object
                            .notes
                            .iter_mut()
                            .find(|note| note.note_id == Some(id))
                        {
                            apply_modification(stored, incoming);
                        }
                    }
                    Value::Null
                })
            }
            "remove_notes_by_id" => {
                let ids: Vec<i64> = rest.iter().filter_map(Value::as_i64).collect();
                self.model.with_object(self.id, |_, object| {
                    object
                        .notes
                        .retain(|note| !note.note_id.map(|id| ids.contains(&id)).unwrap_or(false));
                    Value::Null
                })
            }
            _ => Err(invocation(&method, "unknown method")),
        }
    }
}

const ID_MARKER: &str = "id";

fn demo_note(note_id: i64, start_time: f64, pitch: i64) -> Note {
    Note {
        note_id: Some(note_id),
        pitch,
        start_time: Some(start_time),
        duration: Some(0.5),
        velocity: Some(100.0),
        mute: Some(0),
        ..Default::default()
    }
}

fn invocation(method: &str, message: &str) -> ModelError {
    ModelError::Invocation {
        method: method.to_string(),
        message: message.to_string(),
    }
}

fn dict_json(method: &str, dict: &NotesDictionary) -> Result<Value> {
    serde_json::to_string(dict)
        .map(Value::from)
        .map_err(|err| invocation(method, &err.to_string()))
}

fn notes_argument(method: &str, rest: &[Value]) -> Result<NotesDictionary> {
    let argument = rest
        .first()
        .ok_or_else(|| invocation(method, "expected a notes dictionary"))?;
    serde_json::from_value(argument.clone())
        .map_err(|err| invocation(method, &format!("bad notes dictionary: {}", err)))
}

/// Overwrite the stored note's fields with whatever the modification
/// carries; absent optional fields leave the stored value alone.
fn apply_modification(stored: &mut Note, incoming: &Note) {
    stored.pitch = incoming.pitch;
    if incoming.start_time.is_some() {
        stored.start_time = incoming.start_time;
    }
    if incoming.duration.is_some() {
        stored.duration = incoming.duration;
    }
    if incoming.velocity.is_some() {
        stored.velocity = incoming.velocity;
    }
    if incoming.mute.is_some() {
        stored.mute = incoming.mute;
    }
    if incoming.probability.is_some() {
        stored.probability = incoming.probability;
    }
    if incoming.velocity_deviation.is_some() {
        stored.velocity_deviation = incoming.velocity_deviation;
    }
    if incoming.release_velocity.is_some() {
        stored.release_velocity = incoming.release_velocity;
    }
}
