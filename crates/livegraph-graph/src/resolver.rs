//! Graph resolvers: one function per field, composed into whole nodes.
//!
//! Every resolver is a pure function of its inputs that issues zero or
//! more actions through the client and awaits their settlement. Queries
//! re-expand child ids recursively; mutations perform their action and
//! then re-fetch the canonical node, never trusting the mutation's own
//! return value. Nothing here retries and nothing is cached.

use anyhow::{anyhow, Context, Result};
use futures::future::try_join_all;
use serde_json::{json, Value};

use livegraph_core::{LiveClient, NotesDictionary, ObjectSnapshot};

use crate::nodes::{Clip, ClipProperties, ClipSlot, Song, SongView, Track};

/// Well-known path of the root object.
const ROOT_PATH: &str = "live_set";

/// Property keys a clip snapshot always asks for.
const CLIP_PROPERTY_KEYS: [&str; 8] = [
    "end_time",
    "is_arrangement_clip",
    "is_midi_clip",
    "length",
    "name",
    "signature_denominator",
    "signature_numerator",
    "start_time",
];

/// Full pitch range of the host's note space.
const PITCH_SPAN: i64 = 128;

/// The graph surface over one action client.
#[derive(Clone)]
pub struct GraphClient {
    client: LiveClient,
}

impl GraphClient {
    pub fn new(client: LiveClient) -> Self {
        Self { client }
    }

    /// The underlying action client.
    pub fn live(&self) -> &LiveClient {
        &self.client
    }

    // ========================================================================
    // Query resolvers
    // ========================================================================

    /// Query entry point: the whole song, recursively resolved.
    pub async fn song(&self) -> Result<Song> {
        let snapshot = self
            .client
            .get(ROOT_PATH, &["is_playing"], &[], &["view"], &["tracks"])
            .await
            .context("fetching song snapshot")?;

        let view_id = snapshot
            .child("view")
            .ok_or_else(|| anyhow!("song snapshot has no view reference"))?;
        let track_ids = snapshot.children("tracks");

        let (view, tracks) = futures::try_join!(
            self.song_view(view_id),
            try_join_all(track_ids.iter().map(|id| self.track(*id))),
        )?;

        Ok(Song {
            id: snapshot.id,
            path: snapshot.path.clone(),
            is_playing: required_int(&snapshot, "is_playing")?,
            view,
            tracks,
        })
    }

    pub async fn song_view(&self, id: i64) -> Result<SongView> {
        let snapshot = self
            .client
            .get(id, &[], &[], &["detail_clip", "selected_track"], &[])
            .await
            .context("fetching song view snapshot")?;

        let (selected_track, detail_clip) = futures::join!(
            async {
                match snapshot.child("selected_track") {
                    Some(track_id) => nullable("selected_track", self.track(track_id)).await,
                    None => None,
                }
            },
            async {
                match snapshot.child("detail_clip") {
                    Some(clip_id) => nullable("detail_clip", self.clip(clip_id)).await,
                    None => None,
                }
            },
        );

        Ok(SongView {
            id: snapshot.id,
            path: snapshot.path,
            selected_track,
            detail_clip,
        })
    }

    pub async fn track(&self, id: i64) -> Result<Track> {
        let snapshot = self
            .client
            .get(id, &["has_midi_input", "name"], &[], &[], &["clip_slots"])
            .await
            .with_context(|| format!("fetching track {} snapshot", id))?;

        let clip_slots = try_join_all(
            snapshot
                .children("clip_slots")
                .iter()
                .map(|slot_id| self.clip_slot(*slot_id)),
        )
        .await?;

        Ok(Track {
            id: snapshot.id,
            path: snapshot.path.clone(),
            has_midi_input: required_int(&snapshot, "has_midi_input")?,
            name: snapshot.string("name").map(str::to_string),
            clip_slots,
        })
    }

    pub async fn clip_slot(&self, id: i64) -> Result<ClipSlot> {
        let snapshot = self
            .client
            .get(id, &["has_clip"], &[], &["clip"], &[])
            .await
            .with_context(|| format!("fetching clip slot {} snapshot", id))?;

        let clip = match snapshot.child("clip") {
            Some(clip_id) => nullable("clip", self.clip(clip_id)).await,
            None => None,
        };

        Ok(ClipSlot {
            id: snapshot.id,
            path: snapshot.path.clone(),
            has_clip: required_int(&snapshot, "has_clip")?,
            clip,
        })
    }

    pub async fn clip(&self, id: i64) -> Result<Clip> {
        let snapshot = self
            .client
            .get(id, &CLIP_PROPERTY_KEYS, &[], &[], &[])
            .await
            .with_context(|| format!("fetching clip {} snapshot", id))?;

        // Note data exists only behind MIDI clips; anything else resolves
        // to null without touching the host again.
        let notes = if snapshot.int("is_midi_clip").unwrap_or(0) != 0 {
            let length = snapshot.float("length").unwrap_or(0.0);
            nullable(
                "notes",
                self.clip_get_notes_extended(id, 0, PITCH_SPAN, 0.0, length),
            )
            .await
            .map(|dict| dict.notes)
        } else {
            None
        };

        Ok(Clip {
            id: snapshot.id,
            path: snapshot.path.clone(),
            end_time: snapshot.float("end_time"),
            is_arrangement_clip: snapshot.int("is_arrangement_clip"),
            is_midi_clip: snapshot.int("is_midi_clip"),
            length: snapshot.float("length"),
            name: snapshot.string("name").map(str::to_string),
            signature_denominator: snapshot.int("signature_denominator"),
            signature_numerator: snapshot.int("signature_numerator"),
            start_time: snapshot.float("start_time"),
            notes,
        })
    }

    // ========================================================================
    // Mutation resolvers
    // ========================================================================

    pub async fn song_start_playing(&self, id: i64) -> Result<Song> {
        self.client.call(id, vec![json!("start_playing")]).await?;
        self.song().await
    }

    pub async fn song_stop_playing(&self, id: i64) -> Result<Song> {
        self.client.call(id, vec![json!("stop_playing")]).await?;
        self.song().await
    }

    pub async fn track_set_name(&self, id: i64, name: &str) -> Result<Track> {
        self.client.set(id, "name", json!(name)).await?;
        self.track(id).await
    }

    /// Set several independent clip properties as one unordered batch.
    ///
    /// One `set` action per present field, all in flight together; their
    /// relative effect order on the host is unspecified. The re-fetch
    /// afterwards is the only consistency point.
    pub async fn clip_set_properties(&self, id: i64, properties: &ClipProperties) -> Result<Clip> {
        let mut pending = Vec::new();
        if let Some(name) = &properties.name {
            pending.push(self.client.set(id, "name", json!(name)));
        }
        if let Some(denominator) = properties.signature_denominator {
            pending.push(self.client.set(id, "signature_denominator", json!(denominator)));
        }
        if let Some(numerator) = properties.signature_numerator {
            pending.push(self.client.set(id, "signature_numerator", json!(numerator)));
        }
        try_join_all(pending).await?;
        self.clip(id).await
    }

    pub async fn clip_add_new_notes(&self, id: i64, notes: &NotesDictionary) -> Result<Clip> {
        self.client
            .call(id, vec![json!("add_new_notes"), serde_json::to_value(notes)?])
            .await?;
        self.clip(id).await
    }

    pub async fn clip_apply_note_modifications(
        &self,
        id: i64,
        notes: &NotesDictionary,
    ) -> Result<Clip> {
        self.client
            .call(
                id,
                vec![
                    json!("apply_note_modifications"),
                    serde_json::to_value(notes)?,
                ],
            )
            .await?;
        self.clip(id).await
    }

    pub async fn clip_get_notes_extended(
        &self,
        id: i64,
        from_pitch: i64,
        pitch_span: i64,
        from_time: f64,
        time_span: f64,
    ) -> Result<NotesDictionary> {
        let data = self
            .client
            .call(
                id,
                vec![
                    json!("get_notes_extended"),
                    json!(from_pitch),
                    json!(pitch_span),
                    json!(from_time),
                    json!(time_span),
                ],
            )
            .await?;
        parse_notes(data)
    }

    pub async fn clip_get_selected_notes_extended(&self, id: i64) -> Result<NotesDictionary> {
        let data = self
            .client
            .call(id, vec![json!("get_selected_notes_extended")])
            .await?;
        parse_notes(data)
    }

    pub async fn clip_select_all_notes(&self, id: i64) -> Result<Clip> {
        self.client
            .call(id, vec![json!("select_all_notes")])
            .await?;
        self.clip(id).await
    }

    pub async fn clip_remove_notes_by_id(&self, id: i64, note_ids: &[i64]) -> Result<Clip> {
        let mut args = vec![json!("remove_notes_by_id")];
        args.extend(note_ids.iter().map(|note_id| json!(note_id)));
        self.client.call(id, args).await?;
        self.clip(id).await
    }
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient").finish_non_exhaustive()
    }
}

/// Resolve a nullable relation: a failure nulls this field alone, after
/// being surfaced once, and leaves sibling fields untouched.
async fn nullable<T>(
    field: &str,
    resolving: impl std::future::Future<Output = Result<T>>,
) -> Option<T> {
    match resolving.await {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("field '{}' failed to resolve, returning null: {:#}", field, err);
            None
        }
    }
}

fn required_int(snapshot: &ObjectSnapshot, key: &str) -> Result<i64> {
    snapshot
        .int(key)
        .ok_or_else(|| anyhow!("required field '{}' missing from {} snapshot", key, snapshot.kind))
}

/// The single boundary where raw host note text enters the graph; parsing
/// and the canonical ordering happen here and nowhere else.
fn parse_notes(data: Value) -> Result<NotesDictionary> {
    let text = data
        .as_str()
        .ok_or_else(|| anyhow!("note query returned non-string data"))?;
    NotesDictionary::from_host_json(text).context("parsing host notes dictionary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use livegraph_bridge::{Bridge, MemoryModel};
    use livegraph_core::{ActionKind, Note};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct ActionCounts {
        gets: AtomicUsize,
        sets: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ActionCounts {
        fn bump(&self, kind: ActionKind) {
            let counter = match kind {
                ActionKind::Get => &self.gets,
                ActionKind::Set => &self.sets,
                ActionKind::Call => &self.calls,
            };
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Wire a graph client straight onto an in-process bridge, counting
    /// frames by kind on the way through.
    fn connect(model: MemoryModel) -> (GraphClient, Arc<ActionCounts>) {
        let (client, mut rx) = LiveClient::new();
        let counts = Arc::new(ActionCounts::default());
        let bridge = Bridge::new(model);
        let router = client.clone();
        let loop_counts = counts.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                loop_counts.bump(frame.kind);
                if let Some(result) = bridge.handle_message(frame.kind.as_str(), &frame.payload) {
                    router.handle_result(&result);
                }
            }
        });
        (GraphClient::new(client), counts)
    }

    #[tokio::test]
    async fn test_song_query_resolves_whole_tree() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let song = graph.song().await.unwrap();

        assert_eq!(song.id, 2);
        assert_eq!(song.is_playing, 0);
        assert_eq!(song.tracks.len(), 2);
        assert_eq!(song.tracks[0].name.as_deref(), Some("Bass"));
        assert_eq!(song.tracks[0].clip_slots.len(), 2);

        let slot = &song.tracks[0].clip_slots[0];
        assert_eq!(slot.has_clip, 1);
        let clip = slot.clip.as_ref().unwrap();
        assert_eq!(clip.name.as_deref(), Some("Bassline"));
        assert_eq!(clip.is_midi_clip, Some(1));

        // The empty slot's sentinel arrived as an explicit null.
        assert!(song.tracks[0].clip_slots[1].clip.is_none());

        let view = &song.view;
        assert_eq!(view.selected_track.as_ref().unwrap().id, 3);
        assert_eq!(view.detail_clip.as_ref().unwrap().id, 17);
    }

    #[tokio::test]
    async fn test_clip_notes_arrive_in_canonical_order() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let clip = graph.clip(17).await.unwrap();
        let notes = clip.notes.unwrap();
        assert_eq!(
            notes
                .iter()
                .map(|note| (note.start_time.unwrap(), note.pitch))
                .collect::<Vec<_>>(),
            vec![(0.0, 36), (1.0, 38), (2.0, 36)]
        );
    }

    #[tokio::test]
    async fn test_non_midi_clip_nulls_notes_without_any_call() {
        let model = MemoryModel::demo_song();
        model.add_object(21, "live_set tracks 1 clip_slots 0 clip", "Clip");
        model.set_property(21, "is_midi_clip", vec![json!(0)]);
        model.set_property(21, "length", vec![json!(8.0)]);

        let (graph, counts) = connect(model);
        let clip = graph.clip(21).await.unwrap();
        assert!(clip.notes.is_none());
        assert_eq!(counts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_nullable_child_nulls_only_that_field() {
        let model = MemoryModel::demo_song();
        // Point the view at a clip that does not exist.
        model.link_single(14, "detail_clip", 999);

        let (graph, _) = connect(model);
        let view = graph.song_view(14).await.unwrap();
        assert!(view.detail_clip.is_none());
        // The sibling field still resolved.
        assert_eq!(view.selected_track.unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_song_start_and_stop_playing() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let playing = graph.song_start_playing(2).await.unwrap();
        assert_eq!(playing.is_playing, 1);
        let stopped = graph.song_stop_playing(2).await.unwrap();
        assert_eq!(stopped.is_playing, 0);
    }

    #[tokio::test]
    async fn test_track_set_name_refetches() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let track = graph.track_set_name(3, "Sub Bass").await.unwrap();
        assert_eq!(track.name.as_deref(), Some("Sub Bass"));
    }

    #[tokio::test]
    async fn test_clip_set_properties_issues_one_set_per_present_field() {
        let (graph, counts) = connect(MemoryModel::demo_song());
        let clip = graph
            .clip_set_properties(
                17,
                &ClipProperties {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(clip.name.as_deref(), Some("Renamed"));
        assert_eq!(counts.sets.load(Ordering::SeqCst), 1);
        assert_eq!(counts.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clip_set_properties_with_empty_input_only_refetches() {
        let (graph, counts) = connect(MemoryModel::demo_song());
        graph
            .clip_set_properties(17, &ClipProperties::default())
            .await
            .unwrap();
        assert_eq!(counts.sets.load(Ordering::SeqCst), 0);
        assert_eq!(counts.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clip_set_properties_all_fields() {
        let (graph, counts) = connect(MemoryModel::demo_song());
        let clip = graph
            .clip_set_properties(
                17,
                &ClipProperties {
                    name: Some("Waltz".to_string()),
                    signature_denominator: Some(4),
                    signature_numerator: Some(3),
                },
            )
            .await
            .unwrap();
        assert_eq!(clip.signature_numerator, Some(3));
        assert_eq!(counts.sets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_clip_add_new_notes_roundtrip() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let clip = graph
            .clip_add_new_notes(
                17,
                &NotesDictionary {
                    notes: vec![Note {
                        pitch: 48,
                        start_time: Some(0.5),
                        duration: Some(0.25),
                        ..Default::default()
                    }],
                },
            )
            .await
            .unwrap();
        let notes = clip.notes.unwrap();
        assert_eq!(notes.len(), 4);
        // The new note sorted into place.
        assert_eq!(notes[1].pitch, 48);
    }

    #[tokio::test]
    async fn test_clip_apply_note_modifications() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let clip = graph
            .clip_apply_note_modifications(
                17,
                &NotesDictionary {
                    notes: vec![Note {
                        note_id: Some(2),
                        pitch: 43,
                        ..Default::default()
                    }],
                },
            )
            .await
            .unwrap();
        let notes = clip.notes.unwrap();
        assert!(notes
            .iter()
            .any(|note| note.note_id == Some(2) && note.pitch == 43));
    }

    #[tokio::test]
    async fn test_clip_get_notes_extended_window_is_sorted() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let dict = graph
            .clip_get_notes_extended(17, 0, 128, 0.0, 2.5)
            .await
            .unwrap();
        assert_eq!(
            dict.notes.iter().map(|note| note.pitch).collect::<Vec<_>>(),
            vec![36, 38, 36]
        );
        assert_eq!(
            dict.notes
                .iter()
                .map(|note| note.start_time.unwrap())
                .collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0]
        );
    }

    #[tokio::test]
    async fn test_select_all_then_read_selection() {
        let (graph, _) = connect(MemoryModel::demo_song());
        graph.clip_select_all_notes(17).await.unwrap();
        let dict = graph.clip_get_selected_notes_extended(17).await.unwrap();
        assert_eq!(dict.notes.len(), 3);
    }

    #[tokio::test]
    async fn test_clip_remove_notes_by_id() {
        let (graph, _) = connect(MemoryModel::demo_song());
        let clip = graph.clip_remove_notes_by_id(17, &[1, 3]).await.unwrap();
        let notes = clip.notes.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note_id, Some(2));
    }

    #[tokio::test]
    async fn test_query_against_missing_root_fails() {
        let (graph, _) = connect(MemoryModel::new());
        assert!(graph.song().await.is_err());
    }
}
