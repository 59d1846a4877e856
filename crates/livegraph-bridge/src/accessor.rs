//! Remote object accessor: action execution and snapshot flattening.
//!
//! One function per action kind, all operating through the
//! [`ObjectModel`] capability interface. `get` flattens the selected
//! properties and children of one object into a plain record; `set` and
//! `call` pass the host's answers through untouched.

use serde_json::{Map, Value};

use livegraph_core::protocol::{ActionParams, ObjectRef};

use crate::model::{coerce_id, ObjectHandle, ObjectModel, Result};

/// Marker token the host emits before each id in child reads.
const ID_MARKER: &str = "id";

/// Execute one action against the model, returning the `data` value of a
/// succeeded result. Every failure on the way (resolution, read, write,
/// invoke) propagates and becomes a single failed result upstream.
pub fn perform<M: ObjectModel>(model: &M, params: &ActionParams) -> Result<Value> {
    match params {
        ActionParams::Get {
            id_or_path,
            property_keys_single,
            property_keys_multiple,
            child_keys_single,
            child_keys_multiple,
        } => perform_get(
            model,
            id_or_path,
            property_keys_single.as_deref().unwrap_or(&[]),
            property_keys_multiple.as_deref().unwrap_or(&[]),
            child_keys_single.as_deref().unwrap_or(&[]),
            child_keys_multiple.as_deref().unwrap_or(&[]),
        ),
        ActionParams::Set {
            id_or_path,
            property,
            value,
        } => perform_set(model, id_or_path, property, value),
        ActionParams::Call {
            id_or_path,
            args,
            more,
        } => perform_call(model, id_or_path, args, more),
    }
}

/// Flatten selected properties and children into a snapshot record.
///
/// The record always carries `id`, `path` and `type`. A "single" property
/// key is included only when its read yields exactly one value; any other
/// arity silently omits the key. A single-child read is a tagged
/// `(marker, id)` pair whose sentinel 0 becomes an explicit null. A
/// multi-child read keeps only the ids, markers stripped, sentinel left
/// alone.
fn perform_get<M: ObjectModel>(
    model: &M,
    target: &ObjectRef,
    property_keys_single: &[String],
    property_keys_multiple: &[String],
    child_keys_single: &[String],
    child_keys_multiple: &[String],
) -> Result<Value> {
    let live = model.resolve(target)?;

    let mut record = Map::new();
    record.insert("id".to_string(), Value::from(live.id()));
    record.insert("path".to_string(), Value::from(live.path()));
    record.insert("type".to_string(), Value::from(live.kind()));

    for key in property_keys_single {
        let mut values = live.read(key)?;
        if values.len() == 1 {
            record.insert(key.clone(), values.remove(0));
        }
    }

    for key in property_keys_multiple {
        record.insert(key.clone(), Value::Array(live.read(key)?));
    }

    for key in child_keys_single {
        let values = live.read(key)?;
        match values.get(1).and_then(coerce_id) {
            Some(0) => {
                record.insert(key.clone(), Value::Null);
            }
            Some(id) => {
                record.insert(key.clone(), Value::from(id));
            }
            None => {
                log::debug!("child key '{}' did not read as a tagged pair, omitted", key);
            }
        }
    }

    for key in child_keys_multiple {
        let ids: Vec<Value> = live
            .read(key)?
            .into_iter()
            .filter(|value| value.as_str() != Some(ID_MARKER))
            .collect();
        record.insert(key.clone(), Value::Array(ids));
    }

    Ok(Value::Object(record))
}

fn perform_set<M: ObjectModel>(
    model: &M,
    target: &ObjectRef,
    property: &str,
    value: &Value,
) -> Result<Value> {
    let live = model.resolve(target)?;
    live.write(property, value)
}

/// Invoke the first argument list, then apply each list from `more` to the
/// same resolved object; the last result wins.
fn perform_call<M: ObjectModel>(
    model: &M,
    target: &ObjectRef,
    args: &[Value],
    more: &[Vec<Value>],
) -> Result<Value> {
    let live = model.resolve(target)?;
    let mut result = live.invoke(args)?;
    for extra in more {
        result = live.invoke(extra)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;
    use crate::model::ModelError;
    use livegraph_core::NotesDictionary;
    use serde_json::json;

    fn get_params(
        target: ObjectRef,
        single: &[&str],
        multiple: &[&str],
        child_single: &[&str],
        child_multiple: &[&str],
    ) -> ActionParams {
        let keys = |keys: &[&str]| -> Option<Vec<String>> {
            if keys.is_empty() {
                None
            } else {
                Some(keys.iter().map(|k| k.to_string()).collect())
            }
        };
        ActionParams::Get {
            id_or_path: target,
            property_keys_single: keys(single),
            property_keys_multiple: keys(multiple),
            child_keys_single: keys(child_single),
            child_keys_multiple: keys(child_multiple),
        }
    }

    #[test]
    fn test_get_header_and_single_properties() {
        let model = MemoryModel::demo_song();
        let data = perform(
            &model,
            &get_params(ObjectRef::from("live_set"), &["is_playing"], &[], &[], &[]),
        )
        .unwrap();
        assert_eq!(data["id"], json!(2));
        assert_eq!(data["path"], json!("live_set"));
        assert_eq!(data["type"], json!("Song"));
        assert_eq!(data["is_playing"], json!(0));
    }

    #[test]
    fn test_single_key_with_wrong_arity_is_omitted() {
        let model = MemoryModel::demo_song();
        // available_warp_modes has several values; unknown has none.
        let data = perform(
            &model,
            &get_params(
                ObjectRef::Id(17),
                &["name", "available_warp_modes", "unknown_property"],
                &[],
                &[],
                &[],
            ),
        )
        .unwrap();
        assert_eq!(data["name"], json!("Bassline"));
        assert!(data.get("available_warp_modes").is_none());
        assert!(data.get("unknown_property").is_none());
    }

    #[test]
    fn test_multiple_key_kept_as_sequence() {
        let model = MemoryModel::demo_song();
        let data = perform(
            &model,
            &get_params(ObjectRef::Id(17), &[], &["available_warp_modes"], &[], &[]),
        )
        .unwrap();
        assert_eq!(data["available_warp_modes"], json!([0, 1, 2]));
    }

    #[test]
    fn test_single_child_sentinel_becomes_null() {
        let model = MemoryModel::demo_song();
        // Slot 5 holds clip 17; slot 6 holds nothing.
        let populated = perform(
            &model,
            &get_params(ObjectRef::Id(5), &["has_clip"], &[], &["clip"], &[]),
        )
        .unwrap();
        assert_eq!(populated["clip"], json!(17));

        let empty = perform(
            &model,
            &get_params(ObjectRef::Id(6), &["has_clip"], &[], &["clip"], &[]),
        )
        .unwrap();
        assert_eq!(empty["clip"], json!(null));
    }

    #[test]
    fn test_multi_child_markers_stripped_sentinel_kept() {
        let model = MemoryModel::demo_song();
        model.add_object(90, "live_set oddities", "Oddity");
        model.link_multiple(90, "things", vec![0, 5, 12]);

        let data = perform(
            &model,
            &get_params(ObjectRef::Id(90), &[], &[], &[], &["things"]),
        )
        .unwrap();
        // Markers go; the zero stays untranslated in the multi form.
        assert_eq!(data["things"], json!([0, 5, 12]));
    }

    #[test]
    fn test_get_invalid_reference_fails() {
        let model = MemoryModel::demo_song();
        let err = perform(
            &model,
            &get_params(ObjectRef::from("live_set nowhere"), &[], &[], &[], &[]),
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidReference(_)));

        let err = perform(&model, &get_params(ObjectRef::Id(0), &[], &[], &[], &[])).unwrap_err();
        assert!(matches!(err, ModelError::InvalidReference(_)));
    }

    #[test]
    fn test_set_writes_and_passes_ack_through() {
        let model = MemoryModel::demo_song();
        let ack = perform(
            &model,
            &ActionParams::Set {
                id_or_path: ObjectRef::Id(3),
                property: "name".to_string(),
                value: json!("Sub Bass"),
            },
        )
        .unwrap();
        assert_eq!(ack, json!("Sub Bass"));

        let data = perform(&model, &get_params(ObjectRef::Id(3), &["name"], &[], &[], &[])).unwrap();
        assert_eq!(data["name"], json!("Sub Bass"));
    }

    #[test]
    fn test_batched_call_shares_one_resolution() {
        let model = MemoryModel::demo_song();
        // Select everything, then read the selection, as one action.
        let data = perform(
            &model,
            &ActionParams::Call {
                id_or_path: ObjectRef::Id(17),
                args: vec![json!("select_all_notes")],
                more: vec![vec![json!("get_selected_notes_extended")]],
            },
        )
        .unwrap();
        let dict = NotesDictionary::from_host_json(data.as_str().unwrap()).unwrap();
        assert_eq!(dict.notes.len(), 3);
    }

    #[test]
    fn test_unknown_method_fails_invocation() {
        let model = MemoryModel::demo_song();
        let err = perform(
            &model,
            &ActionParams::Call {
                id_or_path: ObjectRef::Id(17),
                args: vec![json!("quantize_everything")],
                more: vec![],
            },
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Invocation { .. }));
    }
}
