//! Wire shapes for the bridge channel.
//!
//! Everything that crosses the channel is JSON carried as an opaque string
//! over a tagged duplex transport. Outgoing frames are tagged with the
//! action kind; inbound frames are tagged `result`. The types here are the
//! single vocabulary for both directions, so matching on a message is
//! exhaustive instead of an ad hoc field-presence check.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a remote object: a resolved non-negative integer id, or a
/// path string resolved lazily by the bridge.
///
/// A resolved id of `0` means "no such object" in the host's id space and
/// never identifies a real object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    /// Resolved integer id.
    Id(i64),
    /// Textual path, e.g. `live_set tracks 0 clip_slots 0 clip`.
    Path(String),
}

impl From<i64> for ObjectRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ObjectRef {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for ObjectRef {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {}", id),
            Self::Path(path) => write!(f, "{}", path),
        }
    }
}

/// The kind of a dispatched action. Doubles as the channel tag of the
/// outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Get,
    Set,
    Call,
}

impl ActionKind {
    /// The channel tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Call => "call",
        }
    }

    /// Parse a channel tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "get" => Some(Self::Get),
            "set" => Some(Self::Set),
            "call" => Some(Self::Call),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing action as serialized onto the channel:
/// `{actionId, action, idOrPath, ...kind-specific fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(rename = "actionId")]
    pub action_id: u64,
    #[serde(flatten)]
    pub params: ActionParams,
}

/// Kind-specific action parameters, tagged by the `action` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ActionParams {
    /// Flatten selected properties and children of one object into a
    /// snapshot record.
    #[serde(rename_all = "camelCase")]
    Get {
        id_or_path: ObjectRef,
        /// Keys included only when the property read yields exactly one value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property_keys_single: Option<Vec<String>>,
        /// Keys included as the full value sequence.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property_keys_multiple: Option<Vec<String>>,
        /// Keys read as a tagged `(marker, id)` pair; sentinel 0 becomes null.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        child_keys_single: Option<Vec<String>>,
        /// Keys read as a marker/id alternation; only the ids are kept.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        child_keys_multiple: Option<Vec<String>>,
    },
    /// Write one property.
    #[serde(rename_all = "camelCase")]
    Set {
        id_or_path: ObjectRef,
        property: String,
        value: Value,
    },
    /// Invoke a method. `args` starts with the method name; each list in
    /// `more` is applied afterwards to the same resolved object, and the
    /// last result wins.
    #[serde(rename_all = "camelCase")]
    Call {
        id_or_path: ObjectRef,
        args: Vec<Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        more: Vec<Vec<Value>>,
    },
}

impl ActionParams {
    /// The kind of action these parameters describe.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Get { .. } => ActionKind::Get,
            Self::Set { .. } => ActionKind::Set,
            Self::Call { .. } => ActionKind::Call,
        }
    }

    /// The addressed object.
    pub fn id_or_path(&self) -> &ObjectRef {
        match self {
            Self::Get { id_or_path, .. }
            | Self::Set { id_or_path, .. }
            | Self::Call { id_or_path, .. } => id_or_path,
        }
    }
}

/// One inbound result, tagged by the `status` field:
/// `{status, actionId, data?|message?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActionResult {
    #[serde(rename_all = "camelCase")]
    Succeeded {
        action_id: u64,
        #[serde(default)]
        data: Value,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        action_id: u64,
        #[serde(default)]
        message: String,
    },
}

impl ActionResult {
    /// The id of the action this result settles.
    pub fn action_id(&self) -> u64 {
        match self {
            Self::Succeeded { action_id, .. } | Self::Failed { action_id, .. } => *action_id,
        }
    }
}

/// The flattened result of a `get` action.
///
/// Always carries `id`, `path` and `type`; every other key is one the
/// caller selected, with values per the flattening rules on
/// [`ActionParams::Get`]. A single-child key holds either an integer id or
/// null; the sentinel 0 never appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: i64,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl ObjectSnapshot {
    /// Raw field value, if the key was selected and survived flattening.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Integer-valued field.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }

    /// Float-valued field (integers widen).
    pub fn float(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// String-valued field.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Single-child reference: `Some(id)` when the relation is populated,
    /// `None` when it was null or not selected.
    pub fn child(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_i64)
    }

    /// Multi-child reference: the ordered child ids, empty when absent.
    pub fn children(&self, key: &str) -> Vec<i64> {
        match self.fields.get(key).and_then(Value::as_array) {
            Some(values) => values.iter().filter_map(Value::as_i64).collect(),
            None => Vec::new(),
        }
    }
}
