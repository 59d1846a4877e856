//! Bridge message loop: one inbound action frame in, one result frame out.
//!
//! The loop is deliberately dumb: no reordering, no retries. Whatever
//! comes back from the accessor, data or error, is stamped with the
//! action id and emitted as a single `result` frame.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use livegraph_core::protocol::{ActionEnvelope, ActionKind, ActionResult};
use serde_json::Value;

use crate::accessor;
use crate::model::ObjectModel;

/// Channel tag of every outbound frame.
const RESULT_TAG: &str = "result";

/// The host side of the channel: an object model plus the message loop
/// that runs actions against it.
pub struct Bridge<M: ObjectModel> {
    model: M,
}

impl<M: ObjectModel> Bridge<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Handle one inbound frame and produce the result payload to emit.
    ///
    /// Returns `None` only when the payload cannot be attributed to an
    /// action id at all; such frames are logged and dropped without an
    /// answer, and are never fatal.
    pub fn handle_message(&self, tag: &str, json: &str) -> Option<String> {
        let envelope: ActionEnvelope = match serde_json::from_str(json) {
            Ok(envelope) => envelope,
            Err(err) => {
                // Salvage the action id if the payload got that far, so the
                // client's entry does not dangle.
                return match salvage_action_id(json) {
                    Some(id) => Some(failed(id, format!("malformed action: {}", err))),
                    None => {
                        log::warn!("unparseable action frame dropped: {}", err);
                        None
                    }
                };
            }
        };

        let id = envelope.action_id;
        let kind = envelope.params.kind();
        if ActionKind::parse(tag) != Some(kind) {
            return Some(failed(
                id,
                format!("frame tag '{}' does not match action '{}'", tag, kind),
            ));
        }

        log::debug!("action {} ({}) on {}", id, kind, envelope.params.id_or_path());
        match accessor::perform(&self.model, &envelope.params) {
            Ok(data) => Some(result_payload(&ActionResult::Succeeded {
                action_id: id,
                data,
            })),
            Err(err) => Some(failed(id, err.to_string())),
        }
    }
}

fn salvage_action_id(json: &str) -> Option<u64> {
    serde_json::from_str::<Value>(json)
        .ok()?
        .get("actionId")?
        .as_u64()
}

fn failed(action_id: u64, message: String) -> String {
    result_payload(&ActionResult::Failed { action_id, message })
}

fn result_payload(result: &ActionResult) -> String {
    // Serializing our own result enum cannot produce invalid JSON.
    serde_json::to_string(result).unwrap_or_else(|err| {
        format!(
            r#"{{"status":"failed","actionId":{},"message":"{}"}}"#,
            result.action_id(),
            err
        )
    })
}

/// Serve the bridge over newline-delimited `tag json` frames on a TCP
/// listener. One connection at a time; sharing the channel between client
/// processes is unsupported.
pub async fn serve<M: ObjectModel>(bridge: Bridge<M>, listener: TcpListener) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("accepting bridge connection")?;
        log::info!("bridge client connected from {}", peer);
        match handle_connection(&bridge, stream).await {
            Ok(()) => log::info!("bridge client disconnected"),
            Err(err) => log::warn!("bridge connection ended: {:#}", err),
        }
    }
}

async fn handle_connection<M: ObjectModel>(
    bridge: &Bridge<M>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some((tag, json)) = line.split_once(' ') else {
            log::warn!("frame without a tag dropped");
            continue;
        };
        if let Some(result) = bridge.handle_message(tag, json) {
            writer.write_all(RESULT_TAG.as_bytes()).await?;
            writer.write_all(b" ").await?;
            writer.write_all(result.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;
    use serde_json::json;

    fn demo_bridge() -> Bridge<MemoryModel> {
        Bridge::new(MemoryModel::demo_song())
    }

    #[test]
    fn test_get_roundtrip_succeeds() {
        let bridge = demo_bridge();
        let payload = bridge
            .handle_message(
                "get",
                r#"{"actionId":1,"action":"get","idOrPath":"live_set","propertyKeysSingle":["is_playing"],"childKeysSingle":["view"],"childKeysMultiple":["tracks"]}"#,
            )
            .unwrap();
        let result: ActionResult = serde_json::from_str(&payload).unwrap();
        match result {
            ActionResult::Succeeded { action_id, data } => {
                assert_eq!(action_id, 1);
                assert_eq!(data["type"], json!("Song"));
                assert_eq!(data["view"], json!(14));
                assert_eq!(data["tracks"], json!([3, 4]));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_path_fails_with_message() {
        let bridge = demo_bridge();
        let payload = bridge
            .handle_message(
                "get",
                r#"{"actionId":2,"action":"get","idOrPath":"live_set nowhere"}"#,
            )
            .unwrap();
        let result: ActionResult = serde_json::from_str(&payload).unwrap();
        match result {
            ActionResult::Failed { action_id, message } => {
                assert_eq!(action_id, 2);
                assert!(message.contains("invalid object reference"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frame_with_salvageable_id_answers_failed() {
        let bridge = demo_bridge();
        let payload = bridge
            .handle_message("get", r#"{"actionId":5,"action":"frobnicate"}"#)
            .unwrap();
        let result: ActionResult = serde_json::from_str(&payload).unwrap();
        assert!(matches!(
            result,
            ActionResult::Failed { action_id: 5, .. }
        ));
    }

    #[test]
    fn test_unattributable_frame_is_dropped() {
        let bridge = demo_bridge();
        assert!(bridge.handle_message("get", "not json at all").is_none());
        assert!(bridge.handle_message("get", r#"{"action":"get"}"#).is_none());
    }

    #[test]
    fn test_tag_kind_mismatch_fails() {
        let bridge = demo_bridge();
        let payload = bridge
            .handle_message(
                "set",
                r#"{"actionId":8,"action":"call","idOrPath":2,"args":["start_playing"]}"#,
            )
            .unwrap();
        let result: ActionResult = serde_json::from_str(&payload).unwrap();
        assert!(matches!(result, ActionResult::Failed { action_id: 8, .. }));
    }
}
