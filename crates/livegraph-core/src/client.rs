//! Action dispatcher and result router.
//!
//! The bridge channel has no request/response pairing of its own, so the
//! client restores it: every outgoing action carries a process-unique id,
//! registered in a pending map before the frame is queued, and every
//! inbound `result` frame settles exactly the entry it names. Results may
//! arrive in any order; matching is strictly by id.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::ActionError;
use crate::protocol::{
    ActionEnvelope, ActionKind, ActionParams, ActionResult, ObjectRef, ObjectSnapshot,
};

/// One frame queued for the transport to put on the wire.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// Channel tag: the action kind.
    pub kind: ActionKind,
    /// The serialized action envelope.
    pub payload: String,
}

/// Receiving end of the outbound queue, handed to the transport.
pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundFrame>;

type Settlement = Result<Value, ActionError>;

/// Client side of the bridge channel.
///
/// Dispatching never blocks: the caller gets a [`PendingAction`] back
/// immediately and suspends only when awaiting it. Cloning is cheap; all
/// clones share one id counter and one pending map.
///
/// The pending map is unbounded. There is no timeout and no cancellation:
/// an action whose result never arrives, or whose caller dropped the
/// future, keeps its entry until a matching result shows up, possibly
/// forever. Callers that dispatch without limit grow the map without limit.
#[derive(Clone)]
pub struct LiveClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Settlement>>>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl LiveClient {
    /// Create a client together with the receiving end of its outbound
    /// queue. The transport drains the receiver onto the wire and feeds
    /// every inbound `result` payload to [`LiveClient::handle_result`].
    pub fn new() -> (Self, OutboundReceiver) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let client = Self {
            inner: Arc::new(ClientInner {
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                outbound,
            }),
        };
        (client, rx)
    }

    /// Dispatch one action: allocate the next id, register the deferred
    /// result, queue the frame. Two dispatches with identical parameters
    /// still get distinct ids.
    pub fn dispatch(&self, params: ActionParams) -> PendingAction {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        // Register before sending so a result can never race past its entry.
        self.pending_map().insert(id, tx);

        let kind = params.kind();
        let envelope = ActionEnvelope {
            action_id: id,
            params,
        };
        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(err) => {
                self.settle(id, Err(ActionError::UnexpectedData(err.to_string())));
                return PendingAction { id, rx };
            }
        };

        log::debug!("dispatching action {} ({})", id, kind);
        if self.inner.outbound.send(OutboundFrame { kind, payload }).is_err() {
            self.settle(id, Err(ActionError::ChannelClosed));
        }
        PendingAction { id, rx }
    }

    /// Route one inbound `result` payload to the pending action it names.
    ///
    /// A payload that does not parse, or that names an id with no pending
    /// entry, is logged and dropped; no other entry is touched either way.
    pub fn handle_result(&self, json: &str) {
        let result: ActionResult = match serde_json::from_str(json) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("malformed result message dropped: {}", err);
                return;
            }
        };
        let id = result.action_id();
        let settlement = match result {
            ActionResult::Succeeded { data, .. } => Ok(data),
            ActionResult::Failed { message, .. } => {
                log::warn!("action {} failed: {}", id, message);
                Err(ActionError::Failed(message))
            }
        };
        if !self.settle(id, settlement) {
            log::warn!("result for unknown action {} ignored", id);
        }
    }

    /// Number of actions still waiting for a result.
    pub fn pending_actions(&self) -> usize {
        self.pending_map().len()
    }

    /// Remove the entry and settle it. Returns false when no entry exists.
    fn settle(&self, id: u64, settlement: Settlement) -> bool {
        let Some(tx) = self.pending_map().remove(&id) else {
            return false;
        };
        if tx.send(settlement).is_err() {
            // The caller abandoned the future; swallow after surfacing once.
            log::warn!("action {} settled after its caller went away", id);
        }
        true
    }

    fn pending_map(&self) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<Settlement>>> {
        self.inner.pending.lock().expect("pending map lock poisoned")
    }

    // ========================================================================
    // Kind-specific wrappers
    // ========================================================================

    /// Fetch a flattened snapshot of one object.
    ///
    /// Dispatches immediately; the returned future only waits for the
    /// settlement. Empty key slices are omitted from the wire entirely.
    pub fn get(
        &self,
        target: impl Into<ObjectRef>,
        property_keys_single: &[&str],
        property_keys_multiple: &[&str],
        child_keys_single: &[&str],
        child_keys_multiple: &[&str],
    ) -> impl Future<Output = Result<ObjectSnapshot, ActionError>> {
        let pending = self.dispatch(ActionParams::Get {
            id_or_path: target.into(),
            property_keys_single: keys(property_keys_single),
            property_keys_multiple: keys(property_keys_multiple),
            child_keys_single: keys(child_keys_single),
            child_keys_multiple: keys(child_keys_multiple),
        });
        async move {
            let data = pending.await?;
            serde_json::from_value(data)
                .map_err(|err| ActionError::UnexpectedData(err.to_string()))
        }
    }

    /// Write one property; the host's acknowledgement is passed through
    /// untouched.
    pub fn set(
        &self,
        target: impl Into<ObjectRef>,
        property: &str,
        value: Value,
    ) -> PendingAction {
        self.dispatch(ActionParams::Set {
            id_or_path: target.into(),
            property: property.to_string(),
            value,
        })
    }

    /// Invoke a method; `args` starts with the method name.
    pub fn call(&self, target: impl Into<ObjectRef>, args: Vec<Value>) -> PendingAction {
        self.dispatch(ActionParams::Call {
            id_or_path: target.into(),
            args,
            more: vec![],
        })
    }

    /// Invoke several argument lists against one resolved object as a
    /// single batched action; the last result is the one returned.
    pub fn call_batched(
        &self,
        target: impl Into<ObjectRef>,
        first: Vec<Value>,
        more: Vec<Vec<Value>>,
    ) -> PendingAction {
        self.dispatch(ActionParams::Call {
            id_or_path: target.into(),
            args: first,
            more,
        })
    }
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient")
            .field("pending", &self.pending_actions())
            .finish_non_exhaustive()
    }
}

fn keys(keys: &[&str]) -> Option<Vec<String>> {
    if keys.is_empty() {
        None
    } else {
        Some(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// Deferred result of a dispatched action.
///
/// Dropping it abandons the result but not the action: the pending entry
/// stays until (if ever) a matching result arrives.
pub struct PendingAction {
    id: u64,
    rx: oneshot::Receiver<Settlement>,
}

impl PendingAction {
    /// The id assigned at dispatch time.
    pub fn action_id(&self) -> u64 {
        self.id
    }
}

impl Future for PendingAction {
    type Output = Settlement;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx).poll(cx).map(|settled| {
            match settled {
                Ok(settlement) => settlement,
                // The client itself was dropped with the action in flight.
                Err(_) => Err(ActionError::ChannelClosed),
            }
        })
    }
}
