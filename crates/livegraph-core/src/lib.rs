//! LiveGraph Core - Action protocol and correlation client.
//!
//! This crate provides the client half of the LiveGraph bridge channel:
//!
//! - **Protocol** - Wire shapes for actions, results and object snapshots
//! - **Client** - Action dispatcher and result router over one duplex channel
//! - **Notes** - Note records and the canonical note ordering
//! - **Error** - Typed failures of the action path
//!
//! # Architecture
//!
//! The host's scripting bridge accepts tagged JSON messages on a single
//! inbound channel and emits results on a single outbound channel, with no
//! built-in request/response pairing. [`LiveClient`] restores that pairing:
//! every dispatched action carries a process-unique id, and the matching
//! `result` message settles exactly the caller that is waiting on it,
//! regardless of arrival order.

pub mod client;
pub mod error;
pub mod notes;
pub mod protocol;

// Re-export main types for convenience
pub use client::{LiveClient, OutboundFrame, OutboundReceiver, PendingAction};
pub use error::ActionError;
pub use notes::{sort_notes, Note, NotesDictionary};
pub use protocol::{
    ActionEnvelope, ActionKind, ActionParams, ActionResult, ObjectRef, ObjectSnapshot,
};
