//! Error types for the action path.

use thiserror::Error;

/// Failures a dispatched action can settle with on the client side.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The host reported the action as failed; the message is the host's
    /// stringified exception (invalid reference, property access failure,
    /// invocation failure: the bridge collapses all of them to text).
    #[error("action failed: {0}")]
    Failed(String),

    /// The outbound queue to the transport is gone; the action was never
    /// put on the wire.
    #[error("outbound channel closed")]
    ChannelClosed,

    /// A result arrived and settled the action, but its data did not have
    /// the shape the caller asked for.
    #[error("unexpected result data: {0}")]
    UnexpectedData(String),
}

/// Result type alias using ActionError.
pub type Result<T> = std::result::Result<T, ActionError>;
