//! LiveGraph Graph - Typed query/mutation surface over the action client.
//!
//! Graph nodes are derived, never stored: each resolver re-expands object
//! ids into nodes on demand, so two calls agree only where the host state
//! does. The layer is transport-agnostic; anything that can hold a
//! [`GraphClient`] can serve the graph.

pub mod nodes;
pub mod resolver;

// Re-export main types for convenience
pub use nodes::{Clip, ClipProperties, ClipSlot, Song, SongView, Track};
pub use resolver::GraphClient;
