//! Capability interface over the host's object model.
//!
//! The host object model is an opaque remote service; this trait pair is
//! the whole surface the accessor is allowed to touch. Implementations
//! normalize the host's string-or-number id form at resolution time, so
//! everything past [`ObjectModel::resolve`] works with plain integers.

use livegraph_core::ObjectRef;
use serde_json::Value;
use thiserror::Error;

/// Failures surfaced by a host object model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Resolution yielded the zero sentinel or an unknown id/path.
    #[error("invalid object reference: {0}")]
    InvalidReference(String),

    /// The host rejected a property read or write.
    #[error("property access failed for '{key}': {message}")]
    PropertyAccess { key: String, message: String },

    /// The host rejected a method call.
    #[error("invocation failed for '{method}': {message}")]
    Invocation { method: String, message: String },
}

/// Result type alias using ModelError.
pub type Result<T> = std::result::Result<T, ModelError>;

/// A host object model: the only thing it can do is resolve references.
pub trait ObjectModel {
    type Handle: ObjectHandle;

    /// Resolve a reference to a live handle. Fails with
    /// [`ModelError::InvalidReference`] when resolution yields the zero
    /// sentinel.
    fn resolve(&self, target: &ObjectRef) -> Result<Self::Handle>;
}

/// One resolved remote object.
pub trait ObjectHandle {
    fn id(&self) -> i64;
    fn path(&self) -> String;
    fn kind(&self) -> String;

    /// Read a property or child key. The host always answers with a
    /// sequence: arity 1 for plain properties, a tagged pair for single
    /// children, a marker/id alternation for child lists.
    fn read(&self, key: &str) -> Result<Vec<Value>>;

    /// Write a property, returning the host's acknowledgement untouched.
    fn write(&self, key: &str, value: &Value) -> Result<Value>;

    /// Invoke a method; `args` starts with the method name.
    fn invoke(&self, args: &[Value]) -> Result<Value>;
}

/// Normalize the host's string-or-number id form to an integer.
///
/// The host reports ids as numbers in some replies and as decimal strings
/// in others; this is the single place that difference is allowed to
/// exist.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
