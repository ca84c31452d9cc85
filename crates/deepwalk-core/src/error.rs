//! Error types for engine construction and traversal.
//!
//! ## Taxonomy
//!
//! - [`BuildError`]: the adapter cannot be turned into an engine (duplicate
//!   binding, nothing usable). Always fatal; no partial engine is returned.
//! - [`WalkError`]: a traversal aborted. Raised when no binding resolves for a
//!   node, when a callback fails, or when a record's property list is invalid.
//!   The whole recursive walk unwinds; there is no partial-result mode.
//! - [`PropertyError`]: a property resolver rejected a record type.
//!
//! Internal inconsistencies between a value's reported shape and its actual
//! children (a [`Reflect`](crate::Reflect) implementation that lies about its
//! length, for example) are programming defects and panic instead.

use thiserror::Error;

use crate::binding::BindingCategory;
use crate::kind::Kind;

/// Error type returned by adapter callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Construction failure for an [`Engine`](crate::Engine).
#[derive(Debug, Error)]
pub enum BuildError {
    /// Two bindings of the exact-type family target the same type.
    #[error("duplicated {category} binding found for type {type_name}")]
    DuplicateType {
        category: BindingCategory,
        type_name: &'static str,
    },

    /// Two bindings of the kind family target the same kind.
    #[error("duplicated {category} binding found for kind {kind}")]
    DuplicateKind { category: BindingCategory, kind: Kind },

    /// A shortcut category was bound twice.
    #[error("duplicated {category} shortcut binding found")]
    DuplicateShortcut { category: BindingCategory },

    /// The adapter registered no usable binding at all.
    #[error("no available binding found on adapter {adapter}")]
    NoUsableBinding { adapter: &'static str },
}

/// Failure of a single [`Engine::traverse`](crate::Engine::traverse) call.
#[derive(Debug, Error)]
pub enum WalkError {
    /// No binding resolved for a node and missing bindings are not ignored.
    #[error("type:{type_name} kind:{kind} binding is missing")]
    BindingMissing { type_name: &'static str, kind: Kind },

    /// A callback returned an error; it is passed through unchanged.
    #[error(transparent)]
    Callback(BoxError),

    /// A container's end notification returned an error.
    #[error("call container end failed: {0}")]
    ContainerEnd(#[source] BoxError),

    /// The property resolver rejected a record type.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl WalkError {
    /// Returns the callback error if this is a [`WalkError::Callback`].
    pub fn as_callback(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            WalkError::Callback(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A property resolver rejected a record type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// An explicit order tag could not be parsed as a non-negative integer.
    #[error("illegal order tag ({value}) for field {field} of type {type_name}")]
    InvalidOrderTag {
        type_name: String,
        field: String,
        value: String,
    },

    /// An explicit order is lower than the position the field ends up in.
    #[error(
        "illegal order ({order}) for field {field} of type {type_name}, should be >= {position}"
    )]
    OrderConflict {
        type_name: String,
        field: String,
        order: usize,
        position: usize,
    },
}
