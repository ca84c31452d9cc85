//! Deepwalk: depth-first traversal of nested values through adapter callbacks.
//!
//! The engine itself lives in `deepwalk-core` and is re-exported here. This
//! crate adds a ready-made outline adapter and the pieces behind the
//! `deepwalk` CLI.

// Engine - re-exported from deepwalk-core
pub use deepwalk_core::binding;
pub use deepwalk_core::config;
pub use deepwalk_core::context;
pub use deepwalk_core::engine;
pub use deepwalk_core::json;
pub use deepwalk_core::kind;
pub use deepwalk_core::property;
pub use deepwalk_core::reflect;
pub use deepwalk_core::reflect_record;
pub use deepwalk_core::{
    Adapter, Bindings, BoxError, BuildError, Context, Engine, Kind, Phase, PropertyResolver,
    Reflect, Site, TaggedResolver, TraverseConfig, WalkError,
};

// Adapters
pub mod outline;

// Front door
pub mod error;
pub mod output;
