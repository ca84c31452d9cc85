//! Core traversal engine for deepwalk.
//!
//! This crate walks arbitrary nested values depth-first and calls a
//! caller-supplied adapter at every node:
//! - Value model: the [`Reflect`] trait, structural [`Kind`]s, record fields
//! - Binding registry: an [`Adapter`] registers typed, kinded, and shortcut
//!   callbacks on [`Bindings`]
//! - Dispatch resolver: picks at most one binding per node in a fixed priority
//! - Recursive walker: explicit frame stack, pointer re-entry, container end
//!   notifications
//! - Property resolvers: which record fields to visit, and in what order
//! - [`Context`]: adapter-owned state threaded through one traversal

pub mod binding;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod field;
#[cfg(feature = "json")]
pub mod json;
pub mod kind;
pub mod property;
pub mod reflect;
mod walker;

pub use binding::{Adapter, BindingCategory, BindingTable, Bindings, Phase, Registered, Site, Target};
pub use config::TraverseConfig;
pub use context::Context;
pub use engine::Engine;
pub use error::{BoxError, BuildError, PropertyError, WalkError};
pub use field::Field;
pub use kind::Kind;
pub use property::{
    arrange, DeclarationOrder, Property, PropertyResolver, ResolvedProperties, TaggedResolver,
};
pub use reflect::{AsAny, Reflect, Scalar};
