//! Traversal configuration.

use std::fmt;
use std::sync::Arc;

use crate::property::{DeclarationOrder, PropertyResolver};

/// Options fixed when an [`Engine`](crate::Engine) is built.
#[derive(Clone, Default)]
pub struct TraverseConfig {
    /// Finish nodes with no matching binding silently instead of failing.
    pub ignore_missing_binding: bool,
    /// Re-dispatch a non-nil pointer with no binding of its own against its
    /// target, at the same depth and offset.
    pub auto_unwrap_pointer: bool,
    /// Call container bindings again with [`Phase::End`](crate::Phase::End)
    /// after their children.
    pub container_end: bool,
    /// Record field resolver; [`DeclarationOrder`] when unset.
    pub property_resolver: Option<Arc<dyn PropertyResolver>>,
}

impl TraverseConfig {
    /// Create a config with every option off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set [`ignore_missing_binding`](TraverseConfig::ignore_missing_binding).
    pub fn ignore_missing_binding(mut self, yes: bool) -> Self {
        self.ignore_missing_binding = yes;
        self
    }

    /// Set [`auto_unwrap_pointer`](TraverseConfig::auto_unwrap_pointer).
    pub fn auto_unwrap_pointer(mut self, yes: bool) -> Self {
        self.auto_unwrap_pointer = yes;
        self
    }

    /// Set [`container_end`](TraverseConfig::container_end).
    pub fn container_end(mut self, yes: bool) -> Self {
        self.container_end = yes;
        self
    }

    /// Use a custom record field resolver.
    pub fn property_resolver(mut self, resolver: impl PropertyResolver + 'static) -> Self {
        self.property_resolver = Some(Arc::new(resolver));
        self
    }

    pub(crate) fn resolver(&self) -> Arc<dyn PropertyResolver> {
        match &self.property_resolver {
            Some(resolver) => Arc::clone(resolver),
            None => Arc::new(DeclarationOrder),
        }
    }
}

impl fmt::Debug for TraverseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraverseConfig")
            .field("ignore_missing_binding", &self.ignore_missing_binding)
            .field("auto_unwrap_pointer", &self.auto_unwrap_pointer)
            .field("container_end", &self.container_end)
            .field("custom_resolver", &self.property_resolver.is_some())
            .finish()
    }
}
