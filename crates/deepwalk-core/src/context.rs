//! Caller-owned key/value state threaded through a traversal.
//!
//! The engine hands the same [`Context`] to every callback of one
//! [`Engine::traverse`](crate::Engine::traverse) call and never reads it.
//! Adapters use it to carry buffers, accumulators, and settings between
//! callbacks, since the callbacks themselves only get `&self`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Opaque key/value carrier for adapter state.
///
/// Last write wins per key. There is no removal and no iteration.
#[derive(Default)]
pub struct Context {
    locals: HashMap<String, Box<dyn Any + Send>>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set_local<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.locals.insert(key.into(), Box::new(value));
    }

    /// Borrow the value stored under `key`, if present and of type `T`.
    pub fn get_local<T: Any>(&self, key: &str) -> Option<&T> {
        self.locals.get(key)?.downcast_ref::<T>()
    }

    /// Mutably borrow the value stored under `key`, if present and of type `T`.
    pub fn get_local_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.locals.get_mut(key)?.downcast_mut::<T>()
    }

    /// Borrow the value stored under `key` without naming its type.
    pub fn get_local_any(&self, key: &str) -> Option<&(dyn Any + Send)> {
        self.locals.get(key).map(|v| v.as_ref())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.locals.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Context").field("locals", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut ctx = Context::new();
        ctx.set_local("depth", 1usize);
        ctx.set_local("depth", 2usize);
        assert_eq!(ctx.get_local::<usize>("depth"), Some(&2));
    }

    #[test]
    fn wrong_type_is_not_found() {
        let mut ctx = Context::new();
        ctx.set_local("prefix", String::from(">> "));
        assert!(ctx.get_local::<usize>("prefix").is_none());
        assert!(ctx.get_local_any("prefix").is_some());
        assert!(ctx.get_local::<String>("absent").is_none());
    }

    #[test]
    fn mutable_access_updates_in_place() {
        let mut ctx = Context::new();
        ctx.set_local("buffer", String::new());
        ctx.get_local_mut::<String>("buffer")
            .expect("buffer present")
            .push_str("line");
        assert_eq!(ctx.get_local::<String>("buffer").map(String::as_str), Some("line"));
    }

    #[test]
    fn debug_lists_sorted_keys() {
        let mut ctx = Context::new();
        ctx.set_local("b", 1u8);
        ctx.set_local("a", 2u8);
        assert_eq!(format!("{:?}", ctx), r#"Context { locals: ["a", "b"] }"#);
    }
}
