//! The traversal engine and its per-node dispatch resolver.
//!
//! An [`Engine`] is built once per adapter. Building classifies the
//! adapter's registrations into a [`BindingTable`]; the engine is then
//! read-only and can run any number of traversals, sequentially or from
//! several threads at once.
//!
//! ## Dispatch priority
//!
//! For each node, the first rule that applies wins:
//!
//! 1. A prefix shortcut whose predicate holds (nil pointers).
//! 2. The first ordered type or kind binding matching the node.
//! 3. With [`auto_unwrap_pointer`](TraverseConfig::auto_unwrap_pointer), a
//!    pointer is re-dispatched as its target (nil pointers just finish).
//! 4. A suffix shortcut whose predicate holds.
//! 5. Missing binding: an error, unless
//!    [`ignore_missing_binding`](TraverseConfig::ignore_missing_binding) is set.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::binding::{Adapter, Bindings, BindingTable, Callback, Phase, Site};
use crate::config::TraverseConfig;
use crate::context::Context;
use crate::error::{BuildError, PropertyError, WalkError};
use crate::kind::Kind;
use crate::property::{PropertyResolver, ResolvedProperties};
use crate::reflect::Reflect;
use crate::walker::{VisitFrame, Walker};

/// What the walker does with a node after dispatch.
pub(crate) enum Dispatch<'v> {
    /// The node is finished.
    Done,
    /// Visit the node's children.
    Descend(Opening),
    /// Dispatch this value again in place of the node.
    Reenter(&'v dyn Reflect),
}

/// Child layout of a container about to be opened.
pub(crate) struct Opening {
    pub(crate) size: usize,
    pub(crate) properties: Option<Arc<ResolvedProperties>>,
    /// Container binding to notify at the end; `None` when a non-container
    /// binding asked to descend.
    pub(crate) binding: Option<usize>,
}

/// A built traversal engine for adapter `A`.
///
/// ```
/// use deepwalk_core::{Adapter, Bindings, BuildError, Context, Engine, Kind, TraverseConfig};
///
/// struct Sum;
///
/// impl Adapter for Sum {
///     fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
///         b.on_type::<i64>(|_, ctx, _, v| {
///             *ctx.get_local_mut::<i64>("total").ok_or("no total")? += *v;
///             Ok(false)
///         })?;
///         b.on_container(Kind::Seq, |_, _, _, _, phase, _| Ok(phase.is_start()))?;
///         Ok(())
///     }
/// }
///
/// let engine = Engine::build(Sum, TraverseConfig::default()).unwrap();
/// let mut ctx = Context::new();
/// ctx.set_local("total", 0i64);
/// engine.traverse(&mut ctx, &vec![1i64, 2, 3]).unwrap();
/// assert_eq!(ctx.get_local::<i64>("total"), Some(&6));
/// ```
pub struct Engine<A> {
    adapter: A,
    config: TraverseConfig,
    resolver: Arc<dyn PropertyResolver>,
    table: BindingTable<A>,
    properties: RwLock<HashMap<TypeId, Arc<ResolvedProperties>>>,
}

impl<A: Adapter> Engine<A> {
    /// Classify `adapter`'s bindings and build an engine.
    pub fn build(adapter: A, config: TraverseConfig) -> Result<Self, BuildError> {
        let mut bindings = Bindings::new();
        A::bind(&mut bindings)?;
        let table = bindings.finish()?;
        let resolver = config.resolver();

        let engine = Engine {
            adapter,
            config,
            resolver,
            table,
            properties: RwLock::new(HashMap::new()),
        };
        debug!(engine = %engine, "built traversal engine");
        Ok(engine)
    }

    /// Build with the default configuration.
    pub fn new(adapter: A) -> Result<Self, BuildError> {
        Self::build(adapter, TraverseConfig::default())
    }

    /// Walk `root` depth-first, calling the adapter at every visited node.
    ///
    /// The first error from a callback, a missing binding, or the property
    /// resolver aborts the whole traversal.
    pub fn traverse(&self, ctx: &mut Context, root: &dyn Reflect) -> Result<(), WalkError> {
        Walker::new(self, ctx).walk(root)
    }

    /// The adapter this engine calls.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// The configuration fixed at build time.
    pub fn config(&self) -> &TraverseConfig {
        &self.config
    }

    /// The classified bindings.
    pub fn table(&self) -> &BindingTable<A> {
        &self.table
    }

    /// Resolve which binding handles `value` at `site`, and call it.
    pub(crate) fn dispatch<'v>(
        &self,
        ctx: &mut Context,
        site: Site<'_>,
        value: &'v dyn Reflect,
    ) -> Result<Dispatch<'v>, WalkError> {
        for (category, shortcut) in &self.table.prefixes {
            if category.matches(value) {
                trace!(depth = site.depth, offset = site.offset, %category, "prefix shortcut");
                shortcut(&self.adapter, ctx, site, value).map_err(WalkError::Callback)?;
                return Ok(Dispatch::Done);
            }
        }

        if let Some(position) = self.table.lookup(value) {
            let binding = self.table.binding(position);
            trace!(depth = site.depth, offset = site.offset, %binding, "ordered binding");
            return match &binding.callback {
                Callback::Leaf(f) => {
                    let descend =
                        f(&self.adapter, ctx, site, value).map_err(WalkError::Callback)?;
                    if descend && value.kind().is_container() {
                        let (size, properties) = self.layout(value)?;
                        Ok(Dispatch::Descend(Opening {
                            size,
                            properties,
                            binding: None,
                        }))
                    } else {
                        Ok(Dispatch::Done)
                    }
                }
                Callback::Container(f) => {
                    let (size, properties) = self.layout(value)?;
                    let descend = f(&self.adapter, ctx, site, size, Phase::Start, value)
                        .map_err(WalkError::Callback)?;
                    if descend {
                        Ok(Dispatch::Descend(Opening {
                            size,
                            properties,
                            binding: Some(position),
                        }))
                    } else {
                        Ok(Dispatch::Done)
                    }
                }
            };
        }

        if self.config.auto_unwrap_pointer && value.kind() == Kind::Pointer {
            return Ok(match value.pointee() {
                Some(target) => {
                    trace!(
                        depth = site.depth,
                        offset = site.offset,
                        from = value.type_name(),
                        "unwrapping pointer"
                    );
                    Dispatch::Reenter(target)
                }
                None => Dispatch::Done,
            });
        }

        for (category, shortcut) in &self.table.suffixes {
            if category.matches(value) {
                trace!(depth = site.depth, offset = site.offset, %category, "suffix shortcut");
                shortcut(&self.adapter, ctx, site, value).map_err(WalkError::Callback)?;
                return Ok(Dispatch::Done);
            }
        }

        if self.config.ignore_missing_binding {
            debug!(type_name = value.type_name(), kind = %value.kind(), "ignoring missing binding");
            return Ok(Dispatch::Done);
        }
        Err(WalkError::BindingMissing {
            type_name: value.type_name(),
            kind: value.kind(),
        })
    }

    /// Deliver the end notification for a closed container.
    pub(crate) fn end_container(
        &self,
        ctx: &mut Context,
        frame: &VisitFrame<'_>,
    ) -> Result<(), WalkError> {
        let Some(position) = frame.binding else {
            return Ok(());
        };
        if let Callback::Container(f) = &self.table.binding(position).callback {
            f(
                &self.adapter,
                ctx,
                frame.site(),
                frame.size,
                Phase::End,
                frame.value,
            )
            .map_err(WalkError::ContainerEnd)?;
        }
        Ok(())
    }

    /// Child count and, for records, the resolved properties of a container.
    fn layout(
        &self,
        value: &dyn Reflect,
    ) -> Result<(usize, Option<Arc<ResolvedProperties>>), PropertyError> {
        Ok(match value.kind() {
            Kind::Array | Kind::Seq => (value.len(), None),
            Kind::Map => (value.len() * 2, None),
            Kind::Pointer => (usize::from(!value.is_nil()), None),
            Kind::Record => {
                let resolved = self.properties(value)?;
                (resolved.size, Some(resolved))
            }
            _ => (0, None),
        })
    }

    /// Resolved properties of a record's type, computed at most once.
    ///
    /// Entries are only inserted after the resolver returns, so a guard left
    /// poisoned by a panicking resolver still holds a consistent map.
    pub(crate) fn properties(
        &self,
        record: &dyn Reflect,
    ) -> Result<Arc<ResolvedProperties>, PropertyError> {
        let id = record.type_id_of();
        if let Some(hit) = self
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(hit));
        }

        let mut cache = self
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&id) {
            return Ok(Arc::clone(hit));
        }
        let resolved = Arc::new(self.resolver.properties(record)?);
        debug!(
            type_name = record.type_name(),
            size = resolved.size,
            fields = resolved.list.len(),
            "resolved record properties"
        );
        cache.insert(id, Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Number of record types with cached properties.
    pub fn cached_record_types(&self) -> usize {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<A> fmt::Display for Engine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let adapter = std::any::type_name::<A>();
        let adapter = adapter.rsplit("::").next().unwrap_or(adapter);
        write!(f, "Engine{{adapter:{} prefixes:[", adapter)?;
        write_joined(f, self.table.prefixes.iter().map(|(c, _)| c))?;
        f.write_str("] suffixes:[")?;
        write_joined(f, self.table.suffixes.iter().map(|(c, _)| c))?;
        write!(
            f,
            "] types:{} kinds:{} bindings:[",
            self.table.type_count(),
            self.table.kind_count()
        )?;
        write_joined(f, self.table.ordered.iter())?;
        f.write_str("]}")
    }
}

impl<A> fmt::Debug for Engine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("adapter", &std::any::type_name::<A>())
            .field("config", &self.config)
            .field("bindings", &self.table.ordered)
            .field("prefixes", &self.table.prefix_categories())
            .field("suffixes", &self.table.suffix_categories())
            .finish_non_exhaustive()
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;

    struct Noop;

    impl Adapter for Noop {
        fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
            b.on_nil_pointer(|_, _, _, _| Ok(()))?;
            b.on_all_kinds(|_, _, _, _| Ok(()))?;
            b.on_type::<String>(|_, _, _, _| Ok(false))?;
            b.on_container(Kind::Record, |_, _, _, _, _, _| Ok(true))?
                .order(2);
            Ok(())
        }
    }

    struct Empty;

    impl Adapter for Empty {
        fn bind(_: &mut Bindings<Self>) -> Result<(), BuildError> {
            Ok(())
        }
    }

    struct Point {
        x: i32,
        y: i32,
    }

    crate::reflect_record!(Point { x, y });

    mod build {
        use super::*;

        #[test]
        fn adapter_without_bindings_is_rejected() {
            let err = Engine::new(Empty).unwrap_err();
            assert!(matches!(err, BuildError::NoUsableBinding { .. }));
            assert!(err.to_string().contains("Empty"));
        }

        #[test]
        fn display_summarises_the_table() {
            let engine = Engine::new(Noop).unwrap();
            assert_eq!(
                engine.to_string(),
                "Engine{adapter:Noop prefixes:[nil-pointer] suffixes:[all-kinds] types:1 kinds:1 \
                 bindings:[type:alloc::string::String@0 container:record@2]}"
            );
        }

        #[test]
        fn debug_names_the_adapter() {
            let engine = Engine::new(Noop).unwrap();
            assert!(format!("{:?}", engine).contains("Noop"));
        }
    }

    mod property_cache {
        use super::*;
        use crate::property::DeclarationOrder;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(Arc<AtomicUsize>);

        impl PropertyResolver for Counting {
            fn properties(&self, record: &dyn Reflect) -> Result<ResolvedProperties, PropertyError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                DeclarationOrder.properties(record)
            }
        }

        #[test]
        fn each_record_type_is_resolved_once() {
            let calls = Arc::new(AtomicUsize::new(0));
            let config = TraverseConfig::new().property_resolver(Counting(Arc::clone(&calls)));
            let engine = Engine::build(Noop, config).unwrap();
            let mut ctx = Context::new();
            for _ in 0..3 {
                engine.traverse(&mut ctx, &Point { x: 1, y: 2 }).unwrap();
            }
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(engine.cached_record_types(), 1);
        }

        #[test]
        fn concurrent_traversals_share_the_cache() {
            let calls = Arc::new(AtomicUsize::new(0));
            let config = TraverseConfig::new().property_resolver(Counting(Arc::clone(&calls)));
            let engine = Engine::build(Noop, config).unwrap();
            std::thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        let mut ctx = Context::new();
                        engine.traverse(&mut ctx, &Point { x: 0, y: 0 }).unwrap();
                    });
                }
            });
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn panicking_resolver_leaves_the_engine_usable() {
            use std::sync::atomic::AtomicBool;

            struct PanicsOnce(AtomicBool);

            impl PropertyResolver for PanicsOnce {
                fn properties(&self, record: &dyn Reflect) -> Result<ResolvedProperties, PropertyError> {
                    if !self.0.swap(true, Ordering::SeqCst) {
                        panic!("resolver blew up");
                    }
                    DeclarationOrder.properties(record)
                }
            }

            let config = TraverseConfig::new().property_resolver(PanicsOnce(AtomicBool::new(false)));
            let engine = Engine::build(Noop, config).unwrap();
            let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _ = engine.traverse(&mut Context::new(), &Point { x: 0, y: 0 });
            }));
            assert!(first.is_err());
            assert_eq!(engine.cached_record_types(), 0);

            engine
                .traverse(&mut Context::new(), &Point { x: 1, y: 2 })
                .unwrap();
            assert_eq!(engine.cached_record_types(), 1);
        }

        #[test]
        fn resolver_errors_are_not_cached() {
            struct Failing;
            impl PropertyResolver for Failing {
                fn properties(&self, _: &dyn Reflect) -> Result<ResolvedProperties, PropertyError> {
                    Err(PropertyError::InvalidOrderTag {
                        type_name: "Point".to_string(),
                        field: "x".to_string(),
                        value: "?".to_string(),
                    })
                }
            }
            let engine = Engine::build(Noop, TraverseConfig::new().property_resolver(Failing)).unwrap();
            let mut ctx = Context::new();
            let err = engine.traverse(&mut ctx, &Point { x: 0, y: 0 }).unwrap_err();
            assert!(matches!(err, WalkError::Property(_)));
            assert_eq!(engine.cached_record_types(), 0);
        }
    }

    mod dispatch {
        use super::*;

        fn fail(msg: &'static str) -> Result<bool, BoxError> {
            Err(msg.into())
        }

        struct Failing;

        impl Adapter for Failing {
            fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
                b.on_kind(Kind::I32, |_, _, _, _| fail("bad int"))?;
                Ok(())
            }
        }

        #[test]
        fn callback_error_is_passed_through() {
            let engine = Engine::new(Failing).unwrap();
            let err = engine.traverse(&mut Context::new(), &7i32).unwrap_err();
            assert_eq!(err.to_string(), "bad int");
            assert!(err.as_callback().is_some());
        }

        #[test]
        fn missing_binding_names_the_type() {
            let engine = Engine::new(Failing).unwrap();
            let err = engine.traverse(&mut Context::new(), &true).unwrap_err();
            assert_eq!(err.to_string(), "type:bool kind:bool binding is missing");
        }
    }
}
