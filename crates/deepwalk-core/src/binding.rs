//! Binding registry: the adapter's callbacks, classified once at build time.
//!
//! An [`Adapter`] describes its capabilities by registering callbacks on a
//! [`Bindings`] builder, one registration method per [`BindingCategory`].
//! The builder validates each registration and produces an immutable
//! [`BindingTable`] that the dispatch resolver reads for the engine's
//! lifetime.
//!
//! ## Categories
//!
//! | Category      | Family     | Target          | Tried      |
//! |---------------|------------|-----------------|------------|
//! | `Type`        | exact type | concrete type   | ordered    |
//! | `TypeErased`  | exact type | concrete type   | ordered    |
//! | `Kind`        | kind       | scalar kind     | ordered    |
//! | `Container`   | kind       | container kind  | ordered    |
//! | `NilPointer`  | shortcut   | nil pointers    | prefix     |
//! | `SignedInt`   | shortcut   | signed ints     | suffix     |
//! | `UnsignedInt` | shortcut   | unsigned ints   | suffix     |
//! | `AllKinds`    | shortcut   | anything        | suffix     |
//!
//! At most one binding may exist per family and target, and each shortcut
//! may be bound once.
//!
//! ## Ordering
//!
//! Type and kind bindings live in one list sorted by an explicit order key
//! (default `0`). At equal order, exact-type bindings come before kind
//! bindings, and ties within a family keep registration order. At most one
//! type binding and one kind binding can match a given node, so the table
//! also keeps type and kind indexes into that list and resolution is a pair
//! of lookups rather than a scan.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::context::Context;
use crate::error::{BoxError, BuildError};
use crate::kind::Kind;
use crate::reflect::Reflect;

// ============================================================================
// Categories
// ============================================================================

/// Classification of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingCategory {
    /// Exact type, callback receives the concrete `&T`.
    Type,
    /// Exact type by [`TypeId`], callback receives `&dyn Reflect`.
    TypeErased,
    /// Scalar kind.
    Kind,
    /// Container kind, called with start and end phases.
    Container,
    /// Any nil pointer. Tried before every other binding.
    NilPointer,
    /// Any signed integer. Tried after every other binding.
    SignedInt,
    /// Any unsigned integer. Tried after every other binding.
    UnsignedInt,
    /// Any value. Tried last.
    AllKinds,
}

impl BindingCategory {
    /// Returns true for shortcuts tried before the ordered bindings.
    pub fn is_prefix(self) -> bool {
        matches!(self, BindingCategory::NilPointer)
    }

    /// Returns true for shortcuts tried after the ordered bindings.
    pub fn is_suffix(self) -> bool {
        matches!(
            self,
            BindingCategory::SignedInt | BindingCategory::UnsignedInt | BindingCategory::AllKinds
        )
    }

    /// Returns true for any of the four shortcut categories.
    pub fn is_shortcut(self) -> bool {
        self.is_prefix() || self.is_suffix()
    }

    /// Returns true when callbacks take the container (size + phase) shape.
    pub fn is_container(self) -> bool {
        matches!(self, BindingCategory::Container)
    }

    /// Whether a shortcut of this category applies to `value`.
    pub fn matches(self, value: &dyn Reflect) -> bool {
        match self {
            BindingCategory::NilPointer => value.is_nil(),
            BindingCategory::SignedInt => value.kind().is_signed_int(),
            BindingCategory::UnsignedInt => value.kind().is_unsigned_int(),
            BindingCategory::AllKinds => true,
            _ => false,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BindingCategory::Type => "type",
            BindingCategory::TypeErased => "type-erased",
            BindingCategory::Kind => "kind",
            BindingCategory::Container => "container",
            BindingCategory::NilPointer => "nil-pointer",
            BindingCategory::SignedInt => "signed-int",
            BindingCategory::UnsignedInt => "unsigned-int",
            BindingCategory::AllKinds => "all-kinds",
        }
    }
}

impl fmt::Display for BindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Callback shapes
// ============================================================================

/// Where a node sits in the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site<'n> {
    /// Nesting level; the root is at depth 0.
    pub depth: usize,
    /// Offset within the parent container.
    pub offset: usize,
    /// Display name: the field name for record children, empty otherwise.
    pub name: &'n str,
}

impl Site<'static> {
    /// The root position.
    pub const ROOT: Site<'static> = Site {
        depth: 0,
        offset: 0,
        name: "",
    };
}

/// Which half of a container notification is being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the container's children. The callback decides whether to descend.
    Start,
    /// After all children. The returned descend flag is ignored.
    End,
}

impl Phase {
    /// Returns true for [`Phase::Start`].
    pub fn is_start(self) -> bool {
        self == Phase::Start
    }
}

pub(crate) type LeafFn<A> =
    Box<dyn Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<bool, BoxError> + Send + Sync>;

pub(crate) type ContainerFn<A> = Box<
    dyn Fn(&A, &mut Context, Site<'_>, usize, Phase, &dyn Reflect) -> Result<bool, BoxError>
        + Send
        + Sync,
>;

pub(crate) type ShortcutFn<A> =
    Box<dyn Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<(), BoxError> + Send + Sync>;

/// Callback stored for an ordered binding.
pub(crate) enum Callback<A> {
    Leaf(LeafFn<A>),
    Container(ContainerFn<A>),
}

/// What an ordered binding targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Type { id: TypeId, name: &'static str },
    Kind(Kind),
}

impl Target {
    fn is_kind(&self) -> bool {
        matches!(self, Target::Kind(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Type { name, .. } => f.write_str(name),
            Target::Kind(kind) => write!(f, "{}", kind),
        }
    }
}

/// One classified type or kind binding.
pub(crate) struct Binding<A> {
    pub(crate) category: BindingCategory,
    pub(crate) target: Target,
    pub(crate) order: i32,
    pub(crate) seq: usize,
    pub(crate) callback: Callback<A>,
}

impl<A> fmt::Debug for Binding<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("category", &self.category)
            .field("target", &self.target)
            .field("order", &self.order)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl<A> fmt::Display for Binding<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.category, self.target, self.order)
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// A caller-supplied set of callbacks.
///
/// ```
/// use deepwalk_core::{Adapter, Bindings, BoxError, BuildError, Context, Kind, Site};
///
/// struct Counter;
///
/// impl Counter {
///     fn on_str(&self, ctx: &mut Context, _site: Site<'_>, _value: &String) -> Result<bool, BoxError> {
///         *ctx.get_local_mut::<usize>("strings").unwrap() += 1;
///         Ok(false)
///     }
/// }
///
/// impl Adapter for Counter {
///     fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError> {
///         b.on_type::<String>(Counter::on_str)?;
///         b.on_container(Kind::Seq, |_, _, _, _, _, _| Ok(true))?;
///         Ok(())
///     }
/// }
/// ```
pub trait Adapter: Sized + Send + Sync + 'static {
    /// Register this adapter's callbacks.
    fn bind(b: &mut Bindings<Self>) -> Result<(), BuildError>;
}

// ============================================================================
// Builder
// ============================================================================

/// Registration builder handed to [`Adapter::bind`].
pub struct Bindings<A> {
    ordered: Vec<Binding<A>>,
    shortcuts: Vec<(BindingCategory, ShortcutFn<A>)>,
    types: HashSet<TypeId>,
    kinds: HashSet<Kind>,
}

/// Handle to a just-registered binding, for setting its order key.
pub struct Registered<'b, A> {
    binding: Option<&'b mut Binding<A>>,
}

impl<A> Registered<'_, A> {
    /// Set the explicit order key. Lower keys are tried first; the default is 0.
    pub fn order(self, order: i32) {
        if let Some(binding) = self.binding {
            binding.order = order;
        }
    }

    /// Whether the registration was accepted.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}

impl<A: Adapter> Bindings<A> {
    pub(crate) fn new() -> Self {
        Bindings {
            ordered: Vec::new(),
            shortcuts: Vec::new(),
            types: HashSet::new(),
            kinds: HashSet::new(),
        }
    }

    /// Bind an exact type with a typed callback.
    pub fn on_type<T: Any>(
        &mut self,
        f: impl Fn(&A, &mut Context, Site<'_>, &T) -> Result<bool, BoxError> + Send + Sync + 'static,
    ) -> Result<Registered<'_, A>, BuildError> {
        let name = std::any::type_name::<T>();
        let leaf: LeafFn<A> = Box::new(move |adapter, ctx, site, value| {
            match value.downcast_ref::<T>() {
                Some(typed) => f(adapter, ctx, site, typed),
                None => panic!(
                    "type binding for {} resolved for a value of type {}",
                    name,
                    value.type_name()
                ),
            }
        });
        self.push_type(BindingCategory::Type, TypeId::of::<T>(), name, leaf)
    }

    /// Bind an exact type by identity, with a type-erased callback.
    pub fn on_type_erased<F>(
        &mut self,
        id: TypeId,
        name: &'static str,
        f: F,
    ) -> Result<Registered<'_, A>, BuildError>
    where
        F: Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.push_type(BindingCategory::TypeErased, id, name, Box::new(f))
    }

    /// Bind a scalar kind.
    ///
    /// Container kinds take the container shape; registering one here is
    /// skipped.
    pub fn on_kind<F>(&mut self, kind: Kind, f: F) -> Result<Registered<'_, A>, BuildError>
    where
        F: Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
    {
        if kind.is_container() {
            debug!(%kind, "skipping kind binding for a container kind");
            return Ok(Registered { binding: None });
        }
        self.push_kind(BindingCategory::Kind, kind, Callback::Leaf(Box::new(f)))
    }

    /// Bind a container kind.
    ///
    /// The callback is called with [`Phase::Start`] before the children and,
    /// when container-end notifications are enabled, with [`Phase::End`]
    /// after them. Scalar kinds are skipped.
    pub fn on_container<F>(&mut self, kind: Kind, f: F) -> Result<Registered<'_, A>, BuildError>
    where
        F: Fn(&A, &mut Context, Site<'_>, usize, Phase, &dyn Reflect) -> Result<bool, BoxError>
            + Send
            + Sync
            + 'static,
    {
        if !kind.is_container() {
            debug!(%kind, "skipping container binding for a scalar kind");
            return Ok(Registered { binding: None });
        }
        self.push_kind(
            BindingCategory::Container,
            kind,
            Callback::Container(Box::new(f)),
        )
    }

    /// Bind the nil-pointer shortcut.
    pub fn on_nil_pointer<F>(&mut self, f: F) -> Result<(), BuildError>
    where
        F: Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.push_shortcut(BindingCategory::NilPointer, Box::new(f))
    }

    /// Bind the signed-integer shortcut.
    pub fn on_signed_int<F>(&mut self, f: F) -> Result<(), BuildError>
    where
        F: Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.push_shortcut(BindingCategory::SignedInt, Box::new(f))
    }

    /// Bind the unsigned-integer shortcut.
    pub fn on_unsigned_int<F>(&mut self, f: F) -> Result<(), BuildError>
    where
        F: Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.push_shortcut(BindingCategory::UnsignedInt, Box::new(f))
    }

    /// Bind the all-kinds shortcut.
    pub fn on_all_kinds<F>(&mut self, f: F) -> Result<(), BuildError>
    where
        F: Fn(&A, &mut Context, Site<'_>, &dyn Reflect) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.push_shortcut(BindingCategory::AllKinds, Box::new(f))
    }

    fn push_type(
        &mut self,
        category: BindingCategory,
        id: TypeId,
        name: &'static str,
        leaf: LeafFn<A>,
    ) -> Result<Registered<'_, A>, BuildError> {
        if !self.types.insert(id) {
            return Err(BuildError::DuplicateType {
                category,
                type_name: name,
            });
        }
        Ok(self.push(category, Target::Type { id, name }, Callback::Leaf(leaf)))
    }

    fn push_kind(
        &mut self,
        category: BindingCategory,
        kind: Kind,
        callback: Callback<A>,
    ) -> Result<Registered<'_, A>, BuildError> {
        if !self.kinds.insert(kind) {
            return Err(BuildError::DuplicateKind { category, kind });
        }
        Ok(self.push(category, Target::Kind(kind), callback))
    }

    fn push(
        &mut self,
        category: BindingCategory,
        target: Target,
        callback: Callback<A>,
    ) -> Registered<'_, A> {
        let seq = self.ordered.len();
        self.ordered.push(Binding {
            category,
            target,
            order: 0,
            seq,
            callback,
        });
        Registered {
            binding: self.ordered.last_mut(),
        }
    }

    fn push_shortcut(
        &mut self,
        category: BindingCategory,
        f: ShortcutFn<A>,
    ) -> Result<(), BuildError> {
        if self.shortcuts.iter().any(|(c, _)| *c == category) {
            return Err(BuildError::DuplicateShortcut { category });
        }
        self.shortcuts.push((category, f));
        Ok(())
    }

    /// Freeze the registrations into a table.
    pub(crate) fn finish(self) -> Result<BindingTable<A>, BuildError> {
        if self.ordered.is_empty() && self.shortcuts.is_empty() {
            return Err(BuildError::NoUsableBinding {
                adapter: std::any::type_name::<A>(),
            });
        }

        let mut ordered = self.ordered;
        ordered.sort_by_key(|b| (b.order, b.target.is_kind(), b.seq));

        let mut by_type = HashMap::new();
        let mut by_kind = HashMap::new();
        for (position, binding) in ordered.iter().enumerate() {
            match binding.target {
                Target::Type { id, .. } => {
                    by_type.insert(id, position);
                }
                Target::Kind(kind) => {
                    by_kind.insert(kind, position);
                }
            }
        }

        let (mut prefixes, mut suffixes): (Vec<_>, Vec<_>) = self
            .shortcuts
            .into_iter()
            .partition(|(category, _)| category.is_prefix());
        prefixes.sort_by_key(|(category, _)| *category);
        suffixes.sort_by_key(|(category, _)| *category);

        Ok(BindingTable {
            ordered,
            by_type,
            by_kind,
            prefixes,
            suffixes,
        })
    }
}

// ============================================================================
// Table
// ============================================================================

/// Immutable, classified bindings of one adapter.
pub struct BindingTable<A> {
    pub(crate) ordered: Vec<Binding<A>>,
    by_type: HashMap<TypeId, usize>,
    by_kind: HashMap<Kind, usize>,
    pub(crate) prefixes: Vec<(BindingCategory, ShortcutFn<A>)>,
    pub(crate) suffixes: Vec<(BindingCategory, ShortcutFn<A>)>,
}

impl<A> BindingTable<A> {
    /// Position of the first ordered binding matching `value`, if any.
    ///
    /// Equivalent to scanning the ordered list for the first entry whose
    /// type or kind matches.
    pub(crate) fn lookup(&self, value: &dyn Reflect) -> Option<usize> {
        let by_type = self.by_type.get(&value.type_id_of()).copied();
        let by_kind = self.by_kind.get(&value.kind()).copied();
        match (by_type, by_kind) {
            (Some(t), Some(k)) => Some(t.min(k)),
            (t, k) => t.or(k),
        }
    }

    pub(crate) fn binding(&self, position: usize) -> &Binding<A> {
        &self.ordered[position]
    }

    /// Number of exact-type bindings.
    pub fn type_count(&self) -> usize {
        self.by_type.len()
    }

    /// Number of kind and container bindings.
    pub fn kind_count(&self) -> usize {
        self.by_kind.len()
    }

    /// Prefix shortcut categories in the order they are tried.
    pub fn prefix_categories(&self) -> Vec<BindingCategory> {
        self.prefixes.iter().map(|(c, _)| *c).collect()
    }

    /// Suffix shortcut categories in the order they are tried.
    pub fn suffix_categories(&self) -> Vec<BindingCategory> {
        self.suffixes.iter().map(|(c, _)| *c).collect()
    }

    /// Ordered bindings as `(category, target)` pairs.
    pub fn entries(&self) -> Vec<(BindingCategory, Target)> {
        self.ordered.iter().map(|b| (b.category, b.target)).collect()
    }
}
