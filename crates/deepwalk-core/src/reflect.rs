//! Runtime shape of traversable values.
//!
//! The engine never inspects concrete Rust types directly. Instead every
//! traversable value implements [`Reflect`], which reports the value's
//! [`Kind`] and exposes its children in the form that kind calls for:
//!
//! | Kind                | Children accessor            |
//! |---------------------|------------------------------|
//! | `Array`, `Seq`      | [`Reflect::item`]            |
//! | `Map`               | [`Reflect::entries`]         |
//! | `Record`            | [`Reflect::fields`] + [`Reflect::field`] |
//! | `Pointer`           | [`Reflect::pointee`]         |
//! | scalars             | [`Reflect::scalar`]          |
//!
//! Implementations are provided for primitives, strings, the standard
//! collections, `Option`, and the owning smart pointers. Records opt in with
//! [`reflect_record!`](crate::reflect_record).

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use crate::field::Field;
use crate::kind::Kind;

/// Type identity helpers, implemented for every `'static` type.
pub trait AsAny: Any {
    /// Upcast to `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The concrete type name.
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Uniform read access to a leaf value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Unit,
    Bool(bool),
    Int(i128),
    Uint(u128),
    Float(f64),
    Char(char),
    Str(&'a str),
}

/// A value the engine can walk.
///
/// Only [`kind`](Reflect::kind) is required. Every other method has a default
/// that reports "no children" so scalar implementations stay one line long;
/// containers override the accessor that matches their kind.
pub trait Reflect: AsAny {
    /// Structural kind of this value.
    fn kind(&self) -> Kind;

    /// Number of elements (arrays, sequences) or entries (maps).
    fn len(&self) -> usize {
        0
    }

    /// Returns true when [`len`](Reflect::len) is zero.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` of an array or sequence.
    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        let _ = index;
        None
    }

    /// Key/value pairs of a map, in the map's own iteration order.
    fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)> {
        Vec::new()
    }

    /// Declared fields of a record, in declaration order.
    fn fields(&self) -> &'static [Field] {
        &[]
    }

    /// Storage for the field declared at `index`.
    fn field(&self, index: usize) -> Option<&dyn Reflect> {
        let _ = index;
        None
    }

    /// Target of a pointer; `None` when the pointer is nil.
    fn pointee(&self) -> Option<&dyn Reflect> {
        None
    }

    /// Returns true for a nil pointer.
    fn is_nil(&self) -> bool {
        self.kind() == Kind::Pointer && self.pointee().is_none()
    }

    /// Leaf value, for scalar kinds.
    fn scalar(&self) -> Option<Scalar<'_>> {
        None
    }
}

impl<'a> dyn Reflect + 'a {
    /// Identity of the concrete type behind this value.
    pub fn type_id_of(&self) -> TypeId {
        Any::type_id(self.as_any())
    }

    /// Downcast to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

// ============================================================================
// Scalars
// ============================================================================

macro_rules! reflect_scalars {
    ($($ty:ty => $kind:ident, $variant:ident;)*) => {
        $(
            impl Reflect for $ty {
                fn kind(&self) -> Kind {
                    Kind::$kind
                }

                fn scalar(&self) -> Option<Scalar<'_>> {
                    Some(Scalar::$variant((*self).into()))
                }
            }
        )*
    };
}

reflect_scalars! {
    bool => Bool, Bool;
    i8 => I8, Int;
    i16 => I16, Int;
    i32 => I32, Int;
    i64 => I64, Int;
    i128 => I128, Int;
    u8 => U8, Uint;
    u16 => U16, Uint;
    u32 => U32, Uint;
    u64 => U64, Uint;
    u128 => U128, Uint;
    f32 => F32, Float;
    f64 => F64, Float;
    char => Char, Char;
}

impl Reflect for isize {
    fn kind(&self) -> Kind {
        Kind::Isize
    }

    fn scalar(&self) -> Option<Scalar<'_>> {
        Some(Scalar::Int(*self as i128))
    }
}

impl Reflect for usize {
    fn kind(&self) -> Kind {
        Kind::Usize
    }

    fn scalar(&self) -> Option<Scalar<'_>> {
        Some(Scalar::Uint(*self as u128))
    }
}

impl Reflect for () {
    fn kind(&self) -> Kind {
        Kind::Unit
    }

    fn scalar(&self) -> Option<Scalar<'_>> {
        Some(Scalar::Unit)
    }
}

impl Reflect for String {
    fn kind(&self) -> Kind {
        Kind::Str
    }

    fn scalar(&self) -> Option<Scalar<'_>> {
        Some(Scalar::Str(self))
    }
}

impl Reflect for &'static str {
    fn kind(&self) -> Kind {
        Kind::Str
    }

    fn scalar(&self) -> Option<Scalar<'_>> {
        Some(Scalar::Str(self))
    }
}

// ============================================================================
// Positional containers
// ============================================================================

impl<T: Reflect> Reflect for Vec<T> {
    fn kind(&self) -> Kind {
        Kind::Seq
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn kind(&self) -> Kind {
        Kind::Seq
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn kind(&self) -> Kind {
        Kind::Array
    }

    fn len(&self) -> usize {
        N
    }

    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        self.get(index).map(|v| v as &dyn Reflect)
    }
}

// ============================================================================
// Maps
// ============================================================================

impl<K: Reflect, V: Reflect, S: 'static> Reflect for HashMap<K, V, S> {
    fn kind(&self) -> Kind {
        Kind::Map
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)> {
        self.iter()
            .map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect))
            .collect()
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn kind(&self) -> Kind {
        Kind::Map
    }

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)> {
        self.iter()
            .map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect))
            .collect()
    }
}

// ============================================================================
// Pointers
// ============================================================================

impl<T: Reflect> Reflect for Option<T> {
    fn kind(&self) -> Kind {
        Kind::Pointer
    }

    fn pointee(&self) -> Option<&dyn Reflect> {
        self.as_ref().map(|v| v as &dyn Reflect)
    }
}

macro_rules! reflect_owning_pointers {
    ($($ptr:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $ptr<T> {
                fn kind(&self) -> Kind {
                    Kind::Pointer
                }

                fn pointee(&self) -> Option<&dyn Reflect> {
                    Some(&**self as &dyn Reflect)
                }
            }
        )*
    };
}

reflect_owning_pointers!(Box, Rc, Arc);

// ============================================================================
// Records
// ============================================================================

/// Implement [`Reflect`] for a struct by listing its fields.
///
/// Fields are listed in declaration order. A field may carry a tag string
/// after `=>`, and may be marked `private` to hide it from the default
/// property resolver:
///
/// ```
/// use deepwalk_core::reflect_record;
///
/// struct Point {
///     x: i32,
///     y: i32,
///     cache: Option<u64>,
/// }
///
/// reflect_record!(Point {
///     x => r#"order:"1""#,
///     y => r#"order:"0""#,
///     cache private,
/// });
/// ```
#[macro_export]
macro_rules! reflect_record {
    (@field $field:ident) => {
        $crate::Field::new(stringify!($field))
    };
    (@field $field:ident => $tag:literal) => {
        $crate::Field::new(stringify!($field)).with_tag($tag)
    };
    (@field $field:ident private) => {
        $crate::Field::new(stringify!($field)).private()
    };
    (@field $field:ident => $tag:literal private) => {
        $crate::Field::new(stringify!($field)).with_tag($tag).private()
    };
    ($ty:ty { $( $field:ident $(=> $tag:literal)? $($private:ident)? ),* $(,)? }) => {
        impl $crate::Reflect for $ty {
            fn kind(&self) -> $crate::Kind {
                $crate::Kind::Record
            }

            fn fields(&self) -> &'static [$crate::Field] {
                const FIELDS: &[$crate::Field] = &[
                    $(
                        $crate::reflect_record!(@field $field $(=> $tag)? $($private)?)
                    ),*
                ];
                FIELDS
            }

            fn field(&self, index: usize) -> ::std::option::Option<&dyn $crate::Reflect> {
                let storage: &[&dyn $crate::Reflect] = &[ $( &self.$field ),* ];
                storage.get(index).copied()
            }
        }
    };
}
