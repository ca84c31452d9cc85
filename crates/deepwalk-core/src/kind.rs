//! Structural kinds of reflected values.
//!
//! A [`Kind`] is the coarse shape of a value as the engine sees it. Kind
//! bindings and container bindings are keyed by it, and the walker picks its
//! child-iteration strategy from it.

use std::fmt;

/// The structural kind of a reflected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// The unit value `()`.
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    Char,
    /// Any string-like value.
    Str,
    /// Fixed-length array: children are positional.
    Array,
    /// Variable-length sequence: children are positional.
    Seq,
    /// Key/value map: each entry contributes a key visit and a value visit.
    Map,
    /// Record with named fields resolved through a property resolver.
    Record,
    /// Optional or owning pointer: zero (nil) or one child.
    Pointer,
}

impl Kind {
    /// All kinds, in declaration order.
    pub const ALL: [Kind; 23] = [
        Kind::Unit,
        Kind::Bool,
        Kind::I8,
        Kind::I16,
        Kind::I32,
        Kind::I64,
        Kind::I128,
        Kind::Isize,
        Kind::U8,
        Kind::U16,
        Kind::U32,
        Kind::U64,
        Kind::U128,
        Kind::Usize,
        Kind::F32,
        Kind::F64,
        Kind::Char,
        Kind::Str,
        Kind::Array,
        Kind::Seq,
        Kind::Map,
        Kind::Record,
        Kind::Pointer,
    ];

    /// Returns true for kinds whose bindings take the container (start/end) shape.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Kind::Array | Kind::Seq | Kind::Map | Kind::Record | Kind::Pointer
        )
    }

    /// Returns true for signed integer kinds of any width.
    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            Kind::I8 | Kind::I16 | Kind::I32 | Kind::I64 | Kind::I128 | Kind::Isize
        )
    }

    /// Returns true for unsigned integer kinds of any width.
    pub fn is_unsigned_int(self) -> bool {
        matches!(
            self,
            Kind::U8 | Kind::U16 | Kind::U32 | Kind::U64 | Kind::U128 | Kind::Usize
        )
    }

    /// Lowercase name used in messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Unit => "unit",
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::I128 => "i128",
            Kind::Isize => "isize",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::U128 => "u128",
            Kind::Usize => "usize",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Char => "char",
            Kind::Str => "str",
            Kind::Array => "array",
            Kind::Seq => "seq",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Pointer => "pointer",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
