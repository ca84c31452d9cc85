//! [`Reflect`] for `serde_json::Value`.
//!
//! `null` is a nil pointer, arrays are sequences, objects are maps keyed by
//! `String`. Numbers report the width serde_json stores them in: `U64` for
//! non-negative integers, `I64` for negative ones, `F64` otherwise.

use serde_json::Value;

use crate::kind::Kind;
use crate::reflect::{Reflect, Scalar};

impl Reflect for Value {
    fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Pointer,
            Value::Bool(_) => Kind::Bool,
            Value::Number(n) if n.is_u64() => Kind::U64,
            Value::Number(n) if n.is_i64() => Kind::I64,
            Value::Number(_) => Kind::F64,
            Value::String(_) => Kind::Str,
            Value::Array(_) => Kind::Seq,
            Value::Object(_) => Kind::Map,
        }
    }

    fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    fn item(&self, index: usize) -> Option<&dyn Reflect> {
        match self {
            Value::Array(items) => items.get(index).map(|v| v as &dyn Reflect),
            _ => None,
        }
    }

    fn entries(&self) -> Vec<(&dyn Reflect, &dyn Reflect)> {
        match self {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn scalar(&self) -> Option<Scalar<'_>> {
        match self {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Some(Scalar::Uint(u128::from(u)))
                } else if let Some(i) = n.as_i64() {
                    Some(Scalar::Int(i128::from(i)))
                } else {
                    n.as_f64().map(Scalar::Float)
                }
            }
            Value::String(s) => Some(Scalar::Str(s)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_is_a_nil_pointer() {
        let v = Value::Null;
        assert_eq!(v.kind(), Kind::Pointer);
        assert!(v.is_nil());
    }

    #[test]
    fn numbers_report_storage_width() {
        assert_eq!(json!(3).kind(), Kind::U64);
        assert_eq!(json!(-3).kind(), Kind::I64);
        assert_eq!(json!(1.5).kind(), Kind::F64);
        assert_eq!(json!(-3).scalar(), Some(Scalar::Int(-3)));
        assert_eq!(json!(1.5).scalar(), Some(Scalar::Float(1.5)));
    }

    #[test]
    fn containers_expose_children() {
        let v = json!({"a": [1, 2], "b": null});
        assert_eq!(v.kind(), Kind::Map);
        assert_eq!(v.len(), 2);
        let entries = v.entries();
        assert_eq!(entries[0].0.downcast_ref::<String>().map(String::as_str), Some("a"));
        assert_eq!(entries[0].1.kind(), Kind::Seq);
        assert_eq!(entries[0].1.len(), 2);
        assert!(entries[1].1.is_nil());
    }
}
