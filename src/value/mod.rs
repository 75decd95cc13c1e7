//! Provides the context value type used for rendering.
//!
//! Templates render against a [`Value`].  Values are built from any
//! [`serde::Serialize`] implementation via [`Value::from_serialize`], from
//! the [`From`] conversions, or with the [`context!`](crate::context!)
//! macro.  They are cheap to clone; sequences and maps are reference
//! counted.
//!
//! The value type supplies the resolver capability the renderer needs:
//! dotted path lookup, truthiness, and enumeration of sequences.

mod serialize;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use self::serialize::ValueSerializer;

/// The map type underlying map values.
pub type ValueMap = BTreeMap<Arc<str>, Value>;

/// Represents a value the template engine can render.
#[derive(Clone, Debug, PartialEq)]
pub struct Value(pub(crate) ValueRepr);

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ValueRepr {
    Undefined,
    None,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Arc<str>),
    Seq(Arc<Vec<Value>>),
    Map(Arc<ValueMap>),
    /// A context that failed to serialize.  Using such a value during
    /// rendering reports the serialization failure.
    Invalid(Arc<str>),
}

impl Default for Value {
    fn default() -> Value {
        Value::UNDEFINED
    }
}

impl Value {
    /// The undefined value, also what lookups of missing keys produce.
    pub const UNDEFINED: Value = Value(ValueRepr::Undefined);

    /// Creates a value from anything serde can serialize.
    ///
    /// A failing `Serialize` implementation produces an invalid value
    /// which surfaces as a [`BadSerialization`](crate::ErrorKind) error
    /// when the value is used during rendering.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Value {
        value
            .serialize(ValueSerializer)
            .unwrap_or_else(|err| Value(ValueRepr::Invalid(Arc::from(err.to_string()))))
    }

    /// Returns `true` if the value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, ValueRepr::Undefined)
    }

    /// Returns `true` if the value is none.
    pub fn is_none(&self) -> bool {
        matches!(self.0, ValueRepr::None)
    }

    /// Truthiness of the value.
    ///
    /// Booleans speak for themselves, zero numbers, empty strings, empty
    /// sequences, empty maps and absent values are false, everything else
    /// is true.
    pub fn is_true(&self) -> bool {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None | ValueRepr::Invalid(_) => false,
            ValueRepr::Bool(b) => *b,
            ValueRepr::I64(v) => *v != 0,
            ValueRepr::U64(v) => *v != 0,
            ValueRepr::F64(v) => *v != 0.0,
            ValueRepr::String(s) => !s.is_empty(),
            ValueRepr::Seq(items) => !items.is_empty(),
            ValueRepr::Map(map) => !map.is_empty(),
        }
    }

    /// Returns the elements if the value is a sequence.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match &self.0 {
            ValueRepr::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn as_invalid(&self) -> Option<&str> {
        match &self.0 {
            ValueRepr::Invalid(reason) => Some(reason),
            _ => None,
        }
    }

    /// Looks up an attribute of the value.
    ///
    /// Maps are indexed by key; sequences by numeric key.  Everything
    /// else, and missing keys, produce the undefined value.
    pub fn get_attr(&self, key: &str) -> Value {
        match &self.0 {
            ValueRepr::Map(map) => map.get(key).cloned().unwrap_or(Value::UNDEFINED),
            ValueRepr::Seq(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx).cloned())
                .unwrap_or(Value::UNDEFINED),
            _ => Value::UNDEFINED,
        }
    }

    /// Resolves a dotted path against the value, segment by segment.
    pub fn get_path(&self, segments: &[String]) -> Value {
        let mut rv = self.clone();
        for segment in segments {
            rv = rv.get_attr(segment);
        }
        rv
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None | ValueRepr::Invalid(_) => Ok(()),
            ValueRepr::Bool(b) => write!(f, "{b}"),
            ValueRepr::I64(v) => write!(f, "{v}"),
            ValueRepr::U64(v) => write!(f, "{v}"),
            ValueRepr::F64(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            ValueRepr::String(s) => f.write_str(s),
            ValueRepr::Seq(items) => {
                ok!(f.write_str("["));
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(", "));
                    }
                    ok!(write!(f, "{item}"));
                }
                f.write_str("]")
            }
            ValueRepr::Map(map) => {
                ok!(f.write_str("{"));
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        ok!(f.write_str(", "));
                    }
                    ok!(write!(f, "{key}: {value}"));
                }
                f.write_str("}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            ValueRepr::Undefined | ValueRepr::None => serializer.serialize_unit(),
            ValueRepr::Bool(b) => serializer.serialize_bool(*b),
            ValueRepr::I64(v) => serializer.serialize_i64(*v),
            ValueRepr::U64(v) => serializer.serialize_u64(*v),
            ValueRepr::F64(v) => serializer.serialize_f64(*v),
            ValueRepr::String(s) => serializer.serialize_str(s),
            ValueRepr::Seq(items) => serializer.collect_seq(items.iter()),
            ValueRepr::Map(map) => {
                serializer.collect_map(map.iter().map(|(key, value)| (&**key, value)))
            }
            ValueRepr::Invalid(reason) => Err(serde::ser::Error::custom(reason)),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value(ValueRepr::Bool(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value(ValueRepr::I64(value as i64))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value(ValueRepr::I64(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        Value(ValueRepr::U64(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Value {
        Value(ValueRepr::U64(value as u64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value(ValueRepr::F64(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value(ValueRepr::String(Arc::from(value)))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value(ValueRepr::String(Arc::from(value)))
    }
}

impl From<Arc<str>> for Value {
    fn from(value: Arc<str>) -> Value {
        Value(ValueRepr::String(value))
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Value {
        Value(ValueRepr::Map(Arc::new(value)))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Value {
        Value(ValueRepr::Seq(Arc::new(
            value.into_iter().map(Into::into).collect(),
        )))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Value {
        match value {
            Some(value) => value.into(),
            None => Value(ValueRepr::None),
        }
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Value {
        Value(ValueRepr::Seq(Arc::new(iter.into_iter().collect())))
    }
}
