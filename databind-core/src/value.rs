//! Dynamic value model produced by deserialization.
//!
//! `Value` is what every instantiation strategy and container build yields:
//! an owned, thread-safe tree of scalars, arrays and insertion-ordered
//! objects. It deliberately carries more scalar kinds than JSON itself
//! (wide integers, decimals) so that creator signatures can distinguish
//! them.

use core::cmp::Ordering;
use core::fmt;

use indexmap::IndexMap;
use rust_decimal::Decimal;

/// Insertion-ordered map used for object values.
pub type ValueMap = IndexMap<String, Value>;

/// The closed set of scalar kinds a Creator parameter can declare.
///
/// The order of the variants is the scalar single-argument detection order
/// used during implicit-creator discovery: first matching kind wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    /// UTF-8 string.
    Str,
    /// 32-bit-ranged integer.
    Int,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// Boolean.
    Bool,
    /// Wide (128-bit) integer.
    BigInt,
    /// Fixed-point decimal.
    Decimal,
}

impl ScalarKind {
    /// Implicit single-argument creator detection order.
    pub const DETECTION_ORDER: [ScalarKind; 7] = [
        ScalarKind::Str,
        ScalarKind::Int,
        ScalarKind::Long,
        ScalarKind::Double,
        ScalarKind::Bool,
        ScalarKind::BigInt,
        ScalarKind::Decimal,
    ];

    /// Human-readable kind name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Str => "string",
            ScalarKind::Int => "int",
            ScalarKind::Long => "long",
            ScalarKind::Double => "double",
            ScalarKind::Bool => "boolean",
            ScalarKind::BigInt => "big-integer",
            ScalarKind::Decimal => "decimal",
        }
    }

    /// Whether this kind holds an integral number.
    pub const fn is_integral(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Long | ScalarKind::BigInt)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Discriminant of a [`Value`], used in diagnostics and coercion decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    /// Null value.
    Null,
    /// Boolean value.
    Bool,
    /// 64-bit integer.
    Int,
    /// 128-bit integer.
    BigInt,
    /// 64-bit float.
    Double,
    /// Fixed-point decimal.
    Decimal,
    /// UTF-8 string.
    Str,
    /// Array of values.
    Array,
    /// Insertion-ordered key/value object.
    Object,
}

impl ValueKind {
    /// Human-readable kind name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::BigInt => "big-integer",
            ValueKind::Double => "float",
            ValueKind::Decimal => "decimal",
            ValueKind::Str => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

/// An owned dynamic value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer (covers both the `Int` and `Long` scalar kinds).
    Int(i64),
    /// Wide integer.
    BigInt(i128),
    /// Float.
    Double(f64),
    /// Fixed-point decimal.
    Decimal(Decimal),
    /// String.
    Str(String),
    /// Array.
    Array(Vec<Value>),
    /// Insertion-ordered object.
    Object(ValueMap),
}

impl Value {
    /// The discriminant of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Str(_) => ValueKind::Str,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Human-readable kind name for diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Returns `true` for `Value::Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow as a string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read as an `i64`, widening from narrower integral reprs.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::BigInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Read as an `f64`, converting from integral reprs.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            Value::BigInt(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Read as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as an array, if this is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as an object, if this is one.
    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Deterministic total ordering across all value kinds.
    ///
    /// Values of different kinds order by kind rank; numbers of different
    /// reprs compare numerically where both sides convert losslessly.
    /// Used to materialize sorted sets and sorted maps.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::BigInt(a), Value::BigInt(b)) => a.cmp(b),
            (Value::Int(a), Value::BigInt(b)) => i128::from(*a).cmp(b),
            (Value::BigInt(a), Value::Int(b)) => a.cmp(&i128::from(*b)),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Object(a), Value::Object(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    let ord = ka.cmp(kb).then_with(|| va.total_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::BigInt(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Decimal(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{key:?}:{value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Identity key used by object-id (forward reference) tracking.
///
/// Restricted to the scalar shapes an identity property can produce so the
/// key is hashable without dragging floats into `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdKey {
    /// Integer id.
    Int(i64),
    /// String id.
    Str(String),
}

impl IdKey {
    /// Derive an identity key from a scalar value, if it has an id shape.
    pub fn from_value(value: &Value) -> Option<IdKey> {
        match value {
            Value::Int(n) => Some(IdKey::Int(*n)),
            Value::Str(s) => Some(IdKey::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for IdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKey::Int(n) => write!(f, "{n}"),
            IdKey::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order_ranks_kinds_then_values() {
        let mut values = vec![
            Value::Str("b".into()),
            Value::Int(3),
            Value::Null,
            Value::Int(1),
            Value::Str("a".into()),
        ];
        values.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Int(1),
                Value::Int(3),
                Value::Str("a".into()),
                Value::Str("b".into()),
            ]
        );
    }

    #[test]
    fn int_and_bigint_compare_numerically() {
        assert_eq!(
            Value::Int(5).total_cmp(&Value::BigInt(6)),
            Ordering::Less
        );
        assert_eq!(
            Value::BigInt(7).total_cmp(&Value::Int(7)),
            Ordering::Equal
        );
    }

    #[test]
    fn id_key_only_from_scalar_id_shapes() {
        assert_eq!(IdKey::from_value(&Value::Int(4)), Some(IdKey::Int(4)));
        assert_eq!(
            IdKey::from_value(&Value::Str("k".into())),
            Some(IdKey::Str("k".into()))
        );
        assert_eq!(IdKey::from_value(&Value::Double(1.0)), None);
    }
}
