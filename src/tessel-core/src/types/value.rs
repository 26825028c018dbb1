//! Runtime value representation.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::Xxh64;

use super::DataType;

/// Runtime value in Tessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Date (days since Unix epoch).
    Date(i32),
    /// List of values (opaque to the vector engine).
    List(Vec<Value>),
    /// Map of string keys to values (opaque to the vector engine).
    Map(BTreeMap<String, Value>),
}

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT64: u8 = 2;
const TAG_FLOAT64: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_BINARY: u8 = 5;
const TAG_DATE: u8 = 6;
const TAG_LIST: u8 = 7;
const TAG_MAP: u8 = 8;

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            Self::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int64(_) => "Int64",
            Self::Float64(_) => "Float64",
            Self::String(_) => "String",
            Self::Binary(_) => "Binary",
            Self::Date(_) => "Date",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
        }
    }

    /// Get the data type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Bool(_) => DataType::Bool,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::String(_) => DataType::String,
            Self::Binary(_) => DataType::Binary,
            Self::Date(_) => DataType::Date,
            Self::List(_) | Self::Map(_) => DataType::Object,
        }
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int64(_) | Self::Float64(_) => 2,
            Self::String(_) => 3,
            Self::Binary(_) => 4,
            Self::Date(_) => 5,
            Self::List(_) => 6,
            Self::Map(_) => 7,
        }
    }

    /// Total order over values.
    ///
    /// Integers and floats compare numerically; floats use IEEE total order.
    /// Values of different kinds order by kind, with null first.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.total_cmp(b),
            (Self::Int64(a), Self::Float64(b)) => (*a as f64).total_cmp(b),
            (Self::Float64(a), Self::Int64(b)) => a.total_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Binary(a), Self::Binary(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Self::Map(a), Self::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                    let ord = ka.cmp(kb).then_with(|| va.total_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }

    /// Feed the key encoding of this value into a hasher.
    ///
    /// The encoding is a tag byte per kind followed by little-endian
    /// fixed-width fields; lengths are written as `u64`. It does not depend
    /// on the platform or the compiler, and is consistent with [`ValueKey`]
    /// equality.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => state.write(&[TAG_NULL]),
            Self::Bool(b) => state.write(&[TAG_BOOL, u8::from(*b)]),
            Self::Int64(i) => {
                state.write(&[TAG_INT64]);
                state.write(&i.to_le_bytes());
            }
            Self::Float64(f) => {
                state.write(&[TAG_FLOAT64]);
                state.write(&canonical_f64_bits(*f).to_le_bytes());
            }
            Self::String(s) => {
                state.write(&[TAG_STRING]);
                write_bytes(state, s.as_bytes());
            }
            Self::Binary(b) => {
                state.write(&[TAG_BINARY]);
                write_bytes(state, b);
            }
            Self::Date(d) => {
                state.write(&[TAG_DATE]);
                state.write(&d.to_le_bytes());
            }
            Self::List(values) => {
                state.write(&[TAG_LIST]);
                state.write(&(values.len() as u64).to_le_bytes());
                for v in values {
                    v.hash_into(state);
                }
            }
            Self::Map(map) => {
                state.write(&[TAG_MAP]);
                state.write(&(map.len() as u64).to_le_bytes());
                for (k, v) in map {
                    write_bytes(state, k.as_bytes());
                    v.hash_into(state);
                }
            }
        }
    }

    /// Key equality: exact per kind, NaNs equal, `-0.0 == 0.0`.
    ///
    /// This is the equality used by [`ValueKey`].
    pub fn key_eq(&self, other: &Self) -> bool {
        key_eq(self, other)
    }

    /// Deterministic hash used for shuffles.
    ///
    /// XXH64 of the key encoding, seeded with `seed` (0 when absent). The
    /// hash of a key column is chained through `seed` so that multi-column
    /// keys fold into one hash. The result is the same on every worker,
    /// whatever its platform or build.
    pub fn shuffle_hash(&self, seed: Option<u64>) -> u64 {
        let mut hasher = Xxh64::new(seed.unwrap_or(0));
        self.hash_into(&mut hasher);
        hasher.digest()
    }
}

fn write_bytes<H: Hasher>(state: &mut H, bytes: &[u8]) {
    state.write(&(bytes.len() as u64).to_le_bytes());
    state.write(bytes);
}

fn canonical_f64_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

/// A value usable as a hash-map key (group-by and join keys).
///
/// Equality is exact per kind: `Int64(1)` and `Float64(1.0)` are different
/// keys, all NaNs are one key, and `-0.0` equals `0.0`.
#[derive(Debug, Clone)]
pub struct ValueKey(pub Value);

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        key_eq(&self.0, &other.0)
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float64(a), Value::Float64(b)) => canonical_f64_bits(*a) == canonical_f64_bits(*b),
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| key_eq(x, y))
        }
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((ka, va), (kb, vb))| ka == kb && key_eq(va, vb))
        }
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int64(a), Value::Int64(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Binary(a), Value::Binary(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => a == b,
        _ => false,
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_into(state);
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int64(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Float64(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Self::Date(d) => write!(f, "date({d})"),
            Self::List(_) | Self::Map(_) => match serde_json::to_string(self) {
                Ok(json) => write!(f, "{json}"),
                Err(_) => write!(f, "<{}>", self.type_name()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42i64).as_int64(), Some(42));
        assert_eq!(Value::from(3.5f64).as_float64(), Some(3.5));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Null.type_name(), "Null");
        assert_eq!(Value::Bool(true).type_name(), "Bool");
        assert_eq!(Value::List(vec![]).data_type(), DataType::Object);
    }

    #[test]
    fn test_total_cmp() {
        assert_eq!(Value::Int64(1).total_cmp(&Value::Int64(2)), Ordering::Less);
        assert_eq!(Value::Int64(2).total_cmp(&Value::Float64(1.5)), Ordering::Greater);
        assert_eq!(Value::Null.total_cmp(&Value::Int64(0)), Ordering::Less);
        assert_eq!(
            Value::from("b").total_cmp(&Value::from("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_value_key_equality() {
        assert_eq!(ValueKey(Value::Float64(0.0)), ValueKey(Value::Float64(-0.0)));
        assert_eq!(
            ValueKey(Value::Float64(f64::NAN)),
            ValueKey(Value::Float64(f64::NAN))
        );
        assert_ne!(ValueKey(Value::Int64(1)), ValueKey(Value::Float64(1.0)));
    }

    #[test]
    fn test_shuffle_hash_is_stable_and_seeded() {
        let v = Value::from("key");
        assert_eq!(v.shuffle_hash(None), v.shuffle_hash(None));
        assert_ne!(v.shuffle_hash(Some(1)), v.shuffle_hash(Some(2)));
        assert_eq!(
            Value::Float64(0.0).shuffle_hash(None),
            Value::Float64(-0.0).shuffle_hash(None)
        );
    }

    #[test]
    fn test_shuffle_hash_golden_values() {
        // XXH64 over the tag byte and little-endian payload, seed 0
        assert_eq!(Value::Int64(42).shuffle_hash(None), 4_956_066_600_274_079_096);
        assert_eq!(Value::from("key").shuffle_hash(None), 6_275_792_472_678_195_662);
        assert_eq!(Value::Null.shuffle_hash(None), 16_804_241_149_081_757_544);
        assert_eq!(
            Value::Int64(42).shuffle_hash(Some(0)),
            Value::Int64(42).shuffle_hash(None)
        );
    }

    #[test]
    fn test_shuffle_hash_separates_kinds() {
        assert_ne!(
            Value::Int64(1).shuffle_hash(None),
            Value::Date(1).shuffle_hash(None)
        );
        assert_ne!(
            Value::List(vec![Value::from("ab")]).shuffle_hash(None),
            Value::List(vec![Value::from("a"), Value::from("b")]).shuffle_hash(None)
        );
    }
}
