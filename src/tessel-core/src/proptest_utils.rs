//! Property-based testing utilities for tessel-core.
//!
//! Strategies for core types and the properties the shuffle relies on.

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use proptest::prelude::*;

    use crate::types::{DataType, Value, ValueKey};

    /// Strategy for simple (non-recursive) values.
    fn arb_simple_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int64),
            any::<i32>().prop_map(|i| Value::Float64(f64::from(i))),
            "[a-zA-Z0-9]{0,20}".prop_map(Value::String),
            any::<i32>().prop_map(Value::Date),
        ]
    }

    /// Strategy for values including opaque lists.
    fn arb_value() -> impl Strategy<Value = Value> {
        arb_simple_value().prop_recursive(2, 16, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Value::List)
        })
    }

    fn arb_data_type() -> impl Strategy<Value = DataType> {
        prop_oneof![
            Just(DataType::Null),
            Just(DataType::Bool),
            Just(DataType::Int64),
            Just(DataType::Float64),
            Just(DataType::String),
            Just(DataType::Binary),
            Just(DataType::Date),
            Just(DataType::Object),
        ]
    }

    fn std_hash(key: &ValueKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    proptest! {
        /// Value serialization roundtrips through JSON.
        #[test]
        fn value_serde_roundtrip(value in arb_value()) {
            let serialized = serde_json::to_string(&value).unwrap();
            let deserialized: Value = serde_json::from_str(&serialized).unwrap();
            prop_assert_eq!(value, deserialized);
        }

        /// DataType serialization roundtrips through JSON.
        #[test]
        fn data_type_serde_roundtrip(dt in arb_data_type()) {
            let serialized = serde_json::to_string(&dt).unwrap();
            let deserialized: DataType = serde_json::from_str(&serialized).unwrap();
            prop_assert_eq!(dt, deserialized);
        }

        /// Equal keys hash equally, both for maps and for shuffles.
        #[test]
        fn equal_keys_hash_equally(value in arb_value(), seed in any::<Option<u64>>()) {
            let a = ValueKey(value.clone());
            let b = ValueKey(value.clone());
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(std_hash(&a), std_hash(&b));
            prop_assert_eq!(value.shuffle_hash(seed), value.clone().shuffle_hash(seed));
        }

        /// The total order is reflexive and antisymmetric.
        #[test]
        fn total_cmp_is_consistent(a in arb_value(), b in arb_value()) {
            prop_assert_eq!(a.total_cmp(&a), Ordering::Equal);
            prop_assert_eq!(a.total_cmp(&b), b.total_cmp(&a).reverse());
        }
    }
}
