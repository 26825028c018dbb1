//! Integration tests for expression resolution and expression lists.

use proptest::prelude::*;

use common_error::TesselError;
use tessel_core::DataType;
use tessel_logical::{col, lit, Expression, ExpressionList};

fn source(columns: &[(&str, DataType)]) -> ExpressionList {
    ExpressionList::new(
        columns
            .iter()
            .map(|(n, t)| Expression::typed_column(*n, t.clone()))
            .collect(),
    )
    .unwrap()
    .resolve(None)
    .unwrap()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_two_entries_named_x_fail() {
    let err = ExpressionList::new(vec![col("x"), lit(1i64).alias("x")]).unwrap_err();
    assert!(matches!(err, TesselError::DuplicateName(_)));
    assert!(err.to_string().starts_with("DuplicateNameError"));
}

#[test]
fn test_list_owns_its_expressions() {
    let input = source(&[("a", DataType::Int64)]);
    let original = col("a");
    let list = ExpressionList::new(vec![original.clone()])
        .unwrap()
        .resolve(Some(&input))
        .unwrap();
    assert!(original.id().is_none());
    assert!(list.exprs()[0].id().is_some());
}

// =============================================================================
// Projection pipeline
// =============================================================================

#[test]
fn test_projection_over_projection() {
    let scan = source(&[
        ("price", DataType::Float64),
        ("qty", DataType::Int64),
        ("sku", DataType::String),
    ]);

    let first = ExpressionList::new(vec![
        col("sku"),
        col("price").mul_expr(col("qty")).alias("total"),
    ])
    .unwrap()
    .resolve(Some(&scan))
    .unwrap();

    let second = ExpressionList::new(vec![
        col("total").gt(lit(100.0)).alias("big"),
        col("sku").starts_with("A-"),
    ])
    .unwrap()
    .resolve(Some(&first))
    .unwrap();

    assert_eq!(second.names(), &["big".to_string(), "sku".to_string()]);
    for e in &second {
        assert_eq!(e.resolved_type().unwrap(), DataType::Bool);
    }

    let required = second.required_columns().unwrap();
    let total = required.get_expression_by_name("total").unwrap();
    assert!(total.is_same_as(first.get_expression_by_name("total").unwrap()));
}

#[test]
fn test_join_schema_rename_policy() {
    let left = source(&[("id", DataType::Int64), ("a", DataType::String)]);
    let right = source(&[("id", DataType::Int64), ("b", DataType::String)]);
    let joined = left.union(&right, false, "right.").unwrap();
    assert_eq!(
        joined.names(),
        &[
            "id".to_string(),
            "a".to_string(),
            "right.id".to_string(),
            "b".to_string()
        ]
    );
    assert_eq!(joined.to_id_set().unwrap().len(), 4);
}

#[test]
fn test_display() {
    let list = ExpressionList::new(vec![col("a"), col("a").add_expr(lit(1i64)).alias("b")]).unwrap();
    assert_eq!(list.to_string(), "[a, (a + 1) AS b]");
}

// =============================================================================
// Property tests
// =============================================================================

proptest! {
    #[test]
    fn prop_distinct_names_construct(names in prop::collection::btree_set("[a-z]{1,8}", 0..16)) {
        let exprs: Vec<_> = names.iter().map(|n| col(n.as_str())).collect();
        let list = ExpressionList::new(exprs).unwrap();
        prop_assert_eq!(list.len(), names.len());
        for (listed, expected) in list.names().iter().zip(&names) {
            prop_assert_eq!(listed, expected);
        }
    }

    #[test]
    fn prop_repeated_name_fails(name in "[a-z]{1,8}", extra in 0usize..4) {
        let mut exprs = vec![col(name.as_str()); 2];
        exprs.extend((0..extra).map(|i| col(format!("{name}_{i}"))));
        prop_assert!(matches!(
            ExpressionList::new(exprs),
            Err(TesselError::DuplicateName(_))
        ));
    }

    #[test]
    fn prop_resolution_is_idempotent(n in 1usize..8) {
        let columns: Vec<(String, DataType)> =
            (0..n).map(|i| (format!("c{i}"), DataType::Int64)).collect();
        let refs: Vec<(&str, DataType)> =
            columns.iter().map(|(n, t)| (n.as_str(), t.clone())).collect();
        let input = source(&refs);

        let projection: Vec<_> = columns
            .iter()
            .map(|(name, _)| col(name.as_str()).add_expr(lit(1i64)).alias(format!("{name}_plus")))
            .collect();
        let once = ExpressionList::new(projection).unwrap().resolve(Some(&input)).unwrap();
        let twice = once.clone().resolve(Some(&input)).unwrap();
        prop_assert_eq!(once.to_id_set().unwrap(), twice.to_id_set().unwrap());
        for (a, b) in once.iter().zip(&twice) {
            prop_assert_eq!(a.resolved_type().unwrap(), b.resolved_type().unwrap());
        }
    }
}
