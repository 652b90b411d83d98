//! Property-based tests for the document crate.
//!
//! These tests use proptest to verify invariants around:
//! - Builder determinism on identical input
//! - Coercion preserving list order and map keys
//! - Merge idempotence for list-free trees

use crate::builder::{Syntax, build_document};
use crate::coerce::{coerce_expression, coerce_json};
use crate::merge::merge;
use crate::value::{Map, Value};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_ident() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").unwrap()
}

fn arb_literal() -> impl Strategy<Value = (String, Value)> {
    prop_oneof![
        Just(("null".to_string(), Value::Null)),
        any::<bool>().prop_map(|b| (b.to_string(), Value::Bool(b))),
        (0u32..100_000).prop_map(|n| (n.to_string(), Value::Number(f64::from(n)))),
        prop::string::string_regex("[a-zA-Z0-9 _.-]{0,16}")
            .unwrap()
            .prop_map(|s| (format!("\"{s}\""), Value::String(s))),
    ]
}

/// Leaf values without lists, so merge idempotence holds.
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (0u32..1000).prop_map(|n| Value::Number(f64::from(n))),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn arb_list_free_map() -> impl Strategy<Value = Map> {
    let leaf = arb_scalar();
    let tree = leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-d]", inner, 0..4).prop_map(Value::Map)
    });
    prop::collection::btree_map("[a-f]", tree, 0..5)
}

fn arb_resource_file() -> impl Strategy<Value = String> {
    prop::collection::vec((arb_ident(), arb_ident(), arb_ident(), arb_literal()), 1..6).prop_map(
        |blocks| {
            blocks
                .into_iter()
                .map(|(kind, name, attr, (lit, _))| {
                    format!("resource \"{kind}\" \"{name}\" {{\n  {attr} = {lit}\n}}\n\n")
                })
                .collect::<String>()
        },
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn build_is_deterministic(text in arb_resource_file()) {
        let first = build_document(text.as_bytes(), Syntax::Native);
        let second = build_document(text.as_bytes(), Syntax::Native);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "builder disagreed with itself"),
        }
    }

    #[test]
    fn array_coercion_preserves_order_and_count(items in prop::collection::vec(arb_literal(), 0..12)) {
        let text = format!(
            "[{}]",
            items.iter().map(|(lit, _)| lit.as_str()).collect::<Vec<_>>().join(", ")
        );
        let expr = hcl_edit::parser::parse_expr(&text).expect("parse array");
        let coerced = coerce_expression(&expr).expect("literal array");
        let expected: Vec<Value> = items.into_iter().map(|(_, v)| v).collect();
        prop_assert_eq!(coerced, Value::List(expected));
    }

    #[test]
    fn json_object_coercion_preserves_keys(keys in prop::collection::btree_set("[a-z]{1,6}", 0..10)) {
        let object: serde_json::Map<String, serde_json::Value> = keys
            .iter()
            .map(|k| (k.clone(), serde_json::Value::from(k.len())))
            .collect();
        let coerced = coerce_json(serde_json::Value::Object(object));
        let map = coerced.as_map().expect("map");
        let coerced_keys: Vec<&String> = map.keys().collect();
        let expected: Vec<&String> = keys.iter().collect();
        prop_assert_eq!(coerced_keys, expected);
    }

    #[test]
    fn merge_is_idempotent_for_list_free_trees(a in arb_list_free_map(), b in arb_list_free_map()) {
        let mut once = a.clone();
        merge(&mut once, b.clone());
        let mut twice = once.clone();
        merge(&mut twice, b);
        prop_assert_eq!(once, twice);
    }
}
