//! Property tests for naming, candidates and coercion

use apibind_runtime::binding::naming::{derive, snake_case};
use apibind_runtime::ffi::candidate_names;
use apibind_runtime::{Coercion, Value};
use proptest::prelude::*;

proptest! {
    #[test]
    fn snake_case_is_lowercase(name in "[A-Z][A-Za-z0-9]{0,24}") {
        let snake = snake_case(&name);
        prop_assert_eq!(snake.to_lowercase(), snake.clone());
        prop_assert!(!snake.starts_with('_'));
        prop_assert_eq!(snake.replace('_', ""), name.to_lowercase());
    }

    #[test]
    fn getter_alias_strips_prefix(rest in "[A-Z][a-z]{1,8}([A-Z][a-z]{1,8}){0,3}") {
        let derived = derive(&format!("Get{}", rest), None);
        prop_assert_eq!(derived.aliases, vec![snake_case(&rest)]);
        prop_assert!(!derived.predicate);
    }

    #[test]
    fn predicate_alias_and_flag(rest in "[A-Z][a-z]{1,8}([A-Z][a-z]{1,8}){0,3}") {
        let derived = derive(&format!("Is{}", rest), None);
        prop_assert_eq!(derived.aliases, vec![format!("{}?", snake_case(&rest))]);
        prop_assert!(derived.predicate);
    }

    #[test]
    fn candidates_start_with_name(name in "[A-Za-z]{1,20}") {
        let candidates = candidate_names(&name);
        prop_assert_eq!(&candidates[0], &name);
        if name.ends_with('A') || name.ends_with('W') {
            prop_assert_eq!(candidates.len(), 1);
        } else {
            prop_assert_eq!(candidates, vec![name.clone(), format!("{}A", name), format!("{}W", name)]);
        }
    }

    #[test]
    fn boolean_coercion_matches_nonzero(n in any::<i64>()) {
        prop_assert_eq!(Coercion::Boolean.apply(Value::Int(n)), Value::Bool(n != 0));
    }

    #[test]
    fn nullable_only_nulls_zero(n in any::<i64>()) {
        let expected = if n == 0 { Value::Null } else { Value::Int(n) };
        prop_assert_eq!(Coercion::NullableOnZero.apply(Value::Int(n)), expected);
    }

    #[test]
    fn identity_is_identity(n in any::<i64>()) {
        prop_assert_eq!(Coercion::Identity.apply(Value::Int(n)), Value::Int(n));
    }
}
