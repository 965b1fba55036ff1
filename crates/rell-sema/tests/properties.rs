//! Property tests over folding, promotion and match coverage

mod common;

use common::{compiler, when_expr};
use proptest::prelude::*;
use rell_sema::ast::dsl::*;
use rell_sema::{NoDatabase, ResolvedType, Value};
use rust_decimal::Decimal;

const COLORS: [&str; 3] = ["red", "green", "blue"];

proptest! {
    #[test]
    fn folding_agrees_with_evaluation(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let folded = compiler().compile_expr(&add(int(a), int(b))).unwrap();
        prop_assert_eq!(folded.value.constant.clone(), Some(Value::Integer(a + b)));

        let compiled = compiler()
            .with_param("x", ResolvedType::Integer)
            .compile_expr(&add(name("x"), int(b)))
            .unwrap();
        prop_assert_eq!(compiled.value.constant.clone(), None);
        prop_assert_eq!(compiled.evaluate(&NoDatabase, &[("x", Value::Integer(a))]), Ok(Value::Integer(a + b)));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_decimal(a in -10_000i64..10_000, mantissa in -10_000i64..10_000, scale in 0u32..4) {
        let compiled = compiler().compile_expr(&add(int(a), dec(mantissa, scale))).unwrap();
        prop_assert_eq!(compiled.value.ty.clone(), ResolvedType::Decimal);
        let expected = Decimal::from(a) + Decimal::new(mantissa, scale);
        prop_assert_eq!(compiled.evaluate(&NoDatabase, &[]), Ok(Value::Decimal(expected)));
    }

    #[test]
    fn enum_match_is_exhaustive_only_with_every_value(covered in proptest::sample::subsequence(COLORS.to_vec(), 1..=3)) {
        let conditions = covered.iter().map(|c| name(c)).collect();
        let result = compiler()
            .with_param("c", ResolvedType::enumeration("color"))
            .compile_match(&when_expr(when(Some(name("c")), vec![case(conditions, int(1))])));
        if covered.len() == COLORS.len() {
            prop_assert!(result.unwrap().value.exhaustive);
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.keys(), vec!["when_no_else"]);
        }
    }

    #[test]
    fn boolean_match_with_else(cover_true in any::<bool>(), cover_false in any::<bool>()) {
        let mut cases = Vec::new();
        if cover_true {
            cases.push(case(vec![boolean(true)], int(1)));
        }
        if cover_false {
            cases.push(case(vec![boolean(false)], int(2)));
        }
        cases.push(else_case(int(3)));
        let result = compiler()
            .with_param("b", ResolvedType::Boolean)
            .compile_match(&when_expr(when(Some(name("b")), cases)));
        if cover_true && cover_false {
            let err = result.unwrap_err();
            prop_assert_eq!(err.keys(), vec!["when_else_allvalues:boolean"]);
        } else {
            let compiled = result.unwrap();
            let expected = if cover_true { 1 } else { 3 };
            prop_assert_eq!(compiled.evaluate(&NoDatabase, &[("b", Value::Boolean(true))]), Ok(Value::Integer(expected)));
        }
    }
}
