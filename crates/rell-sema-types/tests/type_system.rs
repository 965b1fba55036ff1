//! Type relation tests
//!
//! Tests display names, assignability, common types and promotion:
//! - Display names match source syntax
//! - Nullable and tuple assignability
//! - Common type of mixed null / nullable operands
//! - Promotion lattice properties

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rell_sema_types::*;
use rstest::rstest;

fn int() -> ResolvedType {
    ResolvedType::Integer
}

fn opt(ty: ResolvedType) -> ResolvedType {
    ResolvedType::nullable(ty)
}

// === Display ===

#[rstest]
#[case(opt(int()), "integer?")]
#[case(ResolvedType::list(ResolvedType::Text), "list<text>")]
#[case(ResolvedType::map(ResolvedType::Text, opt(ResolvedType::Decimal)), "map<text,decimal?>")]
#[case(ResolvedType::virtual_of(ResolvedType::list(int())), "virtual<list<integer>>")]
#[case(
    ResolvedType::tuple(vec![TupleField::named("a", int()), TupleField::unnamed(ResolvedType::Text)]),
    "(a:integer,text)"
)]
#[case(ResolvedType::entity("user"), "user")]
#[case(ResolvedType::BigInteger, "big_integer")]
fn test_display(#[case] ty: ResolvedType, #[case] expected: &str) {
    assert_eq!(ty.to_string(), expected);
}

// === Assignability ===

#[rstest]
#[case(opt(int()), int(), true)]
#[case(opt(int()), ResolvedType::Null, true)]
#[case(int(), opt(int()), false)]
#[case(int(), ResolvedType::Null, false)]
#[case(ResolvedType::Decimal, int(), false)]
#[case(ResolvedType::list(opt(int())), ResolvedType::list(int()), false)]
#[case(int(), ResolvedType::Error, true)]
fn test_assignability(#[case] dst: ResolvedType, #[case] src: ResolvedType, #[case] expected: bool) {
    assert_eq!(dst.is_assignable_from(&src), expected);
}

#[test]
fn test_tuple_assignability_requires_same_names() {
    let named = ResolvedType::tuple(vec![TupleField::named("a", opt(int()))]);
    let same = ResolvedType::tuple(vec![TupleField::named("a", int())]);
    let other = ResolvedType::tuple(vec![TupleField::named("b", int())]);
    assert!(named.is_assignable_from(&same));
    assert!(!named.is_assignable_from(&other));
}

// === Common type ===

#[rstest]
#[case(ResolvedType::Null, int(), Some(opt(int())))]
#[case(opt(int()), int(), Some(opt(int())))]
#[case(int(), ResolvedType::Text, None)]
#[case(ResolvedType::Error, ResolvedType::Text, Some(ResolvedType::Error))]
fn test_common_type(
    #[case] a: ResolvedType,
    #[case] b: ResolvedType,
    #[case] expected: Option<ResolvedType>,
) {
    assert_eq!(ResolvedType::common_type(&a, &b), expected.clone());
    assert_eq!(ResolvedType::common_type(&b, &a), expected);
}

// === Predicates ===

#[test]
fn test_sql_compatibility() {
    assert!(opt(ResolvedType::entity("user")).is_sql_compatible());
    assert!(ResolvedType::enumeration("color").is_sql_compatible());
    assert!(!ResolvedType::list(int()).is_sql_compatible());
    assert!(!ResolvedType::object("state").is_sql_compatible());
}

#[test]
fn test_ordered_and_sortable() {
    assert!(ResolvedType::Rowid.is_ordered());
    assert!(!ResolvedType::Boolean.is_ordered());
    assert!(ResolvedType::Boolean.is_sortable());
    assert!(opt(ResolvedType::Text).is_sortable());
    assert!(!ResolvedType::list(int()).is_sortable());
}

// === Promotion lattice ===

fn numeric() -> impl Strategy<Value = ResolvedType> {
    prop_oneof![
        Just(ResolvedType::Integer),
        Just(ResolvedType::BigInteger),
        Just(ResolvedType::Decimal),
    ]
}

proptest! {
    #[test]
    fn promotion_is_commutative(a in numeric(), b in numeric()) {
        prop_assert_eq!(promotion_target(&[&a, &b]), promotion_target(&[&b, &a]));
    }

    #[test]
    fn promotion_goes_to_the_higher_level(a in numeric(), b in numeric()) {
        match promotion_target(&[&a, &b]) {
            Some(target) => {
                prop_assert!(a != b);
                let level = NumericLevel::of(&target).unwrap();
                prop_assert_eq!(level, NumericLevel::of(&a).unwrap().max(NumericLevel::of(&b).unwrap()));
            }
            None => prop_assert_eq!(a, b),
        }
    }

    #[test]
    fn integer_adapts_exactly(i in any::<i64>()) {
        let to_dec = Adapter::between(&ResolvedType::Integer, &ResolvedType::Decimal).unwrap();
        let to_big = Adapter::between(&ResolvedType::Integer, &ResolvedType::BigInteger).unwrap();
        let via_big = Adapter::BigIntegerToDecimal.apply(to_big.apply(Value::Integer(i)).unwrap()).unwrap();
        prop_assert_eq!(to_dec.apply(Value::Integer(i)).unwrap(), via_big);
    }
}
