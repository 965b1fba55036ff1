//! Numeric operators agree on result type, interpreted value and SQL form

use insta::assert_snapshot;
use num_bigint::BigInt;
use proptest::prelude::*;
use rell_sema_ast::BinaryOp;
use rell_sema_compiler::operators::{BinaryKind, OperandCast};
use rell_sema_compiler::sql::{DbExpr, SqlBuilder, SqlOp};
use rell_sema_compiler::{EvalError, EvalResult, resolve_binary};
use rell_sema_types::{ResolvedType, Value};
use rust_decimal::Decimal;

const OPS: [(BinaryOp, SqlOp); 5] = [
    (BinaryOp::Add, SqlOp::Add),
    (BinaryOp::Sub, SqlOp::Sub),
    (BinaryOp::Mul, SqlOp::Mul),
    (BinaryOp::Div, SqlOp::Div),
    (BinaryOp::Mod, SqlOp::Mod),
];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn numeric_types() -> [ResolvedType; 3] {
    [ResolvedType::Integer, ResolvedType::BigInteger, ResolvedType::Decimal]
}

fn rank(ty: &ResolvedType) -> usize {
    match ty {
        ResolvedType::Integer => 0,
        ResolvedType::BigInteger => 1,
        _ => 2,
    }
}

fn promoted(left: &ResolvedType, right: &ResolvedType) -> ResolvedType {
    if rank(left) >= rank(right) { left.clone() } else { right.clone() }
}

fn value_of(ty: &ResolvedType, n: i64) -> Value {
    match ty {
        ResolvedType::Integer => Value::Integer(n),
        ResolvedType::BigInteger => Value::BigInteger(BigInt::from(n)),
        _ => Value::Decimal(Decimal::from(n)),
    }
}

fn cast(cast: Option<&OperandCast>, value: Value) -> Value {
    match cast {
        Some(OperandCast::Promote(adapter)) => adapter.apply(value).unwrap(),
        Some(OperandCast::ToText) => panic!("numeric operand converted to text"),
        None => value,
    }
}

/// Integral `/` and `%` truncate toward zero; decimal arithmetic is exact
fn expected(ty: &ResolvedType, op: BinaryOp, a: i64, b: i64) -> EvalResult<Value> {
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
        return Err(EvalError::DivisionByZero);
    }
    if *ty == ResolvedType::Decimal {
        let (x, y) = (Decimal::from(a), Decimal::from(b));
        let value = match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            _ => x % y,
        };
        return Ok(Value::Decimal(value));
    }
    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    };
    Ok(value_of(ty, n))
}

/// The SQL operator whose database result matches the interpreted one
fn expected_sql(ty: &ResolvedType, op: BinaryOp, sql: SqlOp) -> SqlOp {
    if *ty == ResolvedType::BigInteger && op == BinaryOp::Div {
        SqlOp::TruncDiv
    } else {
        sql
    }
}

fn render(op: SqlOp) -> String {
    let mut builder = SqlBuilder::new(Vec::new());
    let expr = DbExpr::binary(op, DbExpr::Constant(Value::Integer(7)), DbExpr::Constant(Value::Integer(2)));
    builder.render(&expr).sql
}

proptest! {
    #[test]
    fn numeric_operators_agree(a in -1_000i64..1_000, b in -1_000i64..1_000) {
        init_logging();
        for left in numeric_types() {
            for right in numeric_types() {
                let result = promoted(&left, &right);
                for (op, sql) in OPS {
                    let operator = resolve_binary(op, &left, &right).unwrap();
                    prop_assert_eq!(&operator.result, &result, "{} {} {}", left, op, right);
                    prop_assert_eq!(operator.sql(), Some(expected_sql(&result, op, sql)), "{} {} {}", left, op, right);

                    let BinaryKind::Strict { eval, .. } = &operator.kind else {
                        panic!("{op} is not strict");
                    };
                    let lhs = cast(operator.left_cast.as_ref(), value_of(&left, a));
                    let rhs = cast(operator.right_cast.as_ref(), value_of(&right, b));
                    prop_assert_eq!(eval(&lhs, &rhs), expected(&result, op, a, b), "{} {} {} {}", a, op, b, result);
                }
            }
        }
    }
}

#[test]
fn test_division_sql_forms() {
    init_logging();
    let sql = |ty: &ResolvedType| render(resolve_binary(BinaryOp::Div, ty, ty).unwrap().sql().unwrap());
    assert_snapshot!(sql(&ResolvedType::Integer), @"(? / ?)");
    assert_snapshot!(sql(&ResolvedType::BigInteger), @"TRUNC((? / ?))");
    assert_snapshot!(sql(&ResolvedType::Decimal), @"(? / ?)");
    assert_snapshot!(render(SqlOp::Mod), @"(? % ?)");
}
