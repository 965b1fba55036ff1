//! Arithmetic operators
//!
//! - Integer arithmetic is checked: overflow and a zero divisor are faults
//! - integer and big-integer `/` truncates toward zero; decimal `/` is exact
//!   up to the decimal precision
//! - `%` takes the sign of the dividend
//! - `+` concatenates text (converting a non-text operand with its canonical
//!   to-text form) and byte arrays

use super::registry::{BinaryFn, OperatorRegistry};
use super::{BinaryOperator, OperandCast, UnaryOperator, promote_pair};
use crate::error::{EvalError, EvalResult};
use crate::sql::{SqlOp, SqlUnaryOp};
use num_bigint::BigInt;
use num_traits::Zero;
use rell_sema_ast::{BinaryOp, UnaryOp};
use rell_sema_types::{ResolvedType, Value};
use rust_decimal::Decimal;
use std::sync::Arc;

pub(super) fn resolve(op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    if op == BinaryOp::Add {
        if let Some(concat) = resolve_text_concat(left, right) {
            return Some(concat);
        }
    }

    let (left_ty, right_ty, left_cast, right_cast) = promote_pair(left, right);
    let overload = OperatorRegistry::builtin().get(op, &left_ty, &right_ty)?;
    Some(
        BinaryOperator::strict(op, overload.signature.result.clone(), overload.eval.clone(), overload.sql)
            .with_casts(left_cast, right_cast),
    )
}

/// `text + x` and `x + text`, where `x` is converted to text
fn resolve_text_concat(left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    let (left_cast, right_cast, other) = match (left, right) {
        (ResolvedType::Text, ResolvedType::Text) => return None,
        (ResolvedType::Text, other) => (None, Some(OperandCast::ToText), other),
        (other, ResolvedType::Text) => (Some(OperandCast::ToText), None, other),
        _ => return None,
    };
    if other.is_unit() || other.is_error() {
        return None;
    }
    let sql = matches!(
        other,
        ResolvedType::Integer | ResolvedType::BigInteger | ResolvedType::Rowid
    )
    .then_some(SqlOp::Concat);
    Some(
        BinaryOperator::strict(BinaryOp::Add, ResolvedType::Text, Arc::new(concat), sql)
            .with_casts(left_cast, right_cast),
    )
}

pub(super) fn resolve_unary(op: UnaryOp, operand: &ResolvedType) -> Option<UnaryOperator> {
    if !operand.is_numeric() {
        return None;
    }
    let (eval, sql): (super::UnaryFn, _) = match op {
        UnaryOp::Minus => (Arc::new(negate), Some(SqlUnaryOp::Neg)),
        _ => (Arc::new(|v: &Value| Ok(v.clone())), None),
    };
    Some(UnaryOperator {
        op,
        result: operand.clone(),
        eval,
        sql,
    })
}

/// Interpreted implementation of a numeric operator
pub fn numeric_fn(op: BinaryOp) -> BinaryFn {
    Arc::new(move |left, right| numeric(op, left, right))
}

/// Apply a numeric operator to two values of the same numeric type
pub fn numeric(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer(op, *a, *b).map(Value::Integer),
        (Value::BigInteger(a), Value::BigInteger(b)) => big_integer(op, a, b).map(Value::BigInteger),
        (Value::Decimal(a), Value::Decimal(b)) => decimal(op, *a, *b).map(Value::Decimal),
        _ => Err(EvalError::internal(format!(
            "wrong operands for {}: {left}, {right}",
            op.symbol()
        ))),
    }
}

fn integer(op: BinaryOp, a: i64, b: i64) -> EvalResult<i64> {
    let overflow = || EvalError::overflow(op.symbol());
    match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        BinaryOp::Div if b == 0 => Err(EvalError::DivisionByZero),
        BinaryOp::Div => a.checked_div(b).ok_or_else(overflow),
        BinaryOp::Mod if b == 0 => Err(EvalError::DivisionByZero),
        BinaryOp::Mod => a.checked_rem(b).ok_or_else(overflow),
        _ => Err(EvalError::internal(format!("not arithmetic: {}", op.symbol()))),
    }
}

fn big_integer(op: BinaryOp, a: &BigInt, b: &BigInt) -> EvalResult<BigInt> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div | BinaryOp::Mod if b.is_zero() => Err(EvalError::DivisionByZero),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Mod => Ok(a % b),
        _ => Err(EvalError::internal(format!("not arithmetic: {}", op.symbol()))),
    }
}

fn decimal(op: BinaryOp, a: Decimal, b: Decimal) -> EvalResult<Decimal> {
    let overflow = || EvalError::overflow(op.symbol());
    match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        BinaryOp::Div | BinaryOp::Mod if b.is_zero() => Err(EvalError::DivisionByZero),
        BinaryOp::Div => a.checked_div(b).ok_or_else(overflow),
        BinaryOp::Mod => a.checked_rem(b).ok_or_else(overflow),
        _ => Err(EvalError::internal(format!("not arithmetic: {}", op.symbol()))),
    }
}

/// Text or byte array concatenation; non-text operands are converted to text
pub fn concat(left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::ByteArray(a), Value::ByteArray(b)) => {
            let mut bytes = a.clone();
            bytes.extend_from_slice(b);
            Ok(Value::ByteArray(bytes))
        }
        (a, b) => Ok(Value::Text(format!("{}{}", as_text(a), as_text(b)))),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => other.to_text(),
    }
}

fn negate(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Integer(i) => i.checked_neg().map(Value::Integer).ok_or_else(|| EvalError::overflow("-")),
        Value::BigInteger(i) => Ok(Value::BigInteger(-i)),
        Value::Decimal(d) => Ok(Value::Decimal(-*d)),
        other => Err(EvalError::internal(format!("cannot negate {other}"))),
    }
}
