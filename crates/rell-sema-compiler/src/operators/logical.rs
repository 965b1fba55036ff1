//! Logical operators, elvis and the not-null assertion

use super::{BinaryKind, BinaryOperator, OperandCast, UnaryOperator, promote_pair};
use crate::error::EvalError;
use crate::sql::SqlUnaryOp;
use rell_sema_ast::{BinaryOp, UnaryOp};
use rell_sema_types::{ResolvedType, Value};
use std::sync::Arc;

pub(super) fn resolve(op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    if *left != ResolvedType::Boolean || *right != ResolvedType::Boolean {
        return None;
    }
    Some(BinaryOperator {
        op,
        result: ResolvedType::Boolean,
        left_cast: None,
        right_cast: None,
        kind: if op == BinaryOp::And { BinaryKind::And } else { BinaryKind::Or },
    })
}

/// `left ?: right`; the left operand must be nullable
pub(super) fn resolve_elvis(left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    if !left.is_nullable() {
        return None;
    }
    let value_ty = if left.is_null() { right.clone() } else { left.unwrap_nullable().clone() };
    let (value_ty, right_ty, value_cast, right_cast) = promote_pair(&value_ty, right);
    let result = ResolvedType::common_type(&value_ty, &right_ty)?;
    if result.is_unit() {
        return None;
    }
    // The left cast converts the non-null value, so it applies through the nullable wrapper
    let left_cast = value_cast.map(|cast| match cast {
        OperandCast::Promote(adapter) => OperandCast::Promote(rell_sema_types::Adapter::Nullable(Box::new(adapter))),
        other => other,
    });
    log::trace!("elvis result {result}");
    Some(BinaryOperator {
        op: BinaryOp::Elvis,
        result,
        left_cast,
        right_cast,
        kind: BinaryKind::Elvis,
    })
}

pub(super) fn resolve_not(operand: &ResolvedType) -> Option<UnaryOperator> {
    if *operand != ResolvedType::Boolean {
        return None;
    }
    Some(UnaryOperator {
        op: UnaryOp::Not,
        result: ResolvedType::Boolean,
        eval: Arc::new(|v| match v {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            other => Err(EvalError::internal(format!("not a boolean: {other}"))),
        }),
        sql: Some(SqlUnaryOp::Not),
    })
}

/// `x!!`: the operand must be nullable, and must not be the `null` literal
pub(super) fn resolve_not_null(operand: &ResolvedType) -> Option<UnaryOperator> {
    match operand {
        ResolvedType::Nullable(inner) => Some(UnaryOperator {
            op: UnaryOp::NotNull,
            result: (**inner).clone(),
            eval: Arc::new(|v| match v {
                Value::Null => Err(EvalError::NullValue),
                other => Ok(other.clone()),
            }),
            sql: None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elvis_result_type() {
        let opt_int = ResolvedType::nullable(ResolvedType::Integer);
        let op = resolve_elvis(&opt_int, &ResolvedType::Integer).unwrap();
        assert_eq!(op.result, ResolvedType::Integer);

        let op = resolve_elvis(&opt_int, &ResolvedType::Decimal).unwrap();
        assert_eq!(op.result, ResolvedType::Decimal);
        assert!(matches!(op.left_cast, Some(OperandCast::Promote(rell_sema_types::Adapter::Nullable(_)))));

        let op = resolve_elvis(&opt_int, &ResolvedType::Null).unwrap();
        assert_eq!(op.result, opt_int);

        assert!(resolve_elvis(&ResolvedType::Integer, &ResolvedType::Integer).is_none());
        assert!(resolve_elvis(&opt_int, &ResolvedType::Text).is_none());
    }

    #[test]
    fn test_not_null_assertion() {
        assert!(resolve_not_null(&ResolvedType::Null).is_none());
        let op = resolve_not_null(&ResolvedType::nullable(ResolvedType::Text)).unwrap();
        assert_eq!(op.result, ResolvedType::Text);
        assert_eq!((op.eval)(&Value::Null), Err(EvalError::NullValue));
    }

    #[test]
    fn test_logical_requires_booleans() {
        assert!(resolve(BinaryOp::And, &ResolvedType::Boolean, &ResolvedType::Boolean).is_some());
        assert!(resolve(BinaryOp::Or, &ResolvedType::Boolean, &ResolvedType::Integer).is_none());
    }
}
