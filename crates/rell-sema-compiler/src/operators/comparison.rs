//! Ordering comparison operators (`<`, `<=`, `>`, `>=`)
//!
//! Defined for identical operand types with a total order, after numeric
//! promotion. Entities compare by row id.

use super::{BinaryOperator, promote_pair};
use crate::error::{EvalError, EvalResult};
use crate::sql::SqlOp;
use rell_sema_ast::BinaryOp;
use rell_sema_types::{ResolvedType, Value};
use std::cmp::Ordering;
use std::sync::Arc;

pub(super) fn resolve(op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    let (left_ty, right_ty, left_cast, right_cast) = promote_pair(left, right);
    if left_ty != right_ty || !left_ty.is_ordered() {
        return None;
    }
    let sql = match op {
        BinaryOp::Lt => SqlOp::Lt,
        BinaryOp::Le => SqlOp::Le,
        BinaryOp::Gt => SqlOp::Gt,
        _ => SqlOp::Ge,
    };
    Some(
        BinaryOperator::strict(op, ResolvedType::Boolean, Arc::new(move |a, b| compare(op, a, b)), Some(sql))
            .with_casts(left_cast, right_cast),
    )
}

/// Apply an ordering comparison
pub fn compare(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    let ordering = left
        .compare(right)
        .ok_or_else(|| EvalError::internal(format!("cannot compare {left} and {right}")))?;
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => return Err(EvalError::internal(format!("not a comparison: {}", op.symbol()))),
    };
    Ok(Value::Boolean(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ResolvedType::Integer, ResolvedType::Integer, true)]
    #[case(ResolvedType::Integer, ResolvedType::Decimal, true)]
    #[case(ResolvedType::Text, ResolvedType::Text, true)]
    #[case(ResolvedType::entity("user"), ResolvedType::entity("user"), true)]
    #[case(ResolvedType::Boolean, ResolvedType::Boolean, false)]
    #[case(ResolvedType::Text, ResolvedType::Integer, false)]
    #[case(ResolvedType::nullable(ResolvedType::Integer), ResolvedType::Integer, false)]
    #[case(ResolvedType::entity("user"), ResolvedType::entity("company"), false)]
    fn test_comparison_defined(#[case] left: ResolvedType, #[case] right: ResolvedType, #[case] defined: bool) {
        assert_eq!(resolve(BinaryOp::Lt, &left, &right).is_some(), defined);
    }

    #[test]
    fn test_compare_entities_by_rowid() {
        let a = Value::entity("user", 1);
        let b = Value::entity("user", 2);
        assert_eq!(compare(BinaryOp::Lt, &a, &b), Ok(Value::Boolean(true)));
        assert_eq!(compare(BinaryOp::Ge, &a, &b), Ok(Value::Boolean(false)));
    }
}
