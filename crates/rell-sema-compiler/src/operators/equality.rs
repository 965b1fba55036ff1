//! Equality operators
//!
//! - `==` / `!=` compare values. One operand type must be assignable from
//!   the other after numeric promotion; a `null` operand matches any type.
//!   Objects are singletons and are never compared.
//! - `===` / `!==` compare identity and are only defined for collections.

use super::{BinaryOperator, promote_pair};
use crate::sql::SqlOp;
use rell_sema_ast::BinaryOp;
use rell_sema_types::{ResolvedType, Value};
use std::sync::Arc;

pub(super) fn resolve(op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    let (left_ty, right_ty, left_cast, right_cast) = promote_pair(left, right);
    let common = ResolvedType::common_type(&left_ty, &right_ty)?;
    if matches!(common.unwrap_nullable(), ResolvedType::Object(_) | ResolvedType::Function { .. } | ResolvedType::Unit) {
        return None;
    }

    let negated = op == BinaryOp::Ne;
    let sql = sql_equality(&common, negated);
    let eval = Arc::new(move |a: &Value, b: &Value| Ok(Value::Boolean((a == b) != negated)));
    Some(BinaryOperator::strict(op, ResolvedType::Boolean, eval, sql).with_casts(left_cast, right_cast))
}

/// SQL equality for a common operand type; nullable operands use null-safe comparison
fn sql_equality(common: &ResolvedType, negated: bool) -> Option<SqlOp> {
    let inner = common.unwrap_nullable();
    let supported = matches!(
        inner,
        ResolvedType::Boolean
            | ResolvedType::Integer
            | ResolvedType::BigInteger
            | ResolvedType::Decimal
            | ResolvedType::Text
            | ResolvedType::ByteArray
            | ResolvedType::Rowid
            | ResolvedType::Entity(_)
            | ResolvedType::Enum(_)
            | ResolvedType::Null
    );
    if !supported {
        return None;
    }
    Some(match (common.is_nullable(), negated) {
        (false, false) => SqlOp::Eq,
        (false, true) => SqlOp::Ne,
        (true, false) => SqlOp::NotDistinct,
        (true, true) => SqlOp::Distinct,
    })
}

pub(super) fn resolve_ref(op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Option<BinaryOperator> {
    let reference = |t: &ResolvedType| t.is_reference() || t.is_null();
    if !reference(left) || !reference(right) || (left.is_null() && right.is_null()) {
        return None;
    }
    if !left.is_assignable_from(right) && !right.is_assignable_from(left) {
        return None;
    }
    let negated = op == BinaryOp::NeRef;
    let eval = Arc::new(move |a: &Value, b: &Value| Ok(Value::Boolean(a.ref_eq(b) != negated)));
    Some(BinaryOperator::strict(op, ResolvedType::Boolean, eval, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::BinaryKind;
    use rstest::rstest;

    fn opt(t: ResolvedType) -> ResolvedType {
        ResolvedType::nullable(t)
    }

    #[rstest]
    #[case(ResolvedType::Integer, ResolvedType::Integer, Some(SqlOp::Eq))]
    #[case(ResolvedType::Integer, ResolvedType::Null, Some(SqlOp::NotDistinct))]
    #[case(opt(ResolvedType::Text), ResolvedType::Text, Some(SqlOp::NotDistinct))]
    #[case(ResolvedType::Integer, ResolvedType::BigInteger, Some(SqlOp::Eq))]
    #[case(ResolvedType::list(ResolvedType::Integer), ResolvedType::list(ResolvedType::Integer), None)]
    fn test_equality_sql(#[case] left: ResolvedType, #[case] right: ResolvedType, #[case] sql: Option<SqlOp>) {
        let op = resolve(BinaryOp::Eq, &left, &right).unwrap();
        assert_eq!(op.sql(), sql);
    }

    #[rstest]
    #[case(ResolvedType::Integer, ResolvedType::Text)]
    #[case(ResolvedType::object("state"), ResolvedType::object("state"))]
    #[case(ResolvedType::entity("user"), ResolvedType::entity("company"))]
    fn test_equality_undefined(#[case] left: ResolvedType, #[case] right: ResolvedType) {
        assert!(resolve(BinaryOp::Eq, &left, &right).is_none());
    }

    #[test]
    fn test_reference_equality_only_for_collections() {
        let list = ResolvedType::list(ResolvedType::Integer);
        let op = resolve_ref(BinaryOp::EqRef, &list, &list).unwrap();
        assert!(matches!(op.kind, BinaryKind::Strict { sql: None, .. }));
        assert!(resolve_ref(BinaryOp::EqRef, &ResolvedType::Integer, &ResolvedType::Integer).is_none());
        assert!(resolve_ref(BinaryOp::EqRef, &list, &ResolvedType::list(ResolvedType::Text)).is_none());
    }
}
