//! Operator resolution
//!
//! Given an operator and operand types, the resolver returns an operator
//! descriptor or [`Unresolved`]. Operators are grouped by family:
//! - Arithmetic (`+ - * / %`) over the numeric lattice, text and byte arrays
//! - Comparison (`< <= > >=`) over totally ordered types
//! - Equality (`== != === !==`)
//! - Logical (`and or not`) and elvis (`?:`)
//! - Membership (`in`, `not in`) per container family
//!
//! Resolution never panics and never reports: the caller turns
//! [`Unresolved`] into a diagnostic.

pub mod arithmetic;
pub mod comparison;
pub mod equality;
pub mod logical;
pub mod membership;
pub mod registry;

pub use registry::{BinaryFn, OperatorRegistry, OperatorSignature, UnaryFn};

use crate::sql::{SqlOp, SqlUnaryOp};
use rell_sema_ast::{BinaryOp, UnaryOp};
use rell_sema_types::{Adapter, ResolvedType};

/// Conversion applied to an operand before the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandCast {
    /// Numeric promotion
    Promote(Adapter),
    /// Canonical to-text conversion for text concatenation
    ToText,
}

impl OperandCast {
    pub fn promote(from: &ResolvedType, to: &ResolvedType) -> Option<Self> {
        Adapter::between(from, to).map(Self::Promote)
    }
}

/// How a binary operator evaluates its operands
#[derive(Clone)]
pub enum BinaryKind {
    /// Both operands are evaluated, then combined
    Strict { eval: BinaryFn, sql: Option<SqlOp> },
    /// Right side evaluated only if the left is true
    And,
    /// Right side evaluated only if the left is false
    Or,
    /// Right side evaluated only if the left is null
    Elvis,
}

impl std::fmt::Debug for BinaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict { sql, .. } => f.debug_struct("Strict").field("sql", sql).finish_non_exhaustive(),
            Self::And => f.write_str("And"),
            Self::Or => f.write_str("Or"),
            Self::Elvis => f.write_str("Elvis"),
        }
    }
}

/// A resolved binary operator
#[derive(Debug, Clone)]
pub struct BinaryOperator {
    pub op: BinaryOp,
    pub result: ResolvedType,
    pub left_cast: Option<OperandCast>,
    pub right_cast: Option<OperandCast>,
    pub kind: BinaryKind,
}

impl BinaryOperator {
    pub fn strict(op: BinaryOp, result: ResolvedType, eval: BinaryFn, sql: Option<SqlOp>) -> Self {
        Self {
            op,
            result,
            left_cast: None,
            right_cast: None,
            kind: BinaryKind::Strict { eval, sql },
        }
    }

    pub fn with_casts(mut self, left: Option<OperandCast>, right: Option<OperandCast>) -> Self {
        self.left_cast = left;
        self.right_cast = right;
        self
    }

    /// SQL operator, if the operator has a SQL form
    pub fn sql(&self) -> Option<SqlOp> {
        match &self.kind {
            BinaryKind::Strict { sql, .. } => *sql,
            BinaryKind::And => Some(SqlOp::And),
            BinaryKind::Or => Some(SqlOp::Or),
            BinaryKind::Elvis => None,
        }
    }
}

/// A resolved unary operator
#[derive(Clone)]
pub struct UnaryOperator {
    pub op: UnaryOp,
    pub result: ResolvedType,
    pub eval: UnaryFn,
    pub sql: Option<SqlUnaryOp>,
}

impl std::fmt::Debug for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnaryOperator")
            .field("op", &self.op)
            .field("result", &self.result)
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

/// Operator not defined for the operand types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub op: &'static str,
    pub operands: Vec<ResolvedType>,
}

impl Unresolved {
    pub fn binary(op: BinaryOp, left: &ResolvedType, right: &ResolvedType) -> Self {
        Self {
            op: op.symbol(),
            operands: vec![left.clone(), right.clone()],
        }
    }

    pub fn unary(op: UnaryOp, operand: &ResolvedType) -> Self {
        Self {
            op: op.symbol(),
            operands: vec![operand.clone()],
        }
    }

    /// No diagnostic is due: an operand already failed to compile
    pub fn is_silent(&self) -> bool {
        self.operands.iter().any(|t| t.is_error())
    }

    pub fn key(&self) -> String {
        match self.operands.as_slice() {
            [left, right] => format!("binop_operand_type:{}:[{}]:[{}]", self.op, left, right),
            [operand] => format!("unop_operand_type:{}:{}", self.op, operand),
            _ => format!("op_operand_type:{}", self.op),
        }
    }

    pub fn message(&self) -> String {
        match self.operands.as_slice() {
            [left, right] => format!("Wrong operand types for '{}': {}, {}", self.op, left, right),
            [operand] => format!("Wrong operand type for '{}': {}", self.op, operand),
            _ => format!("Wrong operand types for '{}'", self.op),
        }
    }
}

/// Resolve a binary operator for the given operand types
pub fn resolve_binary(
    op: BinaryOp,
    left: &ResolvedType,
    right: &ResolvedType,
) -> Result<BinaryOperator, Unresolved> {
    if left.is_error() || right.is_error() {
        return Err(Unresolved::binary(op, left, right));
    }
    let resolved = match op {
        BinaryOp::And | BinaryOp::Or => logical::resolve(op, left, right),
        BinaryOp::Eq | BinaryOp::Ne => equality::resolve(op, left, right),
        BinaryOp::EqRef | BinaryOp::NeRef => equality::resolve_ref(op, left, right),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => comparison::resolve(op, left, right),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic::resolve(op, left, right)
        }
        BinaryOp::In | BinaryOp::NotIn => membership::resolve(op, left, right),
        BinaryOp::Elvis => logical::resolve_elvis(left, right),
    };
    log::trace!(
        "resolve {} [{}] [{}]: {}",
        op.symbol(),
        left,
        right,
        if resolved.is_some() { "ok" } else { "undefined" }
    );
    resolved.ok_or_else(|| Unresolved::binary(op, left, right))
}

/// Resolve a unary operator for the given operand type
pub fn resolve_unary(op: UnaryOp, operand: &ResolvedType) -> Result<UnaryOperator, Unresolved> {
    if operand.is_error() {
        return Err(Unresolved::unary(op, operand));
    }
    let resolved = match op {
        UnaryOp::Minus | UnaryOp::Plus => arithmetic::resolve_unary(op, operand),
        UnaryOp::Not => logical::resolve_not(operand),
        UnaryOp::NotNull => logical::resolve_not_null(operand),
    };
    resolved.ok_or_else(|| Unresolved::unary(op, operand))
}

/// Promotion casts bringing two operand types to a common numeric level
pub(crate) fn promote_pair(
    left: &ResolvedType,
    right: &ResolvedType,
) -> (ResolvedType, ResolvedType, Option<OperandCast>, Option<OperandCast>) {
    match rell_sema_types::promotion_target(&[left, right]) {
        Some(target) => {
            let left_cast = OperandCast::promote(left, &target);
            let right_cast = OperandCast::promote(right, &target);
            let left_ty = cast_type(left, left_cast.as_ref());
            let right_ty = cast_type(right, right_cast.as_ref());
            (left_ty, right_ty, left_cast, right_cast)
        }
        None => (left.clone(), right.clone(), None, None),
    }
}

/// Operand type after a cast
pub(crate) fn cast_type(ty: &ResolvedType, cast: Option<&OperandCast>) -> ResolvedType {
    match cast {
        Some(OperandCast::Promote(adapter)) => adapter.target_type(),
        Some(OperandCast::ToText) => ResolvedType::Text,
        None => ty.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_key_and_message() {
        let err = resolve_binary(BinaryOp::Add, &ResolvedType::Boolean, &ResolvedType::Integer).unwrap_err();
        assert_eq!(err.key(), "binop_operand_type:+:[boolean]:[integer]");
        assert_eq!(err.message(), "Wrong operand types for '+': boolean, integer");
        assert!(!err.is_silent());
    }

    #[test]
    fn test_error_operands_are_silent() {
        let err = resolve_binary(BinaryOp::Add, &ResolvedType::Error, &ResolvedType::Integer).unwrap_err();
        assert!(err.is_silent());
    }

    #[test]
    fn test_unary_key() {
        let err = resolve_unary(UnaryOp::NotNull, &ResolvedType::Integer).unwrap_err();
        assert_eq!(err.key(), "unop_operand_type:!!:integer");
    }
}
