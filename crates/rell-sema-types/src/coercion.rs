//! Numeric promotion
//!
//! The numeric types form a lattice `integer < big_integer < decimal`. When
//! operands of different levels meet (binary operators, branches of `if` and
//! `when`, list literal items, assignment into a wider variable) the lower
//! operand is wrapped in an [`Adapter`]. Non-numeric types never promote.

use crate::{ResolvedType, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Coercion errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoercionError {
    /// The value does not fit the target type
    #[error("Value {value} out of range for {to}")]
    OutOfRange { value: String, to: String },

    /// Adapter applied to a value of the wrong type
    #[error("Cannot convert {value} to {to}")]
    CannotConvert { value: String, to: String },
}

/// Type coercion result
pub type CoercionResult<T> = Result<T, CoercionError>;

/// Position of a type in the numeric lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericLevel {
    Integer,
    BigInteger,
    Decimal,
}

impl NumericLevel {
    pub fn of(ty: &ResolvedType) -> Option<Self> {
        match ty {
            ResolvedType::Integer => Some(Self::Integer),
            ResolvedType::BigInteger => Some(Self::BigInteger),
            ResolvedType::Decimal => Some(Self::Decimal),
            _ => None,
        }
    }

    pub fn ty(self) -> ResolvedType {
        match self {
            Self::Integer => ResolvedType::Integer,
            Self::BigInteger => ResolvedType::BigInteger,
            Self::Decimal => ResolvedType::Decimal,
        }
    }
}

/// Promotion target for a set of operand types
///
/// Returns the highest numeric level when every type is numeric (nullable
/// wrappers are looked through) and at least two different levels occur.
/// Returns `None` when no promotion is needed or possible.
pub fn promotion_target(types: &[&ResolvedType]) -> Option<ResolvedType> {
    let mut levels = Vec::with_capacity(types.len());
    for ty in types {
        match ty.unwrap_nullable() {
            ResolvedType::Null | ResolvedType::Error => continue,
            other => levels.push(NumericLevel::of(other)?),
        }
    }
    let max = *levels.iter().max()?;
    let min = *levels.iter().min()?;
    (min != max).then(|| max.ty())
}

/// A value conversion inserted by promotion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adapter {
    IntegerToBigInteger,
    IntegerToDecimal,
    BigIntegerToDecimal,
    /// Apply the inner adapter to non-null values
    Nullable(Box<Adapter>),
}

impl Adapter {
    /// The adapter converting values of `from` into `to`, if `from` is a lower numeric level
    pub fn between(from: &ResolvedType, to: &ResolvedType) -> Option<Adapter> {
        if let ResolvedType::Nullable(inner) = from {
            return Self::between(inner, to.unwrap_nullable())
                .map(|a| Adapter::Nullable(Box::new(a)));
        }
        let from_level = NumericLevel::of(from)?;
        let to_level = NumericLevel::of(to.unwrap_nullable())?;
        match (from_level, to_level) {
            (NumericLevel::Integer, NumericLevel::BigInteger) => Some(Self::IntegerToBigInteger),
            (NumericLevel::Integer, NumericLevel::Decimal) => Some(Self::IntegerToDecimal),
            (NumericLevel::BigInteger, NumericLevel::Decimal) => Some(Self::BigIntegerToDecimal),
            _ => None,
        }
    }

    /// Result type when applied to a value of type `from`
    pub fn target_type(&self) -> ResolvedType {
        match self {
            Self::IntegerToBigInteger => ResolvedType::BigInteger,
            Self::IntegerToDecimal | Self::BigIntegerToDecimal => ResolvedType::Decimal,
            Self::Nullable(inner) => ResolvedType::nullable(inner.target_type()),
        }
    }

    /// Convert a runtime value
    pub fn apply(&self, value: Value) -> CoercionResult<Value> {
        match (self, value) {
            (Self::Nullable(_), Value::Null) => Ok(Value::Null),
            (Self::Nullable(inner), v) => inner.apply(v),
            (Self::IntegerToBigInteger, Value::Integer(i)) => Ok(Value::BigInteger(BigInt::from(i))),
            (Self::IntegerToDecimal, Value::Integer(i)) => Ok(Value::Decimal(Decimal::from(i))),
            (Self::BigIntegerToDecimal, Value::BigInteger(i)) => big_integer_to_decimal(&i),
            (_, v) => Err(CoercionError::CannotConvert {
                value: v.to_string(),
                to: self.target_type().to_string(),
            }),
        }
    }
}

fn big_integer_to_decimal(value: &BigInt) -> CoercionResult<Value> {
    let out_of_range = || CoercionError::OutOfRange {
        value: value.to_string(),
        to: "decimal".to_string(),
    };
    if let Some(i) = value.to_i128() {
        return Decimal::try_from_i128_with_scale(i, 0)
            .map(Value::Decimal)
            .map_err(|_| out_of_range());
    }
    Decimal::from_str(&value.to_string())
        .map(Value::Decimal)
        .map_err(|_| out_of_range())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_target() {
        let i = ResolvedType::Integer;
        let d = ResolvedType::Decimal;
        let b = ResolvedType::BigInteger;
        assert_eq!(promotion_target(&[&i, &d]), Some(ResolvedType::Decimal));
        assert_eq!(promotion_target(&[&i, &b, &i]), Some(ResolvedType::BigInteger));
        assert_eq!(promotion_target(&[&i, &i]), None);
        assert_eq!(promotion_target(&[&i, &ResolvedType::Text]), None);
    }

    #[test]
    fn test_nullable_adapter_passes_null() {
        let from = ResolvedType::nullable(ResolvedType::Integer);
        let adapter = Adapter::between(&from, &ResolvedType::Decimal).unwrap();
        assert_eq!(adapter.target_type(), ResolvedType::nullable(ResolvedType::Decimal));
        assert_eq!(adapter.apply(Value::Null), Ok(Value::Null));
        assert_eq!(adapter.apply(Value::Integer(3)), Ok(Value::Decimal(Decimal::from(3))));
    }
}
