//! Literal values

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// Arbitrary precision integer, kept as its decimal digits (suffix `L` in source)
    BigInteger(String),
    Decimal(Decimal),
    Text(String),
    /// Byte array (`x"0a1b"` in source)
    ByteArray(Vec<u8>),
}
