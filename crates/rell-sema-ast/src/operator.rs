//! Operators with precedence information

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Precedence 1 (lowest)
    Or,

    // Precedence 2
    And,

    // Precedence 3
    /// Value equality `==`
    Eq,
    /// Value inequality `!=`
    Ne,
    /// Reference equality `===`
    EqRef,
    /// Reference inequality `!==`
    NeRef,
    Lt,
    Le,
    Gt,
    Ge,

    // Precedence 4
    In,
    NotIn,

    // Precedence 5
    /// Null coalescing `?:`
    Elvis,

    // Precedence 6
    Add,
    Sub,

    // Precedence 7 (highest for binary)
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Get the precedence level (1-7, higher binds tighter)
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq
            | Self::Ne
            | Self::EqRef
            | Self::NeRef
            | Self::Lt
            | Self::Le
            | Self::Gt
            | Self::Ge => 3,
            Self::In | Self::NotIn => 4,
            Self::Elvis => 5,
            Self::Add | Self::Sub => 6,
            Self::Mul | Self::Div | Self::Mod => 7,
        }
    }

    /// Check if this is an ordering comparison
    pub const fn is_comparison(&self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    /// Check if this is a logical operator
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Check if this is an arithmetic operator
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }

    /// Get the operator symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::EqRef => "===",
            Self::NeRef => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Elvis => "?:",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Numeric negation `-`
    Minus,
    /// Numeric identity `+`
    Plus,
    /// Logical negation `not`
    Not,
    /// Not-null assertion `!!`
    NotNull,
}

impl UnaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::Plus => "+",
            Self::Not => "not",
            Self::NotNull => "!!",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl AssignOp {
    /// The binary operator applied by a compound assignment
    pub const fn binary(&self) -> Option<BinaryOp> {
        match self {
            Self::Assign => None,
            Self::AddAssign => Some(BinaryOp::Add),
            Self::SubAssign => Some(BinaryOp::Sub),
            Self::MulAssign => Some(BinaryOp::Mul),
            Self::DivAssign => Some(BinaryOp::Div),
            Self::ModAssign => Some(BinaryOp::Mod),
        }
    }
}
