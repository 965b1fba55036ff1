//! Expression nodes

use crate::{AtExpr, BinaryOp, BoxExpr, Expr, Literal, Name, UnaryOp, WhenExpr};

/// An expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),

    /// Bare name: local variable, implicit attribute of an enclosing
    /// at-expression, global constant, or definition name
    Name(String),

    /// Explicit attribute reference `.name` inside an at-expression
    Attr(String),

    /// Placeholder `$` referring to the element of the innermost at-expression
    Placeholder,

    /// Member access `base.name` or safe member access `base?.name`
    Member {
        base: BoxExpr,
        name: Name,
        safe: bool,
    },

    Binary {
        op: BinaryOp,
        left: BoxExpr,
        right: BoxExpr,
    },

    Unary {
        op: UnaryOp,
        operand: BoxExpr,
    },

    /// `if (cond) a else b`
    If {
        condition: BoxExpr,
        then_expr: BoxExpr,
        else_expr: BoxExpr,
    },

    When(Box<WhenExpr>),

    At(Box<AtExpr>),

    /// Call of a built-in function such as `exists`, `empty` or `require`
    Call { name: Name, args: Vec<Expr> },

    /// Tuple literal `(a = 1, 2)`
    Tuple(Vec<TupleField>),

    /// List literal `[1, 2, 3]`
    List(Vec<Expr>),
}

/// A tuple literal field
#[derive(Debug, Clone, PartialEq)]
pub struct TupleField {
    pub name: Option<Name>,
    pub expr: Expr,
}

impl Expression {
    /// The name of the local variable this expression reads directly, if any
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Check whether this is the `null` literal
    pub fn is_null_literal(&self) -> bool {
        matches!(self, Self::Literal(Literal::Null))
    }
}
