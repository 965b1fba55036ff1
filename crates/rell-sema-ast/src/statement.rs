//! Statement nodes

use crate::{AssignOp, Expr, Name, Spanned, TypeSpecifier};

/// A spanned statement
pub type Stmt = Spanned<Statement>;

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `val x: T = e;` or `var x: T = e;` (type or initializer may be omitted, not both)
    Var {
        mutable: bool,
        name: Name,
        ty: Option<Spanned<TypeSpecifier>>,
        init: Option<Expr>,
    },

    /// `x = e;` or compound `x += e;`
    Assign {
        target: Name,
        op: AssignOp,
        value: Expr,
    },

    Expr(Expr),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// `for (x in e) body`
    For {
        var: Name,
        iterable: Expr,
        body: Box<Stmt>,
    },

    Block(Vec<Stmt>),
}
