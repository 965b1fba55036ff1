//! Terse constructors for building syntax trees by hand
//!
//! Nodes built here carry an empty span unless [`spanned`] is used.
//!
//! ```
//! use rell_sema_ast::dsl::{add, int, name};
//! let expr = add(name("x"), int(1));
//! ```

use crate::{
    AssignOp, AtCardinality, AtExpr, BinaryOp, Expr, Expression, FromItem, Literal, Name,
    SortDirection, Span, Spanned, Statement, Stmt, TupleField, TypeSpecifier, UnaryOp, What,
    WhatAnnotation, WhatField, WhatFieldName, WhenCase, WhenCondition, WhenExpr,
};
use rust_decimal::Decimal;
use smallvec::SmallVec;

fn sp<T>(inner: T) -> Spanned<T> {
    Spanned::new(inner, Span::default())
}

/// Replace the span of a node
pub fn spanned<T>(node: Spanned<T>, span: Span) -> Spanned<T> {
    Spanned::new(node.inner, span)
}

pub fn ident(name: &str) -> Name {
    sp(name.to_string())
}

// === Literals ===

pub fn null() -> Expr {
    sp(Expression::Literal(Literal::Null))
}

pub fn boolean(value: bool) -> Expr {
    sp(Expression::Literal(Literal::Boolean(value)))
}

pub fn int(value: i64) -> Expr {
    sp(Expression::Literal(Literal::Integer(value)))
}

pub fn bigint(digits: &str) -> Expr {
    sp(Expression::Literal(Literal::BigInteger(digits.to_string())))
}

/// Decimal literal `mantissa * 10^-scale`
pub fn dec(mantissa: i64, scale: u32) -> Expr {
    sp(Expression::Literal(Literal::Decimal(Decimal::new(mantissa, scale))))
}

pub fn text(value: &str) -> Expr {
    sp(Expression::Literal(Literal::Text(value.to_string())))
}

pub fn bytes(value: &[u8]) -> Expr {
    sp(Expression::Literal(Literal::ByteArray(value.to_vec())))
}

// === Names and members ===

pub fn name(name: &str) -> Expr {
    sp(Expression::Name(name.to_string()))
}

pub fn attr(name: &str) -> Expr {
    sp(Expression::Attr(name.to_string()))
}

pub fn placeholder() -> Expr {
    sp(Expression::Placeholder)
}

pub fn member(base: Expr, name: &str) -> Expr {
    sp(Expression::Member {
        base: Box::new(base),
        name: ident(name),
        safe: false,
    })
}

pub fn safe_member(base: Expr, name: &str) -> Expr {
    sp(Expression::Member {
        base: Box::new(base),
        name: ident(name),
        safe: true,
    })
}

// === Operators ===

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    sp(Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    sp(Expression::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn eq(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Eq, left, right)
}

pub fn ne(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Ne, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Lt, left, right)
}

pub fn gt(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Gt, left, right)
}

pub fn add(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Add, left, right)
}

pub fn mul(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Mul, left, right)
}

pub fn and(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::And, left, right)
}

pub fn or(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Or, left, right)
}

pub fn elvis(left: Expr, right: Expr) -> Expr {
    binary(BinaryOp::Elvis, left, right)
}

pub fn not(operand: Expr) -> Expr {
    unary(UnaryOp::Not, operand)
}

pub fn not_null(operand: Expr) -> Expr {
    unary(UnaryOp::NotNull, operand)
}

// === Compound expressions ===

pub fn if_expr(condition: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    sp(Expression::If {
        condition: Box::new(condition),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    })
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    sp(Expression::Call {
        name: ident(name),
        args,
    })
}

/// Tuple literal from `(name, expr)` pairs
pub fn tuple(fields: Vec<(Option<&str>, Expr)>) -> Expr {
    let fields = fields
        .into_iter()
        .map(|(name, expr)| TupleField {
            name: name.map(ident),
            expr,
        })
        .collect();
    sp(Expression::Tuple(fields))
}

pub fn list(items: Vec<Expr>) -> Expr {
    sp(Expression::List(items))
}

// === When ===

pub fn when(key: Option<Expr>, cases: Vec<WhenCase>) -> Expr {
    sp(Expression::When(Box::new(WhenExpr {
        key: key.map(Box::new),
        cases,
    })))
}

pub fn case(conditions: Vec<Expr>, body: Expr) -> WhenCase {
    WhenCase {
        condition: WhenCondition::Exprs(SmallVec::from_vec(conditions)),
        body,
    }
}

pub fn else_case(body: Expr) -> WhenCase {
    WhenCase {
        condition: WhenCondition::Else(Span::default()),
        body,
    }
}

// === At ===

pub fn from(expr: Expr) -> FromItem {
    FromItem { alias: None, expr }
}

pub fn from_alias(alias: &str, expr: Expr) -> FromItem {
    FromItem {
        alias: Some(ident(alias)),
        expr,
    }
}

/// An at-expression with no where-part and the default what-part
pub fn at(cardinality: AtCardinality, from: Vec<FromItem>) -> AtExpr {
    AtExpr {
        from,
        cardinality: sp(cardinality),
        where_: Vec::new(),
        what: What::Default,
        limit: None,
        offset: None,
    }
}

impl AtExpr {
    pub fn with_where(mut self, expr: Expr) -> Self {
        self.where_.push(expr);
        self
    }

    pub fn with_fields(mut self, fields: Vec<WhatField>) -> Self {
        self.what = What::Fields(fields);
        self
    }

    pub fn with_limit(mut self, expr: Expr) -> Self {
        self.limit = Some(Box::new(expr));
        self
    }

    pub fn with_offset(mut self, expr: Expr) -> Self {
        self.offset = Some(Box::new(expr));
        self
    }

    pub fn into_expr(self) -> Expr {
        sp(Expression::At(Box::new(self)))
    }
}

pub fn field(expr: Expr) -> WhatField {
    WhatField {
        name: WhatFieldName::Implicit,
        expr,
        annotations: SmallVec::new(),
        deprecated_sort: None,
    }
}

impl WhatField {
    pub fn named(mut self, name: &str) -> Self {
        self.name = WhatFieldName::Explicit(ident(name));
        self
    }

    pub fn unnamed(mut self) -> Self {
        self.name = WhatFieldName::Unnamed;
        self
    }

    pub fn annotate(mut self, annotation: WhatAnnotation) -> Self {
        self.annotations.push(sp(annotation));
        self
    }

    pub fn legacy_sort(mut self, direction: SortDirection) -> Self {
        self.deprecated_sort = Some(sp(direction));
        self
    }
}

// === Statements ===

pub fn ty(name: &str) -> Spanned<TypeSpecifier> {
    sp(TypeSpecifier::named(name))
}

pub fn nullable_ty(name: &str) -> Spanned<TypeSpecifier> {
    sp(TypeSpecifier::named(name).nullable())
}

pub fn val(name: &str, ty: Option<Spanned<TypeSpecifier>>, init: Option<Expr>) -> Stmt {
    sp(Statement::Var {
        mutable: false,
        name: ident(name),
        ty,
        init,
    })
}

pub fn var(name: &str, ty: Option<Spanned<TypeSpecifier>>, init: Option<Expr>) -> Stmt {
    sp(Statement::Var {
        mutable: true,
        name: ident(name),
        ty,
        init,
    })
}

pub fn assign(target: &str, value: Expr) -> Stmt {
    assign_op(target, AssignOp::Assign, value)
}

pub fn assign_op(target: &str, op: AssignOp, value: Expr) -> Stmt {
    sp(Statement::Assign {
        target: ident(target),
        op,
        value,
    })
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    sp(Statement::Expr(expr))
}

pub fn if_stmt(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Stmt {
    sp(Statement::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    })
}

pub fn while_stmt(condition: Expr, body: Stmt) -> Stmt {
    sp(Statement::While {
        condition,
        body: Box::new(body),
    })
}

pub fn for_stmt(var: &str, iterable: Expr, body: Stmt) -> Stmt {
    sp(Statement::For {
        var: ident(var),
        iterable,
        body: Box::new(body),
    })
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    sp(Statement::Block(stmts))
}
