//! Expression compiler
//!
//! [`compile_expr`] turns one syntax node into a [`CompiledExpr`]. Errors
//! are reported to the context's sink and replaced by an error-typed
//! expression, so compilation always produces a result.
//!
//! Sub-modules by syntax family:
//! - `names`: variables, implicit attributes, placeholders, globals
//! - `literals`: literals, tuples, lists
//! - `ops`: binary and unary operators, the if-expression
//! - `member`: member access
//! - `builtins`: `exists`, `empty`, `require`
//! - `types`: type expressions

mod builtins;
mod literals;
mod member;
pub(crate) mod names;
pub(crate) mod ops;
mod types;

pub use types::resolve_type;

use crate::context::CompilationContext;
use crate::expr::{CompiledExpr, Evaluator, NoSql};
use crate::facts::ExprFacts;
use crate::operators::{OperandCast, Unresolved, cast_type};
use crate::sql::DbExpr;
use rell_sema_ast::{Expr, Expression};
use rell_sema_diagnostics::{ErrorCode, RELL0100, RELL0101, RELL0102, RELL0407, Span};
use rell_sema_types::{Adapter, ResolvedType, Value};

/// Compile an expression
pub fn compile_expr(ctx: &mut CompilationContext, expr: &Expr) -> CompiledExpr {
    let span = expr.span;
    match &expr.inner {
        Expression::Literal(literal) => literals::compile_literal(ctx, literal, span),
        Expression::Name(name) => names::compile_name(ctx, name, span),
        Expression::Attr(name) => names::compile_attr(ctx, name, span),
        Expression::Placeholder => names::compile_placeholder(ctx, span),
        Expression::Member { base, name, safe } => member::compile_member(ctx, base, name, *safe, span),
        Expression::Binary { op, left, right } => ops::compile_binary(ctx, *op, left, right, span),
        Expression::Unary { op, operand } => ops::compile_unary(ctx, *op, operand, span),
        Expression::If {
            condition,
            then_expr,
            else_expr,
        } => ops::compile_if(ctx, condition, then_expr, else_expr, span),
        Expression::When(when) => crate::when::compile_when(ctx, when, span).0,
        Expression::At(at) => crate::at::compile_at(ctx, at, span).0,
        Expression::Call { name, args } => builtins::compile_call(ctx, name, args, span),
        Expression::Tuple(fields) => literals::compile_tuple(ctx, fields, span),
        Expression::List(items) => literals::compile_list(ctx, items, span),
    }
}

/// Report a type mismatch as `<key>:[<expected>]:[<actual>]`; error types are silent
pub(crate) fn type_mismatch(
    ctx: &mut CompilationContext,
    span: Span,
    code: ErrorCode,
    key: &str,
    message: &str,
    expected: &ResolvedType,
    actual: &ResolvedType,
) {
    if expected.is_error() || actual.is_error() {
        return;
    }
    ctx.error(
        span,
        code,
        format!("{key}:[{expected}]:[{actual}]"),
        format!("{message}: {actual} instead of {expected}"),
    );
}

pub(crate) fn report_unresolved(ctx: &mut CompilationContext, span: Span, err: &Unresolved) {
    if err.is_silent() {
        return;
    }
    let code = if err.operands.len() == 2 { RELL0100 } else { RELL0101 };
    ctx.error(span, code, err.key(), err.message());
}

/// Report a database expression that has no SQL form
pub(crate) fn sql_not_allowed(ctx: &mut CompilationContext, span: Span) -> CompiledExpr {
    ctx.error(span, RELL0102, "expr_sqlnotallowed", "Database expression not allowed here");
    CompiledExpr::error(span)
}

/// [`CompiledExpr::combine`], reporting a missing SQL form
pub(crate) fn combine(
    ctx: &mut CompilationContext,
    ty: ResolvedType,
    span: Span,
    parts: &[&CompiledExpr],
    eval: impl FnOnce(Vec<Evaluator>) -> Evaluator,
    db: Option<&dyn Fn(&[DbExpr]) -> DbExpr>,
) -> CompiledExpr {
    match CompiledExpr::combine(ty, span, parts, eval, db) {
        Ok(expr) => expr,
        Err(NoSql) => sql_not_allowed(ctx, span),
    }
}

/// Apply an operand conversion chosen by operator resolution
pub(crate) fn apply_cast(expr: CompiledExpr, cast: Option<&OperandCast>) -> CompiledExpr {
    let Some(cast) = cast else {
        return expr;
    };
    if expr.is_error() {
        return expr;
    }
    let ty = cast_type(&expr.ty, Some(cast));
    let post = expr.facts.post.clone();
    let name = expr.implicit_name.clone();
    let runtime_cast = cast.clone();
    let eval = move |evals: Vec<Evaluator>| {
        let inner = evals[0].clone();
        Evaluator::new(move |frame| {
            let value = inner.call(frame)?;
            match &runtime_cast {
                OperandCast::Promote(adapter) => Ok(adapter.apply(value)?),
                OperandCast::ToText => Ok(Value::Text(value.to_text())),
            }
        })
    };
    // Promoted values compare and compute the same way in SQL
    let db = |ops: &[DbExpr]| match cast {
        OperandCast::Promote(_) => ops[0].clone(),
        OperandCast::ToText => DbExpr::ToText(Box::new(ops[0].clone())),
    };
    match CompiledExpr::combine(ty, expr.span, &[&expr], eval, Some(&db)) {
        Ok(mut res) => {
            res.facts = ExprFacts::of_post(post);
            res.implicit_name = name;
            res
        }
        Err(NoSql) => CompiledExpr::error(expr.span),
    }
}

/// Promote a numeric expression to `target`; other expressions are returned unchanged
pub(crate) fn promote_to(expr: CompiledExpr, target: &ResolvedType) -> CompiledExpr {
    match Adapter::between(&expr.ty, target) {
        Some(adapter) => apply_cast(expr, Some(&OperandCast::Promote(adapter))),
        None => expr,
    }
}

/// Promote expressions of different numeric levels to the highest one
pub(crate) fn promote_all(exprs: Vec<CompiledExpr>) -> Vec<CompiledExpr> {
    let types: Vec<&ResolvedType> = exprs.iter().map(|e| &e.ty).collect();
    match rell_sema_types::promotion_target(&types) {
        Some(target) => exprs.into_iter().map(|e| promote_to(e, &target)).collect(),
        None => exprs,
    }
}

/// Undo smart narrowing for an operand of a null-sensitive operation
///
/// `x!!`, `x?.a`, `x ?: y`, `exists(x)`, `empty(x)` and `require(x)` only
/// make sense for nullable operands. When flow facts have narrowed a
/// nullable variable, the operation still sees the declared type and a
/// warning says the variable is always or never null at that point.
pub(crate) fn denarrowed(ctx: &mut CompilationContext, mut expr: CompiledExpr) -> CompiledExpr {
    let Some(var) = expr.var.clone() else {
        return expr;
    };
    if !var.declared.is_nullable() || expr.ty == var.declared {
        return expr;
    }
    let kind = if expr.ty.is_null() { "always" } else { "never" };
    ctx.warning(
        expr.span,
        RELL0407,
        format!("expr_var_null:{kind}:{}", var.name),
        format!("Variable '{}' is {kind} null at this location", var.name),
    );
    expr.ty = var.declared;
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompilerOptions;
    use crate::runtime::{Frame, NoDatabase};
    use rell_sema_ast::dsl::*;
    use rell_sema_types::Definitions;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn context() -> CompilationContext {
        CompilationContext::new(Arc::new(Definitions::new()), CompilerOptions::default())
    }

    fn run(expr: &CompiledExpr) -> Value {
        let db = NoDatabase;
        let mut frame = Frame::new(&db);
        expr.evaluate(&mut frame).unwrap()
    }

    #[test]
    fn test_promote_to_decimal() {
        let mut ctx = context();
        let expr = compile_expr(&mut ctx, &int(5));
        let promoted = promote_to(expr, &ResolvedType::Decimal);
        assert_eq!(promoted.ty, ResolvedType::Decimal);
        assert_eq!(promoted.constant, Some(Value::Decimal(Decimal::from(5))));
    }

    #[test]
    fn test_promote_all_picks_highest_level() {
        let mut ctx = context();
        let items = vec![compile_expr(&mut ctx, &int(1)), compile_expr(&mut ctx, &bigint("2"))];
        let promoted = promote_all(items);
        assert!(promoted.iter().all(|e| e.ty == ResolvedType::BigInteger));
        assert_eq!(run(&promoted[0]).to_string(), "1");
    }

    #[test]
    fn test_type_mismatch_silent_for_errors() {
        let mut ctx = context();
        type_mismatch(
            &mut ctx,
            Span::default(),
            RELL0100,
            "k",
            "Mismatch",
            &ResolvedType::Error,
            &ResolvedType::Integer,
        );
        assert!(!ctx.sink().has_errors());
        type_mismatch(
            &mut ctx,
            Span::default(),
            RELL0100,
            "k",
            "Mismatch",
            &ResolvedType::Boolean,
            &ResolvedType::Integer,
        );
        assert_eq!(ctx.sink().keys(), vec!["k:[boolean]:[integer]"]);
        assert_eq!(ctx.diagnostics()[0].message, "Mismatch: integer instead of boolean");
    }
}
