//! Operators and the if-expression
//!
//! Operands are compiled in evaluation order. The right side of `and`, `or`
//! and `?:` only runs for some values of the left side, so it is compiled
//! under the left side's conditional facts.

use super::{apply_cast, combine, compile_expr, denarrowed, promote_all, report_unresolved, type_mismatch};
use crate::context::CompilationContext;
use crate::error::EvalError;
use crate::expr::{CompiledExpr, Evaluator};
use crate::facts::{ExprFacts, VarFacts};
use crate::operators::{BinaryKind, BinaryOperator, resolve_binary, resolve_unary};
use crate::sql::{DbExpr, SqlOp};
use rell_sema_ast::{BinaryOp, Expr, UnaryOp};
use rell_sema_diagnostics::{RELL0005, RELL0010, Span};
use rell_sema_types::{ResolvedType, Value};

pub(crate) fn compile_binary(
    ctx: &mut CompilationContext,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    span: Span,
) -> CompiledExpr {
    let mut left = compile_expr(ctx, left);
    if op == BinaryOp::Elvis {
        left = denarrowed(ctx, left);
    }
    let right_facts = match op {
        BinaryOp::And => left.facts.when_true(),
        BinaryOp::Or => left.facts.when_false(),
        _ => left.facts.post.clone(),
    };
    let right = ctx.with_facts(&right_facts, |ctx| compile_expr(ctx, right));
    compile_binary_exprs(ctx, op, left, right, span)
}

/// Apply a binary operator to compiled operands
pub(crate) fn compile_binary_exprs(
    ctx: &mut CompilationContext,
    op: BinaryOp,
    left: CompiledExpr,
    right: CompiledExpr,
    span: Span,
) -> CompiledExpr {
    let operator = match resolve_binary(op, &left.ty, &right.ty) {
        Ok(operator) => operator,
        Err(err) => {
            report_unresolved(ctx, span, &err);
            return CompiledExpr::error(span);
        }
    };
    let null_check = null_check_facts(&operator, &left, &right);

    let left = apply_cast(left, operator.left_cast.as_ref());
    let right = apply_cast(right, operator.right_cast.as_ref());
    match &operator.kind {
        BinaryKind::Strict { .. } => compile_strict(ctx, &operator, left, right, span, null_check),
        BinaryKind::And => compile_and_or(ctx, true, left, right, span),
        BinaryKind::Or => compile_and_or(ctx, false, left, right, span),
        BinaryKind::Elvis => compile_elvis(ctx, &operator, left, right, span),
    }
}

/// Facts of `x == null` or `x != null` for a local variable `x`
fn null_check_facts(operator: &BinaryOperator, left: &CompiledExpr, right: &CompiledExpr) -> Option<ExprFacts> {
    let null_if_true = match operator.op {
        BinaryOp::Eq => true,
        BinaryOp::Ne => false,
        _ => return None,
    };
    let var = match (&left.constant, &right.constant) {
        (_, Some(Value::Null)) => left.var.as_ref(),
        (Some(Value::Null), _) => right.var.as_ref(),
        _ => None,
    }?;
    var.declared
        .is_nullable()
        .then(|| ExprFacts::for_null_check(var.uid, null_if_true))
}

fn compile_strict(
    ctx: &mut CompilationContext,
    operator: &BinaryOperator,
    left: CompiledExpr,
    right: CompiledExpr,
    span: Span,
    null_check: Option<ExprFacts>,
) -> CompiledExpr {
    let BinaryKind::Strict { eval, sql } = &operator.kind else {
        return CompiledExpr::error(span);
    };
    let post = ExprFacts::for_sub_exprs([&left.facts, &right.facts]).post;
    let facts = match null_check {
        Some(facts) => facts.with_post(post),
        None => ExprFacts::of_post(post),
    };

    let left_null = left.constant == Some(Value::Null);
    let right_null = right.constant == Some(Value::Null);
    let null_test = matches!(operator.op, BinaryOp::Eq | BinaryOp::Ne) && (left_null || right_null);
    let negated = operator.op == BinaryOp::Ne;
    let db = sql.map(|sql| {
        move |ops: &[DbExpr]| {
            if null_test {
                let other = if left_null { &ops[1] } else { &ops[0] };
                DbExpr::is_null(other.clone(), negated)
            } else {
                DbExpr::binary(sql, ops[0].clone(), ops[1].clone())
            }
        }
    });

    let eval = eval.clone();
    let build = move |evals: Vec<Evaluator>| {
        let (l, r) = (evals[0].clone(), evals[1].clone());
        Evaluator::new(move |frame| {
            let a = l.call(frame)?;
            let b = r.call(frame)?;
            eval(&a, &b)
        })
    };
    let db_ref = db.as_ref().map(|f| f as &dyn Fn(&[DbExpr]) -> DbExpr);
    combine(ctx, operator.result.clone(), span, &[&left, &right], build, db_ref).with_facts(facts)
}

fn compile_and_or(
    ctx: &mut CompilationContext,
    is_and: bool,
    left: CompiledExpr,
    right: CompiledExpr,
    span: Span,
) -> CompiledExpr {
    let lf = &left.facts;
    let rf = &right.facts;
    let facts = if is_and {
        ExprFacts {
            true_facts: lf.when_true().and(&rf.when_true()),
            false_facts: lf.post.clone(),
            post: lf.post.clone(),
        }
    } else {
        ExprFacts {
            true_facts: lf.post.clone(),
            false_facts: lf.when_false().and(&rf.when_false()),
            post: lf.post.clone(),
        }
    };

    // The right side is skipped once the left side decides the result
    let build = move |evals: Vec<Evaluator>| {
        let (l, r) = (evals[0].clone(), evals[1].clone());
        Evaluator::new(move |frame| match l.call(frame)? {
            Value::Boolean(b) if b != is_and => Ok(Value::Boolean(b)),
            Value::Boolean(_) => r.call(frame),
            other => Err(EvalError::internal(format!("not a boolean: {other}"))),
        })
    };
    let sql = if is_and { SqlOp::And } else { SqlOp::Or };
    let db = move |ops: &[DbExpr]| DbExpr::binary(sql, ops[0].clone(), ops[1].clone());
    combine(ctx, ResolvedType::Boolean, span, &[&left, &right], build, Some(&db)).with_facts(facts)
}

fn compile_elvis(
    ctx: &mut CompilationContext,
    operator: &BinaryOperator,
    left: CompiledExpr,
    right: CompiledExpr,
    span: Span,
) -> CompiledExpr {
    let facts = ExprFacts::of_post(left.facts.post.clone());
    let build = |evals: Vec<Evaluator>| {
        let (l, r) = (evals[0].clone(), evals[1].clone());
        Evaluator::new(move |frame| match l.call(frame)? {
            Value::Null => r.call(frame),
            value => Ok(value),
        })
    };
    let db = |ops: &[DbExpr]| DbExpr::Coalesce(Box::new(ops[0].clone()), Box::new(ops[1].clone()));
    combine(ctx, operator.result.clone(), span, &[&left, &right], build, Some(&db)).with_facts(facts)
}

pub(crate) fn compile_unary(ctx: &mut CompilationContext, op: UnaryOp, operand: &Expr, span: Span) -> CompiledExpr {
    let mut operand = compile_expr(ctx, operand);
    if op == UnaryOp::NotNull {
        operand = denarrowed(ctx, operand);
    }
    let operator = match resolve_unary(op, &operand.ty) {
        Ok(operator) => operator,
        Err(err) => {
            report_unresolved(ctx, span, &err);
            return CompiledExpr::error(span);
        }
    };

    let facts = match op {
        UnaryOp::Not => operand.facts.negate(),
        UnaryOp::NotNull => match &operand.var {
            Some(var) => ExprFacts::for_null_cast(operand.facts.post.clone(), var.uid),
            None => ExprFacts::of_post(operand.facts.post.clone()),
        },
        UnaryOp::Minus | UnaryOp::Plus => ExprFacts::of_post(operand.facts.post.clone()),
    };

    let eval = operator.eval.clone();
    let build = move |evals: Vec<Evaluator>| {
        let inner = evals[0].clone();
        Evaluator::new(move |frame| {
            let value = inner.call(frame)?;
            eval(&value)
        })
    };
    let sql = operator.sql;
    let db = move |ops: &[DbExpr]| match sql {
        Some(sql) => DbExpr::unary(sql, ops[0].clone()),
        None => ops[0].clone(),
    };
    // `+x` is the identity; `x!!` has no SQL form
    let db_ref: Option<&dyn Fn(&[DbExpr]) -> DbExpr> = match (op, sql) {
        (UnaryOp::Plus, _) | (_, Some(_)) => Some(&db),
        _ => None,
    };
    combine(ctx, operator.result.clone(), span, &[&operand], build, db_ref).with_facts(facts)
}

pub(crate) fn compile_if(
    ctx: &mut CompilationContext,
    condition: &Expr,
    then_expr: &Expr,
    else_expr: &Expr,
    span: Span,
) -> CompiledExpr {
    let cond = compile_expr(ctx, condition);
    if cond.ty != ResolvedType::Boolean {
        type_mismatch(
            ctx,
            cond.span,
            RELL0005,
            "expr_if_cond_type",
            "Wrong type of condition expression",
            &ResolvedType::Boolean,
            &cond.ty,
        );
        return CompiledExpr::error(span);
    }

    let when_true = cond.facts.when_true();
    let when_false = cond.facts.when_false();
    let then_c = ctx.with_facts(&when_true, |ctx| compile_expr(ctx, then_expr));
    let else_c = ctx.with_facts(&when_false, |ctx| compile_expr(ctx, else_expr));
    if then_c.is_error() || else_c.is_error() {
        return CompiledExpr::error(span);
    }
    if then_c.ty.is_unit() || else_c.ty.is_unit() {
        ctx.error(span, RELL0010, "expr_if_unit", "Expression returns nothing");
        return CompiledExpr::error(span);
    }

    let mut branches = promote_all(vec![then_c, else_c]).into_iter();
    let (Some(then_c), Some(else_c)) = (branches.next(), branches.next()) else {
        return CompiledExpr::error(span);
    };
    let Some(ty) = ResolvedType::common_type(&then_c.ty, &else_c.ty) else {
        type_mismatch(
            ctx,
            else_c.span,
            RELL0005,
            "expr_if_restype",
            "Incompatible types of if branches",
            &then_c.ty,
            &else_c.ty,
        );
        return CompiledExpr::error(span);
    };

    let post = VarFacts::for_branches(
        ctx.facts(),
        &[when_true.put(&then_c.facts.post), when_false.put(&else_c.facts.post)],
    );
    let build = |evals: Vec<Evaluator>| {
        let (c, t, e) = (evals[0].clone(), evals[1].clone(), evals[2].clone());
        Evaluator::new(move |frame| match c.call(frame)? {
            Value::Boolean(true) => t.call(frame),
            Value::Boolean(false) => e.call(frame),
            other => Err(EvalError::internal(format!("not a boolean: {other}"))),
        })
    };
    let db = |ops: &[DbExpr]| DbExpr::Case {
        cases: vec![(ops[0].clone(), ops[1].clone())],
        default: Some(Box::new(ops[2].clone())),
    };
    combine(ctx, ty, span, &[&cond, &then_c, &else_c], build, Some(&db)).with_facts(ExprFacts::of_post(post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::VarFact;
    use crate::options::CompilerOptions;
    use crate::runtime::{Frame, NoDatabase};
    use pretty_assertions::assert_eq;
    use rell_sema_ast::dsl::*;
    use rell_sema_types::Definitions;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn context() -> CompilationContext {
        CompilationContext::new(Arc::new(Definitions::new()), CompilerOptions::default())
    }

    fn opt_int() -> ResolvedType {
        ResolvedType::nullable(ResolvedType::Integer)
    }

    #[rstest]
    #[case(add(int(1), dec(5, 1)), Value::Decimal(Decimal::new(15, 1)))]
    #[case(add(text("a"), int(1)), Value::text("a1"))]
    #[case(binary(BinaryOp::Lt, int(1), bigint("2")), Value::Boolean(true))]
    #[case(and(boolean(true), boolean(false)), Value::Boolean(false))]
    #[case(elvis(null(), int(3)), Value::Integer(3))]
    #[case(not(boolean(false)), Value::Boolean(true))]
    #[case(if_expr(boolean(false), int(1), dec(2, 0)), Value::Decimal(Decimal::from(2)))]
    fn test_constant_folding(#[case] expr: Expr, #[case] expected: Value) {
        let mut ctx = context();
        let compiled = compile_expr(&mut ctx, &expr);
        assert!(!ctx.sink().has_errors(), "{:?}", ctx.sink().keys());
        assert_eq!(compiled.constant, Some(expected));
    }

    #[test]
    fn test_and_narrows_right_side() {
        let mut ctx = context();
        let x = ctx.declare_param("x", opt_int());
        let expr = compile_expr(&mut ctx, &and(ne(name("x"), null()), gt(name("x"), int(0))));
        assert!(!ctx.sink().has_errors(), "{:?}", ctx.sink().keys());
        assert_eq!(expr.facts.true_facts.nulled(x), Some(VarFact::No));
        assert_eq!(expr.facts.false_facts.nulled(x), None);
    }

    #[test]
    fn test_or_narrows_right_side() {
        let mut ctx = context();
        let x = ctx.declare_param("x", opt_int());
        let expr = compile_expr(&mut ctx, &or(eq(name("x"), null()), gt(name("x"), int(0))));
        assert!(!ctx.sink().has_errors(), "{:?}", ctx.sink().keys());
        assert_eq!(expr.facts.false_facts.nulled(x), Some(VarFact::No));
    }

    #[test]
    fn test_contradicting_operands_meet_to_maybe() {
        let mut ctx = context();
        let x = ctx.declare_param("x", opt_int());
        let expr = compile_expr(&mut ctx, &and(ne(name("x"), null()), eq(name("x"), null())));
        assert!(!ctx.sink().has_errors(), "{:?}", ctx.sink().keys());
        assert_eq!(expr.facts.true_facts.nulled(x), Some(VarFact::Maybe));

        let mut ctx = context();
        let x = ctx.declare_param("x", opt_int());
        let expr = compile_expr(&mut ctx, &or(eq(name("x"), null()), ne(name("x"), null())));
        assert!(!ctx.sink().has_errors(), "{:?}", ctx.sink().keys());
        assert_eq!(expr.facts.false_facts.nulled(x), Some(VarFact::Maybe));
    }

    #[test]
    fn test_operand_without_narrowing_is_rejected() {
        let mut ctx = context();
        ctx.declare_param("x", opt_int());
        let expr = compile_expr(&mut ctx, &gt(name("x"), int(0)));
        assert!(expr.is_error());
        assert_eq!(ctx.sink().keys(), vec!["binop_operand_type:>:[integer?]:[integer]"]);
    }

    #[test]
    fn test_not_null_assertion_narrows_after() {
        let mut ctx = context();
        let x = ctx.declare_param("x", opt_int());
        let expr = compile_expr(&mut ctx, &not_null(name("x")));
        assert_eq!(expr.ty, ResolvedType::Integer);
        assert_eq!(expr.facts.post.nulled(x), Some(VarFact::No));

        let db = NoDatabase;
        let mut frame = Frame::new(&db);
        frame.set(x, Value::Null);
        assert_eq!(expr.evaluate(&mut frame), Err(EvalError::NullValue));
    }

    #[test]
    fn test_redundant_null_operation_warns() {
        let mut ctx = context();
        let x = ctx.declare_param("x", opt_int());
        ctx.apply_facts(&VarFacts::of_nulled(x, VarFact::No));
        let expr = compile_expr(&mut ctx, &elvis(name("x"), int(0)));
        assert_eq!(expr.ty, ResolvedType::Integer);
        assert!(!ctx.sink().has_errors());
        assert_eq!(ctx.sink().keys(), vec!["expr_var_null:never:x"]);
    }

    #[test]
    fn test_if_merges_branch_facts() {
        let mut ctx = context();
        let x = ctx.declare_param("x", opt_int());
        let expr = compile_expr(
            &mut ctx,
            &if_expr(eq(name("x"), null()), int(0), not_null(name("x"))),
        );
        assert!(!ctx.sink().has_errors(), "{:?}", ctx.sink().keys());
        assert_eq!(expr.ty, ResolvedType::Integer);
        // Null in one branch and not null in the other: nothing is known afterwards
        assert_eq!(expr.facts.post.nulled(x), None);
        assert_eq!(ctx.sink().keys(), vec!["expr_var_null:never:x"]);
    }

    #[test]
    fn test_if_errors() {
        let mut ctx = context();
        compile_expr(&mut ctx, &if_expr(int(1), int(1), int(2)));
        compile_expr(&mut ctx, &if_expr(boolean(true), int(1), text("a")));
        assert_eq!(
            ctx.sink().keys(),
            vec!["expr_if_cond_type:[boolean]:[integer]", "expr_if_restype:[integer]:[text]"]
        );
    }

    #[test]
    fn test_division_by_zero_left_for_runtime() {
        let mut ctx = context();
        let expr = compile_expr(&mut ctx, &binary(BinaryOp::Div, int(1), int(0)));
        assert!(expr.constant.is_none());
        let db = NoDatabase;
        let mut frame = Frame::new(&db);
        assert_eq!(expr.evaluate(&mut frame), Err(EvalError::DivisionByZero));
    }
}
