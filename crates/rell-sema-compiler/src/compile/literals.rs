//! Literals, tuple and list expressions

use super::{combine, compile_expr, promote_all, type_mismatch};
use crate::context::CompilationContext;
use crate::error::EvalResult;
use crate::expr::{CompiledExpr, Evaluator};
use crate::facts::ExprFacts;
use num_bigint::BigInt;
use rell_sema_ast::{Expr, Literal, TupleField};
use rell_sema_diagnostics::{RELL0006, RELL0007, RELL0010, RELL0012, Span};
use rell_sema_types::{ResolvedType, TupleField as TypeField, Value};
use std::collections::HashSet;

pub(crate) fn compile_literal(ctx: &mut CompilationContext, literal: &Literal, span: Span) -> CompiledExpr {
    let (value, ty) = match literal {
        Literal::Null => (Value::Null, ResolvedType::Null),
        Literal::Boolean(b) => (Value::Boolean(*b), ResolvedType::Boolean),
        Literal::Integer(i) => (Value::Integer(*i), ResolvedType::Integer),
        Literal::BigInteger(digits) => match digits.parse::<BigInt>() {
            Ok(value) => (Value::BigInteger(value), ResolvedType::BigInteger),
            Err(_) => {
                ctx.error(
                    span,
                    RELL0012,
                    format!("expr_literal_bigint:{digits}"),
                    format!("Invalid big integer literal: '{digits}'"),
                );
                return CompiledExpr::error(span);
            }
        },
        Literal::Decimal(d) => (Value::Decimal(*d), ResolvedType::Decimal),
        Literal::Text(s) => (Value::Text(s.clone()), ResolvedType::Text),
        Literal::ByteArray(bytes) => (Value::ByteArray(bytes.clone()), ResolvedType::ByteArray),
    };
    CompiledExpr::constant(value, ty, span)
}

/// Compile operands left to right, each under the post facts of the previous ones
pub(crate) fn compile_sequence<'a>(
    ctx: &mut CompilationContext,
    exprs: impl IntoIterator<Item = &'a Expr>,
) -> Vec<CompiledExpr> {
    let mut compiled: Vec<CompiledExpr> = Vec::new();
    for expr in exprs {
        let post = ExprFacts::for_sub_exprs(compiled.iter().map(|e| &e.facts)).post;
        compiled.push(ctx.with_facts(&post, |ctx| compile_expr(ctx, expr)));
    }
    compiled
}

fn sequence_eval(evals: Vec<Evaluator>, build: fn(Vec<Value>) -> Value) -> Evaluator {
    Evaluator::new(move |frame| {
        let values = evals.iter().map(|e| e.call(frame)).collect::<EvalResult<Vec<_>>>()?;
        Ok(build(values))
    })
}

pub(crate) fn compile_tuple(ctx: &mut CompilationContext, fields: &[TupleField], span: Span) -> CompiledExpr {
    let mut names = HashSet::new();
    for field in fields {
        if let Some(name) = &field.name {
            if !names.insert(name.inner.as_str()) {
                ctx.error(
                    name.span,
                    RELL0006,
                    format!("expr_tuple_dupname:{}", name.inner),
                    format!("Duplicate field: '{}'", name.inner),
                );
            }
        }
    }

    let exprs = compile_sequence(ctx, fields.iter().map(|f| &f.expr));
    let mut failed = names.len() < fields.iter().filter(|f| f.name.is_some()).count();
    for expr in &exprs {
        if expr.ty.is_unit() {
            ctx.error(expr.span, RELL0010, "expr_tuple_unit", "Type of expression is unit");
            failed = true;
        }
        failed |= expr.is_error();
    }
    if failed {
        return CompiledExpr::error(span);
    }

    let ty = ResolvedType::tuple(
        fields
            .iter()
            .zip(&exprs)
            .map(|(field, expr)| TypeField {
                name: field.name.as_ref().map(|n| n.inner.clone()),
                ty: expr.ty.clone(),
            })
            .collect(),
    );
    let facts = ExprFacts::for_sub_exprs(exprs.iter().map(|e| &e.facts));
    let parts: Vec<&CompiledExpr> = exprs.iter().collect();
    combine(ctx, ty, span, &parts, |evals| sequence_eval(evals, Value::tuple), None).with_facts(facts)
}

pub(crate) fn compile_list(ctx: &mut CompilationContext, items: &[Expr], span: Span) -> CompiledExpr {
    if items.is_empty() {
        ctx.error(
            span,
            RELL0007,
            "expr_list_no_type",
            "Cannot determine the type of the list; use list<T>() syntax to specify the type",
        );
        return CompiledExpr::error(span);
    }

    let exprs = compile_sequence(ctx, items);
    if exprs.iter().any(|e| e.is_error()) {
        return CompiledExpr::error(span);
    }
    if let Some(unit) = exprs.iter().find(|e| e.ty.is_unit()) {
        ctx.error(unit.span, RELL0010, "expr_list_unit", "Element expression returns nothing");
        return CompiledExpr::error(span);
    }

    let exprs = promote_all(exprs);
    let mut elem = exprs[0].ty.clone();
    for expr in &exprs[1..] {
        match ResolvedType::common_type(&elem, &expr.ty) {
            Some(common) => elem = common,
            None => {
                type_mismatch(ctx, expr.span, RELL0007, "expr_list_itemtype", "Wrong list item type", &elem, &expr.ty);
                return CompiledExpr::error(span);
            }
        }
    }

    let facts = ExprFacts::for_sub_exprs(exprs.iter().map(|e| &e.facts));
    let parts: Vec<&CompiledExpr> = exprs.iter().collect();
    combine(ctx, ResolvedType::list(elem), span, &parts, |evals| sequence_eval(evals, Value::list), None).with_facts(facts)
}
