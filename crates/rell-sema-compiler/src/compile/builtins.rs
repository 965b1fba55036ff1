//! Built-in functions that take part in null analysis
//!
//! - `exists(x)` / `empty(x)`: null test of a nullable value, or an
//!   emptiness test of a collection
//! - `require(x)`, `require(x, message)`: fault unless `x` is true, not null
//!   or a non-empty collection; the value passes through narrowed

use super::{combine, compile_expr, denarrowed};
use crate::context::CompilationContext;
use crate::error::EvalError;
use crate::expr::{CompiledExpr, Evaluator};
use crate::facts::ExprFacts;
use crate::sql::DbExpr;
use rell_sema_ast::{Expr, Name};
use rell_sema_diagnostics::{RELL0008, RELL0009, RELL0104, Span};
use rell_sema_types::{ResolvedType, Value};

pub(crate) fn compile_call(ctx: &mut CompilationContext, name: &Name, args: &[Expr], span: Span) -> CompiledExpr {
    match name.inner.as_str() {
        "exists" => compile_exists(ctx, name, args, false, span),
        "empty" => compile_exists(ctx, name, args, true, span),
        "require" => compile_require(ctx, name, args, span),
        other => {
            ctx.error(name.span, RELL0008, format!("unknown_fn:{other}"), format!("Unknown function: '{other}'"));
            CompiledExpr::error(span)
        }
    }
}

fn check_arg_count(ctx: &mut CompilationContext, name: &Name, count: usize, min: usize, max: usize) -> bool {
    if (min..=max).contains(&count) {
        return true;
    }
    let expected = if min == max { min.to_string() } else { format!("{min}..{max}") };
    ctx.error(
        name.span,
        RELL0009,
        format!("expr_call_argcnt:{}:{expected}:{count}", name.inner),
        format!("Wrong number of arguments for '{}': {count} instead of {expected}", name.inner),
    );
    false
}

fn wrong_arg_types(ctx: &mut CompilationContext, name: &Name, types: &[&ResolvedType], span: Span) -> CompiledExpr {
    if types.iter().any(|t| t.is_error()) {
        return CompiledExpr::error(span);
    }
    let list: Vec<String> = types.iter().map(|t| t.to_string()).collect();
    ctx.error(
        name.span,
        RELL0104,
        format!("expr_call_argtypes:{}:{}", name.inner, list.join(",")),
        format!("Function '{}' undefined for arguments ({})", name.inner, list.join(", ")),
    );
    CompiledExpr::error(span)
}

fn is_collection(ty: &ResolvedType) -> bool {
    matches!(
        ty,
        ResolvedType::List(_) | ResolvedType::Set(_) | ResolvedType::Map(..) | ResolvedType::Virtual(_)
    )
}

fn compile_exists(ctx: &mut CompilationContext, name: &Name, args: &[Expr], empty: bool, span: Span) -> CompiledExpr {
    if !check_arg_count(ctx, name, args.len(), 1, 1) {
        return CompiledExpr::error(span);
    }
    let arg = compile_expr(ctx, &args[0]);
    let arg = denarrowed(ctx, arg);
    let post = arg.facts.post.clone();

    if arg.ty.is_nullable() {
        let facts = match &arg.var {
            Some(var) => ExprFacts::for_null_check(var.uid, empty).with_post(post),
            None => ExprFacts::of_post(post),
        };
        let build = move |evals: Vec<Evaluator>| {
            let inner = evals[0].clone();
            Evaluator::new(move |frame| Ok(Value::Boolean(inner.call(frame)?.is_null() == empty)))
        };
        let db = move |ops: &[DbExpr]| DbExpr::is_null(ops[0].clone(), !empty);
        return combine(ctx, ResolvedType::Boolean, span, &[&arg], build, Some(&db)).with_facts(facts);
    }

    if is_collection(&arg.ty) {
        let build = move |evals: Vec<Evaluator>| {
            let inner = evals[0].clone();
            Evaluator::new(move |frame| {
                let value = inner.call(frame)?;
                let len = value
                    .len()
                    .ok_or_else(|| EvalError::internal(format!("not a collection: {value}")))?;
                Ok(Value::Boolean((len == 0) == empty))
            })
        };
        return combine(ctx, ResolvedType::Boolean, span, &[&arg], build, None).with_facts(ExprFacts::of_post(post));
    }

    wrong_arg_types(ctx, name, &[&arg.ty], span)
}

/// What `require` checks, by operand type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequireKind {
    True,
    NotNull,
    NotEmpty,
}

fn compile_require(ctx: &mut CompilationContext, name: &Name, args: &[Expr], span: Span) -> CompiledExpr {
    if !check_arg_count(ctx, name, args.len(), 1, 2) {
        return CompiledExpr::error(span);
    }
    let value = compile_expr(ctx, &args[0]);
    let value = denarrowed(ctx, value);
    let message = args
        .get(1)
        .map(|arg| ctx.with_facts(&value.facts.post, |ctx| compile_expr(ctx, arg)));

    if let Some(message) = &message {
        if message.ty != ResolvedType::Text {
            return wrong_arg_types(ctx, name, &[&value.ty, &message.ty], span);
        }
    }

    let (kind, ty, facts) = if value.ty == ResolvedType::Boolean {
        (RequireKind::True, ResolvedType::Unit, ExprFacts::of_post(value.facts.when_true()))
    } else if value.ty.is_nullable() && !value.ty.is_null() {
        let facts = match &value.var {
            Some(var) => ExprFacts::for_null_cast(value.facts.post.clone(), var.uid),
            None => ExprFacts::of_post(value.facts.post.clone()),
        };
        (RequireKind::NotNull, value.ty.unwrap_nullable().clone(), facts)
    } else if is_collection(&value.ty) {
        (RequireKind::NotEmpty, value.ty.clone(), ExprFacts::of_post(value.facts.post.clone()))
    } else {
        return wrong_arg_types(ctx, name, &[&value.ty], span);
    };

    // A failed requirement is reported where it runs, not while compiling
    let value = value.impure();
    let mut parts = vec![&value];
    if let Some(message) = &message {
        parts.push(message);
    }
    let build = move |evals: Vec<Evaluator>| {
        let inner = evals[0].clone();
        let message = evals.get(1).cloned();
        Evaluator::new(move |frame| {
            let value = inner.call(frame)?;
            let holds = match kind {
                RequireKind::True => value.as_bool() == Some(true),
                RequireKind::NotNull => !value.is_null(),
                RequireKind::NotEmpty => value.len().is_some_and(|len| len > 0),
            };
            if holds {
                return Ok(if kind == RequireKind::True { Value::Unit } else { value });
            }
            let message = match &message {
                Some(eval) => eval.call(frame)?.as_text().map(str::to_string),
                None => None,
            };
            Err(EvalError::Requirement { message })
        })
    };
    combine(ctx, ty, span, &parts, build, None).with_facts(facts)
}
