//! Where-part
//!
//! Every where-expression becomes a boolean condition:
//! - a boolean expression is used as is
//! - a variable is compared with the attribute of the same name, falling
//!   back to the attribute of the same type
//! - any other value is compared with the only attribute of its type
//!
//! The conditions are joined with `and`; each one is compiled under the
//! facts of the previous ones being true.

use crate::compile::names::compile_frame_attr;
use crate::compile::ops::compile_binary_exprs;
use crate::compile::{compile_expr, type_mismatch};
use crate::context::CompilationContext;
use crate::expr::CompiledExpr;
use crate::facts::VarFacts;
use crate::scope::{AtFrame, FrameAttr};
use rell_sema_ast::{BinaryOp, Expr};
use rell_sema_diagnostics::{RELL0203, RELL0204, RELL0205};
use rell_sema_types::ResolvedType;

pub(crate) fn compile_where(ctx: &mut CompilationContext, frame: &AtFrame, exprs: &[Expr]) -> Option<CompiledExpr> {
    let mut facts = VarFacts::empty();
    let mut result: Option<CompiledExpr> = None;
    for (idx, expr) in exprs.iter().enumerate() {
        let condition = ctx.with_facts(&facts, |ctx| {
            let value = compile_expr(ctx, expr);
            where_condition(ctx, frame, idx, value)
        });
        facts = facts.put(&condition.facts.when_true());
        result = Some(match result {
            None => condition,
            Some(left) => {
                let span = left.span.merge(condition.span);
                compile_binary_exprs(ctx, BinaryOp::And, left, condition, span)
            }
        });
    }
    result
}

fn where_condition(ctx: &mut CompilationContext, frame: &AtFrame, idx: usize, expr: CompiledExpr) -> CompiledExpr {
    if expr.is_error() {
        return expr;
    }
    let own = expr.depends_on(frame.id);
    if !own {
        if let Some(var) = expr.var.clone() {
            return by_variable(ctx, frame, idx, &var.name, expr);
        }
    }
    if expr.ty == ResolvedType::Boolean {
        return expr;
    }
    if own {
        type_mismatch(
            ctx,
            expr.span,
            RELL0203,
            &format!("at_where:type:{idx}"),
            "Wrong type of where-expression",
            &ResolvedType::Boolean,
            &expr.ty,
        );
        return CompiledExpr::error(expr.span);
    }

    let attrs = frame.attributes_by_type(&expr.ty);
    match attrs.as_slice() {
        [attr] => attribute_equals(ctx, attr, expr),
        [] => {
            ctx.error(
                expr.span,
                RELL0204,
                format!("at_where_type:{idx}:{}", expr.ty),
                format!("No attribute matches type of where-expression ({})", expr.ty),
            );
            CompiledExpr::error(expr.span)
        }
        many => {
            ctx.error(
                expr.span,
                RELL0205,
                format!("at_attr_type_ambig:{idx}:{}:[{}]", expr.ty, qualified_names(many)),
                format!("Multiple attributes match type of where-expression ({})", expr.ty),
            );
            CompiledExpr::error(expr.span)
        }
    }
}

fn by_variable(ctx: &mut CompilationContext, frame: &AtFrame, idx: usize, name: &str, expr: CompiledExpr) -> CompiledExpr {
    let by_name = frame.attributes_by_name(name);
    if by_name.is_empty() && expr.ty == ResolvedType::Boolean {
        ctx.warning(
            expr.span,
            RELL0204,
            format!("at:where:name_boolean_no_attr:{name}"),
            format!("No attribute matches name '{name}', the boolean value is used as a condition"),
        );
        return expr;
    }

    let candidates: Vec<FrameAttr> = if by_name.is_empty() {
        frame.attributes_by_type(&expr.ty)
    } else {
        by_name
            .iter()
            .filter(|a| a.ty().unwrap_nullable() == expr.ty.unwrap_nullable())
            .cloned()
            .collect()
    };
    match candidates.as_slice() {
        [attr] => attribute_equals(ctx, attr, expr),
        [] => {
            ctx.error(
                expr.span,
                RELL0204,
                format!("at_where:var_noattrs:{idx}:{name}:{}", expr.ty),
                format!("No attribute matches name '{name}' or type {}", expr.ty),
            );
            CompiledExpr::error(expr.span)
        }
        many => {
            let kind = if by_name.is_empty() { "type" } else { "nametype" };
            ctx.error(
                expr.span,
                RELL0205,
                format!("at_where:var_manyattrs_{kind}:{idx}:{name}:{}:[{}]", expr.ty, qualified_names(many)),
                format!("Multiple attributes match variable '{name}' of type {}", expr.ty),
            );
            CompiledExpr::error(expr.span)
        }
    }
}

fn attribute_equals(ctx: &mut CompilationContext, attr: &FrameAttr, expr: CompiledExpr) -> CompiledExpr {
    log::trace!("where-expression matched attribute {}", attr.qualified_name());
    let span = expr.span;
    let attr = compile_frame_attr(attr, span);
    compile_binary_exprs(ctx, BinaryOp::Eq, attr, expr, span)
}

fn qualified_names(attrs: &[FrameAttr]) -> String {
    attrs.iter().map(FrameAttr::qualified_name).collect::<Vec<_>>().join(",")
}
