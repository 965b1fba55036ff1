//! At-expression compiler
//!
//! `from @card { where } ( what ) limit n offset m` compiles in stages:
//! - `from`: entity sources or one iterable source, opening the at-scope
//! - `filter`: where-expressions joined into one boolean condition
//! - `what`: result fields with sorting and summarization
//! - `plan`: the executable [`QueryPlan`]
//!
//! A query over entities becomes one SQL statement (`database`); a query
//! over a collection runs in-process (`pipeline`). Either way the compiled
//! expression evaluates the plan when the frame reaches it.

mod database;
mod filter;
mod from;
mod pipeline;
mod plan;
mod what;

pub use plan::{FieldSummary, QueryEntity, QueryField, QueryPlan, QuerySource};
pub(crate) use plan::decode_value;

use crate::compile::{compile_expr, sql_not_allowed, type_mismatch};
use crate::context::CompilationContext;
use crate::expr::{CompiledExpr, Evaluator};
use crate::facts::{ExprFacts, VarFacts};
use crate::ids::AtExprId;
use crate::scope::{FrameSource, ScopeKind};
use database::QueryParts;
use from::AtSource;
use rell_sema_ast::{AtCardinality, AtExpr, Expr};
use rell_sema_diagnostics::{RELL0210, Span};
use rell_sema_types::ResolvedType;
use smallvec::SmallVec;
use std::sync::Arc;

/// Compile an at-expression
///
/// Returns the expression and, unless compilation failed, its plan.
pub fn compile_at(ctx: &mut CompilationContext, at: &AtExpr, span: Span) -> (CompiledExpr, Option<Arc<QueryPlan>>) {
    let id = ctx.ids().next_at_expr();
    let Some(source) = from::compile_from(ctx, id, &at.from, span) else {
        return (CompiledExpr::error(span), None);
    };
    log::trace!("at-expression {id} opened frame over {}", describe(&source));

    let item_facts = match &source.frame.source {
        FrameSource::Collection { item, .. } => VarFacts::for_assignment(item.uid, &item.ty, &item.ty),
        FrameSource::Db(_) => VarFacts::empty(),
    };
    let inner_facts = source.post.put(&item_facts);
    let (filter, what) = ctx.with_facts(&inner_facts, |ctx| {
        ctx.with_scope(ScopeKind::At(source.frame.clone()), |ctx| {
            for (name, symbol) in source.symbols() {
                ctx.scopes.define(name, symbol);
            }
            let filter = filter::compile_where(ctx, &source.frame, &at.where_);
            let filter_facts = filter.as_ref().map_or_else(VarFacts::empty, |f| f.facts.when_true());
            let what = ctx.with_facts(&filter_facts, |ctx| what::compile_what(ctx, &source, &at.what, span));
            (filter, what)
        })
    });

    let (limit, offset) = ctx.with_facts(&source.post, |ctx| {
        let limit = bound(ctx, at.limit.as_deref(), "expr_at_limit_type", "Wrong limit type");
        let offset = bound(ctx, at.offset.as_deref(), "expr_at_offset_type", "Wrong offset type");
        (limit, offset)
    });

    let Some(what) = what else {
        return (CompiledExpr::error(span), None);
    };
    let filter = filter.map(|f| checked_part(ctx, &source, f));
    let fields = what
        .fields
        .into_iter()
        .map(|mut field| {
            field.expr = checked_part(ctx, &source, field.expr);
            field
        })
        .collect::<Vec<_>>();

    let cardinality = at.cardinality.inner;
    let result_type = if what.row_type.is_error() {
        ResolvedType::Error
    } else {
        match cardinality {
            AtCardinality::One => what.row_type.clone(),
            AtCardinality::ZeroOne => ResolvedType::nullable(what.row_type.clone()),
            AtCardinality::OneMany | AtCardinality::ZeroMany => ResolvedType::list(what.row_type.clone()),
        }
    };

    let mut deps: SmallVec<[AtExprId; 2]> = SmallVec::new();
    let parts = filter.iter().chain(fields.iter().map(|f| &f.expr)).chain(limit.iter()).chain(offset.iter());
    for part in parts.chain(source.iterable.iter()) {
        for dep in &part.at_deps {
            if *dep != id && !deps.contains(dep) {
                deps.push(*dep);
            }
        }
    }

    let AtSource {
        frame, iterable, post, ..
    } = source;
    let (source, sql) = match frame.source {
        FrameSource::Db(entities) => {
            let entities: Vec<QueryEntity> = entities
                .iter()
                .map(|e| QueryEntity {
                    id: e.id,
                    alias: e.alias.clone(),
                    entity: e.def.name.clone(),
                    table: e.def.table.clone(),
                })
                .collect();
            let sql = database::render(&QueryParts {
                entities: &entities,
                filter: filter.as_ref(),
                fields: &fields,
                limit: limit.as_ref(),
                offset: offset.as_ref(),
            });
            (QuerySource::Entities(entities), sql)
        }
        FrameSource::Collection { item, .. } => {
            let Some(expr) = iterable else {
                return (CompiledExpr::error(span), None);
            };
            let expr = if expr.is_db() { sql_not_allowed(ctx, expr.span) } else { expr };
            (QuerySource::Iterable { item: item.uid, expr }, None)
        }
    };

    let failed = result_type.is_error()
        || what.failed
        || fields.iter().any(|f| f.expr.is_error())
        || filter.iter().chain(limit.iter()).chain(offset.iter()).any(CompiledExpr::is_error)
        || matches!(&source, QuerySource::Iterable { expr, .. } if expr.is_error())
        || matches!(&source, QuerySource::Entities(_) if sql.is_none());
    if failed {
        return (CompiledExpr::error(span), None);
    }

    let plan = Arc::new(QueryPlan {
        id,
        source,
        filter,
        fields,
        limit,
        offset,
        cardinality,
        row_type: what.row_type,
        result_type: result_type.clone(),
        tuple_row: what.tuple_row,
        sql,
        defs: ctx.definitions_arc(),
    });
    log::debug!("built query plan {id}: {plan}");

    let runner = Arc::clone(&plan);
    let expr = CompiledExpr::interpreted(result_type, span, Evaluator::new(move |frame| runner.execute(frame)))
        .impure()
        .with_facts(ExprFacts::of_post(post))
        .with_deps(&deps);
    (expr, Some(plan))
}

fn describe(source: &AtSource) -> String {
    match &source.frame.source {
        FrameSource::Db(entities) => {
            let names: Vec<&str> = entities.iter().map(|e| e.def.name.as_str()).collect();
            names.join(", ")
        }
        FrameSource::Collection { item, .. } => format!("{}: {}", item.name, item.ty),
    }
}

/// Limit or offset: an integer computed before the query runs
fn bound(ctx: &mut CompilationContext, expr: Option<&Expr>, key: &str, message: &str) -> Option<CompiledExpr> {
    let expr = compile_expr(ctx, expr?);
    if expr.is_error() {
        return Some(expr);
    }
    if expr.ty != ResolvedType::Integer {
        type_mismatch(ctx, expr.span, RELL0210, key, message, &ResolvedType::Integer, &expr.ty);
        return Some(CompiledExpr::error(expr.span));
    }
    if expr.is_db() {
        return Some(sql_not_allowed(ctx, expr.span));
    }
    Some(expr)
}

/// A where- or what-part must be computable by the engine running the query
fn checked_part(ctx: &mut CompilationContext, source: &AtSource, expr: CompiledExpr) -> CompiledExpr {
    if expr.is_error() {
        return expr;
    }
    let runnable = if source.frame.is_db() {
        expr.to_db().is_some()
    } else {
        !expr.is_db()
    };
    if runnable { expr } else { sql_not_allowed(ctx, expr.span) }
}
