//! What-part: result fields, their names, sorting and summarization

use super::from::AtSource;
use super::plan::{FieldSummary, QueryField};
use crate::compile::compile_expr;
use crate::compile::names::{compile_entity, compile_var};
use crate::context::CompilationContext;
use crate::expr::CompiledExpr;
use crate::scope::FrameSource;
use crate::sql::AggregateKind;
use rell_sema_ast::{SortDirection, What, WhatAnnotation, WhatField, WhatFieldName};
use rell_sema_diagnostics::{RELL0206, RELL0207, RELL0208, RELL0209, RELL0211, RELL0212, Span};
use rell_sema_types::{ResolvedType, TupleField};
use std::collections::HashSet;

/// Compiled what-part
#[derive(Debug)]
pub(crate) struct CompiledWhat {
    pub fields: Vec<QueryField>,
    /// Type of one result row
    pub row_type: ResolvedType,
    /// Rows are tuples rather than the value of the single field
    pub tuple_row: bool,
    /// A field was rejected; the query has no usable plan
    pub failed: bool,
}

pub(crate) fn compile_what(ctx: &mut CompilationContext, source: &AtSource, what: &What, span: Span) -> Option<CompiledWhat> {
    let (fields, failed) = match what {
        What::Default => (default_fields(ctx, source, span), false),
        What::Fields(fields) => explicit_fields(ctx, source, fields, span)?,
    };
    Some(finish(fields, failed))
}

/// The entity, the tuple of all entities, or the collection element
fn default_fields(ctx: &mut CompilationContext, source: &AtSource, span: Span) -> Vec<QueryField> {
    match &source.frame.source {
        FrameSource::Db(entities) => {
            let named = entities.len() > 1;
            entities
                .iter()
                .map(|entity| {
                    let expr = compile_entity(ctx, entity, span);
                    QueryField::plain(named.then(|| entity.alias.clone()), expr)
                })
                .collect()
        }
        FrameSource::Collection { item, .. } => vec![QueryField::plain(None, compile_var(ctx, item, span))],
    }
}

/// Annotations of one field, before its expression is compiled
#[derive(Debug, Default)]
struct FieldFlags {
    omit: bool,
    sort: Option<SortDirection>,
    summary: Option<WhatAnnotation>,
    /// Deprecated syntax reported as an error
    rejected: bool,
}

fn field_flags(ctx: &mut CompilationContext, field: &WhatField) -> FieldFlags {
    let mut flags = FieldFlags::default();
    for annotation in &field.annotations {
        match annotation.inner {
            WhatAnnotation::Omit => flags.omit = true,
            WhatAnnotation::Sort => flags.sort = Some(SortDirection::Asc),
            WhatAnnotation::SortDesc => flags.sort = Some(SortDirection::Desc),
            other => flags.summary = Some(other),
        }
    }
    if let Some(legacy) = &field.deprecated_sort {
        let replacement = match legacy.inner {
            SortDirection::Asc => WhatAnnotation::Sort,
            SortDirection::Desc => WhatAnnotation::SortDesc,
        };
        flags.rejected = ctx.deprecated(
            legacy.span,
            RELL0212,
            format!("at:what:sort:deprecated:{}", replacement.name()),
            format!("Deprecated sort syntax, use {replacement} instead"),
        );
        flags.sort.get_or_insert(legacy.inner);
    }
    flags
}

/// A compiled field before names are settled
struct PendingField {
    name: Option<(String, bool)>,
    omit: bool,
    sort: Option<SortDirection>,
    annotated: bool,
    summary: Option<FieldSummary>,
    expr: CompiledExpr,
}

fn explicit_fields(
    ctx: &mut CompilationContext,
    source: &AtSource,
    fields: &[WhatField],
    span: Span,
) -> Option<(Vec<QueryField>, bool)> {
    let mut failed = false;
    let flags: Vec<FieldFlags> = fields.iter().map(|f| field_flags(ctx, f)).collect();
    let summarized = flags.iter().any(|f| f.summary.is_some());
    let db = source.frame.is_db();

    let mut pending = Vec::with_capacity(fields.len());
    for (field, flags) in fields.iter().zip(flags) {
        failed |= flags.rejected;
        let expr = compile_expr(ctx, &field.expr);
        let name = match &field.name {
            WhatFieldName::Explicit(name) => Some((name.inner.clone(), true)),
            WhatFieldName::Unnamed => None,
            WhatFieldName::Implicit => {
                let named = !flags.omit && (!summarized || flags.summary == Some(WhatAnnotation::Group));
                expr.implicit_name.clone().filter(|_| named).map(|n| (n, false))
            }
        };
        if flags.sort.is_some() && !expr.ty.is_sortable() && !expr.is_error() {
            ctx.error(
                expr.span,
                RELL0211,
                format!("at:expr:sort:type:{}", expr.ty),
                format!("Type {} is not sortable", expr.ty),
            );
            failed = true;
        }
        let summary = flags.summary.and_then(|annotation| summary(ctx, annotation, &expr, db));
        failed |= flags.summary.is_some() && summary.is_none() && !expr.is_error();
        pending.push(PendingField {
            name,
            omit: flags.omit,
            sort: flags.sort,
            annotated: flags.summary.is_some(),
            summary,
            expr,
        });
    }

    if summarized {
        for (idx, field) in pending.iter().enumerate() {
            if !field.annotated && !field.expr.is_error() {
                ctx.error(
                    field.expr.span,
                    RELL0206,
                    format!("at:what:no_aggr:{idx}"),
                    "Either none or all what-expressions must be annotated with @group, @sum, @min or @max",
                );
                failed = true;
            }
        }
    }

    let selected = pending.iter().filter(|f| !f.omit).count();
    if selected == 0 {
        ctx.error(span, RELL0208, "at:no_fields", "All fields are excluded from the result");
        return None;
    }

    // Explicit duplicates are errors; a repeated inferred name is dropped
    let mut names = HashSet::new();
    let has_group = pending.iter().any(|f| f.summary == Some(FieldSummary::Group));
    let mut result = Vec::with_capacity(pending.len());
    for field in pending {
        let name = match field.name {
            Some((name, explicit)) if !names.insert(name.clone()) => {
                if explicit {
                    ctx.error(
                        field.expr.span,
                        RELL0209,
                        format!("at:dup_field_name:{name}"),
                        format!("Duplicate field name: '{name}'"),
                    );
                    failed = true;
                }
                None
            }
            Some((name, explicit)) => (!field.omit && (explicit || selected > 1)).then_some(name),
            None => None,
        };
        let ty = match field.summary {
            Some(FieldSummary::Aggregate(AggregateKind::Min | AggregateKind::Max)) if !has_group => {
                ResolvedType::nullable(field.expr.ty.clone())
            }
            _ => field.expr.ty.clone(),
        };
        result.push(QueryField {
            name,
            ty,
            omit: field.omit,
            sort: field.sort,
            summary: field.summary,
            expr: field.expr,
        });
    }
    Some((result, failed))
}

fn summary(ctx: &mut CompilationContext, annotation: WhatAnnotation, expr: &CompiledExpr, db: bool) -> Option<FieldSummary> {
    let ty = &expr.ty;
    if ty.is_error() {
        return None;
    }
    let (summary, valid) = match annotation {
        WhatAnnotation::Group => {
            let collection = matches!(
                ty.unwrap_nullable(),
                ResolvedType::List(_) | ResolvedType::Set(_) | ResolvedType::Map(..) | ResolvedType::Virtual(_)
            );
            if collection {
                ctx.error(
                    expr.span,
                    RELL0207,
                    format!("expr_at_group_type:{ty}"),
                    format!("Type {ty} cannot be used for grouping"),
                );
                return None;
            }
            (FieldSummary::Group, true)
        }
        WhatAnnotation::Sum => (FieldSummary::Aggregate(AggregateKind::Sum), ty.is_numeric()),
        WhatAnnotation::Min | WhatAnnotation::Max => {
            let kind = if annotation == WhatAnnotation::Min {
                AggregateKind::Min
            } else {
                AggregateKind::Max
            };
            let sql_rejected = db && matches!(ty.unwrap_nullable(), ResolvedType::Boolean | ResolvedType::ByteArray);
            (FieldSummary::Aggregate(kind), ty.is_sortable() && !sql_rejected)
        }
        WhatAnnotation::Omit | WhatAnnotation::Sort | WhatAnnotation::SortDesc => return None,
    };
    if !valid {
        let name = annotation.name().to_uppercase();
        ctx.error(
            expr.span,
            RELL0207,
            format!("at:what:aggr:bad_type:{name}:{ty}"),
            format!("Type {ty} cannot be used with {annotation}"),
        );
        return None;
    }
    Some(summary)
}

fn finish(fields: Vec<QueryField>, failed: bool) -> CompiledWhat {
    let selected: Vec<&QueryField> = fields.iter().filter(|f| !f.omit).collect();
    let (row_type, tuple_row) = match selected.as_slice() {
        [single] if single.name.is_none() => (single.ty.clone(), false),
        _ if selected.iter().any(|f| f.ty.is_error()) => (ResolvedType::Error, true),
        _ => {
            let types = selected
                .iter()
                .map(|f| TupleField {
                    name: f.name.clone(),
                    ty: f.ty.clone(),
                })
                .collect();
            (ResolvedType::tuple(types), true)
        }
    };
    CompiledWhat {
        fields,
        row_type,
        tuple_row,
        failed,
    }
}
