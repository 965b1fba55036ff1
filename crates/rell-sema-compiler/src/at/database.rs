//! Database queries
//!
//! `SELECT fields FROM tables WHERE filter GROUP BY groups ORDER BY sorts
//! LIMIT ? OFFSET ?`. Without summarization the rows are ordered by the
//! sort fields, then by the row ids of the from-entities, so results are
//! deterministic.

use super::plan::{FieldSummary, QueryEntity, QueryField, QueryPlan, clamp_bound, decode_value};
use crate::error::{EvalError, EvalResult};
use crate::expr::{CompiledExpr, Evaluator};
use crate::runtime::Frame;
use crate::sql::{DbExpr, DbTable, SqlBuilder, SqlTemplate};
use rell_sema_ast::SortDirection;
use rell_sema_types::{ResolvedType, Value};

/// Parts of a database query
pub(super) struct QueryParts<'a> {
    pub entities: &'a [QueryEntity],
    pub filter: Option<&'a CompiledExpr>,
    pub fields: &'a [QueryField],
    pub limit: Option<&'a CompiledExpr>,
    pub offset: Option<&'a CompiledExpr>,
}

/// Render the query; `None` if a part has no SQL form
pub(super) fn render(parts: &QueryParts<'_>) -> Option<SqlTemplate> {
    let roots = parts.entities.iter().map(|e| (e.id, e.table.clone())).collect();
    let mut builder = SqlBuilder::new(roots);

    let mut select = SqlTemplate::default();
    for (i, field) in parts.fields.iter().filter(|f| !f.omit).enumerate() {
        if i > 0 {
            select.push_sql(", ");
        }
        select.append(builder.render(&field_sql(field)?));
    }

    let filter = match parts.filter {
        Some(filter) => Some(builder.render(&filter.to_db()?)),
        None => None,
    };

    let mut groups = Vec::new();
    for field in parts.fields.iter().filter(|f| f.summary == Some(FieldSummary::Group)) {
        groups.push(builder.render(&field.expr.to_db()?));
    }

    let mut order = Vec::new();
    for field in parts.fields {
        let Some(direction) = field.sort else {
            continue;
        };
        let mut sort = builder.render(&field_sql(field)?);
        if direction == SortDirection::Desc {
            sort.push_sql(" DESC");
        }
        order.push(sort);
    }
    if !parts.fields.iter().any(|f| f.summary.is_some()) {
        for entity in parts.entities {
            order.push(builder.render(&DbExpr::Rowid(DbTable::root(entity.id))));
        }
    }

    let limit = parts.limit.map(|limit| builder.render(&bound_param(limit)));
    let offset = parts.offset.map(|offset| builder.render(&bound_param(offset)));

    let mut sql = SqlTemplate::default();
    sql.push_sql("SELECT ");
    sql.append(select);
    sql.push_sql(&builder.from_clause());
    if let Some(filter) = filter {
        sql.push_sql(" WHERE ");
        sql.append(filter);
    }
    push_list(&mut sql, " GROUP BY ", groups);
    push_list(&mut sql, " ORDER BY ", order);
    if let Some(limit) = limit {
        sql.push_sql(" LIMIT ");
        sql.append(limit);
    }
    if let Some(offset) = offset {
        sql.push_sql(" OFFSET ");
        sql.append(offset);
    }
    log::debug!("rendered query: {}", sql.sql);
    Some(sql)
}

fn field_sql(field: &QueryField) -> Option<DbExpr> {
    let expr = field.expr.to_db()?;
    Some(match field.summary {
        Some(FieldSummary::Aggregate(kind)) => DbExpr::Aggregate {
            kind,
            operand: Box::new(expr),
        },
        _ => expr,
    })
}

/// Limit and offset are interpreted and bound, clamped at zero as in the pipeline
fn bound_param(expr: &CompiledExpr) -> DbExpr {
    let expr = expr.clone();
    DbExpr::Param(Evaluator::new(move |frame| {
        let value = expr.evaluate(frame)?;
        Ok(Value::Integer(clamp_bound(&value)?))
    }))
}

fn push_list(sql: &mut SqlTemplate, keyword: &str, items: Vec<SqlTemplate>) {
    if items.is_empty() {
        return;
    }
    sql.push_sql(keyword);
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            sql.push_sql(", ");
        }
        sql.append(item);
    }
}

/// Bind parameters, run the query and decode the selected columns
pub(super) fn run(plan: &QueryPlan, frame: &mut Frame<'_>) -> EvalResult<Vec<Vec<Value>>> {
    let template = plan
        .sql
        .as_ref()
        .ok_or_else(|| EvalError::internal(format!("query {} has no SQL", plan.id)))?;
    let sql = template.bind(frame)?;
    let columns: Vec<ResolvedType> = plan.selected().map(|f| f.ty.clone()).collect();
    let rows = frame.query(&sql, &columns)?;
    rows.into_iter()
        .map(|row| {
            if row.len() != columns.len() {
                return Err(EvalError::sql(format!(
                    "expected {} columns, got {}",
                    columns.len(),
                    row.len()
                )));
            }
            row.into_iter()
                .zip(&columns)
                .map(|(value, ty)| decode_value(&plan.defs, ty, value))
                .collect()
        })
        .collect()
}
