//! In-process queries over collections
//!
//! filter → evaluate fields → summarize → sort → offset/limit → select.
//! Without sorting or summarization, offset and limit apply while
//! iterating, so the pipeline stops once enough rows were produced.

use super::plan::{FieldSummary, QueryField, QueryPlan, eval_bound};
use crate::error::{EvalError, EvalResult};
use crate::expr::CompiledExpr;
use crate::ids::VarUid;
use crate::operators::{BinaryFn, BinaryKind, resolve_binary};
use crate::runtime::Frame;
use crate::sql::AggregateKind;
use indexmap::IndexMap;
use num_bigint::BigInt;
use rell_sema_ast::{BinaryOp, SortDirection};
use rell_sema_types::{ResolvedType, Value};
use rust_decimal::Decimal;
use std::cmp::Ordering;

pub(super) fn run(
    plan: &QueryPlan,
    item: VarUid,
    iterable: &CompiledExpr,
    frame: &mut Frame<'_>,
) -> EvalResult<Vec<Vec<Value>>> {
    let source = iterable.evaluate(frame)?;
    let elements = source
        .elements()
        .ok_or_else(|| EvalError::internal(format!("not iterable: {source}")))?;
    let limit = eval_bound(plan.limit.as_ref(), frame)?;
    let offset = eval_bound(plan.offset.as_ref(), frame)?.unwrap_or(0);
    let summarized = plan.is_summarized();
    let sorted = plan.is_sorted();
    let early = !summarized && !sorted;

    let mut rows = Vec::new();
    let mut skipped = 0;
    for element in elements {
        if early && limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        frame.set(item, element);
        if let Some(filter) = &plan.filter {
            if filter.evaluate(frame)?.as_bool() != Some(true) {
                continue;
            }
        }
        if early && skipped < offset {
            skipped += 1;
            continue;
        }
        let row = plan
            .fields
            .iter()
            .map(|field| field.expr.evaluate(frame))
            .collect::<EvalResult<Vec<_>>>()?;
        rows.push(row);
    }

    if summarized {
        rows = summarize(&plan.fields, rows)?;
    }
    if sorted {
        sort(&plan.fields, &mut rows);
    }
    if !early {
        rows = rows
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect();
    }
    log::trace!("query {} produced {} rows", plan.id, rows.len());
    Ok(rows.into_iter().map(|row| select(&plan.fields, row)).collect())
}

/// Running value of one field within a group
enum Accumulator {
    Group(Value),
    Sum(Value, BinaryFn),
    Min(Value),
    Max(Value),
}

impl Accumulator {
    fn new(field: &QueryField) -> EvalResult<Self> {
        Ok(match field.summary {
            Some(FieldSummary::Aggregate(AggregateKind::Sum)) => {
                let ty = &field.expr.ty;
                Self::Sum(zero(ty)?, adder(ty)?)
            }
            Some(FieldSummary::Aggregate(AggregateKind::Min)) => Self::Min(Value::Null),
            Some(FieldSummary::Aggregate(AggregateKind::Max)) => Self::Max(Value::Null),
            Some(FieldSummary::Group) | None => Self::Group(Value::Null),
        })
    }

    fn add(&mut self, value: Value) -> EvalResult<()> {
        match self {
            Self::Group(current) => *current = value,
            Self::Sum(total, add) => {
                if !value.is_null() {
                    *total = add(&*total, &value)?;
                }
            }
            Self::Min(current) => replace_if(current, value, Ordering::Less),
            Self::Max(current) => replace_if(current, value, Ordering::Greater),
        }
        Ok(())
    }

    fn finish(self) -> Value {
        match self {
            Self::Group(value) | Self::Sum(value, _) | Self::Min(value) | Self::Max(value) => value,
        }
    }
}

// Nulls are skipped, as SQL aggregates do
fn replace_if(current: &mut Value, value: Value, wanted: Ordering) {
    if value.is_null() {
        return;
    }
    if current.is_null() || value.compare(current) == Some(wanted) {
        *current = value;
    }
}

fn zero(ty: &ResolvedType) -> EvalResult<Value> {
    match ty {
        ResolvedType::Integer => Ok(Value::Integer(0)),
        ResolvedType::BigInteger => Ok(Value::BigInteger(BigInt::from(0))),
        ResolvedType::Decimal => Ok(Value::Decimal(Decimal::ZERO)),
        other => Err(EvalError::internal(format!("cannot sum {other}"))),
    }
}

fn adder(ty: &ResolvedType) -> EvalResult<BinaryFn> {
    match resolve_binary(BinaryOp::Add, ty, ty) {
        Ok(operator) => match operator.kind {
            BinaryKind::Strict { eval, .. } => Ok(eval),
            _ => Err(EvalError::internal(format!("no addition for {ty}"))),
        },
        Err(err) => Err(EvalError::internal(err.message())),
    }
}

/// Group rows by the group fields and aggregate the others
///
/// Without group fields the result is always exactly one row.
fn summarize(fields: &[QueryField], rows: Vec<Vec<Value>>) -> EvalResult<Vec<Vec<Value>>> {
    let grouped = fields.iter().any(|f| f.summary == Some(FieldSummary::Group));
    let mut groups: IndexMap<Vec<Value>, Vec<Accumulator>> = IndexMap::new();

    for row in rows {
        let key: Vec<Value> = fields
            .iter()
            .zip(&row)
            .filter(|(field, _)| field.summary == Some(FieldSummary::Group))
            .map(|(_, value)| value.clone())
            .collect();
        if !groups.contains_key(&key) {
            let accumulators = fields.iter().map(Accumulator::new).collect::<EvalResult<Vec<_>>>()?;
            groups.insert(key.clone(), accumulators);
        }
        if let Some(accumulators) = groups.get_mut(&key) {
            for (accumulator, value) in accumulators.iter_mut().zip(row) {
                accumulator.add(value)?;
            }
        }
    }

    if groups.is_empty() && !grouped {
        let empty = fields.iter().map(Accumulator::new).collect::<EvalResult<Vec<_>>>()?;
        return Ok(vec![empty.into_iter().map(Accumulator::finish).collect()]);
    }
    Ok(groups
        .into_values()
        .map(|accumulators| accumulators.into_iter().map(Accumulator::finish).collect())
        .collect())
}

/// Stable sort by each key, least significant first
fn sort(fields: &[QueryField], rows: &mut [Vec<Value>]) {
    for (index, field) in fields.iter().enumerate().rev() {
        let Some(direction) = field.sort else {
            continue;
        };
        rows.sort_by(|a, b| {
            let ordering = a[index].sort_cmp(&b[index]);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

fn select(fields: &[QueryField], row: Vec<Value>) -> Vec<Value> {
    fields
        .iter()
        .zip(row)
        .filter(|(field, _)| !field.omit)
        .map(|(_, value)| value)
        .collect()
}
