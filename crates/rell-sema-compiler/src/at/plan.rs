//! Query plans
//!
//! A [`QueryPlan`] is the compiled form of one at-expression. Entity
//! sources run as a single SQL query; iterable sources run as an
//! in-process pipeline. Both produce rows of the selected fields, which are
//! shaped and checked against the cardinality here.

use super::{database, pipeline};
use crate::error::{EvalError, EvalResult};
use crate::expr::CompiledExpr;
use crate::ids::{AtEntityId, AtExprId, VarUid};
use crate::runtime::Frame;
use crate::sql::{AggregateKind, SqlTemplate};
use rell_sema_ast::{AtCardinality, SortDirection};
use rell_sema_types::{Definitions, ResolvedType, Value};
use std::fmt;
use std::sync::Arc;

/// How a field takes part in summarization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSummary {
    Group,
    Aggregate(AggregateKind),
}

/// One what-field of a query
#[derive(Debug, Clone)]
pub struct QueryField {
    /// Field name in the result tuple
    pub name: Option<String>,
    /// Result type, nullable for `@min` / `@max` without groups
    pub ty: ResolvedType,
    pub omit: bool,
    pub sort: Option<SortDirection>,
    pub summary: Option<FieldSummary>,
    pub expr: CompiledExpr,
}

impl QueryField {
    pub(crate) fn plain(name: Option<String>, expr: CompiledExpr) -> Self {
        Self {
            name,
            ty: expr.ty.clone(),
            omit: false,
            sort: None,
            summary: None,
            expr,
        }
    }
}

/// A from-entity of a database query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEntity {
    pub id: AtEntityId,
    pub alias: String,
    pub entity: String,
    pub table: String,
}

/// Source of a query
#[derive(Debug)]
pub enum QuerySource {
    Entities(Vec<QueryEntity>),
    Iterable { item: VarUid, expr: CompiledExpr },
}

/// Compiled at-expression
#[derive(Debug)]
pub struct QueryPlan {
    pub id: AtExprId,
    pub source: QuerySource,
    pub filter: Option<CompiledExpr>,
    pub fields: Vec<QueryField>,
    pub limit: Option<CompiledExpr>,
    pub offset: Option<CompiledExpr>,
    pub cardinality: AtCardinality,
    /// Type of one row
    pub row_type: ResolvedType,
    /// Type of the whole expression
    pub result_type: ResolvedType,
    pub(crate) tuple_row: bool,
    pub(crate) sql: Option<SqlTemplate>,
    pub(crate) defs: Arc<Definitions>,
}

impl QueryPlan {
    pub fn is_db(&self) -> bool {
        matches!(self.source, QuerySource::Entities(_))
    }

    /// Rendered SQL of a database query, with `?` placeholders
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_ref().map(|template| template.sql.as_str())
    }

    pub fn is_summarized(&self) -> bool {
        self.fields.iter().any(|f| f.summary.is_some())
    }

    pub fn is_sorted(&self) -> bool {
        self.fields.iter().any(|f| f.sort.is_some())
    }

    /// Fields present in the result
    pub fn selected(&self) -> impl Iterator<Item = &QueryField> {
        self.fields.iter().filter(|f| !f.omit)
    }

    /// Run the query and shape its rows
    pub fn execute(&self, frame: &mut Frame<'_>) -> EvalResult<Value> {
        let rows = match &self.source {
            QuerySource::Entities(_) => database::run(self, frame)?,
            QuerySource::Iterable { item, expr } => pipeline::run(self, *item, expr, frame)?,
        };
        let rows = rows.into_iter().map(|row| self.row_value(row)).collect();
        apply_cardinality(self.cardinality, rows)
    }

    fn row_value(&self, mut values: Vec<Value>) -> Value {
        if !self.tuple_row && values.len() == 1 {
            return values.remove(0);
        }
        Value::tuple(values)
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            QuerySource::Entities(entities) => {
                let names: Vec<String> = entities.iter().map(|e| format!("{}: {}", e.alias, e.entity)).collect();
                write!(f, "({})", names.join(", "))?;
            }
            QuerySource::Iterable { expr, .. } => write!(f, "{}", expr.ty)?,
        }
        write!(f, " {} -> {}", self.cardinality, self.result_type)
    }
}

/// Evaluate a limit or offset; negative values count as zero
pub(super) fn eval_bound(expr: Option<&CompiledExpr>, frame: &mut Frame<'_>) -> EvalResult<Option<usize>> {
    let Some(expr) = expr else {
        return Ok(None);
    };
    let n = clamp_bound(&expr.evaluate(frame)?)?;
    Ok(Some(usize::try_from(n).unwrap_or(usize::MAX)))
}

/// A limit or offset value, clamped at zero
pub(super) fn clamp_bound(value: &Value) -> EvalResult<i64> {
    value
        .as_integer()
        .map(|n| n.max(0))
        .ok_or_else(|| EvalError::internal(format!("not an integer: {value}")))
}

fn apply_cardinality(cardinality: AtCardinality, mut rows: Vec<Value>) -> EvalResult<Value> {
    let count = rows.len();
    match cardinality {
        AtCardinality::One | AtCardinality::ZeroOne => match count {
            0 if cardinality.zero() => Ok(Value::Null),
            1 => Ok(rows.remove(0)),
            _ => Err(EvalError::Cardinality { count }),
        },
        AtCardinality::OneMany if count == 0 => Err(EvalError::Cardinality { count }),
        AtCardinality::OneMany | AtCardinality::ZeroMany => Ok(Value::list(rows)),
    }
}

/// Convert a value read from the database to the value of type `ty`
///
/// Executors may return entity references as integer row ids and enum
/// values as integer ordinals.
pub(crate) fn decode_value(defs: &Definitions, ty: &ResolvedType, value: Value) -> EvalResult<Value> {
    match (ty.unwrap_nullable(), value) {
        (_, Value::Null) => Ok(Value::Null),
        (ResolvedType::Entity(entity), Value::Integer(rowid) | Value::Rowid(rowid)) => Ok(Value::entity(entity, rowid)),
        (ResolvedType::Enum(name), Value::Integer(ordinal)) => {
            let def = defs
                .enumeration(name)
                .ok_or_else(|| EvalError::internal(format!("unknown enum {name}")))?;
            let index = usize::try_from(ordinal).ok().filter(|i| *i < def.values.len());
            let index = index.ok_or_else(|| EvalError::internal(format!("invalid ordinal {ordinal} of enum {name}")))?;
            Ok(Value::enum_value(name, index, &def.values[index]))
        }
        (_, value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::definitions;
    use rstest::rstest;

    fn rows(n: i64) -> Vec<Value> {
        (0..n).map(Value::Integer).collect()
    }

    #[rstest]
    #[case(AtCardinality::One, 1, Ok(Value::Integer(0)))]
    #[case(AtCardinality::One, 0, Err(EvalError::Cardinality { count: 0 }))]
    #[case(AtCardinality::One, 2, Err(EvalError::Cardinality { count: 2 }))]
    #[case(AtCardinality::ZeroOne, 0, Ok(Value::Null))]
    #[case(AtCardinality::ZeroOne, 3, Err(EvalError::Cardinality { count: 3 }))]
    #[case(AtCardinality::OneMany, 0, Err(EvalError::Cardinality { count: 0 }))]
    #[case(AtCardinality::OneMany, 2, Ok(Value::list(rows(2))))]
    #[case(AtCardinality::ZeroMany, 0, Ok(Value::list(vec![])))]
    fn test_cardinality(#[case] cardinality: AtCardinality, #[case] count: i64, #[case] expected: EvalResult<Value>) {
        assert_eq!(apply_cardinality(cardinality, rows(count)), expected);
    }

    #[test]
    fn test_decode_value() {
        let defs = definitions();
        let user = ResolvedType::nullable(ResolvedType::entity("user"));
        assert_eq!(decode_value(&defs, &user, Value::Integer(7)), Ok(Value::entity("user", 7)));
        assert_eq!(decode_value(&defs, &user, Value::Null), Ok(Value::Null));
        let color = ResolvedType::enumeration("color");
        assert_eq!(
            decode_value(&defs, &color, Value::Integer(2)),
            Ok(Value::enum_value("color", 2, "blue"))
        );
        assert!(decode_value(&defs, &color, Value::Integer(5)).is_err());
        assert_eq!(
            decode_value(&defs, &ResolvedType::Text, Value::text("a")),
            Ok(Value::text("a"))
        );
    }
}
