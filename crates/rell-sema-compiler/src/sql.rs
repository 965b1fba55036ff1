//! SQL fragments of compiled expressions
//!
//! Database-dependent expressions carry a [`DbExpr`] tree instead of an
//! interpreted evaluator. The at-expression compiler renders the trees of
//! one query with a [`SqlBuilder`] into a [`SqlTemplate`]:
//! - from-entities get aliases `A00`, `A01`, ... in source order
//! - attribute chains through entity references become `INNER JOIN`s, with
//!   aliases numbered in discovery order after the from-entities
//! - constants and interpreted sub-expressions become `?` parameters, bound
//!   in textual order when the query runs

use crate::error::EvalResult;
use crate::expr::Evaluator;
use crate::ids::AtEntityId;
use crate::runtime::{Frame, ParameterizedSql};
use rell_sema_types::Value;
use std::fmt::Write;

/// One step of an implicit join: follow `attr` into `table`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinStep {
    pub attr: String,
    pub table: String,
}

/// A table reachable from a from-entity through zero or more joins
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbTable {
    pub root: AtEntityId,
    pub path: Vec<JoinStep>,
}

impl DbTable {
    pub fn root(root: AtEntityId) -> Self {
        Self { root, path: Vec::new() }
    }

    pub fn join(&self, attr: &str, table: &str) -> Self {
        let mut path = self.path.clone();
        path.push(JoinStep {
            attr: attr.to_string(),
            table: table.to_string(),
        });
        Self { root: self.root, path }
    }
}

/// Binary SQL operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOp {
    Eq,
    Ne,
    /// Null-safe equality, used when an operand is nullable
    NotDistinct,
    Distinct,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    /// Division truncated toward zero, for types whose SQL `/` is fractional
    TruncDiv,
    Mod,
    Concat,
}

impl SqlOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::NotDistinct => "IS NOT DISTINCT FROM",
            Self::Distinct => "IS DISTINCT FROM",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div | Self::TruncDiv => "/",
            Self::Mod => "%",
            Self::Concat => "||",
        }
    }
}

/// Unary SQL operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlUnaryOp {
    Neg,
    Not,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Sum,
    Min,
    Max,
}

impl AggregateKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// SQL form of an expression
#[derive(Debug, Clone)]
pub enum DbExpr {
    Constant(Value),
    /// Evaluated by the interpreter before the query runs, then bound
    Param(Evaluator),
    Column {
        table: DbTable,
        column: String,
    },
    Rowid(DbTable),
    Binary {
        op: SqlOp,
        left: Box<DbExpr>,
        right: Box<DbExpr>,
    },
    Unary {
        op: SqlUnaryOp,
        operand: Box<DbExpr>,
    },
    IsNull {
        operand: Box<DbExpr>,
        negated: bool,
    },
    Coalesce(Box<DbExpr>, Box<DbExpr>),
    /// Searched `CASE WHEN c THEN v ... ELSE d END`
    Case {
        cases: Vec<(DbExpr, DbExpr)>,
        default: Option<Box<DbExpr>>,
    },
    Aggregate {
        kind: AggregateKind,
        operand: Box<DbExpr>,
    },
    ToText(Box<DbExpr>),
}

impl DbExpr {
    pub fn binary(op: SqlOp, left: DbExpr, right: DbExpr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: SqlUnaryOp, operand: DbExpr) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn is_null(operand: DbExpr, negated: bool) -> Self {
        Self::IsNull {
            operand: Box::new(operand),
            negated,
        }
    }

    /// The table of an entity-valued expression, joining through an entity attribute if needed
    pub fn entity_table(&self, target_table: &str) -> Option<DbTable> {
        match self {
            Self::Rowid(table) => Some(table.clone()),
            Self::Column { table, column } => Some(table.join(column, target_table)),
            _ => None,
        }
    }
}

/// A query parameter
#[derive(Debug, Clone)]
pub enum SqlParam {
    Constant(Value),
    Interpreted(Evaluator),
}

/// Rendered SQL with unevaluated parameters
#[derive(Debug, Clone, Default)]
pub struct SqlTemplate {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlTemplate {
    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append another fragment, keeping parameters in textual order
    pub fn append(&mut self, other: SqlTemplate) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    fn push_param(&mut self, param: SqlParam) {
        self.sql.push('?');
        self.params.push(param);
    }

    /// Evaluate interpreted parameters and produce executable SQL
    pub fn bind(&self, frame: &mut Frame<'_>) -> EvalResult<ParameterizedSql> {
        let mut params = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let value = match param {
                SqlParam::Constant(value) => value.clone(),
                SqlParam::Interpreted(eval) => eval.call(frame)?,
            };
            params.push(value);
        }
        Ok(ParameterizedSql {
            sql: self.sql.clone(),
            params,
        })
    }
}

#[derive(Debug, Clone)]
struct Join {
    table: DbTable,
    alias: String,
    sql_table: String,
    parent_alias: String,
    attr: String,
}

/// Renders [`DbExpr`] trees of one query
#[derive(Debug)]
pub struct SqlBuilder {
    roots: Vec<(AtEntityId, String)>,
    joins: Vec<Join>,
}

impl SqlBuilder {
    /// `roots` are the from-entities with their table names, in source order
    pub fn new(roots: Vec<(AtEntityId, String)>) -> Self {
        Self {
            roots,
            joins: Vec::new(),
        }
    }

    fn root_alias(&self, id: AtEntityId) -> String {
        let index = self.roots.iter().position(|(root, _)| *root == id).unwrap_or(0);
        format!("A{index:02}")
    }

    /// Alias of a table, registering joins on first use
    pub fn alias(&mut self, table: &DbTable) -> String {
        if table.path.is_empty() {
            return self.root_alias(table.root);
        }
        if let Some(join) = self.joins.iter().find(|j| &j.table == table) {
            return join.alias.clone();
        }
        let parent = DbTable {
            root: table.root,
            path: table.path[..table.path.len() - 1].to_vec(),
        };
        let parent_alias = self.alias(&parent);
        let step = &table.path[table.path.len() - 1];
        let alias = format!("A{:02}", self.roots.len() + self.joins.len());
        self.joins.push(Join {
            table: table.clone(),
            alias: alias.clone(),
            sql_table: step.table.clone(),
            parent_alias,
            attr: step.attr.clone(),
        });
        alias
    }

    /// Render an expression into a new fragment
    pub fn render(&mut self, expr: &DbExpr) -> SqlTemplate {
        let mut out = SqlTemplate::default();
        self.render_into(expr, &mut out);
        out
    }

    fn render_into(&mut self, expr: &DbExpr, out: &mut SqlTemplate) {
        match expr {
            DbExpr::Constant(value) => out.push_param(SqlParam::Constant(value.clone())),
            DbExpr::Param(eval) => out.push_param(SqlParam::Interpreted(eval.clone())),
            DbExpr::Column { table, column } => {
                let alias = self.alias(table);
                let _ = write!(out.sql, "{alias}.\"{column}\"");
            }
            DbExpr::Rowid(table) => {
                let alias = self.alias(table);
                let _ = write!(out.sql, "{alias}.\"rowid\"");
            }
            DbExpr::Binary { op, left, right } => {
                let trunc = *op == SqlOp::TruncDiv;
                out.push_sql(if trunc { "TRUNC((" } else { "(" });
                self.render_into(left, out);
                let _ = write!(out.sql, " {} ", op.symbol());
                self.render_into(right, out);
                out.push_sql(if trunc { "))" } else { ")" });
            }
            DbExpr::Unary { op, operand } => {
                out.push_sql(match op {
                    SqlUnaryOp::Neg => "(-",
                    SqlUnaryOp::Not => "(NOT ",
                });
                self.render_into(operand, out);
                out.push_sql(")");
            }
            DbExpr::IsNull { operand, negated } => {
                out.push_sql("(");
                self.render_into(operand, out);
                out.push_sql(if *negated { " IS NOT NULL)" } else { " IS NULL)" });
            }
            DbExpr::Coalesce(left, right) => {
                out.push_sql("COALESCE(");
                self.render_into(left, out);
                out.push_sql(", ");
                self.render_into(right, out);
                out.push_sql(")");
            }
            DbExpr::Case { cases, default } => {
                out.push_sql("CASE");
                for (condition, value) in cases {
                    out.push_sql(" WHEN ");
                    self.render_into(condition, out);
                    out.push_sql(" THEN ");
                    self.render_into(value, out);
                }
                if let Some(default) = default {
                    out.push_sql(" ELSE ");
                    self.render_into(default, out);
                }
                out.push_sql(" END");
            }
            DbExpr::Aggregate { kind, operand } => match kind {
                AggregateKind::Sum => {
                    out.push_sql("COALESCE(SUM(");
                    self.render_into(operand, out);
                    out.push_sql("), 0)");
                }
                AggregateKind::Min | AggregateKind::Max => {
                    out.push_sql(if *kind == AggregateKind::Min { "MIN(" } else { "MAX(" });
                    self.render_into(operand, out);
                    out.push_sql(")");
                }
            },
            DbExpr::ToText(operand) => {
                out.push_sql("CAST(");
                self.render_into(operand, out);
                out.push_sql(" AS TEXT)");
            }
        }
    }

    /// `FROM` clause including the joins registered so far
    pub fn from_clause(&self) -> String {
        let mut sql = String::from(" FROM ");
        let tables: Vec<String> = self
            .roots
            .iter()
            .enumerate()
            .map(|(i, (_, table))| format!("\"{table}\" A{i:02}"))
            .collect();
        sql.push_str(&tables.join(", "));
        for join in &self.joins {
            let _ = write!(
                sql,
                " INNER JOIN \"{}\" {} ON {}.\"{}\" = {}.\"rowid\"",
                join.sql_table, join.alias, join.parent_alias, join.attr, join.alias
            );
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_binary_with_params() {
        let mut builder = SqlBuilder::new(vec![(AtEntityId(0), "user".to_string())]);
        let expr = DbExpr::binary(
            SqlOp::Eq,
            DbExpr::Column {
                table: DbTable::root(AtEntityId(0)),
                column: "name".to_string(),
            },
            DbExpr::Constant(Value::text("Bob")),
        );
        let sql = builder.render(&expr);
        assert_eq!(sql.sql, "(A00.\"name\" = ?)");
        assert_eq!(sql.params.len(), 1);
        assert_eq!(builder.from_clause(), " FROM \"user\" A00");
    }

    #[test]
    fn test_joins_are_shared_and_numbered_after_roots() {
        let mut builder = SqlBuilder::new(vec![
            (AtEntityId(3), "user".to_string()),
            (AtEntityId(4), "company".to_string()),
        ]);
        let city = DbTable::root(AtEntityId(3)).join("company", "company").join("city", "city");
        let company = DbTable::root(AtEntityId(3)).join("company", "company");
        assert_eq!(builder.alias(&city), "A03");
        assert_eq!(builder.alias(&company), "A02");
        assert_eq!(
            builder.from_clause(),
            " FROM \"user\" A00, \"company\" A01 \
             INNER JOIN \"company\" A02 ON A00.\"company\" = A02.\"rowid\" \
             INNER JOIN \"city\" A03 ON A02.\"city\" = A03.\"rowid\""
        );
    }

    #[test]
    fn test_sum_defaults_to_zero() {
        let mut builder = SqlBuilder::new(vec![(AtEntityId(0), "t".to_string())]);
        let expr = DbExpr::Aggregate {
            kind: AggregateKind::Sum,
            operand: Box::new(DbExpr::Column {
                table: DbTable::root(AtEntityId(0)),
                column: "x".to_string(),
            }),
        };
        assert_eq!(builder.render(&expr).sql, "COALESCE(SUM(A00.\"x\"), 0)");
    }

    #[test]
    fn test_truncating_division() {
        let mut builder = SqlBuilder::new(vec![(AtEntityId(0), "acct".to_string())]);
        let expr = DbExpr::binary(
            SqlOp::TruncDiv,
            DbExpr::Column {
                table: DbTable::root(AtEntityId(0)),
                column: "bal".to_string(),
            },
            DbExpr::Constant(Value::Integer(2)),
        );
        assert_eq!(builder.render(&expr).sql, "TRUNC((A00.\"bal\" / ?))");
    }
}
