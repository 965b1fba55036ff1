//! Evaluation frame and the SQL executor seam
//!
//! Compiled evaluators run against a [`Frame`]: local variable values keyed
//! by [`VarUid`] plus the [`SqlExecutor`] that runs emitted queries. This
//! core never executes SQL itself.

use crate::error::{EvalError, EvalResult};
use crate::ids::VarUid;
use rell_sema_types::{ResolvedType, Value};
use std::collections::HashMap;
use std::fmt;

/// A SQL statement with bound parameter values, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedSql {
    pub sql: String,
    pub params: Vec<Value>,
}

impl fmt::Display for ParameterizedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, " [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// Executes emitted SQL
///
/// `columns` lists the result type of every selected column. Entity columns
/// may be returned as integer row ids and enum columns as integer ordinals;
/// the query plan converts them.
pub trait SqlExecutor: Send + Sync {
    fn execute(&self, sql: &ParameterizedSql, columns: &[ResolvedType]) -> EvalResult<Vec<Vec<Value>>>;
}

/// Executor for contexts without a database; every query fails
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatabase;

impl SqlExecutor for NoDatabase {
    fn execute(&self, sql: &ParameterizedSql, _columns: &[ResolvedType]) -> EvalResult<Vec<Vec<Value>>> {
        Err(EvalError::sql(format!("no database connection: {}", sql.sql)))
    }
}

/// Runtime state of an evaluation
pub struct Frame<'a> {
    vars: HashMap<VarUid, Value>,
    sql: &'a dyn SqlExecutor,
}

impl<'a> Frame<'a> {
    pub fn new(sql: &'a dyn SqlExecutor) -> Self {
        Self {
            vars: HashMap::new(),
            sql,
        }
    }

    pub fn get(&self, var: VarUid) -> EvalResult<&Value> {
        self.vars
            .get(&var)
            .ok_or_else(|| EvalError::internal(format!("variable {var} not set")))
    }

    pub fn set(&mut self, var: VarUid, value: Value) {
        self.vars.insert(var, value);
    }

    pub fn is_set(&self, var: VarUid) -> bool {
        self.vars.contains_key(&var)
    }

    /// Run a query through the executor
    pub fn query(&self, sql: &ParameterizedSql, columns: &[ResolvedType]) -> EvalResult<Vec<Vec<Value>>> {
        log::debug!("executing {sql}");
        self.sql.execute(sql, columns)
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("vars", &self.vars).finish_non_exhaustive()
    }
}
