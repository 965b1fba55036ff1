//! Shared fixtures for the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use rell_sema::ast::{Expr, Expression, WhenExpr};
use rell_sema::{Compiler, Definitions, EntityDef, EnumDef, EvalResult, ObjectDef, ParameterizedSql, ResolvedType, SqlExecutor, Value};
use std::collections::VecDeque;

/// Route `log` output through the test harness once per binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Entities `city`, `company` and `user`, enum `color` and object `state`
pub fn definitions() -> Definitions {
    let mut defs = Definitions::new();
    defs.add_entity(EntityDef::new("city").with_attribute("name", ResolvedType::Text))
        .add_entity(
            EntityDef::new("company")
                .with_attribute("name", ResolvedType::Text)
                .with_attribute("city", ResolvedType::entity("city")),
        )
        .add_entity(
            EntityDef::new("user")
                .with_attribute("name", ResolvedType::Text)
                .with_attribute("age", ResolvedType::Integer)
                .with_attribute("company", ResolvedType::entity("company")),
        )
        .add_enum(EnumDef::new("color", &["red", "green", "blue"]))
        .add_object(ObjectDef::new("state").with_attribute("counter", ResolvedType::Integer));
    defs
}

pub fn compiler() -> Compiler {
    init_logging();
    Compiler::new(definitions())
}

pub fn when_expr(expr: Expr) -> WhenExpr {
    match expr.inner {
        Expression::When(when) => *when,
        other => panic!("not a when-expression: {other:?}"),
    }
}

/// Answers queries with canned result sets, in order, and records the SQL
#[derive(Default)]
pub struct RecordingExecutor {
    results: Mutex<VecDeque<Vec<Vec<Value>>>>,
    executed: Mutex<Vec<ParameterizedSql>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, rows: Vec<Vec<Value>>) -> Self {
        self.results.lock().push_back(rows);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().iter().map(|sql| sql.to_string()).collect()
    }
}

impl SqlExecutor for RecordingExecutor {
    fn execute(&self, sql: &ParameterizedSql, _columns: &[ResolvedType]) -> EvalResult<Vec<Vec<Value>>> {
        self.executed.lock().push(sql.clone());
        Ok(self.results.lock().pop_front().unwrap_or_default())
    }
}
