//! Shared helpers for unit tests

use crate::context::CompilationContext;
use crate::error::EvalResult;
use crate::options::CompilerOptions;
use crate::runtime::{ParameterizedSql, SqlExecutor};
use parking_lot::Mutex;
use rell_sema_types::{Definitions, EntityDef, EnumDef, ObjectDef, ResolvedType, Value};
use std::collections::VecDeque;
use std::sync::Arc;

/// Executor answering queries with canned result sets, in order
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

/// `user(name: text, age: integer, company: company)`, `company(name: text, city: city)`,
/// `city(name: text)`, `color { red, green, blue }` and object `state(counter: integer)`
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

pub fn context() -> CompilationContext {
    CompilationContext::new(Arc::new(definitions()), CompilerOptions::default())
}

pub fn context_with(options: CompilerOptions) -> CompilationContext {
    CompilationContext::new(Arc::new(definitions()), options)
}
