//! Rell semantic core: expression, query and match compilers
//!
//! This crate turns syntax trees from `rell-sema-ast` into type-checked,
//! executable forms:
//!
//! - **Operators**: resolution of unary and binary operators with numeric
//!   promotion, from an immutable registry
//! - **Flow facts**: definite initialization and nullability, threaded
//!   forward through expressions and statements
//! - **Compiled expressions**: every expression has an interpreted form,
//!   a SQL form, or both
//! - **At-expressions**: queries over entities (one SQL statement) or over
//!   collections (an in-process pipeline)
//! - **When-expressions**: match plans with an exhaustiveness verdict
//! - **Statements**: local variables, assignments and control flow
//!
//! Semantic errors never abort compilation. They are reported to the
//! [`CompilationContext`]'s sink and an error-typed expression stands in.
//!
//! # Example
//!
//! ```ignore
//! use rell_sema_compiler::{CompilationContext, CompilerOptions, Frame, NoDatabase, compile_expr};
//!
//! let mut ctx = CompilationContext::new(defs, CompilerOptions::default());
//! let expr = compile_expr(&mut ctx, &ast);
//! let db = NoDatabase;
//! let value = expr.evaluate(&mut Frame::new(&db))?;
//! ```

pub mod at;
pub mod compile;
pub mod context;
pub mod deferred;
pub mod error;
pub mod expr;
pub mod facts;
pub mod ids;
pub mod operators;
pub mod options;
pub mod runtime;
pub mod scope;
pub mod sql;
pub mod stmt;
pub mod when;

#[cfg(test)]
mod test_support;

pub use at::{FieldSummary, QueryEntity, QueryField, QueryPlan, QuerySource, compile_at};
pub use compile::{compile_expr, resolve_type};
pub use context::{CompilationContext, GlobalConstant};
pub use deferred::{Deferred, DeferredSetter, DeferredState};
pub use error::{EvalError, EvalResult};
pub use expr::{CompiledExpr, Evaluator};
pub use facts::{ExprFacts, VarFact, VarFacts};
pub use ids::{AtEntityId, AtExprId, IdCounter, VarUid};
pub use operators::{BinaryOperator, Unresolved, UnaryOperator, resolve_binary, resolve_unary};
pub use options::{AtAttrShadowing, CompilerOptions, CompilerOptionsBuilder, OptionsError};
pub use runtime::{Frame, NoDatabase, ParameterizedSql, SqlExecutor};
pub use sql::{AggregateKind, DbExpr, SqlTemplate};
pub use stmt::{CompiledStmt, Executor, compile_body, compile_stmt};
pub use when::{MatchCase, MatchPlan, compile_when};
