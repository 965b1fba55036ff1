//! Semantic core of the Rell language
//!
//! This crate re-exports the building blocks and adds [`Compiler`], a
//! convenience entry point that owns definitions, options and declared
//! parameters, and turns diagnostics into a [`Result`].
//!
//! # Example
//!
//! ```ignore
//! use rell_sema::{Compiler, Definitions, ResolvedType, Value, ast::dsl::*};
//!
//! let compiler = Compiler::new(Definitions::new()).with_param("x", ResolvedType::Integer);
//! let compiled = compiler.compile_expr(&add(name("x"), int(1)))?;
//! let value = compiled.evaluate(&rell_sema::NoDatabase, &[("x", Value::Integer(2))])?;
//! ```

mod compiler;

pub use rell_sema_ast as ast;
pub use rell_sema_compiler as sema;
pub use rell_sema_diagnostics as diagnostics;
pub use rell_sema_types as types;

pub use compiler::{Compiled, Compiler};

// Convenience re-exports
pub use rell_sema_compiler::{
    CompilationContext, CompiledExpr, CompilerOptions, EvalError, EvalResult, Frame, GlobalConstant, MatchPlan,
    NoDatabase, ParameterizedSql, QueryPlan, SqlExecutor,
};
pub use rell_sema_diagnostics::{Diagnostic, ErrorCode, Result, SemaError, Severity, Span};
pub use rell_sema_types::{Definitions, EntityDef, EnumDef, ObjectDef, ResolvedType, Value};
