//! Convenience compiler API
//!
//! [`Compiler`] holds what every compilation unit starts from: definitions,
//! options, parameters and global constants. Each `compile_*` call runs in
//! a fresh [`CompilationContext`] and fails with [`SemaError::Compilation`]
//! when an error was reported; warnings travel with the result.

use rell_sema_ast::{AtExpr, Expr, Stmt, WhenExpr};
use rell_sema_compiler::{
    CompilationContext, CompiledExpr, CompilerOptions, EvalError, EvalResult, Frame, GlobalConstant, MatchPlan,
    QueryPlan, SqlExecutor, VarUid, compile_at, compile_body, compile_expr, compile_when,
};
use rell_sema_diagnostics::{Diagnostic, RELL0900, Result, SemaError, Span};
use rell_sema_types::{Definitions, ResolvedType, Value};
use std::sync::Arc;

/// Entry point for compiling expressions, queries and matches
#[derive(Debug, Clone)]
pub struct Compiler {
    defs: Arc<Definitions>,
    options: CompilerOptions,
    params: Vec<(String, ResolvedType)>,
    globals: Vec<(String, GlobalConstant)>,
}

impl Compiler {
    pub fn new(defs: Definitions) -> Self {
        Self {
            defs: Arc::new(defs),
            options: CompilerOptions::default(),
            params: Vec::new(),
            globals: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the options with ones parsed from JSON
    pub fn with_options_json(self, json: &str) -> Result<Self> {
        let options = CompilerOptions::from_json_str(json)?;
        Ok(self.with_options(options))
    }

    /// Declare an initialized parameter visible to compiled code
    pub fn with_param(mut self, name: impl Into<String>, ty: ResolvedType) -> Self {
        self.params.push((name.into(), ty));
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, constant: GlobalConstant) -> Self {
        self.globals.push((name.into(), constant));
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    /// A fresh context with the parameters and globals declared
    pub fn context(&self) -> (CompilationContext, Vec<(String, VarUid)>) {
        let mut ctx = CompilationContext::new(Arc::clone(&self.defs), self.options.clone());
        for (name, constant) in &self.globals {
            ctx.define_global(name.clone(), constant.clone());
        }
        let params = self
            .params
            .iter()
            .map(|(name, ty)| (name.clone(), ctx.declare_param(name, ty.clone())))
            .collect();
        (ctx, params)
    }

    pub fn compile_expr(&self, expr: &Expr) -> Result<Compiled<CompiledExpr>> {
        self.run(|ctx| Some(compile_expr(ctx, expr)))
    }

    /// Compile statements followed by a result expression
    pub fn compile_body(&self, stmts: &[Stmt], result: &Expr) -> Result<Compiled<CompiledExpr>> {
        self.run(|ctx| Some(compile_body(ctx, stmts, result)))
    }

    pub fn compile_query(&self, at: &AtExpr) -> Result<Compiled<Arc<QueryPlan>>> {
        self.run(|ctx| compile_at(ctx, at, Span::default()).1)
    }

    pub fn compile_match(&self, when: &WhenExpr) -> Result<Compiled<Arc<MatchPlan>>> {
        self.run(|ctx| compile_when(ctx, when, Span::default()).1)
    }

    fn run<T>(&self, f: impl FnOnce(&mut CompilationContext) -> Option<T>) -> Result<Compiled<T>> {
        let (mut ctx, params) = self.context();
        let value = f(&mut ctx);
        let sink = ctx.into_sink();
        let warnings: Vec<Diagnostic> = sink.diagnostics().iter().filter(|d| !d.is_error()).cloned().collect();
        for warning in &warnings {
            log::debug!("compiled with warning: {warning}");
        }
        let value = sink.into_result(value)?.ok_or_else(|| {
            SemaError::Compilation(vec![Diagnostic::error(
                RELL0900,
                "internal:no_plan",
                "Compilation produced no plan",
            )])
        })?;
        Ok(Compiled {
            value,
            warnings,
            params,
        })
    }
}

/// A successful compilation result
#[derive(Debug, Clone)]
pub struct Compiled<T> {
    pub value: T,
    pub warnings: Vec<Diagnostic>,
    params: Vec<(String, VarUid)>,
}

impl<T> Compiled<T> {
    pub fn param(&self, name: &str) -> Option<VarUid> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, uid)| *uid)
    }

    /// A frame with the given parameter values bound
    pub fn frame<'a>(&self, executor: &'a dyn SqlExecutor, args: &[(&str, Value)]) -> EvalResult<Frame<'a>> {
        let mut frame = Frame::new(executor);
        for (name, value) in args {
            let uid = self
                .param(name)
                .ok_or_else(|| EvalError::internal(format!("unknown parameter '{name}'")))?;
            frame.set(uid, value.clone());
        }
        Ok(frame)
    }
}

impl Compiled<CompiledExpr> {
    pub fn evaluate(&self, executor: &dyn SqlExecutor, args: &[(&str, Value)]) -> EvalResult<Value> {
        let mut frame = self.frame(executor, args)?;
        self.value.evaluate(&mut frame)
    }
}

impl Compiled<Arc<QueryPlan>> {
    pub fn evaluate(&self, executor: &dyn SqlExecutor, args: &[(&str, Value)]) -> EvalResult<Value> {
        let mut frame = self.frame(executor, args)?;
        self.value.execute(&mut frame)
    }
}

impl Compiled<Arc<MatchPlan>> {
    pub fn evaluate(&self, executor: &dyn SqlExecutor, args: &[(&str, Value)]) -> EvalResult<Value> {
        let mut frame = self.frame(executor, args)?;
        self.value.execute(&mut frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rell_sema_ast::dsl::*;
    use rell_sema_compiler::NoDatabase;

    #[test]
    fn test_params_are_bound() {
        let compiler = Compiler::new(Definitions::new()).with_param("x", ResolvedType::Integer);
        let compiled = compiler.compile_expr(&add(name("x"), int(1))).unwrap();
        assert_eq!(compiled.value.ty, ResolvedType::Integer);
        assert_eq!(compiled.evaluate(&NoDatabase, &[("x", Value::Integer(2))]), Ok(Value::Integer(3)));
        assert!(compiled.evaluate(&NoDatabase, &[("y", Value::Integer(2))]).is_err());
    }

    #[test]
    fn test_errors_fail_compilation() {
        let compiler = Compiler::new(Definitions::new());
        let err = compiler.compile_expr(&add(boolean(true), int(1))).unwrap_err();
        assert_eq!(err.keys(), vec!["binop_operand_type:+:[boolean]:[integer]"]);
    }

    #[test]
    fn test_options_from_json() {
        let compiler = Compiler::new(Definitions::new())
            .with_options_json(r#"{"deprecated_error": true}"#)
            .unwrap();
        assert!(compiler.options().deprecated_error);
        assert!(Compiler::new(Definitions::new()).with_options_json("{\"bogus\": 1}").is_err());
    }
}
