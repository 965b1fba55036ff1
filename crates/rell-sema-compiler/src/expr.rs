//! Compiled value expressions
//!
//! [`CompiledExpr`] is the output of semantic analysis for one syntactic
//! sub-expression. It has two targets:
//! - an interpreted [`Evaluator`], present unless the expression reads rows
//!   of an enclosing database at-expression
//! - an optional [`DbExpr`], present for expressions that read such rows
//!
//! Database-independent expressions reach SQL through [`CompiledExpr::to_db`]
//! as constants or interpreted parameters.

use crate::error::{EvalError, EvalResult};
use crate::facts::ExprFacts;
use crate::ids::{AtExprId, VarUid};
use crate::runtime::{Frame, NoDatabase};
use crate::sql::DbExpr;
use rell_sema_diagnostics::Span;
use rell_sema_types::{ResolvedType, Value};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Type alias for interpreted evaluation functions
pub type EvalFn = Arc<dyn Fn(&mut Frame<'_>) -> EvalResult<Value> + Send + Sync>;

/// Interpreted evaluation strategy of an expression
#[derive(Clone)]
pub struct Evaluator(EvalFn);

impl Evaluator {
    pub fn new(f: impl Fn(&mut Frame<'_>) -> EvalResult<Value> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn constant(value: Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    pub fn call(&self, frame: &mut Frame<'_>) -> EvalResult<Value> {
        (self.0)(frame)
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<interpreted>")
    }
}

/// A direct read of a local variable
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub uid: VarUid,
    pub name: String,
    /// Declared type, before smart narrowing
    pub declared: ResolvedType,
}

/// A database-dependent expression has no SQL form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoSql;

/// A type-checked expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    pub ty: ResolvedType,
    pub span: Span,
    pub eval: Option<Evaluator>,
    pub db: Option<DbExpr>,
    pub constant: Option<Value>,
    pub pure: bool,
    pub facts: ExprFacts,
    pub var: Option<VarRef>,
    /// Name given to the expression when it is a what-field without an explicit name
    pub implicit_name: Option<String>,
    /// At-expressions whose rows or elements this expression reads
    pub at_deps: SmallVec<[AtExprId; 2]>,
}

impl CompiledExpr {
    fn base(ty: ResolvedType, span: Span) -> Self {
        Self {
            ty,
            span,
            eval: None,
            db: None,
            constant: None,
            pure: true,
            facts: ExprFacts::empty(),
            var: None,
            implicit_name: None,
            at_deps: SmallVec::new(),
        }
    }

    /// Stand-in after an error was reported
    pub fn error(span: Span) -> Self {
        let mut expr = Self::base(ResolvedType::Error, span);
        expr.eval = Some(Evaluator::new(|_| {
            Err(EvalError::internal("evaluated an expression that failed to compile"))
        }));
        expr
    }

    pub fn constant(value: Value, ty: ResolvedType, span: Span) -> Self {
        let mut expr = Self::base(ty, span);
        expr.eval = Some(Evaluator::constant(value.clone()));
        expr.constant = Some(value);
        expr
    }

    pub fn interpreted(ty: ResolvedType, span: Span, eval: Evaluator) -> Self {
        let mut expr = Self::base(ty, span);
        expr.eval = Some(eval);
        expr
    }

    /// Expression reading rows of the at-expression `at`
    pub fn database(ty: ResolvedType, span: Span, db: DbExpr, at: AtExprId) -> Self {
        let mut expr = Self::base(ty, span);
        expr.db = Some(db);
        expr.at_deps.push(at);
        expr
    }

    pub fn with_facts(mut self, facts: ExprFacts) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.implicit_name = Some(name.into());
        self
    }

    pub fn with_deps(mut self, deps: &[AtExprId]) -> Self {
        for dep in deps {
            if !self.at_deps.contains(dep) {
                self.at_deps.push(*dep);
            }
        }
        self
    }

    pub fn impure(mut self) -> Self {
        self.pure = false;
        self
    }

    pub fn is_error(&self) -> bool {
        self.ty.is_error()
    }

    /// Check whether the expression can only run inside SQL
    pub fn is_db(&self) -> bool {
        self.eval.is_none() && !self.is_error()
    }

    pub fn depends_on(&self, at: AtExprId) -> bool {
        self.at_deps.contains(&at)
    }

    /// SQL form, binding interpreted values as parameters
    pub fn to_db(&self) -> Option<DbExpr> {
        if let Some(db) = &self.db {
            return Some(db.clone());
        }
        if let Some(value) = &self.constant {
            return Some(DbExpr::Constant(value.clone()));
        }
        if !self.ty.is_sql_compatible() {
            return None;
        }
        self.eval.clone().map(DbExpr::Param)
    }

    /// Evaluate with the interpreter
    pub fn evaluate(&self, frame: &mut Frame<'_>) -> EvalResult<Value> {
        match &self.eval {
            Some(eval) => eval.call(frame),
            None => Err(EvalError::internal("database expression evaluated outside of a query")),
        }
    }

    /// Interpreted evaluator; database expressions get one that fails
    pub fn evaluator(&self) -> Evaluator {
        match &self.eval {
            Some(eval) => eval.clone(),
            None => Evaluator::new(|_| {
                Err(EvalError::internal("database expression evaluated outside of a query"))
            }),
        }
    }

    /// Build an expression from operands
    ///
    /// If an operand is database-dependent, the result is built from the
    /// operands' SQL forms with `db`; `Err(NoSql)` means that is impossible.
    /// Otherwise the interpreted form is built with `eval` and folded to a
    /// constant when every operand is a pure constant and evaluation succeeds.
    pub fn combine(
        ty: ResolvedType,
        span: Span,
        parts: &[&CompiledExpr],
        eval: impl FnOnce(Vec<Evaluator>) -> Evaluator,
        db: Option<&dyn Fn(&[DbExpr]) -> DbExpr>,
    ) -> Result<CompiledExpr, NoSql> {
        let mut expr = Self::base(ty, span);
        for part in parts {
            expr = expr.with_deps(&part.at_deps);
            expr.pure &= part.pure;
        }

        if parts.iter().any(|p| p.is_db()) {
            let db = db.ok_or(NoSql)?;
            let operands = parts.iter().map(|p| p.to_db()).collect::<Option<Vec<_>>>().ok_or(NoSql)?;
            expr.db = Some(db(&operands));
            return Ok(expr);
        }

        let evals = parts.iter().map(|p| p.evaluator()).collect();
        let evaluator = eval(evals);
        if expr.pure && parts.iter().all(|p| p.constant.is_some()) && !expr.ty.is_error() {
            let executor = NoDatabase;
            let mut frame = Frame::new(&executor);
            match evaluator.call(&mut frame) {
                Ok(value) => {
                    log::trace!("folded constant {value}");
                    expr.constant = Some(value);
                }
                Err(err) => log::trace!("constant folding left for runtime: {err}"),
            }
        }
        expr.eval = Some(evaluator);
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{DbTable, SqlOp};
    use crate::ids::AtEntityId;

    fn int(value: i64) -> CompiledExpr {
        CompiledExpr::constant(Value::Integer(value), ResolvedType::Integer, Span::default())
    }

    fn add_eval(evals: Vec<Evaluator>) -> Evaluator {
        Evaluator::new(move |frame| {
            let a = evals[0].call(frame)?.as_integer().unwrap_or(0);
            let b = evals[1].call(frame)?.as_integer().unwrap_or(0);
            Ok(Value::Integer(a + b))
        })
    }

    #[test]
    fn test_constant_folding() {
        let (a, b) = (int(2), int(3));
        let sum = CompiledExpr::combine(ResolvedType::Integer, Span::default(), &[&a, &b], add_eval, None).unwrap();
        assert_eq!(sum.constant, Some(Value::Integer(5)));
        assert!(!sum.is_db());
    }

    #[test]
    fn test_db_operand_requires_sql_form() {
        let attr = CompiledExpr::database(
            ResolvedType::Integer,
            Span::default(),
            DbExpr::Column {
                table: DbTable::root(AtEntityId(0)),
                column: "x".to_string(),
            },
            AtExprId(0),
        );
        let one = int(1);
        let no_sql = CompiledExpr::combine(ResolvedType::Integer, Span::default(), &[&attr, &one], add_eval, None);
        assert_eq!(no_sql.unwrap_err(), NoSql);

        let sql = |ops: &[DbExpr]| DbExpr::binary(SqlOp::Add, ops[0].clone(), ops[1].clone());
        let expr = CompiledExpr::combine(ResolvedType::Integer, Span::default(), &[&attr, &one], add_eval, Some(&sql))
            .unwrap();
        assert!(expr.is_db());
        assert!(expr.depends_on(AtExprId(0)));
    }
}
