//! Statement compiler
//!
//! Statements exist here to drive flow analysis: each compiled statement
//! carries an interpreted executor and the facts known after it ran.
//! - `val` / `var` declarations install initialization and null facts
//! - assignments replace the variable's facts
//! - `if` merges the facts of both branches
//! - `while` and `for` forget null facts of variables assigned in the body,
//!   since the body may run any number of times

use crate::compile::{compile_expr, promote_to, resolve_type, type_mismatch};
use crate::context::CompilationContext;
use crate::error::{EvalError, EvalResult};
use crate::expr::{CompiledExpr, Evaluator};
use crate::facts::{ExprFacts, VarFact, VarFacts};
use crate::ids::VarUid;
use crate::runtime::Frame;
use crate::scope::{LocalVar, ScopeKind, Symbol};
use rell_sema_ast::{AssignOp, Expr, Expression, Name, Spanned, Statement, Stmt, TypeSpecifier};
use rell_sema_diagnostics::{RELL0001, RELL0010, RELL0401, RELL0402, RELL0403, RELL0404, RELL0405, RELL0406, Span};
use rell_sema_types::{ResolvedType, Value};
use std::fmt;
use std::sync::Arc;

/// Type alias for statement execution functions
pub type ExecFn = Arc<dyn Fn(&mut Frame<'_>) -> EvalResult<()> + Send + Sync>;

/// Interpreted execution of a statement
#[derive(Clone)]
pub struct Executor(ExecFn);

impl Executor {
    pub fn new(f: impl Fn(&mut Frame<'_>) -> EvalResult<()> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|_| Ok(()))
    }

    pub fn run(&self, frame: &mut Frame<'_>) -> EvalResult<()> {
        (self.0)(frame)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<statement>")
    }
}

/// A compiled statement
#[derive(Debug, Clone)]
pub struct CompiledStmt {
    pub exec: Executor,
    /// Facts known after the statement completed
    pub post: VarFacts,
}

impl CompiledStmt {
    fn new(exec: Executor, post: VarFacts) -> Self {
        Self { exec, post }
    }

    fn noop(post: VarFacts) -> Self {
        Self::new(Executor::noop(), post)
    }
}

/// Compile a statement; the caller installs its post facts
pub fn compile_stmt(ctx: &mut CompilationContext, stmt: &Stmt) -> CompiledStmt {
    let span = stmt.span;
    match &stmt.inner {
        Statement::Var {
            mutable,
            name,
            ty,
            init,
        } => compile_var_decl(ctx, *mutable, name, ty.as_ref(), init.as_ref()),
        Statement::Assign { target, op, value } => compile_assign(ctx, target, *op, value, span),
        Statement::Expr(expr) => {
            let expr = compile_expr(ctx, expr);
            let eval = expr.evaluator();
            let exec = Executor::new(move |frame| eval.call(frame).map(|_| ()));
            CompiledStmt::new(exec, expr.facts.post)
        }
        Statement::If {
            condition,
            then_branch,
            else_branch,
        } => compile_if(ctx, condition, then_branch, else_branch.as_deref()),
        Statement::While { condition, body } => compile_while(ctx, condition, body),
        Statement::For { var, iterable, body } => compile_for(ctx, var, iterable, body),
        Statement::Block(stmts) => {
            let (exec, post) = ctx.with_scope(ScopeKind::Block, |ctx| compile_stmts(ctx, stmts));
            CompiledStmt::new(exec, post)
        }
    }
}

/// Compile a function body: statements followed by a result expression
pub fn compile_body(ctx: &mut CompilationContext, stmts: &[Stmt], result: &Expr) -> CompiledExpr {
    ctx.with_scope(ScopeKind::Block, |ctx| {
        let (exec, post) = compile_stmts(ctx, stmts);
        let result = ctx.with_facts(&post, |ctx| compile_expr(ctx, result));
        let facts = ExprFacts::of_post(post.put(&result.facts.post));
        let eval = result.evaluator();
        let body = Evaluator::new(move |frame| {
            exec.run(frame)?;
            eval.call(frame)
        });
        let mut compiled = CompiledExpr::interpreted(result.ty.clone(), result.span, body).with_facts(facts);
        compiled.pure = false;
        compiled
    })
}

// Statements of a block in the current scope; returns the combined executor and facts
fn compile_stmts(ctx: &mut CompilationContext, stmts: &[Stmt]) -> (Executor, VarFacts) {
    let mut post = VarFacts::empty();
    let mut execs = Vec::with_capacity(stmts.len());
    ctx.with_facts(&VarFacts::empty(), |ctx| {
        for stmt in stmts {
            let compiled = compile_stmt(ctx, stmt);
            ctx.apply_facts(&compiled.post);
            post = post.put(&compiled.post);
            execs.push(compiled.exec);
        }
    });
    let exec = Executor::new(move |frame| {
        for exec in &execs {
            exec.run(frame)?;
        }
        Ok(())
    });
    (exec, post)
}

fn check_name_conflict(ctx: &mut CompilationContext, name: &Name) -> bool {
    if ctx.scopes().lookup(&name.inner).is_none() {
        return true;
    }
    ctx.error(
        name.span,
        RELL0403,
        format!("block:name_conflict:{}", name.inner),
        format!("Name conflict: '{}'", name.inner),
    );
    false
}

fn compile_var_decl(
    ctx: &mut CompilationContext,
    mutable: bool,
    name: &Name,
    ty: Option<&Spanned<TypeSpecifier>>,
    init: Option<&Expr>,
) -> CompiledStmt {
    let declared = ty.map(|ty| resolve_type(ctx, ty));
    let init = init.map(|init| compile_expr(ctx, init));
    let conflict = !check_name_conflict(ctx, name);

    let (var_ty, init) = match (declared, init) {
        (_, Some(init)) if init.ty.is_unit() => {
            ctx.error(
                init.span,
                RELL0010,
                format!("stmt_var_unit:{}", name.inner),
                format!("Expression for '{}' returns nothing", name.inner),
            );
            (ResolvedType::Error, None)
        }
        (Some(declared), Some(init)) => {
            let init = promote_to(init, declared.unwrap_nullable());
            if !declared.is_assignable_from(&init.ty) {
                type_mismatch(
                    ctx,
                    init.span,
                    RELL0402,
                    &format!("stmt_var_type:{}", name.inner),
                    &format!("Type mismatch for '{}'", name.inner),
                    &declared,
                    &init.ty,
                );
            }
            (declared, Some(init))
        }
        (None, Some(init)) => (init.ty.clone(), Some(init)),
        (Some(declared), None) => (declared, None),
        (None, None) => {
            ctx.error(
                name.span,
                RELL0404,
                format!("stmt_var_notypeexpr:{}", name.inner),
                format!("Neither type nor expression specified for '{}'", name.inner),
            );
            (ResolvedType::Error, None)
        }
    };

    if conflict {
        return CompiledStmt::noop(VarFacts::empty());
    }
    let var = ctx.declare_var(&name.inner, var_ty, mutable);
    log::trace!("declared {} {} as {}", if mutable { "var" } else { "val" }, var.name, var.uid);

    match init {
        Some(init) => {
            let post = init.facts.post.put(&VarFacts::for_assignment(var.uid, &var.ty, &init.ty));
            CompiledStmt::new(assign_exec(var.uid, init.evaluator()), post)
        }
        // An erroneous declaration counts as initialized to avoid follow-up errors
        None if var.ty.is_error() => CompiledStmt::noop(VarFacts::of_inited(var.uid, VarFact::Yes)),
        None => CompiledStmt::noop(VarFacts::of_inited(var.uid, VarFact::No)),
    }
}

fn assign_exec(uid: VarUid, eval: Evaluator) -> Executor {
    Executor::new(move |frame| {
        let value = eval.call(frame)?;
        frame.set(uid, value);
        Ok(())
    })
}

// Assignable target of an assignment, or None after reporting why not
fn assign_target(ctx: &mut CompilationContext, target: &Name) -> Option<LocalVar> {
    let name = &target.inner;
    let var = match ctx.scopes().lookup(name).cloned() {
        Some(Symbol::Var(var)) => var,
        Some(Symbol::AtEntity(_)) => {
            ctx.error(target.span, RELL0401, format!("stmt_assign_val:{name}"), format!("Cannot assign to '{name}'"));
            return None;
        }
        None => {
            ctx.error(target.span, RELL0001, format!("unknown_name:{name}"), format!("Unknown name: '{name}'"));
            return None;
        }
    };
    if !var.mutable {
        // A val may be assigned once, and never inside a loop it was declared outside of
        let once = ctx.facts().inited(var.uid) == Some(VarFact::No) && !ctx.scopes().declared_outside_loop(name);
        if !once {
            ctx.error(
                target.span,
                RELL0401,
                format!("stmt_assign_val:{name}"),
                format!("Value of '{name}' cannot be changed"),
            );
            return None;
        }
    }
    Some(var)
}

fn compile_assign(ctx: &mut CompilationContext, target: &Name, op: AssignOp, value: &Expr, span: Span) -> CompiledStmt {
    let Some(var) = assign_target(ctx, target) else {
        compile_expr(ctx, value);
        return CompiledStmt::noop(VarFacts::empty());
    };

    let value = match op.binary() {
        None => promote_to(compile_expr(ctx, value), var.ty.unwrap_nullable()),
        Some(binary) => {
            // `x += e` reads `x`, so it goes through the operator compiler as `x + e`
            let read = Spanned::new(Expression::Name(target.inner.clone()), target.span);
            let expr = Spanned::new(
                Expression::Binary {
                    op: binary,
                    left: Box::new(read),
                    right: Box::new(value.clone()),
                },
                span,
            );
            compile_expr(ctx, &expr)
        }
    };

    if !var.ty.is_assignable_from(&value.ty) {
        type_mismatch(
            ctx,
            value.span,
            RELL0402,
            &format!("stmt_assign_type:{}", var.name),
            &format!("Type mismatch for '{}'", var.name),
            &var.ty,
            &value.ty,
        );
    }
    let post = value.facts.post.put(&VarFacts::for_assignment(var.uid, &var.ty, &value.ty));
    CompiledStmt::new(assign_exec(var.uid, value.evaluator()), post)
}

fn check_condition(ctx: &mut CompilationContext, cond: &CompiledExpr, key: &str, what: &str) {
    if cond.ty != ResolvedType::Boolean {
        type_mismatch(ctx, cond.span, RELL0405, key, &format!("Wrong type of {what}"), &ResolvedType::Boolean, &cond.ty);
    }
}

fn as_bool(value: Value) -> EvalResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| EvalError::internal(format!("not a boolean: {value}")))
}

// A branch or loop body gets its own scope even without braces
fn compile_nested(ctx: &mut CompilationContext, kind: ScopeKind, facts: &VarFacts, stmt: &Stmt) -> CompiledStmt {
    ctx.with_facts(facts, |ctx| ctx.with_scope(kind, |ctx| compile_stmt(ctx, stmt)))
}

fn compile_if(ctx: &mut CompilationContext, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> CompiledStmt {
    let cond = compile_expr(ctx, condition);
    check_condition(ctx, &cond, "stmt_if_expr_type", "if-condition");

    let when_true = cond.facts.when_true();
    let when_false = cond.facts.when_false();
    let then = compile_nested(ctx, ScopeKind::Block, &when_true, then_branch);
    let otherwise = else_branch.map(|stmt| compile_nested(ctx, ScopeKind::Block, &when_false, stmt));

    let false_post = match &otherwise {
        Some(stmt) => when_false.put(&stmt.post),
        None => when_false,
    };
    let post = VarFacts::for_branches(ctx.facts(), &[when_true.put(&then.post), false_post]);

    let eval = cond.evaluator();
    let then_exec = then.exec;
    let else_exec = otherwise.map(|stmt| stmt.exec);
    let exec = Executor::new(move |frame| {
        if as_bool(eval.call(frame)?)? {
            then_exec.run(frame)
        } else if let Some(exec) = &else_exec {
            exec.run(frame)
        } else {
            Ok(())
        }
    });
    CompiledStmt::new(exec, post)
}

/// Local variables assigned anywhere in `stmt`, resolved in the current scope
fn assigned_vars(ctx: &CompilationContext, stmt: &Stmt) -> Vec<VarUid> {
    fn collect<'a>(stmt: &'a Stmt, names: &mut Vec<&'a str>) {
        match &stmt.inner {
            Statement::Assign { target, .. } => names.push(&target.inner),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect(then_branch, names);
                if let Some(stmt) = else_branch {
                    collect(stmt, names);
                }
            }
            Statement::While { body, .. } | Statement::For { body, .. } => collect(body, names),
            Statement::Block(stmts) => stmts.iter().for_each(|s| collect(s, names)),
            Statement::Var { .. } | Statement::Expr(_) => {}
        }
    }

    let mut names = Vec::new();
    collect(stmt, &mut names);
    let mut vars = Vec::new();
    for name in names {
        if let Some(var) = ctx.scopes().lookup_var(name) {
            if !vars.contains(&var.uid) {
                vars.push(var.uid);
            }
        }
    }
    vars
}

fn compile_while(ctx: &mut CompilationContext, condition: &Expr, body: &Stmt) -> CompiledStmt {
    let loop_facts = VarFacts::empty().invalidate(&assigned_vars(ctx, body));
    let cond = ctx.with_facts(&loop_facts, |ctx| compile_expr(ctx, condition));
    check_condition(ctx, &cond, "stmt_while_expr_type", "while-condition");

    let body_facts = loop_facts.put(&cond.facts.when_true());
    let body = compile_nested(ctx, ScopeKind::Loop, &body_facts, body);
    let post = loop_facts.put(&cond.facts.when_false());

    let eval = cond.evaluator();
    let body_exec = body.exec;
    let exec = Executor::new(move |frame| {
        while as_bool(eval.call(frame)?)? {
            body_exec.run(frame)?;
        }
        Ok(())
    });
    CompiledStmt::new(exec, post)
}

fn compile_for(ctx: &mut CompilationContext, var: &Name, iterable: &Expr, body: &Stmt) -> CompiledStmt {
    let loop_facts = VarFacts::empty().invalidate(&assigned_vars(ctx, body));
    let iterable = compile_expr(ctx, iterable);
    let element = match iterable.ty.element_type() {
        Some(ty) => ty,
        None => {
            if !iterable.is_error() {
                ctx.error(
                    iterable.span,
                    RELL0406,
                    format!("stmt_for_expr_type:[{}]", iterable.ty),
                    format!("Wrong type of for-expression: {}", iterable.ty),
                );
            }
            ResolvedType::Error
        }
    };
    let outer_facts = loop_facts.put(&iterable.facts.post);

    let conflict = !check_name_conflict(ctx, var);
    let (item, body) = ctx.with_facts(&outer_facts, |ctx| {
        ctx.with_scope(ScopeKind::Loop, |ctx| {
            let item = (!conflict).then(|| ctx.declare_var(&var.inner, element.clone(), false));
            let item_facts = match &item {
                Some(item) => VarFacts::for_assignment(item.uid, &item.ty, &item.ty),
                None => VarFacts::empty(),
            };
            let body = ctx.with_facts(&item_facts, |ctx| ctx.with_scope(ScopeKind::Block, |ctx| compile_stmt(ctx, body)));
            (item.map(|item| item.uid), body)
        })
    });

    let eval = iterable.evaluator();
    let body_exec = body.exec;
    let exec = Executor::new(move |frame| {
        let collection = eval.call(frame)?;
        let items = collection
            .elements()
            .ok_or_else(|| EvalError::internal(format!("not iterable: {collection}")))?;
        for value in items {
            if let Some(uid) = item {
                frame.set(uid, value);
            }
            body_exec.run(frame)?;
        }
        Ok(())
    });
    CompiledStmt::new(exec, outer_facts)
}
