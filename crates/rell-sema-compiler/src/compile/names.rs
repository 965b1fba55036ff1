//! Name resolution
//!
//! A plain name is looked up in this order:
//! 1. local symbols: variables, then entity aliases of enclosing queries
//! 2. implicit attributes of enclosing at-expressions
//! 3. global constants
//! 4. object names
//!
//! `.name` skips local variables and only searches attributes; `$` refers
//! to the unaliased source of the innermost at-expression.

use crate::context::{CompilationContext, GlobalConstant};
use crate::error::EvalError;
use crate::expr::{CompiledExpr, Evaluator, VarRef};
use crate::facts::{VarFact, VarFacts};
use crate::options::AtAttrShadowing;
use crate::scope::{AtEntity, FrameAttr, LocalVar, PlaceholderTarget, Symbol};
use crate::sql::{DbExpr, DbTable};
use rell_sema_diagnostics::{RELL0001, RELL0003, RELL0011, RELL0213, RELL0214, RELL0215, RELL0400, Span};
use rell_sema_types::{ResolvedType, Value};
use std::sync::Arc;

pub(crate) fn compile_name(ctx: &mut CompilationContext, name: &str, span: Span) -> CompiledExpr {
    if let Some(symbol) = ctx.scopes().lookup(name).cloned() {
        return match symbol {
            Symbol::Var(var) => compile_var(ctx, &var, span).with_name(name),
            Symbol::AtEntity(entity) => compile_entity(ctx, &entity, span).with_name(name),
        };
    }
    if ctx.scopes().in_at() {
        if let Some(expr) = implicit_attribute(ctx, name, span) {
            return expr;
        }
    }
    if let Some(global) = ctx.global(name).cloned() {
        return compile_global(name, &global, span);
    }
    if ctx.definitions().object(name).is_some() {
        return CompiledExpr::constant(Value::Object(Arc::from(name)), ResolvedType::object(name), span);
    }
    if ctx.definitions().type_of(name).is_some() {
        ctx.error(
            span,
            RELL0011,
            format!("expr_novalue:type:[{name}]"),
            format!("Type '{name}' cannot be used as a value"),
        );
        return CompiledExpr::error(span);
    }
    ctx.error(span, RELL0001, format!("unknown_name:{name}"), format!("Unknown name: '{name}'"));
    CompiledExpr::error(span)
}

/// `.name`: an attribute of an enclosing at-expression
pub(crate) fn compile_attr(ctx: &mut CompilationContext, name: &str, span: Span) -> CompiledExpr {
    if ctx.scopes().in_at() {
        if let Some(expr) = implicit_attribute(ctx, name, span) {
            return expr;
        }
    }
    ctx.error(span, RELL0003, format!("expr_attr_unknown:{name}"), format!("Unknown attribute: '{name}'"));
    CompiledExpr::error(span)
}

pub(crate) fn compile_placeholder(ctx: &mut CompilationContext, span: Span) -> CompiledExpr {
    let candidates: Vec<(usize, PlaceholderTarget)> = ctx
        .scopes()
        .at_frames()
        .enumerate()
        .flat_map(|(depth, frame)| frame.placeholders().into_iter().map(move |t| (depth, t)))
        .collect();

    match candidates.as_slice() {
        [] => {
            ctx.error(span, RELL0215, "expr:at:placeholder_none", "Placeholder not defined");
            CompiledExpr::error(span)
        }
        [(0, target)] => match target {
            PlaceholderTarget::Entity(entity) => compile_entity(ctx, entity, span),
            PlaceholderTarget::Item(item) => compile_var(ctx, item, span),
        },
        [_] => {
            ctx.error(
                span,
                RELL0215,
                "at_expr:placeholder:belongs_to_outer",
                "Placeholder belongs to an outer at-expression, use an alias",
            );
            CompiledExpr::error(span)
        }
        _ => {
            ctx.error(
                span,
                RELL0215,
                "expr:at:placeholder_ambiguous",
                "Placeholder is ambiguous, can belong to more than one expression; use aliases",
            );
            CompiledExpr::error(span)
        }
    }
}

/// Read a local variable, applying smart narrowing
pub(crate) fn compile_var(ctx: &mut CompilationContext, var: &LocalVar, span: Span) -> CompiledExpr {
    if ctx.facts().inited(var.uid) != Some(VarFact::Yes) {
        ctx.error(
            span,
            RELL0400,
            format!("expr_var_uninit:{}", var.name),
            format!("Variable '{}' may be uninitialized", var.name),
        );
        return CompiledExpr::error(span);
    }

    let ty = narrowed_type(ctx.facts(), var);
    let uid = var.uid;
    let eval = Evaluator::new(move |frame| frame.get(uid).cloned());
    let mut expr = CompiledExpr::interpreted(ty, span, eval);
    expr.var = Some(VarRef {
        uid,
        name: var.name.clone(),
        declared: var.ty.clone(),
    });
    if let Some(at) = var.at {
        expr = expr.with_deps(&[at]);
    }
    expr
}

fn narrowed_type(facts: &VarFacts, var: &LocalVar) -> ResolvedType {
    if !var.ty.is_nullable() {
        return var.ty.clone();
    }
    match facts.nulled(var.uid) {
        Some(VarFact::No) => var.ty.unwrap_nullable().clone(),
        Some(VarFact::Yes) => ResolvedType::Null,
        _ => var.ty.clone(),
    }
}

/// Row of a from-entity; only the query that declared it may read it
pub(crate) fn compile_entity(ctx: &mut CompilationContext, entity: &AtEntity, span: Span) -> CompiledExpr {
    let innermost = ctx.scopes().innermost_at().map(|frame| frame.id);
    if innermost != Some(entity.at) {
        ctx.error(
            span,
            RELL0213,
            format!("at:entity:outer:{}", entity.alias),
            format!(
                "Cannot access entity '{}' as it belongs to an unrelated at-expression",
                entity.alias
            ),
        );
        return CompiledExpr::error(span);
    }
    CompiledExpr::database(entity.def.ty(), span, DbExpr::Rowid(DbTable::root(entity.id)), entity.at)
}

/// Compile a resolved implicit attribute
pub(crate) fn compile_frame_attr(attr: &FrameAttr, span: Span) -> CompiledExpr {
    match attr {
        FrameAttr::Db { entity, attr } => {
            let column = DbExpr::Column {
                table: DbTable::root(entity.id),
                column: attr.column().to_string(),
            };
            CompiledExpr::database(attr.ty.clone(), span, column, entity.at).with_name(&attr.name)
        }
        FrameAttr::Field { item, index, name, ty } => {
            let (uid, index) = (item.uid, *index);
            let eval = Evaluator::new(move |frame| {
                let value = frame.get(uid)?;
                value
                    .as_tuple()
                    .and_then(|fields| fields.get(index))
                    .cloned()
                    .ok_or_else(|| EvalError::internal(format!("no tuple field {index} in {value}")))
            });
            let expr = CompiledExpr::interpreted(ty.clone(), span, eval).with_name(name);
            match item.at {
                Some(at) => expr.with_deps(&[at]),
                None => expr,
            }
        }
    }
}

/// Attributes named `name`, with the depth of the frame that has them
///
/// The walk goes from the innermost frame outwards and stops according to
/// the configured shadowing.
pub(crate) fn lookup_attributes(ctx: &CompilationContext, name: &str) -> Vec<(usize, FrameAttr)> {
    let shadowing = ctx.options().at_attr_shadowing;
    let mut found = Vec::new();
    for (depth, frame) in ctx.scopes().at_frames().enumerate() {
        let attrs = frame.attributes_by_name(name);
        let stop = !attrs.is_empty()
            && match shadowing {
                AtAttrShadowing::Full => true,
                AtAttrShadowing::Partial => depth == 0,
                AtAttrShadowing::None => false,
            };
        found.extend(attrs.into_iter().map(|attr| (depth, attr)));
        if stop {
            break;
        }
    }
    found
}

fn implicit_attribute(ctx: &mut CompilationContext, name: &str, span: Span) -> Option<CompiledExpr> {
    let found = lookup_attributes(ctx, name);
    match found.as_slice() {
        [] => None,
        [(0, attr)] => Some(compile_frame_attr(attr, span)),
        [(_, attr)] => {
            ctx.error(
                span,
                RELL0213,
                format!("at_expr:attr:belongs_to_outer:{name}:{}", attr.owner()),
                format!("Attribute '{name}' belongs to an outer at-expression, fully qualified name is required"),
            );
            Some(CompiledExpr::error(span))
        }
        many => {
            let names: Vec<String> = many.iter().map(|(_, attr)| attr.qualified_name()).collect();
            ctx.error(
                span,
                RELL0214,
                format!("at_attr_name_ambig:{name}:[{}]", names.join(",")),
                format!("Multiple attributes with name '{name}': {}", names.join(", ")),
            );
            Some(CompiledExpr::error(span))
        }
    }
}

fn compile_global(name: &str, global: &GlobalConstant, span: Span) -> CompiledExpr {
    let ty = global.ty.get();
    match global.value.try_get() {
        Some(value) => CompiledExpr::constant(value, ty, span).with_name(name),
        None => {
            // Computed by a later pass; read when evaluated
            let handle = global.value.clone();
            CompiledExpr::interpreted(ty, span, Evaluator::new(move |_| Ok(handle.get()))).with_name(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_expr;
    use crate::deferred::Deferred;
    use crate::options::CompilerOptions;
    use crate::runtime::{Frame, NoDatabase};
    use rell_sema_ast::dsl::*;
    use rell_sema_types::{Definitions, ObjectDef};

    fn context() -> CompilationContext {
        let mut defs = Definitions::new();
        defs.add_object(ObjectDef::new("state").with_attribute("counter", ResolvedType::Integer));
        CompilationContext::new(Arc::new(defs), CompilerOptions::default())
    }

    #[test]
    fn test_narrowed_variable_type() {
        let mut ctx = context();
        let x = ctx.declare_param("x", ResolvedType::nullable(ResolvedType::Integer));
        ctx.apply_facts(&VarFacts::of_nulled(x, VarFact::No));
        let expr = compile_expr(&mut ctx, &name("x"));
        assert_eq!(expr.ty, ResolvedType::Integer);
        assert_eq!(expr.var.map(|v| v.declared), Some(ResolvedType::nullable(ResolvedType::Integer)));

        ctx.apply_facts(&VarFacts::of_nulled(x, VarFact::Yes));
        assert_eq!(compile_expr(&mut ctx, &name("x")).ty, ResolvedType::Null);
    }

    #[test]
    fn test_uninitialized_variable() {
        let mut ctx = context();
        ctx.declare_var("x", ResolvedType::Integer, true);
        assert!(compile_expr(&mut ctx, &name("x")).is_error());
        assert_eq!(ctx.sink().keys(), vec!["expr_var_uninit:x"]);
    }

    #[test]
    fn test_unknown_names() {
        let mut ctx = context();
        compile_expr(&mut ctx, &name("nope"));
        compile_expr(&mut ctx, &attr("name"));
        compile_expr(&mut ctx, &placeholder());
        assert_eq!(
            ctx.sink().keys(),
            vec!["unknown_name:nope", "expr_attr_unknown:name", "expr:at:placeholder_none"]
        );
    }

    #[test]
    fn test_object_name_is_a_value() {
        let mut ctx = context();
        let expr = compile_expr(&mut ctx, &name("state"));
        assert_eq!(expr.ty, ResolvedType::object("state"));
        assert_eq!(expr.constant, Some(Value::Object(Arc::from("state"))));
    }

    #[test]
    fn test_pending_global_read_at_runtime() {
        let mut ctx = context();
        let (value, setter) = Deferred::pending();
        ctx.define_global("MAX", GlobalConstant::new(Deferred::resolved(ResolvedType::Integer), value));
        let expr = compile_expr(&mut ctx, &name("MAX"));
        assert_eq!(expr.ty, ResolvedType::Integer);
        assert!(expr.constant.is_none());

        setter.set(Value::Integer(10));
        let db = NoDatabase;
        let mut frame = Frame::new(&db);
        assert_eq!(expr.evaluate(&mut frame), Ok(Value::Integer(10)));
    }
}
