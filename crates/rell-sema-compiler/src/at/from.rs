//! From-part: entity sources or one iterable source

use crate::compile::compile_expr;
use crate::context::CompilationContext;
use crate::expr::CompiledExpr;
use crate::facts::VarFacts;
use crate::ids::AtExprId;
use crate::scope::{AtEntity, AtFrame, FrameSource, LocalVar, Symbol};
use rell_sema_ast::FromItem;
use rell_sema_diagnostics::{RELL0200, RELL0201, RELL0202, Span};
use rell_sema_types::EntityDef;
use std::collections::HashSet;
use std::sync::Arc;

/// Compiled from-part of an at-expression
#[derive(Debug)]
pub(crate) struct AtSource {
    pub frame: AtFrame,
    /// The iterable expression of a collection source
    pub iterable: Option<CompiledExpr>,
    /// Facts established by evaluating the source
    pub post: VarFacts,
}

impl AtSource {
    /// Symbols the at-scope defines, by name
    pub fn symbols(&self) -> Vec<(String, Symbol)> {
        match &self.frame.source {
            FrameSource::Db(entities) => entities
                .iter()
                .map(|e| (e.alias.clone(), Symbol::AtEntity(e.clone())))
                .collect(),
            FrameSource::Collection { item, explicit_alias: true } => {
                vec![(item.name.clone(), Symbol::Var(item.clone()))]
            }
            FrameSource::Collection { .. } => Vec::new(),
        }
    }
}

enum FromKind {
    Entity(Arc<EntityDef>),
    Iterable(CompiledExpr),
}

pub(crate) fn compile_from(ctx: &mut CompilationContext, id: AtExprId, items: &[FromItem], span: Span) -> Option<AtSource> {
    let mut aliases = HashSet::new();
    let mut kinds = Vec::with_capacity(items.len());
    let mut failed = false;

    for item in items {
        let kind = from_kind(ctx, item);
        if let Some(alias) = &item.alias {
            if matches!(ctx.scopes().lookup(&alias.inner), Some(Symbol::Var(_))) {
                ctx.error(
                    alias.span,
                    RELL0201,
                    format!("expr_at_conflict_alias:{}", alias.inner),
                    format!("Name conflict: '{}'", alias.inner),
                );
                failed = true;
            }
        }
        let name = match (&item.alias, &kind) {
            (Some(alias), _) => Some(alias.inner.clone()),
            (None, FromKind::Entity(def)) => Some(def.name.clone()),
            (None, FromKind::Iterable(_)) => None,
        };
        if let Some(name) = name {
            if !aliases.insert(name.clone()) {
                ctx.error(
                    item.alias.as_ref().map_or(item.expr.span, |a| a.span),
                    RELL0200,
                    format!("at_dup_alias:{name}"),
                    format!("Duplicate alias: '{name}'"),
                );
                failed = true;
            }
        }
        kinds.push((item, kind));
    }

    let iterables = kinds.iter().filter(|(_, k)| matches!(k, FromKind::Iterable(_))).count();
    if iterables > 0 && iterables < kinds.len() {
        ctx.error(
            span,
            RELL0202,
            "at:from:mix_entity_iterable",
            "Cannot mix entities and collections in the from-part",
        );
        return None;
    }
    if iterables > 1 {
        ctx.error(
            span,
            RELL0202,
            format!("at:from:many_iterables:{iterables}"),
            format!("Only one collection is allowed in the from-part, found: {iterables}"),
        );
        return None;
    }
    if failed {
        return None;
    }

    let mut kinds = kinds.into_iter();
    match kinds.next() {
        Some((item, FromKind::Iterable(expr))) => iterable_source(ctx, id, item, expr),
        Some((first, FromKind::Entity(def))) => {
            let mut entities = vec![at_entity(ctx, id, first, def)];
            for (item, kind) in kinds {
                if let FromKind::Entity(def) = kind {
                    entities.push(at_entity(ctx, id, item, def));
                }
            }
            Some(AtSource {
                frame: AtFrame {
                    id,
                    source: FrameSource::Db(entities),
                },
                iterable: None,
                post: VarFacts::empty(),
            })
        }
        None => None,
    }
}

/// An unshadowed entity name is an entity source; anything else is an iterable
fn from_kind(ctx: &mut CompilationContext, item: &FromItem) -> FromKind {
    if let Some(name) = item.expr.inner.as_name() {
        if !ctx.scopes().is_defined(name) {
            if let Some(def) = ctx.definitions().entity(name) {
                return FromKind::Entity(def.clone());
            }
        }
    }
    FromKind::Iterable(compile_expr(ctx, &item.expr))
}

fn at_entity(ctx: &mut CompilationContext, at: AtExprId, item: &FromItem, def: Arc<EntityDef>) -> AtEntity {
    let (alias, explicit_alias) = match &item.alias {
        Some(alias) => (alias.inner.clone(), true),
        None => (def.name.clone(), false),
    };
    AtEntity {
        id: ctx.ids().next_at_entity(),
        at,
        alias,
        explicit_alias,
        def,
    }
}

fn iterable_source(ctx: &mut CompilationContext, id: AtExprId, item: &FromItem, expr: CompiledExpr) -> Option<AtSource> {
    if expr.is_error() {
        return None;
    }
    let Some(element) = expr.ty.element_type() else {
        ctx.error(
            expr.span,
            RELL0202,
            format!("at:from:bad_type:{}", expr.ty),
            format!("Invalid type for the from-part: {}", expr.ty),
        );
        return None;
    };
    let (name, explicit_alias) = match &item.alias {
        Some(alias) => (alias.inner.clone(), true),
        None => ("$".to_string(), false),
    };
    let var = LocalVar {
        uid: ctx.ids().next_var(),
        name,
        ty: element,
        mutable: false,
        at: Some(id),
    };
    let post = expr.facts.post.clone();
    Some(AtSource {
        frame: AtFrame {
            id,
            source: FrameSource::Collection {
                item: var,
                explicit_alias,
            },
        },
        iterable: Some(expr),
        post,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use rell_sema_ast::dsl::*;

    fn compile(ctx: &mut CompilationContext, items: &[FromItem]) -> Option<AtSource> {
        let id = ctx.ids().next_at_expr();
        compile_from(ctx, id, items, Span::default())
    }

    #[test]
    fn test_entities_with_aliases() {
        let mut ctx = context();
        let source = compile(&mut ctx, &[from(name("user")), from_alias("c", name("company"))]).unwrap();
        let FrameSource::Db(entities) = &source.frame.source else {
            panic!("expected entity source");
        };
        let aliases: Vec<(&str, bool)> = entities.iter().map(|e| (e.alias.as_str(), e.explicit_alias)).collect();
        assert_eq!(aliases, vec![("user", false), ("c", true)]);
        assert_ne!(entities[0].id, entities[1].id);
        assert!(source.iterable.is_none());
    }

    #[test]
    fn test_iterable_element_var() {
        let mut ctx = context();
        let source = compile(&mut ctx, &[from(list(vec![int(1), int(2)]))]).unwrap();
        let FrameSource::Collection { item, explicit_alias } = &source.frame.source else {
            panic!("expected collection source");
        };
        assert_eq!(item.ty, rell_sema_types::ResolvedType::Integer);
        assert_eq!(item.at, Some(source.frame.id));
        assert!(!explicit_alias);
        assert!(source.symbols().is_empty());
    }

    #[test]
    fn test_from_errors() {
        let mut ctx = context();
        ctx.declare_param("x", rell_sema_types::ResolvedType::Integer);
        assert!(compile(&mut ctx, &[from(name("x"))]).is_none());
        assert!(compile(&mut ctx, &[from(name("user")), from(list(vec![int(1)]))]).is_none());
        assert!(compile(&mut ctx, &[from(list(vec![int(1)])), from(list(vec![int(2)]))]).is_none());
        assert!(compile(&mut ctx, &[from(name("user")), from_alias("user", name("company"))]).is_none());
        assert!(compile(&mut ctx, &[from_alias("x", name("user"))]).is_none());
        assert_eq!(
            ctx.sink().keys(),
            vec![
                "at:from:bad_type:integer",
                "at:from:mix_entity_iterable",
                "at:from:many_iterables:2",
                "at_dup_alias:user",
                "expr_at_conflict_alias:x",
            ]
        );
    }
}
