//! Type expressions

use crate::context::CompilationContext;
use rell_sema_ast::{Spanned, TypeSpecifier};
use rell_sema_diagnostics::{RELL0002, Span};
use rell_sema_types::{ResolvedType, TupleField};

/// Resolve a written type; unknown names are reported and become the error type
pub fn resolve_type(ctx: &mut CompilationContext, spec: &Spanned<TypeSpecifier>) -> ResolvedType {
    resolve(ctx, &spec.inner, spec.span)
}

fn resolve(ctx: &mut CompilationContext, spec: &TypeSpecifier, span: Span) -> ResolvedType {
    match spec {
        TypeSpecifier::Named(name) => resolve_name(ctx, name, span),
        TypeSpecifier::Nullable(inner) => ResolvedType::nullable(resolve(ctx, inner, span)),
        TypeSpecifier::List(elem) => wrap(resolve(ctx, elem, span), ResolvedType::list),
        TypeSpecifier::Set(elem) => wrap(resolve(ctx, elem, span), ResolvedType::set),
        TypeSpecifier::Map(key, value) => {
            let key = resolve(ctx, key, span);
            let value = resolve(ctx, value, span);
            if key.is_error() || value.is_error() {
                ResolvedType::Error
            } else {
                ResolvedType::map(key, value)
            }
        }
        TypeSpecifier::Tuple(fields) => {
            let fields: Vec<TupleField> = fields
                .iter()
                .map(|(name, ty)| TupleField {
                    name: name.clone(),
                    ty: resolve(ctx, ty, span),
                })
                .collect();
            if fields.iter().any(|f| f.ty.is_error()) {
                ResolvedType::Error
            } else {
                ResolvedType::tuple(fields)
            }
        }
    }
}

fn wrap(elem: ResolvedType, f: fn(ResolvedType) -> ResolvedType) -> ResolvedType {
    if elem.is_error() { elem } else { f(elem) }
}

fn resolve_name(ctx: &mut CompilationContext, name: &str, span: Span) -> ResolvedType {
    let primitive = match name {
        "boolean" => Some(ResolvedType::Boolean),
        "integer" => Some(ResolvedType::Integer),
        "big_integer" => Some(ResolvedType::BigInteger),
        "decimal" => Some(ResolvedType::Decimal),
        "text" => Some(ResolvedType::Text),
        "byte_array" => Some(ResolvedType::ByteArray),
        "rowid" => Some(ResolvedType::Rowid),
        "range" => Some(ResolvedType::Range),
        _ => None,
    };
    if let Some(ty) = primitive.or_else(|| ctx.definitions().type_of(name)) {
        log::trace!("type {name} resolved to {ty}");
        return ty;
    }
    ctx.error(span, RELL0002, format!("unknown_type:{name}"), format!("Unknown type: '{name}'"));
    ResolvedType::Error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use rell_sema_ast::dsl::{nullable_ty, ty};
    use rstest::rstest;

    #[rstest]
    #[case(TypeSpecifier::named("integer"), "integer")]
    #[case(TypeSpecifier::named("user").nullable(), "user?")]
    #[case(TypeSpecifier::list(TypeSpecifier::named("big_integer")), "list<big_integer>")]
    #[case(
        TypeSpecifier::map(TypeSpecifier::named("text"), TypeSpecifier::named("color")),
        "map<text,color>"
    )]
    #[case(
        TypeSpecifier::Tuple(vec![(Some("a".to_string()), TypeSpecifier::named("decimal")), (None, TypeSpecifier::named("state"))]),
        "(a:decimal,state)"
    )]
    fn test_resolve(#[case] spec: TypeSpecifier, #[case] expected: &str) {
        let mut ctx = context();
        let resolved = resolve_type(&mut ctx, &Spanned::new(spec, Span::default()));
        assert_eq!(resolved.to_string(), expected);
        assert!(!ctx.sink().has_errors());
    }

    #[test]
    fn test_unknown_type() {
        let mut ctx = context();
        assert_eq!(resolve_type(&mut ctx, &ty("person")), ResolvedType::Error);
        assert_eq!(resolve_type(&mut ctx, &nullable_ty("text")), ResolvedType::nullable(ResolvedType::Text));
        let list = Spanned::new(TypeSpecifier::list(TypeSpecifier::named("thing")), Span::default());
        assert_eq!(resolve_type(&mut ctx, &list), ResolvedType::Error);
        assert_eq!(ctx.sink().keys(), vec!["unknown_type:person", "unknown_type:thing"]);
    }
}
