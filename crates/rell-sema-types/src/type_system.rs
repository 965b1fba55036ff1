//! Resolved types
//!
//! This module defines the closed set of value types known to the semantic core:
//! - Primitive types (boolean, integer, big_integer, decimal, text, byte_array, rowid)
//! - Nullable wrappers and collection types (list, set, map, range, virtual)
//! - Tuples with optionally named fields
//! - Named definition types (entity, enum, object)
//! - The special `unit`, `null` and `error` types
//!
//! `error` is produced after a diagnostic has been reported; every predicate
//! treats it as compatible with everything so one mistake is reported once.

use std::fmt;
use std::sync::Arc;

/// A tuple field type with an optional name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleField {
    pub name: Option<String>,
    pub ty: ResolvedType,
}

impl TupleField {
    pub fn named(name: impl Into<String>, ty: ResolvedType) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    pub fn unnamed(ty: ResolvedType) -> Self {
        Self { name: None, ty }
    }
}

/// A fully resolved value type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    // === Special Types ===
    /// Type of statements and expressions without a value
    Unit,
    /// Type of the `null` literal
    Null,
    /// Placeholder after an error was reported
    Error,

    // === Primitive Types ===
    Boolean,
    Integer,
    BigInteger,
    Decimal,
    Text,
    ByteArray,
    Rowid,

    // === Composite Types ===
    Nullable(Box<ResolvedType>),
    List(Box<ResolvedType>),
    Set(Box<ResolvedType>),
    Map(Box<ResolvedType>, Box<ResolvedType>),
    /// Integer range
    Range,
    /// Read-only view over a collection type
    Virtual(Box<ResolvedType>),
    Tuple(Vec<TupleField>),
    Function {
        params: Vec<ResolvedType>,
        result: Box<ResolvedType>,
    },

    // === Definition Types ===
    Entity(Arc<str>),
    Enum(Arc<str>),
    /// Singleton object
    Object(Arc<str>),
}

impl ResolvedType {
    // === Constructors ===

    /// Wrap in a nullable type; `null`, `error` and already nullable types are unchanged
    pub fn nullable(inner: ResolvedType) -> Self {
        match inner {
            Self::Null | Self::Error | Self::Nullable(_) => inner,
            other => Self::Nullable(Box::new(other)),
        }
    }

    pub fn list(element: ResolvedType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: ResolvedType) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map(key: ResolvedType, value: ResolvedType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn virtual_of(inner: ResolvedType) -> Self {
        Self::Virtual(Box::new(inner))
    }

    pub fn tuple(fields: Vec<TupleField>) -> Self {
        Self::Tuple(fields)
    }

    pub fn entity(name: &str) -> Self {
        Self::Entity(Arc::from(name))
    }

    pub fn enumeration(name: &str) -> Self {
        Self::Enum(Arc::from(name))
    }

    pub fn object(name: &str) -> Self {
        Self::Object(Arc::from(name))
    }

    // === Type Properties ===

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Check if values of this type may be null
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Null | Self::Nullable(_))
    }

    /// The value type of a nullable type, or the type itself
    pub fn unwrap_nullable(&self) -> &ResolvedType {
        match self {
            Self::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::BigInteger | Self::Decimal)
    }

    /// Collections compared by identity with `===`
    pub fn is_reference(&self) -> bool {
        matches!(
            self.unwrap_nullable(),
            Self::List(_) | Self::Set(_) | Self::Map(..) | Self::Virtual(_)
        )
    }

    /// Types supporting `<`, `<=`, `>`, `>=`
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::BigInteger
                | Self::Decimal
                | Self::Text
                | Self::ByteArray
                | Self::Rowid
                | Self::Entity(_)
        )
    }

    /// Types usable for sorting and `@min` / `@max`
    pub fn is_sortable(&self) -> bool {
        match self {
            Self::Nullable(inner) => inner.is_sortable(),
            Self::Boolean | Self::Enum(_) => true,
            Self::Tuple(fields) => fields.iter().all(|f| f.ty.is_sortable()),
            other => other.is_ordered(),
        }
    }

    /// Types whose values can be stored in and compared by the database
    pub fn is_sql_compatible(&self) -> bool {
        match self {
            Self::Null | Self::Error => true,
            Self::Nullable(inner) => inner.is_sql_compatible(),
            Self::Boolean
            | Self::Integer
            | Self::BigInteger
            | Self::Decimal
            | Self::Text
            | Self::ByteArray
            | Self::Rowid
            | Self::Entity(_)
            | Self::Enum(_) => true,
            _ => false,
        }
    }

    /// Element type when iterating over a value of this type
    pub fn element_type(&self) -> Option<ResolvedType> {
        match self {
            Self::List(elem) | Self::Set(elem) => Some((**elem).clone()),
            Self::Map(key, value) => Some(Self::tuple(vec![
                TupleField::named("k", (**key).clone()),
                TupleField::named("v", (**value).clone()),
            ])),
            Self::Range => Some(Self::Integer),
            Self::Virtual(inner) => inner.element_type(),
            _ => None,
        }
    }

    // === Type Relations ===

    /// Check if a value of type `other` can be stored where `self` is expected
    ///
    /// Collections are invariant; tuples are compared field by field.
    pub fn is_assignable_from(&self, other: &ResolvedType) -> bool {
        if self == other || self.is_error() || other.is_error() {
            return true;
        }
        match (self, other) {
            (Self::Nullable(_), Self::Null) => true,
            (Self::Nullable(a), Self::Nullable(b)) => a.is_assignable_from(b),
            (Self::Nullable(a), b) => a.is_assignable_from(b),
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|(x, y)| x.name == y.name && x.ty.is_assignable_from(&y.ty))
            }
            _ => false,
        }
    }

    /// The narrowest type both operands are assignable to, without numeric promotion
    pub fn common_type(a: &ResolvedType, b: &ResolvedType) -> Option<ResolvedType> {
        if a.is_error() || b.is_error() {
            return Some(Self::Error);
        }
        if a.is_assignable_from(b) {
            return Some(a.clone());
        }
        if b.is_assignable_from(a) {
            return Some(b.clone());
        }
        match (a, b) {
            (Self::Null, other) | (other, Self::Null) => Some(Self::nullable(other.clone())),
            (Self::Nullable(x), y) | (y, Self::Nullable(x)) => {
                Self::common_type(x, y.unwrap_nullable()).map(Self::nullable)
            }
            _ => None,
        }
    }

    /// Display name used in diagnostics, e.g. `list<integer?>`
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Null => write!(f, "null"),
            Self::Error => write!(f, "<error>"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::BigInteger => write!(f, "big_integer"),
            Self::Decimal => write!(f, "decimal"),
            Self::Text => write!(f, "text"),
            Self::ByteArray => write!(f, "byte_array"),
            Self::Rowid => write!(f, "rowid"),
            Self::Nullable(inner) => match **inner {
                Self::Function { .. } => write!(f, "({inner})?"),
                _ => write!(f, "{inner}?"),
            },
            Self::List(elem) => write!(f, "list<{elem}>"),
            Self::Set(elem) => write!(f, "set<{elem}>"),
            Self::Map(key, value) => write!(f, "map<{key},{value}>"),
            Self::Range => write!(f, "range"),
            Self::Virtual(inner) => write!(f, "virtual<{inner}>"),
            Self::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match &field.name {
                        Some(name) => write!(f, "{name}:{}", field.ty)?,
                        None => write!(f, "{}", field.ty)?,
                    }
                }
                write!(f, ")")
            }
            Self::Function { params, result } => {
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")->{result}")
            }
            Self::Entity(name) | Self::Enum(name) | Self::Object(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_collapses() {
        let t = ResolvedType::nullable(ResolvedType::Integer);
        assert_eq!(ResolvedType::nullable(t.clone()), t);
        assert_eq!(ResolvedType::nullable(ResolvedType::Null), ResolvedType::Null);
        assert_eq!(ResolvedType::nullable(ResolvedType::Error), ResolvedType::Error);
    }

    #[test]
    fn test_map_element_is_key_value_tuple() {
        let map = ResolvedType::map(ResolvedType::Text, ResolvedType::Integer);
        assert_eq!(map.element_type().map(|t| t.to_string()).as_deref(), Some("(k:text,v:integer)"));
    }
}
