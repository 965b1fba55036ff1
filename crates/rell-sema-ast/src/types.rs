//! Type specifiers

/// A type as written in source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpecifier {
    /// Primitive or definition name: `integer`, `text`, `user`, ...
    Named(String),
    /// `T?`
    Nullable(Box<TypeSpecifier>),
    /// `list<T>`
    List(Box<TypeSpecifier>),
    /// `set<T>`
    Set(Box<TypeSpecifier>),
    /// `map<K,V>`
    Map(Box<TypeSpecifier>, Box<TypeSpecifier>),
    /// `(a: integer, text)`
    Tuple(Vec<(Option<String>, TypeSpecifier)>),
}

impl TypeSpecifier {
    /// Create a named type specifier
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn nullable(self) -> Self {
        Self::Nullable(Box::new(self))
    }

    pub fn list(element: TypeSpecifier) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: TypeSpecifier) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map(key: TypeSpecifier, value: TypeSpecifier) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }
}
