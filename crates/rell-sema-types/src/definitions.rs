//! Entity, enum and object definitions
//!
//! Types refer to definitions by name; [`Definitions`] resolves the name to
//! the definition so entity graphs may reference each other freely.

use crate::ResolvedType;
use indexmap::IndexMap;
use std::sync::Arc;

/// A persisted attribute of an entity or object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: String,
    pub ty: ResolvedType,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, ty: ResolvedType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// SQL column name
    pub fn column(&self) -> &str {
        &self.name
    }
}

/// A persisted entity, stored as one table row per instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    pub name: String,
    pub table: String,
    pub attributes: IndexMap<String, AttributeDef>,
}

impl EntityDef {
    /// Create an entity whose table has the same name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, ty: ResolvedType) -> Self {
        let attr = AttributeDef::new(name, ty);
        self.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.get(name)
    }

    pub fn ty(&self) -> ResolvedType {
        ResolvedType::entity(&self.name)
    }
}

/// An enumeration; values are identified by their ordinal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn ordinal(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    pub fn ty(&self) -> ResolvedType {
        ResolvedType::enumeration(&self.name)
    }
}

/// A singleton object, stored as a one-row table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDef {
    pub name: String,
    pub table: String,
    pub attributes: IndexMap<String, AttributeDef>,
}

impl ObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, ty: ResolvedType) -> Self {
        let attr = AttributeDef::new(name, ty);
        self.attributes.insert(attr.name.clone(), attr);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.get(name)
    }
}

/// Registry of all definitions visible to a compilation unit
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    entities: IndexMap<String, Arc<EntityDef>>,
    enums: IndexMap<String, Arc<EnumDef>>,
    objects: IndexMap<String, Arc<ObjectDef>>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, def: EntityDef) -> &mut Self {
        self.entities.insert(def.name.clone(), Arc::new(def));
        self
    }

    pub fn add_enum(&mut self, def: EnumDef) -> &mut Self {
        self.enums.insert(def.name.clone(), Arc::new(def));
        self
    }

    pub fn add_object(&mut self, def: ObjectDef) -> &mut Self {
        self.objects.insert(def.name.clone(), Arc::new(def));
        self
    }

    pub fn entity(&self, name: &str) -> Option<&Arc<EntityDef>> {
        self.entities.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Arc<EnumDef>> {
        self.enums.get(name)
    }

    pub fn object(&self, name: &str) -> Option<&Arc<ObjectDef>> {
        self.objects.get(name)
    }

    /// Resolve a definition type name to its type
    pub fn type_of(&self, name: &str) -> Option<ResolvedType> {
        if self.entities.contains_key(name) {
            Some(ResolvedType::entity(name))
        } else if self.enums.contains_key(name) {
            Some(ResolvedType::enumeration(name))
        } else if self.objects.contains_key(name) {
            Some(ResolvedType::object(name))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entities_may_reference_each_other() {
        let mut defs = Definitions::new();
        defs.add_entity(EntityDef::new("user").with_attribute("company", ResolvedType::entity("company")))
            .add_entity(EntityDef::new("company").with_attribute("owner", ResolvedType::entity("user")));

        let user = defs.entity("user").unwrap();
        assert_eq!(user.attribute("company").unwrap().ty, ResolvedType::entity("company"));
        assert_eq!(defs.type_of("company"), Some(ResolvedType::entity("company")));
        assert_eq!(defs.type_of("missing"), None);
    }

    #[test]
    fn test_enum_ordinals() {
        let def = EnumDef::new("color", &["red", "green"]);
        assert_eq!(def.ordinal("green"), Some(1));
        assert_eq!(def.ordinal("blue"), None);
    }
}
