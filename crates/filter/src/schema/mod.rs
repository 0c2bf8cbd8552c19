use crate::error::FilterError;
use std::collections::HashMap;

pub mod definition;
pub mod entity;
pub mod relation;

pub use definition::SchemaDefinition;
pub use entity::{Entity, EntityBuilder};
pub use relation::{JoinKeys, Junction, Relation, RelationKind};

/// Read-only access to entity metadata.
pub trait SchemaProvider: Send + Sync {
    fn entity(&self, name: &str) -> Option<&Entity>;

    fn require(&self, name: &str) -> Result<&Entity, FilterError> {
        self.entity(name)
            .ok_or_else(|| FilterError::UnknownEntity(name.to_string()))
    }
}

/// In-memory schema keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<String, Entity>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: Entity) -> &mut Self {
        self.entities.insert(entity.name().to_string(), entity);
        self
    }

    pub fn with(mut self, entity: Entity) -> Self {
        self.add(entity);
        self
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Loads a [`SchemaDefinition`] and checks that every relation target
    /// is declared.
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        let definition: SchemaDefinition = serde_json::from_str(json)?;
        let schema = definition
            .entities
            .into_iter()
            .fold(Schema::new(), |schema, def| schema.with(def.into()));

        for entity in schema.entities() {
            for relation in entity.relations() {
                schema.require(&relation.target)?;
            }
        }

        Ok(schema)
    }
}

impl SchemaProvider for Schema {
    fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Schema, SchemaProvider};
    use crate::error::FilterError;

    #[test]
    fn test_from_json_resolves_entities() {
        let schema = Schema::from_json(
            r#"{ "entities": [
                { "name": "post", "relations": [
                    { "name": "author", "target": "user", "kind": "belongs_to" }
                ] },
                { "name": "user", "table": "users" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(schema.require("user").unwrap().table(), "users");
        assert!(schema.entity("comment").is_none());
    }

    #[test]
    fn test_from_json_rejects_dangling_target() {
        let err = Schema::from_json(
            r#"{ "entities": [
                { "name": "post", "relations": [
                    { "name": "tags", "target": "tag", "kind": "has_many" }
                ] }
            ] }"#,
        )
        .unwrap_err();

        assert!(matches!(err, FilterError::UnknownEntity(name) if name == "tag"));
    }

    #[test]
    fn test_from_json_reports_syntax_errors() {
        assert!(matches!(
            Schema::from_json("{ not json"),
            Err(FilterError::Config(_))
        ));
    }
}
