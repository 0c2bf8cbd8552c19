use crate::{
    behavior::{Behavior, Behaviors},
    schema::relation::Relation,
};

/// A table together with its declared relations and behaviors.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    table: String,
    primary_key: String,
    columns: Vec<String>,
    relations: Vec<Relation>,
    behaviors: Behaviors,
}

impl Entity {
    pub fn builder(name: impl Into<String>) -> EntityBuilder {
        let name = name.into();
        EntityBuilder {
            entity: Entity {
                table: name.clone(),
                name,
                primary_key: "id".to_string(),
                columns: Vec::new(),
                relations: Vec::new(),
                behaviors: Behaviors::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Declared columns, or just the primary key when none are declared.
    pub fn columns(&self) -> Vec<&str> {
        if self.columns.is_empty() {
            vec![self.primary_key.as_str()]
        } else {
            self.columns.iter().map(String::as_str).collect()
        }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn behaviors(&self) -> &Behaviors {
        &self.behaviors
    }
}

pub struct EntityBuilder {
    entity: Entity,
}

impl EntityBuilder {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.entity.table = table.into();
        self
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.entity.primary_key = key.into();
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.entity.columns.push(column.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.entity.relations.push(relation);
        self
    }

    pub fn behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.entity.behaviors.push(behavior);
        self
    }

    pub fn behaviors(mut self, behaviors: Behaviors) -> Self {
        self.entity.behaviors = behaviors;
        self
    }

    pub fn build(self) -> Entity {
        self.entity
    }
}
