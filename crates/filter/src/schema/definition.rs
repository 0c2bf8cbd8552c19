//! Serializable schema description, e.g. loaded from a JSON file.

use crate::{
    behavior::{Behaviors, BoolCast, ColumnRewrite, MillisecondTimestamp},
    schema::{
        entity::Entity,
        relation::{Junction, Relation, RelationKind},
    },
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub entities: Vec<EntityDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    #[serde(default)]
    pub candidate_key: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub through: Option<Junction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BehaviorDefinition {
    BoolCast { properties: Vec<String> },
    MillisecondTimestamp { properties: Vec<String> },
    Rewrite { column: String, target: String },
}

impl From<RelationDefinition> for Relation {
    fn from(def: RelationDefinition) -> Self {
        Relation {
            name: def.name,
            target: def.target,
            kind: def.kind,
            candidate_key: def.candidate_key,
            foreign_key: def.foreign_key,
            through: def.through,
        }
    }
}

impl From<EntityDefinition> for Entity {
    fn from(def: EntityDefinition) -> Self {
        let mut behaviors = Behaviors::new();
        for behavior in def.behaviors {
            match behavior {
                BehaviorDefinition::BoolCast { properties } => {
                    behaviors.push(BoolCast::new(properties))
                }
                BehaviorDefinition::MillisecondTimestamp { properties } => {
                    behaviors.push(MillisecondTimestamp::new(properties))
                }
                BehaviorDefinition::Rewrite { column, target } => {
                    behaviors.push(ColumnRewrite::new(column, target))
                }
            }
        }

        let mut builder = Entity::builder(def.name)
            .columns(def.columns)
            .behaviors(behaviors);
        if let Some(table) = def.table {
            builder = builder.table(table);
        }
        if let Some(primary_key) = def.primary_key {
            builder = builder.primary_key(primary_key);
        }
        for relation in def.relations {
            builder = builder.relation(relation.into());
        }
        builder.build()
    }
}
