use crate::schema::entity::Entity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    HasOne,
    BelongsTo,
    HasMany,
    BelongsToMany,
}

impl RelationKind {
    /// At most one related row per source row.
    pub fn is_to_one(self) -> bool {
        matches!(self, RelationKind::HasOne | RelationKind::BelongsTo)
    }
}

/// The link table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    pub table: String,
    /// Column pointing at the source entity, `{source}_id` by default.
    #[serde(default)]
    pub source_key: Option<String>,
    /// Column pointing at the target entity, `{target}_id` by default.
    #[serde(default)]
    pub target_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    pub candidate_key: Option<String>,
    pub foreign_key: Option<String>,
    pub through: Option<Junction>,
}

/// Join columns of a relation with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinKeys {
    /// `target.target_column = source.source_column`
    Direct {
        source_column: String,
        target_column: String,
    },
    /// `junction.junction_source = source.source_column` and
    /// `target.target_column = junction.junction_target`
    Junction {
        table: String,
        source_column: String,
        junction_source: String,
        junction_target: String,
        target_column: String,
    },
}

impl Relation {
    fn new(name: impl Into<String>, target: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind,
            candidate_key: None,
            foreign_key: None,
            through: None,
        }
    }

    pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationKind::HasOne)
    }

    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationKind::BelongsTo)
    }

    pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationKind::HasMany)
    }

    pub fn belongs_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        junction_table: impl Into<String>,
    ) -> Self {
        Self {
            through: Some(Junction {
                table: junction_table.into(),
                source_key: None,
                target_key: None,
            }),
            ..Self::new(name, target, RelationKind::BelongsToMany)
        }
    }

    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }

    pub fn candidate_key(mut self, key: impl Into<String>) -> Self {
        self.candidate_key = Some(key.into());
        self
    }

    pub fn junction_keys(
        mut self,
        source_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        if let Some(junction) = self.through.as_mut() {
            junction.source_key = Some(source_key.into());
            junction.target_key = Some(target_key.into());
        }
        self
    }

    pub fn is_to_one(&self) -> bool {
        self.kind.is_to_one()
    }

    /// Resolves the join columns between `source` (the declaring entity)
    /// and `target`.
    pub fn join_keys(&self, source: &Entity, target: &Entity) -> JoinKeys {
        match self.kind {
            RelationKind::HasOne | RelationKind::HasMany => JoinKeys::Direct {
                source_column: self
                    .candidate_key
                    .clone()
                    .unwrap_or_else(|| source.primary_key().to_string()),
                target_column: self
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", source.name())),
            },
            RelationKind::BelongsTo => JoinKeys::Direct {
                source_column: self
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", self.name)),
                target_column: self
                    .candidate_key
                    .clone()
                    .unwrap_or_else(|| target.primary_key().to_string()),
            },
            RelationKind::BelongsToMany => {
                let junction = self.through.clone().unwrap_or_else(|| Junction {
                    table: format!("{}_{}", source.name(), target.name()),
                    source_key: None,
                    target_key: None,
                });
                JoinKeys::Junction {
                    source_column: self
                        .candidate_key
                        .clone()
                        .unwrap_or_else(|| source.primary_key().to_string()),
                    junction_source: junction
                        .source_key
                        .unwrap_or_else(|| format!("{}_id", source.name())),
                    junction_target: junction
                        .target_key
                        .unwrap_or_else(|| format!("{}_id", target.name())),
                    target_column: target.primary_key().to_string(),
                    table: junction.table,
                }
            }
        }
    }
}
