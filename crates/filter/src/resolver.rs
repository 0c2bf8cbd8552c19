//! Qualifies dotted column paths against the schema graph.
//!
//! Paths are rooted at the base entity alias: for a `post` query the
//! column `tags.name` becomes the column path `post.tags.name`, whose
//! relation path is `post.tags` and whose SQL column is `post_tags.name`.

use crate::{
    behavior::Rewrite,
    error::FilterError,
    rule::{Condition, Resolution},
    schema::{Entity, Relation, SchemaProvider},
};
use std::{fmt::Debug, sync::Arc};
use tracing::{debug, trace};

/// Names the table aliases used in generated SQL.
pub trait AliasProvider: Debug + Send + Sync {
    fn base_alias(&self, base: &Entity) -> String;

    /// Alias for the entity reached through `relation_path`.
    fn relation_alias(&self, base: &Entity, relation_path: &str) -> String;
}

/// Base entity aliased by its table name, relations by their path with
/// dots replaced by underscores (`post.tags` → `post_tags`).
#[derive(Debug, Clone, Default)]
pub struct DefaultAliases;

impl AliasProvider for DefaultAliases {
    fn base_alias(&self, base: &Entity) -> String {
        base.table().to_string()
    }

    fn relation_alias(&self, _base: &Entity, relation_path: &str) -> String {
        relation_path.replace('.', "_")
    }
}

/// One step along a relation path.
#[derive(Debug, Clone)]
pub struct Hop<'a> {
    /// Relation path up to and including this hop.
    pub path: String,
    pub relation: &'a Relation,
    pub source: &'a Entity,
    pub target: &'a Entity,
    pub alias: String,
}

pub struct Resolver<'a> {
    schema: &'a dyn SchemaProvider,
    base: &'a Entity,
    aliases: Arc<dyn AliasProvider>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        schema: &'a dyn SchemaProvider,
        base: &'a Entity,
        aliases: Arc<dyn AliasProvider>,
    ) -> Self {
        Self {
            schema,
            base,
            aliases,
        }
    }

    pub fn base(&self) -> &'a Entity {
        self.base
    }

    pub fn base_alias(&self) -> String {
        self.aliases.base_alias(self.base)
    }

    pub fn alias(&self, relation_path: &str) -> String {
        let base_alias = self.base_alias();
        if relation_path == base_alias {
            base_alias
        } else {
            self.aliases.relation_alias(self.base, relation_path)
        }
    }

    /// Prefixes `path` with the base alias unless it already starts with it.
    pub fn qualify_path(&self, path: &str) -> String {
        let base_alias = self.base_alias();
        if path == base_alias || path.starts_with(&format!("{base_alias}.")) {
            path.to_string()
        } else {
            format!("{base_alias}.{path}")
        }
    }

    /// Qualifies a column path. A column without a dot always belongs to
    /// the base entity, even when it is named like the base alias.
    pub fn qualify_column_path(&self, path: &str) -> String {
        if path.contains('.') {
            self.qualify_path(path)
        } else {
            format!("{}.{path}", self.base_alias())
        }
    }

    /// Splits a column path at its last dot into `(relation_path, column)`.
    pub fn split_path(&self, column_path: &str) -> (String, String) {
        match column_path.rsplit_once('.') {
            Some((relation_path, column)) => (relation_path.to_string(), column.to_string()),
            None => (self.base_alias(), column_path.to_string()),
        }
    }

    pub fn resolve_relations(&self, relation_path: &str) -> Result<Vec<Hop<'a>>, FilterError> {
        let qualified = self.qualify_path(relation_path);
        let base_alias = self.base_alias();
        let Some(rest) = qualified.strip_prefix(&format!("{base_alias}.")) else {
            return Ok(Vec::new());
        };

        let mut hops = Vec::new();
        let mut source = self.base;
        let mut path = base_alias;

        for name in rest.split('.') {
            let relation = source
                .relation(name)
                .ok_or_else(|| FilterError::UnresolvableRelation {
                    path: qualified.clone(),
                    hop: name.to_string(),
                })?;
            let target = self.schema.require(&relation.target)?;

            path = format!("{path}.{name}");
            let alias = self.alias(&path);
            trace!(
                "Resolved hop `{}` ({:?}) to `{}` as `{}`",
                path,
                relation.kind,
                target.name(),
                alias
            );

            hops.push(Hop {
                path: path.clone(),
                relation,
                source,
                target,
                alias,
            });
            source = target;
        }

        Ok(hops)
    }

    /// The entity a relation path ends at.
    pub fn target(&self, relation_path: &str) -> Result<&'a Entity, FilterError> {
        Ok(self
            .resolve_relations(relation_path)?
            .last()
            .map_or(self.base, |hop| hop.target))
    }

    /// True when every hop yields at most one row. The base path is to-one.
    pub fn is_to_one(&self, relation_path: &str) -> Result<bool, FilterError> {
        Ok(self
            .resolve_relations(relation_path)?
            .iter()
            .all(|hop| hop.relation.is_to_one()))
    }

    /// Resolves a column path without touching behaviors, returning
    /// `(relation_path, alias.column)`.
    pub fn qualify_column(&self, path: &str) -> Result<(String, String), FilterError> {
        let column_path = self.qualify_column_path(path);
        let (relation_path, column) = self.split_path(&column_path);
        self.resolve_relations(&relation_path)?;
        let alias = self.alias(&relation_path);
        Ok((relation_path, format!("{alias}.{column}")))
    }

    /// Points `condition` at its aliased column, records where it was
    /// found, and runs the owning entities' value transforms and rewrite
    /// hooks. Resolving the same condition twice yields the same result.
    pub fn resolve_condition(&self, condition: &mut Condition) -> Result<Rewrite, FilterError> {
        let column_path = match &condition.resolution().column_path {
            Some(path) => path.clone(),
            None => self.qualify_column_path(condition.column()),
        };
        let (relation_path, _) = self.split_path(&column_path);

        let base_alias = self.base_alias();
        let mut steps = vec![(base_alias.clone(), self.base, base_alias)];
        steps.extend(
            self.resolve_relations(&relation_path)?
                .into_iter()
                .map(|hop| (hop.path, hop.target, hop.alias)),
        );

        for (path, entity, alias) in steps {
            let column_name = column_path
                .strip_prefix(&format!("{path}."))
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    FilterError::InvalidUsage(format!(
                        "`{column_path}` does not name a column under `{path}`"
                    ))
                })?
                .to_string();

            match entity
                .behaviors()
                .persist_property(condition.value().clone(), &column_name)
            {
                Ok(value) => condition.set_value(value),
                Err(e) => debug!("Keeping value of `{}` as given: {}", column_path, e),
            }

            condition.set_column(format!("{alias}.{column_name}"));
            condition.set_resolution(Resolution {
                column_path: Some(column_path.clone()),
                column_name: Some(column_name),
                relation_path: Some(path.clone()),
            });

            let rewrite = entity
                .behaviors()
                .rewrite_condition(condition, &format!("{path}."))?;
            if let Rewrite::Replaced(_) = rewrite {
                debug!("Condition on `{}` was rewritten", column_path);
                return Ok(rewrite);
            }
        }

        debug!(
            "Resolved `{}` to `{}` via `{}`",
            column_path,
            condition.column(),
            relation_path
        );
        Ok(Rewrite::Unchanged)
    }
}
