//! The query container a filter is applied to.
//!
//! A [`Query`] owns everything compiled for one statement: the explicitly
//! selected relations, the joins requested while filtering, the filter tree
//! and the ordering. [`SubQuery`] is the correlated `SELECT 1 ...` built for
//! conditions that must not be answered through a join.

use crate::{
    config::CompilerConfig,
    error::FilterError,
    processor::FilterProcessor,
    resolver::{AliasProvider, DefaultAliases, Hop, Resolver},
    rule::{ChainKind, Rule},
    schema::{Entity, JoinKeys, SchemaProvider},
    sort::{create_order_by, SortDirection, SortSpec},
};
use model::core::value::Value;
use planner::{
    query::{
        ast::{
            common::{JoinKind, OrderDir},
            expr::{BinaryOperator, Expr, FunctionCall},
            select::Select,
        },
        builder::select::{FromState, SelectBuilder},
        qualified,
        renderer::to_sql,
        value,
    },
    table_ref,
};
use std::sync::Arc;
use tracing::debug;

pub struct Query<'a> {
    schema: &'a dyn SchemaProvider,
    base: &'a Entity,
    aliases: Arc<dyn AliasProvider>,
    config: CompilerConfig,
    with: Vec<String>,
    utilized: Vec<String>,
    filter: Option<Rule>,
    order_by: Vec<(String, Option<String>)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<'a> Query<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, entity: &str) -> Result<Self, FilterError> {
        Ok(Self {
            schema,
            base: schema.require(entity)?,
            aliases: Arc::new(DefaultAliases),
            config: CompilerConfig::default(),
            with: Vec::new(),
            utilized: Vec::new(),
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        })
    }

    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_aliases(mut self, aliases: Arc<dyn AliasProvider>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn base(&self) -> &'a Entity {
        self.base
    }

    pub fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.schema, self.base, Arc::clone(&self.aliases))
    }

    pub fn base_alias(&self) -> String {
        self.aliases.base_alias(self.base)
    }

    /// Selects a relation alongside the base entity. Its columns are
    /// projected and it counts as a base join while filtering.
    pub fn with_relation(&mut self, path: &str) -> Result<&mut Self, FilterError> {
        let resolver = self.resolver();
        let path = resolver.qualify_path(path);
        if resolver.resolve_relations(&path)?.is_empty() {
            return Err(FilterError::InvalidUsage(format!(
                "`{path}` does not name a relation"
            )));
        }
        if !self.with.contains(&path) {
            self.with.push(path);
        }
        Ok(self)
    }

    /// ANDs `rule` onto the current filter.
    pub fn filter(&mut self, rule: Rule) -> &mut Self {
        self.filter = Some(match self.filter.take() {
            None => rule,
            Some(Rule::Chain(mut chain)) if chain.kind() == ChainKind::All => {
                chain.add(rule);
                Rule::Chain(chain)
            }
            Some(existing) => Rule::all([existing, rule]),
        });
        self
    }

    pub fn order_by(&mut self, spec: impl Into<SortSpec>) -> &mut Self {
        self.order_by.extend(create_order_by(spec));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Requests a join on `relation_path` for filtering.
    pub fn utilize(&mut self, relation_path: &str) {
        if !self.utilized.iter().any(|p| p == relation_path) {
            debug!("Utilizing join on `{}`", relation_path);
            self.utilized.push(relation_path.to_string());
        }
    }

    /// Retracts a join requested through [`Query::utilize`].
    pub fn omit(&mut self, relation_path: &str) {
        self.utilized.retain(|p| p != relation_path);
    }

    /// Relations selected explicitly, as qualified relation paths.
    pub fn with(&self) -> &[String] {
        &self.with
    }

    pub fn utilized(&self) -> &[String] {
        &self.utilized
    }

    /// Relation paths the ordering needs joined.
    pub fn sort_paths(&self) -> Result<Vec<String>, FilterError> {
        let resolver = self.resolver();
        let base_alias = self.base_alias();
        let mut paths = Vec::new();
        for (column, _) in &self.order_by {
            let (path, _) = resolver.qualify_column(column)?;
            if path != base_alias && !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// Builds the correlated subquery reaching `target` through
    /// `relation_path`, correlated with the base alias of this query.
    pub fn create_sub_query(
        &self,
        target: &Entity,
        relation_path: &str,
    ) -> Result<SubQuery, FilterError> {
        let hops = self.resolver().resolve_relations(relation_path)?;
        let Some(last) = hops.last() else {
            return Err(FilterError::InvalidUsage(format!(
                "`{relation_path}` does not name a relation"
            )));
        };
        if last.target.name() != target.name() {
            return Err(FilterError::InvalidUsage(format!(
                "`{relation_path}` leads to `{}`, not `{}`",
                last.target.name(),
                target.name()
            )));
        }

        let prefix = &self.config.subquery_alias_prefix;
        let base_alias = self.base_alias();
        let first = &hops[0];
        let first_alias = format!("{prefix}{}", first.alias);

        let (builder, correlation, group_key) =
            match first.relation.join_keys(first.source, first.target) {
                JoinKeys::Direct {
                    source_column,
                    target_column,
                } => (
                    SelectBuilder::new()
                        .select(vec![Expr::Literal("1".to_string())])
                        .from(table_ref!(first.target.table()), Some(first_alias.as_str())),
                    Expr::binary(
                        qualified(&first_alias, &target_column),
                        BinaryOperator::Eq,
                        qualified(&base_alias, &source_column),
                    ),
                    qualified(&first_alias, &target_column),
                ),
                JoinKeys::Junction {
                    table,
                    source_column,
                    junction_source,
                    junction_target,
                    target_column,
                } => {
                    let junction_alias = format!("{first_alias}_{table}");
                    (
                        SelectBuilder::new()
                            .select(vec![Expr::Literal("1".to_string())])
                            .from(table_ref!(table), Some(junction_alias.as_str()))
                            .join(
                                JoinKind::Inner,
                                table_ref!(first.target.table()),
                                Some(first_alias.as_str()),
                                Expr::binary(
                                    qualified(&first_alias, &target_column),
                                    BinaryOperator::Eq,
                                    qualified(&junction_alias, &junction_target),
                                ),
                            ),
                        Expr::binary(
                            qualified(&junction_alias, &junction_source),
                            BinaryOperator::Eq,
                            qualified(&base_alias, &source_column),
                        ),
                        qualified(&junction_alias, &junction_source),
                    )
                }
            };

        let mut builder = builder;
        let mut source_alias = first_alias;
        for hop in &hops[1..] {
            let alias = format!("{prefix}{}", hop.alias);
            builder = join_hop(builder, JoinKind::Inner, hop, &source_alias, &alias);
            source_alias = alias;
        }

        Ok(SubQuery {
            builder,
            target_key: qualified(&source_alias, target.primary_key()),
            target_alias: source_alias,
            correlation,
            group_key,
            filter: None,
            having: None,
        })
    }

    /// Runs the filter through [`FilterProcessor`] and builds the statement.
    pub fn assemble(mut self) -> Result<Select, FilterError> {
        let where_clause = match self.filter.take() {
            Some(rule) => FilterProcessor::apply(rule, &mut self)?.map(|p| p.into_expr()),
            None => None,
        };

        let resolver = self.resolver();
        let base_alias = self.base_alias();
        let base = self.base;

        let mut columns: Vec<Expr> = base
            .columns()
            .into_iter()
            .map(|column| qualified(&base_alias, column))
            .collect();
        for path in &self.with {
            let target = resolver.target(path)?;
            let alias = resolver.alias(path);
            let label = path
                .strip_prefix(&format!("{base_alias}."))
                .unwrap_or(path);
            for column in target.columns() {
                columns.push(Expr::Alias {
                    expr: Box::new(qualified(&alias, column)),
                    alias: format!("{label}.{column}"),
                });
            }
        }

        let from_alias = (base_alias != base.table()).then_some(base_alias.as_str());
        let mut builder = SelectBuilder::new()
            .select(columns)
            .from(table_ref!(base.table()), from_alias);

        let mut joined: Vec<String> = Vec::new();
        let paths = self
            .with
            .iter()
            .cloned()
            .chain(self.sort_paths()?)
            .chain(self.utilized.iter().cloned());
        for path in paths {
            let mut source_alias = base_alias.clone();
            for hop in resolver.resolve_relations(&path)? {
                if !joined.contains(&hop.path) {
                    builder = join_hop(builder, JoinKind::Left, &hop, &source_alias, &hop.alias);
                    joined.push(hop.path.clone());
                }
                source_alias = hop.alias;
            }
        }

        if let Some(where_clause) = where_clause {
            builder = builder.where_clause(where_clause);
        }

        for (column, direction) in &self.order_by {
            let (_, qualified_column) = resolver.qualify_column(column)?;
            let direction = match direction {
                Some(direction) => direction.parse::<SortDirection>()?,
                None => self.config.default_sort_direction,
            };
            let (alias, name) = qualified_column
                .rsplit_once('.')
                .unwrap_or((base_alias.as_str(), qualified_column.as_str()));
            builder = builder.order_by(qualified(alias, name), Some(OrderDir::from(direction)));
        }

        if let Some(limit) = self.limit {
            builder = builder.limit(value(Value::Uint(limit)));
        }
        if let Some(offset) = self.offset {
            builder = builder.offset(value(Value::Uint(offset)));
        }

        Ok(builder.build())
    }

    /// Assembles and renders with the configured dialect.
    pub fn to_sql(self) -> Result<(String, Vec<Value>), FilterError> {
        let dialect = self.config.dialect();
        let select = self.assemble()?;
        Ok(to_sql(&select, dialect.as_ref()))
    }
}

/// Adds the joins reaching `hop` from `source_alias`, naming the target
/// `alias`. Junction tables are aliased `{alias}_{table}`.
fn join_hop(
    builder: SelectBuilder<FromState>,
    kind: JoinKind,
    hop: &Hop<'_>,
    source_alias: &str,
    alias: &str,
) -> SelectBuilder<FromState> {
    match hop.relation.join_keys(hop.source, hop.target) {
        JoinKeys::Direct {
            source_column,
            target_column,
        } => builder.join(
            kind,
            table_ref!(hop.target.table()),
            Some(alias),
            Expr::binary(
                qualified(alias, &target_column),
                BinaryOperator::Eq,
                qualified(source_alias, &source_column),
            ),
        ),
        JoinKeys::Junction {
            table,
            source_column,
            junction_source,
            junction_target,
            target_column,
        } => {
            let junction_alias = format!("{alias}_{table}");
            builder
                .join(
                    kind.clone(),
                    table_ref!(table),
                    Some(junction_alias.as_str()),
                    Expr::binary(
                        qualified(&junction_alias, &junction_source),
                        BinaryOperator::Eq,
                        qualified(source_alias, &source_column),
                    ),
                )
                .join(
                    kind,
                    table_ref!(hop.target.table()),
                    Some(alias),
                    Expr::binary(
                        qualified(alias, &target_column),
                        BinaryOperator::Eq,
                        qualified(&junction_alias, &junction_target),
                    ),
                )
        }
    }
}

/// A correlated `SELECT 1` over a relation of the outer query.
#[derive(Debug, Clone)]
pub struct SubQuery {
    builder: SelectBuilder<FromState>,
    target_alias: String,
    target_key: Expr,
    correlation: Expr,
    group_key: Expr,
    filter: Option<Expr>,
    having: Option<Expr>,
}

impl SubQuery {
    /// Alias of the relation's target entity inside the subquery.
    pub fn target_alias(&self) -> &str {
        &self.target_alias
    }

    pub fn filter(&mut self, filter: Option<Expr>) -> &mut Self {
        self.filter = filter;
        self
    }

    /// Requires at least `n` distinct related rows per outer row.
    pub fn having_distinct_count(&mut self, n: usize) -> &mut Self {
        let count = Expr::FunctionCall(FunctionCall {
            name: "COUNT".to_string(),
            args: vec![self.target_key.clone()],
            wildcard: false,
            distinct: true,
        });
        self.having = Some(Expr::binary(
            count,
            BinaryOperator::GtEq,
            value(Value::Int(n as i64)),
        ));
        self
    }

    pub fn build(self) -> Select {
        let where_clause = match self.filter {
            Some(filter) => Expr::and(vec![filter, self.correlation]),
            None => self.correlation,
        };

        let mut builder = self.builder.where_clause(where_clause);
        if let Some(having) = self.having {
            builder = builder.group_by(self.group_key).having(having);
        }
        builder.build()
    }
}
