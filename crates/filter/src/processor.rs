//! Decides, per relation path, whether a filtered relation is joined or
//! answered through a correlated subquery, and rewrites the tree to match.
//!
//! Filtering a to-many relation through a join duplicates parent rows and
//! cannot express "no related row matches". Conditions on such relations
//! are therefore grouped per chain and moved into `EXISTS` / `NOT EXISTS`
//! nodes, unless the relation is selected by the query anyway and a join
//! already answers the condition correctly.

use crate::{
    assemble::{assemble, condition_fragment, Predicate},
    behavior::Rewrite,
    error::FilterError,
    query::Query,
    resolver::Resolver,
    rule::{Chain, ChainKind, Comparison, Condition, Rule, RuleId},
};
use model::core::value::Value;
use planner::query::ast::expr::Expr;
use std::collections::{HashMap, HashSet};
use tracing::debug;

enum Outcome {
    Kept,
    Replaced(Rule),
}

/// Conditions of one chain sharing comparison, relation path and column.
struct Bucket {
    comparison: Comparison,
    relation_path: String,
    column_name: String,
    members: Vec<(RuleId, Condition)>,
}

impl Bucket {
    /// Whether each related row can match at most one member, so that
    /// counting distinct matches equals counting satisfied members.
    fn is_countable(&self) -> bool {
        self.members.iter().all(|(_, condition)| {
            !condition.ignore_case()
                && match condition.value() {
                    Value::String(s) => !s.contains('*'),
                    Value::Array(_) | Value::Null => false,
                    _ => true,
                }
        })
    }

    fn distinct_values(&self) -> usize {
        self.members
            .iter()
            .map(|(_, condition)| condition.value())
            .collect::<HashSet<&Value>>()
            .len()
    }
}

pub struct FilterProcessor<'q, 'a> {
    query: &'q mut Query<'a>,
    resolver: Resolver<'a>,
    base_alias: String,
    /// Relation paths joined for the query's own needs.
    base_joins: HashSet<String>,
    /// Relation paths joined for filtering, with the conditions needing them.
    made_joins: HashMap<String, Vec<RuleId>>,
}

impl<'q, 'a> FilterProcessor<'q, 'a> {
    pub fn new(query: &'q mut Query<'a>) -> Result<Self, FilterError> {
        let resolver = query.resolver();
        let mut base_joins = HashSet::new();
        for path in query.with().iter().cloned().chain(query.sort_paths()?) {
            for hop in resolver.resolve_relations(&path)? {
                base_joins.insert(hop.path);
            }
        }

        Ok(Self {
            base_alias: query.base_alias(),
            query,
            resolver,
            base_joins,
            made_joins: HashMap::new(),
        })
    }

    /// Optimizes `rule` against `query` and assembles the result. A root
    /// that is not a chain is wrapped in an `All` chain first.
    pub fn apply(rule: Rule, query: &mut Query<'a>) -> Result<Option<Predicate>, FilterError> {
        let mut rule = match rule {
            Rule::Chain(chain) => Rule::Chain(chain),
            other => Rule::all([other]),
        };
        Self::resolve_filter(&mut rule, query)?;
        assemble(&rule)
    }

    /// Resolves every condition of `rule` and rewrites it in place.
    pub fn resolve_filter(rule: &mut Rule, query: &mut Query<'a>) -> Result<(), FilterError> {
        let mut processor = FilterProcessor::new(query)?;
        if let Outcome::Replaced(replacement) = processor.process(rule, false)? {
            *rule = replacement;
        }
        Ok(())
    }

    /// `forced` is set below a `None` chain, where a join can never express
    /// the negation and the base-join shortcut does not apply.
    fn process(&mut self, rule: &mut Rule, forced: bool) -> Result<Outcome, FilterError> {
        match rule {
            Rule::Condition(condition) => self.process_condition(condition, forced),
            Rule::Exists(_) => Ok(Outcome::Kept),
            Rule::Chain(chain) => {
                self.process_chain(chain, forced)?;
                Ok(Outcome::Kept)
            }
        }
    }

    fn process_condition(
        &mut self,
        condition: &mut Condition,
        forced: bool,
    ) -> Result<Outcome, FilterError> {
        match self.resolver.resolve_condition(condition)? {
            Rewrite::Replaced(mut replacement) => {
                if let Outcome::Replaced(nested) = self.process(&mut replacement, forced)? {
                    replacement = nested;
                }
                Ok(Outcome::Replaced(replacement))
            }
            Rewrite::Unchanged => {
                let relation_path = condition
                    .resolution()
                    .relation_path
                    .clone()
                    .unwrap_or_else(|| self.base_alias.clone());
                if relation_path != self.base_alias {
                    self.query.utilize(&relation_path);
                    self.made_joins
                        .entry(relation_path)
                        .or_default()
                        .push(condition.id());
                }
                Ok(Outcome::Kept)
            }
        }
    }

    fn process_chain(&mut self, chain: &mut Chain, forced: bool) -> Result<(), FilterError> {
        let forced = forced || chain.kind() == ChainKind::None;

        for index in 0..chain.count() {
            let Some(child) = chain.get_mut(index) else {
                continue;
            };
            let id = child.id();
            if let Outcome::Replaced(replacement) = self.process(child, forced)? {
                chain.replace(id, replacement)?;
            }
        }

        for bucket in self.buckets(chain)? {
            self.convert(chain, bucket, forced)?;
        }
        Ok(())
    }

    /// Groups the chain's direct conditions on to-many relations, in the
    /// order they first appear.
    fn buckets(&self, chain: &Chain) -> Result<Vec<Bucket>, FilterError> {
        let mut buckets: Vec<Bucket> = Vec::new();

        for child in chain {
            let Rule::Condition(condition) = child else {
                continue;
            };
            let resolution = condition.resolution();
            let (Some(relation_path), Some(column_name)) =
                (&resolution.relation_path, &resolution.column_name)
            else {
                continue;
            };
            if *relation_path == self.base_alias || self.resolver.is_to_one(relation_path)? {
                continue;
            }

            let comparison = condition.comparison();
            let member = (condition.id(), condition.clone());
            match buckets.iter_mut().find(|b| {
                b.comparison == comparison
                    && b.relation_path == *relation_path
                    && b.column_name == *column_name
            }) {
                Some(bucket) => bucket.members.push(member),
                None => buckets.push(Bucket {
                    comparison,
                    relation_path: relation_path.clone(),
                    column_name: column_name.clone(),
                    members: vec![member],
                }),
            }
        }

        Ok(buckets)
    }

    fn convert(
        &mut self,
        chain: &mut Chain,
        bucket: Bucket,
        forced: bool,
    ) -> Result<(), FilterError> {
        let count = bucket.members.len();
        let kind = chain.kind();
        let comparison = bucket.comparison;
        let negated = comparison == Comparison::Unequal;

        if !forced
            && !negated
            && self.base_joins.contains(&bucket.relation_path)
            && (count == 1 || kind == ChainKind::Any)
        {
            debug!(
                "Keeping {} condition(s) on `{}` as a join",
                count, bucket.relation_path
            );
            return Ok(());
        }

        let counted = match comparison {
            Comparison::Equal => kind == ChainKind::All && count > 1,
            Comparison::Unequal => kind == ChainKind::Any && count > 1,
            _ => false,
        };

        if counted && !bucket.is_countable() {
            debug!(
                "Splitting {} condition(s) on `{}` into one subquery each",
                count, bucket.relation_path
            );
            let minimum = negated.then_some(1);
            for member in &bucket.members {
                self.move_into_subquery(chain, &bucket, std::slice::from_ref(member), minimum)?;
            }
            return Ok(());
        }

        let minimum = match comparison {
            _ if counted => Some(bucket.distinct_values()),
            Comparison::Unequal => Some(1),
            _ => None,
        };
        self.move_into_subquery(chain, &bucket, &bucket.members, minimum)
    }

    /// Replaces `members` in `chain` with one `EXISTS` (or `NOT EXISTS` for
    /// `Unequal`) node over the bucket's relation, requiring `minimum`
    /// distinct related rows when set.
    fn move_into_subquery(
        &mut self,
        chain: &mut Chain,
        bucket: &Bucket,
        members: &[(RuleId, Condition)],
        minimum: Option<usize>,
    ) -> Result<(), FilterError> {
        let comparison = bucket.comparison;
        let negated = comparison == Comparison::Unequal;

        let target = self.resolver.target(&bucket.relation_path)?;
        let mut sub_query = self.query.create_sub_query(target, &bucket.relation_path)?;
        let column = format!("{}.{}", sub_query.target_alias(), bucket.column_name);

        let fragments = members
            .iter()
            .map(|(_, member)| {
                let mut inner = if negated {
                    member.with_comparison(Comparison::Equal)
                } else {
                    member.clone()
                };
                inner.set_column(column.as_str());
                Ok(condition_fragment(&inner)?.into_expr())
            })
            .collect::<Result<Vec<_>, FilterError>>()?;

        let filter = match comparison {
            Comparison::Equal | Comparison::Unequal => Expr::or(fragments),
            _ if chain.kind() == ChainKind::All => Expr::and(fragments),
            _ => Expr::or(fragments),
        };
        sub_query.filter(Some(filter));

        if let Some(minimum) = minimum {
            sub_query.having_distinct_count(minimum);
        }

        let node = if negated {
            Rule::not_exists(sub_query.build())
        } else {
            Rule::exists(sub_query.build())
        };

        let moved: Vec<RuleId> = members.iter().map(|(id, _)| *id).collect();
        let Some(first) = moved.first() else {
            return Ok(());
        };
        chain.insert_before(*first, node)?;
        for id in &moved {
            chain.remove(*id);
        }

        debug!(
            "Moved {} condition(s) on `{}` into {} subquery",
            moved.len(),
            bucket.relation_path,
            if negated { "NOT EXISTS" } else { "EXISTS" }
        );

        self.retract(&moved);
        Ok(())
    }

    /// Drops joins that only existed for conditions in `moved`.
    fn retract(&mut self, moved: &[RuleId]) {
        let mut emptied = Vec::new();
        for (path, ids) in self.made_joins.iter_mut() {
            let before = ids.len();
            ids.retain(|id| !moved.contains(id));
            if before > 0 && ids.is_empty() {
                emptied.push(path.clone());
            }
        }

        for path in emptied {
            if self.base_joins.contains(&path) {
                continue;
            }
            debug!("Retracting join on `{}`", path);
            self.query.omit(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FilterProcessor;
    use crate::{
        query::Query,
        rule::{Comparison, Condition, Rule},
        test_support::blog_schema,
    };
    use model::core::value::Value;
    use planner::query::dialect::Postgres;
    use tracing_test::traced_test;

    fn compile(query: &mut Query<'_>, rule: Rule) -> String {
        FilterProcessor::apply(rule, query)
            .unwrap()
            .unwrap()
            .to_sql(&Postgres)
            .0
    }

    #[test]
    fn test_any_array_equal_becomes_single_exists() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let sql = compile(&mut query, Rule::any([Rule::equal("tags.name", vec!["a", "b"])]));

        assert_eq!(
            sql,
            concat!(
                r#"EXISTS (SELECT 1 FROM "post_tag" AS "sub_post_tags_post_tag" "#,
                r#"INNER JOIN "tag" AS "sub_post_tags" ON ("sub_post_tags"."id" = "sub_post_tags_post_tag"."tag_id") "#,
                r#"WHERE ("sub_post_tags"."name" IN ($1, $2) AND ("sub_post_tags_post_tag"."post_id" = "post"."id")))"#
            )
        );
        assert!(query.utilized().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_all_unequal_becomes_not_exists_with_having_one() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let sql = compile(
            &mut query,
            Rule::all([Rule::unequal("tags.name", "a"), Rule::unequal("tags.name", "b")]),
        );

        assert_eq!(sql.matches("NOT EXISTS").count(), 1);
        assert!(sql.contains(
            r#"WHERE ((("sub_post_tags"."name" = $1) OR ("sub_post_tags"."name" = $2))"#
        ));
        assert!(sql.contains(r#"HAVING (COUNT(DISTINCT "sub_post_tags"."id") >= $3)"#));
        assert!(logs_contain("into NOT EXISTS subquery"));
    }

    #[test]
    #[traced_test]
    fn test_wildcards_under_all_get_one_exists_each() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let rule = Rule::all([Rule::equal("tags.name", "a*"), Rule::equal("tags.name", "b*")]);
        let (sql, params) = FilterProcessor::apply(rule, &mut query)
            .unwrap()
            .unwrap()
            .to_sql(&Postgres);

        assert!(sql.starts_with("(EXISTS (SELECT 1"));
        assert_eq!(sql.matches("EXISTS (").count(), 2);
        assert_eq!(sql.matches(" LIKE ").count(), 2);
        assert!(!sql.contains("HAVING"));
        assert_eq!(params, vec![Value::from("a%"), Value::from("b%")]);
        assert!(logs_contain("into one subquery each"));
    }

    #[test]
    fn test_array_member_under_all_is_not_counted() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let sql = compile(
            &mut query,
            Rule::all([
                Rule::equal("tags.name", vec!["a", "b"]),
                Rule::equal("tags.name", "c"),
            ]),
        );

        assert_eq!(sql.matches("EXISTS (").count(), 2);
        assert!(sql.contains(r#""sub_post_tags"."name" IN ($1, $2)"#));
        assert!(sql.contains(r#"("sub_post_tags"."name" = $3)"#));
        assert!(!sql.contains("HAVING"));
    }

    #[test]
    fn test_case_insensitive_unequal_under_any_is_not_counted() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let rule = Rule::any([
            Rule::from(Condition::new(Comparison::Unequal, "tags.name", "A").ignoring_case()),
            Rule::from(Condition::new(Comparison::Unequal, "tags.name", "a").ignoring_case()),
        ]);
        let (sql, params) = FilterProcessor::apply(rule, &mut query)
            .unwrap()
            .unwrap()
            .to_sql(&Postgres);

        assert_eq!(sql.matches("NOT EXISTS (").count(), 2);
        assert!(sql.contains(") OR NOT EXISTS ("));
        assert!(params.iter().all(|p| p != &Value::Int(2)));
    }

    #[test]
    fn test_plain_scalars_under_all_share_one_counted_exists() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let (sql, params) = FilterProcessor::apply(
            Rule::all([Rule::equal("tags.name", "a"), Rule::equal("tags.name", "b")]),
            &mut query,
        )
        .unwrap()
        .unwrap()
        .to_sql(&Postgres);

        assert_eq!(sql.matches("EXISTS (").count(), 1);
        assert_eq!(params.last(), Some(&Value::Int(2)));
    }

    #[test]
    fn test_base_condition_is_never_bucketed() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let sql = compile(
            &mut query,
            Rule::none([Rule::unequal("title", "a"), Rule::equal("post.id", 1i64)]),
        );

        assert!(!sql.contains("EXISTS"));
        assert!(query.utilized().is_empty());
    }

    #[test]
    fn test_to_one_relation_is_joined() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let sql = compile(&mut query, Rule::all([Rule::unequal("author.name", "x")]));

        assert_eq!(
            sql,
            r#"(("post_author"."name" <> $1) OR "post_author"."name" IS NULL)"#
        );
        assert_eq!(query.utilized(), &["post.author".to_string()]);
    }

    #[test]
    #[traced_test]
    fn test_base_join_keeps_single_equal_as_join() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();
        query.with_relation("tags").unwrap();

        let sql = compile(&mut query, Rule::all([Rule::equal("tags.name", "a")]));

        assert_eq!(sql, r#"("post_tags"."name" = $1)"#);
        assert!(logs_contain("as a join"));
    }

    #[test]
    fn test_base_join_unequal_still_uses_subquery() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();
        query.with_relation("tags").unwrap();

        let sql = compile(&mut query, Rule::all([Rule::unequal("tags.name", "a")]));
        assert!(sql.starts_with("NOT EXISTS"));
    }

    #[test]
    fn test_none_chain_forces_subquery_for_base_join() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();
        query.with_relation("tags").unwrap();

        let sql = compile(&mut query, Rule::none([Rule::equal("tags.name", "a")]));
        assert!(sql.starts_with("NOT (EXISTS (SELECT 1"));
        assert!(!sql.contains("HAVING"));
    }

    #[test]
    #[traced_test]
    fn test_rewrite_behavior_replaces_condition() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let sql = compile(&mut query, Rule::equal("writer", "ann"));

        assert_eq!(sql, r#"("post_author"."name" = $1)"#);
        assert_eq!(query.utilized(), &["post.author".to_string()]);
        assert!(logs_contain("was rewritten"));
    }

    #[test]
    fn test_only_joins_of_moved_conditions_are_retracted() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let rule = Rule::all([
            Rule::equal("tags.name", "a"),
            Rule::from(Condition::new(Comparison::Equal, "author.name", "ann").ignoring_case()),
            Rule::greater_than("comments.id", 3i64),
        ]);
        let sql = compile(&mut query, rule);

        assert_eq!(sql.matches("EXISTS (").count(), 2);
        assert!(sql.contains(r#"(LOWER("post_author"."name") = $"#));
        assert_eq!(query.utilized(), &["post.author".to_string()]);
    }

    #[test]
    fn test_rule_ids_are_replaced_in_tree() {
        let schema = blog_schema();
        let mut query = Query::new(&schema, "post").unwrap();

        let first = Rule::equal("tags.name", "a");
        let first_id = first.id();
        let mut rule = Rule::all([first, Rule::equal("title", "t")]);
        FilterProcessor::resolve_filter(&mut rule, &mut query).unwrap();

        let chain = rule.as_chain().unwrap();
        assert!(!chain.has(first_id));
        assert!(chain.children()[0].as_exists().is_some());
        assert_eq!(chain.count(), 2);
    }
}
