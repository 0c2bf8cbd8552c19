//! The filter expression tree.
//!
//! Nodes are identified by a [`RuleId`] handed out at construction time.
//! Chain operations look children up by id, so two structurally equal
//! conditions are still distinct nodes, and a clone is a new node.

use model::core::value::Value;
use planner::query::ast::select::Select;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

pub mod chain;
pub mod condition;

pub use chain::{Chain, ChainKind};
pub use condition::{Comparison, Condition, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u64);

impl RuleId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RuleId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    Condition(Condition),
    Exists(Exists),
    Chain(Chain),
}

impl Rule {
    pub fn id(&self) -> RuleId {
        match self {
            Rule::Condition(condition) => condition.id(),
            Rule::Exists(exists) => exists.id(),
            Rule::Chain(chain) => chain.id(),
        }
    }

    pub fn all(children: impl IntoIterator<Item = Rule>) -> Self {
        Rule::Chain(Chain::new(ChainKind::All).with(children))
    }

    pub fn any(children: impl IntoIterator<Item = Rule>) -> Self {
        Rule::Chain(Chain::new(ChainKind::Any).with(children))
    }

    pub fn none(children: impl IntoIterator<Item = Rule>) -> Self {
        Rule::Chain(Chain::new(ChainKind::None).with(children))
    }

    pub fn equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::Condition(Condition::new(Comparison::Equal, column, value))
    }

    pub fn unequal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::Condition(Condition::new(Comparison::Unequal, column, value))
    }

    pub fn greater_than(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::Condition(Condition::new(Comparison::GreaterThan, column, value))
    }

    pub fn greater_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::Condition(Condition::new(
            Comparison::GreaterThanOrEqual,
            column,
            value,
        ))
    }

    pub fn less_than(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::Condition(Condition::new(Comparison::LessThan, column, value))
    }

    pub fn less_than_or_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Rule::Condition(Condition::new(Comparison::LessThanOrEqual, column, value))
    }

    pub fn exists(query: Select) -> Self {
        Rule::Exists(Exists::new(query))
    }

    pub fn not_exists(query: Select) -> Self {
        Rule::Exists(Exists::negated(query))
    }

    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Rule::Condition(condition) => Some(condition),
            _ => None,
        }
    }

    pub fn as_chain(&self) -> Option<&Chain> {
        match self {
            Rule::Chain(chain) => Some(chain),
            _ => None,
        }
    }

    pub fn as_chain_mut(&mut self) -> Option<&mut Chain> {
        match self {
            Rule::Chain(chain) => Some(chain),
            _ => None,
        }
    }

    pub fn as_exists(&self) -> Option<&Exists> {
        match self {
            Rule::Exists(exists) => Some(exists),
            _ => None,
        }
    }
}

impl From<Condition> for Rule {
    fn from(condition: Condition) -> Self {
        Rule::Condition(condition)
    }
}

impl From<Chain> for Rule {
    fn from(chain: Chain) -> Self {
        Rule::Chain(chain)
    }
}

impl From<Exists> for Rule {
    fn from(exists: Exists) -> Self {
        Rule::Exists(exists)
    }
}

/// `EXISTS (subquery)` or, when negated, `NOT EXISTS (subquery)`.
#[derive(Debug)]
pub struct Exists {
    id: RuleId,
    negated: bool,
    query: Select,
}

impl Exists {
    pub fn new(query: Select) -> Self {
        Self {
            id: RuleId::next(),
            negated: false,
            query,
        }
    }

    pub fn negated(query: Select) -> Self {
        Self {
            negated: true,
            ..Self::new(query)
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn query(&self) -> &Select {
        &self.query
    }
}

impl Clone for Exists {
    fn clone(&self) -> Self {
        Self {
            id: RuleId::next(),
            negated: self.negated,
            query: self.query.clone(),
        }
    }
}
