//! Value and condition hooks attached to an entity.
//!
//! A behavior can convert property values between their domain and stored
//! forms, and can replace a whole condition during resolution. Entities
//! run their behaviors in declaration order.

use crate::{
    error::FilterError,
    rule::{Condition, Rule},
};
use model::core::value::Value;
use std::{collections::HashSet, fmt::Debug, sync::Arc};
use tracing::debug;

pub mod bool_cast;
pub mod rewrite;
pub mod timestamp;

pub use bool_cast::BoolCast;
pub use rewrite::ColumnRewrite;
pub use timestamp::MillisecondTimestamp;

/// Outcome of [`Behavior::rewrite_condition`].
#[derive(Debug, Clone)]
pub enum Rewrite {
    Unchanged,
    Replaced(Rule),
}

pub trait Behavior: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Stored form to domain form.
    fn retrieve_property(&self, value: Value, _key: &str) -> Result<Value, FilterError> {
        Ok(value)
    }

    /// Domain form to stored form.
    fn persist_property(&self, value: Value, _key: &str) -> Result<Value, FilterError> {
        Ok(value)
    }

    /// `prefix` is the relation path of the entity owning `condition`
    /// followed by a dot, e.g. `post.author.`.
    fn rewrite_condition(
        &self,
        _condition: &Condition,
        _prefix: &str,
    ) -> Result<Rewrite, FilterError> {
        Ok(Rewrite::Unchanged)
    }
}

/// The set of property names a value transform applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(HashSet<String>);

impl Properties {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Applies `convert` to `value`, or to each item of an array value.
    pub(crate) fn map<F>(&self, value: Value, key: &str, convert: F) -> Result<Value, FilterError>
    where
        F: Fn(Value) -> Result<Value, FilterError>,
    {
        if !self.contains(key) {
            return Ok(value);
        }
        match value {
            Value::Array(items) => Ok(Value::Array(
                items.into_iter().map(convert).collect::<Result<_, _>>()?,
            )),
            Value::Null => Ok(Value::Null),
            other => convert(other),
        }
    }
}

/// An entity's ordered behavior pipeline.
#[derive(Debug, Clone, Default)]
pub struct Behaviors {
    items: Vec<Arc<dyn Behavior>>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, behavior: impl Behavior + 'static) {
        self.items.push(Arc::new(behavior));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Behavior>> {
        self.items.iter()
    }

    pub fn retrieve_property(&self, value: Value, key: &str) -> Result<Value, FilterError> {
        self.items
            .iter()
            .try_fold(value, |value, behavior| behavior.retrieve_property(value, key))
    }

    pub fn persist_property(&self, value: Value, key: &str) -> Result<Value, FilterError> {
        self.items
            .iter()
            .try_fold(value, |value, behavior| behavior.persist_property(value, key))
    }

    /// Runs every behavior's rewrite hook. A replacement condition is handed
    /// to the remaining behaviors; any other replacement ends the pipeline.
    pub fn rewrite_condition(
        &self,
        condition: &Condition,
        prefix: &str,
    ) -> Result<Rewrite, FilterError> {
        let mut current: Option<Rule> = None;

        for behavior in &self.items {
            let subject = match &current {
                None => condition,
                Some(Rule::Condition(replacement)) => replacement,
                Some(_) => break,
            };

            if let Rewrite::Replaced(rule) = behavior.rewrite_condition(subject, prefix)? {
                debug!(
                    "Behavior `{}` rewrote condition on `{}`",
                    behavior.name(),
                    subject.column()
                );
                current = Some(rule);
            }
        }

        Ok(match current {
            Some(rule) => Rewrite::Replaced(rule),
            None => Rewrite::Unchanged,
        })
    }
}
