//! Compiles composable filter expressions into SQL predicates over a
//! schema with declared relations.
//!
//! A filter is a tree of [`rule::Rule`] nodes. [`query::Query`] resolves
//! every column through the relation graph, lets the
//! [`processor::FilterProcessor`] move to-many conditions into correlated
//! `EXISTS` subqueries, and hands the result to [`assemble::assemble`],
//! whose output becomes the `WHERE` clause of a `planner` select.

pub mod assemble;
pub mod behavior;
pub mod config;
pub mod error;
pub mod processor;
pub mod query;
pub mod query_string;
pub mod resolver;
pub mod rule;
pub mod schema;
pub mod sort;

#[cfg(test)]
pub(crate) mod test_support;
