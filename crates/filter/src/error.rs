use crate::rule::RuleId;
use thiserror::Error;

/// All errors raised while building, resolving or assembling a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A value shape the operator cannot express, e.g. an array under `>`.
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// A dotted path names a relation the entity does not declare.
    #[error("Cannot resolve relation `{hop}` in path `{path}`")]
    UnresolvableRelation { path: String, hop: String },

    /// A relation or query targets an entity missing from the schema.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// A chain operation referenced a node that is not one of its children.
    #[error("Rule {0} is not a child of this chain")]
    NotFound(RuleId),

    /// A rule variant reached code that has no handling for it.
    #[error("Unsupported rule type: {0}")]
    UnsupportedRuleType(String),

    /// A behavior could not convert a value to or from its stored form.
    #[error("Cannot convert value for `{property}`: {reason}")]
    ValueConversion { property: String, reason: String },

    /// The query-string filter syntax is malformed.
    #[error("Parse error at {position}: {message}")]
    Parse { position: usize, message: String },

    /// Schema or compiler configuration could not be deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
