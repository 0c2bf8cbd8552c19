use crate::{error::FilterError, sort::SortDirection};
use planner::query::dialect::{Dialect, MySql, Postgres};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    #[default]
    Postgres,
    MySql,
}

/// Settings shared by every query compiled with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub dialect: DialectKind,
    /// Direction of sort columns given without one.
    pub default_sort_direction: SortDirection,
    /// Prepended to every alias inside a correlated subquery so it never
    /// shadows an alias of the outer query.
    pub subquery_alias_prefix: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Postgres,
            default_sort_direction: SortDirection::Asc,
            subquery_alias_prefix: "sub_".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn dialect(&self) -> Box<dyn Dialect> {
        match self.dialect {
            DialectKind::Postgres => Box::new(Postgres),
            DialectKind::MySql => Box::new(MySql),
        }
    }
}
