//! Sort specifications such as `"title desc, tags.name"`.
//!
//! Parsing is deliberately raw: commas always split, and the direction is
//! whatever follows the last space of a token.

use crate::error::FilterError;
use planner::query::ast::common::OrderDir;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One delimited string or a list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortSpec {
    Single(String),
    Many(Vec<String>),
}

impl From<&str> for SortSpec {
    fn from(spec: &str) -> Self {
        SortSpec::Single(spec.to_string())
    }
}

impl From<String> for SortSpec {
    fn from(spec: String) -> Self {
        SortSpec::Single(spec)
    }
}

impl From<Vec<String>> for SortSpec {
    fn from(specs: Vec<String>) -> Self {
        SortSpec::Many(specs)
    }
}

impl From<Vec<&str>> for SortSpec {
    fn from(specs: Vec<&str>) -> Self {
        SortSpec::Many(specs.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for SortSpec {
    fn from(specs: &[&str]) -> Self {
        SortSpec::Many(specs.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(FilterError::InvalidUsage(format!(
                "unknown sort direction `{other}`"
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

impl From<SortDirection> for OrderDir {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => OrderDir::Asc,
            SortDirection::Desc => OrderDir::Desc,
        }
    }
}

/// Flattens `spec` into trimmed, non-empty tokens, preserving order.
pub fn explode(spec: impl Into<SortSpec>) -> Vec<String> {
    let parts = match spec.into() {
        SortSpec::Single(s) => vec![s],
        SortSpec::Many(many) => many,
    };

    parts
        .iter()
        .flat_map(|part| part.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a token on its last space: `"foo.bar asc"` gives
/// `("foo.bar", Some("asc"))`, `"foo.bar"` gives `("foo.bar", None)`.
pub fn split_column_and_direction(token: &str) -> (String, Option<String>) {
    let token = token.trim();
    match token.rsplit_once(' ') {
        Some((column, direction)) => (column.trim().to_string(), Some(direction.to_string())),
        None => (token.to_string(), None),
    }
}

pub fn create_order_by(spec: impl Into<SortSpec>) -> Vec<(String, Option<String>)> {
    explode(spec)
        .iter()
        .map(|token| split_column_and_direction(token))
        .collect()
}

/// Canonical single-string form of `spec`.
pub fn normalize(spec: impl Into<SortSpec>) -> String {
    create_order_by(spec)
        .into_iter()
        .map(|(column, direction)| match direction {
            Some(direction) => format!("{column} {direction}"),
            None => column,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_column_and_direction() {
        assert_eq!(
            split_column_and_direction("foo.bar asc"),
            ("foo.bar".to_string(), Some("asc".to_string()))
        );
        assert_eq!(
            split_column_and_direction("foo.bar"),
            ("foo.bar".to_string(), None)
        );
    }

    #[test]
    fn test_split_uses_last_space() {
        assert_eq!(
            split_column_and_direction("odd column  desc"),
            ("odd column".to_string(), Some("desc".to_string()))
        );
    }

    #[test]
    fn test_explode_accepts_string_and_list() {
        assert_eq!(
            explode(" a desc, ,b,"),
            vec!["a desc".to_string(), "b".to_string()]
        );
        assert_eq!(
            explode(vec!["a, b asc", "c"]),
            vec!["a".to_string(), "b asc".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_create_order_by_preserves_order() {
        let pairs = create_order_by("title desc, tags.name, id ASC");
        assert_eq!(
            pairs,
            vec![
                ("title".to_string(), Some("desc".to_string())),
                ("tags.name".to_string(), None),
                ("id".to_string(), Some("ASC".to_string())),
            ]
        );
    }

    #[test]
    fn test_normalize_round_trip() {
        let spec = vec!["  title   desc ,", "tags.name", " ,id asc"];
        let normalized = normalize(spec.clone());

        assert_eq!(normalized, "title desc, tags.name, id asc");
        assert_eq!(create_order_by(normalized), create_order_by(spec));
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!(matches!(
            "sideways".parse::<SortDirection>(),
            Err(FilterError::InvalidUsage(_))
        ));
    }
}
