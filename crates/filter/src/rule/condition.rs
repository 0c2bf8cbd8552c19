use crate::rule::RuleId;
use model::core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    Unequal,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparison {
    /// Unequal is the only comparison that also matches rows without a
    /// related value, which is why it is rewritten into `NOT EXISTS`.
    pub fn is_negated(self) -> bool {
        matches!(self, Comparison::Unequal)
    }

    pub fn accepts_array(self) -> bool {
        matches!(self, Comparison::Equal | Comparison::Unequal)
    }
}

/// Where a condition's column was found in the relation graph.
///
/// Set by the resolver and overwritten on every re-resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Fully qualified dotted path, rooted at the base entity alias.
    pub column_path: Option<String>,
    /// The column name relative to the entity that owns it.
    pub column_name: Option<String>,
    /// The relation path owning the column, e.g. `post.tags`.
    pub relation_path: Option<String>,
}

#[derive(Debug)]
pub struct Condition {
    id: RuleId,
    comparison: Comparison,
    column: String,
    value: Value,
    ignore_case: bool,
    resolution: Resolution,
}

impl Condition {
    pub fn new(comparison: Comparison, column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: RuleId::next(),
            comparison,
            column: column.into(),
            value: value.into(),
            ignore_case: false,
            resolution: Resolution::default(),
        }
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn set_column(&mut self, column: impl Into<String>) {
        self.column = column.into();
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into();
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn set_ignore_case(&mut self, ignore_case: bool) {
        self.ignore_case = ignore_case;
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    /// A new node comparing the same column and value with `comparison`.
    pub fn with_comparison(&self, comparison: Comparison) -> Condition {
        Condition {
            comparison,
            ..self.clone()
        }
    }
}

impl Clone for Condition {
    fn clone(&self) -> Self {
        Self {
            id: RuleId::next(),
            comparison: self.comparison,
            column: self.column.clone(),
            value: self.value.clone(),
            ignore_case: self.ignore_case,
            resolution: self.resolution.clone(),
        }
    }
}
