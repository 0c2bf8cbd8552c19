use crate::{
    behavior::{Behavior, Rewrite},
    error::FilterError,
    rule::{Condition, Resolution, Rule},
};

/// Redirects conditions on a virtual column to a real column path,
/// which may cross relations (`author.name`).
#[derive(Debug, Clone)]
pub struct ColumnRewrite {
    column: String,
    target: String,
}

impl ColumnRewrite {
    pub fn new(column: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            target: target.into(),
        }
    }
}

impl Behavior for ColumnRewrite {
    fn name(&self) -> &'static str {
        "rewrite"
    }

    fn rewrite_condition(
        &self,
        condition: &Condition,
        prefix: &str,
    ) -> Result<Rewrite, FilterError> {
        if self.column == self.target
            || condition.resolution().column_name.as_deref() != Some(self.column.as_str())
        {
            return Ok(Rewrite::Unchanged);
        }

        let mut replacement = condition.clone();
        replacement.set_column(format!("{prefix}{}", self.target));
        replacement.set_resolution(Resolution::default());
        Ok(Rewrite::Replaced(Rule::Condition(replacement)))
    }
}
