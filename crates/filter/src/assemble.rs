//! Turns a rule tree into a dialect-neutral predicate structure.
//!
//! The output keeps the logical shape of the tree (`operator`, operands)
//! while every leaf is already a `planner` expression whose values are
//! bound parameters. Same-operator groups are flattened as they are
//! accumulated, so `All(All(a, b), c)` and `All(a, b, c)` assemble alike.

use crate::{
    error::FilterError,
    rule::{ChainKind, Comparison, Condition, Exists, Rule},
};
use model::core::value::Value;
use planner::query::{
    ast::expr::{BinaryOperator, Expr},
    dialect::Dialect,
    ident, qualified,
    renderer::to_sql,
    value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    All,
    Any,
    /// Every operand negated, the negations AND-combined.
    NotAll,
}

/// A single rendered predicate, e.g. `"post"."id" = $1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    expr: Expr,
}

impl Fragment {
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    /// The `(template, params)` pair for `dialect`.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> (String, Vec<Value>) {
        to_sql(&self.expr, dialect)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Fragment(Fragment),
    Nested(Predicate),
}

impl Operand {
    pub fn into_expr(self) -> Expr {
        match self {
            Operand::Fragment(fragment) => fragment.into_expr(),
            Operand::Nested(predicate) => predicate.into_expr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub operator: Operator,
    pub operands: Vec<Operand>,
}

impl Predicate {
    fn single(fragment: Fragment) -> Self {
        Self {
            operator: Operator::All,
            operands: vec![Operand::Fragment(fragment)],
        }
    }

    /// The fragments directly under this group, skipping nested groups.
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.operands.iter().filter_map(|operand| match operand {
            Operand::Fragment(fragment) => Some(fragment),
            Operand::Nested(_) => None,
        })
    }

    pub fn into_expr(self) -> Expr {
        let operator = self.operator;
        let exprs: Vec<Expr> = self.operands.into_iter().map(Operand::into_expr).collect();
        match operator {
            Operator::All => Expr::and(exprs),
            Operator::Any => Expr::or(exprs),
            Operator::NotAll => Expr::and(exprs.into_iter().map(Expr::negate).collect()),
        }
    }

    pub fn to_sql(&self, dialect: &dyn Dialect) -> (String, Vec<Value>) {
        to_sql(&self.clone().into_expr(), dialect)
    }

    fn into_operand(self) -> Operand {
        if self.operator != Operator::NotAll && self.operands.len() == 1 {
            let mut operands = self.operands;
            return operands.remove(0);
        }
        Operand::Nested(self)
    }

    /// Appends `part`, inlining its operands when it shares our operator.
    fn absorb(&mut self, part: Predicate) {
        if self.operator != Operator::NotAll && part.operator == self.operator {
            self.operands.extend(part.operands);
        } else {
            self.operands.push(part.into_operand());
        }
    }
}

/// Assembles `rule`, or `None` when it contributes no predicate at all.
pub fn assemble(rule: &Rule) -> Result<Option<Predicate>, FilterError> {
    match rule {
        Rule::Condition(condition) => Ok(Some(Predicate::single(condition_fragment(condition)?))),
        Rule::Exists(exists) => Ok(Some(Predicate::single(exists_fragment(exists)))),
        Rule::Chain(chain) => {
            let operator = match chain.kind() {
                ChainKind::All => Operator::All,
                ChainKind::Any => Operator::Any,
                ChainKind::None => Operator::NotAll,
            };

            let mut acc: Option<Predicate> = None;
            for child in chain {
                let Some(part) = assemble(child)? else {
                    continue;
                };

                acc = Some(match acc {
                    None if operator == Operator::NotAll => Predicate {
                        operator,
                        operands: vec![part.into_operand()],
                    },
                    None => part,
                    Some(mut acc) if acc.operator == operator => {
                        acc.absorb(part);
                        acc
                    }
                    Some(acc) => {
                        let mut group = Predicate {
                            operator,
                            operands: vec![acc.into_operand()],
                        };
                        group.absorb(part);
                        group
                    }
                });
            }

            Ok(acc)
        }
    }
}

fn exists_fragment(exists: &Exists) -> Fragment {
    Fragment::new(Expr::Exists {
        subquery: Box::new(exists.query().clone()),
        negated: exists.is_negated(),
    })
}

/// Splits `alias.column` at the last dot into a qualified identifier.
fn column_expr(column: &str) -> Expr {
    match column.rsplit_once('.') {
        Some((qualifier, name)) => qualified(qualifier, name),
        None => ident(column),
    }
}

pub(crate) fn condition_fragment(condition: &Condition) -> Result<Fragment, FilterError> {
    let column = column_expr(condition.column());
    let ignore_case = condition.ignore_case();

    let expr = match condition.comparison() {
        Comparison::Equal => match condition.value() {
            Value::Array(items) => Expr::InList {
                expr: Box::new(cased(column, ignore_case)),
                list: list_items(condition, items, ignore_case)?,
                negated: false,
            },
            Value::String(s) if s == "*" => column.is_not_null(),
            Value::String(s) if s.contains('*') => Expr::binary(
                cased(column, ignore_case),
                BinaryOperator::Like,
                value(cased_value(Value::String(s.replace('*', "%")), ignore_case)),
            ),
            Value::Null => column.is_null(),
            scalar => Expr::binary(
                cased(column, ignore_case),
                BinaryOperator::Eq,
                value(cased_value(scalar.clone(), ignore_case)),
            ),
        },
        Comparison::Unequal => match condition.value() {
            Value::Array(items) => Expr::or(vec![
                Expr::InList {
                    expr: Box::new(cased(column.clone(), ignore_case)),
                    list: list_items(condition, items, ignore_case)?,
                    negated: true,
                },
                column.is_null(),
            ]),
            Value::String(s) if s == "*" => column.is_null(),
            Value::String(s) if s.contains('*') => Expr::or(vec![
                Expr::binary(
                    cased(column.clone(), ignore_case),
                    BinaryOperator::NotLike,
                    value(cased_value(Value::String(s.replace('*', "%")), ignore_case)),
                ),
                column.is_null(),
            ]),
            Value::Null => column.is_not_null(),
            scalar => Expr::or(vec![
                Expr::binary(
                    cased(column.clone(), ignore_case),
                    BinaryOperator::NotEq,
                    value(cased_value(scalar.clone(), ignore_case)),
                ),
                column.is_null(),
            ]),
        },
        ordering => {
            if condition.value().is_array() {
                return Err(FilterError::InvalidUsage(format!(
                    "{ordering:?} on `{}` does not accept an array value",
                    condition.column()
                )));
            }
            let op = match ordering {
                Comparison::GreaterThan => BinaryOperator::Gt,
                Comparison::GreaterThanOrEqual => BinaryOperator::GtEq,
                Comparison::LessThan => BinaryOperator::Lt,
                _ => BinaryOperator::LtEq,
            };
            Expr::binary(column, op, value(condition.value().clone()))
        }
    };

    Ok(Fragment::new(expr))
}

fn list_items(
    condition: &Condition,
    items: &[Value],
    ignore_case: bool,
) -> Result<Vec<Expr>, FilterError> {
    if items.is_empty() {
        return Err(FilterError::InvalidUsage(format!(
            "empty value list for `{}`",
            condition.column()
        )));
    }
    Ok(items
        .iter()
        .map(|item| value(cased_value(item.clone(), ignore_case)))
        .collect())
}

fn cased(column: Expr, ignore_case: bool) -> Expr {
    if ignore_case {
        Expr::function("LOWER", vec![column])
    } else {
        column
    }
}

fn cased_value(value: Value, ignore_case: bool) -> Value {
    match value {
        Value::String(s) if ignore_case => Value::String(s.to_lowercase()),
        other => other,
    }
}
