//! Compact filter syntax for URL query strings.
//!
//! `|` separates alternatives, `&` binds tighter, parentheses group and a
//! leading `!` negates a group or a single condition. Operators are
//! `= != > >= < <=` plus `~` / `!~` for case-insensitive (in)equality.
//! `col=(a|b)` compares against a list and a bare `col` means `col = true`.
//! Columns and values are percent-decoded.

use crate::{
    error::FilterError,
    rule::{Chain, ChainKind, Comparison, Condition, Rule},
};
use model::core::value::Value;
use pest::{error::InputLocation, iterators::Pair, Parser};

mod grammar {
    use pest_derive::Parser;

    #[derive(Parser)]
    #[grammar = "grammar/query_string.pest"]
    pub(super) struct QueryStringParser;
}

use grammar::{QueryStringParser, Rule as Token};

/// Parses `input` into a rule tree. An empty input is an empty `All` chain.
pub fn parse(input: &str) -> Result<Rule, FilterError> {
    let mut pairs = QueryStringParser::parse(Token::query, input).map_err(|e| {
        let position = match e.location {
            InputLocation::Pos(pos) => pos,
            InputLocation::Span((start, _)) => start,
        };
        FilterError::Parse {
            position,
            message: e.variant.message().to_string(),
        }
    })?;

    let query = pairs.next().ok_or_else(|| malformed(input, 0))?;
    match query.into_inner().find(|p| p.as_rule() == Token::disjunction) {
        Some(disjunction) => build(disjunction),
        None => Ok(Rule::Chain(Chain::new(ChainKind::All))),
    }
}

fn malformed(input: &str, position: usize) -> FilterError {
    FilterError::Parse {
        position,
        message: format!("unexpected structure in `{input}`"),
    }
}

fn build(pair: Pair<Token>) -> Result<Rule, FilterError> {
    let position = pair.as_span().start();
    match pair.as_rule() {
        Token::disjunction => combine(ChainKind::Any, pair),
        Token::conjunction => combine(ChainKind::All, pair),
        Token::unary | Token::group => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| malformed("group", position))?;
            build(inner)
        }
        Token::negation => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or_else(|| malformed("negation", position))?;
            Ok(match build(inner)? {
                Rule::Chain(chain) if chain.kind() == ChainKind::Any => {
                    Rule::none(chain.children().iter().cloned())
                }
                other => Rule::none([other]),
            })
        }
        Token::condition => condition(pair),
        other => Err(FilterError::Parse {
            position,
            message: format!("unexpected {other:?}"),
        }),
    }
}

/// Builds a chain of `kind` from the pair's children, collapsing a single
/// child to itself.
fn combine(kind: ChainKind, pair: Pair<Token>) -> Result<Rule, FilterError> {
    let mut children = pair.into_inner().map(build).collect::<Result<Vec<_>, _>>()?;
    if children.len() == 1 {
        return Ok(children.remove(0));
    }
    Ok(Rule::Chain(Chain::new(kind).with(children)))
}

fn condition(pair: Pair<Token>) -> Result<Rule, FilterError> {
    let position = pair.as_span().start();
    let mut inner = pair.into_inner();
    let column = decode(
        inner
            .next()
            .ok_or_else(|| malformed("condition", position))?
            .as_str(),
        position,
    )?;

    let Some(operator) = inner.next() else {
        return Ok(Rule::equal(column, true));
    };
    let operand = inner
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| malformed("condition", position))?;

    let (comparison, ignore_case) = match operator.as_str() {
        "=" => (Comparison::Equal, false),
        "~" => (Comparison::Equal, true),
        "!=" => (Comparison::Unequal, false),
        "!~" => (Comparison::Unequal, true),
        ">" => (Comparison::GreaterThan, false),
        ">=" => (Comparison::GreaterThanOrEqual, false),
        "<" => (Comparison::LessThan, false),
        "<=" => (Comparison::LessThanOrEqual, false),
        other => {
            return Err(FilterError::Parse {
                position: operator.as_span().start(),
                message: format!("unknown operator `{other}`"),
            });
        }
    };

    let value = match operand.as_rule() {
        Token::list => Value::Array(
            operand
                .into_inner()
                .map(|term| decode(term.as_str(), term.as_span().start()).map(Value::String))
                .collect::<Result<_, _>>()?,
        ),
        _ => Value::String(decode(operand.as_str(), operand.as_span().start())?),
    };

    let mut condition = Condition::new(comparison, column, value);
    condition.set_ignore_case(ignore_case);
    Ok(Rule::Condition(condition))
}

fn decode(raw: &str, position: usize) -> Result<String, FilterError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| FilterError::Parse {
            position,
            message: e.to_string(),
        })
}

/// Renders `rule` back into query-string syntax.
pub fn render(rule: &Rule) -> Result<String, FilterError> {
    match rule {
        Rule::Condition(condition) => render_condition(condition),
        Rule::Exists(_) => Err(FilterError::UnsupportedRuleType(
            "EXISTS has no query-string form".to_string(),
        )),
        Rule::Chain(chain) => {
            let parts = chain
                .iter()
                .map(|child| match child {
                    Rule::Chain(nested) if nested.kind() != ChainKind::None => {
                        render(child).map(|s| if s.is_empty() { s } else { format!("({s})") })
                    }
                    _ => render(child),
                })
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>();

            Ok(match chain.kind() {
                ChainKind::All => parts.join("&"),
                ChainKind::Any => parts.join("|"),
                ChainKind::None if parts.is_empty() => String::new(),
                ChainKind::None => format!("!({})", parts.join("|")),
            })
        }
    }
}

fn render_condition(condition: &Condition) -> Result<String, FilterError> {
    let column = urlencoding::encode(condition.column());
    let operator = match (condition.comparison(), condition.ignore_case()) {
        (Comparison::Equal, false) => "=",
        (Comparison::Equal, true) => "~",
        (Comparison::Unequal, false) => "!=",
        (Comparison::Unequal, true) => "!~",
        (Comparison::GreaterThan, _) => ">",
        (Comparison::GreaterThanOrEqual, _) => ">=",
        (Comparison::LessThan, _) => "<",
        (Comparison::LessThanOrEqual, _) => "<=",
    };

    if condition.comparison() == Comparison::Equal
        && !condition.ignore_case()
        && condition.value() == &Value::Boolean(true)
    {
        return Ok(column.into_owned());
    }

    let operand = match condition.value() {
        Value::Array(items) => format!(
            "({})",
            items
                .iter()
                .map(|item| render_scalar(condition, item))
                .collect::<Result<Vec<_>, _>>()?
                .join("|")
        ),
        scalar => render_scalar(condition, scalar)?,
    };

    Ok(format!("{column}{operator}{operand}"))
}

fn render_scalar(condition: &Condition, value: &Value) -> Result<String, FilterError> {
    value
        .as_string()
        .map(|s| urlencoding::encode(&s).into_owned())
        .ok_or_else(|| {
            FilterError::InvalidUsage(format!(
                "value of `{}` has no query-string form",
                condition.column()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::{parse, render};
    use crate::{
        error::FilterError,
        rule::{ChainKind, Comparison, Rule},
    };
    use model::core::value::Value;
    use planner::query::ast::select::Select;

    #[test]
    fn test_parse_precedence() {
        let rule = parse("a=1|b=2&c=3").unwrap();
        let chain = rule.as_chain().unwrap();

        assert_eq!(chain.kind(), ChainKind::Any);
        assert_eq!(chain.count(), 2);
        assert!(chain.children()[0].as_condition().is_some());
        assert_eq!(
            chain.children()[1].as_chain().map(|c| c.kind()),
            Some(ChainKind::All)
        );
    }

    #[test]
    fn test_parse_operators_and_values() {
        let rule = parse("name~Ann*&tags.name=(a|b%20c)&age>=18&active").unwrap();
        let children: Vec<_> = rule
            .as_chain()
            .unwrap()
            .iter()
            .map(|child| child.as_condition().unwrap())
            .collect();

        assert_eq!(children[0].comparison(), Comparison::Equal);
        assert!(children[0].ignore_case());
        assert_eq!(children[0].value(), &Value::from("Ann*"));
        assert_eq!(children[1].value(), &Value::from(vec!["a", "b c"]));
        assert_eq!(children[2].comparison(), Comparison::GreaterThanOrEqual);
        assert_eq!(children[3].column(), "active");
        assert_eq!(children[3].value(), &Value::Boolean(true));
    }

    #[test]
    fn test_negated_group_becomes_none_chain() {
        let rule = parse("!(a=1|b!~x)").unwrap();
        let chain = rule.as_chain().unwrap();

        assert_eq!(chain.kind(), ChainKind::None);
        assert_eq!(chain.count(), 2);
        let second = chain.children()[1].as_condition().unwrap();
        assert_eq!(second.comparison(), Comparison::Unequal);
        assert!(second.ignore_case());
    }

    #[test]
    fn test_empty_input_is_empty_chain() {
        let rule = parse("").unwrap();
        assert!(rule.as_chain().is_some_and(|c| c.is_empty()));
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse("a=1&(b=2").unwrap_err();
        assert!(matches!(err, FilterError::Parse { position, .. } if position >= 3));
    }

    #[test]
    fn test_render_round_trip() {
        let input = "title~rust&(tags.name=(a|b%20c)|!(comments.body=spam|x<3))&published";
        let rendered = render(&parse(input).unwrap()).unwrap();
        assert_eq!(rendered, input);
    }

    #[test]
    fn test_render_exists_is_unsupported() {
        let rule = Rule::all([Rule::exists(Select::default())]);
        assert!(matches!(
            render(&rule),
            Err(FilterError::UnsupportedRuleType(_))
        ));
    }
}
