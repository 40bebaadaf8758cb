//! Condition evaluation.
//!
//! A leaf metric is a `field operator literal` expression such as
//! `score >= 90` or `approval_status == 'approved'`. Operators are `>=`,
//! `<=`, `>`, `<`, `==`, `!=` and `contains`.
//!
//! Comparison follows loose scripting semantics so that events produced by
//! form-based tools (where every attribute is a string) still match:
//!
//! - ordering operators compare numerically when either side is a number,
//!   coercing numeric strings, and lexicographically when both are strings;
//! - `==` and `!=` are strict, so `"90" == 90` is false;
//! - `contains` stringifies the attribute and tests for a substring.

use std::cmp::Ordering;

use serde_json::Value;
use thiserror::Error;

use microbadge_entity::event::{Attributes, Event};
use microbadge_entity::rule::{Condition, LeafCondition};

/// A condition that cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    /// The metric expression does not match `field operator literal`.
    #[error("Invalid metric expression: '{0}'")]
    MalformedMetric(String),
}

/// Comparison operator of a metric expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `contains`
    Contains,
}

impl Operator {
    // Longest tokens first so `>=` is not read as `>`.
    const TOKENS: [(&'static str, Operator); 7] = [
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        ("contains", Operator::Contains),
    ];
}

/// Literal right-hand side of a metric expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// The literal parsed as a number.
    Number(f64),
    /// Anything else, with surrounding quotes removed.
    Text(String),
}

/// A parsed metric expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric<'a> {
    /// Attribute looked up in the event.
    pub field: &'a str,
    /// Operator.
    pub operator: Operator,
    /// Expected value.
    pub literal: Literal,
}

/// Parse `field operator literal`.
///
/// The field is the longest word run that is followed by an operator, so
/// `scorecontains 5` reads as `score contains 5`.
pub fn parse_metric(expression: &str) -> Result<Metric<'_>, ConditionError> {
    let input = expression.trim();

    let word_len = input
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(input.len());

    (1..=word_len)
        .rev()
        .find_map(|field_len| split_metric(input, field_len))
        .ok_or_else(|| ConditionError::MalformedMetric(expression.to_string()))
}

fn split_metric(input: &str, field_len: usize) -> Option<Metric<'_>> {
    let (field, rest) = input.split_at(field_len);
    let rest = rest.trim_start();

    let (token, operator) = Operator::TOKENS
        .iter()
        .find(|(token, _)| rest.starts_with(token))
        .copied()?;

    let raw = rest[token.len()..].trim();
    if raw.is_empty() {
        return None;
    }

    Some(Metric {
        field,
        operator,
        literal: parse_literal(raw),
    })
}

fn parse_literal(raw: &str) -> Literal {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Literal::Number(n),
        _ => Literal::Text(raw.trim_matches(|c| c == '\'' || c == '"').to_string()),
    }
}

/// Evaluate `condition` against an event's name and attributes.
///
/// `And` stops at the first false child and `Or` at the first true one, so
/// a malformed metric behind a short-circuit is not reported.
pub fn evaluate(
    condition: &Condition,
    event_name: &str,
    attributes: &Attributes,
) -> Result<bool, ConditionError> {
    match condition {
        Condition::All { and } => {
            for child in and {
                if !evaluate(child, event_name, attributes)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::Any { or } => {
            for child in or {
                if evaluate(child, event_name, attributes)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Condition::Leaf(leaf) => evaluate_leaf(leaf, event_name, attributes),
    }
}

/// Evaluate `condition` against a stored event.
pub fn evaluate_event(condition: &Condition, event: &Event) -> Result<bool, ConditionError> {
    evaluate(condition, &event.name, &event.attributes)
}

fn evaluate_leaf(
    leaf: &LeafCondition,
    event_name: &str,
    attributes: &Attributes,
) -> Result<bool, ConditionError> {
    // Empty strings count as absent.
    let event = leaf.event.as_deref().filter(|name| !name.is_empty());
    if event.is_some_and(|name| name != event_name) {
        return Ok(false);
    }
    match leaf.metric.as_deref().filter(|metric| !metric.is_empty()) {
        Some(expression) => {
            let metric = parse_metric(expression)?;
            Ok(compare(attributes.get(metric.field), metric.operator, &metric.literal))
        }
        None => Ok(true),
    }
}

fn compare(actual: Option<&Value>, operator: Operator, expected: &Literal) -> bool {
    let Some(actual) = actual else {
        return operator == Operator::Ne;
    };
    match operator {
        Operator::Eq => strict_eq(actual, expected),
        Operator::Ne => !strict_eq(actual, expected),
        Operator::Contains => stringify(actual).contains(&literal_string(expected)),
        Operator::Ge => loose_cmp(actual, expected).is_some_and(Ordering::is_ge),
        Operator::Le => loose_cmp(actual, expected).is_some_and(Ordering::is_le),
        Operator::Gt => loose_cmp(actual, expected).is_some_and(Ordering::is_gt),
        Operator::Lt => loose_cmp(actual, expected).is_some_and(Ordering::is_lt),
    }
}

fn strict_eq(actual: &Value, expected: &Literal) -> bool {
    match (actual, expected) {
        (Value::Number(n), Literal::Number(e)) => n.as_f64() == Some(*e),
        (Value::String(s), Literal::Text(e)) => s == e,
        _ => false,
    }
}

/// `None` when the operands are not comparable (NaN after coercion).
fn loose_cmp(actual: &Value, expected: &Literal) -> Option<Ordering> {
    match (actual, expected) {
        (Value::String(s), Literal::Text(e)) => Some(s.as_str().cmp(e.as_str())),
        (_, Literal::Number(e)) => to_number(actual)?.partial_cmp(e),
        (_, Literal::Text(e)) => {
            let lhs = to_number(actual)?;
            lhs.partial_cmp(&text_to_number(e)?)
        }
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => text_to_number(s),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn text_to_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => stringify(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn literal_string(literal: &Literal) -> String {
    match literal {
        Literal::Number(n) => format_number(*n),
        Literal::Text(s) => s.clone(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}
