use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Number, Value};

use super::error::OperatorError;

/// Typed value of an extracted feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    List(Vec<FeatureValue>),
    Object(BTreeMap<String, FeatureValue>),
}

impl FeatureValue {
    /// Mirror a JSON value without coercion.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FeatureValue::Null,
            Value::Bool(flag) => FeatureValue::Boolean(*flag),
            Value::Number(number) => Self::from_number(number),
            Value::String(text) => FeatureValue::Text(text.clone()),
            Value::Array(items) => FeatureValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => FeatureValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    fn from_number(number: &Number) -> Self {
        match number.as_i64() {
            Some(integer) => FeatureValue::Integer(integer),
            None => FeatureValue::Float(number.as_f64().unwrap_or(f64::NAN)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FeatureValue::Null => Value::Null,
            FeatureValue::Boolean(flag) => Value::Bool(*flag),
            FeatureValue::Integer(integer) => Value::from(*integer),
            FeatureValue::Float(float) => Number::from_f64(*float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FeatureValue::Text(text) => Value::String(text.clone()),
            FeatureValue::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
            FeatureValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            FeatureValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Integer(integer) => Some(*integer as f64),
            FeatureValue::Float(float) => Some(*float),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FeatureValue]> {
        match self {
            FeatureValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeatureValue::Null => "null",
            FeatureValue::Boolean(_) => "boolean",
            FeatureValue::Integer(_) | FeatureValue::Float(_) => "number",
            FeatureValue::Text(_) => "string",
            FeatureValue::Date(_) => "date",
            FeatureValue::List(_) => "list",
            FeatureValue::Object(_) => "object",
        }
    }

    /// Equality used by EQ, IN and list membership: numbers by value,
    /// dates against ISO date strings, everything else structurally.
    pub fn loosely_equals(&self, other: &FeatureValue) -> bool {
        if let (Some(left), Some(right)) = (self.as_f64(), other.as_f64()) {
            return left == right;
        }
        match (self, other) {
            (FeatureValue::Date(date), FeatureValue::Text(text))
            | (FeatureValue::Text(text), FeatureValue::Date(date)) => {
                parse_date(text).map_or(false, |parsed| parsed == *date)
            }
            (FeatureValue::List(left), FeatureValue::List(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|(left, right)| left.loosely_equals(right))
            }
            _ => self == other,
        }
    }

    /// Ordering used by the comparison operators. Numbers compare by value,
    /// otherwise both sides must share a naturally ordered kind.
    pub fn compare(&self, other: &FeatureValue) -> Result<Ordering, OperatorError> {
        let mismatch = || OperatorError::TypeMismatch {
            left: self.kind(),
            right: other.kind(),
        };

        if let (Some(left), Some(right)) = (self.as_f64(), other.as_f64()) {
            return left.partial_cmp(&right).ok_or_else(mismatch);
        }

        match (self, other) {
            (FeatureValue::Text(left), FeatureValue::Text(right)) => Ok(left.cmp(right)),
            (FeatureValue::Boolean(left), FeatureValue::Boolean(right)) => Ok(left.cmp(right)),
            (FeatureValue::Date(left), FeatureValue::Date(right)) => Ok(left.cmp(right)),
            (FeatureValue::Date(left), FeatureValue::Text(right)) => parse_date(right)
                .map(|right| left.cmp(&right))
                .ok_or_else(mismatch),
            (FeatureValue::Text(left), FeatureValue::Date(right)) => parse_date(left)
                .map(|left| left.cmp(right))
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Null => f.write_str("null"),
            FeatureValue::Boolean(flag) => write!(f, "{flag}"),
            FeatureValue::Integer(integer) => write!(f, "{integer}"),
            FeatureValue::Float(float) => write!(f, "{float}"),
            FeatureValue::Text(text) => f.write_str(text),
            FeatureValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            FeatureValue::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            FeatureValue::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&Value> for FeatureValue {
    fn from(value: &Value) -> Self {
        FeatureValue::from_json(value)
    }
}
