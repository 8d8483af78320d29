use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::error::ExtractionError;
use super::path::JsonPath;
use super::value::{parse_date, FeatureValue};
use crate::catalog::{ExtractionConfig, Feature, FeatureType};

/// Extracted feature values keyed by feature name.
pub type ExtractedFeatures = BTreeMap<String, FeatureValue>;

/// Pulls typed feature values out of input documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Extract every feature or fail naming all the ones that are missing.
    pub fn extract(
        &self,
        features: &[Feature],
        input: &Value,
    ) -> Result<ExtractedFeatures, ExtractionError> {
        let mut extracted = ExtractedFeatures::new();
        let mut missing = Vec::new();

        for feature in features {
            match self.extract_one(feature, input)? {
                Some(value) => {
                    extracted.insert(feature.name.clone(), value);
                }
                None => missing.push(feature.name.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(ExtractionError::MissingFeatures(missing));
        }

        debug!(count = extracted.len(), "features extracted");
        Ok(extracted)
    }

    /// `Ok(None)` marks the feature as missing. Only a malformed path is a
    /// hard error.
    fn extract_one(
        &self,
        feature: &Feature,
        input: &Value,
    ) -> Result<Option<FeatureValue>, ExtractionError> {
        let raw = locate_raw(feature, input)?;

        let coerced = match raw {
            None | Some(Value::Null) => None,
            Some(raw) => match coerce(feature.feature_type, raw) {
                Ok(value) => Some(value),
                Err(reason) => {
                    debug!(feature = %feature.name, %reason, "feature conversion failed");
                    None
                }
            },
        };

        Ok(coerced.or_else(|| feature.default_value.as_ref().map(FeatureValue::from_json)))
    }
}

fn locate_raw<'a>(feature: &Feature, input: &'a Value) -> Result<Option<&'a Value>, ExtractionError> {
    match &feature.extraction_config {
        ExtractionConfig::JsonPath { path } => {
            let parsed = JsonPath::parse(path).map_err(|reason| ExtractionError::InvalidPath {
                feature: feature.name.clone(),
                path: path.clone(),
                reason,
            })?;
            Ok(parsed.locate(input))
        }
        ExtractionConfig::Direct { field } => Ok(input.get(field.as_str())),
    }
}

/// Convert a non-null raw value into the declared feature type.
pub(crate) fn coerce(feature_type: FeatureType, raw: &Value) -> Result<FeatureValue, String> {
    match feature_type {
        FeatureType::Numeric => match raw {
            Value::Number(_) => Ok(FeatureValue::from_json(raw)),
            Value::String(text) => parse_numeric(text.trim())
                .ok_or_else(|| format!("'{text}' is not a number")),
            other => Err(format!("expected a number, found {}", json_kind(other))),
        },
        FeatureType::String => match raw {
            Value::String(text) => Ok(FeatureValue::Text(text.clone())),
            other => Ok(FeatureValue::Text(other.to_string())),
        },
        FeatureType::Boolean => match raw {
            Value::Bool(flag) => Ok(FeatureValue::Boolean(*flag)),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(FeatureValue::Boolean(true)),
                "false" => Ok(FeatureValue::Boolean(false)),
                _ => Err(format!("'{text}' is not a boolean")),
            },
            Value::Number(number) => Ok(FeatureValue::Boolean(
                number.as_f64().map_or(false, |value| value != 0.0),
            )),
            other => Err(format!("expected a boolean, found {}", json_kind(other))),
        },
        FeatureType::Date => match raw {
            Value::String(text) => parse_date(text)
                .map(FeatureValue::Date)
                .ok_or_else(|| format!("'{text}' is not an ISO-8601 date")),
            other => Err(format!("expected a date string, found {}", json_kind(other))),
        },
        FeatureType::List => match raw {
            Value::Array(_) => Ok(FeatureValue::from_json(raw)),
            other => Err(format!("expected a list, found {}", json_kind(other))),
        },
        FeatureType::Unknown => Ok(FeatureValue::from_json(raw)),
    }
}

fn parse_numeric(text: &str) -> Option<FeatureValue> {
    if text.contains('.') {
        text.parse::<f64>().ok().map(FeatureValue::Float)
    } else {
        text.parse::<i64>().ok().map(FeatureValue::Integer)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
