//! Conversion of untyped (JSON) waveform payloads into sample vectors

use crate::error::ValidationError;
use serde_json::Value;

/// Extract a sample vector from a JSON value.
///
/// The value must be an array whose elements are all numbers. Length is not
/// checked here; `analyze_signal` owns that rule.
pub fn samples_from_json(value: &Value) -> Result<Vec<f64>, ValidationError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ValidationError::NotASequence {
                found: json_type_name(other),
            })
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_f64()
                .filter(|x| x.is_finite())
                .ok_or(ValidationError::NonNumeric { index })
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
