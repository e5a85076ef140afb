//! condition parser - converts JSON configuration to [`Condition`] values
//!
//! supports:
//! - a list of condition objects, each tagged by its `condition` field
//! - kind-less objects, which are read as `state` conditions
//! - `state` / `state_not` given as a single string or a list of strings

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::types::Condition;

/// error type for parsing conditions
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", display_with_path(.path, .message))]
pub struct ParseError {
    pub message: String,
    pub path: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

fn display_with_path(path: &str, message: &str) -> String {
    if path.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", path, message)
    }
}

/// parse a JSON array of conditions
pub fn parse_conditions(json: &JsonValue) -> Result<Vec<Condition>, ParseError> {
    let items = json
        .as_array()
        .ok_or_else(|| ParseError::new("conditions must be an array", "conditions"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_condition_internal(item, &format!("conditions[{}]", i)))
        .collect()
}

/// parse a single condition object
pub fn parse_condition(json: &JsonValue) -> Result<Condition, ParseError> {
    parse_condition_internal(json, "")
}

fn parse_condition_internal(json: &JsonValue, path: &str) -> Result<Condition, ParseError> {
    let obj = json
        .as_object()
        .ok_or_else(|| ParseError::new(format!("expected object, got {}", type_name(json)), path))?;

    let mut obj = obj.clone();

    match obj.get("condition") {
        // kind-less conditions predate the `condition` field and mean `state`
        None | Some(JsonValue::Null) => {
            obj.insert(
                "condition".to_string(),
                JsonValue::String("state".to_string()),
            );
        }
        Some(JsonValue::String(kind)) => {
            if !Condition::KINDS.contains(&kind.as_str()) {
                return Err(ParseError::new(
                    format!("unknown condition: '{}'", kind),
                    path,
                ));
            }
        }
        Some(other) => {
            return Err(ParseError::new(
                format!("'condition' must be a string, got {}", type_name(other)),
                path,
            ));
        }
    }

    serde_json::from_value(JsonValue::Object(obj)).map_err(|e| ParseError::new(e.to_string(), path))
}

fn type_name(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
