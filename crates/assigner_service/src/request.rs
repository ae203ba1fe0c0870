//! Prediction request decoding
//!
//! Turns the JSON body of `POST /predict` into a [`Ticket`]. `labels` may be a
//! list of strings or any other JSON value; non-list values are rendered to
//! text here so the normalizer only ever sees a resolved variant.

use serde_json::{Map, Value};
use ticket_assigner_core::{AssignerError, Labels, Ticket};

/// Decode a prediction request body
pub fn ticket_from_json(body: &Value) -> Result<Ticket, AssignerError> {
    let fields = body.as_object().ok_or_else(|| {
        AssignerError::InvalidInput("request body must be a JSON object".to_string())
    })?;

    Ok(Ticket {
        title: text_field(fields, "title")?,
        description: text_field(fields, "description")?,
        labels: labels_field(fields.get("labels"))?,
    })
}

fn text_field(fields: &Map<String, Value>, name: &str) -> Result<String, AssignerError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(AssignerError::InvalidInput(format!(
            "'{name}' must be a string, got {}",
            kind(other)
        ))),
    }
}

fn labels_field(value: Option<&Value>) -> Result<Labels, AssignerError> {
    match value {
        None | Some(Value::Null) => Ok(Labels::default()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(label) => Ok(label.clone()),
                other => Err(AssignerError::InvalidInput(format!(
                    "'labels[{i}]' must be a string, got {}",
                    kind(other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Labels::List),
        Some(Value::String(text)) => Ok(Labels::Scalar(text.clone())),
        // Numbers, booleans and objects use their compact JSON text.
        Some(other) => Ok(Labels::Scalar(other.to_string())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
