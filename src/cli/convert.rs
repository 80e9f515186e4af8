//! JSON input decoding

use crate::Value;

/// Converts a decoded JSON document into a record value.
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Decodes whitespace-separated JSON documents into records.
///
/// A single top-level array is taken as the record stream itself.
pub fn parse_records(input: &str) -> Result<Vec<Value>, serde_json::Error> {
    let documents = serde_json::Deserializer::from_str(input)
        .into_iter::<serde_json::Value>()
        .collect::<Result<Vec<_>, _>>()?;

    let mut documents = documents.into_iter().map(json_to_value).collect::<Vec<_>>();
    if matches!(documents.as_slice(), [Value::Array(_)])
        && let Some(Value::Array(items)) = documents.pop()
    {
        return Ok(items);
    }
    Ok(documents)
}
