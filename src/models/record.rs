//! Row records.

use serde_json::{Map, Value};

/// One row of a dataset: field name to raw JSON value, in server field order.
pub type Row = Map<String, Value>;

/// Render a field value as text for flat exports.
///
/// `null` renders as `None`; strings are unquoted; nested values become
/// compact JSON.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!(null)), None);
        assert_eq!(value_to_text(&json!("TX")), Some("TX".to_string()));
        assert_eq!(value_to_text(&json!(42)), Some("42".to_string()));
        assert_eq!(value_to_text(&json!(31.5)), Some("31.5".to_string()));
        assert_eq!(value_to_text(&json!(true)), Some("true".to_string()));
        assert_eq!(value_to_text(&json!([1, 2])), Some("[1,2]".to_string()));
    }
}
