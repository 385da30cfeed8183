//! Dataset documentation models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Semantic type of a dataset field, used for export coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    /// Free text or anything we cannot classify
    #[default]
    String,
    /// Date or timestamp
    Datetime,
    /// Whole number
    Integer,
    /// Floating point / decimal
    Float,
}

impl FieldType {
    /// Classify a documented type name.
    ///
    /// The service reports database-flavoured names (`varchar`,
    /// `datetime`, `int`, `numeric`, ...), so matching is by keyword.
    pub fn from_type_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("date") || name.contains("time") {
            FieldType::Datetime
        } else if name.contains("int") || name == "long" {
            FieldType::Integer
        } else if ["float", "double", "decimal", "numeric", "number", "real"]
            .iter()
            .any(|k| name.contains(k))
        {
            FieldType::Float
        } else {
            FieldType::String
        }
    }
}

/// Description of one field of a dataset, as returned by `docs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDoc {
    /// Field name as it appears in row records
    pub name: String,
    /// Type name as documented by the service
    #[serde(rename = "type", default)]
    pub type_name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the field is part of the dataset's primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Any other attributes the service includes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDoc {
    /// Semantic type of this field.
    pub fn field_type(&self) -> FieldType {
        FieldType::from_type_name(&self.type_name)
    }
}

/// Names of primary-key fields, in documented order.
pub fn primary_keys(docs: &[FieldDoc]) -> Vec<String> {
    docs.iter()
        .filter(|d| d.primary_key)
        .map(|d| d.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_classification() {
        assert_eq!(FieldType::from_type_name("datetime"), FieldType::Datetime);
        assert_eq!(FieldType::from_type_name("DATE"), FieldType::Datetime);
        assert_eq!(FieldType::from_type_name("bigint"), FieldType::Integer);
        assert_eq!(FieldType::from_type_name("numeric(12,6)"), FieldType::Float);
        assert_eq!(FieldType::from_type_name("float"), FieldType::Float);
        assert_eq!(FieldType::from_type_name("varchar(50)"), FieldType::String);
        assert_eq!(FieldType::from_type_name(""), FieldType::String);
    }

    #[test]
    fn test_field_doc_deserialize() {
        let docs: Vec<FieldDoc> = serde_json::from_value(serde_json::json!([
            {"name": "WellID", "type": "bigint", "primaryKey": true, "nullable": false},
            {"name": "SpudDate", "type": "datetime", "description": "Spud date"},
            {"name": "API_UWI"}
        ]))
        .unwrap();

        assert_eq!(docs.len(), 3);
        assert!(docs[0].primary_key);
        assert_eq!(docs[0].field_type(), FieldType::Integer);
        assert_eq!(docs[0].extra.get("nullable"), Some(&Value::Bool(false)));
        assert_eq!(docs[1].description.as_deref(), Some("Spud date"));
        assert_eq!(docs[2].field_type(), FieldType::String);
        assert_eq!(primary_keys(&docs), vec!["WellID".to_string()]);
    }
}
