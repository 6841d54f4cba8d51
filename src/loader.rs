//! Loading of SDF documents
//!
//! Reads JSON into plain [`Definition`] trees. Dereferencing is left to the
//! [`crate::resolver`].

use std::fs;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::error::{Result, SdfError};
use crate::Definition;

/// Load a document from a file
pub fn load_file(path: impl AsRef<Path>) -> Result<Definition> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    load_str(&content).map_err(|e| match e {
        SdfError::Json(e) => SdfError::InvalidDefinition(format!(
            "Failed to parse JSON in {}: {}",
            path.display(),
            e
        )),
        other => other,
    })
}

/// Load a document from a string
pub fn load_str(content: &str) -> Result<Definition> {
    into_definition(serde_json::from_str(content)?)
}

/// Load a document from a reader
pub fn load_reader(reader: impl Read) -> Result<Definition> {
    into_definition(serde_json::from_reader(reader)?)
}

/// Accept a JSON value as a document if it is an object
pub fn into_definition(value: Value) -> Result<Definition> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SdfError::InvalidDefinition(format!(
            "document must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_str() {
        let doc = load_str(r#"{"sdfData": {"A": {"type": "integer"}}}"#).unwrap();
        assert!(doc.contains_key("sdfData"));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = load_str("[1, 2]").unwrap_err();
        assert!(matches!(err, SdfError::InvalidDefinition(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.sdf.json");
        fs::write(&path, r#"{"info": {"title": "Test"}}"#).unwrap();
        let doc = load_file(&path).unwrap();
        assert_eq!(doc["info"]["title"], "Test");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_file(&path), Err(SdfError::InvalidDefinition(_))));
    }
}
