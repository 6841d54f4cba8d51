use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{compile_choices, is_zero, DataCommon, DataQualities};
use crate::error::{Result, SdfError};
use crate::named::NamedMap;
use crate::validator::format::decode_bytes;
use crate::validator::{DataValue, LengthRange, StringFormat, StringRules, Validator};

/// `sdfType` of base64url-encoded binary strings
pub const BYTE_STRING: &str = "byte-string";

/// String data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringData {
    #[serde(flatten)]
    pub common: DataCommon,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_format: Option<String>,
    #[serde(default, rename = "sdfChoice", skip_serializing_if = "Option::is_none")]
    pub choices: Option<NamedMap<StringData>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StringData {
    /// Whether values are base64url-encoded bytes
    pub fn is_byte_string(&self) -> bool {
        self.common.sdf_type.as_deref() == Some(BYTE_STRING) || self.format.as_deref() == Some("bytes")
    }

    fn length(&self) -> LengthRange {
        LengthRange {
            min: self.min_length,
            max: self.max_length,
        }
    }
}

impl DataQualities for StringData {
    fn common(&self) -> &DataCommon {
        &self.common
    }

    fn base_validator(&self) -> Result<Validator> {
        if let Some(values) = &self.enum_ {
            return Ok(Validator::Enum(values.clone()));
        }
        if self.is_byte_string() {
            return Ok(Validator::Bytes(self.length()));
        }

        let pattern = self
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| SdfError::InvalidDefinition(format!("invalid pattern: {}", e)))?;

        Ok(Validator::String(StringRules {
            length: self.length(),
            pattern,
            format: self.format.as_deref().and_then(StringFormat::from_name),
        }))
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.choices
            .as_ref()
            .map(|choices| compile_choices(choices, true))
            .transpose()
    }

    fn literal(&self, value: &Value) -> DataValue {
        let Some(text) = value.as_str() else {
            return DataValue::from_json(value);
        };
        if self.is_byte_string() {
            if let Some(bytes) = decode_bytes(text) {
                return DataValue::Bytes(bytes);
            }
        }
        self.format
            .as_deref()
            .and_then(StringFormat::from_name)
            .and_then(|format| format.parse(text, "$").ok())
            .unwrap_or_else(|| DataValue::String(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string_data(value: Value) -> StringData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_length_counts_characters() {
        let data = string_data(json!({"minLength": 2, "maxLength": 3}));
        assert!(data.validate(&json!("ää")).is_ok());
        assert!(data.validate(&json!("ä")).is_err());
        assert!(data.validate(&json!("abcd")).is_err());
        assert!(data.validate(&json!(12)).is_err());
    }

    #[test]
    fn test_pattern() {
        let data = string_data(json!({"pattern": "^[a-f0-9]{4}$"}));
        assert!(data.validate(&json!("c0de")).is_ok());
        assert!(data.validate(&json!("code")).is_err());

        let bad = string_data(json!({"pattern": "("}));
        assert!(matches!(bad.compile(), Err(SdfError::InvalidDefinition(_))));
    }

    #[test]
    fn test_enum_takes_precedence() {
        let data = string_data(json!({"enum": ["on", "off"], "minLength": 5}));
        assert_eq!(
            data.validate(&json!("on")).unwrap(),
            DataValue::String("on".to_string())
        );
        assert!(data.validate(&json!("dim")).is_err());
    }

    #[test]
    fn test_byte_string() {
        let data = string_data(json!({"sdfType": "byte-string", "maxLength": 4}));
        assert_eq!(
            data.validate(&json!("AAECAw")).unwrap(),
            DataValue::Bytes(vec![0, 1, 2, 3])
        );
        assert!(data.validate(&json!("AAECAwQ")).is_err());
        assert!(data.validate(&json!("not base64!")).is_err());

        let data = string_data(json!({"format": "bytes", "default": "AQ"}));
        assert_eq!(data.validate_missing().unwrap(), DataValue::Bytes(vec![1]));
    }

    #[test]
    fn test_formats() {
        let data = string_data(json!({"format": "uuid"}));
        assert!(matches!(
            data.validate(&json!("67e55044-10b1-426f-9247-bb680e5fe0c8")).unwrap(),
            DataValue::Uuid(_)
        ));
        assert!(data.validate(&json!("nope")).is_err());

        let data = string_data(json!({"format": "email"}));
        assert_eq!(
            data.validate(&json!("a@b")).unwrap(),
            DataValue::String("a@b".to_string())
        );
    }

    #[test]
    fn test_string_choices() {
        let data = string_data(json!({
            "sdfChoice": {
                "Red": {"const": "red"},
                "Hex": {"pattern": "^#[0-9a-f]{6}$"}
            }
        }));
        assert_eq!(data.validate(&json!("red")).unwrap().choice_name(), Some("Red"));
        assert_eq!(
            data.validate(&json!("#00ff00")).unwrap(),
            DataValue::String("#00ff00".to_string())
        );
        assert!(data.validate(&json!("blue")).is_err());
    }
}
