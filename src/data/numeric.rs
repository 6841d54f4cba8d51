use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{compile_choices, DataCommon, DataQualities};
use crate::error::Result;
use crate::named::NamedMap;
use crate::validator::format::parse_timestamp;
use crate::validator::{as_integer, DataValue, IntegerRange, NumberRange, Validator};

/// `sdfType` of numbers counting seconds since the epoch
pub const UNIX_TIME: &str = "unix-time";

/// Number data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberData {
    #[serde(flatten)]
    pub common: DataCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, rename = "sdfChoice", skip_serializing_if = "Option::is_none")]
    pub choices: Option<NamedMap<NumberData>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NumberData {
    /// Whether values are unix timestamps
    pub fn is_unix_time(&self) -> bool {
        self.common.sdf_type.as_deref() == Some(UNIX_TIME)
    }

    fn range(&self) -> NumberRange {
        NumberRange {
            minimum: self.minimum,
            maximum: self.maximum,
            exclusive_minimum: self.exclusive_minimum,
            exclusive_maximum: self.exclusive_maximum,
            multiple_of: self.multiple_of,
        }
    }
}

impl DataQualities for NumberData {
    fn common(&self) -> &DataCommon {
        &self.common
    }

    fn base_validator(&self) -> Result<Validator> {
        if self.is_unix_time() {
            // Bounds apply to epoch seconds; multipleOf does not
            return Ok(Validator::Timestamp(NumberRange {
                multiple_of: None,
                ..self.range()
            }));
        }
        Ok(Validator::Number(self.range()))
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.choices
            .as_ref()
            .map(|choices| compile_choices(choices, true))
            .transpose()
    }

    fn literal(&self, value: &Value) -> DataValue {
        if self.is_unix_time() {
            if let Ok(ts) = parse_timestamp(value, "$") {
                return DataValue::Timestamp(ts);
            }
        }
        match value.as_f64() {
            Some(number) => DataValue::Number(number),
            None => DataValue::from_json(value),
        }
    }
}

/// Integer bounds, also when written as floats without a fraction (`100.0`)
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => as_integer(&value, "$")
            .map(Some)
            .map_err(|e| D::Error::custom(e.message)),
    }
}

/// Integer data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegerData {
    #[serde(flatten)]
    pub common: DataCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<i64>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<i64>,
    #[serde(default, deserialize_with = "integral", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, rename = "sdfChoice", skip_serializing_if = "Option::is_none")]
    pub choices: Option<NamedMap<IntegerData>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataQualities for IntegerData {
    fn common(&self) -> &DataCommon {
        &self.common
    }

    fn base_validator(&self) -> Result<Validator> {
        Ok(Validator::Integer(IntegerRange {
            minimum: self.minimum,
            maximum: self.maximum,
            exclusive_minimum: self.exclusive_minimum,
            exclusive_maximum: self.exclusive_maximum,
            multiple_of: self.multiple_of,
        }))
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.choices
            .as_ref()
            .map(|choices| compile_choices(choices, true))
            .transpose()
    }

    fn literal(&self, value: &Value) -> DataValue {
        match value.as_i64() {
            Some(integer) => DataValue::Integer(integer),
            None => match value.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    DataValue::Integer(f as i64)
                }
                _ => DataValue::from_json(value),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_maximum() {
        let data = IntegerData {
            maximum: Some(2),
            ..Default::default()
        };
        assert_eq!(data.validate(&json!(2)).unwrap(), DataValue::Integer(2));
        assert!(data.validate(&json!(3)).is_err());
        assert!(data.validate(&json!(1.5)).is_err());
        assert_eq!(data.validate(&Value::Null).unwrap(), DataValue::Null);
    }

    #[test]
    fn test_number_accepts_integers() {
        let data: NumberData = serde_json::from_value(json!({
            "minimum": 0,
            "maximum": 2,
            "multipleOf": 0.5
        }))
        .unwrap();
        assert_eq!(data.validate(&json!(1)).unwrap(), DataValue::Number(1.0));
        assert_eq!(data.validate(&json!(1.5)).unwrap(), DataValue::Number(1.5));
        assert!(data.validate(&json!(0.1)).is_err());
        assert!(data.validate(&json!(-0.5)).is_err());
        assert!(data.validate(&json!("1")).is_err());
    }

    #[test]
    fn test_integer_choices_by_name() {
        let data: IntegerData = serde_json::from_value(json!({
            "sdfChoice": {
                "Low": {"const": 1},
                "High": {"const": 3}
            }
        }))
        .unwrap();
        let value = data.validate(&json!(3)).unwrap();
        assert_eq!(value.choice_name(), Some("High"));
        assert_eq!(value.as_i64(), Some(3));
        assert!(data.validate(&json!(2)).is_err());
    }

    #[test]
    fn test_number_choice_ranges() {
        let data: NumberData = serde_json::from_value(json!({
            "sdfChoice": {
                "Exact": {"const": 0.5},
                "Small": {"minimum": 0, "maximum": 1}
            }
        }))
        .unwrap();
        assert_eq!(data.validate(&json!(0.5)).unwrap().choice_name(), Some("Exact"));
        assert_eq!(data.validate(&json!(0.25)).unwrap(), DataValue::Number(0.25));
        assert!(data.validate(&json!(5)).is_err());
    }

    #[test]
    fn test_unix_time() {
        let data: NumberData = serde_json::from_value(json!({
            "sdfType": "unix-time",
            "minimum": 0
        }))
        .unwrap();
        let DataValue::Timestamp(ts) = data.validate(&json!(86400)).unwrap() else {
            panic!("expected a timestamp");
        };
        assert_eq!(ts.timestamp(), 86400);
        assert!(matches!(
            data.validate(&json!("2024-01-01T00:00:00Z")).unwrap(),
            DataValue::Timestamp(_)
        ));
        assert!(data.validate(&json!(-1)).is_err());
    }

    #[test]
    fn test_integral_float_bounds() {
        let data: IntegerData = serde_json::from_value(json!({
            "minimum": 0.0,
            "maximum": 100.0,
            "multipleOf": 5
        }))
        .unwrap();
        assert_eq!(data.minimum, Some(0));
        assert_eq!(data.maximum, Some(100));
        assert_eq!(data.multiple_of, Some(5));
        assert_eq!(data.exclusive_minimum, None);
        assert!(data.validate(&json!(100)).is_ok());
        assert!(data.validate(&json!(101)).is_err());

        assert!(serde_json::from_value::<IntegerData>(json!({"maximum": 100.5})).is_err());
        assert!(serde_json::from_value::<IntegerData>(json!({"maximum": "100"})).is_err());
    }

    #[test]
    fn test_integral_bounds_in_document() {
        use crate::document::Document;
        use crate::registry::NullRegistry;

        let doc = Document::parse(
            r#"{"sdfData": {"Pct": {"type": "integer", "minimum": 0, "maximum": 100.0}}}"#,
            &NullRegistry,
        )
        .unwrap();
        match doc.data.get("Pct") {
            Some(crate::data::Data::Integer(pct)) => assert_eq!(pct.maximum, Some(100)),
            other => panic!("Expected integer data, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_default_literal() {
        let data: IntegerData = serde_json::from_value(json!({"default": 4.0})).unwrap();
        assert_eq!(data.validate_missing().unwrap(), DataValue::Integer(4));
    }
}
