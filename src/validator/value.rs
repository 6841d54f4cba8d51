//! Typed values produced by validation

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use url::Url;
use uuid::Uuid;

use super::format::encode_bytes;

/// A validated and coerced value
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    /// Decoded `byte-string`
    Bytes(Vec<u8>),
    Uuid(Uuid),
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uri(Url),
    /// A `unix-time` number
    Timestamp(DateTime<Utc>),
    Array(Vec<DataValue>),
    /// Array with `uniqueItems`; never holds two equal items
    Set(Vec<DataValue>),
    Object(BTreeMap<String, DataValue>),
    /// A value matched to the `sdfChoice` alternative with the same `const`
    Choice { name: String, value: Box<DataValue> },
}

impl DataValue {
    /// Take a JSON value as is
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => DataValue::Null,
            Value::Bool(b) => DataValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DataValue::Integer(i),
                None => n.as_f64().map(DataValue::Number).unwrap_or(DataValue::Null),
            },
            Value::String(s) => DataValue::String(s.clone()),
            Value::Array(items) => DataValue::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => DataValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// The JSON representation of this value
    pub fn to_json(&self) -> Value {
        match self {
            DataValue::Null => Value::Null,
            DataValue::Bool(b) => Value::Bool(*b),
            DataValue::Integer(i) => Value::from(*i),
            DataValue::Number(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            DataValue::String(s) => Value::String(s.clone()),
            DataValue::Bytes(bytes) => Value::String(encode_bytes(bytes)),
            DataValue::Uuid(uuid) => Value::String(uuid.to_string()),
            DataValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            DataValue::Date(date) => Value::String(date.to_string()),
            DataValue::Time(time) => Value::String(time.to_string()),
            DataValue::Uri(url) => Value::String(url.to_string()),
            DataValue::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            DataValue::Array(items) | DataValue::Set(items) => {
                Value::Array(items.iter().map(Self::to_json).collect())
            }
            DataValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            DataValue::Choice { value, .. } => value.to_json(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.inner(), DataValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.inner() {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.inner() {
            DataValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an integer or number
    pub fn as_f64(&self) -> Option<f64> {
        match self.inner() {
            DataValue::Integer(i) => Some(*i as f64),
            DataValue::Number(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.inner() {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the matched `sdfChoice` alternative
    pub fn choice_name(&self) -> Option<&str> {
        match self {
            DataValue::Choice { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The value itself, looking through a choice
    pub fn inner(&self) -> &DataValue {
        match self {
            DataValue::Choice { value, .. } => value.inner(),
            other => other,
        }
    }
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let value = DataValue::from_json(&json!({"a": [1, 2.5, "x", null, true]}));
        let DataValue::Object(map) = &value else {
            panic!("expected an object");
        };
        assert_eq!(
            map["a"],
            DataValue::Array(vec![
                DataValue::Integer(1),
                DataValue::Number(2.5),
                DataValue::String("x".to_string()),
                DataValue::Null,
                DataValue::Bool(true),
            ])
        );
    }

    #[test]
    fn test_to_json() {
        let value = DataValue::Choice {
            name: "On".to_string(),
            value: Box::new(DataValue::Integer(1)),
        };
        assert_eq!(value.to_json(), json!(1));
        assert_eq!(value.as_i64(), Some(1));
        assert_eq!(value.choice_name(), Some("On"));

        let bytes = DataValue::Bytes(vec![0xfb, 0xff]);
        assert_eq!(serde_json::to_value(&bytes).unwrap(), json!("-_8"));

        let ts = DataValue::Timestamp(DateTime::from_timestamp(0, 0).unwrap());
        assert_eq!(ts.to_json(), json!("1970-01-01T00:00:00Z"));
    }
}
