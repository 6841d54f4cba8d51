use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{compile_choices, is_zero, Data, DataCommon, DataQualities};
use crate::error::{Result, SdfError};
use crate::named::NamedMap;
use crate::validator::{ArrayRules, LengthRange, ObjectRules, PropertyRule, Validator};

/// Array data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayData {
    #[serde(flatten)]
    pub common: DataCommon,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
    /// Item qualities; any value when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Data>>,
    #[serde(default, rename = "sdfChoice", skip_serializing_if = "Option::is_none")]
    pub choices: Option<NamedMap<Data>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataQualities for ArrayData {
    fn common(&self) -> &DataCommon {
        &self.common
    }

    fn base_validator(&self) -> Result<Validator> {
        let items = match &self.items {
            Some(items) => items.compile()?,
            None => Validator::Any,
        };
        Ok(Validator::Array(ArrayRules {
            items: Box::new(items),
            length: LengthRange {
                min: self.min_items,
                max: self.max_items,
            },
            unique: self.unique_items,
        }))
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.choices
            .as_ref()
            .map(|choices| compile_choices(choices, false))
            .transpose()
    }
}

/// Object data
///
/// With `properties`, objects are checked strictly: undeclared keys are
/// rejected. Without, any object is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    #[serde(flatten)]
    pub common: DataCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<NamedMap<Data>>,
    #[serde(default, rename = "sdfChoice", skip_serializing_if = "Option::is_none")]
    pub choices: Option<NamedMap<Data>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectData {
    pub fn is_required(&self, name: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|required| required.iter().any(|r| r == name))
    }
}

impl DataQualities for ObjectData {
    fn common(&self) -> &DataCommon {
        &self.common
    }

    fn base_validator(&self) -> Result<Validator> {
        let Some(properties) = &self.properties else {
            return Ok(Validator::Object(ObjectRules { properties: None }));
        };
        if let Some(name) = self
            .required
            .iter()
            .flatten()
            .find(|name| properties.get(name).is_none())
        {
            return Err(SdfError::InvalidDefinition(format!(
                "required property '{}' is not declared in properties",
                name
            )));
        }

        let rules = properties
            .iter()
            .map(|(name, data)| {
                Ok(PropertyRule {
                    name: name.to_string(),
                    validator: data.compile()?,
                    required: self.is_required(name),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Validator::Object(ObjectRules {
            properties: Some(rules),
        }))
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.choices
            .as_ref()
            .map(|choices| compile_choices(choices, false))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::DataValue;
    use serde_json::json;

    #[test]
    fn test_array_items() {
        let data: ArrayData = serde_json::from_value(json!({
            "minItems": 1,
            "maxItems": 3,
            "items": {"type": "integer", "minimum": 0}
        }))
        .unwrap();
        assert_eq!(
            data.validate(&json!([1, 2.0])).unwrap(),
            DataValue::Array(vec![DataValue::Integer(1), DataValue::Integer(2)])
        );
        assert!(data.validate(&json!([])).is_err());
        assert!(data.validate(&json!([1, 2, 3, 4])).is_err());

        let err = data.validate(&json!([1, -1])).unwrap_err();
        assert_eq!(err.as_validation().unwrap().path, "$[1]");
    }

    #[test]
    fn test_array_without_items() {
        let data = ArrayData {
            unique_items: true,
            ..Default::default()
        };
        assert!(matches!(
            data.validate(&json!([1, "1"])).unwrap(),
            DataValue::Set(_)
        ));
        assert!(data.validate(&json!(["a", "a"])).is_err());
        assert!(data.validate(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_object_properties() {
        let data: ObjectData = serde_json::from_value(json!({
            "required": ["x"],
            "properties": {
                "x": {"type": "number", "nullable": false},
                "y": {"type": "number", "default": 0},
                "z": {"type": "string"}
            }
        }))
        .unwrap();

        let DataValue::Object(fields) = data.validate(&json!({"x": 1})).unwrap() else {
            panic!("expected an object");
        };
        assert_eq!(fields["x"], DataValue::Number(1.0));
        assert_eq!(fields["y"], DataValue::Number(0.0));
        assert!(!fields.contains_key("z"));

        let err = data.validate(&json!({"y": 1})).unwrap_err();
        assert!(err.as_validation().unwrap().is_missing());

        let err = data.validate(&json!({"x": 1, "w": 2})).unwrap_err();
        assert_eq!(err.as_validation().unwrap().path, "$.w");

        let err = data.validate(&json!({"x": null})).unwrap_err();
        assert_eq!(err.as_validation().unwrap().path, "$.x");
    }

    #[test]
    fn test_undeclared_required_property() {
        let data: ObjectData = serde_json::from_value(json!({
            "required": ["x", "typo"],
            "properties": {"x": {"type": "number"}}
        }))
        .unwrap();
        assert!(matches!(
            data.compile(),
            Err(SdfError::InvalidDefinition(msg)) if msg.contains("'typo'")
        ));
        assert!(data.validate(&json!({"x": 1})).is_err());

        // Nothing to check against without properties
        let data: ObjectData = serde_json::from_value(json!({"required": ["x"]})).unwrap();
        assert!(data.validate(&json!({})).is_ok());
    }

    #[test]
    fn test_free_form_object() {
        let data = ObjectData::default();
        assert!(data.validate(&json!({"anything": [1, 2]})).is_ok());
        assert!(data.validate(&json!([1])).is_err());
    }
}
