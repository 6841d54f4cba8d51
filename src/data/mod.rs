//! Data qualities
//!
//! `sdfData` definitions describe the values a property, an event payload or
//! a data type may take. Each [`Data`] variant compiles into a
//! [`Validator`](crate::validator::Validator), applying the same precedence
//! for every type: `const`, then `sdfChoice`, then the type's own
//! constraints. The result is wrapped to supply `default` and finally to
//! allow or reject `null`.

mod collection;
mod numeric;
mod string;

pub use collection::{ArrayData, ObjectData};
pub use numeric::{IntegerData, NumberData};
pub use string::StringData;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, SdfError};
use crate::named::NamedMap;
use crate::validator::{ChoiceRules, DataValue, Validator};
use crate::Definition;

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn is_true(value: &bool) -> bool {
    *value
}

pub(crate) fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Qualities shared by every data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "sdfRef", skip_serializing_if = "Option::is_none")]
    pub sdf_ref: Option<String>,
    /// Semantic refinement, e.g. `unix-time` or `byte-string`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdf_type: Option<String>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub nullable: bool,
    #[serde(default, rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Default for DataCommon {
    fn default() -> Self {
        Self {
            label: None,
            description: None,
            sdf_ref: None,
            sdf_type: None,
            nullable: true,
            const_: None,
            default: None,
        }
    }
}

/// The `type` tag of a data definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Number,
    Integer,
    String,
    Object,
    Array,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Number => "number",
            DataType::Integer => "integer",
            DataType::String => "string",
            DataType::Object => "object",
            DataType::Array => "array",
        }
    }
}

/// Compilation of data qualities into validators
pub trait DataQualities {
    fn common(&self) -> &DataCommon;

    /// Validator for the type's own constraints
    fn base_validator(&self) -> Result<Validator>;

    /// Validator over the `sdfChoice` alternatives, when there are any
    fn choice_validator(&self) -> Result<Option<Validator>> {
        Ok(None)
    }

    /// Convert a literal written in the definition (`const`, `default`) to
    /// the value validation of this type produces
    fn literal(&self, value: &Value) -> DataValue {
        DataValue::from_json(value)
    }

    /// Build the validator for these qualities
    fn compile(&self) -> Result<Validator> {
        let common = self.common();
        let mut validator = if let Some(literal) = &common.const_ {
            Validator::Const {
                literal: literal.clone(),
                value: self.literal(literal),
            }
        } else if let Some(choice) = self.choice_validator()? {
            choice
        } else {
            self.base_validator()?
        };

        if let Some(default) = &common.default {
            validator = Validator::Default {
                inner: Box::new(validator),
                default: self.literal(default),
            };
        }

        Ok(if common.nullable {
            Validator::Nullable(Box::new(validator))
        } else {
            Validator::NonNull(Box::new(validator))
        })
    }

    /// Validate and coerce a value
    fn validate(&self, input: &Value) -> Result<DataValue> {
        Ok(self.compile()?.validate(input)?)
    }

    /// The value to use when none is given
    fn validate_missing(&self) -> Result<DataValue> {
        Ok(self.compile()?.validate_missing()?)
    }
}

/// Build a validator over named alternatives
///
/// With `by_const`, a value matching an alternative's `const` is reported
/// under that alternative's name.
pub(crate) fn compile_choices<T: DataQualities>(
    choices: &NamedMap<T>,
    by_const: bool,
) -> Result<Validator> {
    if choices.is_empty() {
        return Err(SdfError::InvalidDefinition(
            "sdfChoice must have at least one alternative".to_string(),
        ));
    }

    let mut rules = ChoiceRules::default();
    for (name, choice) in choices.iter() {
        rules.alternatives.push((name.to_string(), choice.compile()?));
        if by_const {
            if let Some(literal) = &choice.common().const_ {
                rules
                    .members
                    .push((name.to_string(), choice.literal(literal)));
            }
        }
    }
    Ok(Validator::Choice(rules))
}

/// Boolean data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanData {
    #[serde(flatten)]
    pub common: DataCommon,
    #[serde(default, rename = "sdfChoice", skip_serializing_if = "Option::is_none")]
    pub choices: Option<NamedMap<Data>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataQualities for BooleanData {
    fn common(&self) -> &DataCommon {
        &self.common
    }

    fn base_validator(&self) -> Result<Validator> {
        Ok(Validator::Boolean)
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.choices
            .as_ref()
            .map(|choices| compile_choices(choices, false))
            .transpose()
    }
}

/// Data without a `type`, accepting any value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnyData {
    #[serde(flatten)]
    pub common: DataCommon,
    #[serde(default, rename = "sdfChoice", skip_serializing_if = "Option::is_none")]
    pub choices: Option<NamedMap<Data>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataQualities for AnyData {
    fn common(&self) -> &DataCommon {
        &self.common
    }

    fn base_validator(&self) -> Result<Validator> {
        Ok(Validator::Any)
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.choices
            .as_ref()
            .map(|choices| compile_choices(choices, false))
            .transpose()
    }
}

/// A data definition, tagged by its `type`
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Boolean(BooleanData),
    Number(NumberData),
    Integer(IntegerData),
    String(StringData),
    Object(ObjectData),
    Array(ArrayData),
    Any(AnyData),
}

impl Data {
    /// Read a (resolved) definition
    pub fn from_definition(definition: &Definition) -> Result<Self> {
        serde_json::from_value(Value::Object(definition.clone()))
            .map_err(|e| SdfError::InvalidDefinition(e.to_string()))
    }

    /// The `type` tag; `None` for untyped data
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Data::Boolean(_) => Some(DataType::Boolean),
            Data::Number(_) => Some(DataType::Number),
            Data::Integer(_) => Some(DataType::Integer),
            Data::String(_) => Some(DataType::String),
            Data::Object(_) => Some(DataType::Object),
            Data::Array(_) => Some(DataType::Array),
            Data::Any(_) => None,
        }
    }

    fn qualities(&self) -> &dyn DataQualities {
        match self {
            Data::Boolean(d) => d,
            Data::Number(d) => d,
            Data::Integer(d) => d,
            Data::String(d) => d,
            Data::Object(d) => d,
            Data::Array(d) => d,
            Data::Any(d) => d,
        }
    }
}

impl DataQualities for Data {
    fn common(&self) -> &DataCommon {
        self.qualities().common()
    }

    fn base_validator(&self) -> Result<Validator> {
        self.qualities().base_validator()
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.qualities().choice_validator()
    }

    fn literal(&self, value: &Value) -> DataValue {
        self.qualities().literal(value)
    }

    fn compile(&self) -> Result<Validator> {
        self.qualities().compile()
    }
}

impl<'de> Deserialize<'de> for Data {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;
        let data_type = match map.shift_remove("type") {
            None | Some(Value::Null) => None,
            Some(tag) => Some(DataType::deserialize(tag).map_err(D::Error::custom)?),
        };

        let value = Value::Object(map);
        let data = match data_type {
            Some(DataType::Boolean) => serde_json::from_value(value).map(Data::Boolean),
            Some(DataType::Number) => serde_json::from_value(value).map(Data::Number),
            Some(DataType::Integer) => serde_json::from_value(value).map(Data::Integer),
            Some(DataType::String) => serde_json::from_value(value).map(Data::String),
            Some(DataType::Object) => serde_json::from_value(value).map(Data::Object),
            Some(DataType::Array) => serde_json::from_value(value).map(Data::Array),
            None => serde_json::from_value(value).map(Data::Any),
        };
        data.map_err(D::Error::custom)
    }
}

impl Serialize for Data {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let body = match self {
            Data::Boolean(d) => serde_json::to_value(d),
            Data::Number(d) => serde_json::to_value(d),
            Data::Integer(d) => serde_json::to_value(d),
            Data::String(d) => serde_json::to_value(d),
            Data::Object(d) => serde_json::to_value(d),
            Data::Array(d) => serde_json::to_value(d),
            Data::Any(d) => serde_json::to_value(d),
        }
        .map_err(S::Error::custom)?;

        let mut map = Map::new();
        if let Some(data_type) = self.data_type() {
            map.insert("type".to_string(), Value::from(data_type.as_str()));
        }
        if let Value::Object(fields) = body {
            map.extend(fields);
        }
        map.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Data {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_dispatch_on_type() {
        assert!(matches!(data(json!({"type": "boolean"})), Data::Boolean(_)));
        assert!(matches!(data(json!({"type": "integer"})), Data::Integer(_)));
        assert!(matches!(data(json!({"label": "free"})), Data::Any(_)));
        assert!(matches!(data(json!({"type": null})), Data::Any(_)));
        assert!(serde_json::from_value::<Data>(json!({"type": "decimal"})).is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let source = json!({
            "type": "number",
            "label": "Temperature",
            "unit": "Cel",
            "minimum": -40.0,
            "nullable": false,
            "x-vendor": "acme"
        });
        let parsed = data(source.clone());
        let Data::Number(number) = &parsed else {
            panic!("expected number data");
        };
        assert_eq!(number.unit.as_deref(), Some("Cel"));
        assert!(!number.common.nullable);
        assert_eq!(number.extra["x-vendor"], json!("acme"));

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out, source);
        assert_eq!(out.as_object().unwrap().keys().next().unwrap(), "type");
    }

    #[test]
    fn test_nullable_default_omitted() {
        let out = serde_json::to_value(data(json!({"type": "boolean", "nullable": true}))).unwrap();
        assert_eq!(out, json!({"type": "boolean"}));
    }

    #[test]
    fn test_const_takes_precedence() {
        let d = data(json!({
            "type": "integer",
            "const": 5,
            "sdfChoice": {"One": {"const": 1}}
        }));
        assert_eq!(d.validate(&json!(5)).unwrap(), DataValue::Integer(5));
        assert!(d.validate(&json!(1)).is_err());
    }

    #[test]
    fn test_default_and_nullable() {
        let d = data(json!({"type": "boolean", "default": false}));
        assert_eq!(d.validate_missing().unwrap(), DataValue::Bool(false));
        assert_eq!(d.validate(&Value::Null).unwrap(), DataValue::Null);

        let d = data(json!({"type": "boolean", "nullable": false}));
        assert!(d.validate(&Value::Null).is_err());
        let err = d.validate_missing().unwrap_err();
        assert!(err.as_validation().unwrap().is_missing());
    }

    #[test]
    fn test_any_data() {
        let d = data(json!({}));
        assert_eq!(
            d.validate(&json!([1, "a"])).unwrap(),
            DataValue::Array(vec![DataValue::Integer(1), DataValue::String("a".to_string())])
        );
    }

    #[test]
    fn test_boolean_choices() {
        let d = data(json!({
            "type": "boolean",
            "sdfChoice": {
                "Yes": {"type": "boolean", "const": true},
                "Text": {"type": "string", "enum": ["yes", "no"]}
            }
        }));
        assert_eq!(d.validate(&json!(true)).unwrap(), DataValue::Bool(true));
        assert_eq!(
            d.validate(&json!("no")).unwrap(),
            DataValue::String("no".to_string())
        );
        assert!(d.validate(&json!(false)).is_err());
    }

    #[test]
    fn test_empty_choice_is_rejected() {
        let d = data(json!({"type": "boolean", "sdfChoice": {}}));
        assert!(matches!(d.compile(), Err(SdfError::InvalidDefinition(_))));
    }
}
