//! Compiled validators
//!
//! Data qualities compile into a [`Validator`] tree once; the tree then checks
//! and coerces any number of JSON inputs into [`DataValue`]s. Errors carry the
//! location of the offending value as a path from the input root (`$`), e.g.
//! `$.settings.levels[2]`.

pub mod format;
pub mod value;

pub use format::StringFormat;
pub use value::DataValue;

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;
use crate::loader::json_type_name;

/// A compiled check over JSON input
#[derive(Debug, Clone)]
pub enum Validator {
    /// Accepts everything as is
    Any,
    Boolean,
    /// Accepts exactly one value
    Const { literal: Value, value: DataValue },
    Choice(ChoiceRules),
    Number(NumberRange),
    /// `unix-time` numbers, as epoch seconds or RFC 3339 text
    Timestamp(NumberRange),
    Integer(IntegerRange),
    /// String restricted to an `enum` list
    Enum(Vec<String>),
    String(StringRules),
    /// Base64url byte strings, lengths counted in decoded bytes
    Bytes(LengthRange),
    Array(ArrayRules),
    Object(ObjectRules),
    /// Supplies `default` when no value is given
    Default {
        inner: Box<Validator>,
        default: DataValue,
    },
    /// Lets `null` through
    Nullable(Box<Validator>),
    /// Rejects `null`
    NonNull(Box<Validator>),
}

impl Validator {
    /// Validate a value
    pub fn validate(&self, input: &Value) -> Result<DataValue, ValidationError> {
        self.validate_at(input, "$")
    }

    /// Validate a value that may be absent
    pub fn validate_option(&self, input: Option<&Value>) -> Result<DataValue, ValidationError> {
        match input {
            Some(input) => self.validate(input),
            None => self.validate_missing(),
        }
    }

    /// The value to use when none is given: the default, if there is one
    pub fn validate_missing(&self) -> Result<DataValue, ValidationError> {
        self.missing_at("$")
    }

    fn missing_at(&self, path: &str) -> Result<DataValue, ValidationError> {
        match self {
            Validator::Default { default, .. } => Ok(default.clone()),
            Validator::Nullable(inner) | Validator::NonNull(inner) => inner.missing_at(path),
            _ => Err(ValidationError::missing(path)),
        }
    }

    fn validate_at(&self, input: &Value, path: &str) -> Result<DataValue, ValidationError> {
        match self {
            Validator::Any => Ok(DataValue::from_json(input)),
            Validator::Boolean => input
                .as_bool()
                .map(DataValue::Bool)
                .ok_or_else(|| type_error(path, "a boolean", input)),
            Validator::Const { literal, value } => {
                if json_eq(input, literal) {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::invalid(
                        path,
                        format!("expected constant {}", literal),
                    ))
                }
            }
            Validator::Choice(rules) => rules.validate(input, path),
            Validator::Number(range) => {
                let number = input
                    .as_f64()
                    .ok_or_else(|| type_error(path, "a number", input))?;
                range.check(number, path)?;
                Ok(DataValue::Number(number))
            }
            Validator::Timestamp(range) => {
                let ts = format::parse_timestamp(input, path)?;
                range.check(format::epoch_seconds(&ts), path)?;
                Ok(DataValue::Timestamp(ts))
            }
            Validator::Integer(range) => {
                let integer = as_integer(input, path)?;
                range.check(integer, path)?;
                Ok(DataValue::Integer(integer))
            }
            Validator::Enum(values) => {
                let text = input
                    .as_str()
                    .ok_or_else(|| type_error(path, "a string", input))?;
                if values.iter().any(|v| v == text) {
                    Ok(DataValue::String(text.to_string()))
                } else {
                    Err(ValidationError::invalid(
                        path,
                        format!("'{}' is not one of {}", text, values.join(", ")),
                    ))
                }
            }
            Validator::String(rules) => rules.validate(input, path),
            Validator::Bytes(length) => {
                let text = input
                    .as_str()
                    .ok_or_else(|| type_error(path, "a byte string", input))?;
                let bytes = format::decode_bytes(text).ok_or_else(|| {
                    ValidationError::invalid(path, "not a base64url byte string")
                })?;
                length.check(bytes.len(), path, "bytes")?;
                Ok(DataValue::Bytes(bytes))
            }
            Validator::Array(rules) => rules.validate(input, path),
            Validator::Object(rules) => rules.validate(input, path),
            Validator::Default { inner, .. } => inner.validate_at(input, path),
            Validator::Nullable(inner) => {
                if input.is_null() {
                    Ok(DataValue::Null)
                } else {
                    inner.validate_at(input, path)
                }
            }
            Validator::NonNull(inner) => {
                if input.is_null() {
                    Err(ValidationError::invalid(path, "null is not allowed"))
                } else {
                    inner.validate_at(input, path)
                }
            }
        }
    }
}

/// Bounds on a number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberRange {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl NumberRange {
    fn check(&self, value: f64, path: &str) -> Result<(), ValidationError> {
        if let Some(min) = self.minimum {
            if value < min {
                return Err(bound_error(path, value, ">=", min));
            }
        }
        if let Some(max) = self.maximum {
            if value > max {
                return Err(bound_error(path, value, "<=", max));
            }
        }
        if let Some(min) = self.exclusive_minimum {
            if value <= min {
                return Err(bound_error(path, value, ">", min));
            }
        }
        if let Some(max) = self.exclusive_maximum {
            if value >= max {
                return Err(bound_error(path, value, "<", max));
            }
        }
        if let Some(step) = self.multiple_of {
            if step != 0.0 && value % step != 0.0 {
                return Err(ValidationError::invalid(
                    path,
                    format!("{} is not a multiple of {}", value, step),
                ));
            }
        }
        Ok(())
    }
}

/// Bounds on an integer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegerRange {
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
    pub exclusive_minimum: Option<i64>,
    pub exclusive_maximum: Option<i64>,
    pub multiple_of: Option<i64>,
}

impl IntegerRange {
    fn check(&self, value: i64, path: &str) -> Result<(), ValidationError> {
        if let Some(min) = self.minimum {
            if value < min {
                return Err(bound_error(path, value, ">=", min));
            }
        }
        if let Some(max) = self.maximum {
            if value > max {
                return Err(bound_error(path, value, "<=", max));
            }
        }
        if let Some(min) = self.exclusive_minimum {
            if value <= min {
                return Err(bound_error(path, value, ">", min));
            }
        }
        if let Some(max) = self.exclusive_maximum {
            if value >= max {
                return Err(bound_error(path, value, "<", max));
            }
        }
        if let Some(step) = self.multiple_of {
            if matches!(value.checked_rem(step), Some(r) if r != 0) {
                return Err(ValidationError::invalid(
                    path,
                    format!("{} is not a multiple of {}", value, step),
                ));
            }
        }
        Ok(())
    }
}

/// Inclusive bounds on a length
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LengthRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl LengthRange {
    fn check(&self, len: usize, path: &str, unit: &str) -> Result<(), ValidationError> {
        if len < self.min {
            return Err(ValidationError::invalid(
                path,
                format!("must have at least {} {}, got {}", self.min, unit, len),
            ));
        }
        if let Some(max) = self.max {
            if len > max {
                return Err(ValidationError::invalid(
                    path,
                    format!("must have at most {} {}, got {}", max, unit, len),
                ));
            }
        }
        Ok(())
    }
}

/// Checks on text
#[derive(Debug, Clone, Default)]
pub struct StringRules {
    /// Length in characters
    pub length: LengthRange,
    pub pattern: Option<Regex>,
    pub format: Option<StringFormat>,
}

impl StringRules {
    fn validate(&self, input: &Value, path: &str) -> Result<DataValue, ValidationError> {
        let text = input
            .as_str()
            .ok_or_else(|| type_error(path, "a string", input))?;
        self.length.check(text.chars().count(), path, "characters")?;
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(text) {
                return Err(ValidationError::invalid(
                    path,
                    format!("'{}' does not match pattern {}", text, pattern.as_str()),
                ));
            }
        }
        match &self.format {
            Some(format) => format.parse(text, path),
            None => Ok(DataValue::String(text.to_string())),
        }
    }
}

/// Checks on a list
#[derive(Debug, Clone)]
pub struct ArrayRules {
    pub items: Box<Validator>,
    pub length: LengthRange,
    pub unique: bool,
}

impl ArrayRules {
    fn validate(&self, input: &Value, path: &str) -> Result<DataValue, ValidationError> {
        let items = input
            .as_array()
            .ok_or_else(|| type_error(path, "an array", input))?;
        self.length.check(items.len(), path, "items")?;

        let mut values = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let value = self.items.validate_at(item, &format!("{}[{}]", path, i))?;
            // Compared as written, so 1 and 1.0 are the same item
            if self.unique && items[..i].iter().any(|prev| json_eq(prev, item)) {
                return Err(ValidationError::invalid(
                    format!("{}[{}]", path, i),
                    "duplicate item",
                ));
            }
            values.push(value);
        }

        if self.unique {
            Ok(DataValue::Set(values))
        } else {
            Ok(DataValue::Array(values))
        }
    }
}

/// A declared object property
#[derive(Debug, Clone)]
pub struct PropertyRule {
    pub name: String,
    pub validator: Validator,
    pub required: bool,
}

/// Checks on a record
#[derive(Debug, Clone, Default)]
pub struct ObjectRules {
    /// Declared properties; `None` accepts any object
    pub properties: Option<Vec<PropertyRule>>,
}

impl ObjectRules {
    fn validate(&self, input: &Value, path: &str) -> Result<DataValue, ValidationError> {
        let map = input
            .as_object()
            .ok_or_else(|| type_error(path, "an object", input))?;
        let Some(properties) = &self.properties else {
            return Ok(DataValue::from_json(input));
        };

        if let Some(unknown) = map
            .keys()
            .find(|key| !properties.iter().any(|p| &p.name == *key))
        {
            return Err(ValidationError::invalid(
                format!("{}.{}", path, unknown),
                "unexpected property",
            ));
        }

        let mut fields = BTreeMap::new();
        for property in properties {
            let child = format!("{}.{}", path, property.name);
            let value = match map.get(&property.name) {
                Some(value) => property.validator.validate_at(value, &child)?,
                None => match property.validator.missing_at(&child) {
                    Ok(default) => default,
                    Err(e) if property.required => return Err(e),
                    Err(_) => continue,
                },
            };
            fields.insert(property.name.clone(), value);
        }
        Ok(DataValue::Object(fields))
    }
}

/// Alternatives of an `sdfChoice`, tried in declaration order
#[derive(Debug, Clone, Default)]
pub struct ChoiceRules {
    pub alternatives: Vec<(String, Validator)>,
    /// Choice names by their `const` value
    pub members: Vec<(String, DataValue)>,
}

impl ChoiceRules {
    fn validate(&self, input: &Value, path: &str) -> Result<DataValue, ValidationError> {
        let value = self
            .alternatives
            .iter()
            .find_map(|(_, validator)| validator.validate_at(input, path).ok())
            .ok_or_else(|| {
                let names: Vec<&str> = self.alternatives.iter().map(|(n, _)| n.as_str()).collect();
                ValidationError::invalid(
                    path,
                    format!("does not match any of {}", names.join(", ")),
                )
            })?;

        match self.members.iter().find(|(_, member)| *member == value) {
            Some((name, _)) => Ok(DataValue::Choice {
                name: name.clone(),
                value: Box::new(value),
            }),
            None => Ok(value),
        }
    }
}

pub(crate) fn type_error(path: &str, expected: &str, input: &Value) -> ValidationError {
    ValidationError::invalid(
        path,
        format!("expected {}, got {}", expected, json_type_name(input)),
    )
}

fn bound_error<T: std::fmt::Display>(path: &str, value: T, op: &str, bound: T) -> ValidationError {
    ValidationError::invalid(path, format!("{} must be {} {}", value, op, bound))
}

/// Integers, including floats without a fraction
pub(crate) fn as_integer(input: &Value, path: &str) -> Result<i64, ValidationError> {
    let Value::Number(number) = input else {
        return Err(type_error(path, "an integer", input));
    };
    if let Some(i) = number.as_i64() {
        return Ok(i);
    }
    if number.is_u64() {
        return Err(ValidationError::invalid(path, format!("{} is out of range", number)));
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            Err(ValidationError::invalid(path, format!("{} is out of range", number)))
        }
        _ => Err(ValidationError::invalid(
            path,
            format!("expected an integer, got {}", number),
        )),
    }
}

/// JSON equality where `1` and `1.0` are the same number
pub(crate) fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| json_eq(value, other)))
        }
        _ => a == b,
    }
}
