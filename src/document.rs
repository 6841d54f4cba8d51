//! Typed SDF documents
//!
//! A [`Document`] is read from a definition whose `sdfRef`s have been
//! resolved, so every data definition in it is self-contained.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::{default_true, is_true, Data, DataCommon, DataQualities};
use crate::error::{Result, SdfError};
use crate::named::NamedMap;
use crate::registry::Registry;
use crate::resolver::resolve;
use crate::validator::{DataValue, Validator};
use crate::{loader, Definition};

/// Document metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Information {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Information {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An `sdfProperty`: data plus interaction flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(flatten)]
    pub data: Data,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub readable: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub writable: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub observable: bool,
}

impl Property {
    pub fn new(data: Data) -> Self {
        Self {
            data,
            readable: true,
            writable: true,
            observable: true,
        }
    }
}

impl DataQualities for Property {
    fn common(&self) -> &DataCommon {
        self.data.common()
    }

    fn base_validator(&self) -> Result<Validator> {
        self.data.base_validator()
    }

    fn choice_validator(&self) -> Result<Option<Validator>> {
        self.data.choice_validator()
    }

    fn literal(&self, value: &Value) -> DataValue {
        self.data.literal(value)
    }

    fn compile(&self) -> Result<Validator> {
        self.data.compile()
    }
}

/// An `sdfEvent`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "sdfRef", skip_serializing_if = "Option::is_none")]
    pub sdf_ref: Option<String>,
    #[serde(default, rename = "sdfOutputData", skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Data>,
    #[serde(default, rename = "sdfData", skip_serializing_if = "NamedMap::is_empty")]
    pub data: NamedMap<Data>,
    #[serde(default, rename = "sdfRequired", skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An `sdfObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "sdfRef", skip_serializing_if = "Option::is_none")]
    pub sdf_ref: Option<String>,
    #[serde(default, rename = "sdfProperty", skip_serializing_if = "NamedMap::is_empty")]
    pub properties: NamedMap<Property>,
    #[serde(default, rename = "sdfEvent", skip_serializing_if = "NamedMap::is_empty")]
    pub events: NamedMap<Event>,
    #[serde(default, rename = "sdfData", skip_serializing_if = "NamedMap::is_empty")]
    pub data: NamedMap<Data>,
    #[serde(default, rename = "sdfRequired", skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An `sdfThing`, grouping objects and nested things
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "sdfRef", skip_serializing_if = "Option::is_none")]
    pub sdf_ref: Option<String>,
    #[serde(default, rename = "sdfThing", skip_serializing_if = "NamedMap::is_empty")]
    pub things: NamedMap<Thing>,
    #[serde(default, rename = "sdfObject", skip_serializing_if = "NamedMap::is_empty")]
    pub objects: NamedMap<Object>,
    #[serde(default, rename = "sdfProperty", skip_serializing_if = "NamedMap::is_empty")]
    pub properties: NamedMap<Property>,
    #[serde(default, rename = "sdfEvent", skip_serializing_if = "NamedMap::is_empty")]
    pub events: NamedMap<Event>,
    #[serde(default, rename = "sdfData", skip_serializing_if = "NamedMap::is_empty")]
    pub data: NamedMap<Data>,
    #[serde(default, rename = "sdfRequired", skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A complete SDF document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Information::is_empty")]
    pub info: Information,
    /// Prefix to namespace URI
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespace: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<String>,
    #[serde(default, rename = "sdfThing", skip_serializing_if = "NamedMap::is_empty")]
    pub things: NamedMap<Thing>,
    #[serde(default, rename = "sdfObject", skip_serializing_if = "NamedMap::is_empty")]
    pub objects: NamedMap<Object>,
    #[serde(default, rename = "sdfProperty", skip_serializing_if = "NamedMap::is_empty")]
    pub properties: NamedMap<Property>,
    #[serde(default, rename = "sdfEvent", skip_serializing_if = "NamedMap::is_empty")]
    pub events: NamedMap<Event>,
    #[serde(default, rename = "sdfData", skip_serializing_if = "NamedMap::is_empty")]
    pub data: NamedMap<Data>,
}

impl Document {
    /// Read a resolved definition
    pub fn from_definition(definition: Definition) -> Result<Self> {
        serde_json::from_value(Value::Object(definition))
            .map_err(|e| SdfError::InvalidDefinition(e.to_string()))
    }

    /// Parse, resolve and read a document
    pub fn parse(content: &str, registry: &dyn Registry) -> Result<Self> {
        let definition = loader::load_str(content)?;
        Self::from_definition(resolve(&definition, registry)?)
    }

    /// Load, resolve and read a document file
    pub fn load(path: impl AsRef<Path>, registry: &dyn Registry) -> Result<Self> {
        let definition = loader::load_file(path)?;
        Self::from_definition(resolve(&definition, registry)?)
    }

    /// The namespace URI the document contributes to
    pub fn namespace_uri(&self) -> Option<&str> {
        self.default_namespace
            .as_ref()
            .and_then(|prefix| self.namespace.get(prefix))
            .map(String::as_str)
    }

    /// Serialize to pretty-printed JSON, omitting default values
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NullRegistry;
    use serde_json::json;

    const LIGHT: &str = r##"{
        "info": {"title": "Light", "version": "2024-03-01", "modified": "2024-03-01T10:00:00Z"},
        "namespace": {"ex": "https://example.com/light"},
        "defaultNamespace": "ex",
        "sdfObject": {
            "Light": {
                "sdfProperty": {
                    "brightness": {
                        "sdfRef": "#/sdfData/Percent",
                        "writable": false
                    },
                    "on": {"type": "boolean"}
                },
                "sdfEvent": {
                    "overheated": {
                        "sdfOutputData": {"type": "number", "unit": "Cel"}
                    }
                }
            }
        },
        "sdfData": {
            "Percent": {"type": "integer", "minimum": 0, "maximum": 100, "unit": "%"}
        }
    }"##;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(LIGHT, &NullRegistry).unwrap();
        assert_eq!(doc.info.title.as_deref(), Some("Light"));
        assert_eq!(doc.namespace_uri(), Some("https://example.com/light"));
        assert!(doc.info.modified.is_some());

        let light = doc.objects.get("Light").unwrap();
        let brightness = light.properties.get("brightness").unwrap();
        assert!(!brightness.writable);
        assert!(brightness.readable);
        let Data::Integer(percent) = &brightness.data else {
            panic!("expected integer data");
        };
        assert_eq!(percent.maximum, Some(100));
        assert_eq!(percent.common.sdf_ref, None);
        assert_eq!(percent.unit.as_deref(), Some("%"));
        assert!(brightness.validate(&json!(101)).is_err());
        assert_eq!(brightness.validate(&json!(42)).unwrap(), DataValue::Integer(42));

        let event = light.events.get("overheated").unwrap();
        assert!(matches!(event.output_data, Some(Data::Number(_))));
    }

    #[test]
    fn test_declaration_order() {
        let doc = Document::parse(LIGHT, &NullRegistry).unwrap();
        let light = doc.objects.get("Light").unwrap();
        assert_eq!(
            light.properties.keys().collect::<Vec<_>>(),
            ["brightness", "on"]
        );
    }

    #[test]
    fn test_to_json_omits_defaults() {
        let mut doc = Document::default();
        doc.properties.insert(
            "on",
            Property::new(Data::Boolean(Default::default())),
        );
        let json: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"sdfProperty": {"on": {"type": "boolean"}}}));
    }

    #[test]
    fn test_camel_case_output() {
        let doc = Document {
            default_namespace: Some("ex".to_string()),
            ..Default::default()
        };
        let json: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json, json!({"defaultNamespace": "ex"}));
    }

    #[test]
    fn test_invalid_document() {
        let err = Document::parse(r#"{"sdfData": {"X": {"type": "decimal"}}}"#, &NullRegistry)
            .unwrap_err();
        assert!(matches!(err, SdfError::InvalidDefinition(_)));
    }
}
