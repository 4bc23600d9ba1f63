//! Dictionary: label → structural schema
//!
//! The dictionary is the raw schema mapping a handle is configured with.
//! The validation layer compiles it into rules (see
//! [`ValidationSchema`](crate::core::validation::ValidationSchema)), the mock
//! data factory reads it to fill in properties, and the storage layer derives
//! table names from its labels and links.
//!
//! ```yaml
//! father:
//!   required: [name]
//!   properties:
//!     name: { type: string }
//!     age: { type: integer, minimum: 0 }
//!   links:
//!     - name: sons
//!       target_type: son
//! ```

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-schema style property types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// Schema for a single property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PropertyType>,

    /// Allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(rename = "minLength", default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// An outgoing link declared on a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDefinition {
    /// Association name, used as the edge label in graph data
    pub name: String,

    /// Label of the node on the other end
    pub target_type: String,

    /// Every node of the source label needs at least one such edge
    #[serde(default)]
    pub required: bool,
}

/// Structural schema for one label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelDefinition {
    #[serde(default)]
    pub properties: IndexMap<String, PropertyDefinition>,

    #[serde(default)]
    pub required: Vec<String>,

    #[serde(default)]
    pub links: Vec<LinkDefinition>,

    /// Accept properties the schema does not declare
    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: bool,
}

impl LabelDefinition {
    /// Find a declared link by name
    pub fn link(&self, name: &str) -> Option<&LinkDefinition> {
        self.links.iter().find(|link| link.name == name)
    }
}

/// Mapping of label → structural schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dictionary {
    pub schema: IndexMap<String, LabelDefinition>,
}

impl Dictionary {
    /// Load a dictionary from a YAML file
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load a dictionary from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let dictionary: Self = serde_yaml::from_str(yaml)?;
        Ok(dictionary)
    }

    /// All labels, in declaration order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.schema.keys().map(String::as_str)
    }

    pub fn label(&self, label: &str) -> Option<&LabelDefinition> {
        self.schema.get(label)
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }
}
