//! Compiles a [`Dictionary`] into the rules validators run
//!
//! Compilation is cheap and done on every validation call; nothing is cached.

use super::validators;
use crate::core::dictionary::{Dictionary, LabelDefinition, PropertyDefinition};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A compiled property check
pub type PropertyCheck = Arc<dyn Fn(&str, &Value) -> Result<(), String> + Send + Sync>;

/// Compiled rules for one label
#[derive(Clone, Default)]
pub struct LabelRules {
    pub required: Vec<String>,
    pub properties: BTreeMap<String, Vec<PropertyCheck>>,
    /// Link name → target label
    pub links: BTreeMap<String, String>,
    /// Links every node of the label must have
    pub required_links: Vec<String>,
    pub additional_properties: bool,
}

impl fmt::Debug for LabelRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelRules")
            .field("required", &self.required)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("links", &self.links)
            .field("required_links", &self.required_links)
            .field("additional_properties", &self.additional_properties)
            .finish()
    }
}

/// The structural schema handed to a [`SchemaValidator`](super::SchemaValidator)
#[derive(Debug, Clone, Default)]
pub struct ValidationSchema {
    pub labels: BTreeMap<String, LabelRules>,
    /// Schema problems found while compiling (e.g. a bad pattern)
    pub errors: Vec<String>,
}

impl ValidationSchema {
    /// Compile the dictionary's per-label schemas
    pub fn from_dictionary(dictionary: &Dictionary) -> Self {
        let mut schema = ValidationSchema::default();
        for (label, definition) in &dictionary.schema {
            let rules = compile_label(label, definition, &mut schema.errors);
            schema.labels.insert(label.clone(), rules);
        }
        schema
    }

    pub fn label(&self, label: &str) -> Option<&LabelRules> {
        self.labels.get(label)
    }
}

fn compile_label(label: &str, definition: &LabelDefinition, errors: &mut Vec<String>) -> LabelRules {
    let properties = definition
        .properties
        .iter()
        .map(|(name, property)| {
            let checks = compile_property(property).unwrap_or_else(|e| {
                errors.push(format!("{}.{}: {}", label, name, e));
                Vec::new()
            });
            (name.clone(), checks)
        })
        .collect();

    LabelRules {
        required: definition.required.clone(),
        properties,
        links: definition
            .links
            .iter()
            .map(|link| (link.name.clone(), link.target_type.clone()))
            .collect(),
        required_links: definition
            .links
            .iter()
            .filter(|link| link.required)
            .map(|link| link.name.clone())
            .collect(),
        additional_properties: definition.additional_properties,
    }
}

fn compile_property(property: &PropertyDefinition) -> Result<Vec<PropertyCheck>, regex::Error> {
    let mut checks: Vec<PropertyCheck> = Vec::new();

    if let Some(kind) = property.kind {
        checks.push(Arc::new(validators::of_type(kind)));
    }
    if let Some(allowed) = &property.allowed {
        checks.push(Arc::new(validators::in_list(allowed.clone())));
    }
    if let Some(pattern) = &property.pattern {
        checks.push(Arc::new(validators::pattern(Regex::new(pattern)?)));
    }
    if property.min_length.is_some() || property.max_length.is_some() {
        checks.push(Arc::new(validators::string_length(
            property.min_length,
            property.max_length,
        )));
    }
    if property.minimum.is_some() || property.maximum.is_some() {
        checks.push(Arc::new(validators::range(property.minimum, property.maximum)));
    }

    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DICTIONARY: &str = r#"
father:
  required: [name]
  properties:
    name: { type: string, minLength: 2 }
    code: { type: string, pattern: "[" }
  links:
    - name: sons
      target_type: son
son:
  additionalProperties: true
  properties:
    name: { type: string }
"#;

    #[test]
    fn test_compiles_rules_per_label() {
        let dictionary = Dictionary::from_yaml_str(DICTIONARY).unwrap();
        let schema = ValidationSchema::from_dictionary(&dictionary);

        let father = schema.label("father").unwrap();
        assert_eq!(father.required, vec!["name".to_string()]);
        assert_eq!(father.links.get("sons"), Some(&"son".to_string()));
        assert_eq!(father.properties["name"].len(), 2);

        let checks = &father.properties["name"];
        assert!(checks.iter().all(|c| c("name", &json!("Samson")).is_ok()));
        assert!(checks.iter().any(|c| c("name", &json!("S")).is_err()));

        assert!(schema.label("son").unwrap().additional_properties);
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let dictionary = Dictionary::from_yaml_str(DICTIONARY).unwrap();
        let schema = ValidationSchema::from_dictionary(&dictionary);

        assert_eq!(schema.errors.len(), 1);
        assert!(schema.errors[0].starts_with("father.code"));
        assert!(schema.label("father").unwrap().properties["code"].is_empty());
    }
}
