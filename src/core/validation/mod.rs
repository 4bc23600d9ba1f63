//! Validation of graph data against a handle's dictionary
//!
//! [`validate`] is the adapter the fixture pipeline calls: it compiles the
//! dictionary into a [`ValidationSchema`] and hands it to a
//! [`SchemaValidator`]. The default validator is [`StructuralValidator`];
//! sessions can plug in their own.

pub mod schema;
pub mod structural;
pub mod validators;

pub use schema::{LabelRules, PropertyCheck, ValidationSchema};
pub use structural::StructuralValidator;

use crate::core::data::GraphData;
use crate::core::dictionary::Dictionary;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Violation {
    /// Where in the graph data (e.g. `nodes[2].name`)
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Structural validator for graph data
pub trait SchemaValidator: Send + Sync {
    /// Return every violation found; an empty set means valid
    fn validate(&self, data: &GraphData, schema: &ValidationSchema) -> BTreeSet<Violation>;
}

/// Validate graph data against a dictionary
pub fn validate(
    data: &GraphData,
    dictionary: &Dictionary,
    validator: &dyn SchemaValidator,
) -> BTreeSet<Violation> {
    let schema = ValidationSchema::from_dictionary(dictionary);
    validator.validate(data, &schema)
}
