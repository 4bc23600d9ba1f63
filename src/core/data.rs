//! Declarative graph data definitions
//!
//! This is the shape loaded from `.yaml`/`.json` resources or given inline:
//!
//! ```yaml
//! extends: base
//! unique_field: node_id
//! nodes:
//!   - label: mother
//!     node_id: dana-1
//!     name: Dana O.
//! edges:
//!   - src: dana-1
//!     dst: sn-1
//!     label: sons
//! summary:
//!   mother: 1
//! ```

use crate::core::entity::UniqueKey;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One node in a graph data definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub label: String,

    /// Every other key: identifiers and schema properties
    #[serde(flatten)]
    pub properties: IndexMap<String, Value>,
}

impl NodeRecord {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            properties: IndexMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Value of the unique key field, rendered as a string
    ///
    /// Numbers are accepted since YAML happily produces them for ids.
    pub fn key(&self, unique_key: UniqueKey) -> Option<String> {
        match self.properties.get(unique_key.field())? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// One edge in a graph data definition, endpoints given by unique key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src: String,
    pub dst: String,
    pub label: String,
}

impl EdgeRecord {
    pub fn new(src: impl Into<String>, dst: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            label: label.into(),
        }
    }
}

/// A complete graph data definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,

    #[serde(default)]
    pub edges: Vec<EdgeRecord>,

    /// Name of a base definition resolved from the same directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Free-form counters, summed across an extends chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<BTreeMap<String, i64>>,

    /// Overrides the directive's unique key when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_field: Option<UniqueKey>,
}

impl GraphData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: NodeRecord) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: EdgeRecord) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn with_unique_field(mut self, key: UniqueKey) -> Self {
        self.unique_field = Some(key);
        self
    }

    /// Lay this definition over `base`
    ///
    /// Nodes and edges keep base-then-derived order, summary counters are
    /// summed per key. The result no longer extends anything.
    pub fn merged_over(self, base: GraphData) -> GraphData {
        let mut nodes = base.nodes;
        nodes.extend(self.nodes);

        let mut edges = base.edges;
        edges.extend(self.edges);

        let summary = match (base.summary, self.summary) {
            (Some(mut merged), Some(derived)) => {
                for (key, count) in derived {
                    let total = merged.entry(key).or_insert(0);
                    *total = total.saturating_add(count);
                }
                Some(merged)
            }
            (base, derived) => base.or(derived),
        };

        GraphData {
            nodes,
            edges,
            extends: None,
            summary,
            unique_field: self.unique_field.or(base.unique_field),
        }
    }
}
