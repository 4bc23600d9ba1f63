//! Persisted graph entities
//!
//! A [`Node`] is what the mock data factory produces and what the graph
//! driver stores. Outgoing edges travel with their source node and are
//! written in the same transaction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Field holding a node's primary identifier
pub const NODE_ID: &str = "node_id";

/// Field holding a node's submitter-facing identifier
pub const SUBMITTER_ID: &str = "submitter_id";

/// Which field identifies nodes inside one graph data definition
///
/// Edges reference their endpoints by this field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueKey {
    #[default]
    NodeId,
    SubmitterId,
}

impl UniqueKey {
    /// Name of the property this key reads
    pub fn field(&self) -> &'static str {
        match self {
            UniqueKey::NodeId => NODE_ID,
            UniqueKey::SubmitterId => SUBMITTER_ID,
        }
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

impl FromStr for UniqueKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            NODE_ID => Ok(UniqueKey::NodeId),
            SUBMITTER_ID => Ok(UniqueKey::SubmitterId),
            other => Err(format!(
                "unknown unique key '{}', expected '{}' or '{}'",
                other, NODE_ID, SUBMITTER_ID
            )),
        }
    }
}

/// A directed, labelled edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Link name on the source label (e.g. "sons")
    pub label: String,
    pub src_id: String,
    pub dst_id: String,
    /// Label of the destination node
    pub dst_label: String,
}

/// A graph node as stored by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: String,
    pub label: String,
    pub properties: IndexMap<String, Value>,
    /// Outgoing edges
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Node {
    /// Create a node without properties
    pub fn new(node_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            label: label.into(),
            properties: IndexMap::new(),
            edges: Vec::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Get a property as a string slice, if it is one
    pub fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Attach an outgoing edge to `dst`
    pub fn link_to(&mut self, label: impl Into<String>, dst: &Node) {
        self.edges.push(Edge {
            label: label.into(),
            src_id: self.node_id.clone(),
            dst_id: dst.node_id.clone(),
            dst_label: dst.label.clone(),
        });
    }
}
