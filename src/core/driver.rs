//! Service traits for the graph storage driver
//!
//! The fixtures never talk to a database directly. They go through a
//! [`GraphDriver`] opened by a [`GraphConnector`], and write through
//! [`GraphTransaction`]s. The crate ships an in-memory implementation in
//! [`crate::storage`]; real backends implement the same traits.

use crate::config::DatabaseDriverConfig;
use crate::core::dictionary::Dictionary;
use crate::core::entity::Node;
use crate::core::model::ModelBinding;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the table holding nodes of `label`
pub fn node_table(namespace: Option<&str>, label: &str) -> String {
    qualify(namespace, &format!("node_{}", label))
}

/// Name of the table holding `link` edges leaving nodes of `src_label`
pub fn edge_table(namespace: Option<&str>, src_label: &str, link: &str) -> String {
    qualify(namespace, &format!("edge_{}_{}", src_label, link))
}

fn qualify(namespace: Option<&str>, table: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}_{}", ns, table),
        _ => table.to_string(),
    }
}

/// A set of tables whose schema is created and dropped together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBase {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

impl StorageBase {
    pub fn new(name: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }

    /// Tables for every bound label and each link it declares
    pub fn for_model(namespace: Option<&str>, model: &ModelBinding, dictionary: &Dictionary) -> Self {
        let mut tables = Vec::new();
        for label in model.labels() {
            tables.push(node_table(namespace, label));
            if let Some(definition) = dictionary.label(label) {
                for link in &definition.links {
                    tables.push(edge_table(namespace, label, &link.name));
                }
            }
        }
        Self {
            name: namespace.unwrap_or("default").to_string(),
            tables,
        }
    }
}

/// A handle to one graph database
#[async_trait]
pub trait GraphDriver: Send + Sync {
    /// Create the base's tables if they do not exist yet
    async fn create_schema(&self, base: &StorageBase) -> Result<()>;

    /// Drop the base's tables, ignoring the ones already gone
    async fn drop_schema(&self, base: &StorageBase) -> Result<()>;

    /// Every table created through this handle, in creation order
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Delete all rows of one table
    async fn truncate_table(&self, table: &str) -> Result<()>;

    /// Start a transaction
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>>;
}

/// A unit of work against a [`GraphDriver`]
///
/// Writes are invisible to other transactions until [`commit`](Self::commit).
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait GraphTransaction: Send + Sync {
    /// Stage a node and its outgoing edges
    async fn add(&mut self, node: Node) -> Result<()>;

    /// Get a node by id, with its outgoing edges
    async fn get(&self, node_id: &str) -> Result<Option<Node>>;

    /// Delete a node and every edge touching it; returns whether it existed
    async fn delete(&mut self, node_id: &str) -> Result<bool>;

    /// Count nodes, optionally of one label
    async fn count(&self, label: Option<&str>) -> Result<usize>;

    /// List nodes, optionally of one label
    async fn all(&self, label: Option<&str>) -> Result<Vec<Node>>;

    /// Nodes reached from `node_id` through edges labelled `edge_label`
    async fn related(&self, node_id: &str, edge_label: &str) -> Result<Vec<Node>>;

    /// Make staged writes visible; the transaction is closed afterwards
    async fn commit(&mut self) -> Result<()>;

    /// Discard staged writes; the transaction is closed afterwards
    async fn rollback(&mut self) -> Result<()>;
}

/// Opens drivers from handle configuration
#[async_trait]
pub trait GraphConnector: Send + Sync {
    async fn open(&self, name: &str, config: &DatabaseDriverConfig) -> Result<Arc<dyn GraphDriver>>;
}
