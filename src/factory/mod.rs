//! Mock data factory
//!
//! Turns resolved [`GraphData`] into persisted [`Node`]s for one test and
//! removes them again afterwards. Node generation itself is delegated to a
//! [`GraphFactory`] backend; the default is [`DictionaryGraphFactory`].

pub mod generator;

pub use generator::DictionaryGraphFactory;

use crate::config::DatabaseDriverConfig;
use crate::core::data::{EdgeRecord, GraphData, NodeRecord};
use crate::core::driver::{GraphDriver, GraphTransaction};
use crate::core::entity::{Node, UniqueKey};
use crate::core::error::{FixtureResult, StorageError};
use crate::core::extension::MarkExtension;
use crate::core::{Dictionary, ModelBinding};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Unique key value → position in a node list
///
/// Duplicate keys are not rejected; the last node with a key wins.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    positions: BTreeMap<String, usize>,
}

impl NodeIndex {
    pub fn build(nodes: &[NodeRecord], unique_key: UniqueKey) -> Self {
        let mut positions = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            let Some(key) = node.key(unique_key) else {
                continue;
            };
            if let Some(previous) = positions.insert(key.clone(), i) {
                tracing::debug!(key = %key, previous, current = i, "duplicate {} in graph data", unique_key);
            }
        }
        Self { positions }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Everything a [`GraphFactory`] needs to build nodes
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a ModelBinding,
    pub dictionary: &'a Dictionary,
    pub globals: &'a IndexMap<String, Value>,
    pub nodes: &'a [NodeRecord],
    pub edges: &'a [EdgeRecord],
    pub unique_key: UniqueKey,
    pub index: &'a NodeIndex,
    /// Fill every unset schema property
    pub all_props: bool,
}

/// Builds concrete nodes from node and edge records
pub trait GraphFactory: Send + Sync {
    /// Return one node per record, in record order, edges attached
    fn generate(&self, request: &GenerationRequest<'_>) -> anyhow::Result<Vec<Node>>;
}

/// Loads mock data into one handle and cleans it up again
pub struct MockDataFactory {
    driver: Arc<dyn GraphDriver>,
    model: ModelBinding,
    dictionary: Dictionary,
    globals: IndexMap<String, Value>,
    backend: Arc<dyn GraphFactory>,
    extension: Arc<dyn MarkExtension>,
    mock_data: Vec<Node>,
}

impl MockDataFactory {
    pub fn new(
        driver: Arc<dyn GraphDriver>,
        config: &DatabaseDriverConfig,
        backend: Arc<dyn GraphFactory>,
        extension: Arc<dyn MarkExtension>,
    ) -> Self {
        Self {
            driver,
            model: config.model(),
            dictionary: config.dictionary.clone(),
            globals: config.globals.clone(),
            backend,
            extension,
            mock_data: Vec::new(),
        }
    }

    /// Nodes persisted by the last [`from_source`](Self::from_source)
    pub fn mock_data(&self) -> &[Node] {
        &self.mock_data
    }

    /// Generate nodes for `data` and persist them in a single transaction
    ///
    /// Nothing is persisted unless every node is.
    pub async fn from_source(
        &mut self,
        data: &GraphData,
        unique_key: UniqueKey,
        mock_all_props: bool,
    ) -> FixtureResult<Vec<Node>> {
        let index = NodeIndex::build(&data.nodes, unique_key);
        let request = GenerationRequest {
            model: &self.model,
            dictionary: &self.dictionary,
            globals: &self.globals,
            nodes: &data.nodes,
            edges: &data.edges,
            unique_key,
            index: &index,
            all_props: mock_all_props,
        };
        let mut nodes = self
            .backend
            .generate(&request)
            .map_err(|e| StorageError::driver("failed to generate mock data", e))?;

        let mut tx = self
            .driver
            .begin()
            .await
            .map_err(|e| StorageError::driver("failed to begin transaction", e))?;

        if let Err(e) = self.persist(tx.as_mut(), &mut nodes).await {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            return Err(StorageError::driver("failed to persist mock data", e).into());
        }
        tx.commit()
            .await
            .map_err(|e| StorageError::driver("failed to commit mock data", e))?;

        self.mock_data = nodes.clone();

        // committed nodes must not outlive a failing post hook
        if let Err(e) = self.extension.post(&nodes) {
            if let Err(clean) = self.clean().await {
                tracing::warn!(error = %clean, "cleanup after failed post hook failed");
            }
            self.mock_data.clear();
            return Err(StorageError::driver("extension post hook failed", e).into());
        }

        tracing::debug!(count = nodes.len(), "mock data persisted");
        Ok(nodes)
    }

    async fn persist(
        &self,
        tx: &mut dyn GraphTransaction,
        nodes: &mut [Node],
    ) -> anyhow::Result<()> {
        self.extension.pre(nodes)?;
        for node in nodes.iter_mut() {
            self.extension.run(node)?;
            tx.add(node.clone()).await?;
        }
        Ok(())
    }

    /// Delete every node from the last load that still exists
    ///
    /// Nodes already deleted (e.g. by the test itself) are skipped, so
    /// calling this twice is fine. Returns how many were deleted.
    pub async fn clean(&self) -> FixtureResult<usize> {
        let mut tx = self
            .driver
            .begin()
            .await
            .map_err(|e| StorageError::driver("failed to begin transaction", e))?;

        let mut deleted = 0;
        for node in &self.mock_data {
            let existing = tx
                .get(&node.node_id)
                .await
                .map_err(|e| StorageError::driver(format!("failed to fetch '{}'", node.node_id), e))?;
            if existing.is_some()
                && tx
                    .delete(&node.node_id)
                    .await
                    .map_err(|e| StorageError::driver(format!("failed to delete '{}'", node.node_id), e))?
            {
                deleted += 1;
            }
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::driver("failed to commit cleanup", e))?;
        tracing::debug!(deleted, "mock data cleaned");
        Ok(deleted)
    }
}
