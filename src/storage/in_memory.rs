//! In-memory implementation of GraphDriver for testing and development
//!
//! Behaves like a small relational store: nodes live in `node_<label>`
//! tables, edges in `edge_<label>_<link>` tables, and writing to a table that
//! was never created fails. Transactions work on a private copy of the store
//! and swap it in on commit, so a failed commit leaves nothing behind.
//! Edge endpoints are checked at commit time, like a deferred foreign key.
//! Handles opened on the same database share one store but each only sees
//! the tables created through its own namespace.

use crate::config::DatabaseDriverConfig;
use crate::core::driver::{
    GraphConnector, GraphDriver, GraphTransaction, StorageBase, edge_table, node_table,
};
use crate::core::entity::{Edge, Node};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug, Clone)]
enum Row {
    Node(Node),
    Edge(Edge),
}

/// One table and the namespaces that created it
#[derive(Debug, Clone, Default)]
struct Table {
    owners: BTreeSet<Option<String>>,
    rows: BTreeMap<String, Row>,
}

impl Table {
    fn owned_by(&self, namespace: Option<&str>) -> bool {
        self.owners.iter().any(|owner| owner.as_deref() == namespace)
    }
}

/// Table name → rows keyed by node id or `src->dst`
///
/// Every lookup is limited to the tables owned by one namespace.
#[derive(Debug, Clone, Default)]
struct Tables {
    tables: IndexMap<String, Table>,
}

impl Tables {
    fn owned<'a>(&'a self, namespace: Option<&'a str>) -> impl Iterator<Item = (&'a String, &'a Table)> + 'a {
        self.tables
            .iter()
            .filter(move |(_, table)| table.owned_by(namespace))
    }

    fn table_mut(&mut self, namespace: Option<&str>, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .filter(|table| table.owned_by(namespace))
            .ok_or_else(|| anyhow!("relation \"{}\" does not exist", name))
    }

    fn nodes<'a>(&'a self, namespace: Option<&'a str>) -> impl Iterator<Item = &'a Node> + 'a {
        self.owned(namespace)
            .flat_map(|(_, table)| table.rows.values())
            .filter_map(|row| match row {
                Row::Node(node) => Some(node),
                Row::Edge(_) => None,
            })
    }

    fn edges<'a>(&'a self, namespace: Option<&'a str>) -> impl Iterator<Item = &'a Edge> + 'a {
        self.owned(namespace)
            .flat_map(|(_, table)| table.rows.values())
            .filter_map(|row| match row {
                Row::Edge(edge) => Some(edge),
                Row::Node(_) => None,
            })
    }

    fn find(&self, namespace: Option<&str>, node_id: &str) -> Option<Node> {
        let mut node = self.nodes(namespace).find(|n| n.node_id == node_id)?.clone();
        node.edges = self
            .edges(namespace)
            .filter(|e| e.src_id == node_id)
            .cloned()
            .collect();
        Some(node)
    }

    fn insert(&mut self, namespace: Option<&str>, mut node: Node) -> Result<()> {
        let edges = std::mem::take(&mut node.edges);
        for edge in edges {
            let table = edge_table(namespace, &node.label, &edge.label);
            let key = format!("{}->{}", edge.src_id, edge.dst_id);
            self.table_mut(namespace, &table)?
                .rows
                .insert(key, Row::Edge(edge));
        }
        let table = node_table(namespace, &node.label);
        self.table_mut(namespace, &table)?
            .rows
            .insert(node.node_id.clone(), Row::Node(node));
        Ok(())
    }

    fn remove(&mut self, namespace: Option<&str>, node_id: &str) -> bool {
        let mut found = false;
        for table in self.tables.values_mut() {
            if !table.owned_by(namespace) {
                continue;
            }
            table.rows.retain(|key, row| match row {
                Row::Node(_) if key == node_id => {
                    found = true;
                    false
                }
                Row::Edge(edge) => edge.src_id != node_id && edge.dst_id != node_id,
                Row::Node(_) => true,
            });
        }
        found
    }

    /// Edge endpoints must exist among the nodes of a namespace owning the edge
    fn check_edges(&self) -> Result<()> {
        for table in self.tables.values() {
            for row in table.rows.values() {
                let Row::Edge(edge) = row else {
                    continue;
                };
                for endpoint in [&edge.src_id, &edge.dst_id] {
                    let present = table.owners.iter().any(|owner| {
                        self.nodes(owner.as_deref())
                            .any(|n| &n.node_id == endpoint)
                    });
                    if !present {
                        bail!(
                            "edge '{}' {} -> {} references missing node '{}'",
                            edge.label,
                            edge.src_id,
                            edge.dst_id,
                            endpoint
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Store {
    tables: Tables,
    version: u64,
}

/// In-memory graph driver
///
/// Clones share the same store. A driver only sees the tables created
/// through its own namespace.
#[derive(Clone, Default)]
pub struct InMemoryGraphDriver {
    store: Arc<RwLock<Store>>,
    namespace: Option<String>,
}

impl InMemoryGraphDriver {
    /// Create a driver over a fresh, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Another driver over the same store, writing to namespaced tables
    pub fn with_namespace(&self, namespace: Option<String>) -> Self {
        Self {
            store: self.store.clone(),
            namespace: namespace.filter(|ns| !ns.is_empty()),
        }
    }
}

#[async_trait]
impl GraphDriver for InMemoryGraphDriver {
    async fn create_schema(&self, base: &StorageBase) -> Result<()> {
        let mut store = self
            .store
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        for table in &base.tables {
            store
                .tables
                .tables
                .entry(table.clone())
                .or_default()
                .owners
                .insert(self.namespace.clone());
        }
        store.version += 1;

        Ok(())
    }

    async fn drop_schema(&self, base: &StorageBase) -> Result<()> {
        let mut store = self
            .store
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        for name in &base.tables {
            let Some(table) = store.tables.tables.get_mut(name) else {
                continue;
            };
            table.owners.remove(&self.namespace);
            // shared tables survive until their last owner drops them
            if table.owners.is_empty() {
                store.tables.tables.shift_remove(name);
            }
        }
        store.version += 1;

        Ok(())
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        let store = self
            .store
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(store
            .tables
            .owned(self.namespace.as_deref())
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn truncate_table(&self, table: &str) -> Result<()> {
        let mut store = self
            .store
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        store
            .tables
            .table_mut(self.namespace.as_deref(), table)?
            .rows
            .clear();
        store.version += 1;

        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn GraphTransaction>> {
        let store = self
            .store
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(Box::new(InMemoryTransaction {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            working: Some(store.tables.clone()),
            base_version: store.version,
            dirty: false,
        }))
    }
}

/// Transaction over a private copy of the store
pub struct InMemoryTransaction {
    store: Arc<RwLock<Store>>,
    namespace: Option<String>,
    /// `None` once committed or rolled back
    working: Option<Tables>,
    base_version: u64,
    dirty: bool,
}

impl InMemoryTransaction {
    fn working(&self) -> Result<&Tables> {
        self.working
            .as_ref()
            .ok_or_else(|| anyhow!("transaction is closed"))
    }

    fn working_mut(&mut self) -> Result<&mut Tables> {
        self.working
            .as_mut()
            .ok_or_else(|| anyhow!("transaction is closed"))
    }
}

#[async_trait]
impl GraphTransaction for InMemoryTransaction {
    async fn add(&mut self, node: Node) -> Result<()> {
        let namespace = self.namespace.clone();
        self.working_mut()?.insert(namespace.as_deref(), node)?;
        self.dirty = true;
        Ok(())
    }

    async fn get(&self, node_id: &str) -> Result<Option<Node>> {
        Ok(self.working()?.find(self.namespace.as_deref(), node_id))
    }

    async fn delete(&mut self, node_id: &str) -> Result<bool> {
        let namespace = self.namespace.clone();
        let found = self.working_mut()?.remove(namespace.as_deref(), node_id);
        self.dirty |= found;
        Ok(found)
    }

    async fn count(&self, label: Option<&str>) -> Result<usize> {
        Ok(self
            .working()?
            .nodes(self.namespace.as_deref())
            .filter(|n| label.is_none_or(|l| n.label == l))
            .count())
    }

    async fn all(&self, label: Option<&str>) -> Result<Vec<Node>> {
        let namespace = self.namespace.as_deref();
        let working = self.working()?;
        Ok(working
            .nodes(namespace)
            .filter(|n| label.is_none_or(|l| n.label == l))
            .filter_map(|n| working.find(namespace, &n.node_id))
            .collect())
    }

    async fn related(&self, node_id: &str, edge_label: &str) -> Result<Vec<Node>> {
        let namespace = self.namespace.as_deref();
        let working = self.working()?;
        Ok(working
            .edges(namespace)
            .filter(|e| e.src_id == node_id && e.label == edge_label)
            .filter_map(|e| working.find(namespace, &e.dst_id))
            .collect())
    }

    async fn commit(&mut self) -> Result<()> {
        let working = self
            .working
            .take()
            .ok_or_else(|| anyhow!("transaction is closed"))?;
        if !self.dirty {
            return Ok(());
        }
        working.check_edges()?;

        let mut store = self
            .store
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if store.version != self.base_version {
            bail!("store was modified since the transaction started");
        }
        store.tables = working;
        store.version += 1;

        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.working
            .take()
            .map(|_| ())
            .ok_or_else(|| anyhow!("transaction is closed"))
    }
}

/// Opens in-memory drivers, one store per `user@host/database`
///
/// Two handles pointing at the same database share their store, each
/// writing to its own namespace.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    stores: Arc<Mutex<HashMap<String, InMemoryGraphDriver>>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphConnector for InMemoryConnector {
    async fn open(&self, name: &str, config: &DatabaseDriverConfig) -> Result<Arc<dyn GraphDriver>> {
        let mut stores = self
            .stores
            .lock()
            .map_err(|e| anyhow!("Failed to acquire lock: {}", e))?;

        let root = stores.entry(config.url()).or_default();
        tracing::debug!(handle = %name, url = %config.url(), "opened in-memory graph");

        Ok(Arc::new(
            root.with_namespace(config.package_namespace.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> StorageBase {
        StorageBase::new(
            "default",
            vec![
                "node_mother".into(),
                "edge_mother_sons".into(),
                "node_son".into(),
            ],
        )
    }

    fn family() -> (Node, Node) {
        let mut mother = Node::new("dana-1", "mother").with_property("name", "Dana O.");
        let son = Node::new("sn-1", "son").with_property("name", "Son O Dana");
        mother.link_to("sons", &son);
        (mother, son)
    }

    async fn driver() -> InMemoryGraphDriver {
        let driver = InMemoryGraphDriver::new();
        driver.create_schema(&base()).await.unwrap();
        driver
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let driver = driver().await;
        let (mother, son) = family();

        let mut tx = driver.begin().await.unwrap();
        tx.add(mother).await.unwrap();
        tx.add(son).await.unwrap();
        tx.commit().await.unwrap();

        let tx = driver.begin().await.unwrap();
        let dana = tx.get("dana-1").await.unwrap().unwrap();
        assert_eq!(dana.str_property("name"), Some("Dana O."));
        assert_eq!(dana.edges.len(), 1);
        assert_eq!(tx.related("dana-1", "sons").await.unwrap().len(), 1);
        assert_eq!(tx.count(None).await.unwrap(), 2);
        assert_eq!(tx.count(Some("son")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let driver = driver().await;
        let (mother, _) = family();

        let mut tx = driver.begin().await.unwrap();
        tx.add(Node::new("sn-2", "son")).await.unwrap();
        assert_eq!(tx.count(None).await.unwrap(), 1);

        let other = driver.begin().await.unwrap();
        assert_eq!(other.count(None).await.unwrap(), 0);

        tx.rollback().await.unwrap();
        assert!(tx.add(mother).await.is_err());

        let tx = driver.begin().await.unwrap();
        assert_eq!(tx.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_table_fails() {
        let driver = InMemoryGraphDriver::new();
        let mut tx = driver.begin().await.unwrap();
        let err = tx.add(Node::new("f-1", "father")).await.unwrap_err();
        assert_eq!(err.to_string(), "relation \"node_father\" does not exist");
    }

    #[tokio::test]
    async fn test_dangling_edge_fails_commit_atomically() {
        let driver = driver().await;
        let (mother, _) = family();

        let mut tx = driver.begin().await.unwrap();
        tx.add(mother).await.unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(err.to_string().contains("missing node 'sn-1'"));

        let tx = driver.begin().await.unwrap();
        assert_eq!(tx.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cascades_edges() {
        let driver = driver().await;
        let (mother, son) = family();
        let mut tx = driver.begin().await.unwrap();
        tx.add(mother).await.unwrap();
        tx.add(son).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = driver.begin().await.unwrap();
        assert!(tx.delete("sn-1").await.unwrap());
        assert!(!tx.delete("sn-1").await.unwrap());
        tx.commit().await.unwrap();

        let tx = driver.begin().await.unwrap();
        let dana = tx.get("dana-1").await.unwrap().unwrap();
        assert!(dana.edges.is_empty());
    }

    #[tokio::test]
    async fn test_truncate_and_drop() {
        let driver = driver().await;
        let mut tx = driver.begin().await.unwrap();
        tx.add(Node::new("sn-1", "son")).await.unwrap();
        tx.commit().await.unwrap();

        for table in driver.table_names().await.unwrap() {
            driver.truncate_table(&table).await.unwrap();
        }
        let tx = driver.begin().await.unwrap();
        assert_eq!(tx.count(None).await.unwrap(), 0);

        driver.drop_schema(&base()).await.unwrap();
        assert!(driver.table_names().await.unwrap().is_empty());
        assert!(driver.truncate_table("node_son").await.is_err());
    }

    #[tokio::test]
    async fn test_stale_transaction_cannot_commit() {
        let driver = driver().await;
        let mut first = driver.begin().await.unwrap();
        let mut second = driver.begin().await.unwrap();

        first.add(Node::new("sn-1", "son")).await.unwrap();
        first.commit().await.unwrap();

        second.add(Node::new("sn-2", "son")).await.unwrap();
        assert!(second.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_namespaces_on_one_database_are_isolated() {
        let connector = InMemoryConnector::new();
        let config = DatabaseDriverConfig::new("localhost", "test", "test", "db");

        let a = connector.open("a", &config).await.unwrap();
        let b = connector
            .open("b", &config.clone().with_namespace("other"))
            .await
            .unwrap();

        a.create_schema(&base()).await.unwrap();
        assert!(b.table_names().await.unwrap().is_empty());
        b.create_schema(&StorageBase::new(
            "other",
            vec![
                "other_node_mother".into(),
                "other_edge_mother_sons".into(),
                "other_node_son".into(),
            ],
        ))
        .await
        .unwrap();
        assert_eq!(a.table_names().await.unwrap().len(), 3);
        assert_eq!(b.table_names().await.unwrap()[0], "other_node_mother");

        let (mother, son) = family();
        let mut tx = a.begin().await.unwrap();
        tx.add(mother).await.unwrap();
        tx.add(son).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = b.begin().await.unwrap();
        assert_eq!(tx.count(None).await.unwrap(), 0);
        assert!(tx.get("dana-1").await.unwrap().is_none());
        assert!(!tx.delete("dana-1").await.unwrap());
        tx.add(Node::new("dana-1", "mother")).await.unwrap();
        tx.commit().await.unwrap();

        // same id in both namespaces, a's copy keeps its edge
        let tx = a.begin().await.unwrap();
        assert_eq!(tx.count(None).await.unwrap(), 2);
        assert_eq!(tx.related("dana-1", "sons").await.unwrap().len(), 1);
        assert!(b.truncate_table("node_son").await.is_err());
    }

    #[tokio::test]
    async fn test_shared_table_outlives_first_drop() {
        let root = InMemoryGraphDriver::new();
        let a = root.with_namespace(Some("a".into()));
        let b = root.with_namespace(Some("b".into()));
        let audit = StorageBase::new("audit", vec!["audit_log".into()]);

        a.create_schema(&audit).await.unwrap();
        b.create_schema(&audit).await.unwrap();
        a.drop_schema(&audit).await.unwrap();

        assert!(a.table_names().await.unwrap().is_empty());
        assert_eq!(b.table_names().await.unwrap(), vec!["audit_log"]);
        b.drop_schema(&audit).await.unwrap();
        assert!(root.with_namespace(Some("b".into())).table_names().await.unwrap().is_empty());
    }
}
