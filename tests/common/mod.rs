//! Shared harness for the integration tests
//!
//! Provides handle configurations over `tests/data/dictionary.yaml`, a
//! session builder pointed at `tests/data`, the inline family graph and a
//! name-prefixing extension.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use anyhow::Result;
use graph_fixtures::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Directory holding the test data files
pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

pub fn dictionary() -> Dictionary {
    Dictionary::from_yaml_file(data_dir().join("dictionary.yaml")).expect("dictionary.yaml")
}

/// One handle over the family dictionary
pub fn handle_config() -> DatabaseDriverConfig {
    DatabaseDriverConfig::new("localhost", "test", "test", "automated_test")
        .with_dictionary(dictionary())
}

/// Configuration registering `names`, each in its own namespace
pub fn fixture_config(names: &[&str]) -> FixtureConfig {
    names.iter().fold(FixtureConfig::new(), |config, name| {
        config.with_handle(*name, handle_config().with_namespace(*name))
    })
}

/// A started session over `names`, with `tests/data` as data directory
pub async fn session(names: &[&str]) -> FixtureSession {
    graph_fixtures::logging::init();
    FixtureSession::builder()
        .with_options(SessionOptions::default().with_data_dir(data_dir()))
        .start(&fixture_config(names))
        .await
        .expect("session start")
}

/// The inline graph: mother `dana-1` with one son `sn-1`
pub fn family_graph() -> GraphData {
    GraphData::new()
        .with_unique_field(UniqueKey::NodeId)
        .with_node(
            NodeRecord::new("mother")
                .with("name", "Dana O.")
                .with("node_id", "dana-1"),
        )
        .with_node(
            NodeRecord::new("son")
                .with("name", "Son O Dana")
                .with("node_id", "sn-1"),
        )
        .with_edge(EdgeRecord::new("dana-1", "sn-1", "sons"))
}

/// Prefixes every node's name with "Mr. "
pub struct Honorific;

impl MarkExtension for Honorific {
    fn run(&self, node: &mut Node) -> Result<()> {
        if let Some(name) = node.str_property("name") {
            let name = format!("Mr. {}", name);
            node.set_property("name", name);
        }
        Ok(())
    }
}

/// Number of nodes visible through `driver`
pub async fn count(driver: &Arc<dyn GraphDriver>) -> usize {
    driver
        .begin()
        .await
        .expect("begin")
        .count(None)
        .await
        .expect("count")
}

/// Fetch one node by id
pub async fn fetch(driver: &Arc<dyn GraphDriver>, node_id: &str) -> Option<Node> {
    driver
        .begin()
        .await
        .expect("begin")
        .get(node_id)
        .await
        .expect("get")
}
