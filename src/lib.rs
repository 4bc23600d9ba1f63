//! # graph-fixtures
//!
//! Test fixtures for graph databases: named database handles whose schema
//! lives for a whole test session, truncated around every test, plus
//! declarative graph data loaded into a handle before a test and removed
//! after it.
//!
//! ## Features
//!
//! - **Session-scoped handles**: schema created once, dropped at the end
//! - **Per-test isolation**: tables truncated before and after each test
//! - **Data directives**: YAML/JSON files or inline data, with `extends`
//! - **Validation**: data is checked against the handle's dictionary before
//!   anything is written
//! - **Extensions**: `pre`/`run`/`post` hooks around persisting nodes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graph_fixtures::prelude::*;
//!
//! let session = FixtureSession::builder()
//!     .with_options(SessionOptions::default().with_data_dir("tests/data"))
//!     .start(&ConfigFile::from_env()?)
//!     .await?;
//!
//! let item = TestItem::new("test_sons")
//!     .arg("pg_driver")
//!     .mark(DataMark::new("sample.yaml").driver("pg_driver").name("pg_data"));
//!
//! session
//!     .run_test(&item, |bindings| async move {
//!         let nodes = bindings.nodes("pg_data").unwrap();
//!         assert_eq!(nodes.len(), 3);
//!     })
//!     .await?;
//!
//! session.shutdown().await?;
//! ```

pub mod config;
pub mod core;
pub mod factory;
pub mod fixture;
pub mod loader;
pub mod logging;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        DEFAULT_DATA_NAME, DataMark, Dictionary, EdgeRecord, FixtureError, FixtureResult,
        GraphConnector, GraphData, GraphDriver, GraphTransaction, MarkExtension, ModelBinding,
        Node, NodeRecord, NoopExtension, Resource, SchemaValidator, StructuralValidator, UniqueKey,
        Violation,
    };

    // === Fixtures ===
    pub use crate::fixture::{
        FixtureSession, FixtureState, FixtureValue, SessionBuilder, TestBindings, TestContext,
        TestItem,
    };

    // === Factory ===
    pub use crate::factory::{DictionaryGraphFactory, GraphFactory};

    // === Storage ===
    pub use crate::storage::{InMemoryConnector, InMemoryGraphDriver};

    // === Config ===
    pub use crate::config::{
        ConfigFile, ConfigSource, DatabaseDriverConfig, FixtureConfig, SessionOptions,
    };

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
}
