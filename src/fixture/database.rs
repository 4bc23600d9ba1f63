//! One named database handle and its schema lifecycle
//!
//! ```text
//! Unconfigured --pre_config--> Configured --pre_test--> InTest
//!                                              ^           |
//!                                              |       post_test
//!                                          pre_test        v
//!                                              +------ Truncated
//!
//! Configured | InTest | Truncated --post_config--> Dropped
//! ```

use crate::config::DatabaseDriverConfig;
use crate::core::driver::GraphDriver;
use crate::core::error::{FixtureResult, LifecycleError, StorageError};
use serde::Serialize;
use std::sync::Arc;

/// Where a [`DatabaseFixture`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureState {
    Unconfigured,
    Configured,
    InTest,
    Truncated,
    Dropped,
}

/// A database handle owned for the whole session
pub struct DatabaseFixture {
    name: String,
    config: DatabaseDriverConfig,
    driver: Arc<dyn GraphDriver>,
    state: FixtureState,
}

impl DatabaseFixture {
    pub fn new(name: impl Into<String>, config: DatabaseDriverConfig, driver: Arc<dyn GraphDriver>) -> Self {
        Self {
            name: name.into(),
            config,
            driver,
            state: FixtureState::Unconfigured,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &DatabaseDriverConfig {
        &self.config
    }

    pub fn driver(&self) -> Arc<dyn GraphDriver> {
        self.driver.clone()
    }

    pub fn state(&self) -> FixtureState {
        self.state
    }

    /// Whether tables are truncated around each test
    pub fn volatile(&self) -> bool {
        self.config.volatile
    }

    fn expect(&self, allowed: &[FixtureState], operation: &'static str) -> FixtureResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                handle: self.name.clone(),
                state: self.state,
                operation,
            }
            .into())
        }
    }

    /// Every table the handle currently owns, newest first
    ///
    /// Read from the driver rather than the configuration, so tables created
    /// outside the configured bases are emptied too.
    async fn truncation_order(&self) -> FixtureResult<Vec<String>> {
        let mut tables = self.driver.table_names().await.map_err(|e| {
            StorageError::driver(format!("failed to list tables of '{}'", self.name), e)
        })?;
        tables.reverse();
        Ok(tables)
    }

    /// Create the schema for the bound model and every extra base
    ///
    /// With `drop_first`, existing tables are dropped beforehand.
    pub async fn pre_config(&mut self, drop_first: bool) -> FixtureResult<()> {
        self.expect(&[FixtureState::Unconfigured], "pre_config")?;

        for base in self.config.storage_bases() {
            if drop_first {
                tracing::info!(handle = %self.name, base = %base.name, "dropping existing schema");
                self.driver.drop_schema(&base).await.map_err(|e| {
                    StorageError::driver(format!("failed to drop base '{}'", base.name), e)
                })?;
            }
            self.driver.create_schema(&base).await.map_err(|e| {
                StorageError::driver(format!("failed to create base '{}'", base.name), e)
            })?;
        }

        tracing::debug!(handle = %self.name, "schema created");
        self.state = FixtureState::Configured;
        Ok(())
    }

    /// Truncate every table and hand out the live driver
    pub async fn pre_test(&mut self) -> FixtureResult<Arc<dyn GraphDriver>> {
        self.expect(&[FixtureState::Configured, FixtureState::Truncated], "pre_test")?;

        if self.volatile() {
            for table in self.truncation_order().await? {
                self.driver.truncate_table(&table).await.map_err(|e| {
                    StorageError::driver(format!("failed to truncate '{}'", table), e)
                })?;
            }
        }

        self.state = FixtureState::InTest;
        Ok(self.driver.clone())
    }

    /// Truncate every table again
    ///
    /// A failure is logged instead of returned. A table that fails to truncate is logged and skipped; the others are
    /// still truncated.
    pub async fn post_test(&mut self) -> FixtureResult<()> {
        self.expect(&[FixtureState::InTest], "post_test")?;

        if self.volatile() {
            match self.truncation_order().await {
                Ok(tables) => {
                    for table in tables {
                        if let Err(e) = self.driver.truncate_table(&table).await {
                            tracing::error!(handle = %self.name, table = %table, error = %e, "failed to truncate table");
                        }
                    }
                }
                Err(e) => tracing::error!(handle = %self.name, error = %e, "failed to list tables"),
            }
        }

        self.state = FixtureState::Truncated;
        Ok(())
    }

    /// Drop every table created by [`pre_config`](Self::pre_config)
    pub async fn post_config(&mut self) -> FixtureResult<()> {
        self.expect(
            &[FixtureState::Configured, FixtureState::InTest, FixtureState::Truncated],
            "post_config",
        )?;

        for base in self.config.storage_bases().iter().rev() {
            self.driver.drop_schema(base).await.map_err(|e| {
                StorageError::driver(format!("failed to drop base '{}'", base.name), e)
            })?;
        }

        tracing::debug!(handle = %self.name, "schema dropped");
        self.state = FixtureState::Dropped;
        Ok(())
    }
}

impl std::fmt::Debug for DatabaseFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseFixture")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}
