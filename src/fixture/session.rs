//! The fixture session: registry of database handles and per-test injection

use super::bindings::{FixtureLookup, FixtureValue, TestBindings};
use super::context::{Finalizer, TestContext, TestItem};
use super::database::{DatabaseFixture, FixtureState};
use crate::config::{ConfigSource, DatabaseDriverConfig, SessionOptions};
use crate::core::driver::GraphConnector;
use crate::core::error::{FixtureError, FixtureResult, StorageError, ValidationError};
use crate::core::mark::DataMark;
use crate::core::validation::{SchemaValidator, StructuralValidator, validate};
use crate::factory::{DictionaryGraphFactory, GraphFactory, MockDataFactory};
use crate::loader::DataSourceResolver;
use crate::storage::InMemoryConnector;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Builder for a [`FixtureSession`]
///
/// # Example
///
/// ```rust,ignore
/// let session = SessionBuilder::new()
///     .with_options(SessionOptions::default().with_data_dir("tests/data"))
///     .with_connector(InMemoryConnector::new())
///     .start(&ConfigFile::from_env()?)
///     .await?;
/// ```
pub struct SessionBuilder {
    options: SessionOptions,
    connector: Arc<dyn GraphConnector>,
    validator: Arc<dyn SchemaValidator>,
    factory: Arc<dyn GraphFactory>,
    lookup: FixtureLookup,
}

impl SessionBuilder {
    /// In-memory storage, structural validation, dictionary-driven factory
    pub fn new() -> Self {
        Self {
            options: SessionOptions::default(),
            connector: Arc::new(InMemoryConnector::new()),
            validator: Arc::new(StructuralValidator),
            factory: Arc::new(DictionaryGraphFactory),
            lookup: FixtureLookup::new(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the connector used to open handles
    pub fn with_connector(mut self, connector: impl GraphConnector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn with_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_factory(mut self, factory: impl GraphFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Bind a value for the whole session
    ///
    /// A handle name bound here is treated as already resolvable and is not
    /// injected per test; its schema is still managed by the session.
    pub fn provide(self, name: impl Into<String>, value: FixtureValue) -> Self {
        self.lookup.provide(name, value);
        self
    }

    /// Read the configuration and bring every handle to `Configured`
    ///
    /// A configuration source that fails to load yields a session without
    /// handles; the failure is logged, not returned.
    pub async fn start(self, source: &dyn ConfigSource) -> FixtureResult<FixtureSession> {
        let session = FixtureSession {
            fixtures: Mutex::new(BTreeMap::new()),
            options: self.options,
            connector: self.connector,
            validator: self.validator,
            factory: self.factory,
            lookup: self.lookup,
        };

        let config = match source.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "fixture configuration unavailable, no database handles registered");
                return Ok(session);
            }
        };

        for (name, handle_config) in config.handles {
            session.register(&name, handle_config).await?;
        }
        Ok(session)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide fixture state for one test session
///
/// Tests sharing a session must not run concurrently against the same
/// handle; calls are expected to come from one sequential test loop.
pub struct FixtureSession {
    fixtures: Mutex<BTreeMap<String, DatabaseFixture>>,
    options: SessionOptions,
    connector: Arc<dyn GraphConnector>,
    validator: Arc<dyn SchemaValidator>,
    factory: Arc<dyn GraphFactory>,
    lookup: FixtureLookup,
}

impl FixtureSession {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn lookup(&self) -> &FixtureLookup {
        &self.lookup
    }

    /// Open a handle and create its schema
    ///
    /// Returns `false` without touching anything when `name` is already
    /// registered.
    pub async fn register(&self, name: &str, config: DatabaseDriverConfig) -> FixtureResult<bool> {
        let mut fixtures = self.fixtures.lock().await;
        if fixtures.contains_key(name) {
            tracing::debug!(handle = %name, "handle already registered");
            return Ok(false);
        }

        config.check(name)?;
        let driver = self
            .connector
            .open(name, &config)
            .await
            .map_err(|e| StorageError::Connection {
                handle: name.to_string(),
                message: format!("{:#}", e),
            })?;

        let mut fixture = DatabaseFixture::new(name, config, driver);
        fixture.pre_config(self.options.drop_all).await?;
        tracing::info!(handle = %name, "database handle registered");

        fixtures.insert(name.to_string(), fixture);
        Ok(true)
    }

    /// Names of every registered handle, sorted
    pub async fn known_handles(&self) -> Vec<String> {
        self.fixtures.lock().await.keys().cloned().collect()
    }

    pub async fn fixture_state(&self, name: &str) -> Option<FixtureState> {
        self.fixtures.lock().await.get(name).map(DatabaseFixture::state)
    }

    /// Prepare a test: inject the handles it names, then load every directive
    ///
    /// On failure, whatever was already set up is torn down before the error
    /// is returned.
    pub async fn setup(&self, item: &TestItem) -> FixtureResult<TestContext> {
        let mut ctx = TestContext::new(item.name.clone(), self.lookup.clone());
        match self.prepare(item, &mut ctx).await {
            Ok(()) => Ok(ctx),
            Err(e) => {
                if let Err(teardown) = self.teardown(ctx).await {
                    tracing::warn!(test = %item.name, error = %teardown, "teardown after failed setup also failed");
                }
                Err(e)
            }
        }
    }

    async fn prepare(&self, item: &TestItem, ctx: &mut TestContext) -> FixtureResult<()> {
        let known = self.known_handles().await;
        for name in &item.fixture_names {
            if known.contains(name) {
                self.inject(name, ctx).await?;
            }
        }
        for mark in &item.marks {
            self.load_mark(mark, ctx).await.inspect_err(|e| {
                tracing::error!(
                    test = %item.name,
                    handle = ?mark.driver_name,
                    resource = %mark.resource.display_name(),
                    error = %e,
                    "failed to load graph data"
                );
            })?;
        }
        Ok(())
    }

    /// Bind a handle's live driver under its name, unless already bound
    async fn inject(&self, name: &str, ctx: &mut TestContext) -> FixtureResult<()> {
        if self.lookup.contains(name) {
            return Ok(());
        }

        let mut fixtures = self.fixtures.lock().await;
        let known: Vec<String> = fixtures.keys().cloned().collect();
        let fixture = fixtures
            .get_mut(name)
            .ok_or(FixtureError::UnknownHandle {
                name: name.to_string(),
                known,
            })?;
        let driver = fixture.pre_test().await?;
        drop(fixtures);

        ctx.finalizers.push(Finalizer::PostTest {
            handle: name.to_string(),
        });
        ctx.bind(name, FixtureValue::Handle(driver));
        tracing::debug!(test = %ctx.test_name(), handle = %name, "handle injected");
        Ok(())
    }

    fn resolve_handle(&self, mark: &DataMark, known: Vec<String>) -> FixtureResult<String> {
        match &mark.driver_name {
            Some(name) if known.contains(name) => Ok(name.clone()),
            Some(name) => Err(FixtureError::UnknownHandle {
                name: name.clone(),
                known,
            }),
            None if known.len() == 1 => Ok(known[0].clone()),
            None => Err(FixtureError::MissingHandle { known }),
        }
    }

    async fn load_mark(&self, mark: &DataMark, ctx: &mut TestContext) -> FixtureResult<()> {
        let handle = self.resolve_handle(mark, self.known_handles().await)?;
        self.inject(&handle, ctx).await?;

        let resource = mark.resource.display_name();
        let data_dir = mark.data_dir.clone().or_else(|| self.options.data_dir.clone());
        let mut data = DataSourceResolver::new(data_dir).resolve(&mark.resource).await?;
        // a unique_field in the data wins over the directive's key
        let unique_key = *data.unique_field.get_or_insert(mark.unique_key);

        let (driver, config) = {
            let fixtures = self.fixtures.lock().await;
            let fixture = fixtures.get(&handle).ok_or_else(|| FixtureError::UnknownHandle {
                name: handle.clone(),
                known: fixtures.keys().cloned().collect(),
            })?;
            (fixture.driver(), fixture.config().clone())
        };

        let violations = validate(&data, &config.dictionary, self.validator.as_ref());
        if !violations.is_empty() {
            return Err(ValidationError {
                resource,
                violations,
            }
            .into());
        }

        let mut factory = MockDataFactory::new(
            driver,
            &config,
            self.factory.clone(),
            mark.effective_extension(),
        );
        let nodes = factory
            .from_source(&data, unique_key, mark.mock_all_props)
            .await?;
        tracing::debug!(
            test = %ctx.test_name(),
            handle = %handle,
            resource = %resource,
            count = nodes.len(),
            "graph data loaded"
        );

        ctx.finalizers.push(Finalizer::Clean {
            handle,
            resource,
            factory,
        });
        ctx.bind(mark.name.clone(), FixtureValue::Nodes(Arc::new(nodes)));
        Ok(())
    }

    /// Run scheduled finalizers, newest first, then release the bindings
    ///
    /// Every finalizer runs even when an earlier one fails; the first error
    /// is returned.
    pub async fn teardown(&self, ctx: TestContext) -> FixtureResult<()> {
        let TestContext {
            mut finalizers,
            mut guards,
            ..
        } = ctx;

        let mut first_error = None;
        while let Some(finalizer) = finalizers.pop() {
            let result = match finalizer {
                Finalizer::Clean {
                    handle,
                    resource,
                    factory,
                } => factory.clean().await.map(|deleted| {
                    tracing::debug!(handle = %handle, resource = %resource, deleted, "graph data cleaned");
                }),
                Finalizer::PostTest { handle } => {
                    let mut fixtures = self.fixtures.lock().await;
                    match fixtures.get_mut(&handle) {
                        Some(fixture) => fixture.post_test().await,
                        None => Ok(()),
                    }
                }
            };
            if let Err(e) = result {
                tracing::error!(error = %e, "teardown step failed");
                first_error.get_or_insert(e);
            }
        }

        while let Some(guard) = guards.pop() {
            drop(guard);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Set up `item`, run `body` with its bindings, and tear down on every
    /// exit path
    ///
    /// A panicking body is torn down first, then the panic resumes.
    pub async fn run_test<F, Fut, T>(&self, item: &TestItem, body: F) -> FixtureResult<T>
    where
        F: FnOnce(TestBindings) -> Fut,
        Fut: Future<Output = T>,
    {
        let ctx = self.setup(item).await?;
        let outcome = AssertUnwindSafe(body(ctx.bindings())).catch_unwind().await;
        let teardown = self.teardown(ctx).await;

        match outcome {
            Ok(value) => teardown.map(|()| value),
            Err(panic) => {
                if let Err(e) = teardown {
                    tracing::error!(test = %item.name, error = %e, "teardown failed after panic");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Drop the schema of every handle still configured
    ///
    /// Every handle is attempted; the first error is returned.
    pub async fn shutdown(&self) -> FixtureResult<()> {
        let mut fixtures = self.fixtures.lock().await;
        let mut first_error = None;
        for (name, fixture) in fixtures.iter_mut() {
            if fixture.state() == FixtureState::Dropped {
                continue;
            }
            if let Err(e) = fixture.post_config().await {
                tracing::error!(handle = %name, error = %e, "failed to drop schema");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for FixtureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureSession")
            .field("options", &self.options)
            .field("lookup", &self.lookup)
            .finish_non_exhaustive()
    }
}
