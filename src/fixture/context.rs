//! Per-test state: what the test asked for, what was bound, what to undo

use super::bindings::{BindingGuard, FixtureLookup, FixtureValue, TestBindings};
use crate::core::driver::GraphDriver;
use crate::core::entity::Node;
use crate::core::error::BindingError;
use crate::core::mark::DataMark;
use crate::factory::MockDataFactory;
use std::fmt;
use std::sync::Arc;

/// A test as seen by the session: its name, the fixtures it takes and the
/// data directives attached to it
///
/// # Example
///
/// ```rust,ignore
/// let item = TestItem::new("test_sons")
///     .arg("pg_driver")
///     .mark(DataMark::new("sample.yaml").driver("pg_driver"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestItem {
    pub name: String,
    /// Fixture names the test receives
    pub fixture_names: Vec<String>,
    pub marks: Vec<DataMark>,
}

impl TestItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Request a fixture by name
    pub fn arg(mut self, name: impl Into<String>) -> Self {
        self.fixture_names.push(name.into());
        self
    }

    /// Attach a data directive
    pub fn mark(mut self, mark: DataMark) -> Self {
        self.marks.push(mark);
        self
    }
}

/// Work scheduled for teardown; run last-in first-out
pub(crate) enum Finalizer {
    /// Truncate the handle's tables
    PostTest { handle: String },
    /// Delete the nodes a directive loaded
    Clean {
        handle: String,
        resource: String,
        factory: MockDataFactory,
    },
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finalizer::PostTest { handle } => f.debug_struct("PostTest").field("handle", handle).finish(),
            Finalizer::Clean { handle, resource, .. } => f
                .debug_struct("Clean")
                .field("handle", handle)
                .field("resource", resource)
                .finish(),
        }
    }
}

/// Everything set up for one running test
///
/// Must be handed back to
/// [`FixtureSession::teardown`](super::FixtureSession::teardown). Dropping it
/// unbinds the test's values but skips truncation and cleanup.
pub struct TestContext {
    test: String,
    lookup: FixtureLookup,
    pub(crate) guards: Vec<BindingGuard>,
    pub(crate) finalizers: Vec<Finalizer>,
}

impl TestContext {
    pub(crate) fn new(test: impl Into<String>, lookup: FixtureLookup) -> Self {
        Self {
            test: test.into(),
            lookup,
            guards: Vec::new(),
            finalizers: Vec::new(),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test
    }

    /// Bind a value for the duration of this test
    pub(crate) fn bind(&mut self, name: impl Into<String>, value: FixtureValue) {
        let guard = self.lookup.push(name, value);
        self.guards.push(guard);
    }

    /// Everything visible to the test right now
    pub fn bindings(&self) -> TestBindings {
        TestBindings::new(self.lookup.snapshot())
    }

    pub fn get(&self, name: &str) -> Result<FixtureValue, BindingError> {
        self.lookup.get(name).ok_or_else(|| BindingError::NotBound {
            name: name.to_string(),
        })
    }

    /// The database handle bound under `name`
    pub fn handle(&self, name: &str) -> Result<Arc<dyn GraphDriver>, BindingError> {
        self.bindings().handle(name)
    }

    /// The nodes a directive bound under `name`
    pub fn nodes(&self, name: &str) -> Result<Arc<Vec<Node>>, BindingError> {
        self.bindings().nodes(name)
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("test", &self.test)
            .field("guards", &self.guards)
            .field("finalizers", &self.finalizers)
            .finish()
    }
}
