//! Database fixtures and per-test injection
//!
//! A [`FixtureSession`] owns every configured [`DatabaseFixture`] for the
//! length of a test run. For each test it injects the handles the test
//! names, loads the graph data its [`DataMark`](crate::core::DataMark)s ask
//! for, and undoes both in [`FixtureSession::teardown`].

pub mod bindings;
pub mod context;
pub mod database;
pub mod session;

pub use bindings::{BindingGuard, FixtureLookup, FixtureValue, TestBindings};
pub use context::{TestContext, TestItem};
pub use database::{DatabaseFixture, FixtureState};
pub use session::{FixtureSession, SessionBuilder};
