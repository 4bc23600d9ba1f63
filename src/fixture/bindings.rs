//! Name → value lookup for fixture injection
//!
//! Each name maps to a stack of values; the top one is what a test sees.
//! [`FixtureLookup::push`] shadows a name and returns a [`BindingGuard`] that
//! restores the previous binding when dropped, whatever way the scope ends.

use crate::core::driver::GraphDriver;
use crate::core::entity::Node;
use crate::core::error::BindingError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A value a test can receive by name
#[derive(Clone)]
pub enum FixtureValue {
    /// A live database handle
    Handle(Arc<dyn GraphDriver>),
    /// Nodes loaded by a data directive
    Nodes(Arc<Vec<Node>>),
    /// Anything else the caller provides
    Json(Value),
}

impl FixtureValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FixtureValue::Handle(_) => "handle",
            FixtureValue::Nodes(_) => "nodes",
            FixtureValue::Json(_) => "json",
        }
    }

    pub fn as_handle(&self) -> Option<&Arc<dyn GraphDriver>> {
        match self {
            FixtureValue::Handle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&Arc<Vec<Node>>> {
        match self {
            FixtureValue::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FixtureValue::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for FixtureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureValue::Handle(_) => f.write_str("Handle(..)"),
            FixtureValue::Nodes(nodes) => f.debug_tuple("Nodes").field(&nodes.len()).finish(),
            FixtureValue::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

type Stacks = BTreeMap<String, Vec<FixtureValue>>;

/// Shared lookup table; clones see the same bindings
#[derive(Clone, Default)]
pub struct FixtureLookup {
    stacks: Arc<RwLock<Stacks>>,
}

impl FixtureLookup {
    pub fn new() -> Self {
        Self::default()
    }

    // a panic while holding the lock cannot leave a stack half-updated
    fn read(&self) -> RwLockReadGuard<'_, Stacks> {
        self.stacks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Stacks> {
        self.stacks.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Bind a value for the rest of the session
    pub fn provide(&self, name: impl Into<String>, value: FixtureValue) {
        self.write().entry(name.into()).or_default().push(value);
    }

    /// The current binding of `name`
    pub fn get(&self, name: &str) -> Option<FixtureValue> {
        self.read().get(name).and_then(|stack| stack.last().cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().get(name).is_some_and(|stack| !stack.is_empty())
    }

    /// Shadow `name` until the returned guard is dropped
    pub fn push(&self, name: impl Into<String>, value: FixtureValue) -> BindingGuard {
        let name = name.into();
        let mut stacks = self.write();
        let stack = stacks.entry(name.clone()).or_default();
        let depth = stack.len();
        stack.push(value);
        BindingGuard {
            lookup: self.clone(),
            name,
            depth,
        }
    }

    /// Current value of every bound name
    pub fn snapshot(&self) -> BTreeMap<String, FixtureValue> {
        self.read()
            .iter()
            .filter_map(|(name, stack)| Some((name.clone(), stack.last()?.clone())))
            .collect()
    }
}

impl fmt::Debug for FixtureLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

/// Restores the shadowed binding on drop
#[must_use = "the binding is removed as soon as the guard is dropped"]
pub struct BindingGuard {
    lookup: FixtureLookup,
    name: String,
    depth: usize,
}

impl BindingGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        let mut stacks = self.lookup.write();
        if let Some(stack) = stacks.get_mut(&self.name) {
            stack.truncate(self.depth);
            if stack.is_empty() {
                stacks.remove(&self.name);
            }
        }
    }
}

impl fmt::Debug for BindingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingGuard")
            .field("name", &self.name)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Values bound for one test, read by name
#[derive(Debug, Clone, Default)]
pub struct TestBindings {
    values: BTreeMap<String, FixtureValue>,
}

impl TestBindings {
    pub fn new(values: BTreeMap<String, FixtureValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Result<&FixtureValue, BindingError> {
        self.values.get(name).ok_or_else(|| BindingError::NotBound {
            name: name.to_string(),
        })
    }

    /// The database handle bound under `name`
    pub fn handle(&self, name: &str) -> Result<Arc<dyn GraphDriver>, BindingError> {
        self.get(name)?
            .as_handle()
            .cloned()
            .ok_or_else(|| BindingError::WrongKind {
                name: name.to_string(),
                expected: "a database handle",
            })
    }

    /// The nodes bound under `name`
    pub fn nodes(&self, name: &str) -> Result<Arc<Vec<Node>>, BindingError> {
        self.get(name)?
            .as_nodes()
            .cloned()
            .ok_or_else(|| BindingError::WrongKind {
                name: name.to_string(),
                expected: "loaded nodes",
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryGraphDriver;

    fn json(v: i64) -> FixtureValue {
        FixtureValue::Json(Value::from(v))
    }

    #[test]
    fn test_guard_restores_shadowed_binding() {
        let lookup = FixtureLookup::new();
        lookup.provide("pg_driver", json(1));

        {
            let _guard = lookup.push("pg_driver", json(2));
            assert_eq!(lookup.get("pg_driver").unwrap().as_json(), Some(&Value::from(2)));
        }
        assert_eq!(lookup.get("pg_driver").unwrap().as_json(), Some(&Value::from(1)));
    }

    #[test]
    fn test_guard_removes_fresh_binding() {
        let lookup = FixtureLookup::new();
        let guard = lookup.push("pg_data", FixtureValue::Nodes(Arc::new(vec![])));
        assert!(lookup.contains("pg_data"));
        assert_eq!(guard.name(), "pg_data");
        drop(guard);
        assert!(!lookup.contains("pg_data"));
        assert!(lookup.snapshot().is_empty());
    }

    #[test]
    fn test_guards_dropped_out_of_order() {
        let lookup = FixtureLookup::new();
        let outer = lookup.push("x", json(1));
        let inner = lookup.push("x", json(2));
        drop(outer);
        assert!(!lookup.contains("x"));
        drop(inner);
        assert!(!lookup.contains("x"));
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let lookup = FixtureLookup::new();
        let inner = lookup.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.push("pg_driver", json(1));
            panic!("test body failed");
        });
        assert!(result.is_err());
        assert!(!lookup.contains("pg_driver"));
    }

    #[test]
    fn test_bindings_typed_access() {
        let handle: Arc<dyn GraphDriver> = Arc::new(InMemoryGraphDriver::new());
        let bindings = TestBindings::new(BTreeMap::from([
            ("pg_driver".to_string(), FixtureValue::Handle(handle)),
            ("pg_data".to_string(), FixtureValue::Nodes(Arc::new(vec![Node::new("a", "son")]))),
        ]));

        assert!(bindings.handle("pg_driver").is_ok());
        assert_eq!(bindings.nodes("pg_data").unwrap().len(), 1);
        assert!(matches!(
            bindings.nodes("pg_driver"),
            Err(BindingError::WrongKind { .. })
        ));
        assert!(matches!(
            bindings.get("missing"),
            Err(BindingError::NotBound { .. })
        ));
    }
}
