//! Lifecycle hooks around persisting mock data
//!
//! An extension sees the generated nodes three times: once before the write
//! transaction starts filling up (`pre`), once per node right before it is
//! added (`run`, which may change the node), and once after the batch is
//! committed (`post`). Any hook returning an error aborts the load; errors
//! from `pre` or `run` roll the whole batch back.
//!
//! ```rust,ignore
//! struct Honorific;
//!
//! impl MarkExtension for Honorific {
//!     fn run(&self, node: &mut Node) -> anyhow::Result<()> {
//!         let name = node.str_property("name").unwrap_or_default().to_string();
//!         node.set_property("name", format!("Mr. {}", name));
//!         Ok(())
//!     }
//! }
//! ```

use crate::core::entity::Node;
use anyhow::Result;
use std::sync::Arc;

/// Hooks run by the mock data factory; all default to no-ops
pub trait MarkExtension: Send + Sync {
    fn pre(&self, _nodes: &[Node]) -> Result<()> {
        Ok(())
    }

    fn run(&self, _node: &mut Node) -> Result<()> {
        Ok(())
    }

    fn post(&self, _nodes: &[Node]) -> Result<()> {
        Ok(())
    }
}

/// Extension that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtension;

impl MarkExtension for NoopExtension {}

/// A per-node callback, the older way of post-processing mock data
pub type PostProcessor = Arc<dyn Fn(&mut Node) + Send + Sync>;

/// Runs an extension, then a list of post-processors on each node
#[derive(Clone)]
pub struct PostProcessors {
    inner: Arc<dyn MarkExtension>,
    processors: Vec<PostProcessor>,
}

impl PostProcessors {
    pub fn new(inner: Arc<dyn MarkExtension>, processors: Vec<PostProcessor>) -> Self {
        Self { inner, processors }
    }
}

impl MarkExtension for PostProcessors {
    fn pre(&self, nodes: &[Node]) -> Result<()> {
        self.inner.pre(nodes)
    }

    fn run(&self, node: &mut Node) -> Result<()> {
        self.inner.run(node)?;
        for processor in &self.processors {
            processor(node);
        }
        Ok(())
    }

    fn post(&self, nodes: &[Node]) -> Result<()> {
        self.inner.post(nodes)
    }
}
