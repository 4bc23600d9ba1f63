//! Data-loading directives attached to a test

use crate::core::data::GraphData;
use crate::core::entity::{Node, UniqueKey};
use crate::core::extension::{MarkExtension, NoopExtension, PostProcessor, PostProcessors};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Binding name used when a directive does not set one
pub const DEFAULT_DATA_NAME: &str = "__psqlgraph_data__";

/// Where a directive's graph data comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resource {
    /// File name relative to the data directory
    File(String),
    Inline(GraphData),
}

impl Resource {
    /// Short name for logs and errors
    pub fn display_name(&self) -> String {
        match self {
            Resource::File(name) => name.clone(),
            Resource::Inline(_) => "<inline>".to_string(),
        }
    }
}

impl From<&str> for Resource {
    fn from(name: &str) -> Self {
        Resource::File(name.to_string())
    }
}

impl From<String> for Resource {
    fn from(name: String) -> Self {
        Resource::File(name)
    }
}

impl From<GraphData> for Resource {
    fn from(data: GraphData) -> Self {
        Resource::Inline(data)
    }
}

/// A request to load graph data into a handle for one test
///
/// # Example
///
/// ```rust,ignore
/// let mark = DataMark::new("sample.yaml")
///     .name("pg_data")
///     .driver("pg_driver")
///     .data_dir("tests/data")
///     .extension(Honorific);
/// ```
#[derive(Clone)]
pub struct DataMark {
    /// Binding name for the loaded nodes
    pub name: String,
    /// Target handle; the only registered handle when unset
    pub driver_name: Option<String>,
    /// Base directory for file resources; the session default when unset
    pub data_dir: Option<PathBuf>,
    pub resource: Resource,
    pub unique_key: UniqueKey,
    /// Fill every unset schema property with a synthetic value
    pub mock_all_props: bool,
    pub extension: Arc<dyn MarkExtension>,
    pub post_processors: Vec<PostProcessor>,
}

impl DataMark {
    pub fn new(resource: impl Into<Resource>) -> Self {
        Self {
            name: DEFAULT_DATA_NAME.to_string(),
            driver_name: None,
            data_dir: None,
            resource: resource.into(),
            unique_key: UniqueKey::default(),
            mock_all_props: false,
            extension: Arc::new(NoopExtension),
            post_processors: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn driver(mut self, driver_name: impl Into<String>) -> Self {
        self.driver_name = Some(driver_name.into());
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn unique_key(mut self, key: UniqueKey) -> Self {
        self.unique_key = key;
        self
    }

    pub fn mock_all_props(mut self, enabled: bool) -> Self {
        self.mock_all_props = enabled;
        self
    }

    pub fn extension(mut self, extension: impl MarkExtension + 'static) -> Self {
        self.extension = Arc::new(extension);
        self
    }

    pub fn post_processor(mut self, processor: impl Fn(&mut Node) + Send + Sync + 'static) -> Self {
        self.post_processors.push(Arc::new(processor));
        self
    }

    /// The extension to run, with any post-processors folded in
    pub fn effective_extension(&self) -> Arc<dyn MarkExtension> {
        if self.post_processors.is_empty() {
            self.extension.clone()
        } else {
            Arc::new(PostProcessors::new(
                self.extension.clone(),
                self.post_processors.clone(),
            ))
        }
    }
}

impl fmt::Debug for DataMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataMark")
            .field("name", &self.name)
            .field("driver_name", &self.driver_name)
            .field("data_dir", &self.data_dir)
            .field("resource", &self.resource.display_name())
            .field("unique_key", &self.unique_key)
            .field("mock_all_props", &self.mock_all_props)
            .field("post_processors", &self.post_processors.len())
            .finish()
    }
}
