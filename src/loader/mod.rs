//! Resolves a directive's resource into graph data
//!
//! File resources are parsed by extension (`.json`, `.yaml`, `.yml`).
//! A definition with `extends: <name>` is laid over `<name>`, loaded from the
//! same data directory; the base can extend further. `<name>` may omit the
//! extension, in which case `.yaml`, `.yml` and `.json` are tried in order.

use crate::core::data::GraphData;
use crate::core::error::SourceError;
use crate::core::mark::Resource;
use std::path::{Path, PathBuf};

/// Extensions graph data files may have
pub const SUPPORTED_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Load graph data from a file, choosing the parser by extension
pub async fn load_source(path: &Path) -> Result<GraphData, SourceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(SourceError::UnsupportedExtension {
            extension,
            accepted: SUPPORTED_EXTENSIONS,
        });
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SourceError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let parsed = if extension == "json" {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| SourceError::Parse {
        path: path.display().to_string(),
        message,
    })
}

/// Resolves resources relative to one data directory
#[derive(Debug, Clone, Default)]
pub struct DataSourceResolver {
    data_dir: Option<PathBuf>,
}

impl DataSourceResolver {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Resolve a resource, following its extends chain
    pub async fn resolve(&self, resource: &Resource) -> Result<GraphData, SourceError> {
        let (top, origin) = match resource {
            Resource::Inline(data) => (data.clone(), None),
            Resource::File(name) => {
                let path = self.locate(name)?;
                (load_source(&path).await?, Some(path))
            }
        };
        self.resolve_extends(top, origin, &resource.display_name())
            .await
    }

    async fn resolve_extends(
        &self,
        top: GraphData,
        origin: Option<PathBuf>,
        display_name: &str,
    ) -> Result<GraphData, SourceError> {
        let mut chain: Vec<PathBuf> = origin.into_iter().collect();
        let mut bases: Vec<GraphData> = Vec::new();
        let mut next = top.extends.clone();

        while let Some(name) = next {
            let path = self.locate(&name).map_err(|_| SourceError::MissingDataDir {
                resource: format!("{} (extends {})", display_name, name),
            })?;
            if chain.contains(&path) {
                chain.push(path);
                return Err(SourceError::ExtendsCycle {
                    chain: chain.iter().map(|p| file_name(p)).collect(),
                });
            }
            tracing::debug!(resource = %display_name, base = %path.display(), "resolving extends");

            let base = load_source(&path).await?;
            next = base.extends.clone();
            chain.push(path);
            bases.push(base);
        }

        // deepest base first
        let merged_base = bases
            .into_iter()
            .rev()
            .reduce(|base, derived| derived.merged_over(base));
        Ok(match merged_base {
            Some(base) => top.merged_over(base),
            None => top,
        })
    }

    fn locate(&self, name: &str) -> Result<PathBuf, SourceError> {
        let dir = self.data_dir.as_ref().ok_or_else(|| SourceError::MissingDataDir {
            resource: name.to_string(),
        })?;
        let path = dir.join(name);
        if path.extension().is_some() {
            return Ok(path);
        }
        let candidates: Vec<PathBuf> = ["yaml", "yml", "json"]
            .iter()
            .map(|ext| path.with_extension(ext))
            .collect();
        Ok(candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .unwrap_or_else(|| path.with_extension("yaml")))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::NodeRecord;
    use std::collections::BTreeMap;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sample.txt", "nodes: []");

        let resolver = DataSourceResolver::new(Some(dir.path().to_path_buf()));
        let err = resolver
            .resolve(&Resource::File("sample.txt".into()))
            .await
            .unwrap_err();
        match err {
            SourceError::UnsupportedExtension { extension, accepted } => {
                assert_eq!(extension, "txt");
                assert_eq!(accepted, SUPPORTED_EXTENSIONS);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_file_without_data_dir() {
        let err = DataSourceResolver::default()
            .resolve(&Resource::File("sample.yaml".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingDataDir { .. }));
    }

    #[tokio::test]
    async fn test_yaml_and_json_agree() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "g.yaml",
            "nodes:\n  - label: son\n    node_id: sn-1\nedges: []\n",
        );
        write(
            dir.path(),
            "g.json",
            r#"{"nodes": [{"label": "son", "node_id": "sn-1"}], "edges": []}"#,
        );

        let resolver = DataSourceResolver::new(Some(dir.path().to_path_buf()));
        let yaml = resolver.resolve(&"g.yaml".into()).await.unwrap();
        let json = resolver.resolve(&"g.json".into()).await.unwrap();
        assert_eq!(yaml, json);
    }

    #[tokio::test]
    async fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", "{ nodes: ");
        let resolver = DataSourceResolver::new(Some(dir.path().to_path_buf()));
        let err = resolver.resolve(&"broken.json".into()).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse { ref path, .. } if path.ends_with("broken.json")));
    }

    #[tokio::test]
    async fn test_extends_chain_is_merged_base_first() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "grand.yaml",
            "nodes:\n  - {label: father, node_id: f-1}\nsummary: {father: 1}\n",
        );
        write(
            dir.path(),
            "base.json",
            r#"{"extends": "grand.yaml", "nodes": [{"label": "mother", "node_id": "m-1"}], "summary": {"father": 1, "mother": 1}}"#,
        );
        write(
            dir.path(),
            "child.yaml",
            "extends: base\nnodes:\n  - {label: son, node_id: s-1}\n",
        );

        let resolver = DataSourceResolver::new(Some(dir.path().to_path_buf()));
        let data = resolver.resolve(&"child.yaml".into()).await.unwrap();

        let ids: Vec<String> = data
            .nodes
            .iter()
            .filter_map(|n| n.key(Default::default()))
            .collect();
        assert_eq!(ids, vec!["f-1", "m-1", "s-1"]);
        assert_eq!(
            data.summary,
            Some(BTreeMap::from([("father".to_string(), 2), ("mother".to_string(), 1)]))
        );
        assert!(data.extends.is_none());
    }

    #[tokio::test]
    async fn test_inline_extends_reads_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base.yaml", "nodes:\n  - {label: father, node_id: f-1}\n");

        let mut inline = GraphData::new().with_node(NodeRecord::new("son").with("node_id", "s-1"));
        inline.extends = Some("base.yaml".into());

        let resolver = DataSourceResolver::new(Some(dir.path().to_path_buf()));
        let data = resolver.resolve(&inline.clone().into()).await.unwrap();
        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.nodes[0].label, "father");

        let err = DataSourceResolver::default()
            .resolve(&inline.into())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingDataDir { .. }));
    }

    #[tokio::test]
    async fn test_extends_cycle_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yaml", "extends: b.yaml\nnodes: []\n");
        write(dir.path(), "b.yaml", "extends: a.yaml\nnodes: []\n");
        write(dir.path(), "self.yaml", "extends: self\nnodes: []\n");

        let resolver = DataSourceResolver::new(Some(dir.path().to_path_buf()));
        let err = resolver.resolve(&"a.yaml".into()).await.unwrap_err();
        match err {
            SourceError::ExtendsCycle { chain } => {
                assert_eq!(chain, vec!["a.yaml", "b.yaml", "a.yaml"])
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = resolver.resolve(&"self.yaml".into()).await.unwrap_err();
        assert!(matches!(err, SourceError::ExtendsCycle { .. }));
    }
}
