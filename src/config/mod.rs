//! Configuration loading and management
//!
//! A session is configured with one [`DatabaseDriverConfig`] per handle name,
//! read once from a [`ConfigSource`] at session start:
//!
//! ```yaml
//! pg_driver:
//!   host: localhost
//!   user: test
//!   password: test
//!   database: automated_test
//!   dictionary:
//!     father:
//!       properties:
//!         name: { type: string }
//! ```
//!
//! [`SessionOptions`] carries the command line surface.

use crate::core::driver::StorageBase;
use crate::core::error::ConfigError;
use crate::core::{Dictionary, ModelBinding};
use anyhow::{Context, Result};
use clap::Parser;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Environment variable naming the session configuration file
pub const CONFIG_ENV: &str = "GRAPH_FIXTURES_CONFIG";

fn default_volatile() -> bool {
    true
}

/// Configuration of one database handle
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseDriverConfig {
    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    #[validate(length(min = 1, message = "user must not be empty"))]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[validate(length(min = 1, message = "database must not be empty"))]
    pub database: String,

    /// Prefix for every table of this handle
    #[serde(default)]
    pub package_namespace: Option<String>,

    /// Labels the factory may build; every dictionary label when unset
    #[serde(default)]
    pub model: Option<ModelBinding>,

    #[serde(default)]
    pub dictionary: Dictionary,

    /// Extra table sets with their own create/drop lifecycle
    #[serde(default)]
    pub extra_bases: Vec<StorageBase>,

    /// Default property values for generated nodes
    #[serde(default)]
    pub globals: IndexMap<String, Value>,

    /// Truncate tables around every test
    #[serde(default = "default_volatile")]
    pub volatile: bool,
}

impl DatabaseDriverConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            package_namespace: None,
            model: None,
            dictionary: Dictionary::default(),
            extra_bases: Vec::new(),
            globals: IndexMap::new(),
            volatile: true,
        }
    }

    pub fn with_dictionary(mut self, dictionary: Dictionary) -> Self {
        self.dictionary = dictionary;
        self
    }

    pub fn with_model(mut self, model: ModelBinding) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.package_namespace = Some(namespace.into());
        self
    }

    pub fn with_extra_base(mut self, base: StorageBase) -> Self {
        self.extra_bases.push(base);
        self
    }

    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    pub fn volatile(mut self, volatile: bool) -> Self {
        self.volatile = volatile;
        self
    }

    /// The bound model, derived from the dictionary when not given
    pub fn model(&self) -> ModelBinding {
        self.model
            .clone()
            .unwrap_or_else(|| ModelBinding::from_dictionary(&self.dictionary))
    }

    /// The handle's own tables
    pub fn primary_base(&self) -> StorageBase {
        StorageBase::for_model(
            self.package_namespace.as_deref(),
            &self.model(),
            &self.dictionary,
        )
    }

    /// Primary base followed by the extra ones
    pub fn storage_bases(&self) -> Vec<StorageBase> {
        let mut bases = vec![self.primary_base()];
        bases.extend(self.extra_bases.iter().cloned());
        bases
    }

    /// Connection identity, without the password
    pub fn url(&self) -> String {
        format!("graph://{}@{}/{}", self.user, self.host, self.database)
    }

    /// Validate connection fields
    pub fn check(&self, handle: &str) -> Result<(), ConfigError> {
        Validate::validate(self).map_err(|e| ConfigError::Invalid {
            handle: handle.to_string(),
            message: e.to_string(),
        })
    }
}

impl fmt::Debug for DatabaseDriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseDriverConfig")
            .field("url", &self.url())
            .field("package_namespace", &self.package_namespace)
            .field("labels", &self.model().labels().collect::<Vec<_>>())
            .field("extra_bases", &self.extra_bases)
            .field("volatile", &self.volatile)
            .finish()
    }
}

/// Handle name → configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureConfig {
    pub handles: BTreeMap<String, DatabaseDriverConfig>,
}

impl FixtureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle
    pub fn with_handle(mut self, name: impl Into<String>, config: DatabaseDriverConfig) -> Self {
        self.handles.insert(name.into(), config);
        self
    }

    /// Parse YAML configuration
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            file: None,
            message: e.to_string(),
        })
    }

    /// Parse JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            file: None,
            message: e.to_string(),
        })
    }

    /// Load configuration from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unavailable {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => {
                return Err(ConfigError::Unavailable {
                    message: format!(
                        "unsupported config extension {:?} for {}",
                        other,
                        path.display()
                    ),
                });
            }
        };
        parsed.map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                file: Some(path.display().to_string()),
                message,
            },
            other => other,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }
}

/// Where a session reads its configuration from
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<FixtureConfig>;
}

impl ConfigSource for FixtureConfig {
    fn load(&self) -> Result<FixtureConfig> {
        Ok(self.clone())
    }
}

/// Configuration read from a file
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file named by [`CONFIG_ENV`]
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).with_context(|| format!("{} is not set", CONFIG_ENV))?;
        Ok(Self::new(path))
    }
}

impl ConfigSource for ConfigFile {
    fn load(&self) -> Result<FixtureConfig> {
        Ok(FixtureConfig::from_file(&self.path)?)
    }
}

/// Command line options of a fixture session
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "graph-fixtures", no_binary_name = true)]
pub struct SessionOptions {
    /// Default directory for file-backed graph data
    #[arg(long = "data-dir", env = "GRAPH_FIXTURES_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Drop all tables before creating them
    #[arg(long = "drop-all")]
    pub drop_all: bool,
}

impl SessionOptions {
    /// Parse options from arguments (no program name)
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|e| ConfigError::Options {
            message: e.to_string(),
        })
    }

    /// Pick this crate's options out of the process arguments
    ///
    /// Only `--data-dir` and `--drop-all` are looked at, the last
    /// `--data-dir` winning. The libtest harness rejects flags it does not
    /// know, so `cargo test -- --data-dir x` fails before reaching this;
    /// under `cargo test` set `GRAPH_FIXTURES_DATA_DIR` instead. The flags
    /// work for custom harnesses (`harness = false`) that forward them.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(own_args(std::env::args().skip(1)))
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_drop_all(mut self, drop_all: bool) -> Self {
        self.drop_all = drop_all;
        self
    }
}

fn own_args(args: impl Iterator<Item = String>) -> Vec<String> {
    let mut drop_all = false;
    let mut data_dir = None;
    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        if arg == "--drop-all" {
            drop_all = true;
        } else if let Some(value) = arg.strip_prefix("--data-dir=") {
            data_dir = Some(value.to_string());
        } else if arg == "--data-dir" {
            if let Some(value) = args.next() {
                data_dir = Some(value);
            }
        }
    }

    let mut picked = Vec::new();
    if let Some(dir) = data_dir {
        picked.push(format!("--data-dir={}", dir));
    }
    if drop_all {
        picked.push("--drop-all".to_string());
    }
    picked
}
