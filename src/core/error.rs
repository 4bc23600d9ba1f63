//! Typed error handling for graph fixtures
//!
//! Errors are grouped by category the same way the fixture pipeline is:
//!
//! - [`ConfigError`]: the session configuration could not be read or is invalid
//! - [`SourceError`]: a graph data resource could not be located or parsed
//! - [`ValidationError`]: resolved graph data does not match the dictionary
//! - [`LifecycleError`]: a database fixture was driven out of order
//! - [`StorageError`]: the graph driver reported a failure
//! - [`BindingError`]: a test asked for a value that is not bound
//!
//! Trait seams towards the storage driver and configuration sources use
//! `anyhow::Result`; those errors are folded into [`FixtureError::Storage`]
//! or [`FixtureError::Config`] with some context attached.

use crate::core::validation::Violation;
use crate::fixture::FixtureState;
use std::collections::BTreeSet;
use thiserror::Error;

/// Result alias used throughout the crate
pub type FixtureResult<T> = Result<T, FixtureError>;

/// The main error type for graph fixtures
#[derive(Debug, Error)]
pub enum FixtureError {
    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Data source errors (files, formats, extends chains)
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Graph data failed validation against the dictionary
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A directive targets a handle that was never registered
    #[error("unknown database handle '{name}', known handles: {known:?}")]
    UnknownHandle { name: String, known: Vec<String> },

    /// A directive has no handle and none can be picked by default
    #[error("no database handle given and no default available, known handles: {known:?}")]
    MissingHandle { known: Vec<String> },

    /// Database fixture lifecycle errors
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Storage driver errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Test binding errors
    #[error(transparent)]
    Binding(#[from] BindingError),
}

impl FixtureError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            FixtureError::Config(_) => "CONFIG_ERROR",
            FixtureError::Source(e) => e.error_code(),
            FixtureError::Validation(_) => "VALIDATION_ERROR",
            FixtureError::UnknownHandle { .. } => "UNKNOWN_HANDLE",
            FixtureError::MissingHandle { .. } => "MISSING_HANDLE",
            FixtureError::Lifecycle(_) => "INVALID_TRANSITION",
            FixtureError::Storage(_) => "STORAGE_ERROR",
            FixtureError::Binding(_) => "BINDING_ERROR",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read
    #[error("configuration unavailable: {message}")]
    Unavailable { message: String },

    /// Failed to parse configuration
    #[error("failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    Parse {
        file: Option<String>,
        message: String,
    },

    /// A handle configuration failed validation
    #[error("invalid configuration for handle '{handle}': {message}")]
    Invalid { handle: String, message: String },

    /// Command line options could not be parsed
    #[error("invalid options: {message}")]
    Options { message: String },
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors related to loading graph data resources
#[derive(Debug, Error)]
pub enum SourceError {
    /// File extension is not one of the supported formats
    #[error("unsupported extension '{extension}', file must end with one of {accepted:?}")]
    UnsupportedExtension {
        extension: String,
        accepted: &'static [&'static str],
    },

    /// A file resource was requested without any data directory
    #[error("resource '{resource}' needs a data directory, none was given")]
    MissingDataDir { resource: String },

    /// The resource file could not be read
    #[error("failed to read '{path}': {message}")]
    Io { path: String, message: String },

    /// The resource file is not valid JSON/YAML graph data
    #[error("failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    /// The extends chain loops back on itself
    #[error("extends cycle detected: {}", .chain.join(" -> "))]
    ExtendsCycle { chain: Vec<String> },
}

impl SourceError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SourceError::UnsupportedExtension { .. } => "UNSUPPORTED_FORMAT",
            SourceError::MissingDataDir { .. } => "MISSING_DATA_DIR",
            SourceError::Io { .. } => "SOURCE_IO_ERROR",
            SourceError::Parse { .. } => "SOURCE_PARSE_ERROR",
            SourceError::ExtendsCycle { .. } => "EXTENDS_CYCLE",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Graph data violates the handle's dictionary
#[derive(Debug, Error)]
#[error("{} violation(s) in '{resource}': {}", .violations.len(), render(.violations))]
pub struct ValidationError {
    pub resource: String,
    pub violations: BTreeSet<Violation>,
}

fn render(violations: &BTreeSet<Violation>) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Lifecycle Errors
// =============================================================================

/// Errors related to the database fixture state machine
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("handle '{handle}' cannot {operation} while {state:?}")]
    InvalidTransition {
        handle: String,
        state: FixtureState,
        operation: &'static str,
    },
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by the graph driver
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection could not be opened
    #[error("failed to open handle '{handle}': {message}")]
    Connection { handle: String, message: String },

    /// Any other driver failure, with what was being done at the time
    #[error("{context}: {message}")]
    Driver { context: String, message: String },
}

impl StorageError {
    /// Wrap a driver error with context
    pub fn driver(context: impl Into<String>, err: anyhow::Error) -> Self {
        StorageError::Driver {
            context: context.into(),
            message: format!("{:#}", err),
        }
    }
}

// =============================================================================
// Binding Errors
// =============================================================================

/// Errors raised when reading values bound for a test
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("nothing is bound under '{name}'")]
    NotBound { name: String },

    #[error("'{name}' is bound, but not to {expected}")]
    WrongKind { name: String, expected: &'static str },
}
