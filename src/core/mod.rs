//! Core types and traits of the fixture pipeline

pub mod data;
pub mod dictionary;
pub mod driver;
pub mod entity;
pub mod error;
pub mod extension;
pub mod mark;
pub mod model;
pub mod validation;

pub use data::{EdgeRecord, GraphData, NodeRecord};
pub use dictionary::{Dictionary, LabelDefinition, LinkDefinition, PropertyDefinition, PropertyType};
pub use driver::{GraphConnector, GraphDriver, GraphTransaction, StorageBase};
pub use entity::{Edge, Node, UniqueKey};
pub use error::{
    BindingError, ConfigError, FixtureError, FixtureResult, LifecycleError, SourceError,
    StorageError, ValidationError,
};
pub use extension::{MarkExtension, NoopExtension, PostProcessor, PostProcessors};
pub use mark::{DEFAULT_DATA_NAME, DataMark, Resource};
pub use model::ModelBinding;
pub use validation::{SchemaValidator, StructuralValidator, ValidationSchema, Violation};
