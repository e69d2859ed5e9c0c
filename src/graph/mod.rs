//! Interface to the external resource graph.
//!
//! The graph owns resource field values and their collection. The executor
//! only asks for schemas, subscribes to fields and synthesizes derived
//! resources through [`ResourceGraph`].

pub mod memory;

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::program::{Primitive, Value};
use crate::types::Type;

pub use memory::MemoryGraph;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub kind: String,
    pub id: String,
}

impl ResourceHandle {
    pub fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    pub fn resource_type(&self) -> Type {
        Type::resource(&self.kind)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id = {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
}

/// Declared fields of one resource kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceSchema {
    pub name: String,
    pub fields: HashMap<String, FieldInfo>,
}

impl ResourceSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, ty: Type) -> Self {
        self.fields.insert(
            name.to_string(),
            FieldInfo {
                name: name.to_string(),
                ty,
            },
        );
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("cannot retrieve resource definition for resource '{0}'")]
    SchemaNotFound(String),

    #[error("field '{field}' does not exist on resource '{resource}'")]
    FieldNotFound { resource: String, field: String },

    #[error("{0}")]
    Fetch(String),

    #[error("{0}")]
    Other(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Delivery function for field updates. May be invoked any number of times,
/// from any thread.
pub type FieldCallback = Arc<dyn Fn(GraphResult<Value>) + Send + Sync>;

#[mockall::automock]
pub trait ResourceGraph: Send + Sync {
    /// Schema of the resource's kind.
    fn resource_schema(&self, resource: &ResourceHandle) -> GraphResult<Arc<ResourceSchema>>;

    /// Subscribes `callback` to every future resolution or failure of
    /// `field`. Registering an existing `watcher_id` replaces it.
    fn watch_field(
        &self,
        resource: &ResourceHandle,
        field: &str,
        watcher_id: &str,
        callback: FieldCallback,
    ) -> GraphResult<()>;

    /// Best effort; one in-flight delivery may still arrive.
    fn unregister(&self, watcher_id: &str);

    fn create_resource(
        &self,
        kind: &str,
        args: Vec<(String, Primitive)>,
    ) -> GraphResult<ResourceHandle>;
}
