use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::{
    FieldCallback, GraphError, GraphResult, ResourceGraph, ResourceHandle, ResourceSchema,
};
use crate::program::{Primitive, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FieldKey {
    resource: ResourceHandle,
    field: String,
}

impl FieldKey {
    fn new(resource: &ResourceHandle, field: &str) -> Self {
        Self {
            resource: resource.clone(),
            field: field.to_string(),
        }
    }
}

struct Watch {
    key: FieldKey,
    callback: FieldCallback,
}

/// Thread-safe resource graph backed by in-memory field values.
///
/// Watches fire immediately when a field already has a value, and again on
/// every [`MemoryGraph::set_field`] / [`MemoryGraph::fail_field`]. Callbacks
/// run on the thread that updates the field, after all internal locks are
/// released.
#[derive(Default)]
pub struct MemoryGraph {
    schemas: DashMap<String, Arc<ResourceSchema>>,
    fields: DashMap<FieldKey, GraphResult<Value>>,
    watches: DashMap<String, Watch>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_schema(&self, schema: ResourceSchema) {
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
    }

    /// Adds a resource with pre-collected field values.
    pub fn add_resource(&self, kind: &str, id: &str, fields: Vec<(&str, Value)>) -> ResourceHandle {
        let handle = ResourceHandle::new(kind, id);
        for (field, value) in fields {
            self.fields.insert(FieldKey::new(&handle, field), Ok(value));
        }
        handle
    }

    pub fn set_field(&self, resource: &ResourceHandle, field: &str, value: Value) {
        self.update(FieldKey::new(resource, field), Ok(value));
    }

    pub fn fail_field(&self, resource: &ResourceHandle, field: &str, error: GraphError) {
        self.update(FieldKey::new(resource, field), Err(error));
    }

    pub fn field(&self, resource: &ResourceHandle, field: &str) -> Option<GraphResult<Value>> {
        self.fields
            .get(&FieldKey::new(resource, field))
            .map(|entry| entry.value().clone())
    }

    pub fn watch_count(&self) -> usize {
        self.watches.len()
    }

    fn update(&self, key: FieldKey, value: GraphResult<Value>) {
        self.fields.insert(key.clone(), value.clone());

        let callbacks: Vec<FieldCallback> = self
            .watches
            .iter()
            .filter(|watch| watch.key == key)
            .map(|watch| watch.callback.clone())
            .collect();
        debug!(
            resource = %key.resource,
            field = %key.field,
            watchers = callbacks.len(),
            "graph> field updated"
        );
        for callback in callbacks {
            callback(value.clone());
        }
    }
}

impl ResourceGraph for MemoryGraph {
    fn resource_schema(&self, resource: &ResourceHandle) -> GraphResult<Arc<ResourceSchema>> {
        self.schemas
            .get(&resource.kind)
            .map(|schema| schema.value().clone())
            .ok_or_else(|| GraphError::SchemaNotFound(resource.kind.clone()))
    }

    fn watch_field(
        &self,
        resource: &ResourceHandle,
        field: &str,
        watcher_id: &str,
        callback: FieldCallback,
    ) -> GraphResult<()> {
        let key = FieldKey::new(resource, field);
        self.watches.insert(
            watcher_id.to_string(),
            Watch {
                key: key.clone(),
                callback: callback.clone(),
            },
        );

        let current = self.fields.get(&key).map(|entry| entry.value().clone());
        if let Some(value) = current {
            callback(value);
        }
        Ok(())
    }

    fn unregister(&self, watcher_id: &str) {
        self.watches.remove(watcher_id);
    }

    fn create_resource(
        &self,
        kind: &str,
        args: Vec<(String, Primitive)>,
    ) -> GraphResult<ResourceHandle> {
        if !self.schemas.contains_key(kind) {
            return Err(GraphError::SchemaNotFound(kind.to_string()));
        }

        let id = args
            .iter()
            .find(|(name, _)| name == "__id")
            .and_then(|(_, arg)| arg.value.as_str().map(str::to_string))
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let handle = ResourceHandle::new(kind, &id);

        for (name, arg) in args {
            if name == "__id" {
                continue;
            }
            self.fields
                .insert(FieldKey::new(&handle, &name), Ok(arg.value));
        }
        Ok(handle)
    }
}
