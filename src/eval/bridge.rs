//! Resource fields that are not builtins resolve through watches on the
//! resource graph.

use std::sync::Arc;

use tracing::debug;

use super::executor::Executor;
use crate::error::{ExecError, ExecResult};
use crate::graph::{FieldCallback, GraphResult, ResourceHandle};
use crate::program::{Call, RawData, Ref, Value};
use crate::registry::Resolution;
use crate::types::Type;

struct FieldWatch {
    wid: String,
    reference: Ref,
    resource: ResourceHandle,
    field: String,
    ty: Type,
}

impl Executor {
    /// Watcher ids are unique per executor and ref.
    pub(crate) fn watcher_id(&self, reference: Ref) -> String {
        format!(
            "{}:{}:{}",
            self.state.runtime.config.watcher_prefix, self.state.id, reference
        )
    }

    /// Subscribes `reference` to the field `call.id` of the bound resource.
    /// The ref stays pending until the graph delivers a value.
    pub(crate) fn watch_field(
        &self,
        bind: &RawData,
        call: &Call,
        reference: Ref,
    ) -> ExecResult<Resolution> {
        let resource = bind
            .value
            .as_resource()
            .ok_or_else(|| ExecError::binding("resource", bind.value.kind()))?
            .clone();

        let graph = self.state.runtime.graph.clone();
        let schema = graph.resource_schema(&resource).map_err(|_| {
            ExecError::registration(format!(
                "cannot retrieve resource definition for resource '{}'",
                resource.kind
            ))
        })?;
        let field = schema.field(&call.id).ok_or_else(|| {
            ExecError::registration(format!(
                "cannot find field '{}' on resource '{}'",
                call.id, resource.kind
            ))
        })?;

        let wid = self.watcher_id(reference);
        if !self.state.watchers.insert(wid.clone()) {
            // re-run after a binding change replaces the old subscription
            graph.unregister(&wid);
        }
        debug!(wid = %wid, field = %call.id, "exec> add watcher id");

        let watch = Arc::new(FieldWatch {
            wid: wid.clone(),
            reference,
            resource: resource.clone(),
            field: call.id.clone(),
            ty: field.ty.clone(),
        });
        let executor = Arc::downgrade(&self.state);
        let callback: FieldCallback = Arc::new(move |result| {
            if let Some(state) = executor.upgrade() {
                Executor { state }.on_field(&watch, result);
            }
        });

        if let Err(err) = graph.watch_field(&resource, &call.id, &wid, callback) {
            self.state.watchers.remove(&wid);
            return Err(ExecError::registration(format!(
                "cannot watch '{}' on '{}': {}",
                call.id, resource, err
            )));
        }
        // an unregister that raced the registration above missed this id
        if self.is_closed() {
            debug!(wid = %wid, "exec> closed during watch, removing watcher id");
            self.state.watchers.remove(&wid);
            graph.unregister(&wid);
        }
        Ok(Resolution::Pending)
    }

    fn on_field(&self, watch: &FieldWatch, result: GraphResult<Value>) {
        if self.is_closed() || !self.state.watchers.contains(&watch.wid) {
            debug!(wid = %watch.wid, "exec> discarding update for removed watcher");
            return;
        }

        let data = match result {
            Ok(value) => RawData::new(watch.ty.clone(), value),
            Err(err) => {
                debug!(wid = %watch.wid, error = %err, "exec> field failed");
                RawData::error(
                    watch.ty.clone(),
                    ExecError::ResourceFetch {
                        resource: watch.resource.to_string(),
                        field: watch.field.clone(),
                        message: err.to_string(),
                    },
                )
            }
        };
        self.publish(watch.reference, data);
    }
}
