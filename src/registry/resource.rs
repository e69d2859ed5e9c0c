use super::array::{elements, filter};
use super::map::single_block;
use super::{block_function, operand, BuiltinRegistry, Operator, Resolution};
use crate::error::{ExecError, ExecResult};
use crate::eval::BlockOutcome;
use crate::graph::{ResourceGraph, ResourceHandle};
use crate::program::{Primitive, RawData, Value};
use crate::types::{Type, Underlying};

pub(super) fn register(r: &mut BuiltinRegistry) {
    let resource = Underlying::ResourceLike;

    r.generic(resource, Operator::Length, |_, _, _, args, _| {
        let list = operand(args, "length")?;
        let len = list
            .value
            .as_array()
            .ok_or_else(|| ExecError::binding("array", list.value.kind()))?
            .len();
        Ok(Resolution::Value(RawData::int(len as i64)))
    });

    r.generic(resource, Operator::Block, |exec, bind, _, args, reference| {
        let function = block_function(args, "{}")?;
        exec.run_blocks(reference, function, vec![bind.clone()], single_block)
    });

    r.generic(resource, Operator::Where, |exec, bind, _, args, reference| {
        let handle = bind
            .value
            .as_resource()
            .ok_or_else(|| ExecError::binding(bind.ty.label(), bind.value.kind()))?
            .clone();
        let list = operand(args, "where")?;
        let function = block_function(args, "where")?;
        let items = elements(list)?;

        let filter_id = exec
            .checksum(reference)
            .unwrap_or_else(|| reference.to_string());
        let derived = Derived {
            graph: exec.runtime().graph.clone(),
            bound: bind.ty.clone(),
            list: list.ty.clone(),
            handle,
            id: filter_id,
        };
        exec.run_blocks(reference, function, items, move |outcomes| {
            derived.finish(outcomes)
        })
    });
}

/// Filtered view over a resource's list, published as a new resource of the
/// same kind.
struct Derived {
    graph: std::sync::Arc<dyn ResourceGraph>,
    bound: Type,
    list: Type,
    handle: ResourceHandle,
    id: String,
}

impl Derived {
    fn finish(&self, outcomes: &[BlockOutcome]) -> RawData {
        let filtered = filter(&self.list, outcomes);
        if let Some(err) = filtered.error {
            return RawData::error(self.bound.clone(), err);
        }
        match self.create(filtered) {
            Ok(handle) => RawData::new(self.bound.clone(), Value::Resource(handle)),
            Err(err) => RawData::error(self.bound.clone(), err),
        }
    }

    fn create(&self, filtered: RawData) -> ExecResult<ResourceHandle> {
        let args = vec![
            ("list".to_string(), Primitive::from(filtered)),
            (
                "__id".to_string(),
                Primitive::string(&format!("{}:{}", self.handle.id, self.id)),
            ),
        ];
        self.graph
            .create_resource(&self.handle.kind, args)
            .map_err(|e| {
                ExecError::operator("where", format!("cannot create filtered resource: {}", e))
            })
    }
}
