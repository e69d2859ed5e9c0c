use super::{block_function, operand, BuiltinRegistry, Operator, Resolution};
use crate::error::{ExecError, ExecResult};
use crate::eval::BlockOutcome;
use crate::program::{RawData, Value};
use crate::types::{Type, Underlying};

pub(super) fn register(r: &mut BuiltinRegistry) {
    let map = Underlying::MapLike;

    r.generic(map, Operator::Index, |_, bind, _, args, _| index(bind, args));
    r.generic(map, Operator::Length, |_, bind, _, _, _| length(bind));
    r.generic(
        map,
        Operator::Block,
        |exec, bind, _, args, reference| {
            let function = block_function(args, "{}")?;
            exec.run_blocks(reference, function, vec![bind.clone()], single_block)
        },
    );
}

fn entries(bind: &RawData) -> ExecResult<Option<&std::collections::BTreeMap<String, Value>>> {
    match &bind.value {
        Value::Nil => Ok(None),
        value => value
            .as_map()
            .map(Some)
            .ok_or_else(|| ExecError::binding(bind.ty.label(), value.kind())),
    }
}

/// Missing keys resolve to nil typed like the map's values.
fn index(bind: &RawData, args: &[RawData]) -> ExecResult<Resolution> {
    let arg = operand(args, "[]")?;
    let key = arg
        .value
        .as_str()
        .ok_or_else(|| ExecError::binding("string", arg.value.kind()))?;
    let child = bind.ty.child().cloned().unwrap_or(Type::Any);

    let value = entries(bind)?
        .and_then(|map| map.get(key))
        .cloned()
        .unwrap_or_default();
    Ok(Resolution::Value(RawData::new(child, value)))
}

fn length(bind: &RawData) -> ExecResult<Resolution> {
    Ok(Resolution::Value(match entries(bind)? {
        Some(map) => RawData::int(map.len() as i64),
        None => RawData::nil(Type::Int),
    }))
}

/// Block run once against the bound value: a single checksum map.
pub(super) fn single_block(outcomes: &[BlockOutcome]) -> RawData {
    match outcomes.first() {
        Some(outcome) => match outcome.error() {
            Some(err) => RawData::error(Type::Block, err.clone()),
            None => RawData::new(Type::Block, outcome.entries()),
        },
        None => RawData::nil(Type::Block),
    }
}
