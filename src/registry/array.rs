use super::compare::*;
use super::{block_function, operand, BuiltinRegistry, Operator, Resolution, Shape};
use crate::error::{ExecError, ExecResult};
use crate::eval::BlockOutcome;
use crate::program::{RawData, Value};
use crate::types::{Type, Underlying};

pub(super) fn register(r: &mut BuiltinRegistry) {
    use Shape::{Contains, Elementwise};
    let array = Underlying::ArrayLike;
    let arr = Type::array;

    // []T == []T
    r.equality(array, Some(Type::Bool), arr(Type::Bool), Elementwise, bool_eq_bool);
    r.equality(array, Some(Type::Int), arr(Type::Int), Elementwise, int_eq_int);
    r.equality(array, Some(Type::Float), arr(Type::Float), Elementwise, float_eq_float);
    r.equality(array, Some(Type::String), arr(Type::String), Elementwise, string_eq_string);
    r.equality(array, Some(Type::Regex), arr(Type::Regex), Elementwise, string_eq_string);

    // []T == T
    r.equality(array, Some(Type::Bool), Type::Bool, Contains, bool_eq_bool);
    r.equality(array, Some(Type::Int), Type::Int, Contains, int_eq_int);
    r.equality(array, Some(Type::Int), Type::Float, Contains, int_eq_float);
    r.equality(array, Some(Type::Float), Type::Float, Contains, float_eq_float);
    r.equality(array, Some(Type::Float), Type::Int, Contains, float_eq_int);
    r.equality(array, Some(Type::String), Type::String, Contains, string_eq_string);
    r.equality(array, Some(Type::Regex), Type::Regex, Contains, string_eq_string);

    // []string == T
    r.equality(array, Some(Type::String), Type::Bool, Contains, string_eq_bool);
    r.equality(array, Some(Type::String), Type::Int, Contains, string_eq_int);
    r.equality(array, Some(Type::String), Type::Float, Contains, string_eq_float);

    // []T == string
    r.equality(array, Some(Type::Bool), Type::String, Contains, bool_eq_string);
    r.equality(array, Some(Type::Int), Type::String, Contains, int_eq_string);
    r.equality(array, Some(Type::Float), Type::String, Contains, float_eq_string);

    // []T == regex
    r.matching(array, Some(Type::Bool), Type::Regex, Contains, bool_matches);
    r.matching(array, Some(Type::Int), Type::Regex, Contains, int_matches);
    r.matching(array, Some(Type::Float), Type::Regex, Contains, float_matches);
    r.matching(array, Some(Type::String), Type::Regex, Contains, string_matches);

    r.generic(array, Operator::Index, |_, bind, _, args, _| index(bind, args));
    r.generic(array, Operator::Length, |_, bind, _, _, _| length(bind));
    r.generic(
        array,
        Operator::Block,
        |exec, bind, _, args, reference| {
            let function = block_function(args, "{}")?;
            let items = elements(bind)?;
            exec.run_blocks(reference, function, items, project)
        },
    );
    r.generic(
        array,
        Operator::Where,
        |exec, bind, _, args, reference| {
            let function = block_function(args, "where")?;
            let items = elements(bind)?;
            let ty = bind.ty.clone();
            exec.run_blocks(
                reference,
                function,
                items,
                move |outcomes| filter(&ty, outcomes),
            )
        },
    );
}

fn items(bind: &RawData) -> ExecResult<&[Value]> {
    bind.value
        .as_array()
        .ok_or_else(|| ExecError::binding(bind.ty.label(), bind.value.kind()))
}

fn element_type(bind: &RawData) -> Type {
    bind.ty.child().cloned().unwrap_or(Type::Any)
}

/// Each element as its own typed result.
pub(super) fn elements(bind: &RawData) -> ExecResult<Vec<RawData>> {
    let ty = element_type(bind);
    Ok(items(bind)?
        .iter()
        .map(|item| RawData::new(ty.clone(), item.clone()))
        .collect())
}

fn index(bind: &RawData, args: &[RawData]) -> ExecResult<Resolution> {
    let arg = operand(args, "[]")?;
    let idx = arg
        .value
        .as_int()
        .ok_or_else(|| ExecError::binding("int", arg.value.kind()))?;
    let items = items(bind)?;

    let len = items.len() as i64;
    let pos = if idx < 0 { len + idx } else { idx };
    if pos < 0 || pos >= len {
        return Err(ExecError::operator(
            "[]",
            format!("array index out of bound (trying to access element {}, max: {})", idx, len - 1),
        ));
    }
    Ok(Resolution::Value(RawData::new(
        element_type(bind),
        items[pos as usize].clone(),
    )))
}

fn length(bind: &RawData) -> ExecResult<Resolution> {
    if matches!(bind.value, Value::Nil) {
        return Ok(Resolution::Value(RawData::nil(Type::Int)));
    }
    Ok(Resolution::Value(RawData::int(items(bind)?.len() as i64)))
}

/// Block projection over every element: an array of checksum maps.
pub(super) fn project(outcomes: &[BlockOutcome]) -> RawData {
    let ty = Type::array(Type::Block);
    if let Some(err) = outcomes.iter().find_map(BlockOutcome::error) {
        return RawData::error(ty, err.clone());
    }
    RawData::new(
        ty,
        Value::Array(outcomes.iter().map(BlockOutcome::entries).collect()),
    )
}

/// Keeps the elements whose block results are all truthy.
pub(super) fn filter(ty: &Type, outcomes: &[BlockOutcome]) -> RawData {
    if let Some(err) = outcomes.iter().find_map(BlockOutcome::error) {
        return RawData::error(ty.clone(), err.clone());
    }
    RawData::new(
        ty.clone(),
        Value::Array(
            outcomes
                .iter()
                .filter(|outcome| outcome.passed())
                .map(|outcome| outcome.item.value.clone())
                .collect(),
        ),
    )
}
