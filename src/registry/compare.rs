//! Value-level comparisons behind the equality and ordering operators.
//!
//! Strings compared with numbers are parsed as numbers. An unparsable string
//! fails the comparison instead of falling back to lexicographic order.

use std::cmp::Ordering;

use regex::Regex;

use crate::error::{ExecError, ExecResult};
use crate::program::Value;

fn expect_bool(value: &Value) -> ExecResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| ExecError::binding("bool", value.kind()))
}

fn expect_int(value: &Value) -> ExecResult<i64> {
    value
        .as_int()
        .ok_or_else(|| ExecError::binding("int", value.kind()))
}

fn expect_float(value: &Value) -> ExecResult<f64> {
    value
        .as_float()
        .ok_or_else(|| ExecError::binding("float", value.kind()))
}

fn expect_str(value: &Value) -> ExecResult<&str> {
    value
        .as_str()
        .ok_or_else(|| ExecError::binding("string", value.kind()))
}

fn parse_int(s: &str) -> ExecResult<i64> {
    s.trim().parse::<i64>().map_err(|_| {
        ExecError::operator("compare", format!("cannot parse '{}' as int", s))
    })
}

fn parse_float(s: &str) -> ExecResult<f64> {
    s.trim().parse::<f64>().map_err(|_| {
        ExecError::operator("compare", format!("cannot parse '{}' as float", s))
    })
}

/// Compiles the pattern held by a regex (or string) value.
pub(crate) fn compile(pattern: &Value) -> ExecResult<Regex> {
    let source = expect_str(pattern)?;
    Regex::new(source).map_err(|e| {
        ExecError::operator("regex", format!("invalid pattern '{}': {}", source, e))
    })
}

// bool

pub(crate) fn bool_eq_bool(l: &Value, r: &Value) -> ExecResult<bool> {
    Ok(expect_bool(l)? == expect_bool(r)?)
}

pub(crate) fn bool_eq_string(l: &Value, r: &Value) -> ExecResult<bool> {
    let b = expect_bool(l)?;
    Ok(match expect_str(r)? {
        "true" => b,
        "false" => !b,
        _ => false,
    })
}

pub(crate) fn bool_matches(v: &Value, re: &Regex) -> ExecResult<bool> {
    Ok(re.is_match(&expect_bool(v)?.to_string()))
}

// int

pub(crate) fn int_eq_int(l: &Value, r: &Value) -> ExecResult<bool> {
    Ok(expect_int(l)? == expect_int(r)?)
}

pub(crate) fn int_eq_float(l: &Value, r: &Value) -> ExecResult<bool> {
    Ok(expect_int(l)? as f64 == expect_float(r)?)
}

pub(crate) fn int_eq_string(l: &Value, r: &Value) -> ExecResult<bool> {
    let i = expect_int(l)?;
    Ok(expect_str(r)?.trim().parse::<i64>().is_ok_and(|v| v == i))
}

pub(crate) fn int_matches(v: &Value, re: &Regex) -> ExecResult<bool> {
    Ok(re.is_match(&expect_int(v)?.to_string()))
}

pub(crate) fn int_cmp_int(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(Some(expect_int(l)?.cmp(&expect_int(r)?)))
}

pub(crate) fn int_cmp_float(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok((expect_int(l)? as f64).partial_cmp(&expect_float(r)?))
}

pub(crate) fn int_cmp_string(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(Some(expect_int(l)?.cmp(&parse_int(expect_str(r)?)?)))
}

// float

pub(crate) fn float_eq_float(l: &Value, r: &Value) -> ExecResult<bool> {
    Ok(expect_float(l)? == expect_float(r)?)
}

pub(crate) fn float_eq_int(l: &Value, r: &Value) -> ExecResult<bool> {
    int_eq_float(r, l)
}

pub(crate) fn float_eq_string(l: &Value, r: &Value) -> ExecResult<bool> {
    let f = expect_float(l)?;
    Ok(expect_str(r)?.trim().parse::<f64>().is_ok_and(|v| v == f))
}

pub(crate) fn float_matches(v: &Value, re: &Regex) -> ExecResult<bool> {
    Ok(re.is_match(&expect_float(v)?.to_string()))
}

pub(crate) fn float_cmp_float(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(expect_float(l)?.partial_cmp(&expect_float(r)?))
}

pub(crate) fn float_cmp_int(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(expect_float(l)?.partial_cmp(&(expect_int(r)? as f64)))
}

pub(crate) fn float_cmp_string(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(expect_float(l)?.partial_cmp(&parse_float(expect_str(r)?)?))
}

// string

pub(crate) fn string_eq_string(l: &Value, r: &Value) -> ExecResult<bool> {
    Ok(expect_str(l)? == expect_str(r)?)
}

pub(crate) fn string_matches(v: &Value, re: &Regex) -> ExecResult<bool> {
    Ok(re.is_match(expect_str(v)?))
}

pub(crate) fn string_eq_bool(l: &Value, r: &Value) -> ExecResult<bool> {
    bool_eq_string(r, l)
}

pub(crate) fn string_eq_int(l: &Value, r: &Value) -> ExecResult<bool> {
    int_eq_string(r, l)
}

pub(crate) fn string_eq_float(l: &Value, r: &Value) -> ExecResult<bool> {
    float_eq_string(r, l)
}

pub(crate) fn string_cmp_string(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(Some(expect_str(l)?.cmp(expect_str(r)?)))
}

pub(crate) fn string_cmp_int(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(Some(parse_int(expect_str(l)?)?.cmp(&expect_int(r)?)))
}

pub(crate) fn string_cmp_float(l: &Value, r: &Value) -> ExecResult<Option<Ordering>> {
    Ok(parse_float(expect_str(l)?)?.partial_cmp(&expect_float(r)?))
}
